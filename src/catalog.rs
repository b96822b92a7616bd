//! Catalog documents and signature normalization
//!
//! The catalog describes every type of an assembly as a JSON document. Member
//! prototypes use a tagged representation (`{"keyword": {"name": "int"}}`,
//! `{"genericApp": {...}}`, ...) which [`normalize`] maps onto the canonical
//! [`TypeNode`] form used for index keys.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{MemberKey, MemberKind};
use crate::signature::TypeNode;

/// Value of the `type` field marking a document as a type record
pub const TYPE_DOCUMENT: &str = "type";

/// A type node as written by the catalog ingestion pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatalogType {
    Array {
        element: Box<CatalogNode>,
    },
    ByRef {
        element: Box<CatalogNode>,
    },
    Func {
        prototype: Vec<CatalogNode>,
    },
    Generic {
        name: String,
    },
    GenericApp {
        #[serde(rename = "tyCon")]
        ty_con: Box<CatalogNode>,
        args: Vec<CatalogNode>,
    },
    Keyword {
        name: String,
    },
    Tuple {
        args: Vec<CatalogNode>,
    },
    Def {
        name: String,
    },
}

/// A catalog type node, or any shape this version does not recognize
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogNode {
    Known(CatalogType),
    Unknown(Value),
}

/// A method, property, event or field of a catalog type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Vec<CatalogNode>>,
}

/// A catalog document; only documents whose `type` is `"type"` are indexed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(rename = "type", default)]
    pub doc_type: String,
    #[serde(rename = "_rev", default)]
    pub revision: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub assembly: Option<String>,
    #[serde(default)]
    pub assembly_name: Option<String>,
    #[serde(default)]
    pub methods: Vec<CatalogMember>,
    #[serde(default)]
    pub properties: Vec<CatalogMember>,
    #[serde(default)]
    pub events: Vec<CatalogMember>,
    #[serde(default)]
    pub fields: Vec<CatalogMember>,
}

impl CatalogDocument {
    pub fn is_type(&self) -> bool {
        self.doc_type == TYPE_DOCUMENT
    }

    /// Key of the owning type attached to every row emitted for this document
    pub fn key(&self) -> MemberKey {
        MemberKey {
            revision: self.revision.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }

    /// `namespace.name`, or just the name for the global namespace
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    /// All members with their kinds, in document order
    pub fn members(&self) -> impl Iterator<Item = (MemberKind, &CatalogMember)> {
        self.methods
            .iter()
            .map(|m| (MemberKind::Method, m))
            .chain(self.properties.iter().map(|m| (MemberKind::Property, m)))
            .chain(self.events.iter().map(|m| (MemberKind::Event, m)))
            .chain(self.fields.iter().map(|m| (MemberKind::Field, m)))
    }

    /// Members whose prototypes go into the signature views
    pub fn signature_members(&self) -> impl Iterator<Item = &CatalogMember> {
        self.methods.iter().chain(self.properties.iter())
    }
}

/// Map a catalog type node onto its canonical form
pub fn normalize(node: &CatalogNode) -> TypeNode {
    match node {
        CatalogNode::Known(known) => match known {
            CatalogType::Array { element } => TypeNode::Array(Box::new(normalize(element))),
            CatalogType::ByRef { element } => TypeNode::ByRef(Box::new(normalize(element))),
            CatalogType::Func { prototype } => TypeNode::List(normalize_prototype(prototype)),
            CatalogType::Generic { name }
            | CatalogType::Keyword { name }
            | CatalogType::Def { name } => TypeNode::Atom(name.clone()),
            CatalogType::GenericApp { ty_con, args } => {
                TypeNode::generic(normalize(ty_con), normalize_prototype(args))
            }
            CatalogType::Tuple { args } => TypeNode::Tuple(normalize_prototype(args)),
        },
        CatalogNode::Unknown(value) => TypeNode::from(value.clone()),
    }
}

/// Normalize every node of a prototype, preserving order
pub fn normalize_prototype(nodes: &[CatalogNode]) -> Vec<TypeNode> {
    nodes.iter().map(normalize).collect()
}
