//! Canonical type nodes and signature formatting
//!
//! [`TypeNode`] is the canonical form shared by parsed queries and indexed
//! catalog members. Its wire form is plain JSON and is what index keys are
//! built from, so both sides of a lookup must agree on it exactly:
//!
//! | node                | JSON                          |
//! |---------------------|-------------------------------|
//! | `Atom("int")`       | `"int"`                       |
//! | `List([a, b])`      | `[a, b]`                      |
//! | `Tuple([a, b])`     | `{"tuple": [a, b]}`           |
//! | `Array(a)`          | `{"array": a}`                |
//! | `Generic(c, [a])`   | `{"tyCon": c, "args": [a]}`   |
//! | `ByRef(a)`          | `{"byRef": a}`                |
//! | `Opaque(v)`         | `v`                           |

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Constructors rendered post-fix (`int list`) when applied to one argument
pub const POSTFIX_CONSTRUCTORS: &[&str] = &["array", "list", "option"];

/// Atom that matches anything when it opens or closes a prototype query
pub const WILDCARD: &str = "_";

/// A node of a type expression in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Value", from = "Value")]
pub enum TypeNode {
    /// Bare identifier: primitive, type variable or type constructor name
    Atom(String),
    /// Parenthesized nested signature, e.g. a function-typed parameter
    List(Vec<TypeNode>),
    /// `a * b * c`
    Tuple(Vec<TypeNode>),
    /// `a array`
    Array(Box<TypeNode>),
    /// Generic application `con<args>`, written `arg con` for a single argument
    Generic {
        con: Box<TypeNode>,
        args: Vec<TypeNode>,
    },
    /// By-reference catalog parameter; no query syntax produces it
    ByRef(Box<TypeNode>),
    /// Unrecognized catalog shape, carried through untouched
    Opaque(Value),
}

impl TypeNode {
    pub fn atom(name: impl Into<String>) -> Self {
        TypeNode::Atom(name.into())
    }

    pub fn generic(con: TypeNode, args: Vec<TypeNode>) -> Self {
        TypeNode::Generic {
            con: Box::new(con),
            args,
        }
    }

    /// Name of an `Atom`, `None` for structured nodes
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            TypeNode::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_atom() == Some(WILDCARD)
    }

    /// The JSON value this node is keyed on in the index
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

impl From<TypeNode> for Value {
    fn from(node: TypeNode) -> Self {
        fn single(key: &str, value: Value) -> Value {
            let mut map = Map::new();
            map.insert(key.to_string(), value);
            Value::Object(map)
        }

        match node {
            TypeNode::Atom(name) => Value::String(name),
            TypeNode::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            TypeNode::Tuple(items) => single(
                "tuple",
                Value::Array(items.into_iter().map(Value::from).collect()),
            ),
            TypeNode::Array(element) => single("array", Value::from(*element)),
            TypeNode::Generic { con, args } => {
                let mut map = Map::new();
                map.insert("tyCon".to_string(), Value::from(*con));
                map.insert(
                    "args".to_string(),
                    Value::Array(args.into_iter().map(Value::from).collect()),
                );
                Value::Object(map)
            }
            TypeNode::ByRef(element) => single("byRef", Value::from(*element)),
            TypeNode::Opaque(value) => value,
        }
    }
}

impl From<Value> for TypeNode {
    fn from(value: Value) -> Self {
        match value {
            Value::String(name) => TypeNode::Atom(name),
            Value::Array(items) => TypeNode::List(items.into_iter().map(TypeNode::from).collect()),
            Value::Object(mut map) => {
                if map.len() == 1 {
                    if let Some(Value::Array(items)) = map.get("tuple") {
                        return TypeNode::Tuple(items.iter().cloned().map(TypeNode::from).collect());
                    }
                    if let Some(element) = map.remove("array") {
                        return TypeNode::Array(Box::new(TypeNode::from(element)));
                    }
                    if let Some(element) = map.remove("byRef") {
                        return TypeNode::ByRef(Box::new(TypeNode::from(element)));
                    }
                } else if map.len() == 2 && map.contains_key("tyCon") {
                    if let Some(Value::Array(args)) = map.get("args") {
                        let args = args.iter().cloned().map(TypeNode::from).collect();
                        if let Some(con) = map.remove("tyCon") {
                            return TypeNode::generic(TypeNode::from(con), args);
                        }
                    }
                }
                TypeNode::Opaque(Value::Object(map))
            }
            other => TypeNode::Opaque(other),
        }
    }
}

/// Canonical index key of a whole prototype
pub fn signature_key(nodes: &[TypeNode]) -> Value {
    Value::Array(nodes.iter().map(TypeNode::to_value).collect())
}

/// Render one type node as display text
pub fn format_type(node: &TypeNode) -> String {
    match node {
        TypeNode::Atom(name) => name.clone(),
        TypeNode::List(items) => format!("({})", format_signature(items)),
        TypeNode::Array(element) => format!("{} array", format_operand(element)),
        TypeNode::Generic { con, args } => {
            let postfix = con
                .as_atom()
                .is_some_and(|name| POSTFIX_CONSTRUCTORS.contains(&name));

            if postfix && args.len() == 1 {
                format!("{} {}", format_operand(&args[0]), format_type(con))
            } else {
                let args: Vec<String> = args.iter().map(format_type).collect();
                format!("{}<{}>", format_type(con), args.join(", "))
            }
        }
        TypeNode::Tuple(items) => items
            .iter()
            .map(format_operand)
            .collect::<Vec<_>>()
            .join(" * "),
        TypeNode::ByRef(_) | TypeNode::Opaque(_) => node.to_value().to_string(),
    }
}

/// Operands of postfix constructors and tuple components: tuples need parens
fn format_operand(node: &TypeNode) -> String {
    match node {
        TypeNode::Tuple(_) => format!("({})", format_type(node)),
        _ => format_type(node),
    }
}

/// Render a prototype, joining its nodes with ` -> `
pub fn format_signature(nodes: &[TypeNode]) -> String {
    nodes
        .iter()
        .map(format_type)
        .collect::<Vec<_>>()
        .join(" -> ")
}

impl fmt::Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_type(self))
    }
}
