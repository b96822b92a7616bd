//! Recursive-descent parser for signature queries
//!
//! A query is either a bare member name (`TryParse`) or a prototype
//! (`: string -> int option`, or just `string -> int option`). The parser is
//! an explicit state machine over [`Lexeme`]s; parenthesized groups and
//! angle-bracket argument lists recurse into the same machine and resume
//! right after their closing delimiter.
//!
//! Post-fix constructors apply to the node completed last, left to right:
//! `int list option` is `(int list) option`. Inside a tuple that node is the
//! last component, so `int * string list` is `int * (string list)`.
//!
//! Errors are raised at the offending lexeme. Nesting deeper than
//! [`MAX_DEPTH`] groups is rejected rather than recursed into.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::lexer::{tokenize, Lexeme};
use crate::signature::TypeNode;

/// Deepest nesting of `(` and `<` groups accepted in one query
pub const MAX_DEPTH: usize = 128;

/// Result of parsing a query
///
/// At most one of the fields should be set; the planner rejects queries that
/// set both. A query with neither is empty and matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prototype: Option<Vec<TypeNode>>,
}

impl ParsedQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            prototype: None,
        }
    }

    pub fn by_prototype(prototype: Vec<TypeNode>) -> Self {
        Self {
            name: None,
            prototype: Some(prototype),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.prototype.is_none()
    }
}

/// A parsed level together with where the caller should resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub query: ParsedQuery,
    /// Index just past the lexeme that ended this level
    pub next: usize,
    /// The lexeme that ended this level, `None` at end of input
    pub closed_by: Option<Lexeme>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// S0: a member name, or `:`/`(` starting a prototype
    NameOrColon,
    /// S1: a type
    Type,
    /// S2: after a bare name; `:`, `->` or a post-fix constructor
    ColonOrPostfix,
    /// S3: after a type; `->`, `*`, `<` or a post-fix constructor
    ArrowOrPostfix,
    /// S4: the next component of a tuple
    TupleMember,
}

/// What opened the level being parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Top,
    Paren,
    Angle,
}

impl Delimiter {
    fn closes(self, lexeme: &Lexeme) -> bool {
        match self {
            Delimiter::Top | Delimiter::Paren => *lexeme == Lexeme::CloseParen,
            Delimiter::Angle => matches!(lexeme, Lexeme::Comma | Lexeme::Gt),
        }
    }
}

/// Query under construction for one level
#[derive(Debug, Default)]
struct Level {
    name: Option<String>,
    prototype: Option<Vec<TypeNode>>,
    /// The last prototype element is a tuple still accepting components
    open_tuple: bool,
}

impl Level {
    fn begin_prototype(&mut self) {
        self.prototype.get_or_insert_with(Vec::new);
    }

    fn promote_name(&mut self) {
        if let Some(name) = self.name.take() {
            self.push(TypeNode::Atom(name));
        }
    }

    fn push(&mut self, node: TypeNode) {
        self.prototype.get_or_insert_with(Vec::new).push(node);
        self.open_tuple = false;
    }

    fn last_mut(&mut self) -> Option<&mut TypeNode> {
        self.prototype.as_mut()?.last_mut()
    }

    /// The node post-fix constructors apply to
    fn running_node(&mut self) -> Option<&mut TypeNode> {
        let open_tuple = self.open_tuple;
        let last = self.last_mut()?;
        if open_tuple && matches!(last, TypeNode::Tuple(_)) {
            match last {
                TypeNode::Tuple(components) => components.last_mut(),
                _ => None,
            }
        } else {
            Some(last)
        }
    }

    fn apply_postfix(&mut self, con: &str) {
        if let Some(node) = self.running_node() {
            let operand = std::mem::replace(node, TypeNode::List(Vec::new()));
            *node = if con == "array" {
                TypeNode::Array(Box::new(operand))
            } else {
                TypeNode::generic(TypeNode::atom(con), vec![operand])
            };
        }
    }

    fn apply_type_args(&mut self, args: Vec<TypeNode>) {
        if let Some(node) = self.running_node() {
            let con = std::mem::replace(node, TypeNode::List(Vec::new()));
            *node = TypeNode::generic(con, args);
        }
    }

    fn begin_tuple(&mut self) {
        let open_tuple = self.open_tuple;
        if let Some(last) = self.last_mut() {
            if !(open_tuple && matches!(last, TypeNode::Tuple(_))) {
                let first = std::mem::replace(last, TypeNode::Tuple(Vec::new()));
                *last = TypeNode::Tuple(vec![first]);
            }
            self.open_tuple = true;
        }
    }

    fn push_component(&mut self, node: TypeNode) {
        if let Some(TypeNode::Tuple(components)) = self.last_mut() {
            components.push(node);
        }
    }

    /// Finish the tuple being built; a lone component is not a tuple
    fn close_tuple(&mut self) {
        if self.open_tuple {
            if let Some(last) = self.last_mut() {
                if let TypeNode::Tuple(components) = last {
                    if components.len() == 1 {
                        if let Some(only) = components.pop() {
                            *last = only;
                        }
                    }
                }
            }
            self.open_tuple = false;
        }
    }

    fn finish(mut self) -> ParsedQuery {
        self.close_tuple();
        ParsedQuery {
            name: self.name,
            prototype: self.prototype,
        }
    }
}

/// Parse query text
pub fn parse_query(text: &str) -> Result<ParsedQuery, ParseError> {
    parse(&tokenize(text))
}

/// Parse a whole lexeme sequence
pub fn parse(tokens: &[Lexeme]) -> Result<ParsedQuery, ParseError> {
    Ok(parse_fragment(tokens, 0)?.query)
}

/// Parse from `start` until the end of input or a stray `)`
pub fn parse_fragment(tokens: &[Lexeme], start: usize) -> Result<Fragment, ParseError> {
    parse_level(tokens, start, Delimiter::Top, 0)
}

fn parse_level(
    tokens: &[Lexeme],
    start: usize,
    delimiter: Delimiter,
    depth: usize,
) -> Result<Fragment, ParseError> {
    if depth > MAX_DEPTH {
        return Err(ParseError::TooDeep {
            position: start.saturating_sub(1),
        });
    }

    let mut level = Level::default();
    let mut closed_by = None;
    let mut i = start;

    // Nested levels are always in type position
    let mut state = if delimiter == Delimiter::Top {
        State::NameOrColon
    } else {
        level.begin_prototype();
        State::Type
    };

    let expecting_type = |i: usize, token: &Lexeme| ParseError::ExpectingType {
        position: i,
        found: token.text().to_string(),
    };

    while i < tokens.len() {
        let token = &tokens[i];

        match state {
            State::NameOrColon => match token {
                Lexeme::Colon => {
                    level.begin_prototype();
                    state = State::Type;
                    i += 1;
                }
                Lexeme::OpenParen => {
                    // Re-read by State::Type as the first parameter's group
                    level.begin_prototype();
                    state = State::Type;
                }
                other => {
                    level.name = Some(other.text().to_string());
                    state = State::ColonOrPostfix;
                    i += 1;
                }
            },

            State::Type => match token {
                Lexeme::OpenParen => {
                    let (node, next) = parse_group(tokens, i + 1, depth + 1)?;
                    level.push(node);
                    state = State::ArrowOrPostfix;
                    i = next;
                }
                Lexeme::Name(name) => {
                    level.push(TypeNode::atom(name));
                    state = State::ArrowOrPostfix;
                    i += 1;
                }
                other => return Err(expecting_type(i, other)),
            },

            State::ColonOrPostfix => match token {
                Lexeme::Colon => {
                    level.begin_prototype();
                    state = State::Type;
                    i += 1;
                }
                _ => {
                    level.promote_name();
                    state = State::ArrowOrPostfix;
                }
            },

            State::ArrowOrPostfix => match token {
                Lexeme::Arrow => {
                    level.close_tuple();
                    state = State::Type;
                    i += 1;
                }
                closer if delimiter.closes(closer) => {
                    closed_by = Some(closer.clone());
                    i += 1;
                    break;
                }
                Lexeme::Star => {
                    level.begin_tuple();
                    state = State::TupleMember;
                    i += 1;
                }
                Lexeme::Lt => {
                    let (args, next) = parse_type_args(tokens, i + 1, depth + 1)?;
                    level.apply_type_args(args);
                    i = next;
                }
                Lexeme::Name(con) => {
                    level.apply_postfix(con);
                    i += 1;
                }
                other => {
                    return Err(ParseError::Unexpected {
                        position: i,
                        found: other.text().to_string(),
                    });
                }
            },

            State::TupleMember => match token {
                Lexeme::Arrow => {
                    level.close_tuple();
                    state = State::Type;
                    i += 1;
                }
                closer if delimiter.closes(closer) => {
                    closed_by = Some(closer.clone());
                    i += 1;
                    break;
                }
                Lexeme::Name(name) => {
                    level.push_component(TypeNode::atom(name));
                    state = State::ArrowOrPostfix;
                    i += 1;
                }
                Lexeme::OpenParen => {
                    let (node, next) = parse_group(tokens, i + 1, depth + 1)?;
                    level.push_component(node);
                    state = State::ArrowOrPostfix;
                    i = next;
                }
                other => return Err(expecting_type(i, other)),
            },
        }
    }

    Ok(Fragment {
        query: level.finish(),
        next: i,
        closed_by,
    })
}

/// Parse a parenthesized group starting just after `(`
///
/// A group holding one node is plain grouping (`(int * string)`); two or
/// more nodes form a nested signature (`(int -> bool)`).
fn parse_group(tokens: &[Lexeme], start: usize, depth: usize) -> Result<(TypeNode, usize), ParseError> {
    let fragment = parse_level(tokens, start, Delimiter::Paren, depth)?;
    let mut nodes = fragment.query.prototype.unwrap_or_default();

    let node = if nodes.len() == 1 {
        nodes.remove(0)
    } else {
        TypeNode::List(nodes)
    };

    Ok((node, fragment.next))
}

/// Parse `a, b, c>` starting just after `<`
fn parse_type_args(
    tokens: &[Lexeme],
    start: usize,
    depth: usize,
) -> Result<(Vec<TypeNode>, usize), ParseError> {
    let mut args = Vec::new();
    let mut i = start;

    loop {
        let fragment = parse_level(tokens, i, Delimiter::Angle, depth)?;
        let mut nodes = fragment.query.prototype.unwrap_or_default();
        match nodes.len() {
            0 => {}
            1 => args.push(nodes.remove(0)),
            _ => args.push(TypeNode::List(nodes)),
        }
        i = fragment.next;

        if fragment.closed_by != Some(Lexeme::Comma) {
            return Ok((args, i));
        }
    }
}
