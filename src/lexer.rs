//! Tokenizer for signature queries
//!
//! Splits free-form query text such as `int -> string list -> _` into a flat
//! sequence of [`Lexeme`]s. Tokenizing never fails: any input produces a
//! (possibly empty) sequence.

use std::fmt;

/// Characters that always terminate a name and become lexemes of their own
const SYMBOLS: &str = ":()<>-*,";

/// A single lexical unit of a signature query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme {
    /// A run of non-space, non-symbol characters
    Name(String),
    /// `:`
    Colon,
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// `->` (a `-` immediately followed by `>`)
    Arrow,
    /// `*`
    Star,
    /// `<`
    Lt,
    /// `>` not preceded by `-`
    Gt,
    /// `-` not followed by `>`
    Dash,
    /// `,`
    Comma,
}

impl Lexeme {
    fn from_symbol(c: char) -> Option<Self> {
        match c {
            ':' => Some(Lexeme::Colon),
            '(' => Some(Lexeme::OpenParen),
            ')' => Some(Lexeme::CloseParen),
            '<' => Some(Lexeme::Lt),
            '>' => Some(Lexeme::Gt),
            '-' => Some(Lexeme::Dash),
            '*' => Some(Lexeme::Star),
            ',' => Some(Lexeme::Comma),
            _ => None,
        }
    }

    /// Source text of the lexeme
    pub fn text(&self) -> &str {
        match self {
            Lexeme::Name(name) => name,
            Lexeme::Colon => ":",
            Lexeme::OpenParen => "(",
            Lexeme::CloseParen => ")",
            Lexeme::Arrow => "->",
            Lexeme::Star => "*",
            Lexeme::Lt => "<",
            Lexeme::Gt => ">",
            Lexeme::Dash => "-",
            Lexeme::Comma => ",",
        }
    }
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Split query text into lexemes
///
/// Names are flushed whenever a space or symbol character is seen. A `>`
/// whose previously emitted lexeme is a bare `-` replaces that lexeme with
/// [`Lexeme::Arrow`], even when whitespace separates the two characters.
pub fn tokenize(text: &str) -> Vec<Lexeme> {
    let mut lexemes = Vec::new();
    let mut word = String::new();

    for c in text.chars() {
        let is_symbol = SYMBOLS.contains(c);

        if c.is_whitespace() || is_symbol {
            if !word.is_empty() {
                lexemes.push(Lexeme::Name(std::mem::take(&mut word)));
            }

            if let Some(symbol) = Lexeme::from_symbol(c) {
                if symbol == Lexeme::Gt && lexemes.last() == Some(&Lexeme::Dash) {
                    if let Some(last) = lexemes.last_mut() {
                        *last = Lexeme::Arrow;
                    }
                } else {
                    lexemes.push(symbol);
                }
            }
        } else {
            word.push(c);
        }
    }

    if !word.is_empty() {
        lexemes.push(Lexeme::Name(word));
    }

    lexemes
}
