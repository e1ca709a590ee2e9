//! Lexer for `.kry` files using logos

use logos::Logos;

/// Token types for the source language
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")] // Skip whitespace
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token<'src> {
    // Keywords
    #[token("component")]
    Component,
    #[token("extends")]
    Extends,
    #[token("const")]
    Const,
    #[token("state")]
    State,
    #[token("static")]
    Static,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("slot")]
    Slot,
    #[token("insert")]
    Insert,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Identifiers
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    /// `@hover`, `@breakpoint`
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*", |lex| &lex.slice()[1..])]
    At(&'src str),

    // Literals
    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len()-1]  // Strip quotes
    })]
    String(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r"[0-9]+(\.[0-9]+)?(px|%|fr)", |lex| lex.slice())]
    Dimension(&'src str),

    #[regex(r"#[0-9a-fA-F]+", |lex| &lex.slice()[1..])]
    Color(&'src str),

    // Operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("=")]
    Equals,
    #[token("==")]
    EqualsEquals,
    #[token("!=")]
    NotEquals,
    #[token("<")]
    LessThan,
    #[token("<=")]
    LessThanOrEqual,
    #[token(">")]
    GreaterThan,
    #[token(">=")]
    GreaterThanOrEqual,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("!")]
    Bang,

    // Punctuation
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(".")]
    Dot,
}

pub type SpannedToken<'src> = (Token<'src>, std::ops::Range<usize>);

/// Tokenize source, stopping at the first unrecognized character.
///
/// On failure returns the byte range of the offending input.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken<'_>>, std::ops::Range<usize>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(_) => return Err(span),
        }
    }
    Ok(tokens)
}
