//! Lexer for Vela using logos with string interning.
//!
//! Produces a [`TokenList`] whose last token is always EOF; identifiers
//! and string literals are interned through the shared [`StringInterner`].

use logos::Logos;
use vela_ir::{Span, StringInterner, Token, TokenKind, TokenList};

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r]+")] // Skip horizontal whitespace
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("\n")]
    Newline,

    #[token("fn")]
    Fn,
    #[token("type")]
    Type,
    #[token("let")]
    Let,
    #[token("mut")]
    Mut,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("return")]
    Return,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("and")]
    And,
    #[token("or")]
    Or,

    #[token("#line")]
    LineDirective,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("|")]
    Pipe,
    #[token("->")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("=")]
    Eq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("!")]
    Bang,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,
}

/// Process the escape sequences the language supports.
///
/// Unknown escapes are kept verbatim; the parser reports them when it
/// cares, the lexer never fails on them.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Lex a source buffer into a [`TokenList`].
///
/// Unlexable byte sequences become [`TokenKind::Unknown`] tokens; the
/// parser turns them into diagnostics so that lexing itself never fails.
pub fn lex(source: &str, interner: &StringInterner) -> TokenList {
    let mut tokens = TokenList::with_capacity(source.len() / 4 + 1);
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::from_range(lexer.span());
        let kind = match result {
            Err(()) => TokenKind::Unknown,
            Ok(RawToken::LineComment) => continue,
            Ok(RawToken::Newline) => TokenKind::Newline,
            Ok(RawToken::Fn) => TokenKind::Fn,
            Ok(RawToken::Type) => TokenKind::Type,
            Ok(RawToken::Let) => TokenKind::Let,
            Ok(RawToken::Mut) => TokenKind::Mut,
            Ok(RawToken::If) => TokenKind::If,
            Ok(RawToken::Else) => TokenKind::Else,
            Ok(RawToken::Return) => TokenKind::Return,
            Ok(RawToken::True) => TokenKind::True,
            Ok(RawToken::False) => TokenKind::False,
            Ok(RawToken::And) => TokenKind::And,
            Ok(RawToken::Or) => TokenKind::Or,
            Ok(RawToken::LineDirective) => TokenKind::LineDirective,
            Ok(RawToken::LParen) => TokenKind::LParen,
            Ok(RawToken::RParen) => TokenKind::RParen,
            Ok(RawToken::LBrace) => TokenKind::LBrace,
            Ok(RawToken::RBrace) => TokenKind::RBrace,
            Ok(RawToken::Comma) => TokenKind::Comma,
            Ok(RawToken::Colon) => TokenKind::Colon,
            Ok(RawToken::Dot) => TokenKind::Dot,
            Ok(RawToken::Pipe) => TokenKind::Pipe,
            Ok(RawToken::Arrow) => TokenKind::Arrow,
            Ok(RawToken::EqEq) => TokenKind::EqEq,
            Ok(RawToken::Eq) => TokenKind::Eq,
            Ok(RawToken::NotEq) => TokenKind::NotEq,
            Ok(RawToken::Lt) => TokenKind::Lt,
            Ok(RawToken::Gt) => TokenKind::Gt,
            Ok(RawToken::Plus) => TokenKind::Plus,
            Ok(RawToken::Minus) => TokenKind::Minus,
            Ok(RawToken::Star) => TokenKind::Star,
            Ok(RawToken::Slash) => TokenKind::Slash,
            Ok(RawToken::Bang) => TokenKind::Bang,
            Ok(RawToken::Int) => match lexer.slice().parse::<i64>() {
                Ok(value) => TokenKind::Int(value),
                Err(_) => TokenKind::Unknown,
            },
            Ok(RawToken::Str) => {
                let slice = lexer.slice();
                // Strip the surrounding quotes before unescaping.
                let inner = &slice[1..slice.len() - 1];
                TokenKind::Str(interner.intern(&unescape(inner)))
            }
            Ok(RawToken::Ident) => TokenKind::Ident(interner.intern(lexer.slice())),
        };
        tokens.push(Token::new(kind, span));
    }

    let end = Span::from_range(source.len()..source.len());
    tokens.push(Token::new(TokenKind::Eof, end));
    tokens
}
