//! Luau Parser - Recursive descent parser
//!
//! Parses Luau source code into an AST. The parser never gives up on a
//! module: syntax errors are collected and the recovered tree is returned
//! alongside them.
//! Key parsing details:
//! - Locals are resolved while parsing, so every identifier is either a
//!   `Local` pointing at its binding or a `Global`
//! - `type`, `export`, `typeof` and `continue` are contextual keywords
//! - Hot comments (`--!strict`) are read from the comments before the first token

mod error;
mod parser;

pub use error::*;
pub use parser::*;

use luau_ast::{Chunk, HotComment, Span, TypeExpr};
use luau_lexer::{tokenize, tokenize_with_comments, TokenKind};

/// A parsed module together with its syntax errors
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub chunk: Chunk,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a source string into a Chunk, collecting syntax errors
pub fn parse(source: &str) -> ParseResult {
    let lexed = tokenize_with_comments(source);
    let first_token = lexed.tokens.first().map(|t| t.span.start).unwrap_or(source.len());
    let hot_comments = lexed
        .comments
        .iter()
        .filter(|span| span.start < first_token)
        .filter_map(|span| hot_comment(source, *span))
        .collect();

    let mut parser = Parser::new(source, lexed.tokens);
    let mut chunk = parser.parse_chunk();
    chunk.hot_comments = hot_comments;

    let mut errors = parser.into_errors();
    errors.sort_by_key(|err| err.span().start);
    ParseResult { chunk, errors }
}

/// Parse a standalone type annotation such as `(number) -> string`
pub fn parse_type(source: &str) -> Result<TypeExpr, ParseError> {
    let tokens = tokenize(source);
    let mut parser = Parser::new(source, tokens);
    let ty = parser.parse_type()?;
    if let Some(err) = parser.errors().first() {
        return Err(err.clone());
    }
    let rest = tokenize(&source[ty.span.end..]);
    match rest.first() {
        Some(token) if token.kind != TokenKind::Eof => Err(ParseError::unexpected(
            "<eof>",
            token.kind.describe(),
            Span::new(ty.span.end + token.span.start, ty.span.end + token.span.end),
        )),
        _ => Ok(ty),
    }
}

fn hot_comment(source: &str, span: Span) -> Option<HotComment> {
    let text = &source[span.start..span.end];
    let body = text.strip_prefix("--!")?;
    let name = body.split_whitespace().next()?;
    Some(HotComment {
        name: name.to_string(),
        span,
    })
}
