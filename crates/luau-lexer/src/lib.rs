//! Luau Lexer - Tokenization using logos
//!
//! Contextual keywords (`type`, `export`, `typeof`, `continue`) are lexed as
//! plain names; the parser decides from context. Comments are kept aside so
//! the parser can read `--!strict`-style hot comments.

mod token;

pub use token::*;

use logos::Logos;
use luau_ast::Span;

/// Result of tokenizing one source text
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    /// Significant tokens, always terminated by `Eof`
    pub tokens: Vec<Token>,
    /// Spans of all comments, in source order
    pub comments: Vec<Span>,
}

/// Tokenize a source string into a vector of tokens
pub fn tokenize(source: &str) -> Vec<Token> {
    tokenize_with_comments(source).tokens
}

/// Tokenize a source string, keeping comment spans separately
pub fn tokenize_with_comments(source: &str) -> Tokens {
    let mut tokens = Vec::new();
    let mut comments = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        let kind = match result {
            Ok(TokenKind::Comment) => {
                comments.push(span);
                continue;
            }
            Ok(kind) => kind,
            Err(_) => TokenKind::Error,
        };
        tokens.push(Token { kind, span });
    }

    // Add EOF token
    let end = source.len();
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(end, end),
    });

    Tokens { tokens, comments }
}

/// A token with its span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("local x: number = 5"),
            vec![
                TokenKind::Local,
                TokenKind::Name,
                TokenKind::Colon,
                TokenKind::Name,
                TokenKind::Eq,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_dots_and_compound_ops() {
        assert_eq!(
            kinds("a .. b ... c ..= d //= e"),
            vec![
                TokenKind::Name,
                TokenKind::DotDot,
                TokenKind::Name,
                TokenKind::Ellipsis,
                TokenKind::Name,
                TokenKind::DotDotEq,
                TokenKind::Name,
                TokenKind::SlashSlashEq,
                TokenKind::Name,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        let source = r#"'hi' "a\"b" [[long
string]] [==[ x ]] y ]==]"#;
        let tokens = tokenize(source);
        assert_eq!(tokens.len(), 5);
        assert!(tokens[..4].iter().all(|t| t.kind == TokenKind::String));
        assert_eq!(tokens[1].text(source), r#""a\"b""#);
        assert_eq!(tokens[3].text(source), "[==[ x ]] y ]==]");
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let tokens = tokenize("local s = 'abc\nlocal t = 1");
        assert_eq!(tokens[3].kind, TokenKind::Error);
        assert_eq!(tokens[4].kind, TokenKind::Local);
    }

    #[test]
    fn test_comments_are_collected() {
        let source = "--!strict\nlocal a --[[ inline ]] = 1 -- trailing\n--[=[\nblock\n]=]";
        let result = tokenize_with_comments(source);
        assert_eq!(result.comments.len(), 4);
        assert_eq!(&source[result.comments[0].start..result.comments[0].end], "--!strict");
        assert_eq!(
            result.tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![TokenKind::Local, TokenKind::Name, TokenKind::Eq, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers() {
        let source = "1 0x1F 0b101 3.25 1e10 .5 1_000";
        assert!(tokenize(source)[..7].iter().all(|t| t.kind == TokenKind::Number));
    }

    #[test]
    fn test_long_bracket_level() {
        assert_eq!(long_bracket_level("[[x"), Some(0));
        assert_eq!(long_bracket_level("[==[x"), Some(2));
        assert_eq!(long_bracket_level("[=x"), None);
        assert_eq!(long_bracket_level("x"), None);
    }
}
