//! Token types for the Simplex lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the expression language and
//! [`Token`], which pairs a kind with a source [`Span`].

use simplex_types::Span;
use std::fmt;

/// Reserved words.
///
/// The lexer emits a specific keyword token for each of these instead of
/// [`TokenKind::Identifier`]. Object literal keys and `.name` member access
/// still accept them.
pub const ALL_KEYWORDS: &[&str] = &[
    "true", "false", "null", "and", "or", "not", "typeof", "mod", "in", "if", "then", "else",
    "let",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Source location.
    pub span: Span,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

/// Every token kind in the language.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────

    /// Numeric literal: `42`, `3.14`, `.5`, `1e3`, `0xFF`
    NumberLit(f64),
    /// String literal with escapes resolved: `"hello"`, `'hello'`
    StringLiteral(String),
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,

    // ── Identifiers ──────────────────────────────────────────

    /// A user-defined name: `price`, `$total`, `ǅ`
    Identifier(String),

    // ── Keywords ──────────────────────────────────────────────

    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,
    /// `typeof`
    Typeof,
    /// `mod`
    Mod,
    /// `in`
    In,
    /// `if`
    If,
    /// `then`
    Then,
    /// `else`
    Else,
    /// `let`
    Let,

    // ── Operators ─────────────────────────────────────────────

    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `^`
    Caret,
    /// `&`
    Ampersand,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `??`
    QuestionQuestion,
    /// `|`
    Pipe,
    /// `|?`
    PipeQuestion,
    /// `=>`
    FatArrow,
    /// `=`
    Eq,

    // ── Punctuation ───────────────────────────────────────────

    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `:`
    Colon,
    /// `.`
    Dot,
    /// `::`
    ColonColon,
    /// `#`, the curry placeholder
    Hash,
    /// `%`, the pipe topic reference
    Percent,

    // ── Special ───────────────────────────────────────────────

    /// End of input.
    Eof,
}

impl TokenKind {
    /// Look up a keyword by its text. Returns `None` for non-keywords.
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        let kind = match s {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "typeof" => TokenKind::Typeof,
            "mod" => TokenKind::Mod,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "let" => TokenKind::Let,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns `true` if this is a reserved keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Not
                | TokenKind::Typeof
                | TokenKind::Mod
                | TokenKind::In
                | TokenKind::If
                | TokenKind::Then
                | TokenKind::Else
                | TokenKind::Let
        )
    }

    /// The text of a keyword token, usable where a name is expected
    /// (object keys, `.name` access).
    pub fn keyword_text(&self) -> Option<&'static str> {
        if self.is_keyword() {
            Some(self.static_text())
        } else {
            None
        }
    }

    fn static_text(&self) -> &'static str {
        match self {
            TokenKind::NumberLit(_) => "number",
            TokenKind::StringLiteral(_) => "string",
            TokenKind::Identifier(_) => "identifier",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::Typeof => "typeof",
            TokenKind::Mod => "mod",
            TokenKind::In => "in",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::Let => "let",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::Ampersand => "&",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEq => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEq => ">=",
            TokenKind::QuestionQuestion => "??",
            TokenKind::Pipe => "|",
            TokenKind::PipeQuestion => "|?",
            TokenKind::FatArrow => "=>",
            TokenKind::Eq => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::ColonColon => "::",
            TokenKind::Hash => "#",
            TokenKind::Percent => "%",
            TokenKind::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::NumberLit(n) => write!(f, "{n}"),
            TokenKind::StringLiteral(s) => write!(f, "\"{s}\""),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            other => write!(f, "{}", other.static_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simplex_types::Position;

    #[test]
    fn test_from_keyword_recognises_all() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw);
            assert!(kind.is_some(), "'{kw}' should be a keyword");
            assert!(kind.unwrap().is_keyword());
        }
    }

    #[test]
    fn test_from_keyword_returns_none_for_identifiers() {
        for name in ["x", "price", "Let", "IF", "typeOf", "undefined", "then_"] {
            assert_eq!(TokenKind::from_keyword(name), None, "'{name}'");
        }
    }

    #[test]
    fn test_keyword_text() {
        assert_eq!(TokenKind::Mod.keyword_text(), Some("mod"));
        assert_eq!(TokenKind::Let.keyword_text(), Some("let"));
        assert_eq!(TokenKind::Plus.keyword_text(), None);
        assert_eq!(TokenKind::Identifier("a".into()).keyword_text(), None);
    }

    #[test]
    fn test_display_round_trips_keywords() {
        for kw in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(kw).unwrap();
            assert_eq!(kind.to_string(), *kw);
        }
    }

    #[test]
    fn test_display_operators_and_literals() {
        assert_eq!(TokenKind::PipeQuestion.to_string(), "|?");
        assert_eq!(TokenKind::ColonColon.to_string(), "::");
        assert_eq!(TokenKind::NumberLit(1.5).to_string(), "1.5");
        assert_eq!(TokenKind::StringLiteral("a".into()).to_string(), "\"a\"");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
    }

    #[test]
    fn test_token_construction() {
        let span = Span::point(Position::new(0, 1, 1));
        let tok = Token::new(TokenKind::Let, span);
        assert!(tok.is_keyword());
        assert!(!Token::new(TokenKind::Identifier("x".into()), span).is_keyword());
    }
}
