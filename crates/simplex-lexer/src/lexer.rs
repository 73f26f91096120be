//! Core Simplex lexer: converts expression text to a token stream.
//!
//! Features:
//! - Decimal (`42`, `42.`, `.5`, `1.2e-3`) and hexadecimal (`0x1F`) numbers
//! - Single- and double-quoted strings with JS-style escapes and line continuation
//! - Line (`//`) and block (`/* */`) comments, skipped like whitespace
//! - Unicode identifiers and Unicode whitespace (including the BOM)
//! - Error recovery: collects up to 20 errors instead of stopping at the first
//!
//! Positions are tracked as UTF-8 byte offsets plus 1-based line and
//! character columns.

use simplex_types::{CompileError, CompileErrors, ErrorCode, Position, SourceFile, Span, MAX_ERRORS};

use crate::token::{Token, TokenKind};

/// The Simplex lexer.
///
/// Converts source text into a vector of [`Token`]s, collecting up to
/// [`simplex_types::MAX_ERRORS`] errors along the way.
pub struct Lexer<'src> {
    /// The full source text.
    source: &'src str,
    /// Current byte offset into `source`.
    pos: usize,
    /// Current line number (1-based).
    line: u32,
    /// Current column number (1-based, in characters).
    col: u32,
    /// Collected errors.
    errors: CompileErrors,
}

/// Result of lexing: tokens + any errors collected.
pub struct LexResult {
    /// The token stream (always ends with [`TokenKind::Eof`]).
    pub tokens: Vec<Token>,
    /// Errors encountered during lexing.
    pub errors: CompileErrors,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source file.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: &source_file.source,
            pos: 0,
            line: 1,
            col: 1,
            errors: CompileErrors::empty(),
        }
    }

    /// Lex the entire source into a token stream.
    pub fn lex(mut self) -> LexResult {
        let mut tokens = Vec::new();

        loop {
            if self.errors.total_errors >= MAX_ERRORS {
                break;
            }
            let token = self.scan_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        // Ensure token stream always ends with Eof
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            tokens.push(Token::new(TokenKind::Eof, Span::point(self.position())));
        }

        LexResult {
            tokens,
            errors: self.errors,
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Character-level helpers
    // ─────────────────────────────────────────────────────────────

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.source[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn position(&self) -> Position {
        Position::new(self.pos as u32, self.line, self.col)
    }

    fn span_from(&self, start: Position) -> Span {
        Span::new(start, self.position())
    }

    fn text_from(&self, start: Position) -> &'src str {
        &self.source[start.offset as usize..self.pos]
    }

    fn emit_error(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let err = CompileError::new(code, message, span).with_expression(self.source);
        self.errors.push_error(err);
    }

    // ─────────────────────────────────────────────────────────────
    // Whitespace & comments
    // ─────────────────────────────────────────────────────────────

    /// Skip whitespace, line comments and block comments.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(ch) if is_whitespace(ch) => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => self.skip_block_comment(),
                _ => break,
            }
        }
    }

    fn skip_block_comment(&mut self) {
        let start = self.position();
        // Consume `/*`
        self.advance();
        self.advance();
        loop {
            match self.peek() {
                None => {
                    let span = self.span_from(start);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_COMMENT,
                        "Unterminated comment",
                        span,
                    );
                    return;
                }
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Token scanning
    // ─────────────────────────────────────────────────────────────

    /// Scan one token.
    fn scan_token(&mut self) -> Token {
        loop {
            self.skip_trivia();

            // If we've hit the error cap, stop immediately
            if self.errors.total_errors >= MAX_ERRORS {
                return Token::new(TokenKind::Eof, Span::point(self.position()));
            }

            let start = self.position();
            let Some(ch) = self.advance() else {
                return Token::new(TokenKind::Eof, Span::point(start));
            };

            let kind = match ch {
                // ── String literal ──
                '"' | '\'' => return self.scan_string(ch, start),

                // ── Number literal ──
                '0'..='9' => return self.scan_number(start),
                '.' if matches!(self.peek(), Some('0'..='9')) => return self.scan_number(start),

                // ── Identifiers & keywords ──
                c if is_identifier_start(c) => return self.scan_identifier(start),

                // ── Operators & punctuation ──
                '+' => TokenKind::Plus,
                '-' => TokenKind::Minus,
                '*' => TokenKind::Star,
                '/' => TokenKind::Slash,
                '^' => TokenKind::Caret,
                '&' => TokenKind::Ampersand,
                '#' => TokenKind::Hash,
                '%' => TokenKind::Percent,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ',' => TokenKind::Comma,
                '.' => TokenKind::Dot,

                '=' => {
                    if self.eat('=') {
                        TokenKind::EqEq
                    } else if self.eat('>') {
                        TokenKind::FatArrow
                    } else {
                        TokenKind::Eq
                    }
                }
                '<' => {
                    if self.eat('=') {
                        TokenKind::LessEq
                    } else {
                        TokenKind::Less
                    }
                }
                '>' => {
                    if self.eat('=') {
                        TokenKind::GreaterEq
                    } else {
                        TokenKind::Greater
                    }
                }
                '|' => {
                    if self.eat('?') {
                        TokenKind::PipeQuestion
                    } else {
                        TokenKind::Pipe
                    }
                }
                ':' => {
                    if self.eat(':') {
                        TokenKind::ColonColon
                    } else {
                        TokenKind::Colon
                    }
                }
                '?' if self.peek() == Some('?') => {
                    self.advance();
                    TokenKind::QuestionQuestion
                }
                '!' if self.peek() == Some('=') => {
                    self.advance();
                    TokenKind::BangEq
                }

                _ => {
                    let span = self.span_from(start);
                    let message = if ch == '!' {
                        "Unexpected character '!', use 'not' for negation or '!=' for inequality"
                            .to_string()
                    } else {
                        format!("Unexpected character '{ch}'")
                    };
                    self.emit_error(ErrorCode::UNEXPECTED_CHARACTER, message, span);
                    // Error recovery: skip the character and try again
                    continue;
                }
            };

            return Token::new(kind, self.span_from(start));
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Number literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a number. The first character (a digit or `.`) is already consumed.
    fn scan_number(&mut self, start: Position) -> Token {
        let first = self.text_from(start);

        if first == "0" && matches!(self.peek(), Some('x' | 'X')) {
            return self.scan_hex_number(start);
        }

        let mut valid = true;
        if first == "0" && matches!(self.peek(), Some('0'..='9')) {
            // Legacy octal-looking literals are rejected
            valid = false;
        }

        self.skip_digits();
        if first != "." && self.eat('.') {
            self.skip_digits();
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if !matches!(self.peek(), Some('0'..='9')) {
                valid = false;
            }
            self.skip_digits();
        }

        if self.peek().is_some_and(|c| is_identifier_part(c)) {
            // `3in`, `1px` and the like
            valid = false;
            while self.peek().is_some_and(is_identifier_part) {
                self.advance();
            }
        }

        let span = self.span_from(start);
        let text = self.text_from(start);
        match text.parse::<f64>() {
            Ok(value) if valid => Token::new(TokenKind::NumberLit(value), span),
            _ => {
                self.emit_error(
                    ErrorCode::INVALID_NUMBER,
                    format!("Invalid number '{text}'"),
                    span,
                );
                Token::new(TokenKind::NumberLit(f64::NAN), span)
            }
        }
    }

    fn scan_hex_number(&mut self, start: Position) -> Token {
        self.advance(); // consume 'x'
        let mut value = 0f64;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
            self.advance();
            value = value * 16.0 + f64::from(d);
            digits += 1;
        }
        let trailing = self.peek().is_some_and(is_identifier_part);
        while self.peek().is_some_and(is_identifier_part) {
            self.advance();
        }

        let span = self.span_from(start);
        if digits == 0 || trailing {
            let text = self.text_from(start);
            self.emit_error(
                ErrorCode::INVALID_NUMBER,
                format!("Invalid number '{text}'"),
                span,
            );
            return Token::new(TokenKind::NumberLit(f64::NAN), span);
        }
        Token::new(TokenKind::NumberLit(value), span)
    }

    fn skip_digits(&mut self) {
        while let Some('0'..='9') = self.peek() {
            self.advance();
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Identifiers & keywords
    // ─────────────────────────────────────────────────────────────

    fn scan_identifier(&mut self, start: Position) -> Token {
        // First character was already consumed
        while self.peek().is_some_and(is_identifier_part) {
            self.advance();
        }

        let span = self.span_from(start);
        let text = self.text_from(start);
        let kind =
            TokenKind::from_keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));

        Token::new(kind, span)
    }

    // ─────────────────────────────────────────────────────────────
    // String literals
    // ─────────────────────────────────────────────────────────────

    /// Scan a string literal starting after the opening quote.
    fn scan_string(&mut self, quote: char, start: Position) -> Token {
        let mut buf = String::new();

        loop {
            match self.peek() {
                None | Some('\n') => {
                    let span = self.span_from(start);
                    self.emit_error(
                        ErrorCode::UNTERMINATED_STRING,
                        "Unterminated string literal",
                        span,
                    );
                    return Token::new(TokenKind::StringLiteral(buf), span);
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Token::new(TokenKind::StringLiteral(buf), self.span_from(start));
                }
                Some('\\') => {
                    if let Some(escaped) = self.scan_escape_sequence() {
                        buf.push(escaped);
                    }
                }
                Some(ch) => {
                    self.advance();
                    buf.push(ch);
                }
            }
        }
    }

    /// Scan an escape sequence at the `\`.
    /// Returns the unescaped character, or `None` for a line continuation or
    /// an invalid sequence (error emitted).
    fn scan_escape_sequence(&mut self) -> Option<char> {
        let start = self.position();
        self.advance(); // consume the '\'

        let escaped = match self.advance()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            'b' => '\u{8}',
            'f' => '\u{c}',
            'v' => '\u{b}',
            '0' if !matches!(self.peek(), Some('0'..='9')) => '\0',
            '\n' => return None,
            '\r' => {
                self.eat('\n');
                return None;
            }
            'x' => return self.scan_hex_escape(start, 2),
            'u' if self.eat('{') => return self.scan_code_point_escape(start),
            'u' => return self.scan_hex_escape(start, 4),
            // `\'`, `\"`, `\\` and any other character stand for themselves
            other => other,
        };
        Some(escaped)
    }

    /// `\xHH` or `\uHHHH`: exactly `count` hex digits.
    fn scan_hex_escape(&mut self, start: Position, count: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..count {
            match self.peek().and_then(|c| c.to_digit(16)) {
                Some(d) => {
                    self.advance();
                    code = code * 16 + d;
                }
                None => {
                    self.invalid_escape(start);
                    return None;
                }
            }
        }
        // Lone surrogates have no `char`; substitute U+FFFD
        Some(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    /// `\u{H...}` after the opening brace.
    fn scan_code_point_escape(&mut self, start: Position) -> Option<char> {
        let mut code = 0u32;
        let mut digits = 0;
        while let Some(d) = self.peek().and_then(|c| c.to_digit(16)) {
            self.advance();
            code = code.saturating_mul(16).saturating_add(d);
            digits += 1;
        }
        if digits == 0 || !self.eat('}') {
            self.invalid_escape(start);
            return None;
        }
        match char::from_u32(code) {
            Some(ch) => Some(ch),
            None if code <= 0x10FFFF => Some(char::REPLACEMENT_CHARACTER),
            None => {
                self.invalid_escape(start);
                None
            }
        }
    }

    fn invalid_escape(&mut self, start: Position) {
        let span = self.span_from(start);
        let text = self.text_from(start).to_string();
        self.emit_error(
            ErrorCode::INVALID_ESCAPE,
            format!("Invalid escape sequence '{text}'"),
            span,
        );
    }
}

fn is_whitespace(ch: char) -> bool {
    ch.is_whitespace() || ch == '\u{FEFF}'
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_identifier_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> LexResult {
        let sf = SourceFile::new("test.sx", source);
        Lexer::new(&sf).lex()
    }

    #[test]
    fn test_positions_are_byte_offsets_and_char_columns() {
        let result = lex("\"é\" & a");
        let a = &result.tokens[2];
        assert_eq!(a.kind, TokenKind::Identifier("a".into()));
        // `"é"` is 4 bytes but 3 characters
        assert_eq!(a.span.start, Position::new(7, 1, 7));
        assert_eq!(a.span.end, Position::new(8, 1, 8));
    }

    #[test]
    fn test_lines_advance_on_newline() {
        let result = lex("a\n  b");
        let b = &result.tokens[1];
        assert_eq!(b.span.start, Position::new(4, 2, 3));
    }

    #[test]
    fn test_eof_span_is_end_of_input() {
        let result = lex("ab ");
        let eof = result.tokens.last().unwrap();
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.span.start.offset, 3);
    }

    #[test]
    fn test_errors_carry_expression_text() {
        let result = lex("1 @ 2");
        let err = &result.errors.errors[0];
        assert_eq!(err.code, ErrorCode::UNEXPECTED_CHARACTER);
        assert_eq!(err.expression, "1 @ 2");
        assert_eq!(err.span.start.offset, 2);
    }
}
