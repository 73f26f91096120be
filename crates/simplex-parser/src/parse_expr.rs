//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 11. `|`, `|?` (pipe stages)
//! 10. `??`
//! 9. `or`
//! 8. `and`
//! 7. `==`, `!=`
//! 6. `<`, `<=`, `>`, `>=`, `in`
//! 5. `&`
//! 4. `+`, `-`
//! 3. `*`, `/`, `mod`
//! 2. prefix `+`, `-`, `not`, `typeof`
//! 1. `^` (right-associative, binds tighter than prefix operators)
//! 0. `.name`, `::name`, `[expr]`, `(args)`
//!
//! `if`, `let` and lambdas are primaries whose trailing expression extends
//! as far right as possible.

use simplex_lexer::token::TokenKind;
use simplex_types::ast::*;
use simplex_types::{ErrorCode, Span};

use crate::parser::Parser;

/// Nesting depth past which the parser refuses to recurse further.
const MAX_NESTING_DEPTH: u32 = 64;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(Self::parse_pipe)
    }

    /// Run `parse` one nesting level deeper, refusing past the limit.
    ///
    /// Every path on which the parser calls itself goes through here.
    fn nested(&mut self, parse: impl FnOnce(&mut Self) -> Option<Expr>) -> Option<Expr> {
        if self.expr_depth >= MAX_NESTING_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_TOO_DEEP,
                format!("maximum expression nesting depth is {MAX_NESTING_DEPTH}"),
            );
            return None;
        }
        self.expr_depth += 1;
        let result = parse(self);
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `PipeExpr = NullishExpr { ("|" | "|?") NullishExpr }`
    fn parse_pipe(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let head = self.parse_nullish()?;
        let mut tail = Vec::new();
        loop {
            let optional = match self.peek_kind() {
                TokenKind::Pipe => false,
                TokenKind::PipeQuestion => true,
                _ => break,
            };
            self.advance();
            let expr = self.parse_nullish()?;
            tail.push(PipeStage { optional, expr });
        }
        if tail.is_empty() {
            return Some(head);
        }
        Some(Expr::new(
            ExprKind::PipeSequence {
                head: Box::new(head),
                tail,
            },
            self.span_from(start),
        ))
    }

    /// `NullishExpr = OrExpr { "??" OrExpr }`
    fn parse_nullish(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_or()?;
        while self.eat(&TokenKind::QuestionQuestion) {
            let right = self.parse_or()?;
            left = Expr::new(
                ExprKind::NullishCoalesce {
                    left: Box::new(left),
                    right: Box::new(right),
                },
                self.span_from(start),
            );
        }
        Some(left)
    }

    /// `OrExpr = AndExpr { "or" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = self.logical(LogicalOp::Or, left, right, start);
        }
        Some(left)
    }

    /// `AndExpr = EqualityExpr { "and" EqualityExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_equality()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_equality()?;
            left = self.logical(LogicalOp::And, left, right, start);
        }
        Some(left)
    }

    /// `EqualityExpr = RelationalExpr { ("==" | "!=") RelationalExpr }`
    fn parse_equality(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::BangEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = self.binary(op, left, right, start);
        }
        Some(left)
    }

    /// `RelationalExpr = ConcatExpr { ("<" | "<=" | ">" | ">=" | "in") ConcatExpr }`
    fn parse_relational(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_concat()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                TokenKind::In => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_concat()?;
            left = self.binary(op, left, right, start);
        }
        Some(left)
    }

    /// `ConcatExpr = AddExpr { "&" AddExpr }`
    fn parse_concat(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_add()?;
        while self.eat(&TokenKind::Ampersand) {
            let right = self.parse_add()?;
            left = self.binary(BinaryOp::Concat, left, right, start);
        }
        Some(left)
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_mul()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_mul()?;
            left = self.binary(op, left, right, start);
        }
        Some(left)
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "mod") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Mod => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(op, left, right, start);
        }
        Some(left)
    }

    /// `UnaryExpr = ( "+" | "-" | "not" | "typeof" ) UnaryExpr | PowerExpr`
    fn parse_unary(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Typeof => UnaryOp::Typeof,
            _ => return self.parse_power(),
        };
        self.advance();
        let argument = self.nested(Self::parse_unary)?;
        Some(Expr::new(
            ExprKind::Unary {
                op,
                argument: Box::new(argument),
            },
            self.span_from(start),
        ))
    }

    /// `PowerExpr = PostfixExpr [ "^" UnaryExpr ]`
    ///
    /// The exponent recurses through [`Self::parse_unary`], which makes `^`
    /// right-associative and allows `2 ^ -1`.
    fn parse_power(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let base = self.parse_postfix()?;
        if !self.eat(&TokenKind::Caret) {
            return Some(base);
        }
        let exponent = self.nested(Self::parse_unary)?;
        Some(self.binary(BinaryOp::Pow, base, exponent, start))
    }

    fn binary(&self, op: BinaryOp, left: Expr, right: Expr, start: Span) -> Expr {
        Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            self.span_from(start),
        )
    }

    fn logical(&self, op: LogicalOp, left: Expr, right: Expr, start: Span) -> Expr {
        Expr::new(
            ExprKind::Logical {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            self.span_from(start),
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix: member access and calls
    // ══════════════════════════════════════════════════════════════════════════

    /// `PostfixExpr = PrimaryExpr { "." Name | "::" Name | "[" Expr "]" | "(" Args ")" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let start = self.current_span();
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::ColonColon => {
                    let extension = self.advance().kind == TokenKind::ColonColon;
                    let name = self.expect_member_name()?;
                    let property = Expr::new(ExprKind::Identifier(name.name), name.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: false,
                            extension,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.parse_expression()?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expr::new(
                        ExprKind::Member {
                            object: Box::new(expr),
                            property: Box::new(property),
                            computed: true,
                            extension: false,
                        },
                        self.span_from(start),
                    );
                }
                TokenKind::LParen => {
                    self.advance();
                    let arguments = self.parse_arguments()?;
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            arguments,
                        },
                        self.span_from(start),
                    );
                }
                _ => break,
            }
        }

        Some(expr)
    }

    /// Parse call arguments after `(` up to and including `)`.
    fn parse_arguments(&mut self) -> Option<Vec<Argument>> {
        let mut arguments = Vec::new();
        while !self.check_exact(&TokenKind::RParen) {
            if self.check_exact(&TokenKind::Hash) {
                let span = self.advance().span;
                arguments.push(Argument::Placeholder(span));
            } else {
                arguments.push(Argument::Expr(self.parse_expression()?));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RParen)?;
        Some(arguments)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let start = self.current_span();

        match self.peek_kind().clone() {
            TokenKind::NumberLit(n) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::Number(n)), start))
            }
            TokenKind::StringLiteral(s) => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::String(s)), start))
            }
            TokenKind::True => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::Boolean(true)), start))
            }
            TokenKind::False => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::Boolean(false)), start))
            }
            TokenKind::Null => {
                self.advance();
                Some(Expr::new(ExprKind::Literal(Literal::Null), start))
            }
            TokenKind::Percent => {
                self.advance();
                Some(Expr::new(ExprKind::TopicReference, start))
            }
            TokenKind::Identifier(name) => {
                if self.look_ahead(1) == &TokenKind::FatArrow {
                    return self.parse_lambda();
                }
                self.advance();
                Some(Expr::new(ExprKind::Identifier(name), start))
            }
            TokenKind::LParen => {
                if self.is_lambda_params() {
                    return self.parse_lambda();
                }
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                Some(inner)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::If => self.parse_conditional(),
            TokenKind::Let => self.parse_let(),
            TokenKind::Hash => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    "placeholder '#' is only allowed as a call argument",
                );
                None
            }
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    /// `[a, , b]`
    fn parse_array(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // consume '['

        let mut elements = Vec::new();
        loop {
            if self.check_exact(&TokenKind::RBracket) {
                break;
            }
            if self.eat(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_expression()?));
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBracket)?;

        Some(Expr::new(ExprKind::Array(elements), self.span_from(start)))
    }

    /// `{ key: value, "key": value, 1: value, }`
    fn parse_object(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // consume '{'

        let mut properties = Vec::new();
        while !self.check_exact(&TokenKind::RBrace) {
            let key_span = self.current_span();
            let key = match self.peek_kind().clone() {
                TokenKind::StringLiteral(s) => {
                    self.advance();
                    PropertyKey::Literal(Literal::String(s), key_span)
                }
                TokenKind::NumberLit(n) => {
                    self.advance();
                    PropertyKey::Literal(Literal::Number(n), key_span)
                }
                _ => PropertyKey::Identifier(self.expect_member_name()?),
            };
            self.expect(&TokenKind::Colon)?;
            let value = self.parse_expression()?;
            properties.push(Property {
                key,
                value,
                span: self.span_from(key_span),
            });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::RBrace)?;

        Some(Expr::new(ExprKind::Object(properties), self.span_from(start)))
    }

    /// `if test then consequent [else alternate]`
    fn parse_conditional(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // consume 'if'

        let test = self.parse_expression()?;
        self.expect(&TokenKind::Then)?;
        let consequent = self.parse_expression()?;
        let alternate = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Some(Expr::new(
            ExprKind::Conditional {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate,
            },
            self.span_from(start),
        ))
    }

    /// `let a = 1, b = a + 1, body`
    ///
    /// Declarations continue while the next tokens are `name =`.
    fn parse_let(&mut self) -> Option<Expr> {
        let start = self.current_span();
        self.advance(); // consume 'let'

        let mut declarations = Vec::new();
        loop {
            let id = self.expect_identifier()?;
            self.expect(&TokenKind::Eq)?;
            let init = self.parse_expression()?;
            self.expect(&TokenKind::Comma)?;
            declarations.push(Declaration {
                span: id.span.merge(init.span),
                id,
                init,
            });
            let more = matches!(self.peek_kind(), TokenKind::Identifier(_))
                && self.look_ahead(1) == &TokenKind::Eq;
            if !more {
                break;
            }
        }
        let body = self.parse_expression()?;

        Some(Expr::new(
            ExprKind::Let {
                declarations,
                body: Box::new(body),
            },
            self.span_from(start),
        ))
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Lambdas
    // ══════════════════════════════════════════════════════════════════════════

    /// Scan ahead from `(` to decide whether this is a parameter list:
    /// `()` or `(a, b)` followed by `=>`.
    fn is_lambda_params(&self) -> bool {
        let mut n = 1;
        if self.look_ahead(n) != &TokenKind::RParen {
            loop {
                if !matches!(self.look_ahead(n), TokenKind::Identifier(_)) {
                    return false;
                }
                n += 1;
                match self.look_ahead(n) {
                    TokenKind::Comma => n += 1,
                    TokenKind::RParen => break,
                    _ => return false,
                }
            }
        }
        self.look_ahead(n + 1) == &TokenKind::FatArrow
    }

    /// `x => body`, `(a, b) => body`, `() => body`
    fn parse_lambda(&mut self) -> Option<Expr> {
        let start = self.current_span();

        let mut params = Vec::new();
        if self.eat(&TokenKind::LParen) {
            while !self.check_exact(&TokenKind::RParen) {
                params.push(self.expect_identifier()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        } else {
            params.push(self.expect_identifier()?);
        }
        self.expect(&TokenKind::FatArrow)?;
        let body = self.parse_expression()?;

        Some(Expr::new(
            ExprKind::Lambda {
                params,
                body: Box::new(body),
            },
            self.span_from(start),
        ))
    }
}
