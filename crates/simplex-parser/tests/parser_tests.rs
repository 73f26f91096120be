//! Parser tests.
//!
//! Covers: literals, precedence and associativity, postfix chains, calls with
//! placeholders, pipes, conditionals, lambdas, let blocks, object and array
//! literals, spans, error reporting, and determinism.

use pretty_assertions::assert_eq;
use simplex_lexer::Lexer;
use simplex_parser::{ParseResult, Parser};
use simplex_types::ast::*;
use simplex_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Parse source and return the result (expression + errors).
fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("test.sx", source);
    let lex = Lexer::new(&sf).lex();
    assert!(!lex.errors.has_errors(), "lex errors in {source:?}");
    Parser::new(lex.tokens, &sf).parse()
}

/// Parse source and return the expression, panicking if there are errors.
fn parse_ok(source: &str) -> Expr {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors in {source:?} (see above)");
    }
    result.expr.expect("no expression returned")
}

/// Parse source and return the first error.
fn parse_err(source: &str) -> simplex_types::CompileError {
    parse(source)
        .errors
        .into_first()
        .unwrap_or_else(|| panic!("expected a parse error for {source:?}"))
}

/// Render an expression as a compact s-expression for structural assertions.
fn show(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(lit) => show_literal(lit),
        ExprKind::Identifier(name) => name.clone(),
        ExprKind::TopicReference => "%".into(),
        ExprKind::Unary { op, argument } => format!("({} {})", op.as_str(), show(argument)),
        ExprKind::Binary { op, left, right } => {
            format!("({} {} {})", op.as_str(), show(left), show(right))
        }
        ExprKind::Logical { op, left, right } => {
            format!("({} {} {})", op.as_str(), show(left), show(right))
        }
        ExprKind::NullishCoalesce { left, right } => {
            format!("(?? {} {})", show(left), show(right))
        }
        ExprKind::Conditional {
            test,
            consequent,
            alternate,
        } => match alternate {
            Some(alt) => format!("(if {} {} {})", show(test), show(consequent), show(alt)),
            None => format!("(if {} {})", show(test), show(consequent)),
        },
        ExprKind::Object(props) => {
            let parts: Vec<_> = props
                .iter()
                .map(|p| {
                    let key = match &p.key {
                        PropertyKey::Identifier(id) => id.name.clone(),
                        PropertyKey::Literal(lit, _) => show_literal(lit),
                    };
                    format!("{key}: {}", show(&p.value))
                })
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        ExprKind::Array(items) => {
            let parts: Vec<_> = items
                .iter()
                .map(|e| e.as_ref().map_or("_".to_string(), show))
                .collect();
            format!("[{}]", parts.join(" "))
        }
        ExprKind::Member {
            object,
            property,
            computed,
            extension,
        } => {
            let sep = match (computed, extension) {
                (true, _) => "[]",
                (false, true) => "::",
                (false, false) => ".",
            };
            format!("({sep} {} {})", show(object), show(property))
        }
        ExprKind::Call { callee, arguments } => {
            let mut parts = vec![show(callee)];
            parts.extend(arguments.iter().map(|a| match a {
                Argument::Expr(e) => show(e),
                Argument::Placeholder(_) => "#".to_string(),
            }));
            format!("(call {})", parts.join(" "))
        }
        ExprKind::PipeSequence { head, tail } => {
            let mut out = format!("(pipe {}", show(head));
            for stage in tail {
                out.push_str(if stage.optional { " |? " } else { " | " });
                out.push_str(&show(&stage.expr));
            }
            out.push(')');
            out
        }
        ExprKind::Lambda { params, body } => {
            let names: Vec<_> = params.iter().map(|p| p.name.as_str()).collect();
            format!("(fn [{}] {})", names.join(" "), show(body))
        }
        ExprKind::Let { declarations, body } => {
            let decls: Vec<_> = declarations
                .iter()
                .map(|d| format!("{} {}", d.id.name, show(&d.init)))
                .collect();
            format!("(let [{}] {})", decls.join(", "), show(body))
        }
    }
}

fn show_literal(lit: &Literal) -> String {
    match lit {
        Literal::Number(n) => n.to_string(),
        Literal::String(s) => format!("{s:?}"),
        Literal::Boolean(b) => b.to_string(),
        Literal::Null => "null".into(),
    }
}

fn sexpr(source: &str) -> String {
    show(&parse_ok(source))
}

/// `(start offset, end offset)` of an expression's span.
fn offsets(expr: &Expr) -> (u32, u32) {
    (expr.span.start.offset, expr.span.end.offset)
}

// ─────────────────────────────────────────────────────────────────────
// Literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_literals() {
    assert_eq!(sexpr("null"), "null");
    assert_eq!(sexpr("true"), "true");
    assert_eq!(sexpr("false"), "false");
    assert_eq!(sexpr("42"), "42");
    assert_eq!(sexpr("'text'"), "\"text\"");
}

#[test]
fn test_identifier_and_topic() {
    assert_eq!(sexpr("foo"), "foo");
    assert_eq!(sexpr("%"), "%");
}

#[test]
fn test_literal_span() {
    let expr = parse_ok("-42");
    assert_eq!(offsets(&expr), (0, 3));
    let ExprKind::Unary { argument, .. } = &expr.kind else {
        panic!("expected unary");
    };
    assert_eq!(offsets(argument), (1, 3));
    assert_eq!(argument.span.start.column, 2);
}

// ─────────────────────────────────────────────────────────────────────
// Precedence & associativity
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiplicative_binds_tighter_than_additive() {
    assert_eq!(sexpr("1 + 2 * 3"), "(+ 1 (* 2 3))");
    assert_eq!(sexpr("1 - 2 - 3"), "(- (- 1 2) 3)");
    assert_eq!(sexpr("7 mod 4 / 2"), "(/ (mod 7 4) 2)");
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(sexpr("5 ^ 3 ^ 2"), "(^ 5 (^ 3 2))");
}

#[test]
fn test_unary_binds_looser_than_power() {
    assert_eq!(sexpr("-x ^ 2"), "(- (^ x 2))");
    assert_eq!(sexpr("2 ^ -1"), "(^ 2 (- 1))");
    assert_eq!(sexpr("-x * 2"), "(* (- x) 2)");
}

#[test]
fn test_prefix_operators_nest() {
    assert_eq!(sexpr("not not a"), "(not (not a))");
    assert_eq!(sexpr("typeof -a"), "(typeof (- a))");
    assert_eq!(sexpr("+ +a"), "(+ (+ a))");
}

#[test]
fn test_concat_between_additive_and_relational() {
    assert_eq!(sexpr("a & b + 1"), "(& a (+ b 1))");
    assert_eq!(sexpr("a & b == c"), "(== (& a b) c)");
}

#[test]
fn test_relational_and_equality() {
    assert_eq!(sexpr("a < b == c > d"), "(== (< a b) (> c d))");
    assert_eq!(sexpr("'a' in obj"), "(in \"a\" obj)");
}

#[test]
fn test_logical_operators() {
    assert_eq!(sexpr("a or b and c"), "(or a (and b c))");
    assert_eq!(sexpr("a == 1 and b"), "(and (== a 1) b)");
}

#[test]
fn test_nullish_below_logical() {
    assert_eq!(sexpr("a ?? b or c"), "(?? a (or b c))");
    assert_eq!(sexpr("a ?? b ?? c"), "(?? (?? a b) c)");
}

#[test]
fn test_parentheses_override_precedence() {
    assert_eq!(sexpr("(1 + 2) * 3"), "(* (+ 1 2) 3)");
}

#[test]
fn test_binary_span_includes_parentheses() {
    let expr = parse_ok("(1 + 2) * 3");
    assert_eq!(offsets(&expr), (0, 11));
    let ExprKind::Binary { left, .. } = &expr.kind else {
        panic!("expected binary");
    };
    // The grouped expression itself excludes the parentheses
    assert_eq!(offsets(left), (1, 6));
}

// ─────────────────────────────────────────────────────────────────────
// Member access & calls
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_member_access() {
    assert_eq!(sexpr("a.b"), "(. a b)");
    assert_eq!(sexpr("a::b"), "(:: a b)");
    assert_eq!(sexpr("a[0]"), "([] a 0)");
    assert_eq!(sexpr("a.b[c].d"), "(. ([] (. a b) c) d)");
}

#[test]
fn test_member_name_may_be_keyword() {
    assert_eq!(sexpr("range.in"), "(. range in)");
    assert_eq!(sexpr("a.if.let"), "(. (. a if) let)");
}

#[test]
fn test_member_spans() {
    let expr = parse_ok("\"\".foo");
    assert_eq!(offsets(&expr), (0, 6));
    let expr = parse_ok("{}[{}]");
    assert_eq!(offsets(&expr), (0, 6));
    let ExprKind::Member { property, .. } = &parse_ok("a.b").kind else {
        panic!("expected member");
    };
    assert_eq!(offsets(property), (2, 3));
}

#[test]
fn test_calls() {
    assert_eq!(sexpr("f()"), "(call f)");
    assert_eq!(sexpr("f(1, a + 2)"), "(call f 1 (+ a 2))");
    assert_eq!(sexpr("f(1,)"), "(call f 1)");
    assert_eq!(sexpr("a.b(c)(d)"), "(call (call (. a b) c) d)");
}

#[test]
fn test_curry_placeholders() {
    assert_eq!(sexpr("f(#, 3)"), "(call f # 3)");
    assert_eq!(sexpr("f(#, #)"), "(call f # #)");
}

#[test]
fn test_placeholder_outside_call_is_rejected() {
    let err = parse_err("# + 1");
    assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
    assert!(err.message.contains("placeholder"));
}

#[test]
fn test_postfix_binds_tighter_than_power() {
    assert_eq!(sexpr("a.b ^ f(2)"), "(^ (. a b) (call f 2))");
}

// ─────────────────────────────────────────────────────────────────────
// Pipes
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_pipe_sequence() {
    assert_eq!(
        sexpr("a | add(%, 2) | 4 * %"),
        "(pipe a | (call add % 2) | (* 4 %))"
    );
}

#[test]
fn test_optional_pipe() {
    assert_eq!(sexpr("null |? 42"), "(pipe null |? 42)");
    assert_eq!(sexpr("a |? b | c"), "(pipe a |? b | c)");
}

#[test]
fn test_pipe_is_lowest_precedence() {
    assert_eq!(sexpr("a ?? b | % + 1"), "(pipe (?? a b) | (+ % 1))");
}

#[test]
fn test_pipe_span() {
    let expr = parse_ok("a | b");
    assert_eq!(offsets(&expr), (0, 5));
}

// ─────────────────────────────────────────────────────────────────────
// Conditionals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_conditional() {
    assert_eq!(sexpr("if a then b else c"), "(if a b c)");
    assert_eq!(sexpr("if a then b"), "(if a b)");
}

#[test]
fn test_nested_conditional_else_binds_innermost() {
    assert_eq!(
        sexpr("if 1 < 2 then if 3 < 4 then 42 else 420 else 69"),
        "(if (< 1 2) (if (< 3 4) 42 420) 69)"
    );
}

#[test]
fn test_conditional_branches_extend_right() {
    assert_eq!(sexpr("if a then 1 else 2 + 3"), "(if a 1 (+ 2 3))");
}

#[test]
fn test_conditional_requires_then() {
    let err = parse_err("if a b");
    assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(err.span.start.offset, 5);
}

// ─────────────────────────────────────────────────────────────────────
// Lambdas
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_lambda_forms() {
    assert_eq!(sexpr("x => x * 2"), "(fn [x] (* x 2))");
    assert_eq!(sexpr("(a, b) => a / b"), "(fn [a b] (/ a b))");
    assert_eq!(sexpr("() => 42"), "(fn [] 42)");
    assert_eq!(sexpr("(a) => a"), "(fn [a] a)");
}

#[test]
fn test_lambda_as_argument() {
    assert_eq!(
        sexpr("map(list, x => x + 1, 2)"),
        "(call map list (fn [x] (+ x 1)) 2)"
    );
}

#[test]
fn test_parameter_list_without_arrow_is_rejected() {
    let err = parse_err("(a, b)");
    assert!(err.message.contains("expected ')'"), "{}", err.message);
}

#[test]
fn test_curried_lambda() {
    assert_eq!(sexpr("a => b => a + b"), "(fn [a] (fn [b] (+ a b)))");
}

// ─────────────────────────────────────────────────────────────────────
// Let
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_let_declarations() {
    assert_eq!(
        sexpr("let a = 1, b = a + 1, a + b"),
        "(let [a 1, b (+ a 1)] (+ a b))"
    );
}

#[test]
fn test_let_body_may_start_with_identifier() {
    assert_eq!(sexpr("let a = a, a"), "(let [a a] a)");
}

#[test]
fn test_let_repeated_names_parse() {
    let expr = parse_ok("let a = 1, a = 2, a");
    let ExprKind::Let { declarations, .. } = &expr.kind else {
        panic!("expected let");
    };
    assert_eq!(declarations.len(), 2);
    assert_eq!(declarations[1].id.span.start.offset, 11);
    assert_eq!(declarations[1].id.span.end.offset, 12);
}

#[test]
fn test_let_requires_body() {
    let err = parse_err("let a = 1,");
    assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
}

// ─────────────────────────────────────────────────────────────────────
// Object & array literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_object_literal() {
    assert_eq!(
        sexpr("{ a: 1, \"b\": \"foo\", 3: true, if: null, e: { a: 3, }, }"),
        "{a: 1, \"b\": \"foo\", 3: true, if: null, e: {a: 3}}"
    );
    assert_eq!(sexpr("{}"), "{}");
}

#[test]
fn test_array_literal_with_holes() {
    assert_eq!(sexpr("[1, 2, , , 5, ]"), "[1 2 _ _ 5]");
    assert_eq!(sexpr("[,]"), "[_]");
    assert_eq!(sexpr("[]"), "[]");
}

// ─────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_trailing_tokens_are_rejected() {
    let err = parse_err("a b");
    assert_eq!(err.code, ErrorCode::UNEXPECTED_TOKEN);
    assert_eq!(err.span.start.offset, 2);
    assert_eq!(err.expression, "a b");
}

#[test]
fn test_missing_operand() {
    let err = parse_err("1 +");
    assert!(err.message.contains("expected expression"), "{}", err.message);
}

#[test]
fn test_unclosed_bracket() {
    let err = parse_err("[1, 2");
    assert!(err.message.contains("expected ']'"), "{}", err.message);
}

#[test]
fn test_empty_input() {
    let err = parse_err("");
    assert!(err.message.contains("end of input"), "{}", err.message);
}

#[test]
fn test_nesting_limit() {
    let source = format!("{}1{}", "(".repeat(100), ")".repeat(100));
    let err = parse_err(&source);
    assert_eq!(err.code, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn test_long_prefix_chain_is_rejected() {
    let source = format!("{}1", "not ".repeat(5_000));
    let result = parse(&source);
    assert!(result.expr.is_none());
    let err = result.errors.into_first().expect("nesting error");
    assert_eq!(err.code, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn test_long_exponent_chain_is_rejected() {
    let source = format!("2{}", " ^ 2".repeat(5_000));
    assert_eq!(parse_err(&source).code, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn test_long_member_chain_is_rejected() {
    let source = format!("a{}", ".b".repeat(20_000));
    let result = parse(&source);
    assert!(result.expr.is_none());
    let err = result.errors.into_first().expect("nesting error");
    assert_eq!(err.code, ErrorCode::NESTING_TOO_DEEP);
    assert_eq!(err.span.start.offset, 0);
}

#[test]
fn test_long_operator_chain_is_rejected() {
    let source = format!("1{}", " + 1".repeat(20_000));
    assert_eq!(parse_err(&source).code, ErrorCode::NESTING_TOO_DEEP);
}

#[test]
fn test_moderate_chains_are_accepted() {
    parse_ok(&format!("{}1", "not ".repeat(30)));
    parse_ok(&format!("a{}", ".b".repeat(100)));
    parse_ok(&format!("1{}", " + 1".repeat(100)));
}

// ─────────────────────────────────────────────────────────────────────
// Serialization & determinism
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_tree_survives_json() {
    let expr = parse_ok("let f = (a, b) => a ^ b, [f(2, #), {x: %}] |? g::h");
    let json = serde_json::to_string(&expr).unwrap();
    let back: Expr = serde_json::from_str(&json).unwrap();
    assert_eq!(back, expr);
}

#[test]
fn test_parsing_is_deterministic() {
    let source = "a | f(%, #) |? if % then [1, , 2] else { k: -x ^ 2 }";
    let first = parse_ok(source);
    for _ in 0..100 {
        assert_eq!(parse_ok(source), first);
    }
}
