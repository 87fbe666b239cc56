use super::*;
use crate::compiler::lexer::Lexer;
use crate::compiler::raw::RawTemplate;
use crate::compiler::syntax::{Constant, Keyword, Operator};

fn parse_ok(input: &str) -> Vec<Node> {
    let entities = Entities::core();
    let tokens = Lexer::new(RawTemplate::new("test", input), &entities, '#')
        .lex()
        .unwrap_or_else(|e| panic!("lex error: {e}"));
    parse("test", tokens, &entities).unwrap_or_else(|e| panic!("parse error: {e}"))
}

fn parse_err(input: &str) -> ParseErrorKind {
    let entities = Entities::core();
    let tokens = Lexer::new(RawTemplate::new("test", input), &entities, '#')
        .lex()
        .unwrap_or_else(|e| panic!("lex error: {e}"));
    match parse("test", tokens, &entities) {
        Ok(nodes) => panic!("expected parse error, got {nodes:?}"),
        Err(e) => e.kind,
    }
}

#[test]
fn text_and_expression_interleave() {
    let nodes = parse_ok("Hello, #(name)!");
    assert_eq!(
        nodes,
        vec![
            Node::Raw("Hello, ".into()),
            Node::Expression(Expr::Variable("name".into())),
            Node::Raw("!".into()),
        ]
    );
}

#[test]
fn decayed_tags_merge_into_one_raw_node() {
    assert_eq!(
        parse_ok("#notAnEntity rest"),
        vec![Node::Raw("#notAnEntity rest".into())]
    );
}

#[test]
fn function_tag_becomes_an_output_expression() {
    assert_eq!(
        parse_ok("#count(items)"),
        vec![Node::Expression(Expr::Function(
            "count".into(),
            vec![Parameter::positional(Expr::Variable("items".into()))],
        ))]
    );
}

#[test]
fn inline_tag_becomes_a_splice_reference() {
    assert_eq!(parse_ok("#inline(\"b\")"), vec![Node::Inline("b".into())]);
}

#[test]
fn inline_requires_a_string_path() {
    assert_eq!(parse_err("#inline(5)"), ParseErrorKind::InvalidInline);
    assert_eq!(parse_err("#inline(\"a\", \"b\")"), ParseErrorKind::InvalidInline);
}

#[test]
fn if_chain_structure() {
    let nodes = parse_ok("#if(a):1#elseif(b):2#else:3#endif");
    let Node::Block(block) = &nodes[0] else {
        panic!("expected block, got {nodes:?}");
    };
    assert_eq!(block.name, "if");
    assert_eq!(block.body, vec![Node::Raw("1".into())]);
    assert_eq!(block.chain.len(), 2);
    assert_eq!(block.chain[0].name, "elseif");
    assert_eq!(block.chain[0].body, vec![Node::Raw("2".into())]);
    assert_eq!(block.chain[1].name, "else");
    assert!(block.chain[1].params.is_empty());
    assert_eq!(block.chain[1].body, vec![Node::Raw("3".into())]);
}

#[test]
fn nested_blocks_parse() {
    let nodes = parse_ok("#if(a):#for(x in xs):#(x)#endfor#endif");
    let Node::Block(outer) = &nodes[0] else {
        panic!("expected block");
    };
    let Node::Block(inner) = &outer.body[0] else {
        panic!("expected nested block, got {:?}", outer.body);
    };
    assert_eq!(inner.name, "for");
    assert_eq!(
        inner.params[0].value,
        Expr::In(
            Box::new(Expr::Variable("x".into())),
            Box::new(Expr::Variable("xs".into())),
        )
    );
}

#[test]
fn else_after_else_is_an_invalid_chain() {
    assert!(matches!(
        parse_err("#if(a):1#else:2#else:3#endif"),
        ParseErrorKind::InvalidChain { .. }
    ));
}

#[test]
fn chained_tag_outside_a_block_is_an_invalid_chain() {
    assert!(matches!(
        parse_err("#else:x#endif"),
        ParseErrorKind::InvalidChain { .. }
    ));
}

#[test]
fn mismatched_closer_is_reported() {
    assert_eq!(
        parse_err("#if(a):1#endfor"),
        ParseErrorKind::MismatchedClose {
            expected: "endif".into(),
            found: "endfor".into(),
        }
    );
}

#[test]
fn unclosed_block_is_reported() {
    assert_eq!(
        parse_err("#if(a):1"),
        ParseErrorKind::UnclosedBlock("if".into())
    );
}

#[test]
fn stray_closer_is_reported() {
    assert_eq!(
        parse_err("#endif"),
        ParseErrorKind::UnexpectedClose("endif".into())
    );
}

#[test]
fn anonymous_tag_takes_exactly_one_expression() {
    assert_eq!(parse_err("#(a, b)"), ParseErrorKind::BadAnonymous);
}

// ==================== Expressions ====================

fn expr_of(input: &str) -> Expr {
    let nodes = parse_ok(input);
    match nodes.into_iter().next() {
        Some(Node::Expression(expr)) => expr,
        other => panic!("expected expression, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    assert_eq!(
        expr_of("#(1 + 2 * 3)"),
        Expr::Binary(
            Operator::Plus,
            Box::new(Expr::Constant(Constant::Int(1))),
            Box::new(Expr::Binary(
                Operator::Multiply,
                Box::new(Expr::Constant(Constant::Int(2))),
                Box::new(Expr::Constant(Constant::Int(3))),
            )),
        )
    );
}

#[test]
fn parenthesized_group_overrides_precedence() {
    assert_eq!(
        expr_of("#((1 + 2) * 3)"),
        Expr::Binary(
            Operator::Multiply,
            Box::new(Expr::Binary(
                Operator::Plus,
                Box::new(Expr::Constant(Constant::Int(1))),
                Box::new(Expr::Constant(Constant::Int(2))),
            )),
            Box::new(Expr::Constant(Constant::Int(3))),
        )
    );
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let expr = expr_of("#(a + 1 > b)");
    assert!(matches!(expr, Expr::Binary(Operator::Greater, _, _)));
}

#[test]
fn logical_operators_short_circuit_shape() {
    let expr = expr_of("#(a && b || c)");
    assert!(matches!(expr, Expr::Binary(Operator::Or, _, _)));
}

#[test]
fn member_access_chains_left() {
    assert_eq!(
        expr_of("#(a.b.c)"),
        Expr::Binary(
            Operator::ScopeMember,
            Box::new(Expr::Binary(
                Operator::ScopeMember,
                Box::new(Expr::Variable("a".into())),
                Box::new(Expr::Variable("b".into())),
            )),
            Box::new(Expr::Variable("c".into())),
        )
    );
}

#[test]
fn subscript_binds_postfix() {
    assert_eq!(
        expr_of("#(a[0])"),
        Expr::Binary(
            Operator::SubscriptOpen,
            Box::new(Expr::Variable("a".into())),
            Box::new(Expr::Constant(Constant::Int(0))),
        )
    );
}

#[test]
fn whitespace_blocks_the_subscript() {
    // `a [0]` is a value followed by a stray collection literal.
    assert!(matches!(
        parse_err("#(a [0])"),
        ParseErrorKind::UnexpectedToken(_)
    ));
}

#[test]
fn array_literal_with_elements() {
    assert_eq!(
        expr_of("#([1, 2])"),
        Expr::Array(vec![
            Expr::Constant(Constant::Int(1)),
            Expr::Constant(Constant::Int(2)),
        ])
    );
}

#[test]
fn dictionary_literal_with_entries() {
    assert_eq!(
        expr_of("#([\"a\": 1, \"b\": 2])"),
        Expr::Dictionary(vec![
            ("a".into(), Expr::Constant(Constant::Int(1))),
            ("b".into(), Expr::Constant(Constant::Int(2))),
        ])
    );
}

#[test]
fn array_literal_as_second_argument() {
    let expr = expr_of("#(contains(xs, [1]))");
    let Expr::Function(name, params) = expr else {
        panic!("expected function");
    };
    assert_eq!(name, "contains");
    assert_eq!(params.len(), 2);
    assert_eq!(params[1].value, Expr::Array(vec![Expr::Constant(Constant::Int(1))]));
}

#[test]
fn labeled_arguments_are_recorded() {
    let expr = expr_of("#(count(of: xs))");
    let Expr::Function(_, params) = expr else {
        panic!("expected function");
    };
    assert_eq!(params[0].label.as_deref(), Some("of"));
}

#[test]
fn unary_operators_parse_prefix() {
    assert_eq!(
        expr_of("#(!done)"),
        Expr::Unary(Operator::Not, Box::new(Expr::Variable("done".into())))
    );
    assert_eq!(
        expr_of("#(-x)"),
        Expr::Unary(Operator::Minus, Box::new(Expr::Variable("x".into())))
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        expr_of("#(x = y = 1)"),
        Expr::Binary(
            Operator::Assignment,
            Box::new(Expr::Variable("x".into())),
            Box::new(Expr::Binary(
                Operator::Assignment,
                Box::new(Expr::Variable("y".into())),
                Box::new(Expr::Constant(Constant::Int(1))),
            )),
        )
    );
}

#[test]
fn nil_coalesce_parses() {
    let expr = expr_of("#(name ?? \"anonymous\")");
    assert!(matches!(expr, Expr::Binary(Operator::NilCoalesce, _, _)));
}

#[test]
fn keywords_are_expressions() {
    assert_eq!(expr_of("#(true)"), Expr::Keyword(Keyword::True));
    assert_eq!(expr_of("#(nil)"), Expr::Keyword(Keyword::Nil));
}
