//! Parser unit tests

use std::rc::Rc;

use crate::vm::ast::{AssignOp, BinOp, Expr, Literal, Stmt, UnOp};
use crate::vm::parser::{parse, MAX_NESTING};

fn int(i: i64) -> Expr {
    Expr::Lit(Literal::Integer(i))
}

fn ident(name: &str) -> Expr {
    Expr::Ident(Rc::from(name))
}

fn single_expr(source: &str) -> Expr {
    match parse(source).expect("source should parse").as_slice() {
        [Stmt::Expr(expr)] => expr.clone(),
        other => panic!("expected one expression statement, got {:?}", other),
    }
}

#[cfg(test)]
mod expression_tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(
            single_expr("1 + 2 * 3"),
            Expr::BinOp {
                op: BinOp::Add,
                lhs: Box::new(int(1)),
                rhs: Box::new(Expr::BinOp {
                    op: BinOp::Mul,
                    lhs: Box::new(int(2)),
                    rhs: Box::new(int(3)),
                }),
            }
        );
    }

    #[test]
    fn test_binary_operators_are_left_associative() {
        assert_eq!(
            single_expr("1 - 2 - 3"),
            Expr::BinOp {
                op: BinOp::Sub,
                lhs: Box::new(Expr::BinOp {
                    op: BinOp::Sub,
                    lhs: Box::new(int(1)),
                    rhs: Box::new(int(2)),
                }),
                rhs: Box::new(int(3)),
            }
        );
    }

    #[test]
    fn test_assignment_is_right_associative() {
        assert_eq!(
            single_expr("a = b = 1"),
            Expr::Assign {
                op: AssignOp::Set,
                target: Box::new(ident("a")),
                value: Box::new(Expr::Assign {
                    op: AssignOp::Set,
                    target: Box::new(ident("b")),
                    value: Box::new(int(1)),
                }),
            }
        );
    }

    #[test]
    fn test_new_slot_and_compound_assignment() {
        assert!(matches!(
            single_expr("x <- 1"),
            Expr::Assign { op: AssignOp::NewSlot, .. }
        ));
        assert!(matches!(
            single_expr("x *= 2"),
            Expr::Assign {
                op: AssignOp::Compound(BinOp::Mul),
                ..
            }
        ));
    }

    #[test]
    fn test_unary_binds_tighter_than_binary() {
        assert_eq!(
            single_expr("-a + b"),
            Expr::BinOp {
                op: BinOp::Add,
                lhs: Box::new(Expr::UnOp {
                    op: UnOp::Neg,
                    expr: Box::new(ident("a")),
                }),
                rhs: Box::new(ident("b")),
            }
        );
    }

    #[test]
    fn test_ternary() {
        assert!(matches!(single_expr("a ? b : c"), Expr::Ternary { .. }));
    }

    #[test]
    fn test_call_and_member_access() {
        assert_eq!(
            single_expr("t.f(1, 2)"),
            Expr::Call {
                callee: Box::new(Expr::Field {
                    object: Box::new(ident("t")),
                    name: Rc::from("f"),
                }),
                args: vec![int(1), int(2)],
            }
        );
        assert!(matches!(single_expr("a[0]"), Expr::Index { .. }));
    }

    #[test]
    fn test_table_literal_slot_forms() {
        let expr = single_expr(r#"t <- { a = 1, b: 2, "c": 3, [4] = 5, function d() {} }"#);
        let Expr::Assign { value, .. } = expr else {
            panic!("expected assignment");
        };
        let Expr::Table(slots) = *value else {
            panic!("expected table literal");
        };
        assert_eq!(slots.len(), 5);
        assert_eq!(slots[3].0, int(4));
        assert!(matches!(slots[4].1, Expr::Function(_)));
    }

    #[test]
    fn test_array_literal_allows_trailing_comma() {
        assert_eq!(single_expr("[1, 2,]"), Expr::Array(vec![int(1), int(2)]));
    }
}

#[cfg(test)]
mod statement_tests {
    use super::*;

    #[test]
    fn test_separators_are_optional() {
        let program = parse("a <- 1 b <- 2; c <- 3").unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn test_local_declares_several_names() {
        let program = parse("local a = 1, b").unwrap();
        assert_eq!(
            program,
            vec![Stmt::Local(vec![
                (Rc::from("a"), Some(int(1))),
                (Rc::from("b"), None),
            ])]
        );
    }

    #[test]
    fn test_return_forms() {
        assert_eq!(parse("return").unwrap(), vec![Stmt::Return(None)]);
        assert_eq!(parse("return (1)").unwrap(), vec![Stmt::Return(Some(int(1)))]);
    }

    #[test]
    fn test_function_statement() {
        let program = parse("function add(a, b) { return a + b }").unwrap();
        let [Stmt::Function(def)] = program.as_slice() else {
            panic!("expected function statement");
        };
        assert_eq!(def.name.as_deref(), Some("add"));
        assert_eq!(def.params.len(), 2);
        assert!(!def.variadic);
    }

    #[test]
    fn test_control_flow() {
        let program = parse(
            "for (local i = 0; i < 3; i += 1) { if (i) continue; else break }
             while (x) x -= 1",
        )
        .unwrap();
        assert!(matches!(program[0], Stmt::For { .. }));
        assert!(matches!(program[1], Stmt::While { .. }));
    }

    #[test]
    fn test_leading_brace_is_a_block() {
        assert!(matches!(parse("{ a <- 1 }").unwrap()[0], Stmt::Block(_)));
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_missing_operand() {
        let err = parse("1 +").unwrap_err();
        assert_eq!(err.desc, "expression expected, found end of script");
        assert_eq!((err.line, err.column), (1, 4));
    }

    #[test]
    fn test_assignment_to_expression() {
        let err = parse("1 = 2").unwrap_err();
        assert_eq!(err.desc, "can't assign expression");
    }

    #[test]
    fn test_break_outside_loop() {
        let err = parse("break").unwrap_err();
        assert_eq!(err.desc, "'break' has to be in a loop block");
    }

    #[test]
    fn test_loop_does_not_extend_into_nested_function() {
        let err = parse("while (1) { function f() { continue } }").unwrap_err();
        assert_eq!(err.desc, "'continue' has to be in a loop block");
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("function f() { return 1").unwrap_err();
        assert_eq!(err.desc, "expected '}'");
    }

    #[test]
    fn test_unclosed_call() {
        let err = parse("f(1, 2").unwrap_err();
        assert_eq!(err.desc, "expected ','");
    }

    #[test]
    fn test_lexer_errors_surface() {
        let err = parse("x <- \"open").unwrap_err();
        assert_eq!(err.desc, "unfinished string");
    }
}

#[cfg(test)]
mod nesting_tests {
    use super::*;

    fn parenthesized(depth: usize) -> String {
        format!("{}1{}", "(".repeat(depth), ")".repeat(depth))
    }

    #[test]
    fn test_moderate_nesting_parses() {
        assert_eq!(single_expr(&parenthesized(100)), int(1));
    }

    #[test]
    fn test_deep_parentheses_are_rejected() {
        let err = parse(&parenthesized(100_000)).unwrap_err();
        assert_eq!(err.desc, "expression too deeply nested");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_deep_unary_chain_is_rejected() {
        let source = format!("{}1", "-".repeat(MAX_NESTING * 4));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.desc, "expression too deeply nested");
    }

    #[test]
    fn test_deep_blocks_are_rejected() {
        let depth = MAX_NESTING + 10;
        let source = format!("{}{}", "{".repeat(depth), "}".repeat(depth));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.desc, "statement too deeply nested");
    }
}
