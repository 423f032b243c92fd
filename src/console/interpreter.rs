//! Command rewriting
//!
//! A command typed as `= expr` asks for its value. The engine only hands back
//! values from `return`, so such commands are rewritten to
//! `return (expr)` before compilation.

/// Turn an accumulated command into the source handed to the compiler
pub fn prepare_source(
    command: &str,
    expects_value: bool,
) -> String {
    let mut source = command.trim();
    if !expects_value {
        return source.to_string();
    }

    while let Some(rest) = source.strip_suffix(';') {
        source = rest.trim();
    }
    format!("return ({})", source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_is_only_trimmed() {
        assert_eq!(prepare_source("  x <- 1;\n", false), "x <- 1;");
    }

    #[test]
    fn test_expression_is_wrapped() {
        assert_eq!(prepare_source("1+1\n", true), "return (1+1)");
    }

    #[test]
    fn test_trailing_semicolons_are_stripped() {
        assert_eq!(prepare_source("1+1;;\n", true), "return (1+1)");
        assert_eq!(prepare_source("a ; ;  ;\n", true), "return (a)");
    }

    #[test]
    fn test_inner_semicolons_are_kept() {
        assert_eq!(prepare_source("f(a; b);\n", true), "return (f(a; b))");
    }

    #[test]
    fn test_multiline_expression() {
        assert_eq!(
            prepare_source("[1,\n2]\n", true),
            "return ([1,\n2])"
        );
    }
}
