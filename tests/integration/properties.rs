//! Property tests for the console contract

use proptest::prelude::*;
use sqconsole::console::{prepare_source, CommandAccumulator, Console, QuoteMode, ScriptEngine};
use sqconsole::vm::Vm;

/// Lines built mostly from characters the accumulator reacts to
fn line_strategy() -> impl Strategy<Value = String> {
    "[{}\"'@\\\\ a=;\u{e9}]{0,12}"
}

/// Straightforward per-character reading of the completeness rules, used as
/// the reference for [`CommandAccumulator`]
#[derive(Debug, Default)]
struct ReferenceScanner {
    buffer: String,
    depth: i32,
    quote: QuoteMode,
    expects_value: bool,
}

impl ReferenceScanner {
    fn feed(
        &mut self,
        line: &str,
    ) -> bool {
        let mut part = line.trim();
        if self.buffer.is_empty() {
            *self = Self::default();
            if let Some(rest) = part.strip_prefix('=') {
                part = rest.trim();
                self.expects_value = true;
            }
            if part.is_empty() {
                return false;
            }
        }

        let mut chars = part.chars().peekable();
        while let Some(c) = chars.next() {
            match (self.quote, c) {
                (QuoteMode::Verbatim, '"') => {
                    if chars.next_if_eq(&'"').is_none() {
                        self.quote = QuoteMode::None;
                    }
                }
                (QuoteMode::Single, '\'') | (QuoteMode::Double, '"') => self.quote = QuoteMode::None,
                (QuoteMode::Single | QuoteMode::Double, '\\') => {
                    chars.next();
                }
                (QuoteMode::None, '\'') => self.quote = QuoteMode::Single,
                (QuoteMode::None, '"') => self.quote = QuoteMode::Double,
                (QuoteMode::None, '@') => {
                    if chars.next_if_eq(&'"').is_some() {
                        self.quote = QuoteMode::Verbatim;
                    }
                }
                (QuoteMode::None, '{') => self.depth += 1,
                (QuoteMode::None, '}') => self.depth -= 1,
                _ => {}
            }
        }

        let continued = part.ends_with('\\');
        let text = part.strip_suffix('\\').unwrap_or(part);
        self.buffer.push_str(text);
        if !(continued && self.quote != QuoteMode::None) {
            self.buffer.push('\n');
        }
        !continued && self.depth <= 0 && self.quote != QuoteMode::Verbatim
    }
}

proptest! {
    #[test]
    fn prop_accumulator_matches_reference(lines in prop::collection::vec(line_strategy(), 1..10)) {
        let mut acc = CommandAccumulator::new();
        let mut reference = ReferenceScanner::default();
        for line in &lines {
            let complete = acc.feed(line);
            prop_assert_eq!(complete, reference.feed(line), "line {:?}", line);
            prop_assert_eq!(acc.buffer(), reference.buffer.as_str());
            prop_assert_eq!(acc.brace_depth(), reference.depth);
            prop_assert_eq!(acc.quote_mode(), reference.quote);
            prop_assert_eq!(acc.expects_value(), reference.expects_value);
            if complete {
                acc.clear();
                reference.buffer.clear();
            }
        }
    }

    #[test]
    fn prop_completeness_follows_scan_state(lines in prop::collection::vec(line_strategy(), 1..10)) {
        let mut acc = CommandAccumulator::new();
        for line in &lines {
            let complete = acc.feed(line);
            if acc.is_pending() {
                let expected = acc.brace_depth() <= 0
                    && acc.quote_mode() != QuoteMode::Verbatim
                    && !line.trim().ends_with('\\');
                prop_assert_eq!(complete, expected);
            } else {
                prop_assert!(!complete);
            }
            if complete {
                acc.clear();
            }
        }
    }

    #[test]
    fn prop_complete_means_closed(line in any::<String>()) {
        let mut acc = CommandAccumulator::new();
        if acc.feed(&line) {
            prop_assert!(acc.brace_depth() <= 0);
            prop_assert_ne!(acc.quote_mode(), QuoteMode::Verbatim);
            prop_assert!(!line.trim().ends_with('\\'));
        }
    }

    #[test]
    fn prop_blocks_close_on_last_brace(depth in 1usize..20) {
        let mut acc = CommandAccumulator::new();
        for _ in 0..depth {
            let complete = acc.feed("{");
            prop_assert!(!complete);
        }
        for i in 0..depth {
            prop_assert_eq!(acc.feed("}"), i + 1 == depth);
        }
    }

    #[test]
    fn prop_trailing_semicolons_are_dropped(expr in "[a-z0-9+*]{1,12}", semis in 0usize..5) {
        let command = format!("{}{}\n", expr, ";".repeat(semis));
        prop_assert_eq!(prepare_source(&command, true), format!("return ({})", expr));
    }

    #[test]
    fn prop_sum_renders_and_stack_is_restored(a in -1000i64..1000, b in -1000i64..1000) {
        let mut console = Console::new(Vm::new());
        let complete = console.feed(&format!("= {} + {}", a, b));
        prop_assert!(complete);
        prop_assert_eq!(console.interpret_command().unwrap(), (a + b).to_string());
        prop_assert_eq!(console.engine().top(), 0);
    }

    #[test]
    fn prop_any_command_leaves_clean_state(line in line_strategy()) {
        let mut console = Console::new(Vm::new());
        if console.feed(&line) {
            let _ = console.interpret_command();
            prop_assert_eq!(console.engine().top(), 0);
            prop_assert!(!console.accumulator().is_pending());
            prop_assert!(!console.is_executing());
        }
    }
}
