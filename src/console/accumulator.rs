//! Incremental command accumulator
//!
//! Console input arrives one line at a time. [`CommandAccumulator::feed`]
//! appends each line to a pending command and reports whether that command is
//! now closed: no open brace block, no unterminated verbatim string and no
//! trailing line-continuation backslash.
//!
//! The scanner only follows three things: brace depth, the current quote mode
//! and backslash escapes. It does not tokenize anything else.

use tracing::trace;

/// String literal the scanner is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteMode {
    #[default]
    None,
    /// `'...'`
    Single,
    /// `"..."`
    Double,
    /// `@"..."`, where `""` stands for one quote
    Verbatim,
}

impl QuoteMode {
    /// Inside any kind of string literal
    pub fn is_open(self) -> bool {
        self != QuoteMode::None
    }

    fn closing_quote(self) -> Option<u8> {
        match self {
            QuoteMode::Single => Some(b'\''),
            QuoteMode::Double | QuoteMode::Verbatim => Some(b'"'),
            QuoteMode::None => None,
        }
    }
}

/// Line-by-line command scanner, one per console session
#[derive(Debug, Clone, Default)]
pub struct CommandAccumulator {
    /// Source of the pending command, newline terminated per line
    buffer: String,
    /// `{` minus `}` seen outside strings; may go negative
    brace_depth: i32,
    quote: QuoteMode,
    /// Command started with `=`: its value is wanted
    expects_value: bool,
}

impl CommandAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one input line. Returns `true` once the pending command is
    /// complete and ready to be interpreted.
    pub fn feed(
        &mut self,
        line: &str,
    ) -> bool {
        let mut part = line.trim();

        if self.buffer.is_empty() {
            self.brace_depth = 0;
            self.quote = QuoteMode::None;
            self.expects_value = false;
            if let Some(rest) = part.strip_prefix('=') {
                part = rest.trim();
                self.expects_value = true;
            }
            if part.is_empty() {
                return false;
            }
        }

        self.scan(part);

        let mut complete = self.brace_depth <= 0 && self.quote != QuoteMode::Verbatim;

        match part.strip_suffix('\\') {
            Some(head) => {
                self.buffer.push_str(head);
                if !self.quote.is_open() {
                    self.buffer.push('\n');
                }
                complete = false;
            }
            None => {
                self.buffer.push_str(part);
                self.buffer.push('\n');
            }
        }

        trace!(
            depth = self.brace_depth,
            quote = ?self.quote,
            complete,
            "fed console line"
        );
        complete
    }

    fn scan(
        &mut self,
        part: &str,
    ) {
        // Every signal character is ASCII, so scanning bytes never splits one.
        let bytes = part.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let c = bytes[i];
            match self.quote {
                QuoteMode::Verbatim => {
                    if c == b'"' {
                        if bytes.get(i + 1) == Some(&b'"') {
                            i += 1;
                        } else {
                            self.quote = QuoteMode::None;
                        }
                    }
                }
                QuoteMode::Single | QuoteMode::Double => {
                    if Some(c) == self.quote.closing_quote() {
                        self.quote = QuoteMode::None;
                    } else if c == b'\\' {
                        i += 1;
                    }
                }
                QuoteMode::None => match c {
                    b'\'' => self.quote = QuoteMode::Single,
                    b'"' => self.quote = QuoteMode::Double,
                    b'@' if bytes.get(i + 1) == Some(&b'"') => {
                        self.quote = QuoteMode::Verbatim;
                        i += 1;
                    }
                    b'}' => self.brace_depth -= 1,
                    b'{' => self.brace_depth += 1,
                    _ => {}
                },
            }
            i += 1;
        }
    }

    /// Source accumulated so far
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// A command has been started but not yet consumed
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    pub fn brace_depth(&self) -> i32 {
        self.brace_depth
    }

    pub fn quote_mode(&self) -> QuoteMode {
        self.quote
    }

    pub fn expects_value(&self) -> bool {
        self.expects_value
    }

    /// Drop the pending command. Depth and quote state are reset by the next
    /// [`feed`](Self::feed).
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}
