use thiserror::Error;

/// How much surrounding input is captured on each side of the cursor when an
/// error is raised.
const CONTEXT_AMOUNT: usize = 16;

/// Broad classification used by callers that branch on the failure class
/// rather than the concrete message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Reader-level: malformed quoting, unexpected character, missing input.
    Syntax,
    /// Lexically valid but rejected by an argument type.
    Semantic,
    /// A node matched syntactically but the sender fails its gate.
    Permission,
    /// An option was opened but its value or terminator is missing.
    IncompleteOption,
    /// Command registration bug, not a user mistake.
    Internal,
}

/// Every failure the engine can produce.
///
/// Unit variants carry a fixed message; variants with fields bind their
/// arguments at the raise site. The dispatcher only ever inspects the kind
/// and the cursor, never the rendered text.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ErrorKind {
    #[error("Expected '{0}'")]
    ExpectedSymbol(char),
    #[error("Expected value")]
    ExpectedValue,
    #[error("Unclosed quoted string")]
    UnclosedQuote,
    #[error("Invalid escape sequence '\\{0}' in quoted string")]
    InvalidEscape(char),
    #[error("Cursor position {0} is out of bounds")]
    CursorOutOfBounds(usize),

    #[error("Expected boolean, found '{0}'")]
    InvalidBoolean(String),
    #[error("Expected integer, found '{0}'")]
    InvalidInteger(String),
    #[error("Integer {0} is outside the range {1}..={2}")]
    IntegerOutOfRange(i32, i32, i32),
    #[error("Expected float, found '{0}'")]
    InvalidFloat(String),
    #[error("Float {0} is outside the range {1}..={2}")]
    FloatOutOfRange(f32, f32, f32),
    #[error("{0}")]
    Semantic(String),

    #[error("Unknown command")]
    UnknownCommand,
    #[error("Incorrect argument for command")]
    IncorrectArgument,
    #[error("Incomplete command, expected more arguments")]
    IncompleteCommand,
    #[error("Expected whitespace to end one argument, but found more data")]
    ExpectedSeparator,
    #[error("Unknown option '--{0}'")]
    UnknownOption(String),
    #[error("Option '--{0}' was specified twice")]
    DuplicateOption(String),
    #[error("Option '--{0}' is missing its value")]
    IncompleteOption(String),
    #[error("Option '--{0}' does not take a value")]
    UnexpectedOptionValue(String),
    #[error("Missing required option '--{0}'")]
    MissingRequiredOption(String),
    #[error("You do not have permission to use this command")]
    PermissionDenied,

    #[error("{0}")]
    Message(String),
    #[error("Argument '{0}' not found in context (command registration bug)")]
    MissingArgument(String),
    #[error("Argument '{0}' has wrong type, expected {1} (command registration bug)")]
    WrongArgumentType(String, &'static str),
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        use ErrorKind::*;
        match self {
            Semantic(_) | InvalidBoolean(_) | InvalidInteger(_) | IntegerOutOfRange(..)
            | InvalidFloat(_) | FloatOutOfRange(..) => ErrorCategory::Semantic,
            PermissionDenied => ErrorCategory::Permission,
            IncompleteOption(_) => ErrorCategory::IncompleteOption,
            Message(_) | MissingArgument(_) | WrongArgumentType(..) => ErrorCategory::Internal,
            _ => ErrorCategory::Syntax,
        }
    }

    /// Binds the error to an absolute cursor position within `text`,
    /// capturing the surrounding excerpt now so later reader movement cannot
    /// corrupt the report.
    pub fn at(self, text: &str, cursor: usize) -> CommandError {
        CommandError {
            kind: self,
            cursor: Some(cursor),
            context: Some(ErrorContext::capture(text, cursor)),
        }
    }

    /// An error with no position, for failures that are not tied to the
    /// command line (registration bugs, action failures).
    pub fn bare(self) -> CommandError {
        CommandError {
            kind: self,
            cursor: None,
            context: None,
        }
    }
}

/// A short excerpt of the offending input with the failure position marked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    excerpt: String,
    /// Byte offset of the failure within `excerpt`.
    caret: usize,
    truncated_start: bool,
}

impl ErrorContext {
    fn capture(text: &str, cursor: usize) -> Self {
        let cursor = cursor.min(text.len());
        let mut start = cursor.saturating_sub(CONTEXT_AMOUNT);
        while !text.is_char_boundary(start) {
            start -= 1;
        }
        let mut end = (cursor + CONTEXT_AMOUNT).min(text.len());
        while !text.is_char_boundary(end) {
            end += 1;
        }
        ErrorContext {
            excerpt: text[start..end].to_string(),
            caret: cursor - start,
            truncated_start: start > 0,
        }
    }

    pub fn excerpt(&self) -> &str {
        &self.excerpt
    }

    pub fn caret(&self) -> usize {
        self.caret
    }
}

/// The final error value: message, absolute cursor position, and the input
/// excerpt captured when it was raised.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandError {
    kind: ErrorKind,
    cursor: Option<usize>,
    context: Option<ErrorContext>,
}

impl CommandError {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    /// The full diagnostic: message plus a caret-marked excerpt.
    ///
    /// ```text
    /// Unknown option '--reasn'
    /// ban Steve --reasn:griefing
    ///           ^
    /// ```
    pub fn format_diagnostic(&self) -> String {
        let mut out = self.kind.to_string();
        if let Some(ctx) = &self.context {
            let prefix = if ctx.truncated_start { "..." } else { "" };
            out.push('\n');
            out.push_str(prefix);
            out.push_str(&ctx.excerpt);
            out.push('\n');
            let pad = prefix.len() + ctx.excerpt[..ctx.caret].chars().count();
            out.push_str(&" ".repeat(pad));
            out.push('^');
        }
        out
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cursor {
            Some(cursor) => write!(f, "{} at position {}", self.kind, cursor),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_is_bound_at_raise_time() {
        let err = ErrorKind::ExpectedValue.at("ban Steve", 4);
        assert_eq!(err.cursor(), Some(4));
        assert_eq!(err.context().unwrap().excerpt(), "ban Steve");
        assert_eq!(err.context().unwrap().caret(), 4);
    }

    #[test]
    fn diagnostic_marks_the_failing_column() {
        let err = ErrorKind::InvalidInteger("abc".to_string()).at("add abc", 4);
        let rendered = err.format_diagnostic();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Expected integer, found 'abc'");
        assert_eq!(lines[1], "add abc");
        assert_eq!(lines[2], "    ^");
    }

    #[test]
    fn long_input_is_truncated_around_the_cursor() {
        let text = "a".repeat(100);
        let err = ErrorKind::ExpectedValue.at(&text, 50);
        let ctx = err.context().unwrap();
        assert_eq!(ctx.excerpt().len(), 32);
        assert_eq!(ctx.caret(), 16);
        assert!(err.format_diagnostic().contains("..."));
    }

    #[test]
    fn categories_follow_the_taxonomy() {
        assert_eq!(
            ErrorKind::UnclosedQuote.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(
            ErrorKind::Semantic("unknown block".into()).category(),
            ErrorCategory::Semantic
        );
        assert_eq!(
            ErrorKind::IncompleteOption("reason".into()).category(),
            ErrorCategory::IncompleteOption
        );
        assert_eq!(
            ErrorKind::PermissionDenied.category(),
            ErrorCategory::Permission
        );
        assert_eq!(
            ErrorKind::MissingArgument("target".into()).category(),
            ErrorCategory::Internal
        );
    }
}
