use std::sync::Arc;

use crate::context::{ArgumentValue, CommandContext};
use crate::error::{CommandError, ErrorKind};
use crate::platform::PluginContext;
use crate::reader::StringReader;
use crate::suggestion::{SuggestionsBuilder, SuggestionsFuture};

/// The pluggable unit of the grammar.
///
/// `parse` must consume exactly the characters belonging to the value and
/// leave the cursor immediately after them — never trailing whitespace —
/// and must be idempotent for a fixed reader state and context.
/// `list_suggestions` must not fail; a type with nothing to offer returns
/// the builder unchanged. Types that need game data implement this trait
/// outside the engine and reach their host through
/// [`PluginContext::service`].
pub trait ArgumentType: Send + Sync {
    fn parse(
        &self,
        ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError>;

    fn list_suggestions(
        &self,
        _ctx: &PluginContext,
        _context: &CommandContext,
        builder: SuggestionsBuilder,
    ) -> SuggestionsFuture {
        builder.build_future()
    }

    /// Example inputs for usage/help text.
    fn examples(&self) -> &[&str] {
        &[]
    }

    /// The type name rendered in usage text (`--reason:string`).
    fn name(&self) -> &str;
}

/// How much of the input a string argument claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StringMode {
    /// A single word, ended by whitespace or the option value separator.
    Word,
    /// A word, or a `"..."` phrase with escapes.
    Phrase,
    /// Everything left on the line.
    Greedy,
}

pub struct StringArgument {
    mode: StringMode,
}

impl StringArgument {
    /// A single unquoted word.
    pub fn word() -> Self {
        StringArgument {
            mode: StringMode::Word,
        }
    }

    /// A word or a quoted phrase.
    pub fn phrase() -> Self {
        StringArgument {
            mode: StringMode::Phrase,
        }
    }

    /// The whole remainder of the line.
    pub fn greedy() -> Self {
        StringArgument {
            mode: StringMode::Greedy,
        }
    }
}

impl ArgumentType for StringArgument {
    fn parse(
        &self,
        _ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError> {
        let value = match self.mode {
            StringMode::Word => {
                let start = reader.cursor();
                let word = reader.read_unquoted_string();
                if word.is_empty() {
                    return Err(ErrorKind::ExpectedValue.at(reader.text(), start));
                }
                word.to_string()
            }
            StringMode::Phrase => reader.read_string()?,
            StringMode::Greedy => {
                let rest = reader.remaining().to_string();
                reader.set_cursor(reader.text().len());
                rest
            }
        };
        Ok(Arc::new(value))
    }

    fn examples(&self) -> &[&str] {
        match self.mode {
            StringMode::Word => &["word", "word_with_underscores"],
            StringMode::Phrase => &["word", "\"quoted phrase\""],
            StringMode::Greedy => &["word", "words with spaces"],
        }
    }

    fn name(&self) -> &str {
        match self.mode {
            StringMode::Word => "string",
            StringMode::Phrase => "phrase",
            StringMode::Greedy => "text",
        }
    }
}

pub struct IntegerArgument {
    min: i32,
    max: i32,
}

impl IntegerArgument {
    pub fn new() -> Self {
        IntegerArgument {
            min: i32::MIN,
            max: i32::MAX,
        }
    }

    pub fn bounded(min: i32, max: i32) -> Self {
        IntegerArgument { min, max }
    }
}

impl Default for IntegerArgument {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentType for IntegerArgument {
    fn parse(
        &self,
        _ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError> {
        let start = reader.cursor();
        let token = reader.read_unquoted_string();
        if token.is_empty() {
            return Err(ErrorKind::ExpectedValue.at(reader.text(), start));
        }
        let value = token.parse::<i32>().map_err(|_| {
            ErrorKind::InvalidInteger(token.to_string()).at(reader.text(), start)
        })?;
        if !(self.min..=self.max).contains(&value) {
            return Err(
                ErrorKind::IntegerOutOfRange(value, self.min, self.max).at(reader.text(), start)
            );
        }
        Ok(Arc::new(value))
    }

    fn examples(&self) -> &[&str] {
        &["0", "123", "-42"]
    }

    fn name(&self) -> &str {
        "integer"
    }
}

pub struct FloatArgument {
    min: f32,
    max: f32,
}

impl FloatArgument {
    pub fn new() -> Self {
        FloatArgument {
            min: f32::MIN,
            max: f32::MAX,
        }
    }

    pub fn bounded(min: f32, max: f32) -> Self {
        FloatArgument { min, max }
    }
}

impl Default for FloatArgument {
    fn default() -> Self {
        Self::new()
    }
}

impl ArgumentType for FloatArgument {
    fn parse(
        &self,
        _ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError> {
        let start = reader.cursor();
        let token = reader.read_unquoted_string();
        if token.is_empty() {
            return Err(ErrorKind::ExpectedValue.at(reader.text(), start));
        }
        let value = token
            .parse::<f32>()
            .map_err(|_| ErrorKind::InvalidFloat(token.to_string()).at(reader.text(), start))?;
        if !(self.min..=self.max).contains(&value) {
            return Err(
                ErrorKind::FloatOutOfRange(value, self.min, self.max).at(reader.text(), start)
            );
        }
        Ok(Arc::new(value))
    }

    fn examples(&self) -> &[&str] {
        &["0", "1.5", "-0.25"]
    }

    fn name(&self) -> &str {
        "float"
    }
}

pub struct BooleanArgument;

impl ArgumentType for BooleanArgument {
    fn parse(
        &self,
        _ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError> {
        let start = reader.cursor();
        let token = reader.read_unquoted_string();
        if token.is_empty() {
            return Err(ErrorKind::ExpectedValue.at(reader.text(), start));
        }
        let value = match token.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" | "on" => true,
            "false" | "no" | "0" | "off" => false,
            _ => {
                return Err(ErrorKind::InvalidBoolean(token.to_string()).at(reader.text(), start));
            }
        };
        Ok(Arc::new(value))
    }

    fn list_suggestions(
        &self,
        _ctx: &PluginContext,
        _context: &CommandContext,
        mut builder: SuggestionsBuilder,
    ) -> SuggestionsFuture {
        let remaining = builder.remaining_lowercase();
        for candidate in ["true", "false"] {
            if candidate.starts_with(&remaining) {
                builder = builder.suggest(candidate);
            }
        }
        builder.build_future()
    }

    fn examples(&self) -> &[&str] {
        &["true", "false"]
    }

    fn name(&self) -> &str {
        "boolean"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<T: Clone + 'static>(arg: &dyn ArgumentType, input: &str) -> (T, usize) {
        let ctx = PluginContext::new();
        let mut reader = StringReader::new(input);
        let value = arg.parse(&ctx, &mut reader).unwrap();
        (value.downcast_ref::<T>().unwrap().clone(), reader.cursor())
    }

    fn parse_err(arg: &dyn ArgumentType, input: &str) -> CommandError {
        let ctx = PluginContext::new();
        let mut reader = StringReader::new(input);
        arg.parse(&ctx, &mut reader).unwrap_err()
    }

    #[test]
    fn word_consumes_exactly_one_token() {
        let (value, cursor) = parse::<String>(&StringArgument::word(), "Steve rest");
        assert_eq!(value, "Steve");
        assert_eq!(cursor, 5);
    }

    #[test]
    fn phrase_accepts_quoted_input() {
        let (value, cursor) = parse::<String>(&StringArgument::phrase(), "\"a b\" rest");
        assert_eq!(value, "a b");
        assert_eq!(cursor, 5);
    }

    #[test]
    fn greedy_takes_the_rest_of_the_line() {
        let (value, cursor) = parse::<String>(&StringArgument::greedy(), "all of this");
        assert_eq!(value, "all of this");
        assert_eq!(cursor, 11);
    }

    #[test]
    fn integer_respects_bounds() {
        let (value, _) = parse::<i32>(&IntegerArgument::bounded(0, 100), "42");
        assert_eq!(value, 42);
        let err = parse_err(&IntegerArgument::bounded(0, 100), "101");
        assert_eq!(err.kind(), &ErrorKind::IntegerOutOfRange(101, 0, 100));
    }

    #[test]
    fn integer_rejects_garbage_at_token_start() {
        let err = parse_err(&IntegerArgument::new(), "12ab");
        assert_eq!(err.kind(), &ErrorKind::InvalidInteger("12ab".to_string()));
        assert_eq!(err.cursor(), Some(0));
    }

    #[test]
    fn boolean_accepts_the_usual_spellings() {
        for token in ["true", "yes", "1", "on"] {
            let (value, _) = parse::<bool>(&BooleanArgument, token);
            assert!(value);
        }
        for token in ["false", "no", "0", "OFF"] {
            let (value, _) = parse::<bool>(&BooleanArgument, token);
            assert!(!value);
        }
        let err = parse_err(&BooleanArgument, "maybe");
        assert_eq!(err.kind(), &ErrorKind::InvalidBoolean("maybe".to_string()));
    }

    #[test]
    fn parse_is_idempotent_given_the_same_reader_state() {
        let ctx = PluginContext::new();
        let arg = IntegerArgument::new();
        let mut reader = StringReader::new("123 rest");
        let first = arg.parse(&ctx, &mut reader).unwrap();
        let after_first = reader.cursor();
        reader.set_cursor(0);
        let second = arg.parse(&ctx, &mut reader).unwrap();
        assert_eq!(
            first.downcast_ref::<i32>().unwrap(),
            second.downcast_ref::<i32>().unwrap()
        );
        assert_eq!(reader.cursor(), after_first);
    }

    #[test]
    fn parse_never_consumes_trailing_whitespace() {
        let (_, cursor) = parse::<i32>(&IntegerArgument::new(), "7   rest");
        assert_eq!(cursor, 1);
    }
}
