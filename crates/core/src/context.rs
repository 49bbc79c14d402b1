use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::{CommandError, ErrorKind};
use crate::node::CommandNode;
use crate::platform::CommandSender;

/// A span of the original command line, in byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StringRange {
    pub start: usize,
    pub end: usize,
}

impl StringRange {
    pub fn between(start: usize, end: usize) -> Self {
        StringRange { start, end }
    }

    pub fn at(pos: usize) -> Self {
        StringRange {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn get<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }
}

/// A value produced by an argument type, type-erased for storage.
pub type ArgumentValue = Arc<dyn Any + Send + Sync>;

/// One parsed argument: where it came from in the input and what it parsed
/// to. Immutable once created.
#[derive(Clone)]
pub struct ParsedArgument {
    range: StringRange,
    value: ArgumentValue,
}

impl ParsedArgument {
    pub fn new(range: StringRange, value: ArgumentValue) -> Self {
        ParsedArgument { range, value }
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn value(&self) -> &ArgumentValue {
        &self.value
    }
}

/// Accumulates matched nodes and parsed values while the dispatcher walks
/// the tree. Cloned at every branch point, so everything in here is cheap
/// to copy; finalized into an immutable [`CommandContext`] exactly once.
#[derive(Clone)]
pub struct CommandContextBuilder {
    sender: Arc<dyn CommandSender>,
    nodes: Vec<(Arc<CommandNode>, StringRange)>,
    arguments: FxHashMap<String, ParsedArgument>,
    range: StringRange,
}

impl CommandContextBuilder {
    pub fn new(sender: Arc<dyn CommandSender>) -> Self {
        CommandContextBuilder {
            sender,
            nodes: Vec::new(),
            arguments: FxHashMap::default(),
            range: StringRange::at(0),
        }
    }

    pub fn push_node(&mut self, node: Arc<CommandNode>, range: StringRange) {
        self.nodes.push((node, range));
        self.range.end = self.range.end.max(range.end);
    }

    pub fn add_argument(&mut self, name: impl Into<String>, argument: ParsedArgument) {
        self.arguments.insert(name.into(), argument);
    }

    pub fn sender(&self) -> &Arc<dyn CommandSender> {
        &self.sender
    }

    pub fn nodes(&self) -> &[(Arc<CommandNode>, StringRange)] {
        &self.nodes
    }

    pub fn build(self, input: impl Into<String>) -> CommandContext {
        CommandContext {
            input: input.into(),
            sender: self.sender,
            nodes: self.nodes,
            arguments: self.arguments,
            range: self.range,
        }
    }
}

/// The finished, immutable context handed to a terminal action.
pub struct CommandContext {
    input: String,
    sender: Arc<dyn CommandSender>,
    nodes: Vec<(Arc<CommandNode>, StringRange)>,
    arguments: FxHashMap<String, ParsedArgument>,
    range: StringRange,
}

impl CommandContext {
    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn sender(&self) -> &Arc<dyn CommandSender> {
        &self.sender
    }

    /// The matched path from the root to the executed node.
    pub fn nodes(&self) -> &[(Arc<CommandNode>, StringRange)] {
        &self.nodes
    }

    pub fn range(&self) -> StringRange {
        self.range
    }

    pub fn has(&self, name: &str) -> bool {
        self.arguments.contains_key(name)
    }

    /// A required argument. Missing names and type mismatches are command
    /// registration bugs, reported as such.
    pub fn get<T: Any>(&self, name: &str) -> Result<&T, CommandError> {
        let argument = self
            .arguments
            .get(name)
            .ok_or_else(|| ErrorKind::MissingArgument(name.to_string()).bare())?;
        argument.value().downcast_ref::<T>().ok_or_else(|| {
            ErrorKind::WrongArgumentType(name.to_string(), std::any::type_name::<T>()).bare()
        })
    }

    /// An optional argument (options that were not supplied): `None` when
    /// absent, an error only on a type mismatch.
    pub fn find<T: Any>(&self, name: &str) -> Result<Option<&T>, CommandError> {
        match self.arguments.get(name) {
            None => Ok(None),
            Some(argument) => argument
                .value()
                .downcast_ref::<T>()
                .map(Some)
                .ok_or_else(|| {
                    ErrorKind::WrongArgumentType(name.to_string(), std::any::type_name::<T>())
                        .bare()
                }),
        }
    }

    pub fn argument_range(&self, name: &str) -> Option<StringRange> {
        self.arguments.get(name).map(|a| a.range())
    }

    pub fn get_string(&self, name: &str) -> Result<String, CommandError> {
        Ok(self.get::<String>(name)?.clone())
    }

    pub fn get_integer(&self, name: &str) -> Result<i32, CommandError> {
        Ok(*self.get::<i32>(name)?)
    }

    pub fn get_float(&self, name: &str) -> Result<f32, CommandError> {
        Ok(*self.get::<f32>(name)?)
    }

    pub fn get_boolean(&self, name: &str) -> Result<bool, CommandError> {
        Ok(*self.get::<bool>(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ConsoleSender;

    fn context_with(name: &str, value: ArgumentValue) -> CommandContext {
        let mut builder = CommandContextBuilder::new(Arc::new(ConsoleSender));
        builder.add_argument(name, ParsedArgument::new(StringRange::between(0, 5), value));
        builder.build("dummy")
    }

    #[test]
    fn typed_getters_downcast() {
        let ctx = context_with("count", Arc::new(7i32));
        assert_eq!(ctx.get_integer("count").unwrap(), 7);
        assert!(ctx.has("count"));
        assert!(!ctx.has("missing"));
    }

    #[test]
    fn missing_argument_is_a_registration_bug() {
        let ctx = context_with("count", Arc::new(7i32));
        let err = ctx.get_string("other").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::MissingArgument("other".to_string()));
    }

    #[test]
    fn wrong_type_is_a_registration_bug() {
        let ctx = context_with("count", Arc::new(7i32));
        let err = ctx.get_string("count").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WrongArgumentType(..)));
    }

    #[test]
    fn find_distinguishes_absent_from_mistyped() {
        let ctx = context_with("reason", Arc::new("griefing".to_string()));
        assert_eq!(
            ctx.find::<String>("reason").unwrap().map(String::as_str),
            Some("griefing")
        );
        assert_eq!(ctx.find::<String>("absent").unwrap(), None);
        assert!(ctx.find::<i32>("reason").is_err());
    }
}
