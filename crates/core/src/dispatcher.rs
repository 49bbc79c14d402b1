use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::autocomplete;
use crate::error::{CommandError, ErrorKind};
use crate::node::CommandNode;
use crate::parser;
use crate::platform::{CommandSender, PluginContext};
use crate::reader::StringReader;
use crate::suggestion::SuggestionsFuture;

/// Owns the command tree and orchestrates parsing, execution, and
/// completion.
///
/// The tree is read-mostly: traversal only ever sees an immutable root
/// snapshot, and [`register`]/[`remove`] publish a new root atomically
/// (copy-on-write on the child map), so registration is safe while
/// concurrent parses are in flight.
///
/// [`register`]: CommandDispatcher::register
/// [`remove`]: CommandDispatcher::remove
pub struct CommandDispatcher {
    root: RwLock<Arc<CommandNode>>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        CommandDispatcher {
            root: RwLock::new(Arc::new(CommandNode::root())),
        }
    }

    /// The current tree snapshot. Parses running against it are unaffected
    /// by later registrations.
    pub fn root(&self) -> Arc<CommandNode> {
        self.root
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Adds a whole command subtree. Duplicate names at the root are
    /// rejected at build time, like every other duplicate child.
    pub fn register(&self, node: impl Into<Arc<CommandNode>>) {
        let node = node.into();
        let name = node.name().to_string();
        let mut guard = self.root.write().unwrap_or_else(PoisonError::into_inner);
        let new_root = guard.as_ref().clone().then(node);
        *guard = Arc::new(new_root);
        debug!("registered command '/{name}'");
    }

    /// Removes a root-level subtree. Returns whether anything was removed.
    pub fn remove(&self, name: &str) -> bool {
        let mut guard = self.root.write().unwrap_or_else(PoisonError::into_inner);
        let mut new_root = guard.as_ref().clone();
        let removed = new_root.remove_child(name).is_some();
        if removed {
            *guard = Arc::new(new_root);
            debug!("removed command '/{name}'");
        }
        removed
    }

    /// Parses `input` against the current tree and runs the matched
    /// terminal action. On failure nothing executes and the deepest-cursor
    /// error among all attempted branches is returned.
    pub fn execute(
        &self,
        ctx: &PluginContext,
        sender: &Arc<dyn CommandSender>,
        input: &str,
    ) -> Result<(), CommandError> {
        let root = self.root();
        match parser::parse_command(ctx, &root, sender, input) {
            Ok(parsed) => (parsed.command)(&parsed.context),
            Err(err) if matches!(err.kind(), ErrorKind::UnknownCommand) => {
                Err(refine_unknown(ctx, &root, sender, input, err))
            }
            Err(err) => Err(err),
        }
    }

    /// Completion candidates for a partial command line. The returned
    /// future may be dropped at any time; abandonment is advisory and the
    /// eventual result is simply discarded.
    pub fn suggestions(
        &self,
        ctx: &PluginContext,
        sender: &Arc<dyn CommandSender>,
        input: &str,
    ) -> SuggestionsFuture {
        let root = self.root();
        autocomplete::collect_suggestions(ctx, &root, sender, input)
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// A command name that exists but is gated away from this sender reports a
/// permission failure at the top-level call, not an unknown command. Only
/// the root level gets this treatment; deeper gated nodes stay invisible.
fn refine_unknown(
    ctx: &PluginContext,
    root: &Arc<CommandNode>,
    sender: &Arc<dyn CommandSender>,
    input: &str,
    err: CommandError,
) -> CommandError {
    let mut reader = StringReader::new(input);
    reader.skip_whitespace();
    let start = reader.cursor();
    let token = reader
        .remaining()
        .split(char::is_whitespace)
        .next()
        .unwrap_or("");
    if token.is_empty() {
        return err;
    }
    for child in root.children().filter(|c| c.is_literal()) {
        if child.name() == token && !child.can_use(ctx, sender.as_ref()) {
            return ErrorKind::PermissionDenied.at(input, start);
        }
    }
    err
}
