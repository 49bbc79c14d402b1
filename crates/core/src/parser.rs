use std::sync::Arc;

use crate::context::{CommandContext, CommandContextBuilder, ParsedArgument, StringRange};
use crate::error::{CommandError, ErrorKind};
use crate::node::{Command, CommandNode, NodeKind};
use crate::platform::{CommandSender, PluginContext};
use crate::reader::{OPTION_PREFIX, OPTION_VALUE_SEPARATOR, StringReader};

/// A fully matched command line: the finalized context plus the terminal
/// action to run.
pub(crate) struct SuccessfulParse {
    pub context: CommandContext,
    pub command: Command,
}

impl std::fmt::Debug for SuccessfulParse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuccessfulParse").finish_non_exhaustive()
    }
}

/// An option that is open for consumption at the current position. Options
/// join this set when their governing node is matched and leave it (flip to
/// consumed) the first time they appear in the input.
#[derive(Clone)]
pub(crate) struct OptionSlot {
    pub node: Arc<CommandNode>,
    pub consumed: bool,
}

/// Everything that must be snapshotted to try a sibling branch. Cloned at
/// each branch point; the reader itself backtracks by cursor alone.
#[derive(Clone)]
struct DescentState {
    builder: CommandContextBuilder,
    options: Vec<OptionSlot>,
    /// The last matched node, options included. Terminal resolution starts
    /// here.
    current: Arc<CommandNode>,
}

/// Follows redirect edges to the node whose subtree actually applies.
/// Redirecting forwards traversal without consuming input, so aliases share
/// the target's children, options, and terminal action.
pub(crate) fn resolve(node: &Arc<CommandNode>) -> Arc<CommandNode> {
    let mut current = node.clone();
    while let Some(target) = current.redirect_target() {
        current = target.clone();
    }
    current
}

/// Consumes `name` if the remaining input starts with it at a token
/// boundary (whitespace or end-of-input after it).
pub(crate) fn try_literal(name: &str, reader: &mut StringReader<'_>) -> bool {
    let remaining = reader.remaining();
    if !remaining.starts_with(name) {
        return false;
    }
    let boundary = remaining[name.len()..]
        .chars()
        .next()
        .is_none_or(char::is_whitespace);
    if boundary {
        reader.set_cursor(reader.cursor() + name.len());
    }
    boundary
}

pub(crate) fn parse_command(
    ctx: &PluginContext,
    root: &Arc<CommandNode>,
    sender: &Arc<dyn CommandSender>,
    input: &str,
) -> Result<SuccessfulParse, CommandError> {
    let mut reader = StringReader::new(input);
    reader.skip_whitespace();
    let mut builder = CommandContextBuilder::new(sender.clone());
    builder.push_node(root.clone(), StringRange::at(reader.cursor()));
    let state = DescentState {
        builder,
        options: Vec::new(),
        current: root.clone(),
    };
    let (state, command) = descend(ctx, sender, root, &mut reader, state, true)?;
    Ok(SuccessfulParse {
        context: state.builder.build(input),
        command,
    })
}

/// Enters an already-matched node: follows redirects, opens its option
/// children, and parses the rest of the input from there.
fn descend(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    node: &Arc<CommandNode>,
    reader: &mut StringReader<'_>,
    mut state: DescentState,
    at_root: bool,
) -> Result<(DescentState, Command), CommandError> {
    let node = resolve(node);
    state.current = node.clone();
    for child in node.children() {
        if child.is_option() && child.can_use(ctx, sender.as_ref()) {
            state.options.push(OptionSlot {
                node: child.clone(),
                consumed: false,
            });
        }
    }
    step(ctx, sender, &node, reader, state, !at_root)
}

/// Parses one token at `node` and recurses. `node` is the positional
/// frontier: the node whose children are candidates for the next token.
fn step(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    node: &Arc<CommandNode>,
    reader: &mut StringReader<'_>,
    state: DescentState,
    expect_separator: bool,
) -> Result<(DescentState, Command), CommandError> {
    if !reader.can_read() {
        return finish(node, sender, reader, state);
    }
    if expect_separator {
        // matched text must be followed by exactly one separating space
        if reader.peek() != Some(' ') {
            return Err(ErrorKind::ExpectedSeparator.at(reader.text(), reader.cursor()));
        }
        reader.skip();
        if reader.remaining().trim_start().is_empty() {
            return finish(node, sender, reader, state);
        }
    }

    let start = reader.cursor();
    let mut best: Option<CommandError> = None;

    // literals are greedy: an exact text match beats any argument or option
    for child in node.children().filter(|c| c.is_literal()) {
        if !child.can_use(ctx, sender.as_ref()) {
            continue;
        }
        if !try_literal(child.name(), reader) {
            continue;
        }
        let mut next = state.clone();
        next.builder
            .push_node(child.clone(), StringRange::between(start, reader.cursor()));
        match descend(ctx, sender, child, reader, next, false) {
            Ok(done) => return Ok(done),
            Err(err) => {
                consider(&mut best, err);
                reader.set_cursor(start);
            }
        }
    }

    // argument children, declaration order breaking ties
    for child in node.children().filter(|c| c.is_argument()) {
        if !child.can_use(ctx, sender.as_ref()) {
            continue;
        }
        let NodeKind::Argument { name, arg_type, .. } = child.kind() else {
            unreachable!("filtered to argument nodes")
        };
        match arg_type.parse(ctx, reader) {
            Ok(value) => {
                let range = StringRange::between(start, reader.cursor());
                let mut next = state.clone();
                next.builder.push_node(child.clone(), range);
                next.builder
                    .add_argument(name.clone(), ParsedArgument::new(range, value));
                match descend(ctx, sender, child, reader, next, false) {
                    Ok(done) => return Ok(done),
                    Err(err) => {
                        consider(&mut best, err);
                        reader.set_cursor(start);
                    }
                }
            }
            Err(err) => {
                consider(&mut best, err);
                reader.set_cursor(start);
            }
        }
    }

    // options last: non-positional, drawn from every node matched so far
    if reader.remaining().starts_with(OPTION_PREFIX) {
        match parse_option(ctx, sender, node, reader, state) {
            Ok(done) => return Ok(done),
            Err(err) => consider(&mut best, err),
        }
    }

    match best {
        Some(err) => Err(err),
        None => {
            let kind = if node.is_root() {
                ErrorKind::UnknownCommand
            } else {
                ErrorKind::IncorrectArgument
            };
            Err(kind.at(reader.text(), start))
        }
    }
}

/// Consumes one `--name` / `--name:value` token against the open option
/// set, then continues at the same positional frontier.
fn parse_option(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    node: &Arc<CommandNode>,
    reader: &mut StringReader<'_>,
    mut state: DescentState,
) -> Result<(DescentState, Command), CommandError> {
    let token_start = reader.cursor();
    reader.set_cursor(token_start + OPTION_PREFIX.len());
    let name = reader.read_unquoted_string().to_string();

    let Some(index) = state.options.iter().position(|s| s.node.name() == name) else {
        return Err(ErrorKind::UnknownOption(name).at(reader.text(), token_start));
    };
    if state.options[index].consumed {
        return Err(ErrorKind::DuplicateOption(name).at(reader.text(), token_start));
    }
    let option_node = state.options[index].node.clone();
    let NodeKind::Option { arg_type, .. } = option_node.kind() else {
        unreachable!("option slots only hold option nodes")
    };

    match arg_type {
        Some(arg_type) => {
            if reader.peek() != Some(OPTION_VALUE_SEPARATOR) {
                return Err(ErrorKind::IncompleteOption(name).at(reader.text(), reader.cursor()));
            }
            reader.skip();
            if !reader.can_read() || reader.peek() == Some(' ') {
                return Err(ErrorKind::IncompleteOption(name).at(reader.text(), reader.cursor()));
            }
            let value_start = reader.cursor();
            let value = arg_type.parse(ctx, reader)?;
            let range = StringRange::between(value_start, reader.cursor());
            state
                .builder
                .add_argument(option_node.name(), ParsedArgument::new(range, value));
        }
        None => {
            if reader.peek() == Some(OPTION_VALUE_SEPARATOR) {
                return Err(
                    ErrorKind::UnexpectedOptionValue(name).at(reader.text(), reader.cursor())
                );
            }
            let range = StringRange::between(token_start, reader.cursor());
            state
                .builder
                .add_argument(option_node.name(), ParsedArgument::new(range, Arc::new(true)));
        }
    }

    state.options[index].consumed = true;
    state.builder.push_node(
        option_node.clone(),
        StringRange::between(token_start, reader.cursor()),
    );
    state.current = option_node;
    step(ctx, sender, node, reader, state, true)
}

/// End of input (ignoring trailing whitespace): check option obligations
/// and resolve the terminal action.
fn finish(
    node: &Arc<CommandNode>,
    sender: &Arc<dyn CommandSender>,
    reader: &StringReader<'_>,
    state: DescentState,
) -> Result<(DescentState, Command), CommandError> {
    let cursor = reader.cursor();
    if !sender.is_console() {
        for slot in &state.options {
            let NodeKind::Option {
                required_unless_console,
                ..
            } = slot.node.kind()
            else {
                unreachable!("option slots only hold option nodes")
            };
            if *required_unless_console && !slot.consumed {
                return Err(ErrorKind::MissingRequiredOption(slot.node.name().to_string())
                    .at(reader.text(), cursor));
            }
        }
    }
    if let Some(command) = state.current.command() {
        let command = command.clone();
        return Ok((state, command));
    }
    // a consumed option without its own action falls back to the action of
    // its governing node
    if state.current.is_option() {
        if let Some(command) = node.command() {
            let command = command.clone();
            return Ok((state, command));
        }
    }
    let kind = if node.is_root() {
        ErrorKind::UnknownCommand
    } else {
        ErrorKind::IncompleteCommand
    };
    Err(kind.at(reader.text(), cursor))
}

fn consider(best: &mut Option<CommandError>, err: CommandError) {
    let deeper = match best.as_ref() {
        None => true,
        Some(current) => err.cursor().unwrap_or(0) > current.cursor().unwrap_or(0),
    };
    if deeper {
        *best = Some(err);
    }
}
