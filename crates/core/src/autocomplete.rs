use std::sync::Arc;

use futures::future::join_all;
use tracing::debug;

use crate::context::{CommandContextBuilder, ParsedArgument, StringRange};
use crate::node::{CommandNode, NodeKind};
use crate::parser::{OptionSlot, resolve, try_literal};
use crate::platform::{CommandSender, PluginContext};
use crate::reader::{OPTION_PREFIX, OPTION_VALUE_SEPARATOR, StringReader};
use crate::suggestion::{Suggestions, SuggestionsBuilder, SuggestionsFuture};

/// The position the completion query resolved to: the node whose children
/// (plus open options) are candidates for the token being typed, and the
/// context accumulated on the way there.
#[derive(Clone)]
struct Frontier {
    node: Arc<CommandNode>,
    options: Vec<OptionSlot>,
    builder: CommandContextBuilder,
}

/// Re-walks the tree for a partial command line and fans the frontier out
/// to every eligible suggestion source.
///
/// This is the speculative twin of the execute-path descent: it matches
/// first-fit instead of backtracking, and any parse failure is swallowed —
/// the frontier simply keeps the state from just before the failing read,
/// because a failing token is exactly the one being typed.
pub(crate) fn collect_suggestions(
    ctx: &PluginContext,
    root: &Arc<CommandNode>,
    sender: &Arc<dyn CommandSender>,
    input: &str,
) -> SuggestionsFuture {
    let mut reader = StringReader::new(input);
    reader.skip_whitespace();

    let mut builder = CommandContextBuilder::new(sender.clone());
    builder.push_node(root.clone(), StringRange::at(reader.cursor()));
    let mut level = Frontier {
        node: resolve(root),
        options: Vec::new(),
        builder,
    };
    open_options(ctx, sender, &mut level);

    loop {
        if !reader.can_read() {
            // a fresh token starts (or the input is empty) right here
            let start = reader.cursor();
            return frontier_suggestions(ctx, sender, level, input, start);
        }
        let token_start = reader.cursor();
        let before = level.clone();
        if !match_token(ctx, sender, &mut level, &mut reader) {
            return frontier_suggestions(ctx, sender, before, input, token_start);
        }
        if !reader.can_read() {
            // the cursor sits at the end of the matched token: offer the
            // alternatives it was matched against
            return frontier_suggestions(ctx, sender, before, input, token_start);
        }
        if reader.peek() == Some(' ') {
            reader.skip();
            continue;
        }
        // the token ran into unexpected data; complete it from its own level
        return frontier_suggestions(ctx, sender, before, input, token_start);
    }
}

fn open_options(ctx: &PluginContext, sender: &Arc<dyn CommandSender>, level: &mut Frontier) {
    for child in level.node.children() {
        if child.is_option() && child.can_use(ctx, sender.as_ref()) {
            level.options.push(OptionSlot {
                node: child.clone(),
                consumed: false,
            });
        }
    }
}

fn enter(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    level: &mut Frontier,
    child: &Arc<CommandNode>,
    range: StringRange,
) {
    level.builder.push_node(child.clone(), range);
    level.node = resolve(child);
    open_options(ctx, sender, level);
}

/// First-fit match of one token; `false` leaves the reader wherever the
/// caller snapshotted it.
fn match_token(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    level: &mut Frontier,
    reader: &mut StringReader<'_>,
) -> bool {
    let start = reader.cursor();
    let node = level.node.clone();

    for child in node.children().filter(|c| c.is_literal()) {
        if !child.can_use(ctx, sender.as_ref()) {
            continue;
        }
        if try_literal(child.name(), reader) {
            enter(
                ctx,
                sender,
                level,
                child,
                StringRange::between(start, reader.cursor()),
            );
            return true;
        }
    }

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
                level
                    .builder
                    .add_argument(name.clone(), ParsedArgument::new(range, value));
                enter(ctx, sender, level, child, range);
                return true;
            }
            Err(err) => {
                debug!("suggestion probe swallowed parse failure: {err}");
                reader.set_cursor(start);
            }
        }
    }

    if reader.remaining().starts_with(OPTION_PREFIX) {
        if match_option_token(ctx, level, reader, start) {
            return true;
        }
        reader.set_cursor(start);
    }

    false
}

fn match_option_token(
    ctx: &PluginContext,
    level: &mut Frontier,
    reader: &mut StringReader<'_>,
    token_start: usize,
) -> bool {
    reader.set_cursor(token_start + OPTION_PREFIX.len());
    let name = reader.read_unquoted_string().to_string();
    let Some(index) = level
        .options
        .iter()
        .position(|s| s.node.name() == name && !s.consumed)
    else {
        return false;
    };
    let option_node = level.options[index].node.clone();
    let NodeKind::Option { arg_type, .. } = option_node.kind() else {
        unreachable!("option slots only hold option nodes")
    };

    match arg_type {
        Some(arg_type) => {
            if reader.peek() != Some(OPTION_VALUE_SEPARATOR) {
                return false;
            }
            reader.skip();
            if !reader.can_read() || reader.peek() == Some(' ') {
                return false;
            }
            let value_start = reader.cursor();
            match arg_type.parse(ctx, reader) {
                Ok(value) => {
                    let range = StringRange::between(value_start, reader.cursor());
                    level
                        .builder
                        .add_argument(option_node.name(), ParsedArgument::new(range, value));
                }
                Err(err) => {
                    debug!("suggestion probe swallowed option value failure: {err}");
                    return false;
                }
            }
        }
        None => {
            if reader.peek() == Some(OPTION_VALUE_SEPARATOR) {
                return false;
            }
            let range = StringRange::between(token_start, reader.cursor());
            level
                .builder
                .add_argument(option_node.name(), ParsedArgument::new(range, Arc::new(true)));
        }
    }

    level.options[index].consumed = true;
    level.builder.push_node(
        option_node,
        StringRange::between(token_start, reader.cursor()),
    );
    true
}

/// Asks every structurally eligible node at the frontier for candidates and
/// joins them. The merge is deterministic regardless of the order the
/// individual futures complete in.
fn frontier_suggestions(
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    level: Frontier,
    input: &str,
    start: usize,
) -> SuggestionsFuture {
    let remaining_lower = input[start..].to_ascii_lowercase();
    let partial = level.builder.build(input);
    let mut futures: Vec<SuggestionsFuture> = Vec::new();
    let mut texts = SuggestionsBuilder::new(input, start);

    for child in level.node.children() {
        if !child.can_use(ctx, sender.as_ref()) {
            continue;
        }
        match child.kind() {
            NodeKind::Literal { name } => {
                if name.to_ascii_lowercase().starts_with(&remaining_lower) {
                    texts = texts.suggest(name.clone());
                }
            }
            NodeKind::Argument {
                arg_type,
                suggestions,
                ..
            } => {
                let builder = SuggestionsBuilder::new(input, start);
                let future = match suggestions {
                    Some(provider) => provider(ctx, &partial, builder),
                    None => arg_type.list_suggestions(ctx, &partial, builder),
                };
                futures.push(future);
            }
            _ => {}
        }
    }

    for slot in &level.options {
        if slot.consumed {
            continue;
        }
        let NodeKind::Option { arg_type, .. } = slot.node.kind() else {
            unreachable!("option slots only hold option nodes")
        };
        match arg_type {
            Some(arg_type) => {
                let opened = format!(
                    "{}{}{}",
                    OPTION_PREFIX,
                    slot.node.name(),
                    OPTION_VALUE_SEPARATOR
                );
                if input[start..].starts_with(&opened) {
                    // name and separator already typed: complete the value
                    let builder = SuggestionsBuilder::new(input, start + opened.len());
                    futures.push(arg_type.list_suggestions(ctx, &partial, builder));
                } else if opened.to_ascii_lowercase().starts_with(&remaining_lower) {
                    texts = texts.suggest(opened);
                }
            }
            None => {
                let flag = format!("{}{}", OPTION_PREFIX, slot.node.name());
                if flag.to_ascii_lowercase().starts_with(&remaining_lower) {
                    texts = texts.suggest(flag);
                }
            }
        }
    }

    futures.push(texts.build_future());
    let input = input.to_string();
    Box::pin(async move {
        let groups = join_all(futures).await;
        Suggestions::merge(&input, groups)
    })
}
