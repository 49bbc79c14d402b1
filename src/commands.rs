use std::collections::HashMap;
use std::sync::Arc;

use lectern_core::{
    CommandDispatcher, CommandNode, FloatArgument, StringArgument, usage,
};
use tracing::warn;

pub fn register_commands(dispatcher: &Arc<CommandDispatcher>) {
    dispatcher.register(
        CommandNode::literal("say").then(
            CommandNode::argument("message", StringArgument::greedy()).executes(|ctx| {
                println!("[Server] {}", ctx.get_string("message")?);
                Ok(())
            }),
        ),
    );

    dispatcher.register(
        CommandNode::literal("ban").then(
            CommandNode::argument("target", StringArgument::word())
                .executes(|ctx| {
                    let target = ctx.get_string("target")?;
                    match ctx.find::<String>("reason")? {
                        Some(reason) => println!("Banned {} ({})", target, reason),
                        None => println!("Banned {}", target),
                    }
                    Ok(())
                })
                .then(CommandNode::valued_option("reason", StringArgument::phrase())),
        ),
    );

    dispatcher.register(
        CommandNode::literal("teleport").then(
            CommandNode::argument("x", FloatArgument::new()).then(
                CommandNode::argument("y", FloatArgument::new()).then(
                    CommandNode::argument("z", FloatArgument::new()).executes(|ctx| {
                        println!(
                            "Teleporting to ({}, {}, {})",
                            ctx.get_float("x")?,
                            ctx.get_float("y")?,
                            ctx.get_float("z")?
                        );
                        Ok(())
                    }),
                ),
            ),
        ),
    );

    dispatcher.register(
        CommandNode::literal("gamemode").then(
            CommandNode::argument("mode", StringArgument::word())
                .suggests(|_, _, mut builder| {
                    for mode in ["adventure", "creative", "spectator", "survival"] {
                        if mode.starts_with(&builder.remaining_lowercase()) {
                            builder = builder.suggest(mode);
                        }
                    }
                    builder.build_future()
                })
                .executes(|ctx| {
                    println!("Gamemode set to {}", ctx.get_string("mode")?);
                    Ok(())
                }),
        ),
    );

    register_help(dispatcher);
}

fn register_help(dispatcher: &Arc<CommandDispatcher>) {
    let for_listing = dispatcher.clone();
    let for_lookup = dispatcher.clone();

    dispatcher.register(
        CommandNode::literal("help")
            .executes(move |_| {
                let root = for_listing.root();
                let mut names: Vec<_> = root.children().map(|c| c.name().to_string()).collect();
                names.sort();
                println!("Run /help <command> for more information.");
                println!("Available commands:");
                for name in names {
                    println!(" /{}", name);
                }
                Ok(())
            })
            .then(
                CommandNode::argument("command", StringArgument::greedy()).executes(move |ctx| {
                    let query = ctx.get_string("command")?;
                    print_help(&for_lookup, query.trim());
                    Ok(())
                }),
            ),
    );
}

fn print_help(dispatcher: &Arc<CommandDispatcher>, query: &str) {
    let root = dispatcher.root();
    let mut path = vec![root.clone()];
    let mut current = root;
    for token in query.split_whitespace() {
        let Some(child) = root_child(&current, token) else {
            println!("Command not found: {}", query);
            return;
        };
        path.push(child.clone());
        current = child.redirect_target().cloned().unwrap_or(child);
    }
    println!("Usage: {}", usage::generate_usage(&path));
    let options = usage::option_details(&current);
    if !options.is_empty() {
        println!("Available options:");
        for option in options {
            println!(" {}", option);
        }
    }
    let examples = usage::argument_examples(&current);
    if !examples.is_empty() {
        println!("Examples:");
        for example in examples {
            println!(" {}", example);
        }
    }
}

fn root_child(node: &Arc<CommandNode>, name: &str) -> Option<Arc<CommandNode>> {
    node.child(name).cloned()
}

/// Registers configured aliases as redirects to their target subtrees.
pub fn register_aliases(dispatcher: &Arc<CommandDispatcher>, aliases: &HashMap<String, String>) {
    for (alias, target) in aliases {
        let root = dispatcher.root();
        match root.child(target.trim()) {
            Some(node) => {
                dispatcher.register(CommandNode::literal(alias.trim()).redirect(node));
            }
            None => warn!("alias '{alias}' points at unknown command '{target}'"),
        }
    }
}
