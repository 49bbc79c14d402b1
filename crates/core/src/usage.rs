use std::sync::Arc;

use indexmap::IndexSet;
use itertools::Itertools;

use crate::node::{CommandNode, NodeKind};
use crate::reader::{OPTION_PREFIX, OPTION_VALUE_SEPARATOR};

/// Renders usage for a matched path: `/ban <target> [--reason:string]`.
/// Literals print as their text, arguments as `<name>`, options as
/// `--name` or `--name:type`, optional elements bracketed.
pub fn generate_usage(path: &[Arc<CommandNode>]) -> String {
    let mut parts = Vec::new();

    for node in &path[1..] {
        parts.push(display_name(node));
    }

    if let Some(current) = path.last() {
        let structure = analyze_structure(current);
        if !structure.content.is_empty() {
            parts.push(structure.content);
        }
        for option in structure.trailing_options {
            parts.push(format!("[{}]", option));
        }
    }

    format!("/{}", parts.join(" "))
}

struct UsageStructure {
    content: String,
    trailing_options: Vec<String>,
}

fn analyze_structure(node: &CommandNode) -> UsageStructure {
    let mut trailing_options = IndexSet::new();
    let content = format_positional(node, &mut trailing_options);
    UsageStructure {
        content,
        trailing_options: trailing_options.into_iter().sorted().collect(),
    }
}

fn format_positional(node: &CommandNode, options: &mut IndexSet<String>) -> String {
    let mut positional = Vec::new();
    for child in node.sorted_children() {
        if child.is_option() {
            options.insert(display_name(child));
        } else {
            positional.push(child);
        }
    }

    let optional = node.command().is_some();

    match positional.len() {
        0 => String::new(),
        1 => {
            let child = positional[0];
            let inner = format_positional(child, options);
            let rendered = if inner.is_empty() {
                display_name(child)
            } else {
                format!("{} {}", display_name(child), inner)
            };
            if optional {
                format!("[{}]", rendered)
            } else {
                rendered
            }
        }
        _ => {
            let alternatives = positional.iter().map(|c| display_name(c)).join(" | ");
            if optional {
                format!("[{}]", alternatives)
            } else {
                format!("({})", alternatives)
            }
        }
    }
}

/// Every option reachable from `node`, one display line each, in
/// deterministic order.
pub fn option_details(node: &CommandNode) -> Vec<String> {
    let mut details = IndexSet::new();
    collect_option_details(node, &mut details);
    details.into_iter().collect()
}

fn collect_option_details(node: &CommandNode, details: &mut IndexSet<String>) {
    for child in node.sorted_children() {
        if let NodeKind::Option {
            required_unless_console,
            ..
        } = child.kind()
        {
            let mut line = display_name(child);
            if *required_unless_console {
                line.push_str(" (required in game)");
            }
            details.insert(line);
        } else {
            collect_option_details(child, details);
        }
    }
}

/// Example inputs for the argument children of `node`, for help output.
pub fn argument_examples(node: &CommandNode) -> Vec<String> {
    let mut examples = Vec::new();
    for child in node.sorted_children() {
        if let NodeKind::Argument { name, arg_type, .. } = child.kind() {
            let samples = arg_type.examples();
            if !samples.is_empty() {
                examples.push(format!("<{}>: {}", name, samples.join(", ")));
            }
        }
    }
    examples
}

/// The `/help` lookup key for a path: its leading literals.
pub fn base_name(path: &[Arc<CommandNode>]) -> String {
    let mut parts = Vec::new();
    for node in path {
        match node.kind() {
            NodeKind::Root => {}
            NodeKind::Literal { name } => parts.push(name.as_str()),
            _ => break,
        }
    }
    format!("/{}", parts.join(" "))
}

fn display_name(node: &CommandNode) -> String {
    match node.kind() {
        NodeKind::Root => String::new(),
        NodeKind::Literal { name } => name.clone(),
        NodeKind::Argument { name, .. } => format!("<{}>", name),
        NodeKind::Option {
            name,
            arg_type: Some(arg_type),
            ..
        } => format!(
            "{}{}{}{}",
            OPTION_PREFIX,
            name,
            OPTION_VALUE_SEPARATOR,
            arg_type.name()
        ),
        NodeKind::Option {
            name,
            arg_type: None,
            ..
        } => format!("{}{}", OPTION_PREFIX, name),
    }
}
