use std::sync::Arc;

use indexmap::IndexMap;

use crate::argument::ArgumentType;
use crate::context::CommandContext;
use crate::error::CommandError;
use crate::platform::{CommandSender, PluginContext};
use crate::suggestion::{SuggestionsBuilder, SuggestionsFuture};

/// The terminal action attached to a node that can end a valid command.
pub type Command = Arc<dyn Fn(&CommandContext) -> Result<(), CommandError> + Send + Sync>;

/// Per-node eligibility predicate over the sender.
pub type Requirement = Arc<dyn Fn(&dyn CommandSender) -> bool + Send + Sync>;

/// A node-attached completion source that overrides the argument type's own.
pub type SuggestionProvider = Arc<
    dyn Fn(&PluginContext, &CommandContext, SuggestionsBuilder) -> SuggestionsFuture
        + Send
        + Sync,
>;

/// What a node is: the closed set of node shapes the parser matches on.
#[derive(Clone)]
pub enum NodeKind {
    Root,
    Literal {
        name: String,
    },
    Argument {
        name: String,
        arg_type: Arc<dyn ArgumentType>,
        suggestions: Option<SuggestionProvider>,
    },
    /// A flag-like token (`--name` or `--name:value`) that may appear at any
    /// token boundary after its governing node.
    Option {
        name: String,
        arg_type: Option<Arc<dyn ArgumentType>>,
        /// Senders other than the console must supply this option.
        required_unless_console: bool,
    },
}

/// One position in the command tree.
///
/// Built once at registration time through the chaining constructors and
/// immutable afterwards; the dispatcher replaces whole subtrees by building
/// a new root and publishing it.
#[derive(Clone)]
pub struct CommandNode {
    kind: NodeKind,
    children: IndexMap<String, Arc<CommandNode>>,
    requirement: Option<Requirement>,
    required_permission: Option<String>,
    redirect: Option<Arc<CommandNode>>,
    command: Option<Command>,
}

impl CommandNode {
    fn new(kind: NodeKind) -> Self {
        CommandNode {
            kind,
            children: IndexMap::new(),
            requirement: None,
            required_permission: None,
            redirect: None,
            command: None,
        }
    }

    pub fn root() -> Self {
        Self::new(NodeKind::Root)
    }

    pub fn literal(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Literal { name: name.into() })
    }

    pub fn argument(name: impl Into<String>, arg_type: impl ArgumentType + 'static) -> Self {
        Self::new(NodeKind::Argument {
            name: name.into(),
            arg_type: Arc::new(arg_type),
            suggestions: None,
        })
    }

    /// A flag option with no value.
    pub fn option(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Option {
            name: name.into(),
            arg_type: None,
            required_unless_console: false,
        })
    }

    /// An option carrying a typed value (`--name:value`).
    pub fn valued_option(name: impl Into<String>, arg_type: impl ArgumentType + 'static) -> Self {
        Self::new(NodeKind::Option {
            name: name.into(),
            arg_type: Some(Arc::new(arg_type)),
            required_unless_console: false,
        })
    }

    /// Accepts both a plain node and an `Arc` (the latter so a subtree can
    /// also serve as a redirect target elsewhere).
    pub fn then(mut self, child: impl Into<Arc<CommandNode>>) -> Self {
        let child = child.into();
        if self.redirect.is_some() {
            panic!("Can not add children to a node that redirects");
        }
        if matches!(self.kind, NodeKind::Option { .. }) {
            panic!("Option nodes can not have children");
        }
        if matches!(child.kind, NodeKind::Root) {
            panic!("Can not add the root as a child node");
        }
        let key = child.name().to_string();
        if self.children.contains_key(&key) {
            panic!("Duplicate child '{}' at the same tree position", key);
        }
        self.children.insert(key, child);
        self
    }

    pub(crate) fn remove_child(&mut self, name: &str) -> Option<Arc<CommandNode>> {
        self.children.shift_remove(name)
    }

    pub fn executes(
        mut self,
        command: impl Fn(&CommandContext) -> Result<(), CommandError> + Send + Sync + 'static,
    ) -> Self {
        self.command = Some(Arc::new(command));
        self
    }

    pub fn requires(
        mut self,
        requirement: impl Fn(&dyn CommandSender) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.requirement = Some(Arc::new(requirement));
        self
    }

    pub fn require_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permission = Some(permission.into());
        self
    }

    /// Forwards traversal to another node's subtree (aliases). Does not
    /// copy children; the target's children, options, and terminal action
    /// all apply.
    pub fn redirect(mut self, target: &Arc<CommandNode>) -> Self {
        if !self.children.is_empty() {
            panic!("Can not redirect a node that has children");
        }
        self.redirect = Some(target.clone());
        self
    }

    /// Overrides the argument type's own completions.
    pub fn suggests(
        mut self,
        provider: impl Fn(&PluginContext, &CommandContext, SuggestionsBuilder) -> SuggestionsFuture
            + Send
            + Sync
            + 'static,
    ) -> Self {
        let NodeKind::Argument { suggestions, .. } = &mut self.kind else {
            panic!("Can not attach a suggestion provider to non-argument nodes");
        };
        *suggestions = Some(Arc::new(provider));
        self
    }

    /// Marks an option as mandatory for every sender except the console.
    pub fn required_unless_console(mut self) -> Self {
        let NodeKind::Option {
            required_unless_console,
            ..
        } = &mut self.kind
        else {
            panic!("Only option nodes can be required_unless_console");
        };
        *required_unless_console = true;
        self
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// The node identity: literal text, or argument/option name. Empty for
    /// the root.
    pub fn name(&self) -> &str {
        match &self.kind {
            NodeKind::Root => "",
            NodeKind::Literal { name } => name,
            NodeKind::Argument { name, .. } => name,
            NodeKind::Option { name, .. } => name,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.kind, NodeKind::Root)
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal { .. })
    }

    pub fn is_argument(&self) -> bool {
        matches!(self.kind, NodeKind::Argument { .. })
    }

    pub fn is_option(&self) -> bool {
        matches!(self.kind, NodeKind::Option { .. })
    }

    /// Children in declaration order.
    pub fn children(&self) -> impl Iterator<Item = &Arc<CommandNode>> {
        self.children.values()
    }

    pub fn child(&self, name: &str) -> Option<&Arc<CommandNode>> {
        self.children.get(name)
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Children in deterministic display order: literals before arguments
    /// before options, lexicographic within each class.
    pub fn sorted_children(&self) -> Vec<&Arc<CommandNode>> {
        let mut children: Vec<_> = self.children.values().collect();
        children.sort_by_key(|c| (c.class_rank(), c.name().to_string()));
        children
    }

    fn class_rank(&self) -> u8 {
        match self.kind {
            NodeKind::Root => 0,
            NodeKind::Literal { .. } => 0,
            NodeKind::Argument { .. } => 1,
            NodeKind::Option { .. } => 2,
        }
    }

    pub fn command(&self) -> Option<&Command> {
        self.command.as_ref()
    }

    pub fn redirect_target(&self) -> Option<&Arc<CommandNode>> {
        self.redirect.as_ref()
    }

    pub fn required_permission(&self) -> Option<&str> {
        self.required_permission.as_deref()
    }

    /// Whether the sender may see and traverse this node. Nodes failing
    /// this are invisible to parsing and suggestion alike.
    pub fn can_use(&self, ctx: &PluginContext, sender: &dyn CommandSender) -> bool {
        if let Some(requirement) = &self.requirement {
            if !requirement(sender) {
                return false;
            }
        }
        match &self.required_permission {
            Some(permission) => ctx.has_permission(sender, permission),
            None => true,
        }
    }
}

impl std::fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.kind {
            NodeKind::Root => "root",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Argument { .. } => "argument",
            NodeKind::Option { .. } => "option",
        };
        f.debug_struct("CommandNode")
            .field("kind", &kind)
            .field("name", &self.name())
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("executable", &self.command.is_some())
            .finish()
    }
}
