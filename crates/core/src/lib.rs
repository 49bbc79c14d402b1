//! Command grammar and dispatch engine for server add-ons.
//!
//! Commands are declared as a tree of typed nodes — literals, typed
//! arguments, and flag-style options — and parsed by a backtracking
//! recursive descent that reports cursor-accurate errors and answers
//! tab-completion queries asynchronously.
//!
//! ```
//! use std::sync::Arc;
//! use lectern_core::{
//!     CommandDispatcher, CommandNode, CommandSender, PluginContext, StringArgument,
//! };
//!
//! struct Console;
//! impl CommandSender for Console {
//!     fn is_console(&self) -> bool {
//!         true
//!     }
//! }
//!
//! let dispatcher = CommandDispatcher::new();
//! dispatcher.register(
//!     CommandNode::literal("ban").then(
//!         CommandNode::argument("target", StringArgument::word())
//!             .executes(|ctx| {
//!                 println!("banning {}", ctx.get_string("target")?);
//!                 Ok(())
//!             })
//!             .then(CommandNode::valued_option("reason", StringArgument::word())),
//!     ),
//! );
//!
//! let sender: Arc<dyn CommandSender> = Arc::new(Console);
//! dispatcher
//!     .execute(&PluginContext::new(), &sender, "ban Steve --reason:griefing")
//!     .unwrap();
//! ```

#![deny(rust_2018_idioms)]

pub mod argument;
mod autocomplete;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod node;
mod parser;
pub mod platform;
pub mod reader;
pub mod suggestion;
pub mod usage;

pub use argument::{ArgumentType, BooleanArgument, FloatArgument, IntegerArgument, StringArgument};
pub use context::{ArgumentValue, CommandContext, ParsedArgument, StringRange};
pub use dispatcher::CommandDispatcher;
pub use error::{CommandError, ErrorCategory, ErrorKind};
pub use node::{Command, CommandNode, NodeKind, Requirement, SuggestionProvider};
pub use platform::{AllowAll, CommandSender, ConsoleSender, PermissionProvider, PluginContext};
pub use reader::StringReader;
pub use suggestion::{Suggestion, Suggestions, SuggestionsBuilder, SuggestionsFuture};
