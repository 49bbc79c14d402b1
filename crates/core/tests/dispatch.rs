use std::sync::{Arc, Mutex};

use lectern_core::{
    ArgumentType, ArgumentValue, CommandContext, CommandDispatcher, CommandError, CommandNode,
    CommandSender, ErrorCategory, ErrorKind, IntegerArgument, PermissionProvider, PluginContext,
    StringArgument, StringReader, Suggestions,
};

struct Player;

impl CommandSender for Player {}

struct Console;

impl CommandSender for Console {
    fn is_console(&self) -> bool {
        true
    }
}

fn player() -> Arc<dyn CommandSender> {
    Arc::new(Player)
}

fn console() -> Arc<dyn CommandSender> {
    Arc::new(Console)
}

/// Grants only the listed permission keys.
struct Keyring(Vec<&'static str>);

impl PermissionProvider for Keyring {
    fn has_permission(&self, _sender: &dyn CommandSender, permission: &str) -> bool {
        self.0.contains(&permission)
    }
}

type Recorded = Arc<Mutex<Vec<String>>>;

fn recorder() -> Recorded {
    Arc::new(Mutex::new(Vec::new()))
}

fn ban_dispatcher(log: &Recorded) -> CommandDispatcher {
    let dispatcher = CommandDispatcher::new();
    let log = log.clone();
    dispatcher.register(
        CommandNode::literal("ban").then(
            CommandNode::argument("target", StringArgument::word())
                .executes(move |ctx| {
                    let target = ctx.get_string("target")?;
                    let reason = ctx.find::<String>("reason")?.cloned();
                    log.lock()
                        .unwrap()
                        .push(format!("{target}:{}", reason.unwrap_or_default()));
                    Ok(())
                })
                .then(CommandNode::valued_option("reason", StringArgument::word())),
        ),
    );
    dispatcher
}

#[test]
fn ban_round_trip_executes_with_parsed_values() {
    let log = recorder();
    let dispatcher = ban_dispatcher(&log);
    dispatcher
        .execute(&PluginContext::new(), &console(), "ban Steve --reason:griefing")
        .unwrap();
    dispatcher
        .execute(&PluginContext::new(), &console(), "ban Alex")
        .unwrap();
    assert_eq!(*log.lock().unwrap(), ["Steve:griefing", "Alex:"]);
}

#[test]
fn ban_without_target_fails_at_the_end_of_the_literal() {
    let log = recorder();
    let dispatcher = ban_dispatcher(&log);

    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "ban")
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Syntax);
    assert_eq!(err.cursor(), Some(3));

    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "ban ")
        .unwrap_err();
    assert_eq!(err.cursor(), Some(4));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn opened_option_without_value_is_incomplete() {
    let log = recorder();
    let dispatcher = ban_dispatcher(&log);
    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "ban Steve --reason")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::IncompleteOption("reason".to_string()));
    assert_eq!(err.category(), ErrorCategory::IncompleteOption);
    assert_eq!(err.cursor(), Some("ban Steve --reason".len()));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn literals_beat_arguments_that_could_consume_the_same_token() {
    let log = recorder();
    let dispatcher = CommandDispatcher::new();
    let by_literal = log.clone();
    let by_argument = log.clone();
    dispatcher.register(
        CommandNode::literal("plot")
            .then(CommandNode::literal("list").executes(move |_| {
                by_literal.lock().unwrap().push("literal".into());
                Ok(())
            }))
            .then(
                CommandNode::argument("name", StringArgument::word()).executes(move |_| {
                    by_argument.lock().unwrap().push("argument".into());
                    Ok(())
                }),
            ),
    );
    dispatcher
        .execute(&PluginContext::new(), &console(), "plot list")
        .unwrap();
    assert_eq!(*log.lock().unwrap(), ["literal"]);
}

#[test]
fn sibling_arguments_tie_break_by_declaration_order() {
    let log = recorder();
    let dispatcher = CommandDispatcher::new();
    let first = log.clone();
    let second = log.clone();
    dispatcher.register(
        CommandNode::literal("set")
            .then(
                CommandNode::argument("count", IntegerArgument::new()).executes(move |_| {
                    first.lock().unwrap().push("count".into());
                    Ok(())
                }),
            )
            .then(
                CommandNode::argument("name", StringArgument::word()).executes(move |_| {
                    second.lock().unwrap().push("name".into());
                    Ok(())
                }),
            ),
    );
    // both children accept "5"; the first declared wins
    dispatcher
        .execute(&PluginContext::new(), &console(), "set 5")
        .unwrap();
    assert_eq!(*log.lock().unwrap(), ["count"]);
}

#[test]
fn the_deepest_branch_error_is_reported() {
    let dispatcher = CommandDispatcher::new();
    dispatcher.register(
        CommandNode::literal("x")
            .then(
                CommandNode::literal("kit")
                    .then(CommandNode::literal("pro").executes(|_| Ok(()))),
            )
            .then(CommandNode::argument("n", IntegerArgument::new()).executes(|_| Ok(()))),
    );
    // branch one fails at cursor 6 ("oops" is not "pro"), branch two at
    // cursor 2 ("kit" is not an integer); the deeper one wins
    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "x kit oops")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::IncorrectArgument);
    assert_eq!(err.cursor(), Some(6));
}

#[test]
fn execution_is_deterministic_across_repeated_calls() {
    let log = recorder();
    let dispatcher = ban_dispatcher(&log);
    for _ in 0..3 {
        dispatcher
            .execute(&PluginContext::new(), &console(), "ban Steve --reason:griefing")
            .unwrap();
    }
    assert_eq!(
        *log.lock().unwrap(),
        ["Steve:griefing", "Steve:griefing", "Steve:griefing"]
    );

    let first = dispatcher
        .execute(&PluginContext::new(), &console(), "ban")
        .unwrap_err();
    let second = dispatcher
        .execute(&PluginContext::new(), &console(), "ban")
        .unwrap_err();
    assert_eq!(first, second);
}

#[test]
fn quoted_phrases_reach_the_action_unescaped() {
    let log = recorder();
    let dispatcher = CommandDispatcher::new();
    let sink = log.clone();
    dispatcher.register(
        CommandNode::literal("say").then(
            CommandNode::argument("message", StringArgument::phrase()).executes(move |ctx| {
                sink.lock().unwrap().push(ctx.get_string("message")?);
                Ok(())
            }),
        ),
    );
    dispatcher
        .execute(
            &PluginContext::new(),
            &console(),
            r#"say "hello \"world\"""#,
        )
        .unwrap();
    assert_eq!(*log.lock().unwrap(), [r#"hello "world""#]);
}

fn teleport_dispatcher(log: &Recorded) -> CommandDispatcher {
    let dispatcher = CommandDispatcher::new();
    let sink = log.clone();
    let teleport: Arc<CommandNode> = Arc::new(CommandNode::literal("teleport").then(
        CommandNode::argument("dest", StringArgument::word()).executes(move |ctx| {
            let path: Vec<_> = ctx
                .nodes()
                .iter()
                .map(|(node, _)| node.name().to_string())
                .collect();
            sink.lock()
                .unwrap()
                .push(format!("{}@{}", ctx.get_string("dest")?, path.join(",")));
            Ok(())
        }),
    ));
    dispatcher.register(teleport.clone());
    dispatcher.register(CommandNode::literal("tp").redirect(&teleport));
    dispatcher
}

#[test]
fn aliases_parse_to_the_same_context_modulo_the_first_node() {
    let log = recorder();
    let dispatcher = teleport_dispatcher(&log);
    dispatcher
        .execute(&PluginContext::new(), &console(), "teleport home")
        .unwrap();
    dispatcher
        .execute(&PluginContext::new(), &console(), "tp home")
        .unwrap();
    let log = log.lock().unwrap();
    assert_eq!(log[0], "home@,teleport,dest");
    assert_eq!(log[1], "home@,tp,dest");
}

#[test]
fn gated_commands_are_invisible_below_the_root_but_denied_at_it() {
    let dispatcher = CommandDispatcher::new();
    dispatcher.register(
        CommandNode::literal("stop")
            .require_permission("server.stop")
            .executes(|_| Ok(())),
    );

    let ctx = PluginContext::new().with_permissions(Arc::new(Keyring(vec![])));
    let err = dispatcher.execute(&ctx, &player(), "stop").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::PermissionDenied);
    assert_eq!(err.category(), ErrorCategory::Permission);

    let ctx = PluginContext::new().with_permissions(Arc::new(Keyring(vec!["server.stop"])));
    dispatcher.execute(&ctx, &player(), "stop").unwrap();
}

#[test]
fn requirement_predicates_gate_traversal() {
    let dispatcher = CommandDispatcher::new();
    dispatcher.register(
        CommandNode::literal("shutdown")
            .requires(|sender| sender.is_console())
            .executes(|_| Ok(())),
    );
    dispatcher
        .execute(&PluginContext::new(), &console(), "shutdown")
        .unwrap();
    let err = dispatcher
        .execute(&PluginContext::new(), &player(), "shutdown")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::PermissionDenied);
}

#[test]
fn console_is_exempt_from_required_options() {
    let log = recorder();
    let dispatcher = CommandDispatcher::new();
    let sink = log.clone();
    dispatcher.register(
        CommandNode::literal("broadcast").then(
            CommandNode::argument("message", StringArgument::word())
                .executes(move |ctx| {
                    sink.lock().unwrap().push(ctx.get_string("message")?);
                    Ok(())
                })
                .then(
                    CommandNode::valued_option("as", StringArgument::word())
                        .required_unless_console(),
                ),
        ),
    );

    dispatcher
        .execute(&PluginContext::new(), &console(), "broadcast hi")
        .unwrap();

    let err = dispatcher
        .execute(&PluginContext::new(), &player(), "broadcast hi")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingRequiredOption("as".to_string()));

    dispatcher
        .execute(&PluginContext::new(), &player(), "broadcast hi --as:Steve")
        .unwrap();
}

#[test]
fn registration_is_visible_to_later_parses_and_removable() {
    let dispatcher = CommandDispatcher::new();
    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "late")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownCommand);

    dispatcher.register(CommandNode::literal("late").executes(|_| Ok(())));
    dispatcher
        .execute(&PluginContext::new(), &console(), "late")
        .unwrap();

    assert!(dispatcher.remove("late"));
    assert!(!dispatcher.remove("late"));
    let err = dispatcher
        .execute(&PluginContext::new(), &console(), "late")
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::UnknownCommand);
}

#[test]
fn failed_parses_never_execute_anything() {
    let log = recorder();
    let dispatcher = ban_dispatcher(&log);
    for input in ["ban", "ban Steve --reason", "ban Steve --reasn:x", "bam Steve"] {
        assert!(
            dispatcher
                .execute(&PluginContext::new(), &console(), input)
                .is_err()
        );
    }
    assert!(log.lock().unwrap().is_empty());
}

/// A name argument that resolves its completions through an "external"
/// directory, off the parse path.
struct PlayerNameArgument {
    directory: Arc<Vec<String>>,
}

impl ArgumentType for PlayerNameArgument {
    fn parse(
        &self,
        _ctx: &PluginContext,
        reader: &mut StringReader<'_>,
    ) -> Result<ArgumentValue, CommandError> {
        let start = reader.cursor();
        let word = reader.read_unquoted_string();
        if word.is_empty() {
            return Err(ErrorKind::ExpectedValue.at(reader.text(), start));
        }
        Ok(Arc::new(word.to_string()))
    }

    fn list_suggestions(
        &self,
        _ctx: &PluginContext,
        _context: &CommandContext,
        mut builder: lectern_core::SuggestionsBuilder,
    ) -> lectern_core::SuggestionsFuture {
        let directory = self.directory.clone();
        Box::pin(async move {
            tokio::task::yield_now().await;
            let prefix = builder.remaining_lowercase();
            for name in directory.iter() {
                if name.to_ascii_lowercase().starts_with(&prefix) {
                    builder = builder.suggest(name.clone());
                }
            }
            builder.build()
        })
    }

    fn examples(&self) -> &[&str] {
        &["Steve", "Alex"]
    }

    fn name(&self) -> &str {
        "player"
    }
}

fn directory_dispatcher() -> CommandDispatcher {
    let dispatcher = CommandDispatcher::new();
    let directory = Arc::new(vec!["Alex".to_string(), "Steve".to_string()]);
    dispatcher.register(
        CommandNode::literal("msg").then(
            CommandNode::argument("target", PlayerNameArgument { directory })
                .executes(|_| Ok(())),
        ),
    );
    dispatcher
}

fn texts(suggestions: &Suggestions) -> Vec<String> {
    suggestions
        .entries()
        .iter()
        .map(|s| s.text().to_string())
        .collect()
}

#[tokio::test]
async fn suggestions_resolve_through_async_lookups() {
    let dispatcher = directory_dispatcher();
    let suggestions = dispatcher
        .suggestions(&PluginContext::new(), &console(), "msg St")
        .await;
    assert_eq!(texts(&suggestions), ["Steve"]);
    let suggestions = dispatcher
        .suggestions(&PluginContext::new(), &console(), "msg ")
        .await;
    assert_eq!(texts(&suggestions), ["Alex", "Steve"]);
}

#[tokio::test]
async fn suggestion_ranges_replace_cleanly_into_valid_commands() {
    let dispatcher = directory_dispatcher();
    let input = "msg St";
    let suggestions = dispatcher
        .suggestions(&PluginContext::new(), &console(), input)
        .await;
    assert!(!suggestions.is_empty());
    for suggestion in suggestions.entries() {
        let range = suggestion.range();
        assert!(range.start <= range.end && range.end <= input.len());
        let applied = suggestion.apply(input);
        assert_eq!(applied, "msg Steve");
        dispatcher
            .execute(&PluginContext::new(), &console(), &applied)
            .unwrap();
    }
}

#[tokio::test]
async fn alias_completions_match_the_target() {
    let log = recorder();
    let dispatcher = teleport_dispatcher(&log);
    let via_alias = dispatcher
        .suggestions(&PluginContext::new(), &console(), "tp --")
        .await;
    let direct = dispatcher
        .suggestions(&PluginContext::new(), &console(), "teleport --")
        .await;
    // neither has options; both delegate to the same argument node
    assert_eq!(texts(&via_alias), texts(&direct));
}

#[tokio::test]
async fn gated_nodes_never_appear_in_suggestions() {
    let dispatcher = CommandDispatcher::new();
    dispatcher.register(
        CommandNode::literal("stop")
            .require_permission("server.stop")
            .executes(|_| Ok(())),
    );
    dispatcher.register(CommandNode::literal("status").executes(|_| Ok(())));

    let denied = PluginContext::new().with_permissions(Arc::new(Keyring(vec![])));
    let suggestions = dispatcher.suggestions(&denied, &player(), "st").await;
    assert_eq!(texts(&suggestions), ["status"]);

    let granted = PluginContext::new().with_permissions(Arc::new(Keyring(vec!["server.stop"])));
    let suggestions = dispatcher.suggestions(&granted, &player(), "st").await;
    assert_eq!(texts(&suggestions), ["status", "stop"]);
}

#[tokio::test]
async fn repeated_suggestion_queries_are_deterministic() {
    let dispatcher = directory_dispatcher();
    let first = dispatcher
        .suggestions(&PluginContext::new(), &console(), "msg ")
        .await;
    let second = dispatcher
        .suggestions(&PluginContext::new(), &console(), "msg ")
        .await;
    assert_eq!(first, second);
}
