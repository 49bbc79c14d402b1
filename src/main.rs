mod commands;
mod config;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lectern_core::{CommandDispatcher, CommandSender, ConsoleSender, PluginContext};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Interactive shell for the lectern command engine.
#[derive(Parser)]
#[command(name = "lectern")]
struct Args {
    /// Config file with command aliases
    #[arg(long, default_value = "Lectern.toml")]
    config: PathBuf,
    /// Execute one command line and exit
    #[arg(long)]
    run: Option<String>,
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var("LECTERN_LOG")
        .from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = Args::parse();
    let config = config::ShellConfig::load(&args.config)?;

    let dispatcher = Arc::new(CommandDispatcher::new());
    commands::register_commands(&dispatcher);
    commands::register_aliases(&dispatcher, &config.command_aliases);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let ctx = PluginContext::new();
    let sender: Arc<dyn CommandSender> = Arc::new(ConsoleSender);

    if let Some(line) = &args.run {
        run_line(&dispatcher, &runtime, &ctx, &sender, line);
        return Ok(());
    }

    // Plain lines dispatch; a leading '?' asks for completions instead.
    println!("lectern shell. Type a command, '?<partial>' to complete, ctrl-d to quit.");
    let stdin = std::io::stdin();
    prompt()?;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim_end();
        if !line.is_empty() {
            run_line(&dispatcher, &runtime, &ctx, &sender, line);
        }
        prompt()?;
    }
    println!();
    Ok(())
}

fn run_line(
    dispatcher: &Arc<CommandDispatcher>,
    runtime: &tokio::runtime::Runtime,
    ctx: &PluginContext,
    sender: &Arc<dyn CommandSender>,
    line: &str,
) {
    if let Some(partial) = line.strip_prefix('?') {
        let suggestions = runtime.block_on(dispatcher.suggestions(ctx, sender, partial));
        if suggestions.is_empty() {
            println!("(no completions)");
        }
        for suggestion in suggestions.entries() {
            println!("{}", suggestion.apply(partial));
        }
    } else if let Err(err) = dispatcher.execute(ctx, sender, line) {
        eprintln!("{}", err.format_diagnostic());
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}
