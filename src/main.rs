mod args;
mod catalog;
mod cli;
mod commands;
mod config;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, OutputFormat};
use reconcile::KeyStyle;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub output: OutputFormat,
    pub key_style: KeyStyle,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
        output: cli.output,
        key_style: if cli.preserve_keys {
            KeyStyle::Preserve
        } else {
            KeyStyle::SnakeCase
        },
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&ctx, &err);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Apply(args) => commands::apply::run(ctx, args),
        Command::Info(args) => commands::info::run(ctx, args),
        Command::Types => commands::types::list(ctx),
        Command::Describe { resource_type } => commands::types::describe(ctx, &resource_type),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "armsync", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print a failure. JSON mode also writes `{"failed": true, ...}` to stdout.
fn report(ctx: &Context, err: &anyhow::Error) {
    let reconcile_error = err.downcast_ref::<reconcile::Error>();

    if ctx.output == OutputFormat::Json {
        let mut failure = serde_json::json!({
            "changed": false,
            "failed": true,
            "msg": format!("{err:#}"),
        });
        if let Some(e) = reconcile_error {
            failure["category"] = serde_json::Value::String(e.category().to_string());
            if let Some(status) = e.status() {
                failure["status"] = status.into();
            }
        }
        if let Ok(text) = serde_json::to_string_pretty(&failure) {
            println!("{text}");
        }
    }

    ui::error(&format!("{err:#}"));
    if let Some(e) = reconcile_error {
        ui::hint(e.category().advice());
    }
    if ctx.verbose > 0 {
        for cause in err.chain().skip(1) {
            log::debug!("caused by: {cause}");
        }
    }
}
