use anyhow::{Context, Result};
use clap::Parser;
use gpt_clip::app;
use gpt_clip::chat;
use gpt_clip::cli::Cli;
use gpt_clip::clipboard::SystemClipboard;
use gpt_clip::config::write_default_config;
use gpt_clip::utils::env::Environment;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();

    let env = Environment::from_process();

    if cli.init_config {
        return handle_init_config(&cli, &env);
    }

    let mut clipboard = SystemClipboard::detect(&env);
    debug!(backend = clipboard.backend_name(), "clipboard ready");

    let outcome = app::execute(&cli, &env, &mut clipboard, chat::connect).await?;

    println!("{}", outcome.reply);
    match &outcome.clipboard_error {
        None => println!("Response copied to clipboard."),
        Some(err) => eprintln!("Warning: {err}"),
    }

    if let Some(err) = &outcome.log_error {
        eprintln!("Warning: {err}");
    }

    Ok(())
}

fn handle_init_config(cli: &Cli, env: &Environment) -> Result<()> {
    let path = cli.config_path(env)?;

    let created = write_default_config(&path)
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    if created {
        println!("✓ Wrote default config to {}", path.display());
    } else {
        println!("Config already exists at {}", path.display());
    }

    Ok(())
}
