// SPDX-FileCopyrightText: 2026 Modelhub Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Modelhub - plugin-provided models behind one dispatch API.
//!
//! This is the binary entry point: it manages installed plugins and talks to
//! the models they provide.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod builtin;
mod host;

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use futures::StreamExt;
use modelhub_core::{ChatMessage, ChatRequest, HubError};

use crate::host::Host;

/// Modelhub - plugin-provided models behind one dispatch API.
#[derive(Parser, Debug)]
#[command(name = "modelhub", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage installed plugins.
    Plugin {
        #[command(subcommand)]
        action: PluginAction,
    },
    /// List registered model definitions.
    Models,
    /// Send one user message to a chat model.
    Chat {
        /// Model id, `namespace:name`.
        model_id: String,
        message: String,
        /// Print partial results as they arrive.
        #[arg(long)]
        stream: bool,
    },
}

#[derive(Subcommand, Debug)]
enum PluginAction {
    /// List installed plugins and their status.
    List,
    /// Install a plugin package (.tar.gz).
    Install { path: PathBuf },
    Enable { id: String },
    Disable { id: String },
    Uninstall { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => modelhub_config::load_and_validate_path(path),
        None => modelhub_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            modelhub_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let Some(command) = cli.command else {
        println!("modelhub: use --help for available commands");
        return;
    };

    let result = match Host::start(&config).await {
        Ok(host) => run(&host, command).await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        eprintln!("modelhub: {e}");
        std::process::exit(1);
    }
}

async fn run(host: &Host, command: Commands) -> Result<(), HubError> {
    match command {
        Commands::Plugin { action } => run_plugin(host, action).await,
        Commands::Models => {
            for definition in host.configuration.models().list() {
                let model_id = definition.model_id();
                let available = if host.client.is_model_available(&model_id) {
                    "available"
                } else {
                    "no provider"
                };
                println!("{model_id:<32} {:<10} {available}", definition.model_type);
            }
            Ok(())
        }
        Commands::Chat {
            model_id,
            message,
            stream,
        } => {
            let request = ChatRequest::new(vec![ChatMessage::user(message)]);
            if stream {
                let mut chunks = host.client.chat_stream(&model_id, request).await?;
                let mut stdout = std::io::stdout();
                while let Some(chunk) = chunks.next().await {
                    print!("{}", chunk?.delta);
                    stdout.flush()?;
                }
                println!();
            } else {
                let response = host.client.chat(&model_id, request).await?;
                println!("{}", response.content);
            }
            Ok(())
        }
    }
}

async fn run_plugin(host: &Host, action: PluginAction) -> Result<(), HubError> {
    let manager = &host.manager;
    match action {
        PluginAction::List => {
            for record in manager.list().await? {
                println!(
                    "{:<24} {:<10} {:<8} {}",
                    record.plugin_id, record.version, record.plugin_type, record.status
                );
            }
        }
        PluginAction::Install { path } => {
            let file = tokio::fs::File::open(&path).await?;
            let record = manager.install(file, &file_name(&path)).await?;
            println!("installed {} {} ({})", record.plugin_id, record.version, record.status);
        }
        PluginAction::Enable { id } => {
            manager.enable(&id).await?;
            println!("enabled {id}");
        }
        PluginAction::Disable { id } => {
            manager.disable(&id).await?;
            println!("disabled {id}");
        }
        PluginAction::Uninstall { id } => {
            manager.uninstall(&id).await?;
            println!("uninstalled {id}");
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "package.tar.gz".to_string())
}

/// Initialize the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("modelhub={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
