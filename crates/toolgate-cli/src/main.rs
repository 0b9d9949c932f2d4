// Toolgate CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Stream events as they happen; --json emits JSON lines
// for scripting, the default is a human-readable line per event.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use toolgate_core::{build_toolset, ServerRegistry, TaskConfig, TaskRequest, TaskRunner};
use toolgate_openai::OpenAiDriver;
use toolgate_servers::{AudioServer, FilesystemServer, WebSearchServer};

#[derive(Parser)]
#[command(name = "toolgate")]
#[command(about = "Toolgate CLI - Run model-driven tasks against sandboxed tool servers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a task and stream its events
    Run {
        /// The natural-language task to execute
        #[arg(long)]
        task: String,

        /// Tool servers to expose (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "filesystem")]
        servers: Vec<String>,

        /// Model identifier
        #[arg(long, env = "TOOLGATE_MODEL", default_value = "gpt-4o")]
        model: String,

        /// Root directory for the filesystem and audio servers
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Search endpoint for the web_search server
        #[arg(long, env = "TOOLGATE_SEARCH_URL")]
        search_url: Option<String>,

        /// Base URL for an OpenAI-compatible endpoint
        #[arg(long, env = "OPENAI_BASE_URL")]
        base_url: Option<String>,

        /// Emit events as JSON lines instead of human-readable text
        #[arg(long)]
        json: bool,
    },

    /// List available tool servers and their tools
    Servers {
        /// Root directory for the filesystem and audio servers
        #[arg(long, default_value = ".")]
        root: PathBuf,

        /// Search endpoint for the web_search server
        #[arg(long, env = "TOOLGATE_SEARCH_URL")]
        search_url: Option<String>,
    },
}

fn server_registry(root: &PathBuf, search_url: Option<&str>) -> ServerRegistry {
    let mut servers = ServerRegistry::new();
    servers.register(FilesystemServer::new(root.clone()));
    servers.register(AudioServer::new(root.clone()));
    if let Some(url) = search_url {
        servers.register(WebSearchServer::new(url));
    }
    servers
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            servers,
            model,
            root,
            search_url,
            base_url,
            json,
        } => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .context("OPENAI_API_KEY is not set (put it in the environment or a .env file)")?;
            let driver = match base_url {
                Some(url) => OpenAiDriver::with_base_url(api_key, url),
                None => OpenAiDriver::new(api_key),
            };

            let registry = server_registry(&root, search_url.as_deref());
            let config = TaskConfig::new(
                "You are a helpful assistant that completes tasks using the available tools.",
                model,
            );
            let toolset = build_toolset(&config.system_prompt, &servers, &registry);

            let runner = Arc::new(TaskRunner::new(config, driver, toolset));
            let (handle, mut events) = runner.spawn(TaskRequest::new(task));

            while let Some(event) = events.next().await {
                if json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!("{}", output::render_event(&event));
                }
            }

            let report = handle.join().await?;
            if !json {
                println!("{}", output::render_report(&report));
            }

            if !report.success {
                std::process::exit(1);
            }
        }

        Commands::Servers { root, search_url } => {
            let registry = server_registry(&root, search_url.as_deref());
            let mut servers = registry.list();
            servers.sort_by_key(|s| s.name().to_string());
            for server in servers {
                println!("{} - {}", server.name(), server.description());
                for tool in server.tools() {
                    println!("  {:<14} {}", tool.name(), tool.description());
                }
            }
        }
    }

    Ok(())
}
