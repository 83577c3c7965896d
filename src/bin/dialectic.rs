//! Dialectic CLI: debate server, MCP server and catalogue maintenance.
//!
//! Usage:
//!   dialectic serve [--bind addr] [--db path]
//!   dialectic mcp [--transport stdio] [--db path]
//!   dialectic debate <subcommand> [--db path]
//!   dialectic session reset <debate_id> [--session id] [--db path]

use clap::{Parser, Subcommand};
use dialectic::{Config, DebateApi, DebateId, SessionId};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dialectic",
    version,
    about = "Live argumentation engine with grounded-semantics winners"
)]
struct Cli {
    /// YAML configuration file
    #[arg(long, global = true, env = "DIALECTIC_CONFIG")]
    config: Option<PathBuf>,
    /// Path to SQLite database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve {
        /// Listen address, e.g. 127.0.0.1:8000
        #[arg(long)]
        bind: Option<String>,
    },
    /// Start the MCP (Model Context Protocol) server
    Mcp {
        /// Transport type (currently only stdio)
        #[arg(long, default_value = "stdio")]
        transport: String,
    },
    /// Manage the debate catalogue
    Debate {
        #[command(subcommand)]
        action: DebateAction,
    },
    /// Manage debate sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum DebateAction {
    /// Create a new debate
    Create {
        /// Question or motion under debate
        topic: String,
    },
    /// List all debates
    List,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Delete every message of a session
    Reset {
        debate_id: i64,
        /// Session key
        #[arg(long, default_value = "default_session")]
        session: String,
    },
}

/// Logs go to stderr so stdout stays free for MCP traffic
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dialectic=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config, String> {
    let mut config = Config::load(cli.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(db) = &cli.db {
        config.database = db.clone();
    }
    Ok(config)
}

fn open_api(config: &Config) -> Result<DebateApi, String> {
    DebateApi::from_config(config).map_err(|e| format!("Failed to open database: {}", e))
}

fn runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Runtime::new().map_err(|e| format!("Failed to create tokio runtime: {}", e))
}

fn cmd_serve(mut config: Config, bind: Option<String>) -> i32 {
    if let Some(bind) = bind {
        config.bind = bind;
    }
    let addr = match config.bind_addr() {
        Ok(addr) => addr,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let api = match open_api(&config) {
            Ok(api) => api,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        match dialectic::server::serve(api, addr).await {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: server failed: {}", e);
                1
            }
        }
    })
}

fn cmd_debate_create(api: &DebateApi, topic: &str) -> i32 {
    match api.create_debate(topic) {
        Ok(debate) => {
            println!("Created debate {} '{}'", debate.id, debate.topic);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_debate_list(api: &DebateApi) -> i32 {
    match api.list_debates() {
        Ok(debates) if debates.is_empty() => {
            println!("No debates.");
            0
        }
        Ok(debates) => {
            for debate in debates {
                println!("{:>4}  {}", debate.id.get(), debate.topic);
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_session_reset(config: &Config, debate_id: i64, session: String) -> i32 {
    let rt = match runtime() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let api = match open_api(config) {
            Ok(api) => api,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        };
        let session = SessionId::new(session);
        match api.reset_session(DebateId::new(debate_id), &session).await {
            Ok(removed) => {
                println!("Removed {} messages from {}/{}", removed, debate_id, session);
                0
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        }
    })
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Serve { bind } => cmd_serve(config, bind),
        Commands::Mcp { transport } => {
            if transport != "stdio" {
                eprintln!("error: only 'stdio' transport is currently supported");
                std::process::exit(1);
            }
            dialectic::mcp::run_mcp_server(&config)
        }
        Commands::Debate { action } => match open_api(&config) {
            Ok(api) => match action {
                DebateAction::Create { topic } => cmd_debate_create(&api, &topic),
                DebateAction::List => cmd_debate_list(&api),
            },
            Err(e) => {
                eprintln!("Error: {}", e);
                1
            }
        },
        Commands::Session { action } => match action {
            SessionAction::Reset { debate_id, session } => cmd_session_reset(&config, debate_id, session),
        },
    };
    std::process::exit(code);
}
