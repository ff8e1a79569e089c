//! iMessage bridge daemon: JSON-RPC 2.0 over stdio backed by the Messages
//! database. Logs go to stderr; stdout is the wire.

mod automation;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bridge_core::{default_chat_db_path, init_logging};
use bridge_database::{ChatCache, MessageStore, WatcherConfig};
use bridge_rpc::{register_handlers, FrameWriter, HandlerContext, RpcServer, SubscriptionManager};
use clap::{Parser, Subcommand};
use tracing::{error, info};

/// iMessage bridge command-line interface.
#[derive(Parser)]
#[command(name = "imsg-bridge")]
#[command(about = "Bridge between Messages.app and JSON-RPC clients")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON-RPC 2.0 over stdin/stdout.
    Rpc {
        /// Path to the Messages database. Defaults to
        /// ~/Library/Messages/chat.db.
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Commands::Rpc { db } => run_rpc(db).await,
    }
}

async fn run_rpc(db: Option<PathBuf>) -> ExitCode {
    let path = match db {
        Some(path) => path,
        None => match default_chat_db_path() {
            Ok(path) => path,
            Err(err) => {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        },
    };

    // A database we cannot open is fatal before the RPC loop starts; the
    // permission hint lands on stderr where a human will see it.
    let store = match MessageStore::open(&path) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(path = %path.display(), "Messages store opened");

    let cache = Arc::new(ChatCache::new(store.clone()));
    let subscriptions = Arc::new(SubscriptionManager::new());
    let writer = FrameWriter::new(tokio::io::stdout());

    let mut server = RpcServer::new(writer.clone(), subscriptions.clone());
    register_handlers(
        &mut server,
        HandlerContext {
            store,
            cache,
            sender: Arc::new(automation::OsaScriptSender::new()),
            contacts: Arc::new(automation::OsaScriptContacts::new()),
            subscriptions,
            writer,
            watcher_config: WatcherConfig::default(),
        },
    );

    match server.serve(tokio::io::stdin()).await {
        Ok(()) => {
            info!("rpc session ended");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "rpc session failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_the_rpc_subcommand() {
        let cli = Cli::try_parse_from(["imsg-bridge", "rpc"]).unwrap();
        let Commands::Rpc { db } = cli.command;
        assert!(db.is_none());
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn cli_accepts_a_database_override() {
        let cli =
            Cli::try_parse_from(["imsg-bridge", "rpc", "--db", "/tmp/chat.db"]).unwrap();
        let Commands::Rpc { db } = cli.command;
        assert_eq!(db, Some(PathBuf::from("/tmp/chat.db")));
    }

    #[test]
    fn cli_requires_a_subcommand() {
        assert!(Cli::try_parse_from(["imsg-bridge"]).is_err());
    }
}
