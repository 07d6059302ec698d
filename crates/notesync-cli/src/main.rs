mod logging;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use notesync::config::{load_config_or_default, CONFIG_ENV_VAR};
use notesync::{invoke, Command, NotesyncError, Response};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(
    name = "notesync",
    version,
    about = "Moves notebook exports from a mail inbox into cloud storage and summarizes them"
)]
struct Cli {
    /// JSON config file; built-in defaults are used when omitted.
    #[arg(long, short, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import notebook exports from unread notification emails.
    Import,
    /// Summarize every text file in the root folder in one run.
    Distill,
    /// Queue text files for step-by-step summarization.
    Queue,
    /// Summarize one queued file.
    Process {
        #[arg(long)]
        temp_id: Option<String>,
    },
    /// Save a processed summary and archive its source.
    Finalize {
        #[arg(long)]
        result_id: Option<String>,
        #[arg(long)]
        original_id: Option<String>,
    },
    /// Check that the stored token loads and refreshes.
    CheckToken,
    /// Serve the commands as HTTP GET endpoints.
    Serve {
        #[arg(long, env = "NOTESYNC_ADDR", default_value = "127.0.0.1:3000")]
        addr: SocketAddr,
    },
}

impl Commands {
    fn into_command(self) -> Option<Command> {
        Some(match self {
            Commands::Import => Command::Import,
            Commands::Distill => Command::Distill,
            Commands::Queue => Command::Queue,
            Commands::Process { temp_id } => Command::Process { temp_id },
            Commands::Finalize {
                result_id,
                original_id,
            } => Command::Finalize {
                result_id,
                original_id,
            },
            Commands::CheckToken => Command::CheckToken,
            Commands::Serve { .. } => return None,
        })
    }
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.log_json) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = match load_config_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return emit(&Response::from_error(&NotesyncError::from(e)));
        }
    };

    if let Commands::Serve { addr } = cli.command {
        return serve(config, addr);
    }

    match cli.command.into_command() {
        Some(command) => emit(&invoke(config, command)),
        None => ExitCode::SUCCESS,
    }
}

fn serve(config: notesync::Config, addr: SocketAddr) -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(server::serve(config, addr)) {
        Ok(()) => {
            info!("Server stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Server failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Prints the response on stdout; the exit code follows the status code.
fn emit(response: &Response) -> ExitCode {
    println!("{}", response.to_json());
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_finalize_original_id_is_optional() {
        let cli = Cli::try_parse_from(["notesync", "finalize", "--result-id", "r1"]).unwrap();
        assert_eq!(
            cli.command.into_command(),
            Some(Command::Finalize {
                result_id: Some("r1".to_string()),
                original_id: None,
            })
        );
    }

    #[test]
    fn test_process_without_temp_id_still_parses() {
        // Validation happens in the library so the error comes back as JSON
        let cli = Cli::try_parse_from(["notesync", "process"]).unwrap();
        assert_eq!(
            cli.command.into_command(),
            Some(Command::Process { temp_id: None })
        );
    }

    #[test]
    fn test_serve_is_not_a_library_command() {
        let cli = Cli::try_parse_from(["notesync", "serve", "--addr", "0.0.0.0:8080"]).unwrap();
        match cli.command {
            Commands::Serve { addr } => assert_eq!(addr.port(), 8080),
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
