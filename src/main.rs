//! `prismauth` host: bootstraps a session from `config.yaml` and runs one
//! command against it.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prismauth::config::{load_config, print_schema};
use prismauth::utils::init_logging;
use prismauth::{ApiRequest, Session};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";
const CONFIG_ENV: &str = "PRISMAUTH_CONFIG";

/// Session command line arguments.
#[derive(Parser, Debug)]
#[command(name = "prismauth")]
#[command(about = "Session and sign-in helper for the news API")]
struct Args {
    /// Print the configuration JSON schema and exit
    #[arg(long)]
    schema: bool,

    /// Configuration file (defaults to $PRISMAUTH_CONFIG, then ./config.yaml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Bootstrap the session and print its state
    Status,
    /// Print the URL that starts the provider sign-in
    LoginUrl,
    /// End the session on the server and locally
    Logout,
    /// Finish sign-in from the provider's redirect URL
    Complete {
        #[arg(required = true)]
        callback_url: String,
    },
    /// Send an intercepted GET and print the body
    Get {
        #[arg(required = true)]
        path: String,
    },
    /// Bootstrap the session and print metrics in Prometheus text format
    Metrics,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.schema {
        return match print_schema() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error rendering schema: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config_path = args
        .config
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error loading configuration from '{}': {}",
                config_path.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Error initialising logging: {}", e);
        return ExitCode::FAILURE;
    }

    let session = match Session::new(config) {
        Ok(session) => session,
        Err(e) => {
            error!("Could not create session: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if !session.persists_across_restarts() {
        warn!("Session storage is not durable; sign-in will not survive this process");
    }

    match run(&session, args.command.unwrap_or(Command::Status)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(session: &Session, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::LoginUrl => {
            println!("{}", session.login()?.location);
            return Ok(());
        }
        Command::Complete { callback_url } => {
            let user = session.complete_login(&callback_url).await?;
            info!("Signed in as {}", user.display_name);
        }
        Command::Logout => {
            session.bootstrap().await;
            session.logout().await;
        }
        Command::Get { path } => {
            session.bootstrap().await;
            let response = session.execute(&ApiRequest::get(path)).await?;
            let status = response.status();
            println!("{}", response.text().await?);
            if !status.is_success() {
                return Err(format!("request failed with status {}", status).into());
            }
            return Ok(());
        }
        Command::Metrics => {
            session.bootstrap().await;
            print!("{}", session.metrics().render());
            return Ok(());
        }
        Command::Status => {
            session.bootstrap().await;
        }
    }

    println!("{}", serde_json::to_string_pretty(&session.state())?);
    Ok(())
}
