//! A command-line client for the FIPP21 blackjack platform.
//!
//! The client restores the saved session, optionally signs in, and then reads
//! shell commands from stdin while printing live updates for the watched room
//! or round.

use anyhow::{Context, Result};
use fipp21::{ClientConfig, Dispatcher, FileStorage, RestoreOutcome, SessionStore};
use fipp21_client::commands::{Command, parse_command};
use fipp21_client::logging;
use fipp21_client::shell::{Flow, Shell};
use pico_args::Arguments;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Play FIPP21 from the terminal

USAGE:
  fipp21_client [OPTIONS]

OPTIONS:
  --api URL             HTTP API base URL   [env: FIPP21_API_URL, default: http://localhost:5000]
  --push URL            Push endpoint URL   [env: FIPP21_PUSH_URL, default: ws://localhost:5000]
  --state PATH          Saved session file  [env: FIPP21_STATE_PATH, default: .fipp21/session.json]
  --email EMAIL         Sign in at startup
  --password PASS       Password for --email

FLAGS:
  -h, --help            Print help information

Type 'help' at the prompt to list shell commands.
";

struct Args {
    api: Option<String>,
    push: Option<String>,
    state: Option<PathBuf>,
    email: Option<String>,
    password: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        api: pargs.opt_value_from_str("--api")?,
        push: pargs.opt_value_from_str("--push")?,
        state: pargs.opt_value_from_str("--state")?,
        email: pargs.opt_value_from_str("--email")?,
        password: pargs.opt_value_from_str("--password")?,
    };

    logging::init();
    run(args).await
}

async fn run(args: Args) -> Result<()> {
    let config = ClientConfig::from_env(args.api, args.push, args.state);
    config.validate().context("Invalid configuration")?;
    tracing::info!(
        api = %config.api_base_url,
        push = %config.push_url,
        state = %config.state_path.display(),
        "Client starting"
    );

    let api = config
        .api_client()
        .context("Failed to build the HTTP client")?;
    let mut session = SessionStore::new(api, FileStorage::new(config.state_path.clone()));

    match session.restore() {
        RestoreOutcome::Restored => {
            if let Some(identity) = session.identity() {
                println!("Welcome back, {}.", identity.name);
            }
        }
        RestoreOutcome::Discarded => println!("The saved session was unreadable and was cleared."),
        RestoreOutcome::Empty => {}
    }

    let dispatcher = Dispatcher::from_config(config.dispatcher_config());
    let (mut shell, mut notices) = Shell::new(session, dispatcher, std::io::stdout());

    match (args.email, args.password) {
        (Some(email), Some(password)) => {
            shell.execute(Command::Login { email, password }).await?;
        }
        (Some(_), None) => anyhow::bail!("--email requires --password"),
        _ => {}
    }

    if !shell.session().is_authenticated() {
        println!("Sign in with: login EMAIL PASSWORD");
    }
    println!("Type 'help' to see available commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_command(&line) {
                    Ok(command) => {
                        if shell.execute(command).await? == Flow::Quit {
                            return Ok(());
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            Some(frame) = notices.recv() => shell.handle_notice(frame).await?,
        }
    }

    shell.shutdown();
    Ok(())
}
