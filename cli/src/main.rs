//! FocusLab CLI - runs the REST server or drives the board from a terminal.
//!
//! ```text
//! focuslab serve                 REST API (logs to stderr)
//! focuslab login <email>         store a token in ~/.focuslab/token
//! focuslab week | add | toggle   board commands (log to ~/.focuslab/logs)
//! ```
//!
//! Board commands apply their change locally, print, then wait for the
//! background sync before exiting.

mod render;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::{
    fs::{self, OpenOptions},
    io::{self, BufRead, Write},
    path::PathBuf,
    sync::Mutex,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use focuslab_client::{ApiClient, ClientError, Session, TokenStore};
use focuslab_config::FocusConfig;
use focuslab_types::{Credentials, Day};

#[derive(Parser, Debug)]
#[command(
    name = "focuslab",
    version,
    about = "Weekly planner with habits and AI motivation",
    long_about = None
)]
struct Args {
    #[command(subcommand)]
    command: Command,
    #[arg(long, global = true, help = "Config file (default ~/.focuslab/config.toml)")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Run the REST server")]
    Serve {
        #[arg(long, help = "Address to bind, e.g. 0.0.0.0:8000")]
        bind: Option<String>,
        #[arg(long, help = "SQLite database file")]
        database: Option<PathBuf>,
    },
    #[command(about = "Create an account")]
    Signup {
        email: String,
        #[arg(long, help = "Password (prompted on stdin when omitted)")]
        password: Option<String>,
    },
    #[command(about = "Log in and remember the access token")]
    Login {
        email: String,
        #[arg(long, help = "Password (prompted on stdin when omitted)")]
        password: Option<String>,
    },
    #[command(about = "Forget the saved access token")]
    Logout,
    #[command(about = "Show the week's tasks")]
    Week {
        #[arg(long, help = "Any day of the week to show (YYYY-MM-DD)")]
        date: Option<Day>,
    },
    #[command(about = "Add a task")]
    Add {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[arg(long, help = "Day of the task (YYYY-MM-DD), default today")]
        date: Option<Day>,
    },
    #[command(about = "Toggle a task done / not done")]
    Toggle {
        #[arg(help = "Task id or unique prefix")]
        id: String,
    },
    #[command(about = "Delete a task")]
    Delete {
        #[arg(help = "Task id or unique prefix")]
        id: String,
    },
    #[command(about = "Show the habit tracker")]
    Habits {
        #[arg(long, help = "Any day of the week to show (YYYY-MM-DD)")]
        date: Option<Day>,
    },
    #[command(about = "Tick or untick a habit for a day")]
    HabitToggle {
        #[arg(help = "Slot number (1-4), habit id or unique prefix")]
        habit: String,
        #[arg(long, help = "Day to toggle (YYYY-MM-DD), default today")]
        date: Option<Day>,
    },
    #[command(about = "Rename a habit slot")]
    HabitRename {
        #[arg(help = "Slot number (1-4), habit id or unique prefix")]
        habit: String,
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },
    #[command(about = "Show progress statistics")]
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => FocusConfig::load_from(path),
        None => FocusConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Command::Serve { bind, database } = args.command {
        init_stderr_tracing();
        let mut settings = config.resolve_server();
        if let Some(bind) = bind {
            settings.bind = bind;
        }
        if let Some(database) = database {
            settings.database = database;
        }
        tracing::info!(?settings, "Starting server");
        return focuslab_server::serve(settings).await;
    }

    init_file_tracing();
    let result = run_client(args.command, &config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

async fn run_client(command: Command, config: &FocusConfig) -> Result<()> {
    let settings = config.resolve_client();
    let tokens = TokenStore::default_location()
        .ok_or_else(|| anyhow!("cannot locate home directory for ~/.focuslab"))?;
    let api = ApiClient::new(&settings.backend_url)?;
    let mut session = Session::new(api, tokens)?;
    let today = Day::today();

    match command {
        Command::Serve { .. } => bail!("`serve` does not run as a client command"),
        Command::Signup { email, password } => {
            let credentials = Credentials::new(email, read_password(password)?);
            let message = session.signup(&credentials).await?;
            println!("{message}");
            return Ok(());
        }
        Command::Login { email, password } => {
            let credentials = Credentials::new(email, read_password(password)?);
            session.login(&credentials).await?;
            println!("Logged in as {}", credentials.email);
            return Ok(());
        }
        Command::Logout => {
            session.logout()?;
            println!("Logged out");
            return Ok(());
        }
        _ => {}
    }

    if !session.is_logged_in() {
        bail!("Not logged in. Run `focuslab login <email>` first.");
    }
    match session.refresh().await {
        Ok(()) => {}
        Err(ClientError::Unauthorized) => {
            bail!("Session expired. Run `focuslab login <email>` again.")
        }
        Err(e) => return Err(e).context("failed to load board"),
    }

    match command {
        Command::Week { date } => {
            print!("{}", render::week(session.board(), date.unwrap_or(today), today));
            show_motivation(&mut session, today).await;
        }
        Command::Add { text, date } => {
            let day = date.unwrap_or(today);
            if session.add_task(day, &text.join(" ")) {
                println!("Added to {day}");
            } else {
                println!("Nothing to add");
            }
        }
        Command::Toggle { id } => {
            let id = session.board().find_task(&id)?;
            session.toggle_task(&id);
            if let Some(task) = session.board().tasks().iter().find(|t| t.id == id) {
                let state = if task.is_completed { "done" } else { "open" };
                println!("{}: {state}", task.text);
            }
            show_motivation(&mut session, today).await;
        }
        Command::Delete { id } => {
            let id = session.board().find_task(&id)?;
            session.delete_task(&id);
            println!("Deleted {id}");
        }
        Command::Habits { date } => {
            print!("{}", render::habits(session.board(), date.unwrap_or(today), today));
        }
        Command::HabitToggle { habit, date } => {
            let id = session.board().find_habit(&habit)?;
            let day = date.unwrap_or(today);
            session.toggle_habit(&id, day)?;
            if let Some(habit) = session.board().habits().iter().find(|h| h.id == id) {
                let state = if habit.is_done_on(day) { "done" } else { "not done" };
                println!("{} on {day}: {state}", habit.name);
            }
        }
        Command::HabitRename { habit, name } => {
            let id = session.board().find_habit(&habit)?;
            let name = name.join(" ");
            if session.rename_habit(&id, &name) {
                println!("Renamed to {}", name.trim());
            } else {
                println!("Nothing to rename");
            }
        }
        Command::Stats => {
            print!("{}", render::stats(session.board(), today));
            show_motivation(&mut session, today).await;
        }
        Command::Serve { .. }
        | Command::Signup { .. }
        | Command::Login { .. }
        | Command::Logout => {}
    }

    session.settle().await;
    Ok(())
}

async fn show_motivation(session: &mut Session, today: Day) {
    if let Some(quote) = session.check_motivation(today).await {
        println!("\n{}", render::banner(quote));
    }
}

fn read_password(given: Option<String>) -> Result<String> {
    if let Some(password) = given {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        bail!("password must not be empty");
    }
    Ok(password)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Client commands log to a file so their stdout stays clean.
fn init_file_tracing() {
    let env_filter = env_filter();
    let (log_file, init_warnings) = open_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::debug!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No writable log location: stay silent rather than mixing logs into output.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.focuslab/logs/focuslab.log
    if let Some(app_dir) = focuslab_config::app_dir() {
        candidates.push(app_dir.join("logs").join("focuslab.log"));
    }

    // Fallback: ./.focuslab/logs/focuslab.log
    candidates.push(PathBuf::from(".focuslab").join("logs").join("focuslab.log"));

    candidates
}
