//! Tessera - Main Entry Point
//!
//! Command-line front end of the session client.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tessera::batch::DEFAULT_ROLE;
use tessera::{AppError, Tessera, load_requests};
use tessera_application::{
    AccountOrigin, OnboardingError, PasswordChangeOutcome, SecondFactorOutcome,
};
use tessera_domain::LogoutReason;
use tessera_infrastructure::AppConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Time given to the detached server logout before the process exits.
const LOGOUT_GRACE: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "tessera", version, about = "Session client for the identity API")]
struct Cli {
    /// Configuration file (defaults to ./tessera.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with password and one-time code.
    Login {
        /// Account email.
        email: String,
    },
    /// Show whether a session is active.
    Status,
    /// Keep the session alive until interrupted.
    Watch,
    /// Sign out of this session.
    Logout,
    /// Sign out of every session of the account.
    LogoutAll,
    /// Request a password recovery email.
    Forgot {
        /// Account email.
        email: String,
    },
    /// Onboard the employees listed in a JSON file.
    Onboard {
        /// Batch file.
        file: PathBuf,
        /// Role for entries that name none.
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    tracing::info!(api = %config.api_base_url, "Starting Tessera v{}", env!("CARGO_PKG_VERSION"));

    let (client, redirects) = Tessera::from_config(&config)?;
    run(cli.command, &client, redirects).await?;
    Ok(())
}

async fn run(
    command: Command,
    client: &Tessera,
    redirects: mpsc::UnboundedReceiver<LogoutReason>,
) -> Result<(), AppError> {
    let session = client.session();
    match command {
        Command::Login { email } => login(client, &email).await,
        Command::Status => {
            if session.verify_authentication().await {
                print_session(client);
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        Command::Watch => watch(client, redirects).await,
        Command::Logout => {
            session.logout().await;
            tokio::time::sleep(LOGOUT_GRACE).await;
            println!("Signed out.");
            Ok(())
        }
        Command::LogoutAll => {
            session.logout_all_sessions().await?;
            println!("Signed out of all sessions.");
            Ok(())
        }
        Command::Forgot { email } => {
            session.forgot_password(&email).await?;
            println!("If the account exists, a recovery email is on its way.");
            Ok(())
        }
        Command::Onboard { file, role } => onboard(client, &file, &role).await,
    }
}

async fn login(client: &Tessera, email: &str) -> Result<(), AppError> {
    let session = client.session();
    let mut input = Prompt::new();

    let password = input.ask("Password: ").await?;
    session.login(email, &password).await?;

    let code = input.ask("Verification code: ").await?;
    match session.confirm_second_factor(email, &code).await? {
        SecondFactorOutcome::Authenticated => {
            print_session(client);
            Ok(())
        }
        SecondFactorOutcome::PasswordChangeRequired => {
            println!("A new password is required.");
            let new_password = input.ask("New password: ").await?;
            match session.change_password(email, &new_password, None).await? {
                PasswordChangeOutcome::Authenticated => print_session(client),
                PasswordChangeOutcome::SignInRequired => {
                    println!("Password changed. Sign in again with the new password.");
                }
            }
            Ok(())
        }
    }
}

async fn watch(
    client: &Tessera,
    mut redirects: mpsc::UnboundedReceiver<LogoutReason>,
) -> Result<(), AppError> {
    if !client.session().verify_authentication().await {
        return Err(AppError::NotSignedIn);
    }
    print_session(client);

    let background = client.start();
    tracing::info!(tasks = ?background.task_names(), "session kept alive");
    let mut consistency = client.watcher().subscribe();
    let mut had_cookies = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Interrupted; the session stays signed in.");
                break;
            }
            Some(reason) = redirects.recv() => {
                println!("{}", reason.notice().unwrap_or("Session ended."));
                break;
            }
            changed = consistency.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *consistency.borrow_and_update();
                let removed = had_cookies && !state.cookies_present;
                had_cookies = state.cookies_present;
                if removed && client.session().is_authenticated() {
                    println!("Session cookies were removed elsewhere.");
                    client.session().logout().await;
                    break;
                }
            }
        }
    }
    drop(background);
    Ok(())
}

async fn onboard(client: &Tessera, file: &std::path::Path, role: &str) -> Result<(), AppError> {
    if !client.session().verify_authentication().await {
        return Err(AppError::NotSignedIn);
    }
    let requests = load_requests(file).await?;
    let background = client.start();

    let mut failed = 0_usize;
    for request in requests {
        let input = request.into_input(role);
        let national_id = input.employee.national_id.clone();
        match client.onboarding().execute(input).await {
            Ok(outcome) => {
                let origin = match outcome.origin {
                    AccountOrigin::Created => "new account",
                    AccountOrigin::Linked => "existing account",
                };
                println!(
                    "{national_id}: employee {} with {origin} {}",
                    outcome.employee.id, outcome.account.id
                );
            }
            Err(e @ OnboardingError::CriticalFailure { .. }) => {
                eprintln!("{national_id}: {e}");
                drop(background);
                return Err(e.into());
            }
            Err(e) => {
                failed += 1;
                eprintln!("{national_id}: {e}");
            }
        }
    }
    drop(background);

    if failed > 0 {
        eprintln!("{failed} onboarding request(s) failed.");
    }
    Ok(())
}

fn print_session(client: &Tessera) {
    let snapshot = client.session().snapshot();
    match snapshot.user() {
        Some(user) if !user.full_name.is_empty() => {
            println!("Signed in as {} <{}>", user.full_name, user.email);
        }
        Some(user) => println!("Signed in as {}", user.email),
        None => println!("Signed in."),
    }
    if let Some(remaining) = client.session().access_token_remaining() {
        println!("Access token valid for {} more minute(s).", remaining.num_minutes());
    }
}

/// Line reader over stdin.
struct Prompt {
    lines: tokio::io::Lines<BufReader<tokio::io::Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn ask(&mut self, label: &str) -> Result<String, AppError> {
        print!("{label}");
        std::io::stdout().flush()?;
        match self.lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(AppError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input closed",
            ))),
        }
    }
}
