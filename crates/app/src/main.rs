use std::fmt;

use services::{AppServices, Clock, TutorConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use tutor_core::model::Language;

mod terminal;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidLanguage { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidLanguage { raw } => write!(f, "invalid --language value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!(
        "  tutor [--email <email>] [--name <name>] [--api <url>] [--db <sqlite_url>] [--language <code>]"
    );
    eprintln!();
    eprintln!("Without --email the cached session is resumed, or a guest session starts.");
    eprintln!("Without --api (or TUTOR_API_URL) the tutor runs offline.");
    eprintln!();
    eprintln!("Environment (a .env file is honored):");
    eprintln!("  TUTOR_API_URL, TUTOR_LANGUAGE, TUTOR_DB_URL, TUTOR_CACHE_PATH,");
    eprintln!("  TUTOR_FEEDBACK_DWELL_MS, TUTOR_HTTP_TIMEOUT_SECS, RUST_LOG");
}

/// Command-line overrides on top of the environment.
#[derive(Debug, Default)]
struct Args {
    email: Option<String>,
    name: Option<String>,
    api_url: Option<String>,
    db_url: Option<String>,
    language: Option<Language>,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--email" => parsed.email = Some(require_value(args, "--email")?),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--api" => parsed.api_url = Some(require_value(args, "--api")?),
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = Some(normalize_sqlite_url(value));
                }
                "--language" => {
                    let value = require_value(args, "--language")?;
                    let language = value
                        .parse::<Language>()
                        .map_err(|_| ArgsError::InvalidLanguage { raw: value.clone() })?;
                    parsed.language = Some(language);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }
        Ok(parsed)
    }

    fn apply(self, config: &mut TutorConfig) -> Result<Login, services::ConfigError> {
        if let Some(api_url) = self.api_url.as_deref() {
            config.set_api_url(api_url)?;
        }
        if let Some(db_url) = self.db_url {
            config.db_url = db_url;
        }
        if let Some(language) = self.language {
            config.language = language;
        }
        Ok(match (self.email, self.name) {
            (None, None) => Login::Resume,
            (email, name) => Login::SignIn {
                name: name.unwrap_or_else(|| "Learner".into()),
                email,
            },
        })
    }
}

/// How the session picks its learner.
#[derive(Debug)]
enum Login {
    Resume,
    SignIn { name: String, email: Option<String> },
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.contains("mode=memory") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let mut argv = std::env::args().skip(1);
    let args = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let mut config = TutorConfig::from_env()?;
    let login = args.apply(&mut config)?;

    // Open + migrate SQLite at startup; the services never create files.
    prepare_sqlite_file(&config.db_url)?;
    let services = AppServices::new(&config, Clock::default_clock()).await?;
    let mut session = services.session();

    match login {
        Login::SignIn { name, email } => {
            let learner = services.learners().sign_in(&name, email.as_deref()).await?;
            session.login(None, learner).await;
        }
        Login::Resume => {
            if !session.resume() {
                tracing::info!("no cached learner, starting a guest session");
            }
        }
    }

    terminal::Terminal::new(session, services.families()).run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
