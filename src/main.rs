#![forbid(unsafe_code)]

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use keygate::auth::{token, Authenticator, SessionMonitor};
use keygate::config::Config;
use keygate::gateway::{self, RouteOutcome};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// `keygate` - lightweight session gate.
#[derive(Parser, Debug)]
#[command(name = "keygate")]
#[command(version)]
#[command(about = "Session gate with access keys, URL tokens, and demo accounts.", long_about = None)]
struct Cli {
    /// Config file (default: ~/.keygate/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the current session
    Status,

    /// Log in with an access key
    Login {
        /// Access key (case-insensitive)
        key: String,
    },

    /// Log in with a transport token
    LoginToken {
        /// Hex token from a shared link
        token: String,
    },

    /// Resolve a URL the way the app shell does (token first, then session)
    Open {
        /// Full URL, path, or fragment
        url: String,
    },

    /// Create a transport token (and link) for an access key
    Mint {
        /// Access key to embed
        key: String,

        /// Date to embed as DD_MM_YYYY (default: today)
        #[arg(long)]
        date: Option<String>,

        /// Print a link on this base URL instead of the bare token
        #[arg(long)]
        base_url: Option<String>,
    },

    /// End the current session
    Logout,

    /// Demo account commands
    #[command(subcommand)]
    Demo(DemoCommands),

    /// Re-check the session periodically and report changes
    Watch,

    /// Start the HTTP gateway
    Serve {
        /// Host to bind (default from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (default from config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
enum DemoCommands {
    /// Register a demo account and log in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        name: String,
    },

    /// Log in with a demo account
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load(cli.config.as_deref())?;
    let auth = keygate::open_authenticator(&config)?;

    match cli.command {
        Commands::Status => {
            print_status(&auth);
            Ok(())
        }
        Commands::Login { key } => require(auth.login(&key), "Invalid access key", &auth),
        Commands::LoginToken { token } => {
            require(auth.login_with_hex(&token), "Invalid or expired link", &auth)
        }
        Commands::Open { url } => {
            match gateway::resolve_route(&auth, &url) {
                RouteOutcome::RedirectToRoot => println!("Logged in from link -> /"),
                RouteOutcome::Authenticated => println!("Authenticated"),
                RouteOutcome::LoginRequired => println!("Login required"),
            }
            Ok(())
        }
        Commands::Mint {
            key,
            date,
            base_url,
        } => {
            if !auth.is_valid_key(&key) {
                bail!("'{key}' is not a valid access key");
            }
            let token = match date {
                Some(date) => {
                    let parsed = token::parse_token_date(&date)
                        .map_err(|e| anyhow!("'{date}' is not a DD_MM_YYYY date: {e}"))?;
                    token::encode(&token::format_token_date(parsed), &key)
                }
                None => auth.mint_token(&key),
            };
            match base_url {
                Some(base) => println!("{}/{token}", base.trim_end_matches('/')),
                None => println!("{token}"),
            }
            Ok(())
        }
        Commands::Logout => {
            auth.logout();
            println!("Logged out");
            Ok(())
        }
        Commands::Demo(DemoCommands::Register {
            email,
            password,
            name,
        }) => require(
            auth.register_demo(&email, &password, &name),
            "Email is already registered",
            &auth,
        ),
        Commands::Demo(DemoCommands::Login { email, password }) => require(
            auth.login_demo(&email, &password),
            "Invalid email or password",
            &auth,
        ),
        Commands::Watch => watch(auth, &config).await,
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            let port = port.unwrap_or(config.gateway.port);
            gateway::run_gateway(&host, port, &config, auth).await
        }
    }
}

fn require(ok: bool, failure: &str, auth: &Authenticator) -> Result<()> {
    if !ok {
        bail!("{failure}");
    }
    print_status(auth);
    Ok(())
}

fn print_status(auth: &Authenticator) {
    let status = auth.status();
    if !status.authenticated {
        println!("Not authenticated");
        return;
    }
    match status.demo_user_name {
        Some(name) => println!("Authenticated (demo: {name}), {} left", status.remaining),
        None => println!("Authenticated, {} left", status.remaining),
    }
}

async fn watch(auth: Arc<Authenticator>, config: &Config) -> Result<()> {
    let monitor = SessionMonitor::spawn(auth.clone(), config.auth.recheck_interval());
    let mut state = monitor.subscribe();
    let mut last = *state.borrow_and_update();
    print_status(&auth);

    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let authenticated = *state.borrow_and_update();
                if authenticated == last {
                    tracing::debug!("Session unchanged: {}", auth.format_remaining());
                    continue;
                }
                last = authenticated;
                print_status(&auth);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    monitor.shutdown().await;
    Ok(())
}
