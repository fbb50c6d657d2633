//! Acquisition Dashboard CLI
//!
//! Trends, totals and ore-site histograms for acquisitions.

use acquisition_dashboard::{
    config::Config,
    core::{DashboardBuilder, DashboardSnapshot, Timeframe, Trend},
    models::Acquisition,
    NO_DATA_MESSAGE, VERSION,
};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[cfg(feature = "api")]
use acquisition_dashboard::{
    models::UserUpdate,
    session::{AuthContext, MemorySessionStore},
    ApiConfig, BlockingApiClient,
};

#[derive(Parser)]
#[command(name = "acq-dash")]
#[command(version = VERSION)]
#[command(about = "Acquisition statistics: trends, totals and ore-site histograms", long_about = None)]
struct Cli {
    #[command(flatten)]
    auth: AuthArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct AuthArgs {
    /// Bearer token for the backend
    #[arg(long, global = true, env = "ACQ_DASH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Username to sign in with when no token is given
    #[arg(long, short, global = true, env = "ACQ_DASH_USER")]
    username: Option<String>,

    /// Password to sign in with when no token is given
    #[arg(long, short, global = true, env = "ACQ_DASH_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show acquisition statistics for a timeframe
    Dashboard {
        /// all_time, last_24h, last_7d, last_30d or last_90d
        #[arg(long, short)]
        timeframe: Option<Timeframe>,

        /// Read acquisitions from a JSON file instead of the backend
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Reference time in epoch seconds (defaults to the current time)
        #[arg(long)]
        now: Option<i64>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in and print the access token
    #[cfg(feature = "api")]
    Login,

    /// Manage user accounts
    #[cfg(feature = "api")]
    Users {
        #[command(subcommand)]
        action: UserCommands,
    },

    /// List selectable timeframes
    Timeframes,

    /// Show or update configuration
    Config {
        /// Backend base URL
        #[arg(long)]
        api_url: Option<String>,

        /// IANA timezone for displayed times
        #[arg(long)]
        timezone: Option<String>,

        /// Default timeframe for the dashboard
        #[arg(long)]
        timeframe: Option<Timeframe>,
    },
}

#[cfg(feature = "api")]
#[derive(Subcommand)]
enum UserCommands {
    /// List all users
    List,

    /// Show a single user
    Show { user_id: String },

    /// Change the signed-in user's name or password
    Update {
        user_id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long = "new-password")]
        new_password: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dashboard {
            timeframe,
            input,
            now,
            json,
        } => cmd_dashboard(&cli.auth, timeframe, input.as_deref(), now, json),
        #[cfg(feature = "api")]
        Commands::Login => cmd_login(&cli.auth),
        #[cfg(feature = "api")]
        Commands::Users { action } => cmd_users(&cli.auth, action),
        Commands::Timeframes => {
            cmd_timeframes();
            Ok(())
        }
        Commands::Config {
            api_url,
            timezone,
            timeframe,
        } => cmd_config(api_url, timezone, timeframe),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn cmd_dashboard(
    auth: &AuthArgs,
    timeframe: Option<Timeframe>,
    input: Option<&Path>,
    now: Option<i64>,
    json: bool,
) -> Result<()> {
    let config = Config::load().context("Could not load configuration")?;
    let timeframe = timeframe.unwrap_or(config.default_timeframe);
    let now = now.unwrap_or_else(|| Utc::now().timestamp());

    let acquisitions = match input {
        Some(path) => read_acquisitions(path)?,
        None => fetch_acquisitions(auth, &config)?,
    };
    tracing::debug!(count = acquisitions.len(), %timeframe, now, "Building dashboard");

    let builder = DashboardBuilder::with_timezone(config.tz()?);
    let snapshot = builder.build(&acquisitions, timeframe, now);

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_dashboard(&snapshot);
    }
    Ok(())
}

fn read_acquisitions(path: &Path) -> Result<Vec<Acquisition>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    let acquisitions = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of acquisitions", path.display()))?;
    Ok(acquisitions)
}

#[cfg(feature = "api")]
fn fetch_acquisitions(auth: &AuthArgs, config: &Config) -> Result<Vec<Acquisition>> {
    let client = BlockingApiClient::new(ApiConfig::from_config(config))?;
    let session = sign_in(auth, &client)?;
    let token = session.require_token()?;
    client
        .get_acquisitions(token)
        .context("An error occurred while fetching acquisitions")
}

#[cfg(not(feature = "api"))]
fn fetch_acquisitions(_auth: &AuthArgs, _config: &Config) -> Result<Vec<Acquisition>> {
    bail!("No --input given and the api feature is not enabled")
}

/// Establish a session from `--token`, or by signing in with username and password.
#[cfg(feature = "api")]
fn sign_in(auth: &AuthArgs, client: &BlockingApiClient) -> Result<AuthContext<MemorySessionStore>> {
    if auth.token.is_none() || has_credentials(auth) {
        return sign_in_with_credentials(auth, client);
    }

    let mut session = AuthContext::new(MemorySessionStore::new());
    session.set_auth(None, auth.token.clone())?;
    Ok(session)
}

#[cfg(feature = "api")]
fn has_credentials(auth: &AuthArgs) -> bool {
    auth.username.is_some() && auth.password.is_some()
}

/// Always authenticates against the backend; a given token is ignored.
#[cfg(feature = "api")]
fn sign_in_with_credentials(
    auth: &AuthArgs,
    client: &BlockingApiClient,
) -> Result<AuthContext<MemorySessionStore>> {
    let (Some(username), Some(password)) = (&auth.username, &auth.password) else {
        bail!("Not signed in: pass --token, or --username and --password");
    };

    let mut session = AuthContext::new(MemorySessionStore::new());
    client
        .sign_in(&mut session, username, password)
        .context("Log in failed")?;
    Ok(session)
}

#[cfg(feature = "api")]
fn cmd_login(auth: &AuthArgs) -> Result<()> {
    if !has_credentials(auth) {
        bail!("login needs --username and --password");
    }

    let config = Config::load().context("Could not load configuration")?;
    let client = BlockingApiClient::new(ApiConfig::from_config(&config))?;
    let session = sign_in_with_credentials(auth, &client)?;

    if let Some(user) = session.current_user() {
        eprintln!("Signed in as {} ({})", user.name, user.user_id);
    }
    println!("{}", session.require_token()?);
    Ok(())
}

#[cfg(feature = "api")]
fn cmd_users(auth: &AuthArgs, action: UserCommands) -> Result<()> {
    let config = Config::load().context("Could not load configuration")?;
    let client = BlockingApiClient::new(ApiConfig::from_config(&config))?;
    let mut session = sign_in(auth, &client)?;
    let token = session.require_token()?.to_string();
    let token = token.as_str();

    match action {
        UserCommands::List => {
            let users = client.get_users(token)?;
            if users.is_empty() {
                println!("{NO_DATA_MESSAGE}");
                return Ok(());
            }
            println!("{:<24} NAME", "USER ID");
            for user in users {
                println!("{:<24} {}", user.user_id, user.name);
            }
        }
        UserCommands::Show { user_id } => {
            let user = client.get_user(&user_id, token)?;
            println!("User ID: {}", user.user_id);
            println!("Name:    {}", user.name);
        }
        UserCommands::Update {
            user_id,
            name,
            new_password,
        } => {
            let update = UserUpdate {
                name,
                password: new_password,
            };
            if update.is_empty() {
                bail!("Nothing to update: pass --name and/or --new-password");
            }
            let user = client
                .update_own_account(&mut session, &user_id, &update)
                .context("Could not update user")?;
            println!("Updated {} ({})", user.user_id, user.name);
        }
    }
    Ok(())
}

fn cmd_timeframes() {
    for tf in Timeframe::ALL {
        println!("{:<10} {}", tf.as_str(), tf.label());
    }
}

fn cmd_config(
    api_url: Option<String>,
    timezone: Option<String>,
    timeframe: Option<Timeframe>,
) -> Result<()> {
    let mut config = Config::load().unwrap_or_default();
    let changed = api_url.is_some() || timezone.is_some() || timeframe.is_some();

    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(tz) = timezone {
        config.timezone = tz;
    }
    if let Some(tf) = timeframe {
        config.default_timeframe = tf;
    }

    if changed {
        config.save().context("Error saving config")?;
        println!("Configuration saved.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn print_dashboard(snapshot: &DashboardSnapshot) {
    println!("Dashboard: {}", snapshot.timeframe.label());
    println!("==========");
    println!();

    if snapshot.is_empty() {
        println!("{NO_DATA_MESSAGE}");
        return;
    }

    let stats = &snapshot.statistics;
    print_metric(
        "Total acquisitions",
        stats.total_acquisitions.current.to_string(),
        stats.total_acquisitions.previous.map(|p| p.to_string()),
        stats.total_acquisitions.trend,
    );
    print_metric(
        "Total ore sites",
        stats.total_ore_sites.current.to_string(),
        stats.total_ore_sites.previous.map(|p| p.to_string()),
        stats.total_ore_sites.trend,
    );
    if let Some(avg) = &stats.average_ore_sites {
        print_metric(
            "Average ore sites",
            format!("{:.2}", avg.current),
            avg.previous.map(|p| format!("{p:.2}")),
            avg.trend,
        );
    }

    println!();
    println!("Distribution of ore sites");
    let widest = snapshot.histogram.iter().map(|b| b.count).max().unwrap_or(0);
    let label_width = snapshot
        .histogram
        .iter()
        .map(|b| b.label.chars().count())
        .max()
        .unwrap_or(0);
    for bin in &snapshot.histogram {
        let bar_len = if widest == 0 { 0 } else { bin.count * 40 / widest };
        println!(
            "  {:>width$} | {} {}",
            bin.label,
            "\u{2588}".repeat(bar_len),
            bin.count,
            width = label_width
        );
    }

    println!();
    println!("Acquisitions history");
    for row in &snapshot.history {
        println!("  {:<36} {:>6}", row.time, row.ore_sites);
    }
}

fn print_metric(name: &str, current: String, previous: Option<String>, trend: Trend) {
    match previous {
        Some(prev) => println!(
            "  {name:<20} {current:>10} {}  (previous period: {prev})",
            trend.arrow()
        ),
        None => println!("  {name:<20} {current:>10}"),
    }
}
