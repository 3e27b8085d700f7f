use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use coupon_desk::auth::{self, AdminAuth};
use coupon_desk::config::Config;
use coupon_desk::db::{AppState, create_pool, init_db};
use coupon_desk::import;
use coupon_desk::stats::compute_stats;
use coupon_desk::store::{CouponStore, SqliteCouponStore};

#[derive(Parser)]
#[command(name = "coupon-desk", version, about = "Coupon redemption and administration service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Import coupons from a .xlsx, .xls, .ods or .csv file
    Import {
        file: PathBuf,
        /// Report what would be imported without writing
        #[arg(long)]
        dry_run: bool,
    },
    /// Print coupon counters
    Stats,
    /// Print the digest to use as ADMIN_PASSWORD_SHA256
    HashPassword { password: String },
}

fn open_store(config: &Config) -> anyhow::Result<SqliteCouponStore> {
    let pool = create_pool(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))?;
    {
        let conn = pool.get()?;
        init_db(&conn).context("initializing schema")?;
    }
    Ok(SqliteCouponStore::new(pool))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;

    let password_digest = match (&config.admin_password_digest, config.admin_email.is_empty()) {
        (Some(digest), false) => digest.clone(),
        _ if config.dev_mode => {
            tracing::warn!("ADMIN_EMAIL / ADMIN_PASSWORD not set; admin sign-in is disabled");
            String::new()
        }
        _ => bail!("ADMIN_EMAIL and ADMIN_PASSWORD_SHA256 (or ADMIN_PASSWORD) must be set"),
    };

    let state = AppState {
        store: Arc::new(store),
        auth: AdminAuth::new(
            &config.admin_email,
            &password_digest,
            &config.session_secret,
            config.session_ttl,
        ),
        default_locale: config.default_locale,
    };

    let app = coupon_desk::app(state);
    let addr = config.addr();
    tracing::info!("Starting coupon-desk on {}", addr);
    if config.dev_mode {
        tracing::info!("Running in development mode");
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn run_import(config: &Config, file: PathBuf, dry_run: bool) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let bytes = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
    let file_name = file.to_string_lossy();

    let rows = import::extract_rows(&file_name, &bytes)?;
    let report = import::import_coupons(&store, &rows, dry_run)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_stats(config: &Config) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let coupons = store.fetch_all()?;
    let stats = compute_stats(&coupons, chrono::Local::now().date_naive());
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coupon_desk=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::HashPassword { password } => {
            println!("{}", auth::hash_password(&password));
            Ok(())
        }
        Command::Serve => serve(Config::from_env()).await,
        Command::Import { file, dry_run } => run_import(&Config::from_env(), file, dry_run),
        Command::Stats => run_stats(&Config::from_env()),
    }
}
