//! Fooderama API server binary.

use std::path::{Path, PathBuf};

use clap::Parser;
use fooderama_api::config::{ApiConfig, DEFAULT_RESTAURANT_IMAGE};
use fooderama_api::services::cookies::{CookieSettings, parse_same_site};
use fooderama_core::auth::jwt::{DEFAULT_ACCESS_TOKEN_TTL_MINUTES, TokenKeys};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// One year.
const MAX_ACCESS_TOKEN_TTL_MINUTES: i64 = 525_600;
/// Ten years.
const MAX_COOKIE_MAX_AGE_HOURS: i64 = 87_600;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "fooderama_api_server", about = "Fooderama REST API server")]
struct Args {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on (0 = ephemeral).
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/fooderama"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// PEM file with the RSA private key that signs access tokens.
    #[arg(long, env = "ACCESS_PRIVATE_KEY_FILE")]
    access_private_key: PathBuf,

    /// PEM file with the RSA public key that verifies access tokens.
    #[arg(long, env = "ACCESS_PUBLIC_KEY_FILE")]
    access_public_key: PathBuf,

    /// PEM file with the RSA private key that signs refresh tokens.
    #[arg(long, env = "REFRESH_PRIVATE_KEY_FILE")]
    refresh_private_key: PathBuf,

    /// PEM file with the RSA public key that verifies refresh tokens.
    #[arg(long, env = "REFRESH_PUBLIC_KEY_FILE")]
    refresh_public_key: PathBuf,

    /// Access token lifetime in minutes.
    #[arg(
        long,
        env = "ACCESS_TOKEN_TTL_MINUTES",
        default_value_t = DEFAULT_ACCESS_TOKEN_TTL_MINUTES,
        value_parser = clap::value_parser!(i64).range(1..=MAX_ACCESS_TOKEN_TTL_MINUTES)
    )]
    access_token_ttl_minutes: i64,

    /// Mark session cookies `Secure`.
    #[arg(long, env = "COOKIE_SECURE", default_value_t = true, action = clap::ArgAction::Set)]
    cookie_secure: bool,

    /// `SameSite` attribute of session cookies: strict, lax or none.
    #[arg(long, env = "COOKIE_SAME_SITE", default_value = "lax")]
    cookie_same_site: String,

    /// Session cookie lifetime in hours.
    #[arg(
        long,
        env = "COOKIE_MAX_AGE_HOURS",
        default_value_t = 24,
        value_parser = clap::value_parser!(i64).range(1..=MAX_COOKIE_MAX_AGE_HOURS)
    )]
    cookie_max_age_hours: i64,

    /// Whether new signups start activated.
    #[arg(long, env = "ACTIVATE_ON_SIGNUP", default_value_t = true, action = clap::ArgAction::Set)]
    activate_on_signup: bool,

    /// Image used for restaurants created without one.
    #[arg(long, env = "DEFAULT_RESTAURANT_IMAGE", default_value = DEFAULT_RESTAURANT_IMAGE)]
    default_restaurant_image: String,
}

fn access_token_ttl(minutes: i64) -> Result<chrono::Duration, String> {
    chrono::Duration::try_minutes(minutes)
        .filter(|ttl| *ttl > chrono::Duration::zero())
        .ok_or_else(|| format!("access token ttl of {minutes} minutes is out of range"))
}

fn cookie_max_age(hours: i64) -> Result<time::Duration, String> {
    hours
        .checked_mul(3600)
        .filter(|seconds| *seconds > 0)
        .map(time::Duration::seconds)
        .ok_or_else(|| format!("cookie max age of {hours} hours is out of range"))
}

fn read_pem(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    std::fs::read(path).map_err(|e| format!("reading {}: {e}", path.display()).into())
}

fn load_token_keys(args: &Args) -> Result<TokenKeys, Box<dyn std::error::Error>> {
    let keys = TokenKeys::from_rsa_pem(
        &read_pem(&args.access_private_key)?,
        &read_pem(&args.access_public_key)?,
        &read_pem(&args.refresh_private_key)?,
        &read_pem(&args.refresh_public_key)?,
    )?;
    Ok(keys)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("info,fooderama_api=debug,fooderama_core=debug")
            }),
        )
        .init();

    let args = Args::parse();

    let same_site = parse_same_site(&args.cookie_same_site)
        .ok_or_else(|| format!("invalid cookie same-site value '{}'", args.cookie_same_site))?;
    let token_keys = load_token_keys(&args)?;

    info!(port = args.port, max_connections = args.max_connections, "starting fooderama_api_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    fooderama_api::migrate(&pool).await?;

    let mut config = ApiConfig::new(token_keys);
    config.bind_addr = format!("{}:{}", args.host, args.port);
    config.pg_connection_url = args.database_url;
    config.access_token_ttl = access_token_ttl(args.access_token_ttl_minutes)?;
    config.cookies = CookieSettings {
        secure: args.cookie_secure,
        same_site,
        max_age: cookie_max_age(args.cookie_max_age_hours)?,
    };
    config.activate_on_signup = args.activate_on_signup;
    config.default_restaurant_image = args.default_restaurant_image;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let state = fooderama_api::AppState { pool, config };
    let app = fooderama_api::router(state);

    info!(addr = %local_addr, "REST API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 8] = [
        "--access-private-key",
        "a.pem",
        "--access-public-key",
        "b.pem",
        "--refresh-private-key",
        "c.pem",
        "--refresh-public-key",
        "d.pem",
    ];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let argv = std::iter::once("fooderama_api_server")
            .chain(KEYS)
            .chain(extra.iter().copied());
        Args::try_parse_from(argv)
    }

    #[test]
    fn durations_default_to_positive_values() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.access_token_ttl_minutes, DEFAULT_ACCESS_TOKEN_TTL_MINUTES);
        assert_eq!(args.cookie_max_age_hours, 24);
    }

    #[test]
    fn non_positive_or_huge_durations_are_rejected() {
        for ttl in ["0", "-5", "9223372036854775807"] {
            assert!(parse(&["--access-token-ttl-minutes", ttl]).is_err(), "{ttl}");
        }
        for hours in ["0", "-1", "9223372036854775807"] {
            assert!(parse(&["--cookie-max-age-hours", hours]).is_err(), "{hours}");
        }
    }

    #[test]
    fn conversions_never_panic() {
        assert_eq!(access_token_ttl(10).unwrap(), chrono::Duration::minutes(10));
        assert!(access_token_ttl(0).is_err());
        assert!(access_token_ttl(i64::MAX).is_err());
        assert_eq!(cookie_max_age(24).unwrap(), time::Duration::hours(24));
        assert!(cookie_max_age(-1).is_err());
        assert!(cookie_max_age(i64::MAX).is_err());
    }
}
