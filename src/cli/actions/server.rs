use crate::{
    api,
    cli::telemetry,
    oauth::{OAuthClient, OAuthConfig},
    password::PasswordHasher,
    token::TokenService,
};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct GoogleArgs {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_url: Url,
}

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: SecretString,
    pub token_secret: SecretString,
    pub hash_cost: u32,
    pub request_timeout: u64,
    pub google: Option<GoogleArgs>,
    pub oauth_timeout: u64,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid, the database is
/// unreachable, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let hasher = PasswordHasher::new(args.hash_cost).context("Invalid password hash cost")?;
    let tokens = TokenService::new(&args.token_secret);
    let google = args
        .google
        .map(|google| google_client(google, Duration::from_secs(args.oauth_timeout)))
        .transpose()?;

    let result = api::new(
        args.port,
        &args.dsn,
        Duration::from_secs(args.request_timeout),
        tokens,
        hasher,
        google,
    )
    .await;

    telemetry::shutdown_tracer();

    result
}

fn google_client(args: GoogleArgs, timeout: Duration) -> Result<OAuthClient> {
    let config = OAuthConfig::google(args.client_id, args.client_secret, args.redirect_url)
        .context("Failed to configure Google OAuth")?
        .with_timeout(timeout);
    OAuthClient::new(config).context("Failed to build Google OAuth client")
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(args.dsn.expose_secret())),
        ("hash_cost", args.hash_cost.to_string()),
        ("request_timeout", format!("{}s", args.request_timeout)),
        (
            "google_oauth",
            args.google
                .as_ref()
                .map_or_else(|| "disabled".to_string(), |g| g.redirect_url.to_string()),
        ),
        ("oauth_timeout", format!("{}s", args.oauth_timeout)),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
