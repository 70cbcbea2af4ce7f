use clap::{Arg, Command};

pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_REDIRECT_URL: &str = "google-redirect-url";
pub const ARG_OAUTH_TIMEOUT: &str = "oauth-timeout";

/// Google sign-in is optional, but when any of its flags is given all three
/// are required.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long("google-client-id")
                .help("Google OAuth client id")
                .env("GATEHOUSE_GOOGLE_CLIENT_ID")
                .requires_all([ARG_GOOGLE_CLIENT_SECRET, ARG_GOOGLE_REDIRECT_URL]),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long("google-client-secret")
                .help("Google OAuth client secret")
                .env("GATEHOUSE_GOOGLE_CLIENT_SECRET")
                .hide_env_values(true)
                .requires_all([ARG_GOOGLE_CLIENT_ID, ARG_GOOGLE_REDIRECT_URL]),
        )
        .arg(
            Arg::new(ARG_GOOGLE_REDIRECT_URL)
                .long("google-redirect-url")
                .help("Callback URL registered with Google, e.g. https://host/auth/oauth/google/callback")
                .env("GATEHOUSE_GOOGLE_REDIRECT_URL")
                .requires_all([ARG_GOOGLE_CLIENT_ID, ARG_GOOGLE_CLIENT_SECRET]),
        )
        .arg(
            Arg::new(ARG_OAUTH_TIMEOUT)
                .long("oauth-timeout")
                .help("Timeout in seconds for calls to the identity provider")
                .env("GATEHOUSE_OAUTH_TIMEOUT")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
