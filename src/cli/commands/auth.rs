use clap::{Arg, Command};

use crate::password::{MAX_COST, MIN_COST};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_HASH_COST: &str = "hash-cost";
pub const ARG_REQUEST_TIMEOUT: &str = "request-timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long("token-secret")
                .help("Key used to sign and verify session tokens")
                .env("GATEHOUSE_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_HASH_COST)
                .long("hash-cost")
                .help("Password hashing work factor (1-10)")
                .env("GATEHOUSE_HASH_COST")
                .default_value("2")
                .value_parser(clap::value_parser!(u32).range(i64::from(MIN_COST)..=i64::from(MAX_COST))),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT)
                .long("request-timeout")
                .help("Per-request deadline in seconds")
                .env("GATEHOUSE_REQUEST_TIMEOUT")
                .default_value("30")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
