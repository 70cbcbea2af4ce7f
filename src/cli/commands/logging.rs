use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Level names in verbosity order; the index is the `-v` count.
const LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accepts a level name (any case) or a count in `0..=5`.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        if let Ok(count) = level.parse::<u8>() {
            return if count <= 5 {
                Ok(count)
            } else {
                Err(format!("log level count {count} is above 5"))
            };
        }

        LEVELS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(level.trim()))
            .and_then(|index| u8::try_from(index).ok())
            .ok_or_else(|| format!("invalid log level '{level}', expected one of {}", LEVELS.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("GATEHOUSE_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
