use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

/// Accepts a level name or a bare count (0-4), both mapping onto the `-v`
/// occurrence count.
#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> std::result::Result<u8, String> {
        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            other => other
                .parse::<u8>()
                .ok()
                .filter(|count| *count <= 4)
                .ok_or_else(|| format!("invalid log level: {other}")),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("GRIDIRON_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}

#[cfg(test)]
mod tests {
    use super::{with_args, ARG_VERBOSITY};

    #[test]
    fn numeric_env_level_maps_to_verbosity() {
        temp_env::with_vars([("GRIDIRON_LOG_LEVEL", Some("3"))], || {
            let command = with_args(clap::Command::new("test"));
            let matches = command.get_matches_from(["test"]);
            assert_eq!(matches.get_one::<u8>(ARG_VERBOSITY).copied(), Some(3));
        });
    }

    #[test]
    fn out_of_range_env_level_is_rejected() {
        for level in ["verbose", "5", "255"] {
            temp_env::with_vars([("GRIDIRON_LOG_LEVEL", Some(level))], || {
                let command = with_args(clap::Command::new("test"));
                assert!(command.try_get_matches_from(["test"]).is_err());
            });
        }
    }
}
