use anyhow::{Context, Result};
use clap::{Arg, Command};

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for password reset links and CORS")
                .env("GRIDIRON_FRONTEND_BASE_URL")
                .default_value("https://gridiron.football"),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Sliding session TTL in seconds")
                .env("GRIDIRON_SESSION_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("lockout-threshold")
                .long("lockout-threshold")
                .help("Failed logins before an account locks")
                .env("GRIDIRON_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(i32)),
        )
        .arg(
            Arg::new("lockout-window-seconds")
                .long("lockout-window-seconds")
                .help("How long a locked account stays locked")
                .env("GRIDIRON_LOCKOUT_WINDOW_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("reset-token-ttl-seconds")
                .long("reset-token-ttl-seconds")
                .help("Password reset token TTL in seconds")
                .env("GRIDIRON_RESET_TOKEN_TTL_SECONDS")
                .default_value("2700")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("store-timeout-ms")
                .long("store-timeout-ms")
                .help("Deadline for session store calls made by the gate")
                .env("GRIDIRON_STORE_TIMEOUT_MS")
                .default_value("3000")
                .value_parser(clap::value_parser!(u64)),
        )
}

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub lockout_threshold: i32,
    pub lockout_window_seconds: i64,
    pub reset_token_ttl_seconds: i64,
    pub store_timeout_ms: u64,
}

impl Options {
    /// # Errors
    /// Returns an error if a defaulted argument is somehow absent.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .context("missing required argument: --frontend-base-url")?,
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .context("missing required argument: --session-ttl-seconds")?,
            lockout_threshold: matches
                .get_one::<i32>("lockout-threshold")
                .copied()
                .context("missing required argument: --lockout-threshold")?,
            lockout_window_seconds: matches
                .get_one::<i64>("lockout-window-seconds")
                .copied()
                .context("missing required argument: --lockout-window-seconds")?,
            reset_token_ttl_seconds: matches
                .get_one::<i64>("reset-token-ttl-seconds")
                .copied()
                .context("missing required argument: --reset-token-ttl-seconds")?,
            store_timeout_ms: matches
                .get_one::<u64>("store-timeout-ms")
                .copied()
                .context("missing required argument: --store-timeout-ms")?,
        })
    }
}
