use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "mentionwatch",
    about = "Watch a repository's notification feed for agent mentions and acknowledge handled events",
    version
)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Poll notifications and write one JSON mention event per line to stdout.
    Watch(WatchArgs),
    /// Record a handled event key and mark its notification thread read.
    Ack(AckArgs),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ConnectionArgs {
    #[arg(
        long = "repo",
        env = "MENTIONWATCH_REPO",
        help = "GitHub repository in owner/repo format"
    )]
    pub(crate) repo: Option<String>,

    #[arg(
        long = "github-token",
        env = "GITHUB_TOKEN",
        hide_env_values = true,
        help = "GitHub token used for notification API access"
    )]
    pub(crate) github_token: Option<String>,

    #[arg(
        long = "api-base",
        env = "MENTIONWATCH_API_BASE",
        help = "GitHub API base URL (default https://api.github.com)"
    )]
    pub(crate) api_base: Option<String>,

    #[arg(
        long = "state-dir",
        env = "MENTIONWATCH_STATE_DIR",
        help = "Directory for watch state and ack journals (default .mentionwatch)"
    )]
    pub(crate) state_dir: Option<PathBuf>,

    #[arg(
        long = "config",
        env = "MENTIONWATCH_CONFIG",
        help = "Optional YAML file with defaults for repo, agent, reasons, interval, state dir"
    )]
    pub(crate) config: Option<PathBuf>,

    #[arg(
        long = "request-timeout-ms",
        env = "MENTIONWATCH_REQUEST_TIMEOUT_MS",
        default_value_t = 30_000,
        value_parser = parse_positive_u64,
        help = "Per-request timeout for GitHub API calls"
    )]
    pub(crate) request_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "MENTIONWATCH_RETRY_MAX_ATTEMPTS",
        default_value_t = 4,
        help = "Maximum attempts for retryable GitHub API failures (429/5xx/transport)"
    )]
    pub(crate) retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "MENTIONWATCH_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        help = "Base backoff delay in milliseconds for GitHub API retries"
    )]
    pub(crate) retry_base_delay_ms: u64,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub(crate) connection: ConnectionArgs,

    #[arg(
        long = "agent",
        env = "MENTIONWATCH_AGENT",
        help = "Agent login to watch for; resolved from the token owner when omitted"
    )]
    pub(crate) agent: Option<String>,

    #[arg(
        long = "reason",
        env = "MENTIONWATCH_REASONS",
        value_delimiter = ',',
        help = "Notification reasons to process (repeatable, default mention)"
    )]
    pub(crate) reasons: Vec<String>,

    #[arg(
        long = "poll-interval-seconds",
        env = "MENTIONWATCH_POLL_INTERVAL_SECONDS",
        value_parser = parse_positive_u64,
        help = "Seconds to wait between poll cycles (default 60)"
    )]
    pub(crate) poll_interval_seconds: Option<u64>,

    #[arg(
        long = "once",
        env = "MENTIONWATCH_ONCE",
        default_value_t = false,
        help = "Run a single poll cycle and exit; fetch failures become fatal"
    )]
    pub(crate) once: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct AckArgs {
    #[command(flatten)]
    pub(crate) connection: ConnectionArgs,

    #[arg(value_name = "KEY", help = "Composite key of the handled event: <threadId>:<updatedAt>")]
    pub(crate) key: String,
}
