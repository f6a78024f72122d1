use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use idpool::{MAX_DATACENTER_ID, MAX_WORKER_ID};

/// Runtime configuration for the `idpool-server` binary.
///
/// Every value can be given as a CLI flag or an environment variable (a
/// `.env` file in the working directory is loaded first).
#[derive(Parser, Debug, Clone)]
#[command(
    name = "idpool-server",
    version,
    about = "An HTTP service handing out pre-generated unique IDs"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Slots per pool buffer. The pool keeps two of them, so up to twice this
    /// many IDs are held in memory.
    ///
    /// Environment variable: `BUFFER_SIZE`
    #[arg(long, env = "BUFFER_SIZE", default_value_t = 10_000)]
    pub buffer_size: usize,

    /// Datacenter field of the Snowflake IDs (0..=31).
    ///
    /// Environment variable: `DATACENTER_ID`
    #[arg(long, env = "DATACENTER_ID", default_value_t = 1)]
    pub datacenter_id: u64,

    /// Worker field of the Snowflake IDs (0..=31). Each process sharing an ID
    /// namespace needs a distinct `(DATACENTER_ID, WORKER_ID)` pair.
    ///
    /// Environment variable: `WORKER_ID`
    #[arg(long, env = "WORKER_ID", default_value_t = 1)]
    pub worker_id: u64,

    /// Batch size used by `/ids` when `count` is missing or invalid.
    ///
    /// Environment variable: `DEFAULT_BATCH`
    #[arg(long, env = "DEFAULT_BATCH", default_value_t = 10)]
    pub default_batch: usize,

    /// Largest batch a single `/ids` request may return. Larger counts are
    /// clamped.
    ///
    /// Environment variable: `MAX_BATCH`
    #[arg(long, env = "MAX_BATCH", default_value_t = 1_000)]
    pub max_batch: usize,

    /// How long a request may wait for IDs before failing with `503`.
    ///
    /// Environment variable: `WAIT_TIMEOUT_MS`
    #[arg(long, env = "WAIT_TIMEOUT_MS", default_value_t = 1_000)]
    pub wait_timeout_ms: u64,

    /// How long the initial fill of both buffers may take. `0` waits forever.
    ///
    /// Environment variable: `STARTUP_TIMEOUT_SECS`
    #[arg(long, env = "STARTUP_TIMEOUT_SECS", default_value_t = 30)]
    pub startup_timeout_secs: u64,

    /// Pause after a failed call to the ID source before retrying.
    ///
    /// Environment variable: `REFILL_BACKOFF_MS`
    #[arg(long, env = "REFILL_BACKOFF_MS", default_value_t = 1)]
    pub refill_backoff_ms: u64,

    /// Emit JSON log lines instead of the human-readable format.
    ///
    /// Environment variable: `LOG_JSON`
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub buffer_size: usize,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub default_batch: usize,
    pub max_batch: usize,
    pub wait_timeout: Duration,
    pub startup_timeout: Option<Duration>,
    pub refill_backoff: Duration,
    pub log_json: bool,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.buffer_size == 0 {
            bail!("BUFFER_SIZE must be greater than 0");
        }

        if args.datacenter_id > MAX_DATACENTER_ID {
            bail!(
                "DATACENTER_ID ({}) exceeds the Snowflake datacenter field (max = {})",
                args.datacenter_id,
                MAX_DATACENTER_ID
            );
        }

        if args.worker_id > MAX_WORKER_ID {
            bail!(
                "WORKER_ID ({}) exceeds the Snowflake worker field (max = {})",
                args.worker_id,
                MAX_WORKER_ID
            );
        }

        if args.default_batch == 0 || args.max_batch == 0 {
            bail!("DEFAULT_BATCH and MAX_BATCH must be greater than 0");
        }

        if args.default_batch > args.max_batch {
            bail!(
                "DEFAULT_BATCH ({}) exceeds MAX_BATCH ({})",
                args.default_batch,
                args.max_batch
            );
        }

        if args.wait_timeout_ms == 0 {
            bail!("WAIT_TIMEOUT_MS must be greater than 0");
        }

        let startup_timeout = match args.startup_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(Self {
            server_addr: args.server_addr,
            buffer_size: args.buffer_size,
            datacenter_id: args.datacenter_id,
            worker_id: args.worker_id,
            default_batch: args.default_batch,
            max_batch: args.max_batch,
            wait_timeout: Duration::from_millis(args.wait_timeout_ms),
            startup_timeout,
            refill_backoff: Duration::from_millis(args.refill_backoff_ms),
            log_json: args.log_json,
        })
    }
}
