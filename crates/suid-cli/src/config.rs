use std::{path::PathBuf, time::Duration};

use anyhow::bail;
use clap::{Parser, Subcommand};
use suid::{Config, DEFAULT_MAX_POOL, DEFAULT_MIN_POOL};

/// Runtime configuration for the `suid` binary.
///
/// Pool settings are parsed from CLI arguments or environment variables (a
/// `.env` file in the working directory is honored), with the same defaults as
/// the library.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "suid",
    version,
    about = "Draw service-unique IDs from a block allocation service"
)]
pub struct CliArgs {
    /// Endpoint of the block allocation service.
    ///
    /// Blocks are requested with `GET <url>?blocks=<n>`. Required by
    /// `generate`; the other commands work offline.
    ///
    /// Environment variable: `SUID_SERVER_URL`
    #[arg(long, env = "SUID_SERVER_URL")]
    pub server_url: Option<String>,

    /// Replenish when fewer than this many blocks are pooled.
    ///
    /// Environment variable: `SUID_POOL_MIN`
    #[arg(long, env = "SUID_POOL_MIN", default_value_t = DEFAULT_MIN_POOL)]
    pub pool_min: usize,

    /// Number of pooled blocks a replenishment aims for.
    ///
    /// Environment variable: `SUID_POOL_MAX`
    #[arg(long, env = "SUID_POOL_MAX", default_value_t = DEFAULT_MAX_POOL)]
    pub pool_max: usize,

    /// Directory the block pool is persisted in between runs.
    ///
    /// Environment variable: `SUID_STORAGE_DIR`
    #[arg(long, env = "SUID_STORAGE_DIR", default_value = ".suid")]
    pub storage_dir: PathBuf,

    /// How long to wait for blocks to arrive before giving up.
    ///
    /// Environment variable: `SUID_READY_TIMEOUT_MS`
    #[arg(long, env = "SUID_READY_TIMEOUT_MS", default_value_t = 10_000)]
    pub ready_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print freshly allocated IDs, one per line.
    Generate {
        /// How many IDs to print.
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Print the numeric value of an encoded ID.
    Decode {
        text: String,
        /// Read the legacy compressed base-32 form instead of base-36.
        #[arg(long, default_value_t = false)]
        legacy: bool,
    },
    /// Print the canonical text form of a numeric ID.
    Encode { number: u64 },
    /// Print the blocks currently persisted in the pool.
    Pool,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub suid: Config,
    pub storage_dir: PathBuf,
    pub ready_timeout: Duration,
    pub command: Command,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.pool_min > args.pool_max {
            bail!(
                "SUID_POOL_MIN ({}) must not exceed SUID_POOL_MAX ({})",
                args.pool_min,
                args.pool_max
            );
        }

        if args.ready_timeout_ms == 0 {
            bail!("SUID_READY_TIMEOUT_MS must be greater than 0");
        }

        if matches!(args.command, Command::Generate { .. }) && args.server_url.is_none() {
            bail!("SUID_SERVER_URL is required to generate ids");
        }

        let mut suid = Config::default()
            .with_min(args.pool_min)
            .with_max(args.pool_max);
        suid.url = args.server_url;
        suid.validate()?;

        Ok(Self {
            suid,
            storage_dir: args.storage_dir,
            ready_timeout: Duration::from_millis(args.ready_timeout_ms),
            command: args.command,
        })
    }
}
