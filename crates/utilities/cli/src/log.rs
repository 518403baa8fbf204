//! Log flags and tracing subscriber setup.

use crate::CliResult;
use clap::{ArgAction, Args};
use tracing::Level;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging arguments.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level (0-4). Defaults to warnings only.
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub v: u8,
    /// Disable ANSI colors in log output.
    #[arg(long = "log.no-color", global = true, env = "FERRY_LOG_NO_COLOR")]
    pub no_color: bool,
}

impl LogArgs {
    /// The maximum level selected by the `-v` count.
    pub const fn level(&self) -> Level {
        match self.v {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Installs the global tracing subscriber for these arguments.
    pub fn init_tracing(&self) -> CliResult<()> {
        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(self.level()).into())
            .from_env()?;
        init_tracing_subscriber(filter, !self.no_color)
    }
}

/// Installs a fmt subscriber filtered by `filter`.
///
/// `RUST_LOG` directives are already folded into `filter` by [`LogArgs::init_tracing`].
pub fn init_tracing_subscriber(filter: EnvFilter, ansi: bool) -> CliResult<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_ansi(ansi).with_target(true))
        .with(filter)
        .try_init()?;
    Ok(())
}
