use anyhow::{anyhow, Result};
use std::io::{self, IsTerminal};
use tracing_subscriber::fmt::{self, time::ChronoUtc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays parseable.
///
/// Level: `RUST_LOG` if set, else `info`; `-v` is debug, `-vv` and above is
/// trace; `quiet` shows errors only. `RUST_LOG_JSON=true` switches to JSON
/// lines, which is also the default when stderr is not a terminal.
pub fn init_logging(verbose_level: u8, quiet: bool) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        let default = match verbose_level {
            0 => "info",
            // sqlx logs every statement at debug
            1 => "debug,sqlx::query=info,hyper_util=info",
            _ => "trace",
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    let json = std::env::var("RUST_LOG_JSON")
        .map(|v| v == "true")
        .unwrap_or_else(|_| !io::stderr().is_terminal());

    let registry = Registry::default().with(filter);

    let result = if json {
        let json_layer = fmt::layer()
            .json()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(json_layer).try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_timer(ChronoUtc::rfc_3339())
            .with_writer(io::stderr);
        registry.with(fmt_layer).try_init()
    };

    result.map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}
