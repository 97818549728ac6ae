//! Process-wide log output for camtrack tools.
//!
//! Library code only talks to the `log` facade. A binary picks a backend once
//! at startup: `init_with_level` for plain stderr lines, or `init_tracing`
//! (feature `tracing`) for a `tracing-subscriber` pipeline.
//!
//! Plain lines carry the time since install, the level and the last segment
//! of the module path, so `camtrack_calib::device` shows up as `device`:
//!
//! ```text
//! [   0.012s  INFO device] b8:27:eb:4f:10:2a: camera preferences loaded (calibrated: true)
//! ```

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

struct GatewayLog {
    max_level: LevelFilter,
    since: Instant,
}

fn module_name(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

fn render_line(elapsed_s: f64, level: Level, target: &str, msg: &fmt::Arguments<'_>) -> String {
    format!(
        "[{elapsed_s:8.3}s {level:>5} {}] {msg}",
        module_name(target)
    )
}

impl Log for GatewayLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = render_line(
            self.since.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        // One locked write per record keeps lines from concurrent devices whole.
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static GATEWAY_LOG: OnceLock<GatewayLog> = OnceLock::new();

/// Route `log` records at or above `level` to stderr.
///
/// The first call wins; later calls return `Ok(())` and keep its level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if GATEWAY_LOG.get().is_some() {
        return Ok(());
    }
    let installed = GATEWAY_LOG.get_or_init(|| GatewayLog {
        max_level: level,
        since: Instant::now(),
    });
    log::set_logger(installed)?;
    log::set_max_level(installed.max_level);
    Ok(())
}

/// Level for a repeated `-v` flag. Info by default, trace from `-vv` on.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install a `tracing` subscriber on stderr, filtered by `RUST_LOG`
/// (`info` when unset). `json` switches to one flat JSON object per event.
///
/// Does nothing if a global subscriber is already set.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);
    let _ = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
}
