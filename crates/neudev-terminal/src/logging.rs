//! Logging configuration and initialization.
//!
//! Logs go to stderr so program output on stdout stays clean. Presets pick a
//! baseline, `--log TARGET=LEVEL` overrides single targets, and `RUST_LOG`
//! replaces both when set.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Baseline verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Startup notices plus transport and session warnings
    #[default]
    Production,
    Verbose,
    Debug,
    /// Every frame on the wire
    Trace,
    Quiet,
}

impl LogPreset {
    /// Pick a preset from CLI flags. Quieter and more detailed flags win
    /// over milder ones.
    pub fn from_flags(verbose: bool, debug: bool, trace: bool, quiet: bool) -> Self {
        match (quiet, trace, debug, verbose) {
            (true, ..) => LogPreset::Quiet,
            (_, true, ..) => LogPreset::Trace,
            (_, _, true, _) => LogPreset::Debug,
            (.., true) => LogPreset::Verbose,
            _ => LogPreset::Production,
        }
    }

    fn directives(self) -> &'static [&'static str] {
        match self {
            LogPreset::Production => &[
                "neudev::startup=info",
                "neudev::transport=warn",
                "neudev::session=warn",
                "neudev::input=warn",
                "neudev::classifier=off",
                "tokio_tungstenite=warn",
            ],
            LogPreset::Verbose => &["neudev=info", "tokio_tungstenite=warn"],
            LogPreset::Debug => &["neudev=debug", "tokio_tungstenite=info"],
            LogPreset::Trace => &["neudev=trace", "tokio_tungstenite=trace"],
            LogPreset::Quiet => &["neudev=error", "tokio_tungstenite=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target overrides in the order given; later ones win.
    pub overrides: Vec<(String, Level)>,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let overrides = log_overrides
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter_map(parse_override)
            .collect();

        Self {
            preset: LogPreset::from_flags(verbose, debug, trace, quiet),
            overrides,
            format,
        }
    }

    pub fn level_for(&self, target: &str) -> Option<Level> {
        self.overrides
            .iter()
            .rev()
            .find(|(t, _)| t == target)
            .map(|(_, level)| *level)
    }

    /// Build the filter. `RUST_LOG` takes precedence over everything else.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        let mut directives: Vec<String> = self
            .preset
            .directives()
            .iter()
            .map(|d| d.to_string())
            .collect();
        directives.extend(
            self.overrides
                .iter()
                .map(|(target, level)| format!("{}={}", target, level)),
        );

        EnvFilter::try_new(directives.join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Parse one `target=level` pair. Short targets are placed under `neudev::`.
fn parse_override(part: &str) -> Option<(String, Level)> {
    let (target, level) = part.split_once('=')?;
    let target = target.trim();
    let level: Level = level.trim().parse().ok()?;
    let target = if target.starts_with("neudev") || target.starts_with("tokio_tungstenite") {
        target.to_string()
    } else {
        format!("neudev::{}", target)
    };
    Some((target, level))
}

/// Install the global subscriber.
pub fn init(config: &LogConfig) {
    let registry = tracing_subscriber::registry().with(config.build_filter());

    match config.format {
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .init(),
    }
}
