//! Logging setup and pipeline phase timing
//!
//! `init_logging` installs the process-wide tracing subscriber. A
//! `SessionTrace` records how long each pipeline phase took when timing is
//! enabled on a session.

use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// With `json` set, events are written as JSON lines. Calling this more than
/// once is harmless: later calls leave the first subscriber in place.
pub fn init_logging(json: bool) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let _ = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()
    };
}

/// Pipeline phases that can be timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Ingest,
    Topology,
    Layout,
    Parse,
    Prepare,
    Render,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Ingest => "ingest",
            Phase::Topology => "topology",
            Phase::Layout => "layout",
            Phase::Parse => "parse",
            Phase::Prepare => "prepare",
            Phase::Render => "render",
        }
    }
}

/// One completed phase
#[derive(Debug, Clone, Serialize)]
pub struct PhaseTrace {
    pub phase: Phase,
    #[serde(rename = "elapsed_ms")]
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// Phase timings of one session, in completion order
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionTrace {
    pub phases: Vec<PhaseTrace>,
}

impl SessionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished phase and log its duration.
    pub fn record(&mut self, phase: Phase, elapsed: Duration) {
        info!(
            phase = phase.name(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "phase complete"
        );
        self.phases.push(PhaseTrace { phase, elapsed });
    }

    /// Run `f`, recording its duration under `phase` when `enabled`.
    pub fn time<T>(&mut self, enabled: bool, phase: Phase, f: impl FnOnce() -> T) -> T {
        if !enabled {
            return f();
        }
        let start = Instant::now();
        let out = f();
        self.record(phase, start.elapsed());
        out
    }

    /// Most recent duration recorded for `phase`
    pub fn last(&self, phase: Phase) -> Option<Duration> {
        self.phases
            .iter()
            .rev()
            .find(|p| p.phase == phase)
            .map(|p| p.elapsed)
    }

    pub fn total(&self) -> Duration {
        self.phases.iter().map(|p| p.elapsed).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    pub fn clear(&mut self) {
        self.phases.clear();
    }

    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
