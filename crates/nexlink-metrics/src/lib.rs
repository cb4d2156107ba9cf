//! Metrics for the nexlink protocol engine.
//!
//! Every metric the engine records is declared here as a [`Metric`] constant
//! so names, units and label keys live in one place. The `metrics` crate is
//! re-exported; without an installed recorder all recording is a no-op.
//!
//! # Example
//!
//! ```rust,ignore
//! use nexlink_metrics::{metric_defs, PanelLabels};
//!
//! let labels = PanelLabels::new("front_panel");
//! let sent = &metric_defs::COMMANDS_SENT;
//! metrics::counter!(sent.name, &labels.for_metric(sent, Some("get"))).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Label key carrying the panel name.
pub const PANEL_LABEL: &str = "panel";
/// Label key carrying the command kind (`get`, `set`, `page`, ...).
pub const KIND_LABEL: &str = "kind";

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

/// A metric declaration.
///
/// ```rust
/// use nexlink_metrics::{Metric, MetricKind, PANEL_LABEL};
///
/// const FRAMES: Metric = Metric::counter("nexlink.frames", "Frames received", &[PANEL_LABEL]);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// assert_eq!(FRAMES.labels, &["panel"]);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// Name passed to the `metrics` macros.
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Unit,
    /// Label keys attached on every recording, in order.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// A counter of discrete occurrences.
    pub const fn counter(
        name: &'static str,
        description: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: MetricKind::Counter,
            description,
            unit: Unit::Count,
            labels,
        }
    }

    /// A gauge holding a current count.
    pub const fn gauge(
        name: &'static str,
        description: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: MetricKind::Gauge,
            description,
            unit: Unit::Count,
            labels,
        }
    }

    /// A histogram of samples in `unit`.
    pub const fn histogram(
        name: &'static str,
        description: &'static str,
        unit: Unit,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            kind: MetricKind::Histogram,
            description,
            unit,
            labels,
        }
    }

    /// Register the description and unit with the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// All metric definitions for the engine.
pub mod metric_defs {
    use super::{Metric, Unit, KIND_LABEL, PANEL_LABEL};

    const PANEL: &[&str] = &[PANEL_LABEL];
    const COMMAND: &[&str] = &[PANEL_LABEL, KIND_LABEL];

    // ========================================================================
    // Link
    // ========================================================================

    pub const FRAMES_RECEIVED: Metric =
        Metric::counter("nexlink.link.frames_received", "Frames received from the panel", PANEL);

    pub const FRAME_ERRORS: Metric =
        Metric::counter("nexlink.link.frame_errors", "Frames that could not be decoded", PANEL);

    // ========================================================================
    // Commands
    // ========================================================================

    pub const COMMANDS_SENT: Metric =
        Metric::counter("nexlink.command.sent", "Commands written to the link", COMMAND);

    pub const COMMANDS_SUCCEEDED: Metric = Metric::counter(
        "nexlink.command.succeeded",
        "Commands completed with a success frame",
        COMMAND,
    );

    pub const COMMANDS_FAILED: Metric = Metric::counter(
        "nexlink.command.failed",
        "Commands completed with a fault, another non-success frame or the timeout",
        COMMAND,
    );

    pub const COMMANDS_TIMED_OUT: Metric = Metric::counter(
        "nexlink.command.timed_out",
        "Commands expired by the response timeout",
        COMMAND,
    );

    pub const COMMAND_LATENCY: Metric = Metric::histogram(
        "nexlink.command.latency_ms",
        "Time from transmission to completion",
        Unit::Milliseconds,
        COMMAND,
    );

    // ========================================================================
    // Queue
    // ========================================================================

    /// Includes the command in flight.
    pub const QUEUE_DEPTH: Metric =
        Metric::gauge("nexlink.queue.depth", "Commands waiting in the queue", PANEL);

    /// A response arrived while the oldest command could not own it.
    pub const DESYNC_ROTATIONS: Metric = Metric::counter(
        "nexlink.queue.desync_rotations",
        "Queue rotations caused by correlation desync",
        PANEL,
    );

    pub const UNSOLICITED_FRAMES: Metric = Metric::counter(
        "nexlink.queue.unsolicited",
        "Response frames with no command in flight",
        PANEL,
    );

    // ========================================================================
    // Touch
    // ========================================================================

    pub const TOUCH_EVENTS: Metric =
        Metric::counter("nexlink.touch.events", "Touch events routed to a hooked widget", PANEL);

    pub const TOUCH_UNKNOWN: Metric = Metric::counter(
        "nexlink.touch.unknown",
        "Touch events for widgets that were never hooked",
        PANEL,
    );

    /// Every metric, for bulk registration.
    pub const ALL: &[Metric] = &[
        FRAMES_RECEIVED,
        FRAME_ERRORS,
        COMMANDS_SENT,
        COMMANDS_SUCCEEDED,
        COMMANDS_FAILED,
        COMMANDS_TIMED_OUT,
        COMMAND_LATENCY,
        QUEUE_DEPTH,
        DESYNC_ROTATIONS,
        UNSOLICITED_FRAMES,
        TOUCH_EVENTS,
        TOUCH_UNKNOWN,
    ];
}

/// Label values for one panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelLabels {
    pub panel: String,
}

impl PanelLabels {
    pub fn new(panel: impl Into<String>) -> Self {
        Self {
            panel: panel.into(),
        }
    }

    /// Label pairs for the keys `metric` declares. `kind` fills the command
    /// kind key and is ignored by metrics that do not declare it.
    pub fn for_metric(&self, metric: &Metric, kind: Option<&str>) -> Vec<(&'static str, String)> {
        metric
            .labels
            .iter()
            .filter_map(|&key| match key {
                PANEL_LABEL => Some((key, self.panel.clone())),
                KIND_LABEL => kind.map(|kind| (key, kind.to_string())),
                _ => None,
            })
            .collect()
    }
}

/// Describe every metric. Call once after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Install a Prometheus recorder serving `/metrics` on `addr` and describe
/// every metric.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_declaration() {
        let labels = PanelLabels::new("front");
        assert_eq!(
            labels.for_metric(&metric_defs::FRAMES_RECEIVED, None),
            vec![("panel", "front".to_string())]
        );
        // a kind is dropped where the metric does not declare one
        assert_eq!(
            labels.for_metric(&metric_defs::QUEUE_DEPTH, Some("get")),
            vec![("panel", "front".to_string())]
        );
        assert_eq!(
            labels.for_metric(&metric_defs::COMMANDS_SENT, Some("get")),
            vec![("panel", "front".to_string()), ("kind", "get".to_string())]
        );
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMANDS_SENT.name, "nexlink.command.sent");
        assert_eq!(metric_defs::COMMANDS_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::COMMANDS_SENT.labels, &["panel", "kind"]);
        assert_eq!(metric_defs::QUEUE_DEPTH.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::COMMAND_LATENCY.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::COMMAND_LATENCY.unit, Unit::Milliseconds);
    }

    #[test]
    fn test_every_metric_labelled_by_panel() {
        for metric in metric_defs::ALL {
            assert_eq!(metric.labels.first(), Some(&PANEL_LABEL), "{}", metric.name);
        }
    }

    #[test]
    fn test_all_metrics_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert_eq!(total, 12);
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
