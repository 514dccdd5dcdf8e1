//! The publish capability the engine's owner hands telemetry to.

use std::sync::Arc;
use talkmeter_types::{LogMessage, MetricsUpdate};

/// Fire-and-forget destination for telemetry.
///
/// Implementations must not block and must not fail: a sink that cannot
/// deliver drops the message. Metrics computation never depends on
/// delivery.
pub trait TelemetrySink: Send + Sync {
    fn publish_metrics(&self, update: MetricsUpdate);
    fn publish_log(&self, log: LogMessage);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish_metrics(&self, _update: MetricsUpdate) {}
    fn publish_log(&self, _log: LogMessage) {}
}

impl<T: TelemetrySink + ?Sized> TelemetrySink for Arc<T> {
    fn publish_metrics(&self, update: MetricsUpdate) {
        (**self).publish_metrics(update);
    }

    fn publish_log(&self, log: LogMessage) {
        (**self).publish_log(log);
    }
}
