use std::fmt;

use serde::Serialize;
use trice_frame::{BufferKind, Diagnostics};
use trice_transport::TxPort;

use crate::router::Router;

/// Snapshot of every health counter, for a periodic diagnostics routine.
///
/// Building a report has no side effects; the caller decides where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub error_count: u64,
    pub overflow_count: u64,
    pub peak_depth: Vec<BufferPeak>,
    pub channels: Vec<ChannelHealth>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferPeak {
    pub kind: BufferKind,
    pub peak: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelHealth {
    pub name: String,
    pub depth: usize,
    pub peak_backlog: usize,
    pub overruns: u64,
}

impl HealthReport {
    /// Collect the pipeline counters in `diag` and the backlog counters of
    /// every channel in `router`. Buffer kinds never used are left out.
    pub fn collect<P: TxPort>(diag: &Diagnostics, router: &Router<P>) -> Self {
        let peak_depth = BufferKind::ALL
            .into_iter()
            .map(|kind| BufferPeak {
                kind,
                peak: diag.peak_depth(kind),
            })
            .filter(|peak| peak.peak > 0)
            .collect();
        let channels = router
            .channels()
            .iter()
            .map(|channel| ChannelHealth {
                name: channel.name().to_string(),
                depth: channel.transmitter().depth(),
                peak_backlog: channel.transmitter().peak_backlog(),
                overruns: channel.transmitter().overrun_count(),
            })
            .collect();
        Self {
            error_count: diag.error_count(),
            overflow_count: diag.overflow_count(),
            peak_depth,
            channels,
        }
    }

    /// True when no corruption, overflow or overrun was counted.
    pub fn is_healthy(&self) -> bool {
        self.error_count == 0
            && self.overflow_count == 0
            && self.channels.iter().all(|channel| channel.overruns == 0)
    }
}

impl fmt::Display for HealthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "errors: {}", self.error_count)?;
        writeln!(f, "overflows: {}", self.overflow_count)?;
        for peak in &self.peak_depth {
            writeln!(f, "peak depth ({}): {}", peak.kind.name(), peak.peak)?;
        }
        for channel in &self.channels {
            writeln!(
                f,
                "channel {}: depth {}, peak backlog {}, overruns {}",
                channel.name, channel.depth, channel.peak_backlog, channel.overruns
            )?;
        }
        Ok(())
    }
}
