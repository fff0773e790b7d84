/// Which buffer strategy a fill level belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum BufferKind {
    /// One record at a time (stack or static buffer).
    Single,
    /// Two halves, one filling while the other drains.
    Double,
    /// Circular buffer of contiguous records.
    Ring,
}

impl BufferKind {
    pub const ALL: [BufferKind; 3] = [BufferKind::Single, BufferKind::Double, BufferKind::Ring];

    pub fn name(self) -> &'static str {
        match self {
            BufferKind::Single => "single",
            BufferKind::Double => "double",
            BufferKind::Ring => "ring",
        }
    }

    fn index(self) -> usize {
        match self {
            BufferKind::Single => 0,
            BufferKind::Double => 1,
            BufferKind::Ring => 2,
        }
    }
}

/// Passive health counters.
///
/// Owned by whoever drives the pipeline and handed down by `&mut`, so
/// independent pipelines never share counts. Counters only grow until
/// [`Diagnostics::reset`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    error_count: u64,
    overflow_count: u64,
    peak_depth: [usize; 3],
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one structural corruption.
    pub fn record_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Count one record dropped because its buffer was full.
    pub fn record_overflow(&mut self) {
        self.overflow_count = self.overflow_count.saturating_add(1);
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    /// Raise the high-water mark for `kind` to `depth` if it is higher.
    pub fn observe_depth(&mut self, kind: BufferKind, depth: usize) {
        let peak = &mut self.peak_depth[kind.index()];
        if depth > *peak {
            *peak = depth;
        }
    }

    pub fn peak_depth(&self, kind: BufferKind) -> usize {
        self.peak_depth[kind.index()]
    }

    /// Highest fill level seen across all buffer kinds.
    pub fn max_peak_depth(&self) -> usize {
        self.peak_depth.iter().copied().max().unwrap_or(0)
    }

    /// Operator reset of all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_depth_never_decreases() {
        let mut diag = Diagnostics::new();
        diag.observe_depth(BufferKind::Ring, 64);
        diag.observe_depth(BufferKind::Ring, 16);
        assert_eq!(diag.peak_depth(BufferKind::Ring), 64);
        assert_eq!(diag.peak_depth(BufferKind::Double), 0);
    }

    #[test]
    fn max_peak_spans_kinds() {
        let mut diag = Diagnostics::new();
        diag.observe_depth(BufferKind::Single, 12);
        diag.observe_depth(BufferKind::Double, 200);
        assert_eq!(diag.max_peak_depth(), 200);
    }

    #[test]
    fn reset_clears_everything() {
        let mut diag = Diagnostics::new();
        diag.record_error();
        diag.record_overflow();
        diag.observe_depth(BufferKind::Single, 8);
        diag.reset();
        assert_eq!(diag, Diagnostics::default());
    }

    #[test]
    fn independent_instances_do_not_share_counts() {
        let mut a = Diagnostics::new();
        let b = Diagnostics::new();
        a.record_error();
        assert_eq!(a.error_count(), 1);
        assert_eq!(b.error_count(), 0);
    }
}
