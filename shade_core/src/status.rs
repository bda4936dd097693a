//! State snapshots and tick outcomes published by the cover.

/// Snapshot of the estimated cover state, pushed outward on every
/// mutation and on every poll tick while traveling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverSnapshot {
    /// Position percentage: 0 = fully closed, 100 = fully open.
    pub position: u8,
    /// Tilt percentage; `None` when the cover has no tilt axis.
    pub tilt: Option<u8>,
    pub opening: bool,
    pub closing: bool,
}

/// Outcome of a single poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// Poll loop is not armed; nothing to do.
    Idle,
    /// Still traveling toward the target.
    Moving,
    /// All axes arrived this tick; estimators stopped and the poll loop
    /// disarmed. `stop_issued` reports whether a physical STOP command
    /// was sent (suppressed at hard limits unless `send_stop_at_end`).
    Arrived { stop_issued: bool },
}
