use serde::{Serialize, Deserialize};

/// Per-epoch statistics returned by `train_loop`, one entry per completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean mini-batch cost over this epoch, as accumulated by `Batch`.
    pub cost: f64,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
