use log::debug;

use crate::arena::Arena;
use crate::error::Result;
use crate::math::matrix::MatrixView;
use crate::network::network::Network;

/// Walks a training table one mini-batch per call and accumulates the
/// epoch's mean cost.
///
/// A fresh `Batch` is finished; the next [`Batch::process`] starts a new
/// epoch from row 0. Keep calling until [`Batch::is_finished`] turns true,
/// then read [`Batch::cost`].
#[derive(Debug, Clone)]
pub struct Batch {
    begin: usize,
    cost: f64,
    finished: bool,
}

impl Batch {
    pub fn new() -> Batch {
        Batch {
            begin: 0,
            cost: 0.0,
            finished: true,
        }
    }

    /// Runs one gradient step on rows `[begin, begin + batch_size)` of `table`
    /// (clipped to the table) and advances to the next mini-batch.
    ///
    /// The gradient network comes from `arena`; the caller decides when to
    /// rewind it, typically through [`Arena::scoped`].
    ///
    /// # Panics
    /// Panics if `batch_size` is zero or `table` does not fit `network`.
    pub fn process(
        &mut self,
        arena: Option<&Arena>,
        batch_size: usize,
        network: &mut Network<'_>,
        table: MatrixView<'_>,
        rate: f64,
    ) -> Result<()> {
        assert!(batch_size > 0, "batch_size must be at least 1");

        if self.finished {
            self.begin = 0;
            self.cost = 0.0;
            self.finished = false;
        }

        let rows = table.rows();
        let size = batch_size.min(rows.saturating_sub(self.begin));
        let slice = table.slice_rows(self.begin, self.begin + size);

        let gradient = network.backprop(arena, slice)?;
        network.learn(&gradient, rate);
        self.cost += network.cost(slice);
        self.begin += batch_size;

        if self.begin >= rows {
            let batch_count = rows.div_ceil(batch_size);
            if batch_count > 0 {
                self.cost /= batch_count as f64;
            }
            self.finished = true;
            debug!("epoch finished: {batch_count} batch(es), cost = {:.6}", self.cost);
        }

        Ok(())
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Running cost of the current epoch; the epoch mean once finished.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    /// First row of the next mini-batch.
    pub fn begin(&self) -> usize {
        self.begin
    }
}

impl Default for Batch {
    fn default() -> Self {
        Batch::new()
    }
}
