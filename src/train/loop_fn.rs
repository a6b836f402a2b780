use std::time::Instant;

use log::info;
use rand::Rng;

use crate::arena::Arena;
use crate::error::{NnError, Result};
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::train::batch::Batch;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Trains `network` on `table` for `config.epochs` epochs and returns one
/// [`EpochStats`] per epoch.
///
/// Every mini-batch step runs inside [`Arena::scoped`], so `arena` only ever
/// holds one gradient network at a time. When `config.shuffle` is set the
/// rows of `table` are shuffled in place before each epoch.
///
/// # Arguments
/// - `network` — modified in place; must match `config.architecture`
/// - `arena`   — scratch space for gradient networks
/// - `table`   — rows of `[input | target]`
/// - `config`  — hyperparameters
/// - `rng`     — drives the per-epoch shuffle
pub fn train_loop<R: Rng + ?Sized>(
    network: &mut Network<'_>,
    arena: &mut Arena,
    table: &mut Matrix<'_>,
    config: &TrainConfig,
    rng: &mut R,
) -> Result<Vec<EpochStats>> {
    config.validate()?;
    if network.architecture() != config.architecture.as_slice() {
        return Err(NnError::InvalidConfig(format!(
            "network architecture {:?} does not match config {:?}",
            network.architecture(),
            config.architecture
        )));
    }

    let batch_size = config.batch_size.unwrap_or(table.rows()).max(1);
    let report_every = (config.epochs / 10).max(1);
    let mut batch = Batch::new();
    let mut history = Vec::with_capacity(config.epochs);

    info!(
        "training {:?} ({}) for {} epochs, batch_size = {batch_size}, rate = {}",
        config.architecture, config.activation, config.epochs, config.learning_rate
    );

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        if config.shuffle {
            table.shuffle_rows(rng);
        }

        let rows = table.view();
        loop {
            arena.scoped(|scratch| {
                batch.process(Some(scratch), batch_size, network, rows, config.learning_rate)
            })?;
            if batch.is_finished() {
                break;
            }
        }

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            cost: batch.cost(),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        if epoch % report_every == 0 || epoch == config.epochs {
            info!("epoch {epoch}/{}: cost = {:.6}", config.epochs, stats.cost);
        }
        history.push(stats);
    }

    Ok(history)
}
