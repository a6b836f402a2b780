pub mod arena;
pub mod math;
pub mod activation;
pub mod network;
pub mod train;
pub mod error;

// Convenience re-exports
pub use arena::Arena;
pub use math::matrix::{Matrix, MatrixView, Row};
pub use activation::activation::ActivationFunction;
pub use network::network::Network;
pub use train::batch::Batch;
pub use train::epoch_stats::EpochStats;
pub use train::train_config::TrainConfig;
pub use train::loop_fn::train_loop;
pub use error::{NnError, Result};
