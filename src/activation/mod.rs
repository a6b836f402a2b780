pub mod activation;

pub use activation::{ActivationFunction, RELU_LEAK};
