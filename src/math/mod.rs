pub mod matrix;

pub use matrix::{Matrix, MatrixView, Row};
