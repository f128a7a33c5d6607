//! Numerical building blocks: matrix algebra, Jacobi eigen-decomposition,
//! principal components and least squares.

pub mod eigen;
pub mod matrix;
pub mod ols;
pub mod pca;

pub use eigen::*;
pub use matrix::*;
pub use ols::*;
pub use pca::*;
