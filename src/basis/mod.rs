pub mod cumulative_basis;
pub use cumulative_basis::*;
