pub mod binomial;
pub mod floating_point;
pub mod rotation;

pub use binomial::*;
pub use floating_point::*;
pub use rotation::*;
