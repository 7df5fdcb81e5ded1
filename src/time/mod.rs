pub mod clock;
pub mod duration;
pub mod stamp;

pub use clock::*;
pub use duration::*;
pub use stamp::*;

/// Number of nanoseconds in a second
pub const NSEC_PER_SEC: u32 = 1_000_000_000;
