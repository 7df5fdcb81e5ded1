#![allow(clippy::needless_range_loop)]

mod basis;
mod knot;
mod misc;
mod spline;
mod time;

pub mod prelude {
    pub use crate::basis::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::spline::*;
    pub use crate::time::*;
}
