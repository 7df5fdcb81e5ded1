pub mod quaternion_spline;
pub mod sample;
pub mod spline_space;
pub mod uniform_spline;
pub mod vector_space_spline;

pub use sample::*;
pub use spline_space::*;
pub use uniform_spline::*;
