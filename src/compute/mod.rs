//! Compute module - Rendering, scoring and the evolutionary search.

mod fitness;
mod pixels;
mod raster;

pub mod evolution;

pub use fitness::*;
pub use pixels::*;
pub use raster::*;
