pub mod logging;
pub mod orientation;

pub use logging::*;
pub use orientation::*;
