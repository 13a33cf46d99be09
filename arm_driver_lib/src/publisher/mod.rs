pub mod rt_publisher;
pub mod sink;

pub use rt_publisher::*;
pub use sink::*;
