pub mod config;
pub mod msgs;
pub mod rt_state;

pub use config::*;
pub use msgs::*;
pub use rt_state::*;
