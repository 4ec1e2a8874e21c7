pub mod log;
pub mod message;
pub mod watch;

pub use log::*;
pub use message::*;
pub use watch::*;
