pub mod brain;
pub mod config;
pub mod protocol;

pub use brain::*;
pub use config::*;
pub use protocol::*;
