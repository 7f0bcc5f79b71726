//! Loop driver and read-only snapshot service for the flapgen simulation.

pub mod driver;
pub mod server;
