pub mod cli;
pub mod error;
pub mod launcher;
pub mod model;
pub mod telemetry;
pub mod worker;
