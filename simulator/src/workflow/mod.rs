pub mod config;
pub mod live;
pub mod runner;
pub mod transport;
pub mod vehicle;
