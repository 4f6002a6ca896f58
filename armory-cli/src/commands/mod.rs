pub mod audit;
pub mod config;
