pub mod cli;
pub mod config;
pub mod dashboard;
pub mod data_models;
pub mod errors;
pub mod link;
pub mod metrics;
pub mod parsers;
pub mod poller;
pub mod snapshot;
