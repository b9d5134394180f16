pub mod classify;
pub mod config;
pub mod crawler;
pub mod error;
pub mod explorer;
pub mod flatten;
pub mod graph;
pub mod models;
pub mod snapshot;
pub mod stats;
