pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod model;
pub mod pipeline;
pub mod service;
pub mod sources;
pub mod store;
