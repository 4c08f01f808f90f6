pub mod activity;
pub mod client;
pub mod errors;
pub mod feeds;
pub mod parser;
pub mod patterns;
pub mod types;

pub use client::HttpSource;
pub use errors::SourceError;
pub use parser::Extractor;
pub use patterns::ExtractionStrategy;
pub use types::*;
