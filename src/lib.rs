pub mod aggregate;
pub mod bucket;
pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod model;
pub mod rank;
pub mod report;
