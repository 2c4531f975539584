pub mod aggregator;
pub mod api;
pub mod config;
pub mod data_models;
pub mod dedup;
pub mod driver;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod html;
pub mod ledger;
pub mod matcher;
pub mod page_source;
pub mod presets;
pub mod status;
