pub mod aggregator;
pub mod config;
pub mod data_models;
pub mod errors;
pub mod export;
pub mod file_processor;
pub mod identity;
pub mod kpi;
pub mod metrics;
pub mod models;
pub mod parallel;
pub mod parsers;
pub mod pipeline;
pub mod row_builder;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod tests;
