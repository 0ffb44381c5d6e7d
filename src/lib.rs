pub mod batch;
pub mod config;
pub mod context;
pub mod db;
pub mod engine;
pub mod error;
pub mod fit;
pub mod matching;
pub mod models;
pub mod report;
pub mod rules;
pub mod status;
pub mod store;
pub mod tasks;
