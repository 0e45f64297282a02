pub mod allocation;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod format;
pub mod market_data;
pub mod models;
pub mod rebalancing;
pub mod report;
pub mod service;
pub mod storage;
pub mod view;
