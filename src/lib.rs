pub mod confidence;
pub mod config;
pub mod countries;
pub mod data_manager;
pub mod error;
pub mod export;
pub mod http;
pub mod json_safe;
pub mod leaderboard;
pub mod model;
pub mod nations;
pub mod query;
pub mod table;
pub mod teams;
