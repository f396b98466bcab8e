pub mod collab;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod oracle;
pub mod series;
pub mod storage;
