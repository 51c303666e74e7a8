pub mod app;
pub mod batch;
pub mod chat;
pub mod config;
pub mod domain;
pub mod error;
pub mod extract;
pub mod llm;
pub mod output;
pub mod paper;
pub mod pipeline;
pub mod retry;
pub mod sanitize;
pub mod store;
