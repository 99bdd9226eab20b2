pub mod analyzer;
pub mod answer;
pub mod api;
pub mod config;
pub mod context;
pub mod data_models;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod pipeline;
pub mod search;
pub mod validator;
