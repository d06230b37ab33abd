//! Account service: customers, accounts and an LLM banking assistant.

pub mod accounts;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod context;
pub mod customers;
pub mod error;
pub mod llm;
pub mod server;
pub mod store;
pub mod tools;
