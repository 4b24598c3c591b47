pub mod agent;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod llm;
pub mod logger;
pub mod observer;
pub mod prompt;
pub mod tools;

pub use agent::Agent;
pub use config::Config;
