pub mod config;
pub mod content;
pub mod engine;
pub mod util;
