pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod logging;
pub mod pipeline;
pub mod system;
