pub mod collector;
pub mod feed;
pub mod process;
pub mod resolver;
pub mod snapshot;
pub mod source;
