pub mod config;
pub mod errors;
pub mod gateway;
pub mod logging;
pub mod storage;
pub mod tui;
