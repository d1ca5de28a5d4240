pub mod adb;
pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod device;
pub mod error;
pub mod output;
pub mod utils;
pub mod workspace;

#[cfg(test)]
pub mod testing;
