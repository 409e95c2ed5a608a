#![doc = include_str!("../README.md")]

pub mod cli;
pub mod environ;
pub mod error;
pub mod exec;
pub mod launch;
pub mod setup;
pub mod shared;

pub use error::Error;
