pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod gcp;
pub mod http;
pub mod image;
pub mod output;
pub mod registry;
pub mod scanner;
pub mod service;

#[cfg(test)]
mod testutil;

pub use anyhow::Result;
