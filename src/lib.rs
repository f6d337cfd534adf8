//! Paced document reader driven by spoken commands

pub mod chunker;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod lookup;
pub mod provider;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod source;
pub mod state;
pub mod transcript;
pub mod wake;
