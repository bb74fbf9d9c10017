//! Scanlens identifies things from photos and lets you ask follow-up
//! questions about them from the terminal.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the scan result, translation, configuration, the chat
//!   conversation and its streaming orchestration.
//! - [`ui`] renders scan results and replies, and runs the interactive chat
//!   panel.
//! - [`api`] defines the request and response payloads of the hosted
//!   functions.
//! - [`utils`] holds logging setup and small text helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`core::analysis`],
//! [`core::translate`] and [`ui::chat_loop`].

pub mod api;
pub mod cli;
pub mod core;
pub mod ui;
pub mod utils;
