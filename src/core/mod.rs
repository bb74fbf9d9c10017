pub mod analysis;
pub mod app;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod message;
pub mod service;
pub mod sse;
pub mod translate;
