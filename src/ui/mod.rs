//! Terminal presentation.
//!
//! - [`blocks`] parses reply and detail text into display blocks.
//! - [`render`] and [`result_view`] turn blocks and scan results into styled
//!   lines, shared by the full-screen chat and the one-shot commands.
//! - [`chat_loop`] runs the interactive follow-up chat.
//! - [`theme`] holds the style palette.
//!
//! Ownership boundary: this layer presents and captures interaction state, while
//! [`crate::core`] owns domain logic and backend coordination.

pub mod blocks;
pub mod chat_loop;
pub mod render;
pub mod result_view;
pub mod theme;
