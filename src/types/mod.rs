//! Shared type definitions
//!
//! This module contains the data types passed between the generator, the
//! session and the CLI.

pub mod message;
pub mod status;
pub mod workflow;

pub use message::{ChatMessage, Role};
pub use status::{Status, StatusLevel};
pub use workflow::Workflow;
