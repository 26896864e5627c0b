//! # Threadline Core
//!
//! Domain types, traits, and error definitions for the Threadline assistant
//! chat client. This crate has **no transport dependencies**; it defines the
//! model that the HTTP client, the tools, and the run loop implement against.
//!
//! ## Layout
//!
//! - [`assistant`]: the remote assistant service seam and its wire types
//! - [`message`]: turns, the transcript, and outbound content parts
//! - [`tool`]: locally answered function tools and their registry
//! - [`event`]: progress events published while a run is in flight

pub mod assistant;
pub mod error;
pub mod event;
pub mod message;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use assistant::{AssistantService, Run, RunStatus, ThreadMessage};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{ContentPart, Role, Transcript, Turn, TurnText};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
