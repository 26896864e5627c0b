//! The chat turn pipeline for Threadline.
//!
//! A turn moves through four stages:
//!
//! 1. **Bootstrap** the process-wide assistant and thread (once)
//! 2. **Prepare** the user message, uploading any attachment
//! 3. **Run** the assistant on the thread, answering tool calls, until the
//!    run completes, fails, or is aborted
//! 4. **Render** the reply into text, images, and downloadable files
//!
//! Only a completed run adds an assistant turn to the transcript.

pub mod attachment;
pub mod bootstrap;
pub mod engine;
pub mod renderer;
pub mod run_loop;

#[cfg(test)]
mod test_helpers;

pub use attachment::{Attachment, AttachmentKind, classify, prepare_message};
pub use bootstrap::{Bootstrap, ReferenceDocument, Session, SessionHandles, assistant_spec};
pub use engine::{ChatEngine, TurnRequest};
pub use renderer::{Renderer, display_name, select_reply};
pub use run_loop::RunLoop;
