//! Pipeline stages for one parse request.
//!
//! Each submodule implements exactly one step, so each can be tested without
//! an HTTP server and the handler in [`crate::api::handlers`] reads as a plain
//! sequence of calls.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ acquire ──▶ guard ──▶ convert
//! (which?)   (to disk)   (size,    (engine)
//!                         %PDF)
//!            cleanup ◀── registered paths, removed on every exit
//! ```
//!
//! 1. [`source`]:  exactly one of upload / URL, before any I/O
//! 2. [`acquire`]: stream the input into a per-request scratch directory
//! 3. [`guard`]:   on-disk size ceiling and PDF signature
//! 4. [`convert`]: run the engine on a blocking thread and classify failures
//! 5. [`cleanup`]: the ledger that removes everything step 2 created

pub mod acquire;
pub mod cleanup;
pub mod convert;
pub mod guard;
pub mod source;
