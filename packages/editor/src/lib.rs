//! # Worksheet Editor
//!
//! Document and view model for an interactive worksheet: an ordered list of
//! code and free-text segments, one of them active, with code evaluated out
//! of process.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI: keys, clicks, edits                     │
//! └─────────────────────────────────────────────┘
//!                     ↓ inbound events
//! ┌─────────────────────────────────────────────┐
//! │ session: interprets events                  │
//! │  - worksheet: segments + active cursor      │
//! │  - correlator: identity → segment output    │
//! │  - document: load/save, dirty tracking      │
//! └─────────────────────────────────────────────┘
//!        ↓ evaluation-request      ↑ value / console / error / done
//! ┌─────────────────────────────────────────────┐
//! │ evaluator (out of process)                  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Identity, not position**: responses find their segment by identity
//! 2. **Fail soft**: stale responses and edge moves are no-ops, never faults
//! 3. **Arrival order**: responses are applied as they come, never buffered
//! 4. **Explicit wiring**: the event channel is injected, never global
//!
//! ## Usage
//!
//! ```rust,ignore
//! use worksheet_editor::{Event, EventChannel, WorksheetDocument, WorksheetSession};
//!
//! let channel = EventChannel::new();
//! channel.subscribe_to("evaluation-request", |request| send_to_evaluator(request));
//!
//! let doc = WorksheetDocument::load("notes.clj", channel)?;
//! let mut session = WorksheetSession::open(doc);
//!
//! session.handle(Event::RunActive);
//! // ... later, from the evaluator
//! session.handle(Event::EvaluationDone { segment_id });
//!
//! session.document_mut().save()?;
//! ```

mod correlator;
mod document;
mod errors;
mod events;
mod segment;
pub mod serializer;
mod session;
mod timeout;
mod worksheet;

pub use correlator::{EvaluationCorrelator, EvaluationError, TIMEOUT_MESSAGE};
pub use document::{DocumentStorage, WorksheetDocument};
pub use errors::EditorError;
pub use events::{Event, EventChannel, EventLog, Subscription};
pub use segment::{CursorEntry, OutputState, Segment, SegmentId, SegmentKind};
pub use serializer::FormatError;
pub use session::WorksheetSession;
pub use timeout::{FixedTimeout, NoTimeout, TimeoutPolicy};
pub use worksheet::{SegmentLookup, SegmentSnapshot, Worksheet, WorksheetSnapshot};
