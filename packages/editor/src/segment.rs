//! # Segments
//!
//! A worksheet is an ordered list of segments. Each segment has an identity
//! that never changes and is never reused, a kind, and its raw content.
//! Code segments additionally carry the output of their latest evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique segment identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentId(u64);

impl SegmentId {
    /// Allocate the next identity
    pub fn next() -> Self {
        SegmentId(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg-{}", self.0)
    }
}

/// Closed set of segment kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// Executable code, evaluated out of process
    #[default]
    Code,
    /// Narrative free text
    Free,
}

impl SegmentKind {
    pub fn is_executable(self) -> bool {
        matches!(self, SegmentKind::Code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Code => "code",
            SegmentKind::Free => "free",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the editor cursor lands when a segment takes focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorEntry {
    Top,
    Bottom,
}

impl CursorEntry {
    pub fn from_top(from_top: bool) -> Self {
        if from_top {
            CursorEntry::Top
        } else {
            CursorEntry::Bottom
        }
    }
}

/// Output of the latest evaluation of a code segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputState {
    /// Serialized result value, if one arrived
    pub value: Option<String>,

    /// Console output, appended chunk by chunk in arrival order
    pub console_text: String,

    /// Error reported by the evaluator
    pub error_text: Option<String>,

    /// Cleared only by the evaluator's done signal (or a timeout)
    pub is_running: bool,
}

impl OutputState {
    /// Reset value, console and error. Leaves the running flag alone.
    pub fn clear(&mut self) {
        self.value = None;
        self.console_text.clear();
        self.error_text = None;
    }
}

/// A single worksheet segment
///
/// Not `Clone`: a copy would share the original's identity.
#[derive(Debug, PartialEq, Eq)]
pub struct Segment {
    id: SegmentId,
    kind: SegmentKind,
    content: String,
    output: Option<OutputState>,
    focus: Option<CursorEntry>,
}

impl Segment {
    /// Create a segment with a fresh identity
    pub fn new(kind: SegmentKind, content: impl Into<String>) -> Self {
        Self {
            id: SegmentId::next(),
            kind,
            content: content.into(),
            output: kind.is_executable().then(OutputState::default),
            focus: None,
        }
    }

    pub fn code(content: impl Into<String>) -> Self {
        Self::new(SegmentKind::Code, content)
    }

    pub fn free(content: impl Into<String>) -> Self {
        Self::new(SegmentKind::Free, content)
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    pub fn is_executable(&self) -> bool {
        self.kind.is_executable()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Output state (code segments only)
    pub fn output(&self) -> Option<&OutputState> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut OutputState> {
        self.output.as_mut()
    }

    pub fn is_running(&self) -> bool {
        self.output.as_ref().is_some_and(|o| o.is_running)
    }

    /// Take UI focus, placing the cursor at `entry`
    pub fn activate(&mut self, entry: CursorEntry) {
        self.focus = Some(entry);
    }

    pub fn deactivate(&mut self) {
        self.focus = None;
    }

    pub fn is_active(&self) -> bool {
        self.focus.is_some()
    }

    pub fn focus(&self) -> Option<CursorEntry> {
        self.focus
    }

    /// Build a replacement of another kind. The replacement gets a new
    /// identity and starts with empty output; only the content carries over.
    pub fn converted_to(&self, kind: SegmentKind) -> Segment {
        Segment::new(kind, self.content.clone())
    }
}
