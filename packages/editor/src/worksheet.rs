//! # Worksheet
//!
//! The ordered segment collection plus the active-segment cursor.
//!
//! ## Invariants
//!
//! - At most one segment is active. When the cursor is set it is in range,
//!   and the segment it points at is the only one holding focus.
//! - The worksheet never becomes empty. Deleting the last segment is ignored.
//! - Segment identities are unique.
//!
//! Operations requested in a state where they mean nothing (navigating past
//! an edge, deleting the only segment, acting with no active segment) are
//! silent no-ops. They return `false`/`None` so callers can tell.

use crate::events::{Event, EventChannel};
use crate::segment::{CursorEntry, OutputState, Segment, SegmentId, SegmentKind};
use crate::serializer;
use serde::Serialize;
use tracing::debug;

/// Identity-based access to live segments
///
/// Evaluation responses only ever hold a segment identity, and the segment
/// may be gone by the time they arrive. `None` means exactly that.
pub trait SegmentLookup {
    fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment>;
}

/// Ordered segments with an optional active cursor
#[derive(Debug)]
pub struct Worksheet {
    segments: Vec<Segment>,
    active_index: Option<usize>,
    channel: EventChannel,
}

impl Worksheet {
    /// A worksheet holding one empty code segment, nothing active
    pub fn new(channel: EventChannel) -> Self {
        Self::from_segments(Vec::new(), channel)
    }

    /// Build from loaded segments. An empty list gets one empty code segment.
    pub fn from_segments(mut segments: Vec<Segment>, channel: EventChannel) -> Self {
        if segments.is_empty() {
            segments.push(Segment::new(SegmentKind::default(), ""));
        }
        for segment in &mut segments {
            segment.deactivate();
        }

        let worksheet = Self {
            segments,
            active_index: None,
            channel,
        };
        worksheet.check_invariants();
        worksheet
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false once constructed
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active_index
    }

    pub fn active_segment(&self) -> Option<&Segment> {
        self.active_index.and_then(|i| self.segments.get(i))
    }

    fn is_last(&self, index: usize) -> bool {
        index + 1 == self.segments.len()
    }

    // ** Identity lookup **

    /// Linear scan; worksheets are human-authored and small
    pub fn index_for_id(&self, id: SegmentId) -> Option<usize> {
        self.segments.iter().position(|s| s.id() == id)
    }

    pub fn segment_for_id(&self, id: SegmentId) -> Option<&Segment> {
        self.index_for_id(id).map(|i| &self.segments[i])
    }

    // ** Cursor **

    /// Make the segment at `index` active, cursor at its top or bottom
    pub fn activate(&mut self, index: usize, entry: CursorEntry) {
        debug_assert!(index < self.segments.len(), "activate({index}) out of range");
        if index >= self.segments.len() {
            return;
        }
        if let Some(current) = self.active_index.filter(|&i| i != index) {
            self.deactivate(current);
        }

        let segment = &mut self.segments[index];
        segment.activate(entry);
        let id = segment.id();
        self.active_index = Some(index);
        self.check_invariants();
        self.channel.publish(Event::SegmentFocused { id, entry });
    }

    /// Drop focus from the segment at `index`, which the caller knows is active
    pub fn deactivate(&mut self, index: usize) {
        if self.active_index != Some(index) {
            debug!(index, "deactivate ignored: segment is not active");
            return;
        }
        let segment = &mut self.segments[index];
        segment.deactivate();
        let id = segment.id();
        self.active_index = None;
        self.channel.publish(Event::SegmentBlurred { id });
    }

    fn deactivate_current(&mut self) {
        if let Some(index) = self.active_index {
            self.deactivate(index);
        }
    }

    /// Move the cursor one segment down. No-op on the last segment.
    pub fn navigate_forward(&mut self) -> bool {
        let Some(index) = self.active_index else {
            return false;
        };
        if self.is_last(index) {
            return false;
        }
        self.deactivate(index);
        self.activate(index + 1, CursorEntry::Top);
        true
    }

    /// Move the cursor one segment up. No-op on the first segment.
    pub fn navigate_back(&mut self) -> bool {
        let Some(index) = self.active_index else {
            return false;
        };
        if index == 0 {
            return false;
        }
        self.deactivate(index);
        self.activate(index - 1, CursorEntry::Bottom);
        true
    }

    /// The UI reports a click on a segment
    pub fn focus_segment(&mut self, id: SegmentId) -> bool {
        let Some(index) = self.index_for_id(id) else {
            debug!(%id, "click on unknown segment ignored");
            return false;
        };
        self.deactivate_current();
        self.activate(index, CursorEntry::Top);
        true
    }

    // ** Structure **

    /// Remove the segment at `index`; the cursor follows toward the start.
    ///
    /// Deleting the only segment is ignored.
    pub fn delete_at(&mut self, index: usize) -> Option<Segment> {
        if self.segments.len() <= 1 || index >= self.segments.len() {
            return None;
        }
        self.deactivate_current();

        let removed = self.segments.remove(index);
        self.channel.publish(Event::SegmentsChanged);

        if index == 0 {
            self.activate(0, CursorEntry::Top);
        } else {
            self.activate(index - 1, CursorEntry::Bottom);
        }
        Some(removed)
    }

    pub fn delete_active(&mut self) -> Option<Segment> {
        let index = self.active_index?;
        self.delete_at(index)
    }

    /// Insert a new segment after the active one and activate it
    pub fn insert_below_active(
        &mut self,
        kind: SegmentKind,
        content: impl Into<String>,
    ) -> Option<SegmentId> {
        let index = self.active_index?;
        let segment = Segment::new(kind, content);
        let id = segment.id();

        self.deactivate(index);
        self.segments.insert(index + 1, segment);
        self.channel.publish(Event::SegmentsChanged);
        self.activate(index + 1, CursorEntry::Top);
        Some(id)
    }

    /// Replace the active segment with one of `kind` holding the same content.
    ///
    /// The replacement has a new identity and no output, so any evaluation
    /// still in flight for the old segment becomes stale.
    pub fn convert_active_to(&mut self, kind: SegmentKind) -> Option<SegmentId> {
        let index = self.active_index?;
        let old = &self.segments[index];
        if old.kind() == kind {
            return None;
        }

        let replacement = old.converted_to(kind);
        let id = replacement.id();
        self.deactivate(index);
        self.segments[index] = replacement;
        self.channel.publish(Event::SegmentsChanged);
        self.activate(index, CursorEntry::Top);
        Some(id)
    }

    /// Replace a segment's content, as reported by its text editor
    pub fn set_content(&mut self, id: SegmentId, content: impl Into<String>) -> bool {
        let Some(index) = self.index_for_id(id) else {
            return false;
        };
        self.segments[index].set_content(content);
        self.channel.publish(Event::SegmentsChanged);
        true
    }

    // ** Persistence **

    pub fn serialize(&self) -> String {
        serializer::serialize(&self.segments)
    }

    pub fn snapshot(&self) -> WorksheetSnapshot {
        WorksheetSnapshot {
            active_index: self.active_index,
            segments: self
                .segments
                .iter()
                .map(|s| SegmentSnapshot {
                    id: s.id(),
                    kind: s.kind(),
                    content: s.content().to_string(),
                    output: s.output().cloned(),
                })
                .collect(),
        }
    }

    /// Structural invariants; violations are core defects
    fn check_invariants(&self) {
        debug_assert!(!self.segments.is_empty(), "worksheet is empty");
        if let Some(index) = self.active_index {
            debug_assert!(index < self.segments.len(), "active index {index} out of range");
        }
        debug_assert!(
            self.segments
                .iter()
                .enumerate()
                .all(|(i, s)| s.is_active() == (Some(i) == self.active_index)),
            "focus flags disagree with the active index"
        );
        debug_assert!(
            {
                let mut ids: Vec<_> = self.segments.iter().map(|s| s.id()).collect();
                ids.sort_unstable();
                ids.windows(2).all(|w| w[0] != w[1])
            },
            "duplicate segment identity"
        );
    }
}

impl SegmentLookup for Worksheet {
    fn segment_mut(&mut self, id: SegmentId) -> Option<&mut Segment> {
        let index = self.index_for_id(id)?;
        Some(&mut self.segments[index])
    }
}

/// Serializable view of a worksheet for UIs and tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetSnapshot {
    pub active_index: Option<usize>,
    pub segments: Vec<SegmentSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSnapshot {
    pub id: SegmentId,
    pub kind: SegmentKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;

    fn worksheet(contents: &[&str]) -> Worksheet {
        let segments = contents.iter().map(|c| Segment::code(*c)).collect();
        Worksheet::from_segments(segments, EventChannel::new())
    }

    fn contents(ws: &Worksheet) -> Vec<&str> {
        ws.segments().iter().map(|s| s.content()).collect()
    }

    #[test]
    fn test_new_worksheet_has_one_code_segment() {
        let ws = Worksheet::new(EventChannel::new());
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.segments()[0].kind(), SegmentKind::Code);
        assert_eq!(ws.active_index(), None);
    }

    #[test]
    fn test_index_for_id() {
        let ws = worksheet(&["a", "b", "c"]);
        let id = ws.segments()[2].id();
        assert_eq!(ws.index_for_id(id), Some(2));
        assert_eq!(ws.index_for_id(Segment::code("").id()), None);
    }

    #[test]
    fn test_activate_publishes_focus() {
        let mut ws = worksheet(&["a", "b"]);
        let log = EventLog::attach(ws.channel());
        ws.activate(1, CursorEntry::Bottom);

        assert_eq!(ws.active_index(), Some(1));
        assert_eq!(ws.segments()[1].focus(), Some(CursorEntry::Bottom));
        assert_eq!(
            log.events(),
            vec![Event::SegmentFocused {
                id: ws.segments()[1].id(),
                entry: CursorEntry::Bottom
            }]
        );
    }

    #[test]
    fn test_deactivate_with_nothing_active_is_noop() {
        let mut ws = worksheet(&["a", "b"]);
        ws.deactivate(0);
        assert_eq!(ws.active_index(), None);

        ws.activate(1, CursorEntry::Top);
        ws.deactivate(0);
        assert_eq!(ws.active_index(), Some(1));
    }

    #[test]
    fn test_delete_first_activates_new_first_from_top() {
        let mut ws = worksheet(&["a", "b", "c"]);
        ws.activate(0, CursorEntry::Top);
        ws.delete_active();

        assert_eq!(contents(&ws), vec!["b", "c"]);
        assert_eq!(ws.active_index(), Some(0));
        assert_eq!(ws.segments()[0].focus(), Some(CursorEntry::Top));
    }

    #[test]
    fn test_delete_later_activates_previous_from_bottom() {
        let mut ws = worksheet(&["a", "b", "c"]);
        ws.activate(2, CursorEntry::Top);
        ws.delete_active();

        assert_eq!(contents(&ws), vec!["a", "b"]);
        assert_eq!(ws.active_index(), Some(1));
        assert_eq!(ws.segments()[1].focus(), Some(CursorEntry::Bottom));
    }

    #[test]
    fn test_delete_only_segment_is_noop() {
        let mut ws = worksheet(&["only"]);
        ws.activate(0, CursorEntry::Top);
        let id = ws.segments()[0].id();

        assert!(ws.delete_active().is_none());
        assert_eq!(ws.len(), 1);
        assert_eq!(ws.segments()[0].id(), id);
        assert_eq!(ws.active_index(), Some(0));
    }

    #[test]
    fn test_delete_inactive_segment_moves_focus() {
        let mut ws = worksheet(&["a", "b", "c"]);
        ws.activate(2, CursorEntry::Top);
        ws.delete_at(1);

        assert_eq!(contents(&ws), vec!["a", "c"]);
        assert_eq!(ws.active_index(), Some(0));
        assert!(!ws.segments()[1].is_active());
    }

    #[test]
    fn test_delete_active_blurs_it_before_refocus() {
        let mut ws = worksheet(&["a", "b", "c"]);
        ws.activate(1, CursorEntry::Top);
        let deleted = ws.segments()[1].id();
        let previous = ws.segments()[0].id();
        let log = EventLog::attach(ws.channel());

        ws.delete_active();

        assert_eq!(
            log.events(),
            vec![
                Event::SegmentBlurred { id: deleted },
                Event::SegmentsChanged,
                Event::SegmentFocused {
                    id: previous,
                    entry: CursorEntry::Bottom
                },
            ]
        );
    }

    #[test]
    fn test_insert_below_requires_active() {
        let mut ws = worksheet(&["a"]);
        assert!(ws.insert_below_active(SegmentKind::Code, "").is_none());
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn test_insert_below_splices_after_active() {
        let mut ws = worksheet(&["a", "b"]);
        ws.activate(0, CursorEntry::Top);
        let id = ws.insert_below_active(SegmentKind::Free, "new").unwrap();

        assert_eq!(contents(&ws), vec!["a", "new", "b"]);
        assert_eq!(ws.active_index(), Some(1));
        assert_eq!(ws.active_segment().map(|s| s.id()), Some(id));
        assert!(!ws.segments()[0].is_active());
    }

    #[test]
    fn test_navigation_is_clamped() {
        let mut ws = worksheet(&["a", "b"]);
        ws.activate(0, CursorEntry::Top);

        assert!(!ws.navigate_back());
        assert_eq!(ws.active_index(), Some(0));

        assert!(ws.navigate_forward());
        assert_eq!(ws.active_index(), Some(1));
        assert_eq!(ws.segments()[1].focus(), Some(CursorEntry::Top));

        assert!(!ws.navigate_forward());
        assert_eq!(ws.active_index(), Some(1));

        assert!(ws.navigate_back());
        assert_eq!(ws.segments()[0].focus(), Some(CursorEntry::Bottom));
        assert!(!ws.segments()[1].is_active());
    }

    #[test]
    fn test_navigation_without_active_is_noop() {
        let mut ws = worksheet(&["a", "b"]);
        assert!(!ws.navigate_forward());
        assert!(!ws.navigate_back());
        assert_eq!(ws.active_index(), None);
    }

    #[test]
    fn test_focus_segment_moves_cursor() {
        let mut ws = worksheet(&["a", "b", "c"]);
        ws.activate(0, CursorEntry::Top);
        let id = ws.segments()[2].id();

        assert!(ws.focus_segment(id));
        assert_eq!(ws.active_index(), Some(2));
        assert!(!ws.segments()[0].is_active());

        assert!(!ws.focus_segment(Segment::code("").id()));
        assert_eq!(ws.active_index(), Some(2));
    }

    #[test]
    fn test_convert_keeps_content_and_position() {
        let mut ws = worksheet(&["a", "(+ 1 1)", "c"]);
        ws.activate(1, CursorEntry::Bottom);
        let old_id = ws.segments()[1].id();

        let new_id = ws.convert_active_to(SegmentKind::Free).unwrap();
        let seg = &ws.segments()[1];
        assert_ne!(new_id, old_id);
        assert_eq!(seg.id(), new_id);
        assert_eq!(seg.kind(), SegmentKind::Free);
        assert_eq!(seg.content(), "(+ 1 1)");
        assert_eq!(seg.focus(), Some(CursorEntry::Top));
        assert_eq!(ws.index_for_id(old_id), None);
    }

    #[test]
    fn test_convert_blurs_replaced_segment() {
        let mut ws = worksheet(&["(+ 1 1)"]);
        ws.activate(0, CursorEntry::Bottom);
        let old_id = ws.segments()[0].id();
        let log = EventLog::attach(ws.channel());

        let new_id = ws.convert_active_to(SegmentKind::Free).unwrap();

        assert_eq!(
            log.events(),
            vec![
                Event::SegmentBlurred { id: old_id },
                Event::SegmentsChanged,
                Event::SegmentFocused {
                    id: new_id,
                    entry: CursorEntry::Top
                },
            ]
        );
    }

    #[test]
    fn test_convert_to_same_kind_is_noop() {
        let mut ws = worksheet(&["a"]);
        ws.activate(0, CursorEntry::Bottom);
        let id = ws.segments()[0].id();

        assert!(ws.convert_active_to(SegmentKind::Code).is_none());
        assert_eq!(ws.segments()[0].id(), id);
        assert_eq!(ws.segments()[0].focus(), Some(CursorEntry::Bottom));
    }

    #[test]
    fn test_set_content() {
        let mut ws = worksheet(&["a"]);
        let id = ws.segments()[0].id();
        assert!(ws.set_content(id, "(inc 1)"));
        assert_eq!(ws.segments()[0].content(), "(inc 1)");
    }

    #[test]
    fn test_snapshot_json() {
        let mut ws = Worksheet::from_segments(
            vec![Segment::free("hi"), Segment::code("1")],
            EventChannel::new(),
        );
        ws.activate(1, CursorEntry::Top);

        let json = serde_json::to_value(ws.snapshot()).unwrap();
        assert_eq!(json["activeIndex"], 1);
        assert_eq!(json["segments"][0]["kind"], "free");
        assert!(json["segments"][0].get("output").is_none());
        assert_eq!(json["segments"][1]["output"]["isRunning"], false);
    }
}
