//! # Worksheet Session
//!
//! Ties a document and the evaluation correlator to the event stream.
//!
//! The session is the single place inbound events are interpreted: UI
//! commands become worksheet operations, evaluator responses go to the
//! correlator, and "run" composes the two. Everything runs to completion on
//! the caller's thread; hosts that use several threads must funnel events
//! through one queue (see the `worksheet-host` crate).

use crate::correlator::{EvaluationCorrelator, EvaluationError};
use crate::document::WorksheetDocument;
use crate::events::{Event, EventChannel};
use crate::segment::{CursorEntry, SegmentId, SegmentKind};
use crate::timeout::TimeoutPolicy;
use crate::worksheet::Worksheet;
use std::time::Instant;
use tracing::{debug, trace};

pub struct WorksheetSession {
    document: WorksheetDocument,
    correlator: EvaluationCorrelator,
    channel: EventChannel,
}

impl WorksheetSession {
    /// Open a session on `document`, activating its first segment.
    ///
    /// The correlator publishes on the same channel as the worksheet.
    pub fn open(document: WorksheetDocument) -> Self {
        let channel = document.worksheet().channel().clone();
        let correlator = EvaluationCorrelator::new(channel.clone());
        let mut session = Self {
            document,
            correlator,
            channel,
        };
        session.worksheet_mut().activate(0, CursorEntry::Top);
        session
    }

    pub fn with_timeout_policy(mut self, policy: impl TimeoutPolicy + 'static) -> Self {
        self.correlator.set_timeout_policy(policy);
        self
    }

    pub fn channel(&self) -> &EventChannel {
        &self.channel
    }

    pub fn document(&self) -> &WorksheetDocument {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut WorksheetDocument {
        &mut self.document
    }

    pub fn worksheet(&self) -> &Worksheet {
        self.document.worksheet()
    }

    fn worksheet_mut(&mut self) -> &mut Worksheet {
        self.document.worksheet_mut()
    }

    pub fn correlator(&self) -> &EvaluationCorrelator {
        &self.correlator
    }

    /// Interpret one inbound event
    pub fn handle(&mut self, event: Event) {
        trace!(event = event.name(), "handling event");
        match event {
            Event::NavigateForward => {
                self.worksheet_mut().navigate_forward();
            }
            Event::NavigateBack => {
                self.worksheet_mut().navigate_back();
            }
            Event::DeleteActive => {
                if self.worksheet_mut().delete_active().is_some() {
                    self.document.mark_changed();
                }
            }
            Event::InsertBelow => self.insert_below(),
            Event::SegmentClicked { id } => {
                self.worksheet_mut().focus_segment(id);
            }
            Event::ChangeTypeFree => self.convert_active(SegmentKind::Free),
            Event::ChangeTypeCode => self.convert_active(SegmentKind::Code),
            Event::RunActive => self.run_active(),
            Event::ContentEdited { id, content } => {
                if self.worksheet_mut().set_content(id, content) {
                    self.document.mark_changed();
                }
            }
            response @ (Event::EvaluationValue { .. }
            | Event::EvaluationConsole { .. }
            | Event::EvaluationError { .. }
            | Event::OutputError { .. }
            | Event::EvaluationDone { .. }) => {
                self.correlator.route(self.document.worksheet_mut(), response);
            }
            outbound => debug!(event = outbound.name(), "ignoring outbound event"),
        }
    }

    fn insert_below(&mut self) {
        if self
            .worksheet_mut()
            .insert_below_active(SegmentKind::default(), "")
            .is_some()
        {
            self.document.mark_changed();
        }
    }

    fn convert_active(&mut self, kind: SegmentKind) {
        if self.worksheet_mut().convert_active_to(kind).is_some() {
            self.document.mark_changed();
        }
    }

    /// Evaluate the active segment if it is code, then move on.
    ///
    /// On the last segment a new default segment is appended so there is
    /// always somewhere to go. A segment that is still running is not
    /// dispatched again, but the cursor advances regardless.
    pub fn run_active(&mut self) {
        let Some(index) = self.worksheet().active_index() else {
            return;
        };
        let segment = &self.worksheet().segments()[index];
        if segment.is_executable() {
            let id = segment.id();
            if let Err(err) = self.request_evaluation(id) {
                debug!(%id, %err, "evaluation not dispatched");
            }
        }

        if index + 1 < self.worksheet().len() {
            self.worksheet_mut().navigate_forward();
        } else {
            self.insert_below();
        }
    }

    pub fn request_evaluation(&mut self, id: SegmentId) -> Result<(), EvaluationError> {
        self.correlator
            .request_evaluation(self.document.worksheet_mut(), id)
    }

    /// Apply the timeout policy; returns the segments that were given up on
    pub fn expire_overdue(&mut self, now: Instant) -> Vec<SegmentId> {
        self.correlator
            .expire_overdue(self.document.worksheet_mut(), now)
    }
}
