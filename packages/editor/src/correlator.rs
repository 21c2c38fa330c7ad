//! # Evaluation Correlator
//!
//! Routes evaluator responses back to the segment that asked for them.
//!
//! Evaluation is fire-and-forget: `request_evaluation` marks the segment
//! running and publishes an `evaluation-request`; responses arrive later,
//! possibly in several pieces, tagged only with the segment identity. By
//! then the segment may have been deleted or converted, in which case the
//! response is dropped. Nothing here reorders or buffers: every response is
//! applied to the current state in arrival order.
//!
//! The running indicator is governed by `evaluation-done` alone. Errors do
//! not stop it.

use crate::events::{Event, EventChannel};
use crate::segment::{OutputState, SegmentId};
use crate::timeout::{NoTimeout, TimeoutPolicy};
use crate::worksheet::SegmentLookup;
use std::collections::HashMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const TIMEOUT_MESSAGE: &str = "evaluation timed out";

/// Why an evaluation request was refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("segment {0} not found")]
    SegmentNotFound(SegmentId),

    #[error("segment {0} is not executable")]
    NotExecutable(SegmentId),

    #[error("segment {0} is already running")]
    AlreadyRunning(SegmentId),
}

#[derive(Debug)]
pub struct EvaluationCorrelator {
    channel: EventChannel,

    /// Dispatch time of every evaluation not yet done
    outstanding: HashMap<SegmentId, Instant>,

    timeout: Box<dyn TimeoutPolicy>,
}

impl EvaluationCorrelator {
    pub fn new(channel: EventChannel) -> Self {
        Self::with_timeout_policy(channel, NoTimeout)
    }

    pub fn with_timeout_policy(channel: EventChannel, policy: impl TimeoutPolicy + 'static) -> Self {
        Self {
            channel,
            outstanding: HashMap::new(),
            timeout: Box::new(policy),
        }
    }

    pub fn set_timeout_policy(&mut self, policy: impl TimeoutPolicy + 'static) {
        self.timeout = Box::new(policy);
    }

    /// Number of evaluations dispatched and not yet done
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    pub fn is_outstanding(&self, id: SegmentId) -> bool {
        self.outstanding.contains_key(&id)
    }

    /// Clear the segment's output, mark it running and dispatch its content
    pub fn request_evaluation(
        &mut self,
        lookup: &mut impl SegmentLookup,
        id: SegmentId,
    ) -> Result<(), EvaluationError> {
        let segment = lookup
            .segment_mut(id)
            .ok_or(EvaluationError::SegmentNotFound(id))?;
        if segment.is_running() {
            return Err(EvaluationError::AlreadyRunning(id));
        }
        let code = segment.content().to_string();
        let output = segment
            .output_mut()
            .ok_or(EvaluationError::NotExecutable(id))?;

        output.clear();
        output.is_running = true;
        self.outstanding.insert(id, Instant::now());

        info!(%id, bytes = code.len(), "dispatching evaluation");
        self.channel.publish(Event::OutputChanged { id });
        self.channel.publish(Event::EvaluationRequest {
            code,
            segment_id: id,
        });
        Ok(())
    }

    pub fn on_value(&mut self, lookup: &mut impl SegmentLookup, id: SegmentId, value: String) -> bool {
        self.update(lookup, id, "value", |output| output.value = Some(value))
    }

    /// Append a console chunk verbatim
    pub fn on_console_chunk(
        &mut self,
        lookup: &mut impl SegmentLookup,
        id: SegmentId,
        text: &str,
    ) -> bool {
        self.update(lookup, id, "console", |output| output.console_text.push_str(text))
    }

    pub fn on_error(&mut self, lookup: &mut impl SegmentLookup, id: SegmentId, error: String) -> bool {
        self.update(lookup, id, "error", |output| output.error_text = Some(error))
    }

    pub fn on_done(&mut self, lookup: &mut impl SegmentLookup, id: SegmentId) -> bool {
        self.outstanding.remove(&id);
        self.update(lookup, id, "done", |output| output.is_running = false)
    }

    /// Apply any evaluator response event; other events are ignored
    pub fn route(&mut self, lookup: &mut impl SegmentLookup, event: Event) -> bool {
        match event {
            Event::EvaluationValue { segment_id, value } => self.on_value(lookup, segment_id, value),
            Event::EvaluationConsole { segment_id, out } => {
                self.on_console_chunk(lookup, segment_id, &out)
            }
            Event::EvaluationError { segment_id, error }
            | Event::OutputError { segment_id, error } => self.on_error(lookup, segment_id, error),
            Event::EvaluationDone { segment_id } => self.on_done(lookup, segment_id),
            _ => false,
        }
    }

    /// Give up on evaluations the timeout policy considers overdue.
    ///
    /// Overdue segments get an error and stop running. Returns the expired
    /// identities; entries whose segment no longer exists are dropped quietly.
    pub fn expire_overdue(&mut self, lookup: &mut impl SegmentLookup, now: Instant) -> Vec<SegmentId> {
        let before = self.outstanding.len();
        self.outstanding
            .retain(|id, _| lookup.segment_mut(*id).is_some_and(|s| s.is_running()));
        if self.outstanding.len() != before {
            debug!(
                pruned = before - self.outstanding.len(),
                "dropped evaluations whose segment is gone"
            );
        }

        let overdue: Vec<SegmentId> = self
            .outstanding
            .iter()
            .filter(|(_, dispatched)| self.timeout.is_expired(now.saturating_duration_since(**dispatched)))
            .map(|(id, _)| *id)
            .collect();

        let mut expired = Vec::new();
        for id in overdue {
            self.outstanding.remove(&id);
            let Some(output) = lookup.segment_mut(id).and_then(|s| s.output_mut()) else {
                continue;
            };
            if !output.is_running {
                continue;
            }
            warn!(%id, "evaluation timed out");
            output.error_text = Some(TIMEOUT_MESSAGE.to_string());
            output.is_running = false;
            self.channel.publish(Event::OutputChanged { id });
            expired.push(id);
        }
        expired.sort_unstable();
        expired
    }

    fn update(
        &mut self,
        lookup: &mut impl SegmentLookup,
        id: SegmentId,
        kind: &'static str,
        apply: impl FnOnce(&mut OutputState),
    ) -> bool {
        let Some(output) = lookup.segment_mut(id).and_then(|s| s.output_mut()) else {
            debug!(%id, kind, "discarding stale evaluation response");
            self.outstanding.remove(&id);
            return false;
        };
        apply(output);
        self.channel.publish(Event::OutputChanged { id });
        true
    }
}
