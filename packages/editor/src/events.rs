//! # Event Channel
//!
//! Named events decouple the worksheet from its UI and from the evaluation
//! backend. The channel is an explicit handle passed to whoever publishes
//! or listens; there is no global bus.
//!
//! ## Delivery
//!
//! `publish` is synchronous and re-entrant. An event published while another
//! is being delivered (for example from inside a handler) is queued and
//! delivered after the current one, so handlers always observe events in
//! publication order.

use crate::segment::{CursorEntry, SegmentId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Every event the worksheet consumes or produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    // UI commands (inbound)
    NavigateForward,
    NavigateBack,
    DeleteActive,
    InsertBelow,
    SegmentClicked {
        id: SegmentId,
    },
    ChangeTypeFree,
    ChangeTypeCode,
    RunActive,
    ContentEdited {
        id: SegmentId,
        content: String,
    },

    // Evaluator traffic
    EvaluationRequest {
        code: String,
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
    },
    EvaluationValue {
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
        value: String,
    },
    EvaluationConsole {
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
        out: String,
    },
    EvaluationError {
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
        error: String,
    },
    /// Raised by the renderer when a value cannot be displayed
    OutputError {
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
        error: String,
    },
    EvaluationDone {
        #[serde(rename = "segmentID")]
        segment_id: SegmentId,
    },

    // Change notifications (outbound, for the UI)
    SegmentsChanged,
    SegmentFocused {
        id: SegmentId,
        entry: CursorEntry,
    },
    SegmentBlurred {
        id: SegmentId,
    },
    OutputChanged {
        id: SegmentId,
    },
}

impl Event {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            Event::NavigateForward => "navigate-forward",
            Event::NavigateBack => "navigate-back",
            Event::DeleteActive => "delete-active",
            Event::InsertBelow => "insert-below",
            Event::SegmentClicked { .. } => "segment-clicked",
            Event::ChangeTypeFree => "change-type-free",
            Event::ChangeTypeCode => "change-type-code",
            Event::RunActive => "run-active",
            Event::ContentEdited { .. } => "content-edited",
            Event::EvaluationRequest { .. } => "evaluation-request",
            Event::EvaluationValue { .. } => "evaluation-value",
            Event::EvaluationConsole { .. } => "evaluation-console",
            Event::EvaluationError { .. } => "evaluation-error",
            Event::OutputError { .. } => "output-error",
            Event::EvaluationDone { .. } => "evaluation-done",
            Event::SegmentsChanged => "segments-changed",
            Event::SegmentFocused { .. } => "segment-focused",
            Event::SegmentBlurred { .. } => "segment-blurred",
            Event::OutputChanged { .. } => "output-changed",
        }
    }

    /// Responses coming back from the evaluator, keyed by segment identity
    pub fn evaluator_response_target(&self) -> Option<SegmentId> {
        match self {
            Event::EvaluationValue { segment_id, .. }
            | Event::EvaluationConsole { segment_id, .. }
            | Event::EvaluationError { segment_id, .. }
            | Event::OutputError { segment_id, .. }
            | Event::EvaluationDone { segment_id } => Some(*segment_id),
            _ => None,
        }
    }

    /// Events the worksheet produces rather than consumes
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            Event::EvaluationRequest { .. }
                | Event::SegmentsChanged
                | Event::SegmentFocused { .. }
                | Event::SegmentBlurred { .. }
                | Event::OutputChanged { .. }
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

type Handler = Arc<Mutex<dyn FnMut(&Event) + Send>>;

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

struct Subscriber {
    id: u64,
    filter: Option<&'static str>,
    handler: Handler,
}

impl Subscriber {
    fn accepts(&self, event: &Event) -> bool {
        self.filter.map_or(true, |name| name == event.name())
    }
}

#[derive(Default)]
struct ChannelState {
    next_id: u64,
    subscribers: Vec<Subscriber>,
    queue: VecDeque<Event>,
    dispatching: bool,
}

/// Cloneable publish/subscribe handle
#[derive(Clone, Default)]
pub struct EventChannel {
    state: Arc<Mutex<ChannelState>>,
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("EventChannel")
            .field("subscribers", &state.subscribers.len())
            .field("queued", &state.queue.len())
            .finish()
    }
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen to every event
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.add_subscriber(None, handler)
    }

    /// Listen to events with the given wire name only
    pub fn subscribe_to<F>(&self, name: &'static str, handler: F) -> Subscription
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.add_subscriber(Some(name), handler)
    }

    fn add_subscriber<F>(&self, filter: Option<&'static str>, handler: F) -> Subscription
    where
        F: FnMut(&Event) + Send + 'static,
    {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.subscribers.push(Subscriber {
            id,
            filter,
            handler: Arc::new(Mutex::new(handler)),
        });
        Subscription(id)
    }

    /// Returns false if the subscription was already gone
    pub fn unsubscribe(&self, subscription: Subscription) -> bool {
        let mut state = self.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|s| s.id != subscription.0);
        state.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Deliver an event to every matching subscriber
    pub fn publish(&self, event: Event) {
        {
            let mut state = self.lock();
            state.queue.push_back(event);
            if state.dispatching {
                return;
            }
            state.dispatching = true;
        }

        let _guard = DispatchGuard { channel: self };
        loop {
            let (event, handlers) = {
                let mut state = self.lock();
                let Some(event) = state.queue.pop_front() else {
                    state.dispatching = false;
                    return;
                };
                let handlers: Vec<Handler> = state
                    .subscribers
                    .iter()
                    .filter(|s| s.accepts(&event))
                    .map(|s| s.handler.clone())
                    .collect();
                (event, handlers)
            };

            for handler in handlers {
                let mut handler = handler.lock().unwrap_or_else(PoisonError::into_inner);
                (*handler)(&event);
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the dispatching flag if a handler panics
struct DispatchGuard<'a> {
    channel: &'a EventChannel,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            let mut state = self.channel.lock();
            state.dispatching = false;
            state.queue.clear();
        }
    }
}

/// Subscriber that records everything it sees. Handy for hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl EventLog {
    /// Record every event published on `channel`
    pub fn attach(channel: &EventChannel) -> Self {
        let log = EventLog::default();
        let events = log.events.clone();
        channel.subscribe(move |event| {
            events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        });
        log
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Recorded events with the given wire name
    pub fn named(&self, name: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.name() == name)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
