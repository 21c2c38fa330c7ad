//! Evaluation requests and out-of-order responses through a session

use std::sync::{Arc, Mutex};
use worksheet_editor::{
    Event, EventChannel, EventLog, Segment, SegmentId, Worksheet, WorksheetDocument,
    WorksheetSession,
};

/// Fake evaluator: remembers requests so the test can answer them later
#[derive(Clone, Default)]
struct PendingRequests(Arc<Mutex<Vec<(SegmentId, String)>>>);

impl PendingRequests {
    fn attach(channel: &EventChannel) -> Self {
        let pending = PendingRequests::default();
        let requests = pending.0.clone();
        channel.subscribe_to("evaluation-request", move |event| {
            if let Event::EvaluationRequest { code, segment_id } = event {
                requests.lock().unwrap().push((*segment_id, code.clone()));
            }
        });
        pending
    }

    fn take(&self) -> Vec<(SegmentId, String)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

fn session(segments: Vec<Segment>) -> (WorksheetSession, PendingRequests, EventLog) {
    let channel = EventChannel::new();
    let pending = PendingRequests::attach(&channel);
    let log = EventLog::attach(&channel);
    let ws = Worksheet::from_segments(segments, channel);
    let session = WorksheetSession::open(WorksheetDocument::from_worksheet("eval.clj", ws));
    (session, pending, log)
}

fn console(session: &WorksheetSession, id: SegmentId) -> String {
    session
        .worksheet()
        .segment_for_id(id)
        .and_then(|s| s.output())
        .map(|o| o.console_text.clone())
        .unwrap()
}

#[test]
fn test_run_all_then_answer_in_reverse() {
    let (mut session, pending, _log) = session(vec![
        Segment::code("(print \"one\")"),
        Segment::code("(print \"two\")"),
        Segment::code("(print \"three\")"),
    ]);

    for _ in 0..3 {
        session.handle(Event::RunActive);
    }
    let requests = pending.take();
    assert_eq!(requests.len(), 3);
    assert_eq!(session.correlator().outstanding(), 3);
    // Running the last segment appended a fresh one
    assert_eq!(session.worksheet().len(), 4);
    assert_eq!(session.worksheet().active_index(), Some(3));

    for (id, code) in requests.iter().rev() {
        let word = code.trim_start_matches("(print \"").trim_end_matches("\")");
        session.handle(Event::EvaluationConsole {
            segment_id: *id,
            out: word.to_string(),
        });
        session.handle(Event::EvaluationDone { segment_id: *id });
    }

    for (id, code) in &requests {
        assert!(code.contains(&console(&session, *id)));
        assert!(!session.worksheet().segment_for_id(*id).unwrap().is_running());
    }
    assert_eq!(session.correlator().outstanding(), 0);
}

#[test]
fn test_interleaved_streams_stay_separate() {
    let (mut session, pending, _log) = session(vec![Segment::code("a"), Segment::code("b")]);
    session.handle(Event::RunActive);
    session.handle(Event::RunActive);
    let ids: Vec<SegmentId> = pending.take().into_iter().map(|(id, _)| id).collect();

    for (i, chunk) in ["1", "2", "3", "4", "5", "6"].iter().enumerate() {
        session.handle(Event::EvaluationConsole {
            segment_id: ids[i % 2],
            out: chunk.to_string(),
        });
    }

    assert_eq!(console(&session, ids[0]), "135");
    assert_eq!(console(&session, ids[1]), "246");
}

#[test]
fn test_responses_for_deleted_segment_change_nothing() {
    let (mut session, pending, log) = session(vec![Segment::code("(Thread/sleep 1000)"), Segment::code("x")]);
    session.handle(Event::RunActive);
    let (id, _) = pending.take().remove(0);

    session.handle(Event::NavigateBack);
    session.handle(Event::DeleteActive);
    let before = session.worksheet().snapshot();
    log.clear();

    session.handle(Event::EvaluationConsole {
        segment_id: id,
        out: "late".to_string(),
    });
    session.handle(Event::EvaluationValue {
        segment_id: id,
        value: "nil".to_string(),
    });
    session.handle(Event::EvaluationError {
        segment_id: id,
        error: "interrupted".to_string(),
    });
    session.handle(Event::EvaluationDone { segment_id: id });

    assert_eq!(session.worksheet().snapshot(), before);
    assert!(log.named("output-changed").is_empty());
}

#[test]
fn test_run_publishes_output_change_before_request() {
    let (mut session, _pending, log) = session(vec![Segment::code("1"), Segment::code("2")]);
    log.clear();

    session.handle(Event::RunActive);

    let names: Vec<_> = log.events().iter().map(|e| e.name()).collect();
    assert_eq!(
        names,
        vec![
            "output-changed",
            "evaluation-request",
            "segment-blurred",
            "segment-focused"
        ]
    );
}

#[test]
fn test_evaluator_can_answer_synchronously() {
    // An evaluator that answers from inside its request handler still sees
    // its responses applied after the request is fully dispatched.
    let channel = EventChannel::new();
    let responses = Arc::new(Mutex::new(Vec::new()));
    let outbox = responses.clone();
    channel.subscribe_to("evaluation-request", move |event| {
        if let Event::EvaluationRequest { segment_id, .. } = event {
            let mut outbox = outbox.lock().unwrap();
            outbox.push(Event::EvaluationValue {
                segment_id: *segment_id,
                value: "2".to_string(),
            });
            outbox.push(Event::EvaluationDone {
                segment_id: *segment_id,
            });
        }
    });

    let ws = Worksheet::from_segments(vec![Segment::code("(+ 1 1)")], channel);
    let mut session = WorksheetSession::open(WorksheetDocument::from_worksheet("sync.clj", ws));
    let id = session.worksheet().segments()[0].id();

    session.handle(Event::RunActive);
    let answers = std::mem::take(&mut *responses.lock().unwrap());
    for answer in answers {
        session.handle(answer);
    }

    let output = session.worksheet().segment_for_id(id).and_then(|s| s.output()).unwrap();
    assert_eq!(output.value.as_deref(), Some("2"));
    assert!(!output.is_running);
}
