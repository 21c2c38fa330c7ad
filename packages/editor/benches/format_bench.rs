use criterion::{black_box, criterion_group, criterion_main, Criterion};
use worksheet_editor::serializer::{parse, serialize};
use worksheet_editor::{Event, EventChannel, Segment, Worksheet, WorksheetDocument, WorksheetSession};

fn large_worksheet() -> Vec<Segment> {
    (0..500)
        .map(|i| {
            if i % 3 == 0 {
                Segment::free(format!("## Section {i}\n\nSome notes about step {i}."))
            } else {
                Segment::code(format!("(defn step-{i} [x]\n  (+ x {i}))"))
            }
        })
        .collect()
}

fn serialize_large_worksheet(c: &mut Criterion) {
    let segments = large_worksheet();

    c.bench_function("serialize_500_segments", |b| {
        b.iter(|| serialize(black_box(&segments)))
    });
}

fn parse_large_worksheet(c: &mut Criterion) {
    let source = serialize(&large_worksheet());

    c.bench_function("parse_500_segments", |b| {
        b.iter(|| parse(black_box(&source)))
    });
}

fn route_console_chunks(c: &mut Criterion) {
    c.bench_function("route_console_to_last_of_500", |b| {
        b.iter_with_setup(
            || {
                let ws = Worksheet::from_segments(large_worksheet(), EventChannel::new());
                let mut session =
                    WorksheetSession::open(WorksheetDocument::from_worksheet("bench.clj", ws));
                let id = session.worksheet().segments()[499].id();
                session.request_evaluation(id).unwrap();
                (session, id)
            },
            |(mut session, id)| {
                for _ in 0..100 {
                    session.handle(Event::EvaluationConsole {
                        segment_id: id,
                        out: "tick\n".to_string(),
                    });
                }
            },
        )
    });
}

criterion_group!(
    benches,
    serialize_large_worksheet,
    parse_large_worksheet,
    route_console_chunks
);
criterion_main!(benches);
