mod common;

use std::time::Duration;

use chaos_proxy_lib::{ChaosEngine, Fragmenter};
use common::build_client_hello;
use uuid::Uuid;

fn fresh_engine() -> ChaosEngine {
    ChaosEngine::new(Uuid::new_v4().as_bytes())
}

#[test]
fn plan_partitions_the_hello_exactly() {
    let hello = build_client_hello("www.example.com", 517);
    let fragmenter = Fragmenter::new(true);

    for _ in 0..50 {
        let mut engine = fresh_engine();
        let plan = fragmenter.plan(&mut engine, &hello);

        assert!(!plan.is_empty());
        assert_eq!(plan.last().unwrap().end, hello.len());

        let mut prev = 0usize;
        let mut rebuilt = Vec::new();
        for fragment in &plan {
            assert!(fragment.end > prev, "offsets strictly increasing");
            rebuilt.extend_from_slice(&hello[prev..fragment.end]);
            prev = fragment.end;
        }
        assert_eq!(rebuilt, hello);
    }
}

#[test]
fn cuts_respect_safe_margins_and_spacing() {
    let hello = build_client_hello("www.example.com", 517);
    let fragmenter = Fragmenter::new(true);

    for _ in 0..50 {
        let mut engine = fresh_engine();
        let plan = fragmenter.plan(&mut engine, &hello);
        // every cut except the terminal one
        let cuts: Vec<usize> = plan[..plan.len() - 1].iter().map(|f| f.end).collect();

        let mut last = 10usize;
        for cut in cuts {
            assert!(cut >= 10, "cut {cut} before safe start");
            assert!(cut <= hello.len() - 10, "cut {cut} after safe end");
            assert!(cut - last >= 5, "cuts too close: {last} -> {cut}");
            last = cut;
        }
    }
}

#[test]
fn aggressive_plan_yields_three_to_seven_writes() {
    let hello = build_client_hello("www.example.com", 517);
    let fragmenter = Fragmenter::new(true);

    for _ in 0..50 {
        let mut engine = fresh_engine();
        let plan = fragmenter.plan(&mut engine, &hello);
        // at 517 bytes the segments are wide enough that cleanup never
        // drops a cut, so the write count is exactly the fragment count
        assert!(plan.len() >= 3, "got {} writes", plan.len());
        assert!(plan.len() <= 7, "got {} writes", plan.len());
    }
}

#[test]
fn plan_delays_stay_in_jitter_bands() {
    let hello = build_client_hello("www.example.com", 517);
    let fragmenter = Fragmenter::new(true);

    for _ in 0..50 {
        let mut engine = fresh_engine();
        let plan = fragmenter.plan(&mut engine, &hello);

        let (cuts, terminal) = plan.split_at(plan.len() - 1);
        for fragment in cuts {
            assert!(fragment.delay >= Duration::from_secs_f64(0.0005));
            assert!(fragment.delay <= Duration::from_secs_f64(0.0030));
        }
        assert!(terminal[0].delay >= Duration::from_secs_f64(0.0003));
        assert!(terminal[0].delay <= Duration::from_secs_f64(0.0018));
    }
}

#[test]
fn short_buffers_are_sent_whole() {
    let fragmenter = Fragmenter::new(true);

    // under 20 bytes there is no safe cut range at all
    let tiny = build_client_hello("a.b", 0); // unpadded, but still > 20
    let mut engine = fresh_engine();
    let plan = fragmenter.plan(&mut engine, &tiny[..12.min(tiny.len())]);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].delay, Duration::ZERO);
}

#[test]
fn non_client_hello_is_sent_whole() {
    let fragmenter = Fragmenter::new(true);
    let mut engine = fresh_engine();

    let data = vec![0x42u8; 200];
    let plan = fragmenter.plan(&mut engine, &data);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].end, data.len());
    assert_eq!(plan[0].delay, Duration::ZERO);
}

#[test]
fn truncated_hello_is_sent_whole() {
    let fragmenter = Fragmenter::new(true);
    let mut engine = fresh_engine();

    let truncated = [0x16, 0x03, 0x01, 0x00, 0x05, 0x01];
    let plan = fragmenter.plan(&mut engine, &truncated);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].end, truncated.len());
}

#[test]
fn single_fragment_request_yields_no_cuts() {
    let mut engine = fresh_engine();
    assert!(engine.fragment_positions(517, 1).is_empty());
    assert!(engine.fragment_positions(517, 0).is_empty());
}

#[test]
fn fragment_count_stays_in_bounds() {
    let mut engine = fresh_engine();
    for _ in 0..200 {
        let n = engine.fragment_count(3, 7);
        assert!((3..=7).contains(&n));
        let n = engine.fragment_count(2, 4);
        assert!((2..=4).contains(&n));
    }
}

#[test]
fn record_randomization_partitions_any_payload() {
    let fragmenter = Fragmenter::new(true);
    let mut engine = fresh_engine();

    let data: Vec<u8> = (0..10_000).map(|i| (i % 251) as u8).collect();
    let plan = fragmenter.randomize_record_size(&mut engine, &data);

    assert!(plan.len() > 1);
    let mut prev = 0usize;
    let mut rebuilt = Vec::new();
    for fragment in &plan {
        assert!(fragment.end > prev);
        rebuilt.extend_from_slice(&data[prev..fragment.end]);
        prev = fragment.end;
    }
    assert_eq!(rebuilt, data);

    // below the 32-byte floor nothing is chunked
    let small = vec![0u8; 16];
    let plan = fragmenter.randomize_record_size(&mut engine, &small);
    assert_eq!(plan.len(), 1);
}
