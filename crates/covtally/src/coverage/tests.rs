//! End-to-end and property tests for the coverage pipeline.
//!
//! Each test states one falsifiable claim about coverage behavior.

#![allow(clippy::float_cmp, clippy::unwrap_used, clippy::expect_used)]

use super::*;
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

fn three_probe_registry() -> (ProbeRegistry, ProbeId, ProbeId, ProbeId) {
    let mut reg = ProbeRegistry::new();
    let p1 = reg.register(SourceLocation::line("A", 5), UnitKind::Line).unwrap();
    let p2 = reg.register(SourceLocation::line("A", 9), UnitKind::Line).unwrap();
    let p3 = reg.register(SourceLocation::line("B", 2), UnitKind::Line).unwrap();
    (reg, p1, p2, p3)
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenario_tests {
    use super::*;

    /// Mixed hit counts across two files give 50% and 100%
    #[test]
    fn test_two_file_report() {
        let (reg, p1, p2, p3) = three_probe_registry();
        let counter = HitCounter::new(reg);
        for _ in 0..3 {
            counter.increment(p1).unwrap();
        }
        for _ in 0..500 {
            counter.increment(p3).unwrap();
        }

        let report = ReportBuilder::new().build(&counter.snapshot(), counter.registry());

        let a = report.file("A").unwrap();
        assert_eq!((a.summary.executed, a.summary.total), (1, 2));
        assert_eq!(a.summary.percent, 50.0);
        let b = report.file("B").unwrap();
        assert_eq!((b.summary.executed, b.summary.total), (1, 1));
        assert_eq!(b.summary.percent, 100.0);

        let u1 = report.unit(p1).unwrap();
        assert_eq!((u1.hits, u1.status), (3, CoverageStatus::Covered));
        let u2 = report.unit(p2).unwrap();
        assert_eq!((u2.hits, u2.status), (0, CoverageStatus::Uncovered));
        let u3 = report.unit(p3).unwrap();
        assert_eq!((u3.hits, u3.status), (500, CoverageStatus::Covered));
    }

    /// Two parallel runs hitting P1 once each merge to a count of 2
    #[test]
    fn test_parallel_sessions_merge() {
        let (reg, p1, _, _) = three_probe_registry();

        // Two independent test runners, each with its own counter store.
        let snapshots: Vec<CoverageSnapshot> = thread::scope(|s| {
            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let reg = reg.clone();
                    s.spawn(move || {
                        let tracker =
                            ExecutionTracker::new(Arc::new(HitCounter::new(reg)), SnapshotMode::Delta);
                        let session = tracker.begin_session("runner");
                        tracker.counter().increment(p1).unwrap();
                        tracker.end_session(&session).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let merged = ExecutionTracker::merge(&snapshots[0], &snapshots[1]);
        assert_eq!(merged.count(p1), 2);
    }

    /// A declared file without probes is vacuously fully covered
    #[test]
    fn test_empty_file_is_vacuously_covered() {
        let (mut reg, _, _, _) = three_probe_registry();
        reg.declare_file("C").unwrap();
        let report = ReportBuilder::new().build(&CoverageSnapshot::empty(), &reg);
        let c = report.file("C").unwrap();
        assert_eq!(c.summary.total, 0);
        assert_eq!(c.summary.percent, 100.0);
        assert!(report.units_in("C").next().is_none());
    }

    /// A skipped test is an uncovered probe, not an anomaly
    #[test]
    fn test_skipped_test_is_not_an_error() {
        let (reg, p1, p2, _) = three_probe_registry();
        let agent = crate::CoverageAgent::new(reg, crate::AgentConfig::builder().strict().build());
        let ran = agent.begin_session("test_called_once");
        agent.notify_hit(p1);
        let _ = agent.end_session(&ran).unwrap();
        // test_never_called is #[ignore]d: no session, no hits.

        let report = agent.report();
        assert_eq!(report.warnings, 0);
        assert_eq!(report.unit(p2).unwrap().status, CoverageStatus::Uncovered);
        assert!(agent.teardown().is_ok());
    }

    /// Records written by separate processes merge into one report
    #[test]
    fn test_records_from_two_processes() {
        let dir = tempfile::tempdir().unwrap();
        for hits in [3u64, 4] {
            let (reg, p1, _, _) = three_probe_registry();
            let agent = crate::CoverageAgent::new(
                reg,
                crate::AgentConfig::builder().records_dir(dir.path()).build(),
            );
            for _ in 0..hits {
                agent.notify_hit(p1);
            }
            let _ = agent.write_record().unwrap();
        }

        let records = RunRecord::load_dir(dir.path()).unwrap();
        let merged = MergedRun::from_records(&records).unwrap();
        let report = merged.report();
        let p1 = merged.registry.lookup(&SourceLocation::line("A", 5)).unwrap();
        assert_eq!(report.unit(p1).unwrap().hits, 7);
        assert_eq!(report.summary.executed, 1);
        assert_eq!(report.summary.total, 3);
    }
}

// ============================================================================
// Concurrency
// ============================================================================

mod concurrency_tests {
    use super::*;

    /// Snapshots taken while writers run never exceed the final count and
    /// never go backwards
    #[test]
    fn test_snapshots_are_monotonic_under_contention() {
        let (reg, p1, _, _) = three_probe_registry();
        let counter = HitCounter::new(reg);
        let observed = thread::scope(|s| {
            for _ in 0..4 {
                let counter = &counter;
                s.spawn(move || {
                    for _ in 0..2_000 {
                        counter.increment(p1).unwrap();
                    }
                });
            }
            let counter = &counter;
            s.spawn(move || {
                (0..50)
                    .map(|_| counter.snapshot().count(p1))
                    .collect::<Vec<_>>()
            })
            .join()
            .unwrap()
        });

        assert!(observed.windows(2).all(|w| w[0] <= w[1]));
        assert!(observed.iter().all(|&c| c <= 8_000));
        assert_eq!(counter.get(p1), 8_000);
    }

    /// Buffered and direct increments from many threads add up exactly
    #[test]
    fn test_local_buffers_lose_nothing() {
        let (reg, p1, p2, p3) = three_probe_registry();
        let counter = HitCounter::new(reg);
        thread::scope(|s| {
            for t in 0..6u64 {
                let counter = &counter;
                s.spawn(move || {
                    let mut local = LocalHits::with_flush_threshold(counter, 7);
                    for i in 0..999u64 {
                        let id = [p1, p2, p3][((t + i) % 3) as usize];
                        local.record(id).unwrap();
                    }
                });
            }
        });
        assert_eq!(counter.snapshot().total_hits(), 6 * 999);
    }
}

// ============================================================================
// Properties
// ============================================================================

fn arb_snapshot() -> impl Strategy<Value = CoverageSnapshot> {
    prop::collection::vec((0u32..16, 0u64..1_000), 0..12)
        .prop_map(|entries| entries.into_iter().map(|(id, c)| (ProbeId::new(id), c)).collect())
}

proptest! {
    #[test]
    fn prop_merge_is_commutative(a in arb_snapshot(), b in arb_snapshot()) {
        prop_assert_eq!(CoverageSnapshot::merge(&a, &b), CoverageSnapshot::merge(&b, &a));
    }

    #[test]
    fn prop_merge_is_associative(a in arb_snapshot(), b in arb_snapshot(), c in arb_snapshot()) {
        let left = CoverageSnapshot::merge(&CoverageSnapshot::merge(&a, &b), &c);
        let right = CoverageSnapshot::merge(&a, &CoverageSnapshot::merge(&b, &c));
        prop_assert_eq!(left, right);
    }

    #[test]
    fn prop_merge_never_overwrites(a in arb_snapshot(), b in arb_snapshot()) {
        let m = CoverageSnapshot::merge(&a, &b);
        for id in (0..16).map(ProbeId::new) {
            prop_assert_eq!(m.count(id), a.count(id) + b.count(id));
        }
    }

    /// Final counts equal the number of increments issued, however they are
    /// split across threads
    #[test]
    fn prop_counts_match_increments(
        ops in prop::collection::vec(0u32..3, 0..400),
        threads in 1usize..5,
    ) {
        let (reg, _, _, _) = three_probe_registry();
        let counter = HitCounter::new(reg);
        let chunk = ops.len().div_ceil(threads).max(1);
        thread::scope(|s| {
            for part in ops.chunks(chunk) {
                let counter = &counter;
                s.spawn(move || {
                    for &id in part {
                        counter.increment(ProbeId::new(id)).unwrap();
                    }
                });
            }
        });
        let snap = counter.snapshot();
        for id in 0..3u32 {
            let expected = ops.iter().filter(|&&o| o == id).count() as u64;
            prop_assert_eq!(snap.count(ProbeId::new(id)), expected);
        }
    }

    /// Coverage status never reverts as hits accumulate
    #[test]
    fn prop_status_never_reverts(ops in prop::collection::vec(0u32..3, 0..60)) {
        let (reg, _, _, _) = three_probe_registry();
        let counter = HitCounter::new(reg);
        let mut covered = [false; 3];
        for id in ops {
            counter.increment(ProbeId::new(id)).unwrap();
            let report = ReportBuilder::new().build(&counter.snapshot(), counter.registry());
            for probe in 0..3u32 {
                let now = report.unit(ProbeId::new(probe)).unwrap().is_covered();
                prop_assert!(now || !covered[probe as usize]);
                covered[probe as usize] = now;
            }
        }
    }

    /// Report order depends only on the registry, not on hit arrival order
    #[test]
    fn prop_report_order_is_deterministic(
        units in prop::collection::vec((0u8..3, 1u32..50, prop::option::of(0u32..3)), 1..30),
        hits in prop::collection::vec(0usize..30, 0..60),
    ) {
        let mut reg = ProbeRegistry::new();
        for (file, line, branch) in &units {
            let file = format!("f{file}.rs");
            let (location, kind) = match branch {
                Some(b) => (SourceLocation::branch(file, *line, *b), UnitKind::Branch),
                None => (SourceLocation::line(file, *line), UnitKind::Line),
            };
            let _ = reg.register(location, kind).unwrap();
        }
        let ids: Vec<ProbeId> = reg.all().iter().map(|p| p.id).collect();

        let forward = HitCounter::new(reg.clone());
        let backward = HitCounter::new(reg.clone());
        for &h in &hits {
            forward.increment(ids[h % ids.len()]).unwrap();
        }
        for &h in hits.iter().rev() {
            backward.increment(ids[h % ids.len()]).unwrap();
        }

        let r1 = ReportBuilder::new().build(&forward.snapshot(), &reg);
        let r2 = ReportBuilder::new().build(&backward.snapshot(), &reg);
        prop_assert_eq!(&r1.units, &r2.units);
        prop_assert_eq!(&r1.files, &r2.files);
        prop_assert!(r1
            .units
            .windows(2)
            .all(|w| (&w[0].file, w[0].line, w[0].branch) < (&w[1].file, w[1].line, w[1].branch)));
        prop_assert_eq!(r1.units.len(), reg.len());
    }
}
