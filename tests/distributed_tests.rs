mod common;

use common::*;
use overtime::prelude::*;
use overtime::{Controller, GroupController};
use std::thread;

const STEPS: usize = 4;

/// Rank `rank`'s share of a probe-like dataset.
///
/// Every rank sees global id 786 at every step, but only the rank whose turn
/// it is holds a valid value. Each rank also owns one element nobody else has.
fn rank_source(rank: usize) -> MemorySource {
    (0..STEPS)
        .map(|step| {
            let valid = step % 2 == rank;
            let own_id = 1000 * (rank as i64 + 1);
            let points = AttributeSet::new(2)
                .with_column(Column::int("GlobalNodeId", vec![786, own_id]))
                .with_column(Column::float(
                    "pressure",
                    vec![if valid { step as f64 * 10.0 } else { f64::NAN }, 1.0],
                ))
                .with_column(Column::int("ValidPointMask", vec![i64::from(valid), 1]))
                .with_global_ids("GlobalNodeId");
            let block = Block::new().with_attributes(Association::Point, points);
            (time_of(step), Snapshot::single(block))
        })
        .collect()
}

/// Rank `rank`'s share when global id 786 moves between ranks.
///
/// The element sits on rank 0 for `handover` steps and on rank 1 after that,
/// with pressure `100 + step`. Each rank keeps its own element throughout.
fn moving_source(rank: usize, handover: usize) -> MemorySource {
    (0..STEPS)
        .map(|step| {
            let own_id = 1000 * (rank as i64 + 1);
            let holds = (step < handover) == (rank == 0);
            let (ids, pressures) = if holds {
                (vec![786, own_id], vec![100.0 + step as f64, 1.0])
            } else {
                (vec![own_id], vec![1.0])
            };
            let points = AttributeSet::new(ids.len())
                .with_column(Column::int("GlobalNodeId", ids))
                .with_column(Column::float("pressure", pressures))
                .with_global_ids("GlobalNodeId");
            let block = Block::new().with_attributes(Association::Point, points);
            (time_of(step), Snapshot::single(block))
        })
        .collect()
}

fn run_with<F>(size: usize, statistics: bool, source: F) -> Vec<BlockCollection>
where
    F: Fn(usize) -> MemorySource + Send + Copy + 'static,
{
    let handles: Vec<_> = GroupController::group(size)
        .into_iter()
        .map(|controller| {
            thread::spawn(move || {
                let rank = controller.rank();
                let mut tracker = ExtractorBuilder::new()
                    .report_statistics_only(statistics)
                    .distributed(controller)
                    .tracker()
                    .unwrap();
                Executive::new()
                    .run(&mut source(rank), &mut tracker)
                    .unwrap()
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn run_on_ranks(size: usize, statistics: bool) -> Vec<BlockCollection> {
    run_with(size, statistics, rank_source)
}

#[test]
fn test_root_merges_global_id_tables() {
    init_logging();

    let results = run_on_ranks(2, false);
    let (root, other) = (&results[0], &results[1]);

    let names = vec!["gid=786", "gid=1000", "gid=2000"];
    assert_eq!(root.names().collect::<Vec<_>>(), names);
    assert_eq!(other.names().collect::<Vec<_>>(), names);

    let merged = root.get("gid=786").unwrap().table();
    assert_eq!(merged.num_rows(), STEPS);
    assert_eq!(column_f64(merged, "pressure"), vec![0.0, 10.0, 20.0, 30.0]);
    assert_eq!(column_f64(merged, "ValidPointMask"), vec![1.0; STEPS]);
    assert_eq!(
        column_f64(merged, "Time"),
        (0..STEPS).map(time_of).collect::<Vec<_>>()
    );

    assert!(names.iter().all(|name| other.is_placeholder(name)));
    assert!(names.iter().all(|name| !root.is_placeholder(name)));
}

#[test]
fn test_statistics_stay_per_rank() {
    let results = run_on_ranks(2, true);
    let names = vec!["stats rank=0", "stats rank=1"];

    assert_eq!(results[0].names().collect::<Vec<_>>(), names);
    assert_eq!(results[1].names().collect::<Vec<_>>(), names);
    for name in &names {
        let table = results[0].get(name).unwrap().table();
        assert_eq!(table.num_rows(), STEPS);
        assert!(results[1].is_placeholder(name));
    }
}

#[test]
fn test_single_rank_group_keeps_local_result() {
    let results = run_on_ranks(1, false);
    let names: Vec<_> = results[0].names().collect();
    assert_eq!(names, vec!["gid=786", "gid=1000"]);
    assert!(!results[0].is_placeholder("gid=786"));
}

#[test]
fn test_three_ranks() {
    let results = run_on_ranks(3, false);
    assert_eq!(
        results[0].names().collect::<Vec<_>>(),
        vec!["gid=786", "gid=1000", "gid=2000", "gid=3000"]
    );
    // Rank 2 never holds a valid value for 786 (step % 2 is never 2).
    let merged = results[0].get("gid=786").unwrap().table();
    assert_eq!(column_f64(merged, "pressure"), vec![0.0, 10.0, 20.0, 30.0]);
    assert!(results[2].is_placeholder("gid=3000"));
}

#[test]
fn test_element_moving_between_ranks() {
    init_logging();

    // Rank 0 holds 786 at steps 0 and 1, rank 1 at steps 2 and 3.
    let results = run_with(2, false, |rank| moving_source(rank, 2));
    assert_eq!(
        results[0].names().collect::<Vec<_>>(),
        vec!["gid=786", "gid=1000", "gid=2000"]
    );

    let merged = results[0].get("gid=786").unwrap().table();
    assert_eq!(merged.num_rows(), STEPS);
    assert_eq!(
        column_f64(merged, "Time"),
        (0..STEPS).map(time_of).collect::<Vec<_>>()
    );
    assert_eq!(
        column_f64(merged, "pressure"),
        vec![100.0, 101.0, 102.0, 103.0]
    );
    assert!(results[1].is_placeholder("gid=786"));
}

#[test]
fn test_contributors_with_different_row_counts() {
    // Rank 0 holds 786 for three steps, rank 1 only for the last one.
    let results = run_with(2, false, |rank| moving_source(rank, 3));

    let merged = results[0].get("gid=786").unwrap().table();
    assert_eq!(merged.num_rows(), STEPS);
    assert_eq!(
        column_f64(merged, "pressure"),
        vec![100.0, 101.0, 102.0, 103.0]
    );
    assert_eq!(column_f64(merged, "ValidPointMask"), vec![1.0; STEPS]);
}
