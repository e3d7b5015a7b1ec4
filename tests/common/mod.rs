#![allow(dead_code)]

use overtime::prelude::*;

pub const BLOCKS: usize = 3;
pub const POINTS_PER_BLOCK: usize = 4;
pub const FIRST_GLOBAL_ID: i64 = 784;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn time_of(step: usize) -> f64 {
    step as f64 * 0.5
}

pub fn temperature(global_id: i64, step: usize) -> f64 {
    300.0 + global_id as f64 + step as f64
}

/// Block `block` at `step`: four points with global ids, a temperature and a pressure.
pub fn block_at(block: usize, step: usize) -> Block {
    let ids: Vec<i64> = (0..POINTS_PER_BLOCK)
        .map(|i| FIRST_GLOBAL_ID + (block * POINTS_PER_BLOCK + i) as i64)
        .collect();
    let temperatures = ids.iter().map(|id| temperature(*id, step)).collect();
    let pressures = (0..POINTS_PER_BLOCK)
        .map(|i| step as f64 * (i + 1) as f64)
        .collect();

    Block::new().with_attributes(
        Association::Point,
        AttributeSet::new(ids.len())
            .with_column(Column::int("GlobalNodeId", ids))
            .with_column(Column::float("temperature", temperatures))
            .with_column(Column::float("pressure", pressures))
            .with_global_ids("GlobalNodeId"),
    )
}

pub fn snapshot_at(step: usize) -> Snapshot {
    Snapshot::composite((0..BLOCKS).map(|b| (b, block_at(b, step))).collect())
}

/// A composite dataset with `steps` time steps.
pub fn synthetic_source(steps: usize) -> MemorySource {
    (0..steps).map(|s| (time_of(s), snapshot_at(s))).collect()
}

pub fn column_f64(table: &Table, name: &str) -> Vec<f64> {
    table.column(name).unwrap().to_f64_vec().unwrap()
}
