use super::{Consolidation, Controller, ROOT};
use crate::error::Result;
use crate::tracker::is_global_id_name;
use bytes::Bytes;
use overtime_types::collection::{BlockCollection, BlockTable};
use overtime_types::column::Value;
use overtime_types::table::{TIME_COLUMN, Table, VALID_MASK_COLUMN};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

type Contributors = SmallVec<[(usize, BlockTable); 2]>;

/// Gathers every rank's collection on the root and merges it there.
///
/// The root ends up with the merged collection. Every other rank ends up
/// with a placeholder collection carrying the same names in the same order.
/// A group of one is left untouched.
pub struct DistributedConsolidator<C> {
    controller: C,
}

impl<C: Controller> DistributedConsolidator<C> {
    pub fn new(controller: C) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }
}

impl<C: Controller> Consolidation for DistributedConsolidator<C> {
    fn consolidate(&mut self, local: BlockCollection) -> Result<BlockCollection> {
        if self.controller.size() <= 1 {
            return Ok(local);
        }

        let payload = Bytes::from(bincode::serialize(&local)?);
        match self.controller.gather(payload, ROOT)? {
            Some(payloads) => {
                let collections = payloads
                    .iter()
                    .map(|payload| bincode::deserialize::<BlockCollection>(payload))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                let merged = merge_collections(collections);

                let names: Vec<&str> = merged.names().collect();
                let encoded = Bytes::from(bincode::serialize(&names)?);
                self.controller.broadcast(Some(encoded), ROOT)?;

                log::info!(
                    "Consolidated results of {} ranks into {} table(s)",
                    self.controller.size(),
                    merged.len()
                );
                Ok(merged)
            }
            None => {
                let encoded = self.controller.broadcast(None, ROOT)?;
                let names: Vec<String> = bincode::deserialize(&encoded)?;
                log::debug!(
                    "Rank {} holds {} placeholder(s)",
                    self.controller.rank(),
                    names.len()
                );
                Ok(BlockCollection::placeholders(names))
            }
        }
    }
}

/// Merge per-rank collections, given in rank order.
///
/// Names are visited in first-seen order (rank-major, then collection order)
/// and placeholders are ignored. Tables of one global id are merged into the
/// first contributor's table; any other name reported by several ranks, or
/// by a single one, becomes one entry per contributor suffixed with
/// ` rank=<r>`.
pub fn merge_collections(collections: Vec<BlockCollection>) -> BlockCollection {
    let mut order: Vec<String> = Vec::new();
    let mut contributors: FxHashMap<String, Contributors> = FxHashMap::default();

    for (rank, collection) in collections.into_iter().enumerate() {
        for (name, table) in collection.into_entries() {
            let Some(table) = table else {
                continue;
            };
            contributors
                .entry(name)
                .or_insert_with_key(|name| {
                    order.push(name.clone());
                    SmallVec::new()
                })
                .push((rank, table));
        }
    }

    let mut merged = BlockCollection::new();
    for name in order {
        let Some(tables) = contributors.remove(&name) else {
            continue;
        };
        if is_global_id_name(&name) {
            let table = merge_global_id_tables(&name, tables);
            merged.push(name, table);
        } else {
            for (rank, table) in tables {
                merged.push(format!("{} rank={}", name, rank), Some(table));
            }
        }
    }
    merged
}

type MergedRow = (f64, Vec<(String, Value)>);

/// Union the histories of one global id, matching rows by time step.
///
/// A step only one rank reports is taken as is. Where several ranks report
/// the same step, the valid rows of later ranks overlay the earlier row.
/// Rows come out in time order.
fn merge_global_id_tables(name: &str, tables: Contributors) -> Option<BlockTable> {
    if tables.is_empty() {
        return None;
    }
    let contributions = tables.len();
    let mut rows: Vec<MergedRow> = Vec::new();
    let mut by_time: FxHashMap<u64, usize> = FxHashMap::default();

    for (_, table) in tables {
        let source = table.table();
        for row in 0..source.num_rows() {
            let time = row_time(source, row);
            match by_time.get(&time.to_bits()).copied() {
                Some(index) => {
                    if is_valid_row(source, row) {
                        overlay(&mut rows[index].1, source.row(row));
                    }
                }
                None => {
                    by_time.insert(time.to_bits(), rows.len());
                    let values = source
                        .row(row)
                        .into_iter()
                        .map(|(column, value)| (column.to_string(), value))
                        .collect();
                    rows.push((time, values));
                }
            }
        }
    }

    rows.sort_by(|a, b| a.0.total_cmp(&b.0));
    log::debug!(
        "Merged {} contribution(s) to '{}' over {} time step(s)",
        contributions,
        name,
        rows.len()
    );

    let mut merged = Table::new();
    for (_, values) in rows {
        merged.append_row(values);
    }
    Some(BlockTable::TimeSeries(merged))
}

/// Time of `row`, or its position when the table carries no time column.
fn row_time(table: &Table, row: usize) -> f64 {
    table
        .value(row, TIME_COLUMN)
        .and_then(|time| time.as_f64())
        .unwrap_or(row as f64)
}

fn overlay(target: &mut Vec<(String, Value)>, source: Vec<(&str, Value)>) {
    for (column, value) in source {
        match target.iter_mut().find(|(name, _)| name.as_str() == column) {
            Some(entry) => entry.1 = value,
            None => target.push((column.to_string(), value)),
        }
    }
}

fn is_valid_row(table: &Table, row: usize) -> bool {
    match table.value(row, VALID_MASK_COLUMN) {
        Some(mask) => mask.as_f64().is_some_and(|m| m != 0.0),
        None => true,
    }
}
