//! Temporal tracking.
//!
//! [`TemporalTracker`] runs once per advertised time step and folds each
//! incoming snapshot into an accumulating collection. After the last step
//! it emits either one time-series table per tracked element or one
//! statistics table per block, hands the result to its [`Consolidation`]
//! strategy and becomes idle again.
//!
//! Element identity is decided once per run by the [`KeyStrategy`] chosen
//! from the first snapshot: global ids when available and enabled, then
//! the configured id array, then element position.

mod key;

pub use key::{ElementKey, KeyStrategy, TrackingKey, is_global_id_name, statistics_name};

use crate::config::TrackerConfig;
use crate::distributed::{Consolidation, LocalConsolidation};
use crate::error::{OvertimeError, Result};
use crate::pipeline::{Algorithm, ExecutionRequest, TimeInformation, UpdateRequest};
use crate::statistics::{DescriptiveStatistics, StatisticsEngine};
use overtime_types::collection::{BlockCollection, BlockTable};
use overtime_types::column::Value;
use overtime_types::dataset::{AttributeSet, Snapshot};
use overtime_types::table::{COUNT_COLUMN, TIME_COLUMN, Table, VALID_MASK_COLUMN};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// Error recorded on the tracker's execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerError {
    #[default]
    NoError,
    /// An input snapshot was stamped with more than one time value, e.g. by
    /// [`Snapshot::set_time_values`] with several entries. A source driven one
    /// step per pass never produces this.
    MoreThanOneIndices,
}

/// Progress of the current multi-pass run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionState {
    /// Index of the next time step to fold in.
    pub current_time_index: usize,
    pub is_executing: bool,
    pub error: TrackerError,
}

#[derive(Debug, Default)]
struct Accumulation {
    strategy: Option<KeyStrategy>,
    elements: BTreeMap<ElementKey, Table>,
    statistics: BTreeMap<Option<usize>, Table>,
}

pub struct TemporalTracker {
    config: TrackerConfig,
    engine: Box<dyn StatisticsEngine>,
    consolidation: Box<dyn Consolidation>,
    time_steps: Vec<f64>,
    state: ExecutionState,
    run: Accumulation,
}

impl TemporalTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            engine: Box::new(DescriptiveStatistics),
            consolidation: Box::new(LocalConsolidation),
            time_steps: Vec::new(),
            state: ExecutionState::default(),
            run: Accumulation::default(),
        }
    }

    pub fn with_statistics_engine(mut self, engine: impl StatisticsEngine + 'static) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_consolidation(mut self, consolidation: impl Consolidation + 'static) -> Self {
        self.consolidation = Box::new(consolidation);
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Replace the configuration. Ignored while a run is in progress.
    pub fn set_config(&mut self, config: TrackerConfig) {
        if self.state.is_executing {
            log::warn!("Ignoring configuration change during an extraction run");
            return;
        }
        self.config = config;
    }

    pub fn execution_state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn is_executing(&self) -> bool {
        self.state.is_executing
    }

    /// Time steps advertised by the last information pass.
    pub fn time_steps(&self) -> &[f64] {
        &self.time_steps
    }

    /// Key strategy of the current run, once chosen.
    pub fn key_strategy(&self) -> Option<&KeyStrategy> {
        self.run.strategy.as_ref()
    }

    fn begin_run(&mut self) {
        log::info!(
            "Starting temporal extraction over {} time step(s)",
            self.time_steps.len()
        );
        self.state = ExecutionState {
            current_time_index: 0,
            is_executing: true,
            error: TrackerError::NoError,
        };
        self.run = Accumulation::default();
    }

    fn discard_run(&mut self) {
        self.run = Accumulation::default();
        self.state.is_executing = false;
        self.state.current_time_index = 0;
    }

    fn fold_elements(&mut self, input: &Snapshot, time: f64) {
        let association = self.config.field_association;
        let Accumulation {
            strategy: Some(strategy),
            elements,
            ..
        } = &mut self.run
        else {
            return;
        };

        let mut seen = FxHashSet::default();
        for (block_index, block) in input.blocks() {
            let attributes = block.attributes(association);
            let Some(keys) = strategy.keys(attributes) else {
                log::warn!(
                    "Block {:?} lacks the tracking array at time {}, skipping it",
                    block_index,
                    time
                );
                continue;
            };
            let scope = if strategy.is_block_scoped() {
                block_index
            } else {
                None
            };

            for (element, key) in keys.into_iter().enumerate() {
                let element_key = ElementKey { block: scope, key };
                if !seen.insert(element_key.clone()) {
                    log::debug!(
                        "Element {} appears twice at time {}, keeping the first",
                        strategy.table_name(&element_key),
                        time
                    );
                    continue;
                }
                elements
                    .entry(element_key)
                    .or_default()
                    .append_row(element_row(attributes, element, time));
            }
        }
    }

    fn fold_statistics(&mut self, input: &Snapshot, time: f64) {
        let step = self.state.current_time_index;
        let association = self.config.field_association;

        for (block_index, block) in input.blocks() {
            let attributes = block.attributes(association);
            let table = match self.run.statistics.entry(block_index) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let mut table = Table::new();
                    for earlier in self.time_steps.iter().take(step) {
                        table.append_row(empty_statistics_row(*earlier));
                    }
                    entry.insert(table)
                }
            };
            if table.num_rows() > step {
                log::debug!("Block {:?} appears twice at time {}", block_index, time);
                continue;
            }
            table.append_row(statistics_row(
                attributes,
                time,
                self.engine.as_ref(),
                &self.config,
            ));
        }

        for table in self.run.statistics.values_mut() {
            if table.num_rows() <= step {
                table.append_row(empty_statistics_row(time));
            }
        }
    }

    fn finish(&mut self) -> Result<BlockCollection> {
        let run = std::mem::take(&mut self.run);
        self.state.is_executing = false;
        self.state.current_time_index = 0;

        let mut collection = BlockCollection::new();
        if self.config.report_statistics_only {
            for (block, table) in run.statistics {
                collection.push(statistics_name(block), Some(BlockTable::Statistics(table)));
            }
        } else if let Some(strategy) = &run.strategy {
            for (key, mut table) in run.elements {
                for name in &self.config.drop_arrays {
                    table.remove_column(name);
                }
                collection.push(strategy.table_name(&key), Some(BlockTable::TimeSeries(table)));
            }
        }

        log::info!(
            "Extracted {} table(s) over {} time step(s)",
            collection.len(),
            self.time_steps.len()
        );
        self.consolidation.consolidate(collection)
    }
}

impl Default for TemporalTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Algorithm for TemporalTracker {
    type Output = Option<BlockCollection>;

    /// Remember the upstream steps; the output has no time domain.
    fn request_information(&mut self, upstream: &TimeInformation) -> Result<TimeInformation> {
        self.time_steps = upstream.time_steps.clone();
        Ok(TimeInformation::none())
    }

    fn request_update_extent(&mut self, request: &mut UpdateRequest) -> Result<()> {
        let index = if self.state.is_executing {
            self.state.current_time_index
        } else {
            0
        };
        if let Some(time) = self.time_steps.get(index) {
            request.time = Some(*time);
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        input: &Snapshot,
        execution: &mut ExecutionRequest,
    ) -> Result<Option<BlockCollection>> {
        if !self.state.is_executing {
            self.begin_run();
        }

        if input.time_values().len() > 1 {
            log::error!(
                "Input carries {} time values, expected at most one",
                input.time_values().len()
            );
            self.discard_run();
            self.state.error = TrackerError::MoreThanOneIndices;
            execution.clear_continue();
            return Err(OvertimeError::MoreThanOneIndices);
        }

        if self.time_steps.is_empty() {
            log::debug!("No time steps advertised upstream");
            execution.clear_continue();
            return self.finish().map(Some);
        }

        let step = self.state.current_time_index;
        let time = input
            .time()
            .or_else(|| self.time_steps.get(step).copied())
            .unwrap_or_default();

        if self.config.report_statistics_only {
            self.fold_statistics(input, time);
        } else {
            if self.run.strategy.is_none() {
                let strategy = KeyStrategy::choose(input, &self.config);
                log::debug!("Tracking elements by {:?}", strategy);
                self.run.strategy = Some(strategy);
            }
            self.fold_elements(input, time);
        }

        self.state.current_time_index += 1;
        if self.state.current_time_index < self.time_steps.len() {
            execution.request_continue();
            Ok(None)
        } else {
            execution.clear_continue();
            self.finish().map(Some)
        }
    }

    fn abort(&mut self) {
        if self.state.is_executing {
            log::info!(
                "Abandoning extraction at time step {}",
                self.state.current_time_index
            );
            self.discard_run();
        }
    }
}

type Row<'a> = SmallVec<[(&'a str, Value); 8]>;

/// One history row: time, validity, then every attribute of the element.
fn element_row(attributes: &AttributeSet, element: usize, time: f64) -> Row<'_> {
    let mut row = Row::new();
    row.push((TIME_COLUMN, Value::Float(time)));
    row.push((VALID_MASK_COLUMN, Value::Int(1)));
    for (name, value) in attributes.element(element) {
        match name {
            TIME_COLUMN => {}
            VALID_MASK_COLUMN => {
                let valid = value.as_f64().is_some_and(|mask| mask != 0.0);
                row.push((name, Value::Int(i64::from(valid))));
            }
            _ => row.push((name, value)),
        }
    }
    row
}

fn empty_statistics_row(time: f64) -> [(&'static str, Value); 3] {
    [
        (TIME_COLUMN, Value::Float(time)),
        (VALID_MASK_COLUMN, Value::Int(0)),
        (COUNT_COLUMN, Value::Int(0)),
    ]
}

fn statistics_row(
    attributes: &AttributeSet,
    time: f64,
    engine: &dyn StatisticsEngine,
    config: &TrackerConfig,
) -> Vec<(String, Value)> {
    let count = attributes.len();
    let mut row: Vec<(String, Value)> = empty_statistics_row(time)
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    row[1].1 = Value::Int(i64::from(count > 0));
    row[2].1 = Value::Int(count as i64);

    for column in attributes.columns() {
        let name = column.name();
        let helper = name == VALID_MASK_COLUMN
            || attributes.global_ids_name() == Some(name)
            || config.id_array.as_deref() == Some(name)
            || config.drop_arrays.iter().any(|d| d == name);
        if helper || !column.is_numeric() {
            continue;
        }
        for (statistic, value) in engine.summarize(column) {
            row.push((format!("{}({})", statistic, name), Value::Float(value)));
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use overtime_types::column::Column;
    use overtime_types::dataset::{Association, Block};

    fn points(ids: &[i64], temperature: &[f64]) -> AttributeSet {
        AttributeSet::new(ids.len())
            .with_column(Column::int("GlobalNodeId", ids.to_vec()))
            .with_column(Column::float("temperature", temperature.to_vec()))
            .with_global_ids("GlobalNodeId")
    }

    fn block(ids: &[i64], temperature: &[f64]) -> Block {
        Block::new().with_attributes(Association::Point, points(ids, temperature))
    }

    fn run(
        tracker: &mut TemporalTracker,
        steps: &[(f64, Snapshot)],
    ) -> Result<BlockCollection> {
        let times = steps.iter().map(|(t, _)| *t).collect();
        tracker.request_information(&TimeInformation::new(times))?;
        for (time, snapshot) in steps {
            let mut request = UpdateRequest::default();
            tracker.request_update_extent(&mut request)?;
            assert_eq!(request.time, Some(*time));

            let mut execution = ExecutionRequest::default();
            let input = snapshot.clone().with_time(*time);
            if let Some(output) = tracker.request_data(&input, &mut execution)? {
                assert!(!execution.continue_executing());
                return Ok(output);
            }
            assert!(execution.continue_executing());
        }
        panic!("tracker never finished");
    }

    fn series<'a>(collection: &'a BlockCollection, name: &str) -> &'a Table {
        collection.get(name).unwrap().table()
    }

    #[test]
    fn test_tracks_by_global_ids() {
        let steps = vec![
            (0.0, Snapshot::single(block(&[7, 8], &[1.0, 2.0]))),
            (1.0, Snapshot::single(block(&[8, 7], &[3.0, 4.0]))),
            (2.0, Snapshot::single(block(&[7], &[5.0]))),
        ];
        let mut tracker = TemporalTracker::default();
        let output = run(&mut tracker, &steps).unwrap();

        assert_eq!(output.names().collect::<Vec<_>>(), vec!["gid=7", "gid=8"]);
        let seven = series(&output, "gid=7");
        assert_eq!(seven.num_rows(), 3);
        assert_eq!(
            seven.column("temperature").unwrap().to_f64_vec().unwrap(),
            vec![1.0, 4.0, 5.0]
        );
        assert_eq!(
            seven.column(TIME_COLUMN).unwrap().to_f64_vec().unwrap(),
            vec![0.0, 1.0, 2.0]
        );

        // Absent at the last step: no row, not a masked row.
        let eight = series(&output, "gid=8");
        assert_eq!(eight.num_rows(), 2);
        assert_eq!(eight.value(1, "temperature"), Some(Value::Float(3.0)));
        assert_eq!(eight.value(0, VALID_MASK_COLUMN), Some(Value::Int(1)));

        assert!(!tracker.is_executing());
        assert_eq!(tracker.execution_state().current_time_index, 0);
    }

    #[test]
    fn test_positional_keys_carry_block_suffix() {
        let composite = |a: f64| {
            Snapshot::composite(vec![
                (1, block(&[1], &[a])),
                (2, block(&[1, 2], &[a, a])),
            ])
        };
        let steps = vec![(0.0, composite(1.0)), (1.0, composite(2.0))];
        let mut tracker = TemporalTracker::new(TrackerConfig::default().with_global_ids(false));
        let output = run(&mut tracker, &steps).unwrap();

        assert_eq!(
            output.names().collect::<Vec<_>>(),
            vec!["id=0 block=1", "id=0 block=2", "id=1 block=2"]
        );
        assert_eq!(tracker.key_strategy(), None);
        assert!(output.iter().all(|(_, t)| t.unwrap().table().num_rows() == 2));
    }

    #[test]
    fn test_strategy_fixed_by_first_snapshot() {
        let without_gids = Snapshot::single(Block::new().with_attributes(
            Association::Point,
            AttributeSet::new(1).with_column(Column::float("temperature", vec![1.0])),
        ));
        let steps = vec![
            (0.0, without_gids),
            (1.0, Snapshot::single(block(&[42], &[2.0]))),
        ];
        let mut tracker = TemporalTracker::default();
        let output = run(&mut tracker, &steps).unwrap();

        // Positional for the whole run, even once global ids show up.
        assert_eq!(output.names().collect::<Vec<_>>(), vec!["id=0"]);
        assert_eq!(series(&output, "id=0").num_rows(), 2);
    }

    #[test]
    fn test_duplicate_keys_keep_first() {
        let steps = vec![(0.0, Snapshot::single(block(&[5, 5], &[1.0, 9.0])))];
        let output = run(&mut TemporalTracker::default(), &steps).unwrap();
        let five = series(&output, "gid=5");
        assert_eq!(five.num_rows(), 1);
        assert_eq!(five.value(0, "temperature"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_input_mask_is_preserved() {
        let attributes = points(&[1, 2], &[1.0, 2.0])
            .with_column(Column::float(VALID_MASK_COLUMN, vec![0.0, 1.0]));
        let steps = vec![(
            0.0,
            Snapshot::single(Block::new().with_attributes(Association::Point, attributes)),
        )];
        let output = run(&mut TemporalTracker::default(), &steps).unwrap();
        assert_eq!(series(&output, "gid=1").value(0, VALID_MASK_COLUMN), Some(Value::Int(0)));
        assert_eq!(series(&output, "gid=2").value(0, VALID_MASK_COLUMN), Some(Value::Int(1)));
    }

    #[test]
    fn test_drop_arrays_removed_from_output() {
        let config = TrackerConfig::default().with_dropped_array("GlobalNodeId");
        let steps = vec![(0.0, Snapshot::single(block(&[3], &[1.0])))];
        let output = run(&mut TemporalTracker::new(config), &steps).unwrap();
        let table = series(&output, "gid=3");
        assert!(!table.contains_column("GlobalNodeId"));
        assert!(table.contains_column("temperature"));
    }

    #[test]
    fn test_statistics_mode() {
        let composite = |second: Option<Block>| {
            let mut blocks = vec![(0, block(&[1, 2, 3, 4], &[4.0, 1.0, 3.0, 2.0]))];
            blocks.extend(second.map(|b| (1, b)));
            Snapshot::composite(blocks)
        };
        let steps = vec![
            (0.0, composite(None)),
            (1.0, composite(Some(block(&[9], &[10.0])))),
            (2.0, composite(Some(block(&[], &[])))),
        ];
        let config = TrackerConfig::default().with_statistics_only(true);
        let output = run(&mut TemporalTracker::new(config), &steps).unwrap();

        assert_eq!(
            output.names().collect::<Vec<_>>(),
            vec!["stats block=0", "stats block=1"]
        );
        let first = series(&output, "stats block=0");
        assert_eq!(first.num_rows(), 3);
        assert_eq!(first.value(0, "avg(temperature)"), Some(Value::Float(2.5)));
        assert_eq!(first.value(0, "med(temperature)"), Some(Value::Float(2.5)));
        assert_eq!(first.value(0, COUNT_COLUMN), Some(Value::Int(4)));
        assert!(!first.contains_column("avg(GlobalNodeId)"));
        assert!(output.get("stats block=0").unwrap().is_statistics());

        // Back-filled before it appeared, empty once it has no elements.
        let second = series(&output, "stats block=1");
        assert_eq!(second.num_rows(), 3);
        assert_eq!(second.value(0, VALID_MASK_COLUMN), Some(Value::Int(0)));
        assert_eq!(second.value(1, "max(temperature)"), Some(Value::Float(10.0)));
        assert_eq!(second.value(2, COUNT_COLUMN), Some(Value::Int(0)));
        assert_eq!(second.value(2, VALID_MASK_COLUMN), Some(Value::Int(0)));
        assert!(second
            .value(2, "avg(temperature)")
            .unwrap()
            .as_f64()
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_more_than_one_time_value() {
        let mut tracker = TemporalTracker::default();
        tracker
            .request_information(&TimeInformation::new(vec![0.0, 1.0]))
            .unwrap();

        let mut input = Snapshot::single(block(&[1], &[1.0]));
        input.set_time_values(vec![0.0, 1.0]);
        let mut execution = ExecutionRequest::default();
        let result = tracker.request_data(&input, &mut execution);

        assert!(matches!(result, Err(OvertimeError::MoreThanOneIndices)));
        assert_eq!(tracker.execution_state().error, TrackerError::MoreThanOneIndices);
        assert!(!tracker.is_executing());
        assert!(!execution.continue_executing());
    }

    #[test]
    fn test_empty_time_domain() {
        let mut tracker = TemporalTracker::default();
        tracker.request_information(&TimeInformation::none()).unwrap();
        let mut request = UpdateRequest::default();
        tracker.request_update_extent(&mut request).unwrap();
        assert_eq!(request.time, None);

        let mut execution = ExecutionRequest::default();
        let output = tracker
            .request_data(&Snapshot::single(block(&[1], &[1.0])), &mut execution)
            .unwrap();
        assert_eq!(output, Some(BlockCollection::new()));
        assert!(!execution.continue_executing());
    }

    #[test]
    fn test_abort_discards_partial_run() {
        let mut tracker = TemporalTracker::default();
        tracker
            .request_information(&TimeInformation::new(vec![0.0, 1.0, 2.0]))
            .unwrap();
        let mut execution = ExecutionRequest::default();
        tracker
            .request_data(
                &Snapshot::single(block(&[1], &[1.0])).with_time(0.0),
                &mut execution,
            )
            .unwrap();
        assert!(tracker.is_executing());
        assert_eq!(tracker.execution_state().current_time_index, 1);

        tracker.abort();
        assert!(!tracker.is_executing());
        assert_eq!(tracker.key_strategy(), None);

        let mut request = UpdateRequest::default();
        tracker.request_update_extent(&mut request).unwrap();
        assert_eq!(request.time, Some(0.0));
    }

    #[test]
    fn test_set_config_ignored_while_executing() {
        let mut tracker = TemporalTracker::default();
        tracker
            .request_information(&TimeInformation::new(vec![0.0, 1.0]))
            .unwrap();
        let mut execution = ExecutionRequest::default();
        tracker
            .request_data(&Snapshot::single(block(&[1], &[1.0])), &mut execution)
            .unwrap();

        tracker.set_config(TrackerConfig::default().with_statistics_only(true));
        assert!(!tracker.config().report_statistics_only);
    }
}
