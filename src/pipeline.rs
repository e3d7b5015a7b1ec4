//! Demand-driven request protocol between pipeline stages.
//!
//! A run is driven by the [`Executive`]: it asks the stage for its time
//! information once, then repeatedly asks which time step it needs, pulls
//! that snapshot from the upstream [`Source`] and hands it to the stage, for
//! as long as the stage requests continuation.

use crate::error::{OvertimeError, Result};
use overtime_types::collection::BlockCollection;
use overtime_types::dataset::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Time domain advertised by a stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeInformation {
    pub time_steps: Vec<f64>,
    pub time_range: Option<(f64, f64)>,
}

impl TimeInformation {
    /// Advertise `time_steps`, with the range spanning their minimum to maximum.
    pub fn new(time_steps: Vec<f64>) -> Self {
        let time_range = time_steps.iter().fold(None, |range, &t| match range {
            None => Some((t, t)),
            Some((low, high)) => Some((f64::min(low, t), f64::max(high, t))),
        });
        Self {
            time_steps,
            time_range,
        }
    }

    /// No time domain at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_time_steps(&self) -> bool {
        !self.time_steps.is_empty()
    }
}

/// What a downstream stage needs from upstream for the next pass.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UpdateRequest {
    pub time: Option<f64>,
}

impl UpdateRequest {
    pub fn at(time: f64) -> Self {
        Self { time: Some(time) }
    }
}

/// Per-pass execution flags set by a stage while producing data.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionRequest {
    continue_executing: bool,
}

impl ExecutionRequest {
    /// Ask the driver to run another pass.
    pub fn request_continue(&mut self) {
        self.continue_executing = true;
    }

    pub fn clear_continue(&mut self) {
        self.continue_executing = false;
    }

    pub fn continue_executing(&self) -> bool {
        self.continue_executing
    }
}

/// A pipeline stage answering the three request kinds.
pub trait Algorithm {
    type Output;

    /// Declare the stage's time domain given the upstream one.
    fn request_information(&mut self, upstream: &TimeInformation) -> Result<TimeInformation>;

    /// Adjust the request sent upstream for the next pass.
    fn request_update_extent(&mut self, request: &mut UpdateRequest) -> Result<()>;

    /// Consume one upstream snapshot.
    fn request_data(
        &mut self,
        input: &Snapshot,
        execution: &mut ExecutionRequest,
    ) -> Result<Self::Output>;

    /// Abandon a multi-pass run between two passes.
    fn abort(&mut self) {}
}

/// Upstream producer of snapshots.
pub trait Source {
    fn information(&mut self) -> Result<TimeInformation>;

    fn produce(&mut self, request: &UpdateRequest) -> Result<Snapshot>;
}

/// A source followed by a snapshot-to-snapshot stage.
pub struct Filtered<S, F> {
    source: S,
    filter: F,
}

impl<S, F> Filtered<S, F> {
    pub fn new(source: S, filter: F) -> Self {
        Self { source, filter }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut F {
        &mut self.filter
    }

    pub fn into_inner(self) -> (S, F) {
        (self.source, self.filter)
    }
}

impl<S, F> Source for Filtered<S, F>
where
    S: Source,
    F: Algorithm<Output = Snapshot>,
{
    fn information(&mut self) -> Result<TimeInformation> {
        let upstream = self.source.information()?;
        self.filter.request_information(&upstream)
    }

    fn produce(&mut self, request: &UpdateRequest) -> Result<Snapshot> {
        let mut request = *request;
        self.filter.request_update_extent(&mut request)?;
        let snapshot = self.source.produce(&request)?;
        let mut execution = ExecutionRequest::default();
        self.filter.request_data(&snapshot, &mut execution)
    }
}

/// Replays a fixed sequence of time-stamped snapshots.
///
/// A request for a time value without an exact match gets the latest
/// snapshot at or before it (or the first one), stamped with the stored time.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    steps: Vec<(f64, Snapshot)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Steps must be pushed in increasing time order.
    pub fn with_step(mut self, time: f64, snapshot: Snapshot) -> Self {
        self.steps.push((time, snapshot));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl FromIterator<(f64, Snapshot)> for MemorySource {
    fn from_iter<T: IntoIterator<Item = (f64, Snapshot)>>(iter: T) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

impl Source for MemorySource {
    fn information(&mut self) -> Result<TimeInformation> {
        Ok(TimeInformation::new(
            self.steps.iter().map(|(t, _)| *t).collect(),
        ))
    }

    fn produce(&mut self, request: &UpdateRequest) -> Result<Snapshot> {
        let position = match request.time {
            Some(time) => self
                .steps
                .iter()
                .rposition(|(t, _)| *t <= time)
                .unwrap_or(0),
            None => 0,
        };
        match self.steps.get(position) {
            Some((time, snapshot)) => Ok(snapshot.clone().with_time(*time)),
            None => Ok(Snapshot::composite(Vec::new())),
        }
    }
}

/// Drives multi-pass runs of a collection-producing stage.
#[derive(Debug, Clone, Default)]
pub struct Executive {
    interrupt: Option<Arc<AtomicBool>>,
}

impl Executive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `flag` between passes and abandon the run once it is set.
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Run `algorithm` against `source` until it stops requesting continuation.
    pub fn run<S, A>(&self, source: &mut S, algorithm: &mut A) -> Result<BlockCollection>
    where
        S: Source,
        A: Algorithm<Output = Option<BlockCollection>>,
    {
        let upstream = source.information()?;
        algorithm.request_information(&upstream)?;

        let mut passes = 0usize;
        loop {
            if self.interrupted() {
                log::info!("Extraction interrupted after {} pass(es)", passes);
                algorithm.abort();
                return Err(OvertimeError::Interrupted);
            }

            let mut request = UpdateRequest::default();
            algorithm.request_update_extent(&mut request)?;

            let snapshot = match source.produce(&request) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    algorithm.abort();
                    return Err(e);
                }
            };

            let mut execution = ExecutionRequest::default();
            let output = algorithm.request_data(&snapshot, &mut execution)?;
            passes += 1;

            if !execution.continue_executing() {
                log::debug!("Extraction finished after {} pass(es)", passes);
                return Ok(output.unwrap_or_default());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overtime_types::dataset::Block;

    #[test]
    fn test_time_information_range() {
        let info = TimeInformation::new(vec![0.5, 1.0, 4.0]);
        assert_eq!(info.time_range, Some((0.5, 4.0)));
        assert!(!TimeInformation::none().has_time_steps());
        assert_eq!(TimeInformation::new(Vec::new()).time_range, None);
    }

    #[test]
    fn test_time_range_of_unsorted_steps() {
        let info = TimeInformation::new(vec![3.0, -1.5, 7.25, 2.0]);
        assert_eq!(info.time_range, Some((-1.5, 7.25)));
        assert_eq!(info.time_steps, vec![3.0, -1.5, 7.25, 2.0]);
    }

    #[test]
    fn test_memory_source_picks_latest_step_before_request() {
        let mut source: MemorySource = [0.0, 1.0, 2.0]
            .into_iter()
            .map(|t| (t, Snapshot::single(Block::new())))
            .collect();

        assert_eq!(source.information().unwrap().time_steps, vec![0.0, 1.0, 2.0]);
        let snap = source.produce(&UpdateRequest::at(1.7)).unwrap();
        assert_eq!(snap.time(), Some(1.0));
        let snap = source.produce(&UpdateRequest::at(-3.0)).unwrap();
        assert_eq!(snap.time(), Some(0.0));
        let snap = source.produce(&UpdateRequest::default()).unwrap();
        assert_eq!(snap.time(), Some(0.0));
    }

    #[test]
    fn test_execution_request_flag() {
        let mut execution = ExecutionRequest::default();
        assert!(!execution.continue_executing());
        execution.request_continue();
        assert!(execution.continue_executing());
        execution.clear_continue();
        assert!(!execution.continue_executing());
    }
}
