//! Time-step selection.
//!
//! [`TimestepSelector`] narrows the time domain advertised upstream to a
//! subset of its steps, chosen either by an explicit index set or by an
//! inclusive index range with a stride. Data passes through untouched; only
//! the declared time domain changes.

use crate::config::{SelectorConfig, TimeEstimationMode};
use crate::error::Result;
use crate::pipeline::{Algorithm, ExecutionRequest, TimeInformation, UpdateRequest};
use overtime_types::dataset::Snapshot;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct TimestepSelector {
    indices: BTreeSet<usize>,
    use_range: bool,
    range: (usize, usize),
    stride: usize,
    time_estimation: TimeEstimationMode,
    /// Time values published by the last information pass
    retained: Vec<f64>,
}

impl TimestepSelector {
    pub fn new() -> Self {
        Self::from_config(&SelectorConfig::default())
    }

    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            indices: config.time_step_indices.iter().copied().collect(),
            use_range: config.use_range,
            range: config.range,
            stride: config.stride,
            time_estimation: config.time_estimation,
            retained: Vec::new(),
        }
    }

    /// Keep the step at `index`. Adding an index twice has no effect.
    pub fn add_time_step_index(&mut self, index: usize) {
        self.indices.insert(index);
    }

    pub fn remove_time_step_index(&mut self, index: usize) {
        self.indices.remove(&index);
    }

    pub fn clear_time_step_indices(&mut self) {
        self.indices.clear();
    }

    /// Replace the retained index set.
    pub fn set_time_step_indices(&mut self, indices: &[usize]) {
        self.indices = indices.iter().copied().collect();
    }

    /// Retained indices in ascending order.
    pub fn time_step_indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }

    pub fn num_time_step_indices(&self) -> usize {
        self.indices.len()
    }

    /// Replace the index set with `{begin, begin + stride, ...}` below `end`.
    ///
    /// A zero stride leaves the set untouched.
    pub fn generate_time_step_indices(&mut self, begin: usize, end: usize, stride: usize) {
        if stride == 0 {
            return;
        }
        self.indices = (begin..end).step_by(stride).collect();
    }

    pub fn set_use_range(&mut self, use_range: bool) {
        self.use_range = use_range;
    }

    pub fn use_range(&self) -> bool {
        self.use_range
    }

    /// Inclusive `[first, last]` index range for range mode.
    pub fn set_range(&mut self, first: usize, last: usize) {
        self.range = (first, last);
    }

    pub fn range(&self) -> (usize, usize) {
        self.range
    }

    pub fn set_stride(&mut self, stride: usize) {
        self.stride = stride;
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn set_time_estimation(&mut self, mode: TimeEstimationMode) {
        self.time_estimation = mode;
    }

    pub fn time_estimation(&self) -> TimeEstimationMode {
        self.time_estimation
    }

    /// Time values published by the most recent information pass.
    pub fn retained_time_steps(&self) -> &[f64] {
        &self.retained
    }

    fn is_retained(&self, index: usize) -> bool {
        if self.use_range {
            let (first, last) = self.range;
            let stride = self.stride.max(1);
            index >= first && index <= last && (index - first) % stride == 0
        } else {
            self.indices.contains(&index)
        }
    }

    /// Map `time` onto a retained time value.
    fn snap(&self, time: f64) -> f64 {
        let retained = &self.retained;
        let (Some(first), Some(last)) = (retained.first(), retained.last()) else {
            return time;
        };
        let after = retained.partition_point(|t| *t < time);
        if retained.get(after) == Some(&time) {
            return time;
        }
        let previous = after.checked_sub(1).map(|i| retained[i]);
        let next = retained.get(after).copied();
        match self.time_estimation {
            TimeEstimationMode::Previous => previous.unwrap_or(*first),
            TimeEstimationMode::Next => next.unwrap_or(*last),
            TimeEstimationMode::Nearest => match (previous, next) {
                (Some(p), Some(n)) => {
                    if time - p <= n - time {
                        p
                    } else {
                        n
                    }
                }
                (Some(p), None) => p,
                (None, Some(n)) => n,
                (None, None) => time,
            },
        }
    }
}

impl Default for TimestepSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for TimestepSelector {
    type Output = Snapshot;

    fn request_information(&mut self, upstream: &TimeInformation) -> Result<TimeInformation> {
        if !upstream.has_time_steps() {
            self.retained.clear();
            return Ok(upstream.clone());
        }

        self.retained = upstream
            .time_steps
            .iter()
            .enumerate()
            .filter(|(index, _)| self.is_retained(*index))
            .map(|(_, time)| *time)
            .collect();

        log::debug!(
            "Retained {} of {} time step(s)",
            self.retained.len(),
            upstream.time_steps.len()
        );
        Ok(TimeInformation::new(self.retained.clone()))
    }

    fn request_update_extent(&mut self, request: &mut UpdateRequest) -> Result<()> {
        if let Some(time) = request.time {
            request.time = Some(self.snap(time));
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        input: &Snapshot,
        _execution: &mut ExecutionRequest,
    ) -> Result<Snapshot> {
        Ok(input.clone())
    }
}
