//! Builder for trackers and selection-driven extractors
//!
//! Collects tracker settings, collaborators and the consolidation strategy,
//! validating the configuration once at build time.

use crate::config::TrackerConfig;
use crate::distributed::{Consolidation, Controller, DistributedConsolidator};
use crate::error::{OvertimeError, Result};
use crate::selection::{IdSelectionEvaluator, SelectionDrivenExtractor, SelectionEvaluator};
use crate::statistics::StatisticsEngine;
use crate::tracker::TemporalTracker;
use overtime_types::selection::Selection;

/// Builder for [`TemporalTracker`] and [`SelectionDrivenExtractor`].
///
/// # Examples
///
/// ```rust
/// use overtime::prelude::*;
///
/// let selection = Selection::new()
///     .with_node(SelectionNode::global_ids(Association::Point, [786, 787, 788]));
/// let extractor = ExtractorBuilder::new()
///     .report_statistics_only(false)
///     .build(selection)?;
/// assert!(!extractor.tracker().is_executing());
/// # Ok::<(), overtime::OvertimeError>(())
/// ```
pub struct ExtractorBuilder<E = IdSelectionEvaluator> {
    config: TrackerConfig,
    evaluator: E,
    tracker: TemporalTracker,
}

impl ExtractorBuilder {
    /// Default settings, descriptive statistics, id-based selection, local consolidation.
    pub fn new() -> Self {
        Self {
            config: TrackerConfig::default(),
            evaluator: IdSelectionEvaluator,
            tracker: TemporalTracker::default(),
        }
    }
}

impl Default for ExtractorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> ExtractorBuilder<E> {
    /// Set the tracker configuration.
    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn report_statistics_only(mut self, enabled: bool) -> Self {
        self.config.report_statistics_only = enabled;
        self
    }

    /// Use another selection evaluator.
    pub fn evaluator<F: SelectionEvaluator>(self, evaluator: F) -> ExtractorBuilder<F> {
        ExtractorBuilder {
            config: self.config,
            evaluator,
            tracker: self.tracker,
        }
    }

    pub fn statistics_engine(mut self, engine: impl StatisticsEngine + 'static) -> Self {
        self.tracker = self.tracker.with_statistics_engine(engine);
        self
    }

    pub fn consolidation(mut self, consolidation: impl Consolidation + 'static) -> Self {
        self.tracker = self.tracker.with_consolidation(consolidation);
        self
    }

    /// Consolidate results across the group `controller` belongs to.
    pub fn distributed<C: Controller + 'static>(self, controller: C) -> Self {
        self.consolidation(DistributedConsolidator::new(controller))
    }

    /// Build a tracker for direct use, without selection.
    pub fn tracker(self) -> Result<TemporalTracker> {
        self.config.validate().map_err(OvertimeError::Config)?;
        let mut tracker = self.tracker;
        tracker.set_config(self.config);
        Ok(tracker)
    }
}

impl<E: SelectionEvaluator> ExtractorBuilder<E> {
    /// Build an extractor tracking the elements of `selection`.
    pub fn build(self, selection: Selection) -> Result<SelectionDrivenExtractor<E>> {
        self.config.validate().map_err(OvertimeError::Config)?;
        let mut tracker = self.tracker;
        tracker.set_config(self.config);
        Ok(SelectionDrivenExtractor::new(selection, self.evaluator, tracker))
    }
}
