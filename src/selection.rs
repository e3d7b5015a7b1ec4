//! Selection-driven extraction.
//!
//! [`SelectionDrivenExtractor`] reduces every incoming snapshot to the
//! elements of a [`Selection`] and tracks what remains over time. What the
//! selection's content describes decides how elements are recognized across
//! steps and whether the run must fall back to statistics: content that can
//! select a different population at every step (thresholds, frustums,
//! queries) only makes sense summarized.

use crate::config::TrackerConfig;
use crate::error::{OvertimeError, Result};
use crate::pipeline::{Algorithm, ExecutionRequest, TimeInformation, UpdateRequest};
use crate::tracker::TemporalTracker;
use overtime_types::collection::BlockCollection;
use overtime_types::column::Column;
use overtime_types::dataset::{Association, Block, Snapshot};
use overtime_types::selection::{ContentKind, Selection, SelectionNode};
use rustc_hash::FxHashSet;

/// Reduces a snapshot to the elements a selection designates.
pub trait SelectionEvaluator: Send {
    /// The reduced snapshot. Structure and time stamp are kept.
    fn evaluate(&self, input: &Snapshot, selection: &Selection) -> Result<Snapshot>;
}

/// Name of the array recording each element's position in its unreduced block.
pub fn original_ids_array(association: Association) -> &'static str {
    match association {
        Association::Point => "OriginalPointIds",
        Association::Cell => "OriginalCellIds",
        Association::Row => "OriginalRowIds",
    }
}

/// The association and content kind shared by every node of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionClass {
    pub association: Association,
    pub content: ContentKind,
}

impl SelectionClass {
    pub fn classify(selection: &Selection) -> Result<Self> {
        let Some(first) = selection.nodes().first() else {
            return Err(OvertimeError::EmptySelection);
        };
        if let Some(other) = selection
            .nodes()
            .iter()
            .find(|n| n.association != first.association || n.content != first.content)
        {
            return Err(OvertimeError::AmbiguousSelection(format!(
                "nodes select {:?} {:?} and {:?} {:?}",
                first.association, first.content, other.association, other.content
            )));
        }
        Ok(Self {
            association: first.association,
            content: first.content,
        })
    }

    /// Whether elements are tracked by global id rather than original index.
    pub fn tracks_global_ids(&self) -> bool {
        match self.content {
            ContentKind::GlobalIds => true,
            ContentKind::PedigreeIds
            | ContentKind::Indices
            | ContentKind::Values
            | ContentKind::Thresholds
            | ContentKind::Frustum
            | ContentKind::Locations
            | ContentKind::Blocks
            | ContentKind::Query => false,
        }
    }

    /// Whether the selected population may change between steps.
    pub fn forces_statistics(&self) -> bool {
        match self.content {
            ContentKind::Thresholds | ContentKind::Frustum | ContentKind::Query => true,
            ContentKind::GlobalIds
            | ContentKind::PedigreeIds
            | ContentKind::Indices
            | ContentKind::Values
            | ContentKind::Locations
            | ContentKind::Blocks => false,
        }
    }

    /// Tracker settings for this class, layered over user preferences.
    pub fn tracker_config(&self, preferences: &TrackerConfig) -> TrackerConfig {
        let original = original_ids_array(self.association);
        let mut config = preferences.clone().with_dropped_array(original);
        config.field_association = self.association;
        config.report_statistics_only =
            preferences.report_statistics_only || self.forces_statistics();
        if self.tracks_global_ids() {
            config.use_global_ids = true;
            config
        } else {
            config.use_global_ids = false;
            config.with_id_array(original)
        }
    }
}

/// Tracks the elements of a selection over time.
pub struct SelectionDrivenExtractor<E> {
    selection: Selection,
    evaluator: E,
    preferences: TrackerConfig,
    tracker: TemporalTracker,
    class: Option<SelectionClass>,
}

impl<E: SelectionEvaluator> SelectionDrivenExtractor<E> {
    /// An extractor whose runs finish through `tracker`'s consolidation.
    ///
    /// The tracker's configuration is taken as the user preferences; the
    /// association and tracking array are derived from the selection.
    pub fn new(selection: Selection, evaluator: E, tracker: TemporalTracker) -> Self {
        Self {
            selection,
            evaluator,
            preferences: tracker.config().clone(),
            tracker,
            class: None,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Replace the selection. Ignored while a run is in progress.
    pub fn set_selection(&mut self, selection: Selection) {
        if self.tracker.is_executing() {
            log::warn!("Ignoring selection change during an extraction run");
            return;
        }
        self.selection = selection;
    }

    pub fn report_statistics_only(&self) -> bool {
        self.preferences.report_statistics_only
    }

    pub fn set_report_statistics_only(&mut self, enabled: bool) {
        self.preferences.report_statistics_only = enabled;
    }

    /// Classification of the current or most recent run.
    pub fn selection_class(&self) -> Option<SelectionClass> {
        self.class
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn tracker(&self) -> &TemporalTracker {
        &self.tracker
    }

    fn begin_run(&mut self) -> Result<()> {
        let class = SelectionClass::classify(&self.selection)?;
        let config = class.tracker_config(&self.preferences);
        if config.report_statistics_only && !self.preferences.report_statistics_only {
            log::info!(
                "{:?} selections cannot be tracked element-wise, reporting statistics",
                class.content
            );
        }
        self.tracker.set_config(config);
        self.class = Some(class);
        Ok(())
    }
}

impl<E: SelectionEvaluator> Algorithm for SelectionDrivenExtractor<E> {
    type Output = Option<BlockCollection>;

    fn request_information(&mut self, upstream: &TimeInformation) -> Result<TimeInformation> {
        self.tracker.request_information(upstream)
    }

    fn request_update_extent(&mut self, request: &mut UpdateRequest) -> Result<()> {
        self.tracker.request_update_extent(request)
    }

    fn request_data(
        &mut self,
        input: &Snapshot,
        execution: &mut ExecutionRequest,
    ) -> Result<Option<BlockCollection>> {
        if !self.tracker.is_executing()
            && let Err(e) = self.begin_run()
        {
            log::error!("Cannot start selection extraction: {}", e);
            execution.clear_continue();
            return Err(e);
        }

        let mut reduced = match self.evaluator.evaluate(input, &self.selection) {
            Ok(reduced) => reduced,
            Err(e) => {
                log::error!("Selection evaluation failed: {}", e);
                self.tracker.abort();
                execution.clear_continue();
                return Err(e);
            }
        };
        if reduced.time_values().is_empty() && !input.time_values().is_empty() {
            reduced.set_time_values(input.time_values().to_vec());
        }

        self.tracker.request_data(&reduced, execution)
    }

    fn abort(&mut self) {
        self.tracker.abort();
    }
}

/// Selects elements by global id, position, or whole block.
///
/// Every reduced block carries the original-index array of the association,
/// materialized from element positions when the input lacks it, so elements
/// keep their identity after reduction.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdSelectionEvaluator;

impl IdSelectionEvaluator {
    fn applies(node: &SelectionNode, block: Option<usize>) -> bool {
        node.block.is_none() || node.block == block
    }

    fn kept_elements(
        class: &SelectionClass,
        selection: &Selection,
        index: Option<usize>,
        block: &Block,
    ) -> Vec<usize> {
        let attributes = block.attributes(class.association);
        let wanted: FxHashSet<i64> = selection
            .nodes()
            .iter()
            .filter(|node| Self::applies(node, index))
            .flat_map(|node| node.ids.iter().copied())
            .collect();

        match class.content {
            ContentKind::GlobalIds => match attributes.global_ids() {
                Some(ids) => (0..ids.len())
                    .filter(|i| {
                        ids.get(*i)
                            .and_then(|v| v.as_i64())
                            .is_some_and(|id| wanted.contains(&id))
                    })
                    .collect(),
                None => Vec::new(),
            },
            ContentKind::Blocks => {
                let flat = index.unwrap_or(0) as i64;
                let wanted_block = selection
                    .nodes()
                    .iter()
                    .any(|node| node.ids.contains(&flat));
                if wanted_block {
                    (0..attributes.len()).collect()
                } else {
                    Vec::new()
                }
            }
            _ => (0..attributes.len())
                .filter(|i| wanted.contains(&(*i as i64)))
                .collect(),
        }
    }
}

impl SelectionEvaluator for IdSelectionEvaluator {
    fn evaluate(&self, input: &Snapshot, selection: &Selection) -> Result<Snapshot> {
        let class = SelectionClass::classify(selection)?;
        match class.content {
            ContentKind::GlobalIds | ContentKind::Indices | ContentKind::Blocks => {}
            other => return Err(OvertimeError::UnsupportedSelection(other)),
        }

        let original = original_ids_array(class.association);
        Ok(input.map_blocks(|index, block| {
            let kept = Self::kept_elements(&class, selection, index, block);
            let mut attributes = block.attributes(class.association).clone();
            if attributes.column(original).is_none() {
                let positions = (0..attributes.len() as i64).collect();
                attributes.insert_column(Column::int(original, positions));
            }

            let mut reduced = block.clone();
            *reduced.attributes_mut(class.association) = attributes.select(&kept);
            reduced
        }))
    }
}
