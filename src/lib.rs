//! Temporal extraction over time-varying datasets, with distributed consolidation.
//!
//! ```rust
//! use overtime::prelude::*;
//!
//! let step = |temperature: f64| {
//!     let points = AttributeSet::new(2)
//!         .with_column(Column::int("GlobalNodeId", vec![786, 787]))
//!         .with_column(Column::float("temperature", vec![temperature, temperature + 1.0]))
//!         .with_global_ids("GlobalNodeId");
//!     Snapshot::single(Block::new().with_attributes(Association::Point, points))
//! };
//! let mut source: MemorySource = (0..3).map(|t| (t as f64, step(t as f64))).collect();
//!
//! let selection = Selection::new()
//!     .with_node(SelectionNode::global_ids(Association::Point, [786]));
//! let mut extractor = ExtractorBuilder::new().build(selection)?;
//! let output = Executive::new().run(&mut source, &mut extractor)?;
//!
//! let history = output.get("gid=786").unwrap().table();
//! assert_eq!(history.num_rows(), 3);
//! # Ok::<(), overtime::OvertimeError>(())
//! ```

pub mod builder;
pub mod config;
pub mod distributed;
pub mod error;
pub mod pipeline;
pub mod selection;
pub mod statistics;
pub mod timesteps;
pub mod tracker;

pub use builder::ExtractorBuilder;
pub use config::{Config, SelectorConfig, TimeEstimationMode, TrackerConfig};
pub use error::{OvertimeError, Result};

pub use distributed::{
    Consolidation, Controller, DistributedConsolidator, GroupController, LocalConsolidation,
    SingleProcess,
};

pub use pipeline::{
    Algorithm, ExecutionRequest, Executive, Filtered, MemorySource, Source, TimeInformation,
    UpdateRequest,
};

pub use selection::{
    IdSelectionEvaluator, SelectionClass, SelectionDrivenExtractor, SelectionEvaluator,
};

pub use statistics::{DescriptiveStatistics, StatisticsEngine};
pub use timesteps::TimestepSelector;
pub use tracker::{ExecutionState, KeyStrategy, TemporalTracker, TrackerError};

pub use overtime_types::collection::{BlockCollection, BlockTable};
pub use overtime_types::column::{Column, Value};
pub use overtime_types::dataset::{Association, AttributeSet, Block, Snapshot};
pub use overtime_types::selection::{ContentKind, Selection, SelectionNode};
pub use overtime_types::table::Table;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ExtractorBuilder, OvertimeError, Result};

    pub use crate::{Config, SelectorConfig, TrackerConfig};

    pub use crate::{Algorithm, Executive, Filtered, MemorySource, Source};

    pub use crate::{SelectionDrivenExtractor, TemporalTracker, TimestepSelector};

    pub use crate::{Association, AttributeSet, Block, Column, Snapshot, Value};

    pub use crate::{BlockCollection, BlockTable, Table};

    pub use crate::{Selection, SelectionNode};
}
