//! # overtime-types
//!
//! Core data types for the overtime temporal extraction pipeline.
//!
//! This crate provides the in-memory model that flows between pipeline stages:
//!
//! - **Values and columns**: `Value`, `Column`, `ColumnData`
//! - **Tables**: `Table`, a growable column-oriented table
//! - **Datasets**: `AttributeSet`, `Block`, `Snapshot` (one time step of a dataset)
//! - **Output**: `BlockCollection`, a flat directory of named `BlockTable`s
//! - **Selections**: `Selection`, `SelectionNode`, `ContentKind`
//!
//! All types are serializable with Serde so they can cross process boundaries.
//!
//! ## Examples
//!
//! ```rust
//! use overtime_types::column::Column;
//! use overtime_types::dataset::{Association, AttributeSet, Block, Snapshot};
//!
//! let cells = AttributeSet::new(2)
//!     .with_column(Column::float("stress", vec![1.5, 2.5]));
//! let snapshot = Snapshot::single(Block::new().with_attributes(Association::Cell, cells))
//!     .with_time(0.25);
//!
//! assert_eq!(snapshot.time(), Some(0.25));
//! ```

pub mod collection;
pub mod column;
pub mod dataset;
pub mod selection;
pub mod table;
