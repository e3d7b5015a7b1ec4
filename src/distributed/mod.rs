//! Cross-process consolidation of extraction results.
//!
//! When an extraction runs on several cooperating processes, each one ends
//! its run holding only the tables for its own share of the data. The
//! [`DistributedConsolidator`] gathers every collection on the root rank,
//! merges tables that describe the same globally identified element, and
//! tells the other ranks which names the merged collection holds so they can
//! expose matching placeholders.
//!
//! Communication goes through a [`Controller`]. [`SingleProcess`] is the
//! trivial one-rank controller; [`GroupController`] connects ranks living on
//! threads of one process.

mod consolidate;
mod group;

pub use consolidate::{DistributedConsolidator, merge_collections};
pub use group::GroupController;

use crate::error::Result;
use bytes::Bytes;
use overtime_types::collection::BlockCollection;

/// Rank that receives gathered results.
pub const ROOT: usize = 0;

/// Collective communication between the ranks of one run.
///
/// Every rank must enter each collective, in the same order, or the group
/// blocks.
pub trait Controller: Send {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Send `payload` to `root`.
    ///
    /// The root receives every rank's payload ordered by rank; other ranks
    /// receive `None`.
    fn gather(&self, payload: Bytes, root: usize) -> Result<Option<Vec<Bytes>>>;

    /// Distribute the root's `payload` to every rank.
    ///
    /// Only the root's `payload` is read.
    fn broadcast(&self, payload: Option<Bytes>, root: usize) -> Result<Bytes>;
}

/// A group of one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Controller for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn gather(&self, payload: Bytes, _root: usize) -> Result<Option<Vec<Bytes>>> {
        Ok(Some(vec![payload]))
    }

    fn broadcast(&self, payload: Option<Bytes>, _root: usize) -> Result<Bytes> {
        Ok(payload.unwrap_or_default())
    }
}

/// What a tracker does with its collection once a run finishes.
pub trait Consolidation: Send {
    fn consolidate(&mut self, local: BlockCollection) -> Result<BlockCollection>;
}

/// Keep the local collection as is.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalConsolidation;

impl Consolidation for LocalConsolidation {
    fn consolidate(&mut self, local: BlockCollection) -> Result<BlockCollection> {
        Ok(local)
    }
}
