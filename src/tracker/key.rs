//! Element identity across time steps and output block naming.

use crate::config::TrackerConfig;
use overtime_types::column::Value;
use overtime_types::dataset::{Association, AttributeSet, Snapshot};
use std::fmt;

/// Which identifier space recognizes "the same element" across steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The designated global-id array. Unique across blocks.
    GlobalIds,
    /// Values of a named array, scoped to their block.
    IdArray(String),
    /// Position of the element within its block.
    Positional,
}

impl KeyStrategy {
    /// Pick the highest-priority key space available in `snapshot`.
    pub fn choose(snapshot: &Snapshot, config: &TrackerConfig) -> Self {
        let association = config.field_association;
        if config.use_global_ids
            && any_attributes(snapshot, association, |a| a.global_ids().is_some())
        {
            return KeyStrategy::GlobalIds;
        }
        if let Some(name) = &config.id_array
            && any_attributes(snapshot, association, |a| a.column(name).is_some())
        {
            return KeyStrategy::IdArray(name.clone());
        }
        KeyStrategy::Positional
    }

    /// Keys of every element of `attributes`, in element order.
    ///
    /// `None` when the array this strategy relies on is missing.
    pub fn keys(&self, attributes: &AttributeSet) -> Option<Vec<TrackingKey>> {
        let column = match self {
            KeyStrategy::Positional => {
                return Some(
                    (0..attributes.len())
                        .map(|i| TrackingKey::Int(i as i64))
                        .collect(),
                );
            }
            KeyStrategy::GlobalIds => attributes.global_ids()?,
            KeyStrategy::IdArray(name) => attributes.column(name)?,
        };
        Some(
            (0..column.len())
                .filter_map(|i| column.get(i))
                .map(TrackingKey::from_value)
                .collect(),
        )
    }

    /// Whether equal keys in different blocks denote different elements.
    pub fn is_block_scoped(&self) -> bool {
        !matches!(self, KeyStrategy::GlobalIds)
    }

    fn prefix(&self) -> &'static str {
        match self {
            KeyStrategy::GlobalIds => "gid",
            KeyStrategy::IdArray(_) => "originalId",
            KeyStrategy::Positional => "id",
        }
    }

    pub fn table_name(&self, element: &ElementKey) -> String {
        match element.block {
            Some(block) => format!("{}={} block={}", self.prefix(), element.key, block),
            None => format!("{}={}", self.prefix(), element.key),
        }
    }
}

fn any_attributes<F>(snapshot: &Snapshot, association: Association, has: F) -> bool
where
    F: Fn(&AttributeSet) -> bool,
{
    snapshot
        .blocks()
        .any(|(_, block)| has(block.attributes(association)))
}

/// An element identifier value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackingKey {
    Int(i64),
    Text(String),
}

impl TrackingKey {
    pub fn from_value(value: Value) -> Self {
        match value.as_i64() {
            Some(id) => TrackingKey::Int(id),
            None => TrackingKey::Text(value.to_string()),
        }
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingKey::Int(id) => write!(f, "{}", id),
            TrackingKey::Text(id) => f.write_str(id),
        }
    }
}

/// A tracked element: its key plus the block scoping it, if any.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementKey {
    pub block: Option<usize>,
    pub key: TrackingKey,
}

/// Output name of the statistics table of `block`.
pub fn statistics_name(block: Option<usize>) -> String {
    match block {
        Some(block) => format!("stats block={}", block),
        None => "stats".to_string(),
    }
}

/// Whether `name` follows the global-id naming convention.
pub fn is_global_id_name(name: &str) -> bool {
    name.starts_with("gid=")
}
