use crate::table::Table;
use serde::{Deserialize, Serialize};

/// An output table with its role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlockTable {
    /// Full time history of one tracked element.
    TimeSeries(Table),
    /// Per-time-step summary statistics of one logical block.
    Statistics(Table),
}

impl BlockTable {
    pub fn table(&self) -> &Table {
        match self {
            BlockTable::TimeSeries(t) | BlockTable::Statistics(t) => t,
        }
    }

    pub fn table_mut(&mut self) -> &mut Table {
        match self {
            BlockTable::TimeSeries(t) | BlockTable::Statistics(t) => t,
        }
    }

    pub fn into_table(self) -> Table {
        match self {
            BlockTable::TimeSeries(t) | BlockTable::Statistics(t) => t,
        }
    }

    pub fn is_statistics(&self) -> bool {
        matches!(self, BlockTable::Statistics(_))
    }
}

/// A flat, ordered directory of named output tables.
///
/// An entry without a table is a placeholder: the name exists, but its content
/// lives on another process.
///
/// # Examples
///
/// ```
/// use overtime_types::collection::{BlockCollection, BlockTable};
/// use overtime_types::table::Table;
///
/// let mut collection = BlockCollection::new();
/// collection.push("gid=786", Some(BlockTable::TimeSeries(Table::new())));
/// collection.push("gid=787", None);
///
/// assert_eq!(collection.names().collect::<Vec<_>>(), vec!["gid=786", "gid=787"]);
/// assert!(collection.get("gid=786").is_some());
/// assert!(collection.is_placeholder("gid=787"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockCollection {
    entries: Vec<(String, Option<BlockTable>)>,
}

impl BlockCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection of placeholders under `names`, in order.
    pub fn placeholders<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: names.into_iter().map(|n| (n.into(), None)).collect(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, table: Option<BlockTable>) {
        self.entries.push((name.into(), table));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// The table stored under `name`; `None` for unknown names and placeholders.
    pub fn get(&self, name: &str) -> Option<&BlockTable> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, table)| table.as_ref())
    }

    pub fn is_placeholder(&self, name: &str) -> bool {
        self.entries
            .iter()
            .any(|(n, table)| n == name && table.is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&BlockTable>)> {
        self.entries
            .iter()
            .map(|(name, table)| (name.as_str(), table.as_ref()))
    }

    pub fn into_entries(self) -> Vec<(String, Option<BlockTable>)> {
        self.entries
    }
}

impl FromIterator<(String, Option<BlockTable>)> for BlockCollection {
    fn from_iter<T: IntoIterator<Item = (String, Option<BlockTable>)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
