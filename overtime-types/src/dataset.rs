use crate::column::{Column, Value};
use serde::{Deserialize, Serialize};

/// Which kind of element an attribute array is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Association {
    /// Mesh points (vertices).
    #[default]
    Point,
    /// Mesh cells.
    Cell,
    /// Rows of a tabular dataset.
    Row,
}

/// Equally long attribute arrays describing one kind of element of a block.
///
/// The element count is fixed at construction; every column added later must
/// match it. One column may be designated as the global-id array, whose
/// values identify elements across blocks, processes and time steps.
///
/// # Examples
///
/// ```
/// use overtime_types::column::Column;
/// use overtime_types::dataset::AttributeSet;
///
/// let points = AttributeSet::new(2)
///     .with_column(Column::int("GlobalNodeId", vec![786, 787]))
///     .with_column(Column::float("temperature", vec![280.0, 281.0]))
///     .with_global_ids("GlobalNodeId");
///
/// assert_eq!(points.len(), 2);
/// assert_eq!(points.global_ids().unwrap().name(), "GlobalNodeId");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeSet {
    len: usize,
    columns: Vec<Column>,
    global_ids: Option<String>,
}

impl AttributeSet {
    pub fn new(len: usize) -> Self {
        Self {
            len,
            columns: Vec::new(),
            global_ids: None,
        }
    }

    /// Add a column, replacing any column with the same name.
    ///
    /// # Panics
    ///
    /// Panics if the column length differs from the element count.
    pub fn with_column(mut self, column: Column) -> Self {
        self.insert_column(column);
        self
    }

    /// Designate `name` as the global-id array.
    pub fn with_global_ids(mut self, name: impl Into<String>) -> Self {
        self.global_ids = Some(name.into());
        self
    }

    /// Add a column in place, replacing any column with the same name.
    ///
    /// # Panics
    ///
    /// Panics if the column length differs from the element count.
    pub fn insert_column(&mut self, column: Column) {
        assert_eq!(
            column.len(),
            self.len,
            "Column '{}' has {} entries, expected {}",
            column.name(),
            column.len(),
            self.len
        );
        match self.columns.iter_mut().find(|c| c.name() == column.name()) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn global_ids_name(&self) -> Option<&str> {
        self.global_ids.as_deref()
    }

    /// The designated global-id column, if it is designated and present.
    pub fn global_ids(&self) -> Option<&Column> {
        self.global_ids.as_deref().and_then(|name| self.column(name))
    }

    /// Every `(column, value)` pair of one element.
    pub fn element(&self, index: usize) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.columns
            .iter()
            .filter_map(move |c| c.get(index).map(|v| (c.name(), v)))
    }

    /// A new set holding only the elements at `indices`, in that order.
    ///
    /// Out-of-range indices are ignored.
    pub fn select(&self, indices: &[usize]) -> AttributeSet {
        let kept: Vec<usize> = indices.iter().copied().filter(|i| *i < self.len).collect();
        AttributeSet {
            len: kept.len(),
            columns: self.columns.iter().map(|c| c.select(&kept)).collect(),
            global_ids: self.global_ids.clone(),
        }
    }
}

/// One logical block of a dataset: point, cell and row attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    points: AttributeSet,
    cells: AttributeSet,
    rows: AttributeSet,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes(mut self, association: Association, attributes: AttributeSet) -> Self {
        *self.attributes_mut(association) = attributes;
        self
    }

    pub fn attributes(&self, association: Association) -> &AttributeSet {
        match association {
            Association::Point => &self.points,
            Association::Cell => &self.cells,
            Association::Row => &self.rows,
        }
    }

    pub fn attributes_mut(&mut self, association: Association) -> &mut AttributeSet {
        match association {
            Association::Point => &mut self.points,
            Association::Cell => &mut self.cells,
            Association::Row => &mut self.rows,
        }
    }
}

/// Block layout of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Structure {
    /// A plain dataset with a single block.
    Single(Block),
    /// A composite dataset: blocks keyed by their flat index.
    Composite(Vec<(usize, Block)>),
}

/// The state of a dataset at one time step.
///
/// A snapshot is stamped with the time value(s) it was produced for. A
/// well-formed snapshot carries at most one.
///
/// # Examples
///
/// ```
/// use overtime_types::dataset::{Block, Snapshot};
///
/// let snapshot = Snapshot::composite(vec![(0, Block::new()), (3, Block::new())]).with_time(1.5);
/// assert!(snapshot.is_composite());
/// assert_eq!(snapshot.time(), Some(1.5));
/// let indices: Vec<_> = snapshot.blocks().map(|(index, _)| index).collect();
/// assert_eq!(indices, vec![Some(0), Some(3)]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    structure: Structure,
    time_values: Vec<f64>,
}

impl Snapshot {
    pub fn single(block: Block) -> Self {
        Self {
            structure: Structure::Single(block),
            time_values: Vec::new(),
        }
    }

    pub fn composite(blocks: Vec<(usize, Block)>) -> Self {
        Self {
            structure: Structure::Composite(blocks),
            time_values: Vec::new(),
        }
    }

    /// Stamp the snapshot with a single time value.
    pub fn with_time(mut self, time: f64) -> Self {
        self.time_values = vec![time];
        self
    }

    pub fn set_time_values(&mut self, time_values: Vec<f64>) {
        self.time_values = time_values;
    }

    pub fn time_values(&self) -> &[f64] {
        &self.time_values
    }

    /// The first stamped time value.
    pub fn time(&self) -> Option<f64> {
        self.time_values.first().copied()
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn is_composite(&self) -> bool {
        matches!(self.structure, Structure::Composite(_))
    }

    /// Blocks with their flat index (`None` for a non-composite snapshot).
    pub fn blocks(&self) -> Box<dyn Iterator<Item = (Option<usize>, &Block)> + '_> {
        match &self.structure {
            Structure::Single(block) => Box::new(std::iter::once((None, block))),
            Structure::Composite(blocks) => {
                Box::new(blocks.iter().map(|(index, block)| (Some(*index), block)))
            }
        }
    }

    /// Apply `f` to every block, keeping structure and time stamp.
    pub fn map_blocks<F>(&self, mut f: F) -> Snapshot
    where
        F: FnMut(Option<usize>, &Block) -> Block,
    {
        let structure = match &self.structure {
            Structure::Single(block) => Structure::Single(f(None, block)),
            Structure::Composite(blocks) => Structure::Composite(
                blocks
                    .iter()
                    .map(|(index, block)| (*index, f(Some(*index), block)))
                    .collect(),
            ),
        };
        Snapshot {
            structure,
            time_values: self.time_values.clone(),
        }
    }
}
