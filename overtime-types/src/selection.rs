use crate::dataset::Association;
use serde::{Deserialize, Serialize};

/// What a selection node's list describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Global element identifiers.
    GlobalIds,
    /// Pedigree (provenance) identifiers.
    PedigreeIds,
    /// Positional indices within a block.
    Indices,
    /// Values of a named array.
    Values,
    /// Value ranges of a named array.
    Thresholds,
    /// Elements inside a view frustum.
    Frustum,
    /// Elements at or near spatial locations.
    Locations,
    /// Whole blocks by flat index.
    Blocks,
    /// Elements matching a query expression.
    Query,
}

/// One fragment of a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionNode {
    pub association: Association,
    pub content: ContentKind,
    /// Identifiers, indices or block numbers, depending on `content`.
    pub ids: Vec<i64>,
    /// Restrict the node to one composite block.
    pub block: Option<usize>,
    /// Query expression for [`ContentKind::Query`].
    pub expression: Option<String>,
}

impl SelectionNode {
    pub fn new(association: Association, content: ContentKind) -> Self {
        Self {
            association,
            content,
            ids: Vec::new(),
            block: None,
            expression: None,
        }
    }

    pub fn global_ids(association: Association, ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(association, ContentKind::GlobalIds).with_ids(ids)
    }

    pub fn indices(association: Association, ids: impl IntoIterator<Item = i64>) -> Self {
        Self::new(association, ContentKind::Indices).with_ids(ids)
    }

    pub fn query(association: Association, expression: impl Into<String>) -> Self {
        let mut node = Self::new(association, ContentKind::Query);
        node.expression = Some(expression.into());
        node
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    pub fn in_block(mut self, block: usize) -> Self {
        self.block = Some(block);
        self
    }
}

/// An opaque description of which elements to extract.
///
/// # Examples
///
/// ```
/// use overtime_types::dataset::Association;
/// use overtime_types::selection::{ContentKind, Selection, SelectionNode};
///
/// let selection = Selection::new()
///     .with_node(SelectionNode::global_ids(Association::Point, [786, 787, 788]));
/// assert_eq!(selection.nodes()[0].content, ContentKind::GlobalIds);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    nodes: Vec<SelectionNode>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, node: SelectionNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[SelectionNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
