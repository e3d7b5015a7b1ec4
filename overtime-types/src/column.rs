use serde::{Deserialize, Serialize};
use std::fmt;

/// A single attribute value.
///
/// Values are what flows between datasets and tables: one element's entry in
/// an attribute array, or one cell of an output table.
///
/// # Examples
///
/// ```
/// use overtime_types::column::Value;
///
/// let v = Value::from(42_i64);
/// assert_eq!(v.as_f64(), Some(42.0));
/// assert_eq!(Value::from("label").as_f64(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Float(f64),
    Int(i64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Text(_) => None,
        }
    }

    /// Integer view of the value.
    ///
    /// Floats convert only when they hold an integral value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Float(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Text(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Float(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

/// Typed storage behind a [`Column`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnData {
    Float(Vec<f64>),
    Int(Vec<i64>),
    Text(Vec<String>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Float(v) => v.len(),
            ColumnData::Int(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    /// Empty storage of the same type as `value`, pre-filled with `len` defaults.
    fn filled_like(value: &Value, len: usize) -> Self {
        match value {
            Value::Float(_) => ColumnData::Float(vec![f64::NAN; len]),
            Value::Int(_) => ColumnData::Int(vec![0; len]),
            Value::Text(_) => ColumnData::Text(vec![String::new(); len]),
        }
    }
}

/// A named, homogeneously typed array of values.
///
/// Missing entries are represented by the type's default: `NaN` for floats,
/// `0` for integers and the empty string for text.
///
/// # Examples
///
/// ```
/// use overtime_types::column::{Column, Value};
///
/// let temperature = Column::float("temperature", vec![280.5, 281.0]);
/// assert_eq!(temperature.len(), 2);
/// assert_eq!(temperature.get(1), Some(Value::Float(281.0)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    name: String,
    data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn int(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Int(values))
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self::new(name, ColumnData::Text(values))
    }

    /// A column typed after `value`, holding `len` default entries.
    pub fn filled_like(name: impl Into<String>, value: &Value, len: usize) -> Self {
        Self::new(name, ColumnData::filled_like(value, len))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self.data, ColumnData::Text(_))
    }

    /// Value at `index`, or `None` when out of bounds.
    pub fn get(&self, index: usize) -> Option<Value> {
        match &self.data {
            ColumnData::Float(v) => v.get(index).map(|x| Value::Float(*x)),
            ColumnData::Int(v) => v.get(index).map(|x| Value::Int(*x)),
            ColumnData::Text(v) => v.get(index).map(|x| Value::Text(x.clone())),
        }
    }

    /// All entries as `f64`, or `None` for text columns.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match &self.data {
            ColumnData::Float(v) => Some(v.clone()),
            ColumnData::Int(v) => Some(v.iter().map(|x| *x as f64).collect()),
            ColumnData::Text(_) => None,
        }
    }

    /// Append one value, coercing it to the column type.
    ///
    /// An integer column receiving a float is promoted to a float column.
    /// Numeric columns receiving text store the default entry.
    pub fn push(&mut self, value: Value) {
        self.promote_for(&value);
        match (&mut self.data, value) {
            (ColumnData::Float(v), value) => v.push(value.as_f64().unwrap_or(f64::NAN)),
            (ColumnData::Int(v), value) => v.push(value.as_i64().unwrap_or(0)),
            (ColumnData::Text(v), value) => v.push(value.to_string()),
        }
    }

    /// Append the type's default entry.
    pub fn push_default(&mut self) {
        match &mut self.data {
            ColumnData::Float(v) => v.push(f64::NAN),
            ColumnData::Int(v) => v.push(0),
            ColumnData::Text(v) => v.push(String::new()),
        }
    }

    /// Overwrite the entry at `index`, with the same coercion rules as [`Column::push`].
    ///
    /// Returns `false` when `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        if index >= self.len() {
            return false;
        }
        self.promote_for(&value);
        match (&mut self.data, value) {
            (ColumnData::Float(v), value) => v[index] = value.as_f64().unwrap_or(f64::NAN),
            (ColumnData::Int(v), value) => v[index] = value.as_i64().unwrap_or(0),
            (ColumnData::Text(v), value) => v[index] = value.to_string(),
        }
        true
    }

    /// Keep only the entries at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Column {
        let data = match &self.data {
            ColumnData::Float(v) => {
                ColumnData::Float(indices.iter().filter_map(|i| v.get(*i).copied()).collect())
            }
            ColumnData::Int(v) => {
                ColumnData::Int(indices.iter().filter_map(|i| v.get(*i).copied()).collect())
            }
            ColumnData::Text(v) => {
                ColumnData::Text(indices.iter().filter_map(|i| v.get(*i).cloned()).collect())
            }
        };
        Column::new(self.name.clone(), data)
    }

    fn promote_for(&mut self, value: &Value) {
        if let (ColumnData::Int(ints), Value::Float(f)) = (&self.data, value)
            && f.fract() != 0.0
        {
            self.data = ColumnData::Float(ints.iter().map(|x| *x as f64).collect());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_coerces_to_column_type() {
        let mut col = Column::float("x", vec![]);
        col.push(Value::Int(3));
        col.push(Value::from("not a number"));
        assert_eq!(col.get(0), Some(Value::Float(3.0)));
        assert!(col.get(1).unwrap().as_f64().unwrap().is_nan());
    }

    #[test]
    fn test_int_column_promotes_on_fractional_float() {
        let mut col = Column::int("id", vec![1, 2]);
        col.push(Value::Float(2.5));
        assert_eq!(col.to_f64_vec(), Some(vec![1.0, 2.0, 2.5]));

        let mut col = Column::int("id", vec![1]);
        col.push(Value::Float(7.0));
        assert_eq!(col.get(1), Some(Value::Int(7)));
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut col = Column::int("id", vec![1]);
        assert!(!col.set(3, Value::Int(9)));
        assert!(col.set(0, Value::Int(9)));
        assert_eq!(col.get(0), Some(Value::Int(9)));
    }

    #[test]
    fn test_select_keeps_order() {
        let col = Column::text("name", vec!["a".into(), "b".into(), "c".into()]);
        let picked = col.select(&[2, 0, 7]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.get(0), Some(Value::from("c")));
    }

    #[test]
    fn test_filled_like_defaults() {
        let col = Column::filled_like("mask", &Value::Int(1), 3);
        assert_eq!(col.data(), &ColumnData::Int(vec![0, 0, 0]));
    }
}
