//! Initial data for dataset creation.

use thiserror::Error;

use crate::array_subset::ArrayShape;
use crate::data_type::{DataType, Element};

/// Data supplied at dataset creation through
/// [`DatasetBuilder::build_with_data`](super::DatasetBuilder::build_with_data).
///
/// Either a typed element buffer with an explicit shape and data type, or an
/// untyped nested sequence of numbers whose shape is inferred from the
/// nesting and whose data type is `float64`.
#[derive(Clone, Debug)]
pub enum ArrayData {
    /// A typed element buffer in row-major order.
    Elements {
        /// The array shape of the buffer.
        shape: ArrayShape,
        /// The element data type.
        data_type: DataType,
        /// The native-endian element bytes.
        bytes: Vec<u8>,
        /// The chunk shape the buffer originates from, if any. Adopted by the
        /// created dataset unless the builder sets its own.
        chunk_shape: Option<ArrayShape>,
    },
    /// An untyped nested sequence of numbers, e.g. parsed JSON.
    Nested(serde_json::Value),
}

/// An invalid [`ArrayData`] error.
#[derive(Debug, Error)]
pub enum ArrayDataError {
    /// An element buffer not matching its shape.
    #[error("data has {actual} elements, shape {shape:?} needs {expected}")]
    WrongElementCount {
        /// The stated array shape.
        shape: ArrayShape,
        /// The number of elements the shape implies.
        expected: u64,
        /// The number of elements supplied.
        actual: u64,
    },
    /// A nested sequence whose rows differ in length.
    #[error("nested data is ragged at depth {_0}")]
    Ragged(usize),
    /// A nested sequence containing something other than a number.
    #[error("nested data contains a non-numeric value")]
    NotNumeric,
    /// A value that is not a sequence at all.
    #[error("nested data must be a sequence")]
    NotASequence,
}

impl ArrayData {
    /// Create [`ArrayData::Elements`] from a typed vector.
    ///
    /// # Errors
    /// Returns [`ArrayDataError::WrongElementCount`] if `elements` does not
    /// match `shape`.
    pub fn from_elements<T: Element>(
        shape: ArrayShape,
        elements: Vec<T>,
    ) -> Result<Self, ArrayDataError> {
        let expected = shape.iter().product::<u64>();
        if elements.len() as u64 != expected {
            return Err(ArrayDataError::WrongElementCount {
                shape,
                expected,
                actual: elements.len() as u64,
            });
        }
        Ok(Self::Elements {
            shape,
            data_type: T::DATA_TYPE,
            bytes: bytemuck::allocation::try_cast_vec(elements)
                .unwrap_or_else(|(_err, elements)| bytemuck::cast_slice(&elements).to_vec()),
            chunk_shape: None,
        })
    }

    /// Attach the chunk shape the data originates from, e.g. the chunk shape
    /// of a source dataset.
    #[must_use]
    pub fn with_chunk_shape(mut self, hint: ArrayShape) -> Self {
        if let Self::Elements { chunk_shape, .. } = &mut self {
            *chunk_shape = Some(hint);
        }
        self
    }

    /// The array shape of the data.
    ///
    /// # Errors
    /// Returns an [`ArrayDataError`] if nested data is ragged.
    pub fn shape(&self) -> Result<ArrayShape, ArrayDataError> {
        match self {
            Self::Elements { shape, .. } => Ok(shape.clone()),
            Self::Nested(value) => Ok(parse_nested(value)?.0),
        }
    }

    /// The data type of the data. Untyped nested data resolves to `float64`.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Elements { data_type, .. } => *data_type,
            Self::Nested(_) => DataType::Float64,
        }
    }

    /// The chunk shape hint of the data, if any.
    #[must_use]
    pub fn chunk_shape(&self) -> Option<&ArrayShape> {
        match self {
            Self::Elements { chunk_shape, .. } => chunk_shape.as_ref(),
            Self::Nested(_) => None,
        }
    }
}

impl From<serde_json::Value> for ArrayData {
    fn from(value: serde_json::Value) -> Self {
        Self::Nested(value)
    }
}

/// Parse a nested sequence into its shape and a flat row-major `f64` buffer.
pub(crate) fn parse_nested(
    value: &serde_json::Value,
) -> Result<(ArrayShape, Vec<f64>), ArrayDataError> {
    let mut shape = ArrayShape::new();
    let mut node = value;
    loop {
        match node {
            serde_json::Value::Array(items) => {
                shape.push(items.len() as u64);
                match items.first() {
                    Some(first) => node = first,
                    None => break,
                }
            }
            _ => break,
        }
    }
    if shape.is_empty() {
        return Err(ArrayDataError::NotASequence);
    }

    let mut values = Vec::with_capacity(shape.iter().product::<u64>() as usize);
    collect_values(value, &shape, 0, &mut values)?;
    Ok((shape, values))
}

fn collect_values(
    value: &serde_json::Value,
    shape: &[u64],
    depth: usize,
    out: &mut Vec<f64>,
) -> Result<(), ArrayDataError> {
    if depth == shape.len() {
        out.push(value.as_f64().ok_or(ArrayDataError::NotNumeric)?);
        return Ok(());
    }
    match value {
        serde_json::Value::Array(items) if items.len() as u64 == shape[depth] => {
            for item in items {
                collect_values(item, shape, depth + 1, out)?;
            }
            Ok(())
        }
        _ => Err(ArrayDataError::Ragged(depth)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn elements_shape_check() {
        assert!(ArrayData::from_elements(vec![2, 3], vec![0u8; 6]).is_ok());
        assert!(ArrayData::from_elements(vec![2, 3], vec![0u8; 5]).is_err());
        let data = ArrayData::from_elements(vec![2], vec![1.0f32, 2.0]).unwrap();
        assert_eq!(data.data_type(), DataType::Float32);
        assert_eq!(data.shape().unwrap(), vec![2]);
        assert!(data.chunk_shape().is_none());
        let data = data.with_chunk_shape(vec![1]);
        assert_eq!(data.chunk_shape(), Some(&vec![1]));
    }

    #[test]
    fn nested_data_type_is_float64() {
        assert_eq!(
            ArrayData::from(json!([[1, 2], [3, 4]])).data_type(),
            DataType::Float64
        );
    }

    #[test]
    fn nested_parse() {
        let (shape, values) = parse_nested(&json!([[1, 2, 3], [4, 5, 6]])).unwrap();
        assert_eq!(shape, vec![2, 3]);
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn nested_rejects_ragged_and_non_numeric() {
        assert!(matches!(
            parse_nested(&json!([[1, 2], [3]])),
            Err(ArrayDataError::Ragged(1))
        ));
        assert!(matches!(
            parse_nested(&json!([[1, 2], [3, "x"]])),
            Err(ArrayDataError::NotNumeric)
        ));
        assert!(matches!(
            parse_nested(&json!(5)),
            Err(ArrayDataError::NotASequence)
        ));
    }
}
