//! Dataset creation defaults.

use crate::data_type::DataType;

/// Defaults applied when a dataset is created without an explicit chunk shape
/// or data type.
///
/// These are passed into [`DatasetBuilder`](crate::dataset::DatasetBuilder)
/// rather than held in global state, so independent callers can use different
/// defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateDefaults {
    /// The default chunk size per axis. A dataset dimension smaller than this is not split.
    pub chunk_size: u64,
    /// The data type used when neither an explicit data type nor typed data is given.
    pub data_type: DataType,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            data_type: DataType::Float32,
        }
    }
}

impl CreateDefaults {
    /// Return the default chunk shape for `shape`: `min(shape[d], chunk_size)` per axis.
    #[must_use]
    pub fn chunk_shape(&self, shape: &[u64]) -> Vec<u64> {
        shape.iter().map(|&s| s.min(self.chunk_size).max(1)).collect()
    }
}
