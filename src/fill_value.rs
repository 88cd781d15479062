//! Dataset fill values.
//!
//! A [`FillValue`] provides an element value for the portions of a dataset
//! that have never been written.

/// The fill value of a dataset.
///
/// Holds the native-endian byte representation of one element of the
/// dataset's data type.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FillValue(Vec<u8>);

impl core::fmt::Display for FillValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl From<Vec<u8>> for FillValue {
    fn from(value: Vec<u8>) -> Self {
        FillValue(value)
    }
}

macro_rules! impl_fill_value_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for FillValue {
                fn from(value: $t) -> Self {
                    FillValue(value.to_ne_bytes().to_vec())
                }
            }
        )*
    };
}

impl_fill_value_from!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl FillValue {
    /// Create a new fill value composed of `bytes`.
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> FillValue {
        FillValue(bytes)
    }

    /// Returns the size in bytes of the fill value.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.len()
    }

    /// Return the byte representation of the fill value.
    #[must_use]
    pub fn as_ne_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Check if `bytes` is entirely composed of the fill value.
    #[must_use]
    pub fn equals_all(&self, bytes: &[u8]) -> bool {
        bytes.len() % self.0.len() == 0
            && bytes
                .chunks_exact(self.0.len())
                .all(|element| element == self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_value_equals_all() {
        let fill = FillValue::from(1.5f32);
        assert_eq!(fill.size(), 4);
        let mut bytes = fill.as_ne_bytes().repeat(5);
        assert!(fill.equals_all(&bytes));
        bytes[9] ^= 0xff;
        assert!(!fill.equals_all(&bytes));
    }
}
