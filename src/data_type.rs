//! Dataset data types.
//!
//! The supported element types are a closed set: signed/unsigned integers of
//! 8 to 64 bits and IEEE floats of 32/64 bits. Each has a zarr (v2) dtype
//! string and an N5 `dataType` name.

use thiserror::Error;

use crate::fill_value::FillValue;

/// The element type of a dataset.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DataType {
    /// `int8` (zarr `|i1`).
    Int8,
    /// `int16` (zarr `<i2`).
    Int16,
    /// `int32` (zarr `<i4`).
    Int32,
    /// `int64` (zarr `<i8`).
    Int64,
    /// `uint8` (zarr `|u1`).
    UInt8,
    /// `uint16` (zarr `<u2`).
    UInt16,
    /// `uint32` (zarr `<u4`).
    UInt32,
    /// `uint64` (zarr `<u8`).
    UInt64,
    /// `float32` (zarr `<f4`).
    Float32,
    /// `float64` (zarr `<f8`).
    Float64,
}

/// An unsupported data type error.
#[derive(Clone, Debug, Error)]
#[error("data type {0} is not supported")]
pub struct UnsupportedDataTypeError(String);

/// An incompatible fill value error.
#[derive(Clone, Debug, Error)]
#[error("fill value {1} is incompatible with data type {0}")]
pub struct IncompatibleFillValueError(&'static str, serde_json::Value);

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// All supported data types, in a fixed order.
pub const ALL_DATA_TYPES: [DataType; 10] = [
    DataType::Int8,
    DataType::Int16,
    DataType::Int32,
    DataType::Int64,
    DataType::UInt8,
    DataType::UInt16,
    DataType::UInt32,
    DataType::UInt64,
    DataType::Float32,
    DataType::Float64,
];

impl DataType {
    /// The size of an element in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// The name of the data type. Matches the N5 `dataType` metadata string.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
        }
    }

    /// The zarr (v2) dtype string: little-endian, with the `|` byte-order
    /// marker for single-byte types.
    #[must_use]
    pub const fn zarr_dtype(&self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::Int16 => "<i2",
            Self::Int32 => "<i4",
            Self::Int64 => "<i8",
            Self::UInt8 => "|u1",
            Self::UInt16 => "<u2",
            Self::UInt32 => "<u4",
            Self::UInt64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }

    /// Parse an N5 `dataType` name.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `name` is not a supported data type.
    pub fn from_name(name: &str) -> Result<Self, UnsupportedDataTypeError> {
        ALL_DATA_TYPES
            .iter()
            .find(|data_type| data_type.name() == name)
            .copied()
            .ok_or_else(|| UnsupportedDataTypeError(name.to_string()))
    }

    /// Parse a zarr (v2) dtype string.
    ///
    /// Single-byte types are accepted with either the `|` or `<` byte-order
    /// marker. Big-endian (`>`) dtypes are not supported.
    ///
    /// # Errors
    /// Returns [`UnsupportedDataTypeError`] if `dtype` is not a supported data type.
    pub fn from_zarr_dtype(dtype: &str) -> Result<Self, UnsupportedDataTypeError> {
        let data_type = match dtype {
            "|i1" | "<i1" => Self::Int8,
            "<i2" => Self::Int16,
            "<i4" => Self::Int32,
            "<i8" => Self::Int64,
            "|u1" | "<u1" => Self::UInt8,
            "<u2" => Self::UInt16,
            "<u4" => Self::UInt32,
            "<u8" => Self::UInt64,
            "<f4" => Self::Float32,
            "<f8" => Self::Float64,
            _ => return Err(UnsupportedDataTypeError(dtype.to_string())),
        };
        Ok(data_type)
    }

    /// The all-zero fill value of this data type.
    #[must_use]
    pub fn default_fill_value(&self) -> FillValue {
        FillValue::new(vec![0u8; self.size()])
    }

    /// Create a fill value from JSON metadata (a number, or `NaN`/`Infinity`
    /// strings for the float types).
    ///
    /// # Errors
    /// Returns [`IncompatibleFillValueError`] if `value` cannot represent an
    /// element of this data type.
    pub fn fill_value_from_json(
        &self,
        value: &serde_json::Value,
    ) -> Result<FillValue, IncompatibleFillValueError> {
        let err = || IncompatibleFillValueError(self.name(), value.clone());
        match self {
            Self::Int8 => int_fill_value(value).map(|v: i8| FillValue::from(v)),
            Self::Int16 => int_fill_value(value).map(|v: i16| FillValue::from(v)),
            Self::Int32 => int_fill_value(value).map(|v: i32| FillValue::from(v)),
            Self::Int64 => int_fill_value(value).map(|v: i64| FillValue::from(v)),
            Self::UInt8 => int_fill_value(value).map(|v: u8| FillValue::from(v)),
            Self::UInt16 => int_fill_value(value).map(|v: u16| FillValue::from(v)),
            Self::UInt32 => int_fill_value(value).map(|v: u32| FillValue::from(v)),
            Self::UInt64 => int_fill_value(value).map(|v: u64| FillValue::from(v)),
            Self::Float32 => float_fill_value(value).map(|v| FillValue::from(v as f32)),
            Self::Float64 => float_fill_value(value).map(FillValue::from),
        }
        .ok_or_else(err)
    }

    /// Convert a fill value of this data type to JSON metadata.
    ///
    /// # Panics
    /// Panics if the fill value size does not match the data type size.
    #[must_use]
    pub fn fill_value_to_json(&self, fill_value: &FillValue) -> serde_json::Value {
        assert_eq!(fill_value.size(), self.size());
        let bytes = fill_value.as_ne_bytes();
        match self {
            Self::Int8 => i8::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::Int16 => i16::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::Int32 => i32::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::Int64 => i64::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::UInt8 => u8::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::UInt16 => u16::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::UInt32 => u32::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::UInt64 => u64::from_ne_bytes(bytes.try_into().unwrap()).into(),
            Self::Float32 => float_to_json(f64::from(f32::from_ne_bytes(bytes.try_into().unwrap()))),
            Self::Float64 => float_to_json(f64::from_ne_bytes(bytes.try_into().unwrap())),
        }
    }
}

fn int_fill_value<T: num::NumCast>(value: &serde_json::Value) -> Option<T> {
    match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                num::cast(int)
            } else {
                number.as_u64().and_then(num::cast)
            }
        }
        _ => None,
    }
}

fn float_fill_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(string) => match string.as_str() {
            "NaN" => Some(f64::NAN),
            "Infinity" => Some(f64::INFINITY),
            "-Infinity" => Some(f64::NEG_INFINITY),
            _ => None,
        },
        _ => None,
    }
}

fn float_to_json(float: f64) -> serde_json::Value {
    if float.is_nan() {
        "NaN".into()
    } else if float == f64::INFINITY {
        "Infinity".into()
    } else if float == f64::NEG_INFINITY {
        "-Infinity".into()
    } else {
        serde_json::Number::from_f64(float)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// A fixed-size element of a supported [`DataType`].
pub trait Element: bytemuck::Pod + num::NumCast {
    /// The data type corresponding to this element type.
    const DATA_TYPE: DataType;
}

macro_rules! impl_element {
    ($($t:ty => $dt:ident),*) => {
        $(
            impl Element for $t {
                const DATA_TYPE: DataType = DataType::$dt;
            }
        )*
    };
}

impl_element!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
    f32 => Float32, f64 => Float64
);

fn cast_vec<S: Element, D: Element>(bytes: &[u8]) -> Vec<u8> {
    let elements: &[S] = bytemuck::cast_slice(bytes);
    let cast: Vec<D> = elements
        .iter()
        .map(|&element| num::cast(element).unwrap_or_else(D::zeroed))
        .collect();
    bytemuck::cast_slice(&cast).to_vec()
}

macro_rules! cast_to {
    ($s:ty, $to:expr, $bytes:expr) => {
        match $to {
            DataType::Int8 => cast_vec::<$s, i8>($bytes),
            DataType::Int16 => cast_vec::<$s, i16>($bytes),
            DataType::Int32 => cast_vec::<$s, i32>($bytes),
            DataType::Int64 => cast_vec::<$s, i64>($bytes),
            DataType::UInt8 => cast_vec::<$s, u8>($bytes),
            DataType::UInt16 => cast_vec::<$s, u16>($bytes),
            DataType::UInt32 => cast_vec::<$s, u32>($bytes),
            DataType::UInt64 => cast_vec::<$s, u64>($bytes),
            DataType::Float32 => cast_vec::<$s, f32>($bytes),
            DataType::Float64 => cast_vec::<$s, f64>($bytes),
        }
    };
}

/// Cast an element buffer from one data type to another.
///
/// Values outside the destination's representable range become zero.
/// A cast to the same data type is a copy.
///
/// # Panics
/// Panics if the length of `bytes` is not a multiple of the size of `from`.
#[must_use]
pub fn cast_elements(from: DataType, to: DataType, bytes: &[u8]) -> Vec<u8> {
    assert_eq!(bytes.len() % from.size(), 0);
    match from {
        DataType::Int8 => cast_to!(i8, to, bytes),
        DataType::Int16 => cast_to!(i16, to, bytes),
        DataType::Int32 => cast_to!(i32, to, bytes),
        DataType::Int64 => cast_to!(i64, to, bytes),
        DataType::UInt8 => cast_to!(u8, to, bytes),
        DataType::UInt16 => cast_to!(u16, to, bytes),
        DataType::UInt32 => cast_to!(u32, to, bytes),
        DataType::UInt64 => cast_to!(u64, to, bytes),
        DataType::Float32 => cast_to!(f32, to, bytes),
        DataType::Float64 => cast_to!(f64, to, bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_names_round_trip() {
        for data_type in ALL_DATA_TYPES {
            assert_eq!(DataType::from_name(data_type.name()).unwrap(), data_type);
            assert_eq!(
                DataType::from_zarr_dtype(data_type.zarr_dtype()).unwrap(),
                data_type
            );
        }
        assert!(DataType::from_name("float16").is_err());
        assert!(DataType::from_zarr_dtype(">f4").is_err());
    }

    #[test]
    fn fill_value_json_round_trip() {
        let fill = DataType::Float32
            .fill_value_from_json(&serde_json::json!(1.5))
            .unwrap();
        assert_eq!(fill, FillValue::from(1.5f32));
        assert_eq!(
            DataType::Float32.fill_value_to_json(&fill),
            serde_json::json!(1.5)
        );

        let nan = DataType::Float64
            .fill_value_from_json(&serde_json::json!("NaN"))
            .unwrap();
        assert_eq!(DataType::Float64.fill_value_to_json(&nan), serde_json::json!("NaN"));

        assert!(DataType::UInt8
            .fill_value_from_json(&serde_json::json!(-1))
            .is_err());
    }

    #[test]
    fn cast_elements_between_types() {
        let floats: Vec<f32> = vec![0.0, 1.0, 2.0, 250.0];
        let bytes = bytemuck::cast_slice(&floats).to_vec();
        let cast = cast_elements(DataType::Float32, DataType::UInt8, &bytes);
        assert_eq!(cast, vec![0u8, 1, 2, 250]);
        let back = cast_elements(DataType::UInt8, DataType::Float64, &cast);
        let doubles: &[f64] = bytemuck::cast_slice(&back);
        assert_eq!(doubles, &[0.0, 1.0, 2.0, 250.0]);
    }
}
