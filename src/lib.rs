//! A chunked N-dimensional array storage engine for the zarr (v2) and n5
//! on-disk formats.
//!
//! Datasets created or opened with this crate interoperate with the wider
//! zarr v2 and n5 ecosystems: metadata documents, chunk keys, and chunk blob
//! layouts are bit-compatible with what those tools read and write.
//!
//! ## Getting started
//! - [`dataset::Dataset`] and [`dataset::DatasetBuilder`] for creating,
//!   opening, reading and writing datasets.
//! - [`hierarchy::Container`] for format detection from a path extension and
//!   for groups.
//! - [`rechunk::rechunk`] for copying a dataset to a new chunk layout.
//!
//! ## Example
//! ```
//! # use std::sync::Arc;
//! use zn5::array_subset::ArraySubset;
//! use zn5::data_type::DataType;
//! use zn5::dataset::DatasetBuilder;
//! use zn5::hierarchy::Container;
//!
//! # let tmp = tempfile::TempDir::new()?;
//! let container = Container::create(tmp.path().join("example.zarr"))?;
//! let dataset = DatasetBuilder::new(vec![100, 100])
//!     .data_type(DataType::UInt8)
//!     .chunk_shape(vec![32, 32])
//!     .build(container.storage().clone(), container.format(), "/labels")?;
//!
//! let region = ArraySubset::new_with_ranges(&[10..20, 30..50]);
//! dataset.write_region_elements::<u8>(&region, &[1u8; 200])?;
//! assert_eq!(dataset.read_region_elements::<u8>(&region)?, vec![1u8; 200]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Crate features
//! Each compression codec is feature-gated and all are enabled by default:
//! `gzip` (also provides `zlib`), `bzip2`, and `zstd`. The `raw` passthrough
//! is always available.

#![warn(unused_variables)]
#![warn(dead_code)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![deny(clippy::missing_panics_doc)]

pub mod array_subset;
pub mod codec;
pub mod config;
pub mod data_type;
pub mod dataset;
pub mod fill_value;
pub mod format;
pub mod hierarchy;
pub mod metadata;
pub mod node;
pub mod rechunk;
pub mod storage;
