//! Rechunking datasets.
//!
//! [`rechunk`] copies a dataset into a new dataset with a different chunk
//! shape, optionally changing the format, data type, or compression along the
//! way. The copy proceeds in blocks aligned to the destination chunk grid, so
//! no two blocks touch a destination chunk and blocks can run concurrently
//! and be retried.

use std::sync::Arc;

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use thiserror::Error;

use crate::array_subset::ArrayShape;
use crate::codec::CodecConfiguration;
use crate::data_type::{cast_elements, DataType};
use crate::dataset::{Dataset, DatasetBuilder, DatasetCreateError, DatasetError};
use crate::fill_value::FillValue;
use crate::format::DataFormat;
use crate::storage::{ReadableStorageTraits, ReadableWritableStorageTraits};

/// Options for [`rechunk`].
#[derive(Clone, Debug)]
pub struct RechunkOptions {
    /// The shape of the copy blocks. Must be an integer multiple of the
    /// destination chunk shape per axis. Defaults to the destination chunk
    /// shape.
    pub block_shape: Option<ArrayShape>,
    /// The number of worker threads. `0` uses the rayon default.
    pub num_threads: usize,
    /// Cast elements to this data type. Defaults to the source data type.
    pub data_type: Option<DataType>,
    /// Override the compression of the destination: `Some(Some(..))` for a
    /// specific codec, `Some(None)` for uncompressed. Defaults to the source
    /// compression.
    pub compressor: Option<Option<(String, CodecConfiguration)>>,
}

impl Default for RechunkOptions {
    fn default() -> Self {
        Self {
            block_shape: None,
            num_threads: 1,
            data_type: None,
            compressor: None,
        }
    }
}

/// A rechunk error.
#[derive(Debug, Error)]
pub enum RechunkError {
    /// A block shape not aligned to the destination chunk grid.
    #[error("block shape {block_shape:?} is not a multiple of the chunk shape {chunk_shape:?}")]
    UnalignedBlockShape {
        /// The requested block shape.
        block_shape: ArrayShape,
        /// The destination chunk shape.
        chunk_shape: ArrayShape,
    },
    /// Creating the destination dataset failed.
    #[error(transparent)]
    Create(#[from] DatasetCreateError),
    /// Reading a source block or writing a destination block failed.
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    /// The worker pool could not be built.
    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Copy `source` into a new dataset at `dest_path` with `chunk_shape`.
///
/// The alignment of the block shape is checked before any data is copied or
/// the destination is created. A failing block aborts the remaining work;
/// completed blocks stay valid.
///
/// # Errors
/// Returns a [`RechunkError`] if the block shape is unaligned, the
/// destination cannot be created, or a block copy fails.
pub fn rechunk<TSrc, TDst>(
    source: &Dataset<TSrc>,
    dest_storage: Arc<TDst>,
    dest_format: DataFormat,
    dest_path: &str,
    chunk_shape: ArrayShape,
    options: &RechunkOptions,
) -> Result<Dataset<TDst>, RechunkError>
where
    TSrc: ?Sized + ReadableStorageTraits,
    TDst: ?Sized + ReadableWritableStorageTraits,
{
    let block_shape = match &options.block_shape {
        Some(block_shape) => {
            if block_shape.len() != chunk_shape.len()
                || std::iter::zip(block_shape, &chunk_shape)
                    .any(|(&block, &chunk)| chunk == 0 || block == 0 || block % chunk != 0)
            {
                return Err(RechunkError::UnalignedBlockShape {
                    block_shape: block_shape.clone(),
                    chunk_shape,
                });
            }
            block_shape.clone()
        }
        None => chunk_shape.clone(),
    };

    let data_type = options.data_type.unwrap_or_else(|| source.data_type());
    let fill_value = FillValue::new(cast_elements(
        source.data_type(),
        data_type,
        source.fill_value().as_ne_bytes(),
    ));
    let compressor = match &options.compressor {
        Some(compressor) => compressor.clone(),
        None => source.compressor().cloned(),
    };

    let mut builder = DatasetBuilder::new(source.shape().clone());
    builder
        .data_type(data_type)
        .chunk_shape(chunk_shape)
        .fill_value(data_type.fill_value_to_json(&fill_value))
        .attributes(source.attributes().clone());
    match compressor {
        Some((identifier, configuration)) => builder.compressor(&identifier, configuration),
        None => builder.no_compressor(),
    };
    let dest = builder.build(dest_storage, dest_format, dest_path)?;

    let blocks: Vec<_> = source
        .subset_all()
        .chunks(&block_shape)
        .map_err(DatasetError::from)?
        .iter()
        .map(|(_, block_subset)| block_subset)
        .collect();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.num_threads)
        .build()?;
    pool.install(|| {
        blocks.par_iter().try_for_each(|block_subset| {
            let block = block_subset
                .bound(source.shape())
                .map_err(DatasetError::from)?;
            if block.is_empty() {
                return Ok(());
            }
            let bytes = source.read_region(&block)?;
            let bytes = if data_type == source.data_type() {
                bytes
            } else {
                cast_elements(source.data_type(), data_type, &bytes)
            };
            dest.write_region(&block, &bytes)?;
            Ok::<(), RechunkError>(())
        })
    })?;
    Ok(dest)
}
