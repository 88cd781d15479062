#![allow(missing_docs)]

use std::sync::Arc;

use zn5::data_type::DataType;
use zn5::dataset::{Dataset, DatasetBuilder};
use zn5::format::DataFormat;
use zn5::rechunk::{rechunk, RechunkOptions};
use zn5::storage::FilesystemStore;

fn source_dataset(
    tmp: &tempfile::TempDir,
    format: DataFormat,
) -> (Arc<FilesystemStore>, Dataset<FilesystemStore>, Vec<u8>) {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(FilesystemStore::new(tmp.path().join("src")).unwrap());
    let dataset = DatasetBuilder::new(vec![60, 60, 60])
        .data_type(DataType::UInt8)
        .chunk_shape(vec![10, 10, 10])
        .build(store.clone(), format, "/data")
        .unwrap();
    let elements: Vec<u8> = (0..60 * 60 * 60).map(|i| (i % 251) as u8).collect();
    dataset
        .write_region_elements(&dataset.subset_all(), &elements)
        .unwrap();
    (store, dataset, elements)
}

#[test]
fn rechunk_fidelity_across_threads_and_blocks() {
    let block_shapes = [None, Some(vec![40, 40, 40]), Some(vec![60, 60, 60])];
    for num_threads in [1, 8] {
        for block_shape in &block_shapes {
            let tmp = tempfile::TempDir::new().unwrap();
            let (_store, source, elements) = source_dataset(&tmp, DataFormat::Zarr);
            let dest_store = Arc::new(FilesystemStore::new(tmp.path().join("dst")).unwrap());
            let options = RechunkOptions {
                block_shape: block_shape.clone(),
                num_threads,
                ..RechunkOptions::default()
            };
            let dest = rechunk(
                &source,
                dest_store,
                DataFormat::Zarr,
                "/data",
                vec![20, 20, 20],
                &options,
            )
            .unwrap();

            assert_eq!(dest.chunk_shape(), &vec![20, 20, 20]);
            assert_eq!(
                dest.read_all_elements::<u8>().unwrap(),
                elements,
                "threads {num_threads}, blocks {block_shape:?}"
            );
        }
    }
}

#[test]
fn rechunk_across_formats() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_store, source, elements) = source_dataset(&tmp, DataFormat::N5);
    let dest_store = Arc::new(FilesystemStore::new(tmp.path().join("dst")).unwrap());
    let dest = rechunk(
        &source,
        dest_store.clone(),
        DataFormat::Zarr,
        "/data",
        vec![17, 23, 60],
        &RechunkOptions::default(),
    )
    .unwrap();
    assert_eq!(dest.format(), DataFormat::Zarr);
    assert_eq!(dest.read_all_elements::<u8>().unwrap(), elements);

    let reopened: Dataset<FilesystemStore> = Dataset::open(dest_store, "/data").unwrap();
    assert_eq!(reopened.chunk_shape(), &vec![17, 23, 60]);
}

#[test]
fn rechunk_with_data_type_cast() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_store, source, elements) = source_dataset(&tmp, DataFormat::Zarr);
    let dest_store = Arc::new(FilesystemStore::new(tmp.path().join("dst")).unwrap());
    let options = RechunkOptions {
        data_type: Some(DataType::Float64),
        num_threads: 4,
        ..RechunkOptions::default()
    };
    let dest = rechunk(
        &source,
        dest_store,
        DataFormat::Zarr,
        "/data",
        vec![30, 30, 30],
        &options,
    )
    .unwrap();

    assert_eq!(dest.data_type(), DataType::Float64);
    let cast: Vec<f64> = dest.read_all_elements().unwrap();
    assert!(std::iter::zip(&cast, &elements).all(|(&c, &e)| c == f64::from(e)));
}

#[test]
fn rechunk_with_compression_change() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_store, source, elements) = source_dataset(&tmp, DataFormat::Zarr);
    assert!(source.compressor().is_none());

    let dest_store = Arc::new(FilesystemStore::new(tmp.path().join("dst")).unwrap());
    let mut configuration = serde_json::Map::default();
    configuration.insert("level".to_string(), 5.into());
    let options = RechunkOptions {
        compressor: Some(Some(("zlib".to_string(), configuration))),
        ..RechunkOptions::default()
    };
    let dest = rechunk(
        &source,
        dest_store,
        DataFormat::Zarr,
        "/data",
        vec![20, 20, 20],
        &options,
    )
    .unwrap();

    assert_eq!(dest.compressor().unwrap().0, "zlib");
    assert_eq!(dest.read_all_elements::<u8>().unwrap(), elements);
}

#[test]
fn rechunk_preserves_fill_value_and_attributes() {
    let tmp = tempfile::TempDir::new().unwrap();
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(FilesystemStore::new(tmp.path().join("src")).unwrap());
    let mut attributes = serde_json::Map::default();
    attributes.insert("stage".to_string(), "raw".into());
    let source = DatasetBuilder::new(vec![50])
        .data_type(DataType::Int16)
        .chunk_shape(vec![10])
        .fill_value(-1)
        .attributes(attributes.clone())
        .build(store, DataFormat::Zarr, "/data")
        .unwrap();
    // Only one chunk is stored; the rest stays at the fill value.
    source
        .write_region_elements::<i16>(&zn5::array_subset::ArraySubset::new_with_ranges(&[10..20]), &[4i16; 10])
        .unwrap();

    let dest_store = Arc::new(FilesystemStore::new(tmp.path().join("dst")).unwrap());
    let dest = rechunk(
        &source,
        dest_store,
        DataFormat::Zarr,
        "/data",
        vec![25],
        &RechunkOptions::default(),
    )
    .unwrap();

    assert_eq!(dest.attributes(), &attributes);
    let elements = dest.read_all_elements::<i16>().unwrap();
    assert!(elements[..10].iter().all(|&value| value == -1));
    assert!(elements[10..20].iter().all(|&value| value == 4));
    assert!(elements[20..].iter().all(|&value| value == -1));
}
