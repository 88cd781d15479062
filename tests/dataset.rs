#![allow(missing_docs)]

use std::sync::Arc;

use zn5::array_subset::ArraySubset;
use zn5::data_type::{DataType, Element};
use zn5::dataset::{Dataset, DatasetBuilder, DatasetError};
use zn5::format::DataFormat;
use zn5::storage::FilesystemStore;

fn init() -> tempfile::TempDir {
    let _ = env_logger::builder().is_test(true).try_init();
    tempfile::TempDir::new().unwrap()
}

fn roundtrip<T: Element + PartialEq + std::fmt::Debug>(format: DataFormat) {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![20, 21])
        .data_type(T::DATA_TYPE)
        .chunk_shape(vec![8, 5])
        .build(store.clone(), format, "/data")
        .unwrap();

    let elements: Vec<T> = (0..20 * 21)
        .map(|i| num::cast(i % 97).unwrap())
        .collect();
    dataset
        .write_region_elements(&dataset.subset_all(), &elements)
        .unwrap();

    // The full extent reads back identically after reopening.
    let reopened: Dataset<FilesystemStore> = Dataset::open(store, "/data").unwrap();
    assert_eq!(reopened.data_type(), T::DATA_TYPE);
    assert_eq!(reopened.read_all_elements::<T>().unwrap(), elements);

    // An unaligned interior region reassembles from multiple chunks.
    let region = ArraySubset::new_with_ranges(&[3..18, 2..20]);
    let read: Vec<T> = reopened.read_region_elements(&region).unwrap();
    let expected: Vec<T> = (3..18)
        .flat_map(|row| (2..20).map(move |col| num::cast((row * 21 + col) % 97).unwrap()))
        .collect();
    assert_eq!(read, expected);
}

#[test]
fn roundtrip_all_data_types_zarr() {
    roundtrip::<i8>(DataFormat::Zarr);
    roundtrip::<i16>(DataFormat::Zarr);
    roundtrip::<i32>(DataFormat::Zarr);
    roundtrip::<i64>(DataFormat::Zarr);
    roundtrip::<u8>(DataFormat::Zarr);
    roundtrip::<u16>(DataFormat::Zarr);
    roundtrip::<u32>(DataFormat::Zarr);
    roundtrip::<u64>(DataFormat::Zarr);
    roundtrip::<f32>(DataFormat::Zarr);
    roundtrip::<f64>(DataFormat::Zarr);
}

#[test]
fn roundtrip_all_data_types_n5() {
    roundtrip::<i8>(DataFormat::N5);
    roundtrip::<i16>(DataFormat::N5);
    roundtrip::<i32>(DataFormat::N5);
    roundtrip::<i64>(DataFormat::N5);
    roundtrip::<u8>(DataFormat::N5);
    roundtrip::<u16>(DataFormat::N5);
    roundtrip::<u32>(DataFormat::N5);
    roundtrip::<u64>(DataFormat::N5);
    roundtrip::<f32>(DataFormat::N5);
    roundtrip::<f64>(DataFormat::N5);
}

#[test]
fn roundtrip_compressed() {
    for format in [DataFormat::Zarr, DataFormat::N5] {
        for identifier in ["gzip", "bzip2", "zstd"] {
            let tmp = init();
            let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
            let dataset = DatasetBuilder::new(vec![100, 100])
                .data_type(DataType::UInt16)
                .chunk_shape(vec![32, 32])
                .compressor(identifier, serde_json::Map::default())
                .build(store, format, "/data")
                .unwrap();
            let elements: Vec<u16> = (0..100 * 100).map(|i| (i % 321) as u16).collect();
            dataset
                .write_region_elements(&dataset.subset_all(), &elements)
                .unwrap();
            assert_eq!(
                dataset.read_all_elements::<u16>().unwrap(),
                elements,
                "{format} {identifier}"
            );
        }
    }
}

#[test]
fn fresh_dataset_reads_fill_value() {
    for format in [DataFormat::Zarr, DataFormat::N5] {
        let tmp = init();
        let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
        let dataset = DatasetBuilder::new(vec![100, 100, 100])
            .data_type(DataType::Float32)
            .build(store, format, "/data")
            .unwrap();
        let elements = dataset.read_all_elements::<f32>().unwrap();
        assert_eq!(elements.len(), 1_000_000);
        assert!(elements.iter().all(|&value| value == 0.0));
        assert!(!dataset.chunk_exists(&[0, 0, 0]).unwrap());
    }
}

#[test]
fn explicit_fill_value_zarr() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![10])
        .data_type(DataType::Int32)
        .fill_value(-7)
        .build(store.clone(), DataFormat::Zarr, "/data")
        .unwrap();
    dataset
        .write_region_elements::<i32>(&ArraySubset::new_with_ranges(&[2..4]), &[1, 2])
        .unwrap();

    let reopened: Dataset<FilesystemStore> = Dataset::open(store, "/data").unwrap();
    assert_eq!(
        reopened.read_all_elements::<i32>().unwrap(),
        vec![-7, -7, 1, 2, -7, -7, -7, -7, -7, -7]
    );
}

#[test]
fn n5_fill_value_resets_on_reopen() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![10])
        .data_type(DataType::Int32)
        .fill_value(-7)
        .build(store.clone(), DataFormat::N5, "/data")
        .unwrap();
    dataset
        .write_region_elements::<i32>(&ArraySubset::new_with_ranges(&[2..4]), &[1, 2])
        .unwrap();
    assert_eq!(dataset.fill_value().as_ne_bytes(), &(-7i32).to_ne_bytes()[..]);

    // The n5 metadata document has no fill value field, so a reopened
    // dataset falls back to zero for unwritten chunks.
    let reopened: Dataset<FilesystemStore> = Dataset::open(store, "/data").unwrap();
    assert_eq!(
        reopened.read_all_elements::<i32>().unwrap(),
        vec![0, 0, 1, 2, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn partial_write_preserves_neighbours() {
    for format in [DataFormat::Zarr, DataFormat::N5] {
        let tmp = init();
        let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
        let dataset = DatasetBuilder::new(vec![10, 10])
            .data_type(DataType::UInt8)
            .chunk_shape(vec![6, 6])
            .build(store, format, "/data")
            .unwrap();
        dataset
            .write_region_elements::<u8>(&dataset.subset_all(), &[1u8; 100])
            .unwrap();
        // Straddles all four chunks.
        dataset
            .write_region_elements::<u8>(&ArraySubset::new_with_ranges(&[4..8, 5..9]), &[9u8; 16])
            .unwrap();

        let elements = dataset.read_all_elements::<u8>().unwrap();
        for row in 0..10 {
            for col in 0..10 {
                let expected = if (4..8).contains(&row) && (5..9).contains(&col) {
                    9
                } else {
                    1
                };
                assert_eq!(elements[row * 10 + col], expected, "({row}, {col})");
            }
        }
    }
}

#[test]
fn out_of_range_region_rejected_before_io() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![10, 10])
        .data_type(DataType::UInt8)
        .chunk_shape(vec![4, 4])
        .build(store, DataFormat::Zarr, "/data")
        .unwrap();

    let region = ArraySubset::new_with_ranges(&[8..12, 0..4]);
    assert!(matches!(
        dataset.read_region(&region),
        Err(DatasetError::InvalidRegion { .. })
    ));
    assert!(matches!(
        dataset.write_region_elements::<u8>(&region, &[0u8; 16]),
        Err(DatasetError::InvalidRegion { .. })
    ));
    // Nothing was written.
    for chunk_row in 0..3 {
        assert!(!dataset.chunk_exists(&[chunk_row, 0]).unwrap());
    }
}

#[test]
fn element_type_mismatch_rejected() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![4])
        .data_type(DataType::UInt8)
        .build(store, DataFormat::Zarr, "/data")
        .unwrap();
    assert!(matches!(
        dataset.read_all_elements::<f32>(),
        Err(DatasetError::IncompatibleElementType { .. })
    ));
}

#[test]
fn zarr_on_disk_layout() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![20, 20])
        .data_type(DataType::UInt8)
        .chunk_shape(vec![10, 10])
        .build(store, DataFormat::Zarr, "/volumes/raw")
        .unwrap();
    dataset
        .write_region_elements::<u8>(&ArraySubset::new_with_ranges(&[10..20, 0..10]), &[3u8; 100])
        .unwrap();

    let metadata_path = tmp.path().join("volumes/raw/.zarray");
    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(metadata_path).unwrap()).unwrap();
    assert_eq!(document["zarr_format"], 2);
    assert_eq!(document["shape"], serde_json::json!([20, 20]));
    assert_eq!(document["dtype"], "|u1");
    assert_eq!(document["order"], "C");

    // Chunk keys are dot separated grid indices.
    assert!(tmp.path().join("volumes/raw/1.0").is_file());
}

#[test]
fn n5_on_disk_layout() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![20, 30])
        .data_type(DataType::UInt16)
        .chunk_shape(vec![10, 15])
        .build(store, DataFormat::N5, "/volumes/raw")
        .unwrap();
    dataset
        .write_region_elements::<u16>(
            &ArraySubset::new_with_ranges(&[10..20, 0..15]),
            &[3u16; 150],
        )
        .unwrap();

    let metadata_path = tmp.path().join("volumes/raw/attributes.json");
    let document: serde_json::Value =
        serde_json::from_slice(&std::fs::read(metadata_path).unwrap()).unwrap();
    // Reversed axis order on disk.
    assert_eq!(document["dimensions"], serde_json::json!([30, 20]));
    assert_eq!(document["blockSize"], serde_json::json!([15, 10]));
    assert_eq!(document["dataType"], "uint16");

    // Chunk keys are nested paths with reversed indices.
    assert!(tmp.path().join("volumes/raw/0/1").is_file());
}

#[test]
fn chunk_level_access() {
    let tmp = init();
    let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
    let dataset = DatasetBuilder::new(vec![10])
        .data_type(DataType::UInt8)
        .chunk_shape(vec![4])
        .build(store, DataFormat::Zarr, "/data")
        .unwrap();

    dataset.store_chunk(&[1], vec![1, 2, 3, 4]).unwrap();
    assert_eq!(dataset.retrieve_chunk(&[1]).unwrap(), vec![1, 2, 3, 4]);
    assert!(dataset.retrieve_chunk_if_exists(&[0]).unwrap().is_none());
    assert_eq!(dataset.retrieve_chunk(&[0]).unwrap(), vec![0; 4]);

    // The trailing chunk is truncated to two elements.
    assert!(dataset.store_chunk(&[2], vec![0; 4]).is_err());
    dataset.store_chunk(&[2], vec![8, 9]).unwrap();
    assert_eq!(dataset.retrieve_chunk(&[2]).unwrap(), vec![8, 9]);

    dataset.erase_chunk(&[1]).unwrap();
    assert!(!dataset.chunk_exists(&[1]).unwrap());
    assert!(dataset.store_chunk(&[3], vec![0; 1]).is_err());
}

#[test]
fn attributes_roundtrip() {
    for format in [DataFormat::Zarr, DataFormat::N5] {
        let tmp = init();
        let store = Arc::new(FilesystemStore::new(tmp.path()).unwrap());
        let mut attributes = serde_json::Map::default();
        attributes.insert("resolution".to_string(), serde_json::json!([4.0, 4.0]));
        let mut dataset = DatasetBuilder::new(vec![10, 10])
            .data_type(DataType::UInt8)
            .attributes(attributes.clone())
            .build(store.clone(), format, "/data")
            .unwrap();

        let reopened: Dataset<FilesystemStore> = Dataset::open(store.clone(), "/data").unwrap();
        assert_eq!(reopened.attributes(), &attributes);

        attributes.insert("offset".to_string(), serde_json::json!([0, 8]));
        dataset.set_attributes(attributes.clone()).unwrap();
        let reopened: Dataset<FilesystemStore> = Dataset::open(store, "/data").unwrap();
        assert_eq!(reopened.attributes(), &attributes);
        // Metadata survives the attribute rewrite.
        assert_eq!(reopened.shape(), &vec![10, 10]);
    }
}
