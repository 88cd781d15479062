//! Containers and groups.
//!
//! A [`Container`] is the root of an on-disk hierarchy, a directory whose
//! extension selects the format (`.zarr` or `.zr` for zarr, `.n5` for n5).
//! Within a container, nodes are either groups or datasets. A zarr group
//! carries a `.zgroup` marker; an n5 group is an `attributes.json` without a
//! `dimensions` key, with the root group additionally recording the n5
//! version.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;

use crate::dataset::{Dataset, DatasetCreateError};
use crate::format::DataFormat;
use crate::metadata::{MetadataError, ZarrGroupMetadata, N5_VERSION};
use crate::node::{NodePath, NodePathError};
use crate::storage::{
    FilesystemStore, FilesystemStoreCreateError, ListableStorageTraits, ReadableStorageTraits,
    ReadableWritableStorageTraits, StorageError,
};

/// The kind of a node within a container.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum NodeType {
    /// A group, holding other nodes.
    #[display("group")]
    Group,
    /// A dataset.
    #[display("dataset")]
    Dataset,
}

/// A hierarchy error.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A container path without a recognised extension.
    #[error("path {} has no recognised container extension (.zarr, .zr, .n5)", .0.display())]
    UnknownExtension(PathBuf),
    /// A path that does not hold a container.
    #[error("no container at {}", .0.display())]
    NotAContainer(PathBuf),
    /// A container that already exists.
    #[error("container already exists at {}", .0.display())]
    ContainerExists(PathBuf),
    /// A node that already exists.
    #[error("node {_0} already exists")]
    NodeExists(NodePath),
    /// A node that does not exist.
    #[error("node {_0} does not exist")]
    NodeNotFound(NodePath),
    /// A node that is not a group.
    #[error("node {_0} is not a group")]
    NotAGroup(NodePath),
    /// A storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// A store creation error.
    #[error(transparent)]
    StoreCreate(#[from] FilesystemStoreCreateError),
    /// An invalid node path.
    #[error(transparent)]
    NodePath(#[from] NodePathError),
    /// A metadata error.
    #[error(transparent)]
    Metadata(#[from] MetadataError),
    /// A dataset open error.
    #[error(transparent)]
    Dataset(#[from] DatasetCreateError),
}

/// A container, the root group of an on-disk hierarchy.
pub struct Container<TStorage: ?Sized = FilesystemStore> {
    storage: Arc<TStorage>,
    format: DataFormat,
}

impl Container<FilesystemStore> {
    /// Create a new container at `path`, with the format chosen by the path
    /// extension.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the extension is unrecognised or the
    /// container already exists.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, HierarchyError> {
        let path = path.as_ref();
        let format = DataFormat::from_path_extension(path)
            .ok_or_else(|| HierarchyError::UnknownExtension(path.to_path_buf()))?;
        let storage = Arc::new(FilesystemStore::new(path)?);
        let container = Self { storage, format };
        if container.root_marker_exists()? {
            return Err(HierarchyError::ContainerExists(path.to_path_buf()));
        }
        container.write_group_marker(&NodePath::root())?;
        Ok(container)
    }

    /// Open an existing container at `path`, with the format chosen by the
    /// path extension.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the extension is unrecognised or there
    /// is no container at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, HierarchyError> {
        let path = path.as_ref();
        let format = DataFormat::from_path_extension(path)
            .ok_or_else(|| HierarchyError::UnknownExtension(path.to_path_buf()))?;
        if !path.is_dir() {
            return Err(HierarchyError::NotAContainer(path.to_path_buf()));
        }
        let storage = Arc::new(FilesystemStore::new(path)?);
        let container = Self { storage, format };
        if !container.root_marker_exists()? {
            return Err(HierarchyError::NotAContainer(path.to_path_buf()));
        }
        Ok(container)
    }

    /// Open an existing container at `path`, or create it if absent.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if the extension is unrecognised or
    /// storage fails.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self, HierarchyError> {
        match Self::open(path.as_ref()) {
            Err(HierarchyError::NotAContainer(_)) => Self::create(path),
            container => container,
        }
    }
}

impl<TStorage: ?Sized> Container<TStorage> {
    /// The store of the container.
    #[must_use]
    pub fn storage(&self) -> &Arc<TStorage> {
        &self.storage
    }

    /// The on-disk format of the container.
    #[must_use]
    pub fn format(&self) -> DataFormat {
        self.format
    }
}

impl<TStorage: ?Sized + ReadableStorageTraits + ListableStorageTraits> Container<TStorage> {
    /// The kind of the node at `path`, or [`None`] if there is none.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if `path` is invalid or storage fails.
    pub fn node_type(&self, path: &str) -> Result<Option<NodeType>, HierarchyError> {
        let node_path = NodePath::new(path)?;
        match self.format {
            DataFormat::Zarr => {
                if self
                    .storage
                    .exists(&node_path.key(self.format.array_metadata_filename()))?
                {
                    Ok(Some(NodeType::Dataset))
                } else if self
                    .storage
                    .exists(&node_path.key(self.format.group_metadata_filename()))?
                {
                    Ok(Some(NodeType::Group))
                } else {
                    Ok(None)
                }
            }
            DataFormat::N5 => {
                let key = node_path.key(self.format.attributes_filename());
                match self.storage.get(&key)? {
                    None => {
                        // The Java n5 writer leaves groups as bare
                        // directories without an attributes.json.
                        let listing = self.storage.list_dir(&node_path.prefix())?;
                        if listing.keys.is_empty() && listing.prefixes.is_empty() {
                            Ok(None)
                        } else {
                            Ok(Some(NodeType::Group))
                        }
                    }
                    Some(document) => {
                        let value: serde_json::Value =
                            serde_json::from_slice(&document).map_err(MetadataError::from)?;
                        if value.get("dimensions").is_some() {
                            Ok(Some(NodeType::Dataset))
                        } else {
                            Ok(Some(NodeType::Group))
                        }
                    }
                }
            }
        }
    }

    /// Returns true if the node at `path` is a group.
    ///
    /// # Errors
    /// See [`Container::node_type`].
    pub fn is_group(&self, path: &str) -> Result<bool, HierarchyError> {
        Ok(self.node_type(path)? == Some(NodeType::Group))
    }

    /// Returns true if the node at `path` is a dataset.
    ///
    /// # Errors
    /// See [`Container::node_type`].
    pub fn is_dataset(&self, path: &str) -> Result<bool, HierarchyError> {
        Ok(self.node_type(path)? == Some(NodeType::Dataset))
    }

    /// Open the dataset at `path`.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if there is no dataset at `path` or its
    /// metadata is unsupported.
    pub fn open_dataset(&self, path: &str) -> Result<Dataset<TStorage>, HierarchyError> {
        Ok(Dataset::open_with_format(
            self.storage.clone(),
            path,
            self.format,
        )?)
    }

    fn root_marker_exists(&self) -> Result<bool, StorageError> {
        self.storage
            .exists(&NodePath::root().key(self.format.group_metadata_filename()))
    }

    fn read_attributes(
        &self,
        node_path: &NodePath,
    ) -> Result<serde_json::Map<String, serde_json::Value>, HierarchyError> {
        let key = node_path.key(self.format.attributes_filename());
        let Some(document) = self.storage.get(&key)? else {
            return Ok(serde_json::Map::default());
        };
        let mut attributes: serde_json::Map<String, serde_json::Value> =
            serde_json::from_slice(&document).map_err(MetadataError::from)?;
        if self.format == DataFormat::N5 {
            attributes.remove("n5");
        }
        Ok(attributes)
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Container<TStorage> {
    /// Create a group at `path`.
    ///
    /// # Errors
    /// Returns [`HierarchyError::NodeExists`] if `path` already holds a node.
    pub fn create_group(&self, path: &str) -> Result<Group<TStorage>, HierarchyError> {
        let node_path = NodePath::new(path)?;
        if self.node_type(path)?.is_some() {
            return Err(HierarchyError::NodeExists(node_path));
        }
        self.write_group_marker(&node_path)?;
        Ok(Group {
            storage: self.storage.clone(),
            format: self.format,
            path: node_path,
            attributes: serde_json::Map::default(),
        })
    }

    /// Open the group at `path`.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if `path` does not hold a group.
    pub fn open_group(&self, path: &str) -> Result<Group<TStorage>, HierarchyError> {
        let node_path = NodePath::new(path)?;
        match self.node_type(path)? {
            Some(NodeType::Group) => {
                let attributes = self.read_attributes(&node_path)?;
                Ok(Group {
                    storage: self.storage.clone(),
                    format: self.format,
                    path: node_path,
                    attributes,
                })
            }
            Some(NodeType::Dataset) => Err(HierarchyError::NotAGroup(node_path)),
            None => Err(HierarchyError::NodeNotFound(node_path)),
        }
    }

    /// The root group of the container.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if storage fails.
    pub fn root_group(&self) -> Result<Group<TStorage>, HierarchyError> {
        self.open_group("/")
    }

    fn write_group_marker(&self, node_path: &NodePath) -> Result<(), HierarchyError> {
        let key = node_path.key(self.format.group_metadata_filename());
        let document = match self.format {
            DataFormat::Zarr => serde_json::to_vec_pretty(&ZarrGroupMetadata::default()),
            DataFormat::N5 => {
                let mut marker = serde_json::Map::default();
                if node_path.is_root() {
                    marker.insert("n5".to_string(), N5_VERSION.into());
                }
                serde_json::to_vec_pretty(&marker)
            }
        }
        .map_err(MetadataError::from)?;
        self.storage.set(&key, &document)?;
        Ok(())
    }
}

/// A group within a container.
pub struct Group<TStorage: ?Sized> {
    storage: Arc<TStorage>,
    format: DataFormat,
    path: NodePath,
    attributes: serde_json::Map<String, serde_json::Value>,
}

impl<TStorage: ?Sized> Group<TStorage> {
    /// The path of the group within the container.
    #[must_use]
    pub fn path(&self) -> &NodePath {
        &self.path
    }

    /// The user attributes of the group.
    #[must_use]
    pub fn attributes(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.attributes
    }
}

impl<TStorage: ?Sized + ReadableWritableStorageTraits> Group<TStorage> {
    /// Replace the user attributes of the group and persist them.
    ///
    /// # Errors
    /// Returns a [`HierarchyError`] if serialization or storage fails.
    pub fn set_attributes(
        &mut self,
        attributes: serde_json::Map<String, serde_json::Value>,
    ) -> Result<(), HierarchyError> {
        self.attributes = attributes;
        let key = self.path.key(self.format.attributes_filename());
        let mut document = self.attributes.clone();
        // The n5 root marker lives in the same document as the attributes.
        if self.format == DataFormat::N5 && self.path.is_root() {
            document.insert("n5".to_string(), N5_VERSION.into());
        }
        let document = serde_json::to_vec_pretty(&document).map_err(MetadataError::from)?;
        self.storage.set(&key, &document)?;
        Ok(())
    }
}
