use std::{io, path::PathBuf};
use thiserror::Error;

/// Errors produced while loading a map document or one of its tilesets.
#[derive(Debug, Error)]
pub enum MapError {
    /// Reading a file failed for a reason other than it being absent.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being read.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// A referenced file (map, tileset) does not exist.
    #[error("resource not found: {path}")]
    ResourceNotFound {
        /// Missing file.
        path: PathBuf,
    },
    /// JSON map or tileset did not parse.
    #[error("failed to parse JSON {path}: {source}")]
    Json {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },
    /// TMX/TSX document is not well-formed XML.
    #[error("failed to parse XML {path}: {source}")]
    Xml {
        /// Offending file.
        path: PathBuf,
        /// Underlying error.
        source: roxmltree::Error,
    },
    /// A required attribute is absent.
    #[error("<{element}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
    },
    /// An attribute is present but cannot be read as the expected type.
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        /// Element name.
        element: String,
        /// Attribute name.
        attribute: String,
        /// Raw value found in the document.
        value: String,
    },
    /// Layer data length does not match `width * height`.
    #[error("layer '{layer}' has {actual} tiles, expected {expected}")]
    InvalidLayerSize {
        /// Layer name.
        layer: String,
        /// `width * height`.
        expected: usize,
        /// Number of entries found.
        actual: usize,
    },
    /// A CSV entry of a layer is not a tile id.
    #[error("layer '{layer}' contains invalid tile entry '{value}'")]
    InvalidTileData {
        /// Layer name.
        layer: String,
        /// Offending entry.
        value: String,
    },
    /// Layer data uses an encoding other than CSV.
    #[error("layer '{layer}' uses unsupported encoding '{encoding}'")]
    UnsupportedEncoding {
        /// Layer name.
        layer: String,
        /// Encoding declared in the document.
        encoding: String,
    },
    /// A layer references a gid no tileset covers.
    #[error("layer '{layer}' references gid {gid}, highest known gid is {max_gid}")]
    InvalidTileGid {
        /// Layer name.
        layer: String,
        /// Offending gid (flip bits removed).
        gid: u32,
        /// Highest gid covered by the tilesets.
        max_gid: u32,
    },
    /// A tile object references a gid no tileset covers.
    #[error("object {object_id} in layer '{layer}' references gid {gid}, highest known gid is {max_gid}")]
    InvalidObjectGid {
        /// Object group name.
        layer: String,
        /// Object id.
        object_id: u32,
        /// Offending gid (flip bits removed).
        gid: u32,
        /// Highest gid covered by the tilesets.
        max_gid: u32,
    },
    /// Two tilesets claim the same gid.
    #[error("tilesets '{first}' and '{second}' have overlapping gid ranges")]
    OverlappingTilesets {
        /// Tileset with the lower first gid.
        first: String,
        /// Tileset overlapping it.
        second: String,
    },
    /// Property declared with a type this loader does not know.
    #[error("property '{name}' has unsupported type '{kind}'")]
    UnsupportedPropertyType {
        /// Property name.
        name: String,
        /// Declared type.
        kind: String,
    },
    /// File extension is neither `.tmx` nor `.json`, or a tileset format does
    /// not match its map.
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
}

impl MapError {
    /// Maps an `io::Error` to `ResourceNotFound` when the file is absent.
    pub(crate) fn from_io(path: PathBuf, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            MapError::ResourceNotFound { path }
        } else {
            MapError::Io { path, source }
        }
    }

    pub(crate) fn missing(element: &str, attribute: &str) -> Self {
        MapError::MissingAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
        }
    }

    pub(crate) fn invalid(element: &str, attribute: &str, value: &str) -> Self {
        MapError::InvalidAttribute {
            element: element.to_owned(),
            attribute: attribute.to_owned(),
            value: value.to_owned(),
        }
    }
}
