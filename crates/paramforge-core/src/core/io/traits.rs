use super::error::IoError;
use super::formats::{ClassicalTopology, ConformerFile, TopologyFile};
use crate::core::models::conformer::ConformerSource;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A serde type stored as one JSON document per file.
pub trait JsonFile: Serialize + DeserializeOwned {
    /// Reads the document from a reader.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the input is not a valid document.
    fn read_from(reader: impl Read) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }

    /// Writes the document to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the underlying writer fails.
    fn write_to(&self, writer: impl Write) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, self)
    }

    /// Reads the document from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Io`] if the file cannot be opened and
    /// [`IoError::Json`] if parsing fails.
    fn read_from_path(path: &Path) -> Result<Self, IoError> {
        let file = File::open(path).map_err(|source| IoError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(BufReader::new(file)).map_err(|source| IoError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the document to a file path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Io`] if the file cannot be created or flushed and
    /// [`IoError::Json`] if serialization fails.
    fn write_to_path(&self, path: &Path) -> Result<(), IoError> {
        let io_err = |source| IoError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = File::create(path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer).map_err(|source| IoError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        writer.flush().map_err(io_err)
    }
}

impl JsonFile for ConformerFile {}
impl JsonFile for TopologyFile {}

/// Reads one quantum-chemistry file into a [`ConformerSource`].
pub trait ConformerReader: Sync {
    fn read_source(&self, path: &Path) -> Result<ConformerSource, IoError>;
}

/// Reads one classical topology file.
pub trait TopologyReader: Sync {
    fn read_topology(&self, path: &Path) -> Result<ClassicalTopology, IoError>;
}

/// Reader for the JSON conformer and topology layouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReader;

impl ConformerReader for JsonReader {
    fn read_source(&self, path: &Path) -> Result<ConformerSource, IoError> {
        ConformerFile::read_from_path(path)?.into_source(path)
    }
}

impl TopologyReader for JsonReader {
    fn read_topology(&self, path: &Path) -> Result<ClassicalTopology, IoError> {
        TopologyFile::read_from_path(path)?.into_topology(path)
    }
}
