//! Versioned exchange format for the segments found by one worker.
//!
//! A batch is written as a single JSON document:
//!
//! ```json
//! { "schema_version": 1, "worker": 0, "segments": [ { "points": [ ... ] } ] }
//! ```
//!
//! Readers reject any `schema_version` other than [`SEGMENT_BATCH_SCHEMA_VERSION`].
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
};

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::{detection::segments::Segment, skymotion_errors::SkymotionError};

/// Current version of the batch layout.
pub const SEGMENT_BATCH_SCHEMA_VERSION: u32 = 1;

/// Segments produced by one worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentBatch {
    pub schema_version: u32,
    pub worker: usize,
    pub segments: Vec<Segment>,
}

impl SegmentBatch {
    /// A batch at the current schema version.
    pub fn new(worker: usize, segments: Vec<Segment>) -> Self {
        SegmentBatch {
            schema_version: SEGMENT_BATCH_SCHEMA_VERSION,
            worker,
            segments,
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), SkymotionError> {
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Read a batch, checking its schema version.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SkymotionError> {
        let batch: SegmentBatch = serde_json::from_reader(reader)?;
        if batch.schema_version != SEGMENT_BATCH_SCHEMA_VERSION {
            return Err(SkymotionError::UnsupportedBatchVersion(
                batch.schema_version,
            ));
        }
        Ok(batch)
    }

    pub fn write_file(&self, path: &Utf8Path) -> Result<(), SkymotionError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.to_writer(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_file(path: &Utf8Path) -> Result<Self, SkymotionError> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }
}
