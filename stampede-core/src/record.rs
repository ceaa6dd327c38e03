//! Run record persistence: one JSON document per run, named `"{duration}-{rate}.json"`.
use crate::{RecordError, RunSamples, RUN_RECORD_EXTENSION};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

impl RunSamples {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.run_id(), RUN_RECORD_EXTENSION)
    }

    /// Write the record into `dir`, creating the directory if needed. Returns the written path.
    ///
    /// Fails without touching `dir` when the duration has a sub-second part.
    pub fn save(&self, dir: &Path) -> Result<PathBuf, RecordError> {
        if self.duration().subsec_nanos() != 0 {
            return Err(RecordError::FractionalDuration(self.duration()));
        }
        fs::create_dir_all(dir).map_err(|source| RecordError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = dir.join(self.file_name());
        let file = File::create(&path).map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;

        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, self).map_err(|source| RecordError::Encode {
            path: path.clone(),
            source,
        })?;
        writer.flush().map_err(|source| RecordError::Write {
            path: path.clone(),
            source,
        })?;

        info!("Saved {} samples to {}", self.len(), path.display());
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, RecordError> {
        let file = File::open(path).map_err(|source| RecordError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| RecordError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// A run record read back from disk, identified by its file stem.
#[derive(Debug, Clone)]
pub struct StoredRun {
    pub id: String,
    pub samples: RunSamples,
}

/// Load every run record in `dir`, in directory enumeration order.
///
/// Entries without the record extension are skipped; a record that fails to decode is an error.
pub fn load_runs(dir: &Path) -> Result<Vec<StoredRun>, RecordError> {
    let read_err = |source| RecordError::Read {
        path: dir.to_path_buf(),
        source,
    };

    let mut runs = vec![];
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        let is_record = path.extension().and_then(|e| e.to_str()) == Some(RUN_RECORD_EXTENSION);
        if !path.is_file() || !is_record {
            debug!("Skipping {}", path.display());
            continue;
        }

        let samples = RunSamples::load(&path)?;
        let id = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| samples.run_id());
        runs.push(StoredRun { id, samples });
    }

    if runs.is_empty() {
        warn!("No run records found in {}", dir.display());
    }
    Ok(runs)
}
