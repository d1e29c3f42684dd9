use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::training::Experience;

use super::{
    random_subset, unix_timestamp, BatchRecord, ExperienceStore, ResultsSink, WinRateRecord,
};

const EXPERIENCES_FILE: &str = "experiences.jsonl";
const WIN_RATES_FILE: &str = "win_rates.jsonl";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Append-only JSON-lines files under one directory.
pub struct JsonlStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(io_error(&dir))?;
        Ok(JsonlStore {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append_line<T: Serialize>(&self, file: &str, value: &T) -> Result<(), StoreError> {
        let line = serde_json::to_string(value)?;
        let path = self.dir.join(file);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_error(&path))?;
        writeln!(out, "{line}").map_err(io_error(&path))
    }

    /// Every parseable line of `file`; a missing file reads as empty.
    fn read_lines<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(file);
        let handle = match fs::File::open(&path) {
            Ok(handle) => handle,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&path)(e)),
        };

        let mut values = Vec::new();
        for (number, line) in BufReader::new(handle).lines().enumerate() {
            let line = line.map_err(io_error(&path))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(value) => values.push(value),
                Err(e) => warn!("skipping malformed line {} of {}: {e}", number + 1, path.display()),
            }
        }
        Ok(values)
    }
}

impl ExperienceStore for JsonlStore {
    fn record_experience(&self, experience: &Experience) -> Result<(), StoreError> {
        self.append_line(EXPERIENCES_FILE, experience)
    }

    fn fetch_experience_sample(&self, limit: usize) -> Result<Vec<Experience>, StoreError> {
        let all: Vec<Experience> = self.read_lines(EXPERIENCES_FILE)?;
        Ok(random_subset(&all, limit))
    }

    fn record_win_rate(&self, win_rate: f64, opponent: &str) -> Result<(), StoreError> {
        let record = WinRateRecord {
            win_rate,
            opponent: opponent.to_string(),
            timestamp: unix_timestamp(),
        };
        self.append_line(WIN_RATES_FILE, &record)
    }

    fn latest_win_rate(&self) -> Result<Option<f64>, StoreError> {
        let records: Vec<WinRateRecord> = self.read_lines(WIN_RATES_FILE)?;
        Ok(records.last().map(|r| r.win_rate))
    }
}

/// Batch results kept as one pretty-printed JSON array.
pub struct JsonResultsFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonResultsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonResultsFile {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records currently on disk. A missing or unreadable file yields an
    /// empty list.
    pub fn records(&self) -> Vec<BatchRecord> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                error!("failed to read {}: {e}; starting a new list", self.path.display());
                return Vec::new();
            }
        };
        serde_json::from_str(&text).unwrap_or_else(|e| {
            error!("failed to parse {}: {e}; starting a new list", self.path.display());
            Vec::new()
        })
    }
}

impl ResultsSink for JsonResultsFile {
    fn append(&self, record: &BatchRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records = self.records();
        records.push(record.clone());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        let json = serde_json::to_string_pretty(&records)?;
        fs::write(&self.path, json).map_err(io_error(&self.path))
    }
}
