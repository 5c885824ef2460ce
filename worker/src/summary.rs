//! Scalar summaries written as one json event per line.

use std::{
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// A single scalar summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub wall_time: f64,
    pub step: u64,
    pub tag: String,
    pub value: f32,
}

/// Appends scalar events to `events.out.{unix_secs}.jsonl` inside a directory.
pub struct SummaryWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl SummaryWriter {
    /// Opens a new event file inside `dir`, creating the directory if needed.
    ///
    /// # Arguments
    /// * `dir` - The summary directory.
    ///
    /// # Returns
    /// A new `SummaryWriter` or an io error.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let secs = wall_time() as u64;
        let path = dir.join(format!("events.out.{secs}.jsonl"));
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a scalar event.
    ///
    /// # Arguments
    /// * `tag` - The name of the scalar.
    /// * `value` - Its value.
    /// * `step` - The global step it was measured at.
    pub fn add_scalar(&mut self, tag: &str, value: f32, step: u64) -> Result<()> {
        let event = ScalarEvent {
            wall_time: wall_time(),
            step,
            tag: tag.to_string(),
            value,
        };

        serde_json::to_writer(&mut self.out, &event)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    /// Flushes the pending events and closes the file.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }
}

/// Reads back every event of an event file.
pub fn read_events(path: impl AsRef<Path>) -> Result<Vec<ScalarEvent>> {
    let content = fs::read_to_string(path)?;
    let mut events = Vec::new();

    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        events.push(serde_json::from_str(line)?);
    }

    Ok(events)
}

fn wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_read_back_in_order() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("tensorboard");

        let mut writer = SummaryWriter::open(&nested)?;
        writer.add_scalar("loss", 4.5, 100)?;
        writer.add_scalar("loss", 0.5, 200)?;
        let path = writer.path().to_path_buf();
        writer.close()?;

        assert!(path.starts_with(&nested));
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("events.out."));
        assert!(file_name.ends_with(".jsonl"));

        let events = read_events(&path)?;
        let got: Vec<_> = events.iter().map(|e| (e.tag.as_str(), e.value, e.step)).collect();
        assert_eq!(got, [("loss", 4.5, 100), ("loss", 0.5, 200)]);
        assert!(events.iter().all(|e| e.wall_time > 0.));
        Ok(())
    }
}
