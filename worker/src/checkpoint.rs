//! Checkpoints of the trainable variables in the safetensors format.
//!
//! Every checkpoint lives in `{dir}/model.ckpt-{step}.safetensors` and holds
//! one scalar `F32` tensor per variable plus the global step in the metadata.
//! A json `checkpoint` index keeps track of the retained files.

use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info};
use machine_learning::model::{NUM_PARAMS, PARAM_NAMES};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::{Result, WorkerErr};

/// The amount of checkpoints kept on disk by default.
pub const MAX_TO_KEEP: usize = 5;

const INDEX_FILE: &str = "checkpoint";
const STEP_KEY: &str = "global_step";

/// A restored training state.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub step: u64,
    pub params: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointIndex {
    latest: Option<String>,
    all: Vec<String>,
}

/// Saves and restores checkpoints inside a directory.
#[derive(Debug, Clone)]
pub struct Saver {
    dir: PathBuf,
    max_to_keep: usize,
}

impl Saver {
    /// Creates a new `Saver` keeping the last `MAX_TO_KEEP` checkpoints.
    ///
    /// # Arguments
    /// * `dir` - The checkpoint directory, created on the first save.
    ///
    /// # Returns
    /// A new `Saver` instance.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_to_keep: MAX_TO_KEEP,
        }
    }

    pub fn with_max_to_keep(mut self, max_to_keep: usize) -> Self {
        self.max_to_keep = max_to_keep.max(1);
        self
    }

    /// Writes a checkpoint for `step` and drops the ones past the retention.
    ///
    /// # Arguments
    /// * `step` - The global step the variables belong to.
    /// * `params` - The variables, `[weight, bias]`.
    ///
    /// # Returns
    /// The path of the new checkpoint.
    pub fn save(&self, step: u64, params: &[f32]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;

        let name = format!("model.ckpt-{step}.safetensors");
        let path = self.dir.join(&name);

        let metadata = HashMap::from([(STEP_KEY.to_string(), step.to_string())]);
        write_params(&path, params, metadata)?;

        let mut index = self.read_index()?.unwrap_or_default();
        index.all.retain(|entry| *entry != name);
        index.all.push(name.clone());

        while index.all.len() > self.max_to_keep {
            let stale = index.all.remove(0);
            match fs::remove_file(self.dir.join(&stale)) {
                Ok(()) => debug!("removed stale checkpoint {stale}"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        index.latest = Some(name);
        self.write_index(&index)?;

        info!("Saved checkpoint at step {step} to {}", path.display());
        Ok(path)
    }

    /// Runs `save` on the blocking thread pool.
    pub async fn save_blocking(&self, step: u64, params: Vec<f32>) -> Result<PathBuf> {
        let saver = self.clone();
        task::spawn_blocking(move || saver.save(step, &params))
            .await
            .map_err(io::Error::other)?
    }

    /// The path of the most recent checkpoint, if any.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let latest = self
            .read_index()?
            .and_then(|index| index.latest)
            .map(|name| self.dir.join(name));

        Ok(latest)
    }

    /// The paths of the retained checkpoints, oldest first.
    pub fn retained(&self) -> Result<Vec<PathBuf>> {
        let all = self.read_index()?.map(|index| index.all).unwrap_or_default();
        Ok(all.into_iter().map(|name| self.dir.join(name)).collect())
    }

    /// Restores the most recent checkpoint.
    ///
    /// # Returns
    /// `None` when the directory holds no checkpoint index.
    pub fn restore_latest(&self) -> Result<Option<Checkpoint>> {
        match self.latest()? {
            Some(path) => read_checkpoint(&path).map(Some),
            None => Ok(None),
        }
    }

    fn read_index(&self) -> Result<Option<CheckpointIndex>> {
        match fs::read(self.dir.join(INDEX_FILE)) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_index(&self, index: &CheckpointIndex) -> Result<()> {
        let tmp = self.dir.join(format!("{INDEX_FILE}.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(index)?)?;
        fs::rename(tmp, self.dir.join(INDEX_FILE))?;
        Ok(())
    }
}

/// Reads a checkpoint file written by `Saver::save`.
pub fn read_checkpoint(path: &Path) -> Result<Checkpoint> {
    let bytes = fs::read(path)?;
    let params = read_params(path, &bytes)?;

    let (_, metadata) = SafeTensors::read_metadata(&bytes)?;
    let step = metadata
        .metadata()
        .as_ref()
        .and_then(|info| info.get(STEP_KEY))
        .and_then(|step| step.parse().ok())
        .ok_or_else(|| malformed(path, format!("missing {STEP_KEY} metadata")))?;

    Ok(Checkpoint { step, params })
}

/// Writes the variables as named scalar tensors.
pub(crate) fn write_params(
    path: &Path,
    params: &[f32],
    metadata: HashMap<String, String>,
) -> Result<()> {
    if params.len() != NUM_PARAMS {
        return Err(malformed(
            path,
            format!("expected {NUM_PARAMS} variables, got {}", params.len()),
        ));
    }

    let bytes: Vec<[u8; 4]> = params.iter().map(|p| p.to_le_bytes()).collect();
    let mut views = HashMap::new();

    for (name, data) in PARAM_NAMES.iter().zip(&bytes) {
        let view = TensorView::new(Dtype::F32, Vec::new(), data)?;
        views.insert(name.to_string(), view);
    }

    safetensors::serialize_to_file(&views, &Some(metadata), path)?;
    Ok(())
}

/// Reads the named scalar tensors back into `[weight, bias]`.
pub(crate) fn read_params(path: &Path, bytes: &[u8]) -> Result<Vec<f32>> {
    let tensors = SafeTensors::deserialize(bytes)?;
    let mut params = Vec::with_capacity(NUM_PARAMS);

    for name in PARAM_NAMES {
        let view = tensors
            .tensor(name)
            .map_err(|_| malformed(path, format!("missing tensor {name}")))?;

        if view.dtype() != Dtype::F32 {
            return Err(malformed(path, format!("tensor {name} is not f32")));
        }

        let data: [u8; 4] = view
            .data()
            .try_into()
            .map_err(|_| malformed(path, format!("tensor {name} is not a scalar")))?;

        params.push(f32::from_le_bytes(data));
    }

    Ok(params)
}

fn malformed(path: &Path, detail: String) -> WorkerErr {
    WorkerErr::MalformedCheckpoint {
        path: path.to_path_buf(),
        detail,
    }
}
