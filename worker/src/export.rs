//! Versioned model exports for serving.

use std::{
    collections::{BTreeMap, HashMap},
    fs, io,
    path::{Path, PathBuf},
};

use log::info;
use machine_learning::LinearRegression;
use serde::{Deserialize, Serialize};

use crate::{
    Result, WorkerErr,
    checkpoint::{read_params, write_params},
};

pub const SERVING_TAG: &str = "serve";
pub const DEFAULT_SIGNATURE: &str = "serving_default";
pub const PREDICT_METHOD: &str = "tensorflow/serving/predict";

const META_FILE: &str = "saved_model.json";
const VARIABLES_DIR: &str = "variables";
const VARIABLES_FILE: &str = "variables.safetensors";

const LEGACY_META_FILE: &str = "export.meta.json";
const LEGACY_VARIABLES_FILE: &str = "export.safetensors";

/// The description of a single signature input or output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorInfo {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<i64>,
}

impl TensorInfo {
    fn column(name: &str, dtype: &str) -> Self {
        Self {
            name: name.to_string(),
            dtype: dtype.to_string(),
            shape: vec![-1, 1],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureDef {
    pub inputs: BTreeMap<String, TensorInfo>,
    pub outputs: BTreeMap<String, TensorInfo>,
    pub method_name: String,
}

/// The metadata file of a saved model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedModelMeta {
    pub tags: Vec<String>,
    pub signature_def: BTreeMap<String, SignatureDef>,
    pub global_step: u64,
}

impl SavedModelMeta {
    /// The predict signature of the linear model, `keys` pass through.
    fn predict(global_step: u64) -> Self {
        let inputs = BTreeMap::from([
            ("keys".to_string(), TensorInfo::column("keys", "int32")),
            ("features".to_string(), TensorInfo::column("X", "float")),
        ]);
        let outputs = BTreeMap::from([
            ("keys".to_string(), TensorInfo::column("keys", "int32")),
            ("prediction".to_string(), TensorInfo::column("predict", "float")),
        ]);

        let signature = SignatureDef {
            inputs,
            outputs,
            method_name: PREDICT_METHOD.to_string(),
        };

        Self {
            tags: vec![SERVING_TAG.to_string()],
            signature_def: BTreeMap::from([(DEFAULT_SIGNATURE.to_string(), signature)]),
            global_step,
        }
    }
}

/// Writes the trained variables as a versioned saved model.
///
/// The layout is `{base}/{version}/saved_model.json` plus
/// `{base}/{version}/variables/variables.safetensors`.
pub struct SavedModelBuilder {
    export_dir: PathBuf,
}

impl SavedModelBuilder {
    /// Creates a new `SavedModelBuilder`.
    ///
    /// # Arguments
    /// * `base` - The saved model directory.
    /// * `version` - The model version, names the export subdirectory.
    ///
    /// # Returns
    /// A new `SavedModelBuilder` instance.
    pub fn new(base: impl AsRef<Path>, version: u64) -> Self {
        Self {
            export_dir: base.as_ref().join(version.to_string()),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Saves the model.
    ///
    /// # Arguments
    /// * `step` - The global step the variables belong to.
    /// * `params` - The variables, `[weight, bias]`.
    ///
    /// # Returns
    /// `ExportExists` if this version was already exported.
    pub fn save(&self, step: u64, params: &[f32]) -> Result<()> {
        info!("Export the saved model to {}", self.export_dir.display());
        LinearRegression::new(params)?;

        create_export_dir(&self.export_dir)?;
        let variables = self.export_dir.join(VARIABLES_DIR);
        fs::create_dir(&variables)?;

        write_params(&variables.join(VARIABLES_FILE), params, HashMap::new())?;

        let meta = SavedModelMeta::predict(step);
        fs::write(
            self.export_dir.join(META_FILE),
            serde_json::to_vec_pretty(&meta)?,
        )?;

        Ok(())
    }
}

/// A saved model loaded back for inference.
#[derive(Debug, Clone)]
pub struct ServingModel {
    pub meta: SavedModelMeta,
    params: Vec<f32>,
}

impl ServingModel {
    /// Loads the saved model exported into `export_dir`.
    pub fn load(export_dir: impl AsRef<Path>) -> Result<Self> {
        let export_dir = export_dir.as_ref();

        let meta = serde_json::from_slice(&fs::read(export_dir.join(META_FILE))?)?;
        let variables = export_dir.join(VARIABLES_DIR).join(VARIABLES_FILE);
        let params = read_params(&variables, &fs::read(&variables)?)?;

        Ok(Self { meta, params })
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    /// Runs the default signature.
    ///
    /// # Arguments
    /// * `keys` - Opaque ids echoed back with the predictions.
    /// * `features` - One feature per key.
    ///
    /// # Returns
    /// The keys and one prediction per feature.
    pub fn predict(&self, keys: &[i32], features: &[f32]) -> Result<(Vec<i32>, Vec<f32>)> {
        let model = LinearRegression::new(&self.params)?;
        let predictions = features.iter().map(|&x| model.predict(x)).collect();
        Ok((keys.to_vec(), predictions))
    }
}

/// The generic signatures of the legacy export, alias to tensor name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyExportMeta {
    pub inputs: BTreeMap<String, String>,
    pub outputs: BTreeMap<String, String>,
    pub global_step: u64,
}

/// Writes the legacy inference export into `{base}/{version:08}/`.
pub struct Exporter {
    export_dir: PathBuf,
}

impl Exporter {
    pub fn new(base: impl AsRef<Path>, version: u64) -> Self {
        Self {
            export_dir: base.as_ref().join(format!("{version:08}")),
        }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Exports the variables together with the `inputs` and `outputs` signatures.
    ///
    /// # Returns
    /// `ExportExists` if this version was already exported.
    pub fn export(&self, step: u64, params: &[f32]) -> Result<()> {
        info!("Exporting trained model to {}", self.export_dir.display());
        LinearRegression::new(params)?;

        create_export_dir(&self.export_dir)?;
        write_params(
            &self.export_dir.join(LEGACY_VARIABLES_FILE),
            params,
            HashMap::new(),
        )?;

        let alias = |names: &[&str]| -> BTreeMap<String, String> {
            names
                .iter()
                .map(|name| (name.to_string(), name.to_string()))
                .collect()
        };

        let meta = LegacyExportMeta {
            inputs: alias(&["keys", "X"]),
            outputs: alias(&["keys", "predict"]),
            global_step: step,
        };
        fs::write(
            self.export_dir.join(LEGACY_META_FILE),
            serde_json::to_vec_pretty(&meta)?,
        )?;

        info!("Done exporting!");
        Ok(())
    }
}

fn create_export_dir(dir: &Path) -> Result<()> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Err(WorkerErr::ExportExists(dir.to_path_buf()))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_model_serves_the_exported_variables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let builder = SavedModelBuilder::new(dir.path(), 1);

        builder.save(2000, &[2., 10.])?;
        assert_eq!(builder.export_dir(), dir.path().join("1"));
        assert!(dir.path().join("1/variables/variables.safetensors").exists());

        let model = ServingModel::load(builder.export_dir())?;
        assert_eq!(model.params(), [2., 10.]);
        assert_eq!(model.meta.tags, [SERVING_TAG]);
        assert_eq!(model.meta.global_step, 2000);

        let signature = &model.meta.signature_def[DEFAULT_SIGNATURE];
        assert_eq!(signature.method_name, PREDICT_METHOD);
        assert_eq!(signature.inputs["keys"].dtype, "int32");
        assert_eq!(signature.inputs["features"].dtype, "float");
        assert_eq!(signature.outputs["prediction"].shape, [-1, 1]);

        let (keys, predictions) = model.predict(&[7, 8], &[0., 1.])?;
        assert_eq!(keys, [7, 8]);
        assert_eq!(predictions, [10., 12.]);
        Ok(())
    }

    #[test]
    fn exporting_a_version_twice_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let builder = SavedModelBuilder::new(dir.path(), 3);

        builder.save(1, &[0., 0.])?;
        let err = builder.save(1, &[1., 1.]).unwrap_err();
        assert!(matches!(err, WorkerErr::ExportExists(_)));

        let model = ServingModel::load(builder.export_dir())?;
        assert_eq!(model.params(), [0., 0.]);
        Ok(())
    }

    #[test]
    fn legacy_export_uses_a_padded_version() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let exporter = Exporter::new(dir.path().join("model"), 1);

        exporter.export(10, &[2., 10.])?;
        let export_dir = dir.path().join("model/00000001");
        assert_eq!(exporter.export_dir(), export_dir);

        let meta: LegacyExportMeta =
            serde_json::from_slice(&fs::read(export_dir.join(LEGACY_META_FILE))?)?;
        assert_eq!(meta.inputs["X"], "X");
        assert_eq!(meta.outputs["predict"], "predict");
        assert!(export_dir.join(LEGACY_VARIABLES_FILE).exists());
        Ok(())
    }
}
