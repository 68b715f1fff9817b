//! Saving and loading trained models as JSON.
//!
//! The file is written next to its destination and renamed into place, so
//! an interrupted save never leaves a truncated model behind.

use crate::error::{FactorError, Result};
use crate::model::FactorModel;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Bumped whenever the serialized layout changes
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ModelFileRef<'a> {
    format_version: u32,
    model: &'a FactorModel,
}

#[derive(Deserialize)]
struct ModelFile {
    format_version: u32,
    model: FactorModel,
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `model` to `path`, replacing any existing file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn save_model(model: &FactorModel, path: &Path) -> Result<()> {
    if !model.is_trained() {
        return Err(FactorError::NotTrained);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let tmp = temp_path(path);
    let written = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(
            &mut writer,
            &ModelFileRef {
                format_version: FORMAT_VERSION,
                model,
            },
        )?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path).map_err(FactorError::from)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }

    info!(
        "Saved model ({} users, {} items, rank {})",
        model.num_users(),
        model.num_items(),
        model.rank()
    );
    Ok(())
}

/// Read a model written by [`save_model`].
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_model(path: &Path) -> Result<FactorModel> {
    let reader = BufReader::new(File::open(path)?);
    let file: ModelFile = serde_json::from_reader(reader)?;

    if file.format_version != FORMAT_VERSION {
        return Err(FactorError::UnsupportedFormat {
            found: file.format_version,
            expected: FORMAT_VERSION,
        });
    }
    file.model.check_layout()?;

    info!(
        "Loaded model ({} users, {} items, rank {})",
        file.model.num_users(),
        file.model.num_items(),
        file.model.rank()
    );
    Ok(file.model)
}

impl FactorModel {
    pub fn save(&self, path: &Path) -> Result<()> {
        save_model(self, path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        load_model(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Trainer, TrainerConfig};
    use data_loader::Rating;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("factorization-persist-{}", std::process::id()))
            .join(name)
    }

    fn trained_model() -> FactorModel {
        let train = vec![
            Rating::new(10, 100, 4.0),
            Rating::new(10, 200, 2.5),
            Rating::new(20, 100, 3.5),
            Rating::new(30, 300, 5.0),
        ];
        let config = TrainerConfig::default().with_rank(3).with_iterations(10);
        Trainer::new(config).fit(&train).unwrap().0
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let model = trained_model();
        let path = scratch_path("model.json");
        model.save(&path).unwrap();
        let loaded = FactorModel::load(&path).unwrap();

        assert_eq!(loaded.rank(), model.rank());
        assert_eq!(loaded.config(), model.config());
        for user in [10, 20, 30] {
            for item in [100, 200, 300] {
                let before = model.predict_raw(user, item).unwrap();
                let after = loaded.predict_raw(user, item).unwrap();
                assert!((before - after).abs() <= f32::EPSILON * before.abs().max(1.0));
            }
        }
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_untrained_model_is_not_saved() {
        let path = scratch_path("untrained.json");
        assert!(matches!(
            FactorModel::new(4).save(&path),
            Err(FactorError::NotTrained)
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_rejects_other_format_versions() {
        let model = trained_model();
        let path = scratch_path("future.json");
        let json = serde_json::json!({ "format_version": 99, "model": model });
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(
            load_model(&path),
            Err(FactorError::UnsupportedFormat { found: 99, expected: 1 })
        ));
    }

    #[test]
    fn test_rejects_untrained_payload() {
        let path = scratch_path("empty.json");
        let json = serde_json::json!({ "format_version": 1, "model": FactorModel::new(4) });
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, json.to_string()).unwrap();

        assert!(matches!(load_model(&path), Err(FactorError::NotTrained)));
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        // A non-empty directory at the destination can't be replaced by a file
        let path = scratch_path("occupied");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let result = trained_model().save(&path);

        assert!(matches!(result, Err(FactorError::Io(_))));
        assert!(!temp_path(&path).exists());
        assert!(path.join("keep").exists());
    }

    #[test]
    fn test_garbage_file() {
        let path = scratch_path("garbage.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "not json").unwrap();

        assert!(matches!(load_model(&path), Err(FactorError::Serialization(_))));
    }
}
