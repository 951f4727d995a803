//! Persisted case results used for drift detection

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::common::paths::sanitize_file_component;
use crate::common::{Error, Result};
use crate::model::CaseResult;

/// Stores the last `CaseResult` of every case+version as JSON
///
/// Clones share one set of per-file locks, so a case that appears twice in
/// a task never reads a baseline while the other run is replacing it.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl BaselineStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Arc::default(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, case: &str, version: &str) -> PathBuf {
        self.dir.join(format!(
            "{}@{}.json",
            sanitize_file_component(case),
            sanitize_file_component(version)
        ))
    }

    /// The previously stored result, if any
    pub async fn load(&self, case: &str, version: &str) -> Result<Option<CaseResult>> {
        let path = self.path_for(case, version);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::FileRead {
                path: path.display().to_string(),
                error: e.to_string(),
            }),
        }
    }

    /// Replace the stored result for the case+version
    pub async fn save(&self, result: &CaseResult) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(&result.case, &result.version);
        tokio::fs::write(&path, serde_json::to_string_pretty(result)?).await?;
        Ok(())
    }

    /// Store `current` and return the result it replaced
    ///
    /// Observed values `current` lacks are kept from the stored result.
    pub async fn exchange(&self, mut current: CaseResult) -> Result<Option<CaseResult>> {
        let path = self.path_for(&current.case, &current.version);
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| Error::Internal("baseline lock poisoned".to_string()))?;
            Arc::clone(locks.entry(path).or_default())
        };
        let _guard = lock.lock().await;

        let previous = self.load(&current.case, &current.version).await?;
        if let Some(previous) = &previous {
            current.carry_reals(previous);
        }
        self.save(&current).await?;
        Ok(previous)
    }
}
