//! Curriculum loading from a JSON file (`CATALOG_SEED_PATH`).
//!
//! ```json
//! { "steps": [{ "id": "s1", "order": 1, "categoryId": "basics" }],
//!   "vocabulary": [{ "id": "w1", "word": "hola", "translation": "hello" }] }
//! ```

use std::path::{Path, PathBuf};

use pathway_algo::{validate_catalog, CatalogIssue};
use serde::Deserialize;
use thiserror::Error;

use crate::services::catalog::log_catalog_issues;
use crate::store::{Step, StoreError, Stores, VocabularyItem};

#[derive(Debug, Default, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub steps: usize,
    pub vocabulary: usize,
    pub issues: usize,
}

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid catalog seed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog rejected: {} blocking issue(s)", .0.len())]
    Rejected(Vec<CatalogIssue>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn load_seed_file(path: &Path) -> Result<CatalogSeed, SeedError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes the seed into the curriculum. With `strict`, a catalog whose
/// prerequisite graph can strand steps is refused before anything is written.
pub async fn apply_seed(
    stores: &Stores,
    seed: &CatalogSeed,
    strict: bool,
) -> Result<SeedSummary, SeedError> {
    let active: Vec<&Step> = seed.steps.iter().filter(|s| s.active).collect();
    let issues = validate_catalog(&active);
    log_catalog_issues(&issues);

    if strict && issues.iter().any(CatalogIssue::is_blocking) {
        let blocking: Vec<CatalogIssue> = issues.into_iter().filter(CatalogIssue::is_blocking).collect();
        tracing::error!(count = blocking.len(), "STRICT_CATALOG: refusing catalog seed");
        return Err(SeedError::Rejected(blocking));
    }

    for step in &seed.steps {
        stores.curriculum.put_step(step).await?;
    }
    for item in &seed.vocabulary {
        stores.curriculum.put_vocabulary_item(item).await?;
    }

    let summary = SeedSummary {
        steps: seed.steps.len(),
        vocabulary: seed.vocabulary.len(),
        issues: issues.len(),
    };
    tracing::info!(
        steps = summary.steps,
        vocabulary = summary.vocabulary,
        issues = summary.issues,
        "catalog seeded"
    );
    Ok(summary)
}

pub async fn seed_from_path(
    stores: &Stores,
    path: &Path,
    strict: bool,
) -> Result<SeedSummary, SeedError> {
    let seed = load_seed_file(path).await?;
    apply_seed(stores, &seed, strict).await
}
