// Collection Processing Service
// Classifies every document in a folder and writes the JSON report

use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::models::{CollectionReport, DocumentResult, FileInfo, SkippedDocument};
use crate::services::detection::{classify_document, implemented_methods, LanguageModel, NeuralSignal};
use crate::services::document::{extract_document, DocumentFormat};

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("No PDF or text documents found in '{0}'")]
    NoDocuments(String),
    #[error("Collection I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Document task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Supported documents in `dir`, sorted by file name.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, CollectionError> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && DocumentFormat::from_path(p).is_some())
        .collect();
    files.sort();
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

enum Outcome {
    Classified(DocumentResult),
    Skipped(SkippedDocument),
}

async fn process_one<N: NeuralSignal + 'static>(
    path: PathBuf,
    model: Arc<LanguageModel>,
    neural: Option<Arc<N>>,
    permits: Arc<Semaphore>,
) -> Outcome {
    let filename = file_name(&path);

    let extract_model = Arc::clone(&model);
    let extract_path = path.clone();
    let extracted = tokio::task::spawn_blocking(move || {
        extract_document(&extract_path, extract_model.normalizer())
    })
    .await;

    let doc = match extracted {
        Ok(Ok(doc)) => doc,
        Ok(Err(e)) => {
            error!("[COLLECTION] Failed to read {}: {}", filename, e);
            return Outcome::Skipped(SkippedDocument {
                filename,
                reason: e.to_string(),
            });
        }
        Err(e) => {
            error!("[COLLECTION] Extraction task for {} failed: {}", filename, e);
            return Outcome::Skipped(SkippedDocument {
                filename,
                reason: e.to_string(),
            });
        }
    };

    if doc.normalized_text.is_empty() {
        warn!("[COLLECTION] {} has no usable text after preprocessing, skipping", filename);
        return Outcome::Skipped(SkippedDocument {
            filename,
            reason: "no text after preprocessing".to_string(),
        });
    }

    // Permit bounds concurrent calls to the external model only
    let results_by_method = match neural.as_deref() {
        Some(signal) => {
            let _permit = permits.acquire().await.ok();
            classify_document(&doc.raw_text, &doc.normalized_text, &model, Some(signal)).await
        }
        None => classify_document::<N>(&doc.raw_text, &doc.normalized_text, &model, None).await,
    };

    info!(
        file = %filename,
        methods = results_by_method.len(),
        "[COLLECTION] Document classified"
    );

    Outcome::Classified(DocumentResult {
        file_info: FileInfo { filename },
        results_by_method,
    })
}

/// Classify every supported document in `dir`.
///
/// Unreadable or empty documents are recorded in `skipped`; results keep the
/// file-name order of the folder listing.
pub async fn process_collection<N: NeuralSignal + 'static>(
    dir: &Path,
    model: Arc<LanguageModel>,
    neural: Option<Arc<N>>,
    max_concurrency: usize,
) -> Result<CollectionReport, CollectionError> {
    let files = discover_documents(dir)?;
    if files.is_empty() {
        return Err(CollectionError::NoDocuments(dir.display().to_string()));
    }

    info!("[COLLECTION] Processing {} documents from {}", files.len(), dir.display());

    let permits = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut join_set = JoinSet::new();
    for (idx, path) in files.into_iter().enumerate() {
        let model = Arc::clone(&model);
        let neural = neural.clone();
        let permits = Arc::clone(&permits);
        join_set.spawn(async move { (idx, process_one(path, model, neural, permits).await) });
    }

    let mut outcomes = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        outcomes.push(joined?);
    }
    outcomes.sort_by_key(|(idx, _)| *idx);

    let mut results = Vec::new();
    let mut skipped = Vec::new();
    for (_, outcome) in outcomes {
        match outcome {
            Outcome::Classified(r) => results.push(r),
            Outcome::Skipped(s) => skipped.push(s),
        }
    }

    info!(
        "[COLLECTION] Done: {} classified, {} skipped",
        results.len(),
        skipped.len()
    );

    Ok(CollectionReport {
        report_id: uuid::Uuid::new_v4().to_string(),
        report_date: chrono::Local::now().to_rfc3339(),
        classified_languages: model.languages().map(str::to_string).collect(),
        implemented_methods: implemented_methods(neural.is_some()),
        total_documents_processed: results.len(),
        results,
        skipped,
    })
}

/// Write the report as pretty JSON; returns the file path.
pub fn save_report(report: &CollectionReport, out_dir: &Path) -> Result<PathBuf, CollectionError> {
    std::fs::create_dir_all(out_dir)?;
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = out_dir.join(format!("langprobe_results_{}.json", timestamp));
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(&path, json)?;
    info!("[COLLECTION] Report saved to {}", path.display());
    Ok(path)
}
