//! API route handlers.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use grounded_core::AppError;
use grounded_knowledge::{DocumentType, FileCounts, ProgressReporter};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub const BUILD_OK: &str = "✅ Knowledge base built successfully.";
pub const NO_DOCUMENTS: &str = "❌ No valid documents found. Please upload files first.";
pub const BUILD_RUNNING: &str = "⚠️ A build is already in progress. Please wait.";
pub const BUILD_SUPERSEDED: &str = "⚠️ Files changed during the build. Please build again.";
pub const NOT_READY: &str = "⚠️ System not ready. Please build knowledge base first.";
pub const EMPTY_QUERY: &str = "Please enter a question.";
pub const REBUILD_NOTE: &str = "Please rebuild knowledge base to include new files";

/// Largest accepted upload request body.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

fn error(message: impl Into<String>) -> Json<Value> {
    Json(json!({"error": true, "message": message.into()}))
}

/// Readiness and loaded document count.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let status = state.engine.status();
    Json(json!({
        "ready": status.ready,
        "documents_loaded": status.documents_loaded,
        "build_id": status.build_id,
        "built_at": status.built_at,
        "metrics": state.engine.metrics(),
    }))
}

/// Ingest the pool and publish a new index.
pub async fn build(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let result = state
        .engine
        .rebuild_from(&state.ingestor, &state.pool, &ProgressReporter::noop())
        .await;

    match result {
        Ok(stats) => (
            StatusCode::OK,
            Json(json!({
                "error": false,
                "message": BUILD_OK,
                "documents": stats.documents,
                "build_id": stats.build_id,
            })),
        ),
        Err(AppError::EmptyCorpus) => (StatusCode::OK, error(NO_DOCUMENTS)),
        Err(AppError::BuildInProgress) => (StatusCode::CONFLICT, error(BUILD_RUNNING)),
        Err(AppError::BuildSuperseded) => (StatusCode::OK, error(BUILD_SUPERSEDED)),
        Err(e) => {
            tracing::error!("Build failed: {}", e);
            (StatusCode::OK, error(format!("System error: {}", e)))
        }
    }
}

/// Answer `{query}` from the published index.
///
/// The body is read raw so that a missing content type or malformed JSON
/// still gets the JSON error contract. Readiness is checked before the text.
pub async fn query(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let text = body["query"].as_str().unwrap_or("");

    match state.engine.query(text).await {
        Ok(answer) => Json(json!({
            "error": false,
            "answer": answer.text,
            "sources": answer.evidence_count,
            "conflict": answer.conflict,
        })),
        Err(AppError::NotReady) => error(NOT_READY),
        Err(AppError::InvalidQuery(_)) => error(EMPTY_QUERY),
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            error(format!("System error: {}", e))
        }
    }
}

/// Save uploaded files into the pool.
///
/// Multipart form: `file_count`, then `file{i}` with `type{i}` for each file.
/// Any saved file makes the knowledge base not ready.
pub async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Json<Value> {
    let mut fields: HashMap<String, String> = HashMap::new();
    let mut files: HashMap<String, (String, Vec<u8>)> = HashMap::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(format!("Upload error: {}", e)),
        };

        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if let Some(file_name) = field.file_name().map(str::to_string) {
            match field.bytes().await {
                Ok(bytes) => {
                    files.insert(name, (file_name, bytes.to_vec()));
                }
                Err(e) => return error(format!("Upload error: {}", e)),
            }
        } else {
            match field.text().await {
                Ok(text) => {
                    fields.insert(name, text);
                }
                Err(e) => return error(format!("Upload error: {}", e)),
            }
        }
    }

    let Some(file_count) = fields.get("file_count") else {
        return error("No files specified");
    };
    let Ok(file_count) = file_count.trim().parse::<usize>() else {
        return error(format!("Upload error: invalid file_count '{}'", file_count));
    };

    // Walk the indices actually received; file_count only bounds them.
    let mut indices: Vec<usize> = files
        .keys()
        .filter_map(|key| key.strip_prefix("file")?.parse().ok())
        .filter(|&i| i < file_count)
        .collect();
    indices.sort_unstable();

    let mut uploaded = Vec::new();
    let mut failure = None;

    for i in indices {
        let (Some((file_name, bytes)), Some(type_name)) =
            (files.get(&format!("file{}", i)), fields.get(&format!("type{}", i)))
        else {
            continue;
        };

        if file_name.is_empty() {
            continue;
        }

        let invalid = || {
            format!(
                "File {} has invalid extension for type {}",
                file_name, type_name
            )
        };

        let Some(doc_type) = DocumentType::parse(type_name) else {
            failure = Some(invalid());
            break;
        };

        match state.pool.save_upload(file_name, doc_type, bytes) {
            Ok(stored) => uploaded.push(stored),
            Err(AppError::InvalidUpload(_)) => {
                failure = Some(invalid());
                break;
            }
            Err(e) => {
                failure = Some(format!("Upload error: {}", e));
                break;
            }
        }
    }

    if !uploaded.is_empty() {
        state.engine.invalidate("new files uploaded");
    }

    if let Some(message) = failure {
        tracing::warn!("Upload rejected: {}", message);
        return error(message);
    }

    if uploaded.is_empty() {
        return error("No valid files uploaded");
    }

    Json(json!({
        "error": false,
        "message": format!("✅ Successfully uploaded {} file(s)", uploaded.len()),
        "files": uploaded,
        "note": REBUILD_NOTE,
    }))
}

/// Pool file counts per modality.
pub async fn file_counts(State(state): State<Arc<AppState>>) -> Json<FileCounts> {
    Json(state.pool.file_counts())
}

/// Delete every pool file and reset readiness.
pub async fn clear_files(State(state): State<Arc<AppState>>) -> Json<Value> {
    let result = state.pool.clear();
    state.engine.invalidate("files cleared");

    match result {
        Ok(cleared) => Json(json!({
            "error": false,
            "message": format!("✅ Cleared {} file(s). System reset.", cleared),
            "cleared": cleared,
        })),
        Err(e) => error(format!("Clear error: {}", e)),
    }
}

/// Liveness check.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "RAG Document Assistant",
        "system_ready": state.engine.readiness().is_ready(),
        "upload_folder": state.pool.root().display().to_string(),
    }))
}
