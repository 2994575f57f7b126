//! Loading ranking requests and rubric files from disk.

use std::path::Path;

use serde::Deserialize;

use super::types::{Criterion, RankRequest};

#[derive(Debug, thiserror::Error)]
pub enum RankRequestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("request contains no documents")]
    NoDocuments,
    #[error("document at index {0} has an empty id")]
    EmptyId(usize),
}

/// A rubric file is either a bare array of criteria or `{ "criteria": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RubricFile {
    List(Vec<Criterion>),
    Wrapped { criteria: Vec<Criterion> },
}

fn read(path: &Path) -> Result<String, RankRequestError> {
    std::fs::read_to_string(path).map_err(|source| RankRequestError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Parse a request and check that every document has an id.
pub fn parse_request(json: &str, origin: &str) -> Result<RankRequest, RankRequestError> {
    let request: RankRequest =
        serde_json::from_str(json).map_err(|source| RankRequestError::Json {
            path: origin.to_string(),
            source,
        })?;
    if request.documents.is_empty() {
        return Err(RankRequestError::NoDocuments);
    }
    if let Some(idx) = request
        .documents
        .iter()
        .position(|d| d.id.trim().is_empty())
    {
        return Err(RankRequestError::EmptyId(idx));
    }
    Ok(request)
}

pub fn load_request(path: &Path) -> Result<RankRequest, RankRequestError> {
    parse_request(&read(path)?, &path.display().to_string())
}

pub fn load_rubric(path: &Path) -> Result<Vec<Criterion>, RankRequestError> {
    let raw = read(path)?;
    let file: RubricFile = serde_json::from_str(&raw).map_err(|source| RankRequestError::Json {
        path: path.display().to_string(),
        source,
    })?;
    Ok(match file {
        RubricFile::List(criteria) => criteria,
        RubricFile::Wrapped { criteria } => criteria,
    })
}
