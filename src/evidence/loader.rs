use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::Detection;

/// Read a batch of detections.
///
/// `.jsonl` / `.ndjson` files hold one detection per line; anything else is
/// a JSON array. Entries that do not deserialize are logged and skipped so
/// one bad record never costs the rest of the batch.
pub fn load_detections(path: &Path) -> Result<Vec<Detection>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read evidence file {}", path.display()))?;

    let line_delimited = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jsonl") | Some("ndjson")
    );

    let detections = if line_delimited {
        parse_lines(&content)
    } else {
        parse_array(&content)
            .with_context(|| format!("Evidence file {} is not a JSON array", path.display()))?
    };

    tracing::info!(
        path = %path.display(),
        detections = detections.len(),
        "evidence loaded"
    );
    Ok(detections)
}

fn parse_array(content: &str) -> Result<Vec<Detection>> {
    let entries: Vec<Value> = serde_json::from_str(content)?;
    Ok(entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(detection) => Some(detection),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping malformed detection");
                None
            }
        })
        .collect())
}

fn parse_lines(content: &str) -> Vec<Detection> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| match serde_json::from_str(line) {
            Ok(detection) => Some(detection),
            Err(err) => {
                tracing::warn!(line = index + 1, error = %err, "skipping malformed detection");
                None
            }
        })
        .collect()
}
