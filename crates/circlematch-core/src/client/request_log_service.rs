use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;

use crate::error::{MatchError, Result};
use crate::jsonl::{jsonl_all_lines_invalid, parse_jsonl_tolerant};
use crate::models::RequestLogEntry;

use super::CircleMatch;

pub const REQUEST_LOG_RELATIVE_PATH: &str = "logs/requests.jsonl";

impl CircleMatch {
    #[must_use]
    pub fn request_log_path(&self) -> PathBuf {
        self.root.join(REQUEST_LOG_RELATIVE_PATH)
    }

    /// Best effort: a log write failure never fails the logged operation.
    pub(super) fn try_log_request(&self, entry: &RequestLogEntry) {
        let path = self.request_log_path();
        if let Some(parent) = path.parent()
            && fs::create_dir_all(parent).is_err()
        {
            return;
        }
        if let Ok(mut line) = serde_json::to_string(entry)
            && let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path)
        {
            line.push('\n');
            let _ = file.write_all(line.as_bytes());
        }
    }

    pub(super) fn log_request_status(
        &self,
        request_id: String,
        operation: &str,
        status: &str,
        started: Instant,
        target: Option<String>,
        details: Option<serde_json::Value>,
    ) {
        self.try_log_request(&RequestLogEntry {
            request_id,
            operation: operation.to_string(),
            status: status.to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            target,
            error_code: None,
            error_message: None,
            details,
        });
    }

    pub(super) fn log_request_error(
        &self,
        request_id: String,
        operation: &str,
        started: Instant,
        target: Option<String>,
        err: &MatchError,
        details: Option<serde_json::Value>,
    ) {
        self.try_log_request(&RequestLogEntry {
            request_id,
            operation: operation.to_string(),
            status: "error".to_string(),
            latency_ms: started.elapsed().as_millis(),
            created_at: Utc::now().to_rfc3339(),
            target,
            error_code: Some(err.code().to_string()),
            error_message: Some(err.to_string()),
            details,
        });
    }

    /// Newest first.
    pub fn recent_requests(&self, limit: usize) -> Result<Vec<RequestLogEntry>> {
        self.recent_requests_filtered(limit, None, None)
    }

    pub fn recent_requests_filtered(
        &self,
        limit: usize,
        operation: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<RequestLogEntry>> {
        let path = self.request_log_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)?;
        let operation = operation.map(str::trim).filter(|x| !x.is_empty());
        let status = status.map(str::trim).filter(|x| !x.is_empty());

        let parsed = parse_jsonl_tolerant::<RequestLogEntry>(&raw);
        if parsed.items.is_empty() && parsed.skipped_lines > 0 {
            return Err(jsonl_all_lines_invalid(
                "request log",
                parsed.skipped_lines,
                parsed.first_error.as_ref(),
            ));
        }

        let mut entries = parsed
            .items
            .into_iter()
            .filter(|entry| operation.is_none_or(|op| entry.operation.eq_ignore_ascii_case(op)))
            .filter(|entry| status.is_none_or(|st| entry.status.eq_ignore_ascii_case(st)))
            .collect::<Vec<_>>();
        entries.reverse();
        entries.truncate(limit.max(1));
        Ok(entries)
    }
}
