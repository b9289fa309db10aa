use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::now_utc_iso;
use crate::results::ResultStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub total_results: u64,
    pub draft_results: u64,
    pub upscaled_results: u64,
    pub failed_jobs: u64,
}

impl SessionSummary {
    pub fn from_store(
        session_id: impl Into<String>,
        started_at: impl Into<String>,
        store: &ResultStore,
        failed_jobs: u64,
    ) -> Self {
        let upscaled = store.iter().filter(|item| item.is_upscaled()).count() as u64;
        let total = store.len() as u64;
        Self {
            session_id: session_id.into(),
            started_at: started_at.into(),
            finished_at: now_utc_iso(),
            total_results: total,
            draft_results: total - upscaled,
            upscaled_results: upscaled,
            failed_jobs,
        }
    }
}

pub fn write_summary(
    path: &Path,
    summary: &SessionSummary,
    extra: Option<&Map<String, Value>>,
) -> anyhow::Result<()> {
    let mut payload = match serde_json::to_value(summary)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    payload.insert("ts".to_string(), Value::String(now_utc_iso()));
    if let Some(extra) = extra {
        for (key, value) in extra {
            payload.insert(key.clone(), value.clone());
        }
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&Value::Object(payload))?)?;
    Ok(())
}
