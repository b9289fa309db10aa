use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::bail;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub type EventPayload = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    SessionStarted,
    SuggestionsReady,
    PromptRegenerated,
    BatchStarted,
    JobDispatched,
    JobSucceeded,
    JobFailed,
    BatchFinished,
    UpscaleStarted,
    UpscaleFinished,
    UpscaleFailed,
    RetryScheduled,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::SessionStarted => "session_started",
            EventKind::SuggestionsReady => "suggestions_ready",
            EventKind::PromptRegenerated => "prompt_regenerated",
            EventKind::BatchStarted => "batch_started",
            EventKind::JobDispatched => "job_dispatched",
            EventKind::JobSucceeded => "job_succeeded",
            EventKind::JobFailed => "job_failed",
            EventKind::BatchFinished => "batch_finished",
            EventKind::UpscaleStarted => "upscale_started",
            EventKind::UpscaleFinished => "upscale_finished",
            EventKind::UpscaleFailed => "upscale_failed",
            EventKind::RetryScheduled => "retry_scheduled",
        }
    }
}

/// Append-only writer for `events.jsonl`.
///
/// Each line carries `type`, `session_id` and `ts`. The payload must
/// serialize to a JSON object (or unit); its keys are merged last and may
/// override the defaults.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<EventLogInner>,
}

#[derive(Debug)]
struct EventLogInner {
    path: PathBuf,
    session_id: String,
    lock: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>, session_id: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(EventLogInner {
                path: path.into(),
                session_id: session_id.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn emit<P: Serialize + ?Sized>(&self, kind: EventKind, payload: &P) -> anyhow::Result<Value> {
        let fields = match serde_json::to_value(payload)? {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => bail!("{} payload must be a JSON object, got {other}", kind.as_str()),
        };
        let mut event = Map::new();
        event.insert("type".to_string(), Value::String(kind.as_str().to_string()));
        event.insert(
            "session_id".to_string(),
            Value::String(self.inner.session_id.clone()),
        );
        event.insert("ts".to_string(), Value::String(now_utc_iso()));
        event.extend(fields);

        if let Some(parent) = self.inner.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let line = serde_json::to_string(&event)?;
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("event log lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.inner.path)?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(event))
    }
}

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
