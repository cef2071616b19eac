//! Drop-file payload source.
//!
//! Polls a single path at a fixed interval. A producer writes a perform-actions
//! payload (or a bare `actions` array) to the file; the source forwards it.
//!
//! - With `delete_on_success`, the file is removed after each forwarded payload,
//!   so every new request is a new file.
//! - Otherwise the file is forwarded again only when its (length, mtime)
//!   signature changes.
//! - Empty files are ignored. Invalid JSON is logged and retried on the next poll.
//! - A missing file is silent until it appears.

use std::fs;
use std::time::{Duration, SystemTime};

use serde_json::Value;
use tokio::{
    fs as afs,
    sync::mpsc::Sender,
    task::JoinHandle,
    time::{Instant, sleep},
};
use tracing::{error, info, trace, warn};

use super::{PayloadSource, normalize_payload};

const DEFAULT_POLL_MS: u64 = 100;
const MIN_POLL_MS: u64 = 10;

/// Source that polls a single file for payloads.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: String,
    poll_ms: u64,
    delete_on_success: bool,
}

impl FileSource {
    /// Create a new `FileSource`.
    ///
    /// `poll_ms` defaults to 100ms and is clamped to at least 10ms.
    pub fn new(path: String, poll_ms: Option<u64>, delete_on_success: Option<bool>) -> Self {
        Self {
            path,
            poll_ms: poll_ms.unwrap_or(DEFAULT_POLL_MS).max(MIN_POLL_MS),
            delete_on_success: delete_on_success.unwrap_or(false),
        }
    }

    /// Coarse change signature: (length, mtime seconds).
    fn file_signature(meta: &fs::Metadata) -> (u64, u64) {
        let len = meta.len();
        let mtime = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        (len, mtime)
    }
}

impl PayloadSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    fn start(&self, sender: Sender<Value>) -> JoinHandle<()> {
        let path = self.path.clone();
        let poll_ms = self.poll_ms;
        let delete_on_success = self.delete_on_success;

        tokio::spawn(async move {
            info!(
                target: "actionforge::sources",
                %path, poll_ms, delete_on_success,
                "FileSource task started"
            );

            let mut last_sig: Option<(u64, u64)> = None;
            let interval = Duration::from_millis(poll_ms);
            let mut next_tick = Instant::now();

            loop {
                let now = Instant::now();
                if now < next_tick {
                    sleep(next_tick - now).await;
                }
                next_tick += interval;

                let meta = match fs::metadata(&path) {
                    Ok(m) if m.is_file() => m,
                    Ok(_) => {
                        warn!(
                            target: "actionforge::sources",
                            %path,
                            "Path exists but is not a regular file"
                        );
                        continue;
                    }
                    Err(_) => continue,
                };

                let sig = Self::file_signature(&meta);
                if !delete_on_success && last_sig == Some(sig) {
                    trace!(target: "actionforge::sources", %path, "File unchanged; skipping");
                    continue;
                }

                let content = match afs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        warn!(target: "actionforge::sources", %path, error = %e, "Failed to read file");
                        continue;
                    }
                };
                let trimmed = content.trim();
                if trimmed.is_empty() {
                    trace!(target: "actionforge::sources", %path, "File is empty; ignoring");
                    continue;
                }
                let value = match serde_json::from_str::<Value>(trimmed) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            target: "actionforge::sources",
                            %path, error = %e,
                            "Failed to parse JSON; will retry"
                        );
                        continue;
                    }
                };

                // Consumed either way; a payload without actions is not retried.
                if delete_on_success {
                    if let Err(e) = afs::remove_file(&path).await {
                        warn!(
                            target: "actionforge::sources",
                            %path, error = %e,
                            "Failed to delete file after dispatch"
                        );
                    }
                } else {
                    last_sig = Some(sig);
                }

                let Some(payload) = normalize_payload(value, &path) else {
                    continue;
                };
                if let Err(e) = sender.send(payload).await {
                    error!(
                        target: "actionforge::sources",
                        %path, error = %e,
                        "Channel closed; FileSource terminating"
                    );
                    break;
                }
                info!(target: "actionforge::sources", %path, "Forwarded payload from file");
            }

            info!(target: "actionforge::sources", %path, "FileSource task ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    #[test]
    fn poll_interval_has_a_floor() {
        assert_eq!(FileSource::new("x".into(), Some(50), Some(false)).poll_ms, 50);
        assert_eq!(FileSource::new("y".into(), Some(1), None).poll_ms, MIN_POLL_MS);
        assert_eq!(FileSource::new("z".into(), None, None).poll_ms, DEFAULT_POLL_MS);
    }

    #[tokio::test]
    async fn forwards_and_deletes_dropped_file() {
        let path = std::env::temp_dir().join(format!("actionforge-drop-{}.json", std::process::id()));
        std::fs::write(&path, r#"[{"type": "none", "id": "n", "actions": []}]"#).unwrap();

        let (tx, mut rx) = mpsc::channel::<Value>(1);
        let source = FileSource::new(path.display().to_string(), Some(10), Some(true));
        let handle = source.start(tx);

        let payload = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
        assert_eq!(
            payload,
            Some(json!({"actions": [{"type": "none", "id": "n", "actions": []}]}))
        );
        handle.abort();
        assert!(!path.exists());
    }
}
