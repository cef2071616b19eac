//! Stdin payload source.
//!
//! Reads one JSON document per line from standard input:
//!
//! ```sh
//! echo '[{"type":"key","id":"k","actions":[{"type":"keyDown","value":"a"}]}]' | actionforge
//! ```
//!
//! Blank lines are skipped. Malformed lines and documents without an `actions`
//! array are logged and ignored. EOF or a closed channel ends the task.

use serde_json::Value;
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::mpsc::Sender,
    task::JoinHandle,
};
use tracing::{error, info, trace, warn};

use super::{PayloadSource, normalize_payload};

/// Source that reads newline-delimited payloads from stdin.
#[derive(Debug, Clone, Default)]
pub struct StdinSource;

impl StdinSource {
    /// Construct a new `StdinSource`.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PayloadSource for StdinSource {
    fn name(&self) -> &'static str {
        "stdin"
    }

    fn start(&self, sender: Sender<Value>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(target: "actionforge::sources", "StdinSource task started (reading lines)");
            let forwarded = forward_lines(BufReader::new(io::stdin()), &sender).await;
            trace!(target: "actionforge::sources", forwarded, "StdinSource task ended");
        })
    }
}

/// Forward every payload line of `reader` to `sender`. Returns how many were sent.
pub(crate) async fn forward_lines<R>(mut reader: R, sender: &Sender<Value>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    let mut forwarded = 0;

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                info!(target: "actionforge::sources", "EOF on stdin; StdinSource exiting");
                break;
            }
            Ok(_) => {
                let raw = line.trim();
                if raw.is_empty() {
                    continue;
                }
                let value = match serde_json::from_str::<Value>(raw) {
                    Ok(value) => value,
                    Err(e) => {
                        warn!(
                            target: "actionforge::sources",
                            error = %e,
                            line = raw,
                            "Failed to parse stdin JSON line"
                        );
                        continue;
                    }
                };
                let Some(payload) = normalize_payload(value, "stdin") else {
                    continue;
                };
                if let Err(e) = sender.send(payload).await {
                    error!(
                        target: "actionforge::sources",
                        error = %e,
                        "Channel closed while sending stdin payload; terminating task"
                    );
                    break;
                }
                forwarded += 1;
            }
            Err(e) => {
                warn!(
                    target: "actionforge::sources",
                    error = %e,
                    "Error reading from stdin; terminating task"
                );
                break;
            }
        }
    }

    forwarded
}
