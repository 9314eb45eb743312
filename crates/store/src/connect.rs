use crate::correlations::JsonCorrelationStore;
use crate::error::{Result, StoreError};
use crate::messages::JsonlMessageLog;
use crate::paths::{correlations_path, messages_path};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fixed-count, fixed-delay retry for reaching the stores at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 10,
            delay: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreHandles {
    pub messages: Arc<JsonlMessageLog>,
    pub correlations: Arc<JsonCorrelationStore>,
}

/// Opens both collections under `<data_dir>/<namespace>`, retrying per `policy`.
pub async fn connect(data_dir: &Path, namespace: &str, policy: RetryPolicy) -> Result<StoreHandles> {
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match open_once(data_dir, namespace).await {
            Ok(handles) => {
                log::info!(
                    "Connected to store {:?} (namespace '{namespace}')",
                    data_dir
                );
                return Ok(handles);
            }
            Err(err) => {
                log::warn!("Store not ready (attempt {attempt}/{attempts}): {err}");
                last_error = err.to_string();
                if attempt < attempts {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }

    Err(StoreError::Unavailable {
        attempts,
        reason: last_error,
    })
}

async fn open_once(data_dir: &Path, namespace: &str) -> Result<StoreHandles> {
    let messages = JsonlMessageLog::open(messages_path(data_dir, namespace)).await?;
    let correlations = JsonCorrelationStore::open(correlations_path(data_dir, namespace)).await?;
    Ok(StoreHandles {
        messages: Arc::new(messages),
        correlations: Arc::new(correlations),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn connect_creates_namespace() {
        let tmp = TempDir::new().unwrap();
        let handles = connect(tmp.path(), "db_badslido", RetryPolicy::default())
            .await
            .unwrap();
        assert!(handles.messages.path().exists());
        assert!(handles.correlations.path().exists());
    }

    #[tokio::test(start_paused = true)]
    async fn connect_gives_up_after_bounded_attempts() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let policy = RetryPolicy {
            attempts: 3,
            delay: Duration::from_secs(2),
        };
        let started = tokio::time::Instant::now();
        let Err(err) = connect(&blocker, "ns", policy).await else {
            panic!("expected connect to fail");
        };
        assert!(
            matches!(err, StoreError::Unavailable { attempts: 3, .. }),
            "unexpected error: {err}"
        );
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }
}
