//! Remote profile discovery for linked devices.
//!
//! When a device is linked from a recovery phrase, the account's display
//! name lives in a configuration message somewhere on the network. The
//! [`ProfilePoller`] makes one pass over the places it might be and reports
//! the first name it finds.
//!
//! The transport itself is not modelled here. Each place to look is a
//! [`ProfileSource`]; how it fetches is its own business.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::cancel::LinkCancellation;
use crate::identity::AccountPublicId;

/// Errors from profile discovery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("profile source {source_name} failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("no profile source reachable after {attempts} attempts")]
    Unreachable { attempts: usize },
}

/// Looks up an account's display name, once.
#[async_trait]
pub trait ProfilePoller: Send + Sync {
    /// One pass of discovery. `Ok(None)` means nothing was found or the
    /// poll was cancelled; cancellation is never an error.
    async fn poll_once_for_display_name(
        &self,
        account_id: &AccountPublicId,
        cancel: &LinkCancellation,
    ) -> Result<Option<String>, PollError>;
}

/// One place a configuration message might be found.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    async fn fetch_display_name(
        &self,
        account_id: &AccountPublicId,
    ) -> Result<Option<String>, PollError>;
}

// ---------------------------------------------------------------------------
// SwarmProfilePoller
// ---------------------------------------------------------------------------

/// Asks each source in turn, one attempt per source.
///
/// Cancellation is checked before every attempt and raced against it, so a
/// slow source never delays a cancel.
pub struct SwarmProfilePoller {
    sources: Vec<Arc<dyn ProfileSource>>,
    attempt_timeout: Duration,
}

impl SwarmProfilePoller {
    pub fn new(sources: Vec<Arc<dyn ProfileSource>>, attempt_timeout: Duration) -> Self {
        Self {
            sources,
            attempt_timeout,
        }
    }
}

#[async_trait]
impl ProfilePoller for SwarmProfilePoller {
    async fn poll_once_for_display_name(
        &self,
        account_id: &AccountPublicId,
        cancel: &LinkCancellation,
    ) -> Result<Option<String>, PollError> {
        let mut failures = 0usize;

        for source in &self.sources {
            if cancel.is_cancelled() {
                debug!(source = source.name(), "profile poll cancelled");
                return Ok(None);
            }

            let attempt = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(source = source.name(), "profile poll cancelled mid-attempt");
                    return Ok(None);
                }
                res = tokio::time::timeout(
                    self.attempt_timeout,
                    source.fetch_display_name(account_id),
                ) => res,
            };

            match attempt {
                Ok(Ok(Some(name))) if !name.trim().is_empty() => {
                    debug!(source = source.name(), "display name found");
                    return Ok(Some(name));
                }
                Ok(Ok(_)) => {
                    debug!(source = source.name(), "no display name at source");
                }
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(source = source.name(), error = %e, "profile source failed");
                }
                Err(_) => {
                    failures += 1;
                    warn!(
                        source = source.name(),
                        timeout_ms = self.attempt_timeout.as_millis() as u64,
                        "profile source timed out"
                    );
                }
            }
        }

        if !self.sources.is_empty() && failures == self.sources.len() {
            return Err(PollError::Unreachable { attempts: failures });
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// ConfigMessageFile
// ---------------------------------------------------------------------------

/// A configuration message saved to disk as JSON, e.g. exported from
/// another device: `{"account_id": "05…", "display_name": "Alice"}`.
///
/// Messages for other accounts are ignored.
pub struct ConfigMessageFile {
    path: PathBuf,
    label: String,
}

#[derive(Debug, Deserialize)]
struct ConfigMessage {
    account_id: Option<String>,
    display_name: Option<String>,
}

impl ConfigMessageFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

#[async_trait]
impl ProfileSource for ConfigMessageFile {
    fn name(&self) -> &str {
        &self.label
    }

    async fn fetch_display_name(
        &self,
        account_id: &AccountPublicId,
    ) -> Result<Option<String>, PollError> {
        let fail = |reason: String| PollError::Source {
            source_name: self.label.clone(),
            reason,
        };

        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| fail(e.to_string()))?;
        let message: ConfigMessage =
            serde_json::from_slice(&raw).map_err(|e| fail(e.to_string()))?;

        if let Some(owner) = &message.account_id {
            if !owner.eq_ignore_ascii_case(account_id.as_str()) {
                return Ok(None);
            }
        }
        Ok(message.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::cancel::link_cancellation;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl ProfileSource for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }
        async fn fetch_display_name(
            &self,
            _: &AccountPublicId,
        ) -> Result<Option<String>, PollError> {
            Ok(self.0.map(str::to_string))
        }
    }

    struct Broken;

    #[async_trait]
    impl ProfileSource for Broken {
        fn name(&self) -> &str {
            "broken"
        }
        async fn fetch_display_name(
            &self,
            _: &AccountPublicId,
        ) -> Result<Option<String>, PollError> {
            Err(PollError::Source {
                source_name: "broken".into(),
                reason: "connection refused".into(),
            })
        }
    }

    struct Hangs;

    #[async_trait]
    impl ProfileSource for Hangs {
        fn name(&self) -> &str {
            "hangs"
        }
        async fn fetch_display_name(
            &self,
            _: &AccountPublicId,
        ) -> Result<Option<String>, PollError> {
            std::future::pending().await
        }
    }

    struct Counting(AtomicUsize);

    #[async_trait]
    impl ProfileSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }
        async fn fetch_display_name(
            &self,
            _: &AccountPublicId,
        ) -> Result<Option<String>, PollError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }
    }

    fn id() -> AccountPublicId {
        let mut key = [1u8; 33];
        key[0] = 5;
        AccountPublicId::from_versioned_key(&key)
    }

    #[tokio::test]
    async fn first_name_wins() {
        let poller = SwarmProfilePoller::new(
            vec![Arc::new(Fixed(None)), Arc::new(Fixed(Some("Alice"))), Arc::new(Fixed(Some("Bob")))],
            Duration::from_secs(1),
        );
        let name = poller
            .poll_once_for_display_name(&id(), &LinkCancellation::never())
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn a_failing_source_is_skipped() {
        let poller = SwarmProfilePoller::new(
            vec![Arc::new(Broken), Arc::new(Fixed(Some("Alice")))],
            Duration::from_secs(1),
        );
        let name = poller
            .poll_once_for_display_name(&id(), &LinkCancellation::never())
            .await
            .unwrap();
        assert_eq!(name.as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_error() {
        let poller =
            SwarmProfilePoller::new(vec![Arc::new(Broken), Arc::new(Broken)], Duration::from_secs(1));
        let err = poller
            .poll_once_for_display_name(&id(), &LinkCancellation::never())
            .await
            .unwrap_err();
        assert_eq!(err, PollError::Unreachable { attempts: 2 });
    }

    #[tokio::test]
    async fn blank_names_do_not_count() {
        let poller = SwarmProfilePoller::new(vec![Arc::new(Fixed(Some("   ")))], Duration::from_secs(1));
        let name = poller
            .poll_once_for_display_name(&id(), &LinkCancellation::never())
            .await
            .unwrap();
        assert!(name.is_none());
    }

    #[tokio::test]
    async fn pre_cancelled_poll_makes_no_attempt() {
        let counter = Arc::new(Counting(AtomicUsize::new(0)));
        let poller = SwarmProfilePoller::new(vec![counter.clone()], Duration::from_secs(1));
        let (handle, token) = link_cancellation();
        handle.cancel();
        let name = poller.poll_once_for_display_name(&id(), &token).await.unwrap();
        assert!(name.is_none());
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancel_interrupts_a_hung_attempt() {
        let poller = SwarmProfilePoller::new(vec![Arc::new(Hangs)], Duration::from_secs(3600));
        let (handle, token) = link_cancellation();
        let task = tokio::spawn(async move {
            poller.poll_once_for_display_name(&id(), &token).await
        });
        tokio::task::yield_now().await;
        handle.cancel();
        let res = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("poll should stop promptly")
            .unwrap();
        assert_eq!(res, Ok(None));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_times_out() {
        let poller = SwarmProfilePoller::new(vec![Arc::new(Hangs)], Duration::from_millis(50));
        let err = poller
            .poll_once_for_display_name(&id(), &LinkCancellation::never())
            .await
            .unwrap_err();
        assert_eq!(err, PollError::Unreachable { attempts: 1 });
    }

    #[tokio::test]
    async fn config_message_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let body = serde_json::json!({ "account_id": id().as_str(), "display_name": "Alice" });
        std::fs::write(&path, body.to_string()).unwrap();

        let source = ConfigMessageFile::new(&path);
        assert_eq!(
            source.fetch_display_name(&id()).await.unwrap().as_deref(),
            Some("Alice")
        );

        let mut other_key = [2u8; 33];
        other_key[0] = 5;
        let other = AccountPublicId::from_versioned_key(&other_key);
        assert!(source.fetch_display_name(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_config_file_is_a_source_error() {
        let source = ConfigMessageFile::new("/definitely/not/here.json");
        assert!(matches!(
            source.fetch_display_name(&id()).await,
            Err(PollError::Source { .. })
        ));
    }
}
