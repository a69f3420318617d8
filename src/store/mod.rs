//! Durable binding store
//!
//! Loads one [`BindingSetting`] per target, substituting defaults for
//! missing or malformed records, and persists trigger and interval
//! changes. Writes are read-modify-write cycles serialized behind an
//! async mutex, so concurrent callers never interleave.

mod backend;
mod record;

pub use backend::{Backend, FileBackend, MemoryBackend};

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::binding::{clamp_interval, BindingSetting, TargetButton, Trigger};

use record::{parse_document, setting_for, StoredRecord};

/// Errors from persisting binding records
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode binding document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("storage task panicked: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Persistent per-target binding records. Cheap to clone.
#[derive(Clone)]
pub struct BindingStore {
    backend: Arc<dyn Backend>,
    write_lock: Arc<Mutex<()>>,
}

impl BindingStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store backed by an in-memory document
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load one setting per target, in [`TargetButton::ALL`] order. Never
    /// fails: unreadable storage yields defaults.
    pub async fn load_all(&self) -> Vec<BindingSetting> {
        let _guard = self.write_lock.lock().await;
        let contents = match self.read_backend().await {
            Ok(contents) => contents,
            Err(e) => {
                warn!(?e, "failed to read binding store, using defaults");
                None
            }
        };
        let document = parse_document(contents.as_deref());

        TargetButton::ALL
            .iter()
            .map(|target| setting_for(&document, *target))
            .collect()
    }

    /// Persist the trigger for `target`, `None` to unset it
    pub async fn set_trigger(
        &self,
        target: TargetButton,
        trigger: Option<&Trigger>,
    ) -> Result<(), StoreError> {
        let trigger = trigger.cloned();
        self.update(target, move |setting| setting.trigger = trigger)
            .await
            .map(|_| ())
    }

    /// Persist the interval for `target`, clamped into range. Returns the
    /// value actually stored.
    pub async fn set_interval(&self, target: TargetButton, ms: i64) -> Result<u64, StoreError> {
        let interval_ms = clamp_interval(ms);
        self.update(target, move |setting| setting.interval_ms = interval_ms)
            .await
            .map(|setting| setting.interval_ms)
    }

    /// Rewrite the record for `target`, leaving every other record as stored.
    /// An unreadable document aborts the write.
    async fn update<F>(&self, target: TargetButton, apply: F) -> Result<BindingSetting, StoreError>
    where
        F: FnOnce(&mut BindingSetting),
    {
        let _guard = self.write_lock.lock().await;

        let contents = self.read_backend().await?;
        let mut document = parse_document(contents.as_deref());

        let mut setting = setting_for(&document, target);
        apply(&mut setting);

        document.insert(
            target.as_str().to_string(),
            serde_json::to_value(StoredRecord::from_setting(&setting))?,
        );
        self.write_backend(serde_json::to_string_pretty(&document)?).await?;

        debug!(
            %target,
            interval_ms = setting.interval_ms,
            trigger = ?setting.trigger,
            "binding record saved"
        );
        Ok(setting)
    }

    // Backend I/O is synchronous and may fsync; keep it off the async workers
    async fn read_backend(&self) -> Result<Option<String>, StoreError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.read()).await?
    }

    async fn write_backend(&self, contents: String) -> Result<(), StoreError> {
        let backend = Arc::clone(&self.backend);
        tokio::task::spawn_blocking(move || backend.write(&contents)).await?
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::binding::DEFAULT_INTERVAL_MS;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_empty_store_loads_defaults() {
        let store = BindingStore::in_memory();
        let settings = store.load_all().await;

        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0], BindingSetting::new(TargetButton::Primary));
        assert_eq!(settings[1], BindingSetting::new(TargetButton::Secondary));
    }

    #[tokio::test]
    async fn test_set_trigger_leaves_other_target_unchanged() {
        let store = BindingStore::in_memory();
        assert_ok!(
            store
                .set_trigger(TargetButton::Secondary, Some(&Trigger::mouse(4)))
                .await
        );
        assert_ok!(
            store
                .set_trigger(TargetButton::Primary, Some(&Trigger::keyboard("F", 3)))
                .await
        );

        let settings = store.load_all().await;
        assert_eq!(settings[0].trigger, Some(Trigger::keyboard("F", 3)));
        assert_eq!(settings[1].trigger, Some(Trigger::mouse(4)));
    }

    #[tokio::test]
    async fn test_unset_trigger() {
        let store = BindingStore::in_memory();
        assert_ok!(
            store
                .set_trigger(TargetButton::Primary, Some(&Trigger::mouse(3)))
                .await
        );
        assert_ok!(store.set_trigger(TargetButton::Primary, None).await);

        assert!(store.load_all().await[0].trigger.is_none());
    }

    #[tokio::test]
    async fn test_set_interval_clamps() {
        let store = BindingStore::in_memory();

        assert_eq!(store.set_interval(TargetButton::Primary, 3).await.unwrap(), 10);
        assert_eq!(store.set_interval(TargetButton::Primary, 10).await.unwrap(), 10);
        assert_eq!(store.set_interval(TargetButton::Primary, 437).await.unwrap(), 437);
        assert_eq!(
            store.set_interval(TargetButton::Secondary, 1000).await.unwrap(),
            1000
        );
        assert_eq!(
            store.set_interval(TargetButton::Secondary, 99_999).await.unwrap(),
            1000
        );

        let settings = store.load_all().await;
        assert_eq!(settings[0].interval_ms, 437);
        assert_eq!(settings[1].interval_ms, 1000);
    }

    #[tokio::test]
    async fn test_malformed_sibling_record_is_left_alone() {
        let backend = Arc::new(MemoryBackend::with_contents(
            r#"{"secondary": {"target": "secondary", "intervalMs": "fast"}}"#,
        ));
        let store = BindingStore::new(backend.clone());

        assert_ok!(store.set_interval(TargetButton::Primary, 200).await);

        let contents = backend.contents().unwrap();
        assert!(contents.contains("\"fast\""));
        let settings = store.load_all().await;
        assert_eq!(settings[0].interval_ms, 200);
        assert_eq!(settings[1], BindingSetting::new(TargetButton::Secondary));
    }

    #[tokio::test]
    async fn test_concurrent_writes_are_serialized() {
        let store = BindingStore::in_memory();

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let target = TargetButton::ALL[i % 2];
                store.set_trigger(target, Some(&Trigger::mouse(i as i64))).await
            }));
        }
        for handle in handles {
            assert_ok!(handle.await.unwrap());
        }

        // Both records survive every interleaving of the read-modify-write cycles
        let settings = store.load_all().await;
        assert!(matches!(settings[0].trigger, Some(Trigger::Mouse { button }) if button % 2 == 0));
        assert!(matches!(settings[1].trigger, Some(Trigger::Mouse { button }) if button % 2 == 1));
    }

    /// Memory backend whose reads can be switched off
    #[derive(Default)]
    struct FlakyBackend {
        inner: MemoryBackend,
        fail_reads: AtomicBool,
    }

    impl Backend for FlakyBackend {
        fn read(&self) -> Result<Option<String>, StoreError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into());
            }
            self.inner.read()
        }

        fn write(&self, contents: &str) -> Result<(), StoreError> {
            self.inner.write(contents)
        }
    }

    #[tokio::test]
    async fn test_unreadable_document_aborts_write() {
        let backend = Arc::new(FlakyBackend::default());
        let store = BindingStore::new(backend.clone());
        assert_ok!(
            store
                .set_trigger(TargetButton::Secondary, Some(&Trigger::mouse(4)))
                .await
        );
        let before = backend.inner.contents();

        backend.fail_reads.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.set_interval(TargetButton::Primary, 200).await,
            Err(StoreError::Io(_))
        ));
        assert!(store.set_trigger(TargetButton::Primary, None).await.is_err());
        assert_eq!(backend.inner.contents(), before);

        // Loading still degrades to defaults while reads fail
        assert_eq!(
            store.load_all().await[1],
            BindingSetting::new(TargetButton::Secondary)
        );

        backend.fail_reads.store(false, Ordering::SeqCst);
        let settings = store.load_all().await;
        assert_eq!(settings[0].interval_ms, DEFAULT_INTERVAL_MS);
        assert_eq!(settings[1].trigger, Some(Trigger::mouse(4)));
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bindings.json");

        let store = BindingStore::new(Arc::new(FileBackend::new(&path)));
        assert_ok!(
            store
                .set_trigger(TargetButton::Primary, Some(&Trigger::keyboard("F", 3)))
                .await
        );
        assert_ok!(store.set_interval(TargetButton::Primary, 40).await);

        let reopened = BindingStore::new(Arc::new(FileBackend::new(&path)));
        let settings = reopened.load_all().await;
        assert_eq!(settings[0].trigger, Some(Trigger::keyboard("F", 3)));
        assert_eq!(settings[0].interval_ms, 40);
    }
}
