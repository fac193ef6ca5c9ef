//! The persistence façade: save and load typed values at user-chosen
//! external locations, remembered by key.
//!
//! Each call drives the same state machine: Resolve the stored locator,
//! Prompt when it is absent or stale, enter the Access bracket, Transfer
//! bytes through the codec, and Commit a fresh locator only after the
//! transfer succeeded. Cancellation — by the user in the picker or by a
//! declining supplier — is a silent terminal outcome, never an error, and
//! failures leave previously stored locator state untouched.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::access::{AccessBroker, AccessScope};
use crate::bookmark::{BookmarkProvider, BookmarkRegistry, ResourceHandle, Resolved};
use crate::codec::Payload;
use crate::error::Error;
use crate::kv::KeyValueStore;
use crate::picker::{FilePicker, PickIntent, PickRequest, Picked};

/// Terminal result of a façade call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T> {
    Done(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn done(self) -> Option<T> {
        match self {
            Self::Done(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

pub struct Satchel {
    registry: BookmarkRegistry,
    access: Arc<dyn AccessBroker>,
    picker: Arc<dyn FilePicker>,
    allowed: Vec<String>,
}

impl Satchel {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn BookmarkProvider>,
        access: Arc<dyn AccessBroker>,
        picker: Arc<dyn FilePicker>,
    ) -> Self {
        Self {
            registry: BookmarkRegistry::new(provider, store),
            access,
            picker,
            allowed: vec!["folder".to_owned()],
        }
    }

    /// Replace the allowed-type filter forwarded to pick requests.
    pub fn with_allowed_types(
        mut self,
        allowed: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed = allowed.into_iter().map(Into::into).collect();
        self
    }

    /// Save a value into `file_name` inside the location remembered under
    /// `key`, prompting for a location when none is remembered or the
    /// remembered one is stale. The supplier may decline by returning
    /// `None`, which cancels the call.
    pub async fn save<P, F>(
        &self,
        key: &str,
        file_name: &str,
        supply: F,
    ) -> Result<Outcome<()>, Error>
    where
        P: Payload,
        F: FnOnce() -> Option<P>,
    {
        let handle = match self.resolve_or_prompt(key, PickIntent::Save).await? {
            Outcome::Done(handle) => handle,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };

        let scope = AccessScope::enter(self.access.as_ref(), &handle)?;

        let Some(value) = supply() else {
            debug!(key, "supplier declined, nothing saved");
            return Ok(Outcome::Cancelled);
        };
        let bytes = value.encode(false)?;
        let target = scope.handle().join(file_name);
        std::fs::write(&target, &bytes).map_err(|err| Error::from_io_at(&target, err))?;
        debug!(key, file = %target.display(), len = bytes.len(), "wrote payload");

        let locator = self.registry.create(scope.handle())?;
        drop(scope);
        self.registry.store(key, &locator)?;
        Ok(Outcome::Done(()))
    }

    /// Load a value from `file_name` inside the location remembered under
    /// `key`, prompting for a location when none is remembered or the
    /// remembered one is stale.
    pub async fn load<P: Payload>(
        &self,
        key: &str,
        file_name: &str,
    ) -> Result<Outcome<P>, Error> {
        let handle = match self.resolve_or_prompt(key, PickIntent::Open).await? {
            Outcome::Done(handle) => handle,
            Outcome::Cancelled => return Ok(Outcome::Cancelled),
        };

        let scope = AccessScope::enter(self.access.as_ref(), &handle)?;

        let source = scope.handle().join(file_name);
        let bytes = std::fs::read(&source).map_err(|err| Error::from_io_at(&source, err))?;
        let value = P::decode(&bytes)?;
        debug!(key, file = %source.display(), len = bytes.len(), "read payload");

        let locator = self.registry.create(scope.handle())?;
        drop(scope);
        self.registry.store(key, &locator)?;
        Ok(Outcome::Done(value))
    }

    /// Forget the location remembered under `key`.
    pub fn forget(&self, key: &str) -> Result<(), Error> {
        self.registry.remove(key)
    }

    /// Resolve step: a fresh stored locator short-circuits to its handle;
    /// an absent, stale, or unresolvable one falls through to the picker.
    async fn resolve_or_prompt(
        &self,
        key: &str,
        intent: PickIntent,
    ) -> Result<Outcome<ResourceHandle>, Error> {
        match self.registry.load(key) {
            Ok(locator) => match self.registry.resolve(&locator) {
                Ok(Resolved {
                    handle,
                    stale: false,
                }) => {
                    debug!(key, "locator fresh");
                    return Ok(Outcome::Done(handle));
                }
                Ok(Resolved { stale: true, .. }) => {
                    debug!(key, "locator stale, prompting");
                }
                Err(err) => {
                    warn!(key, error = %err, "locator failed to resolve, prompting");
                }
            },
            Err(Error::NotFound(_)) => {
                debug!(key, "no stored locator, prompting");
            }
            Err(err) => return Err(err),
        }

        let request = PickRequest {
            intent,
            allowed: self.allowed.clone(),
        };
        match self.picker.pick(request).await? {
            Picked::Chosen(handle) => Ok(Outcome::Done(handle)),
            Picked::Cancelled => {
                debug!(key, "selection cancelled");
                Ok(Outcome::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    use crate::bookmark::FsBookmarks;
    use crate::codec::Json;
    use crate::kv::MemoryStore;
    use crate::picker::Picked;
    use crate::test_util::{CountingBroker, ScriptedPicker};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    struct Counter {
        count: u32,
    }

    struct Fixture {
        satchel: Satchel,
        store: MemoryStore,
        picker: Arc<ScriptedPicker>,
        broker: Arc<CountingBroker>,
    }

    fn fixture(responses: impl IntoIterator<Item = Picked>) -> Fixture {
        let store = MemoryStore::new();
        let picker = Arc::new(ScriptedPicker::with_responses(responses));
        let broker = Arc::new(CountingBroker::granting());
        let satchel = Satchel::new(
            Arc::new(store.clone()),
            Arc::new(FsBookmarks),
            broker.clone(),
            picker.clone(),
        );
        Fixture {
            satchel,
            store,
            picker,
            broker,
        }
    }

    #[tokio::test]
    async fn first_save_prompts_writes_and_remembers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fx = fixture([Picked::Chosen(ResourceHandle::new(dir.path()))]);

        let outcome = fx
            .satchel
            .save("cfg", "cfg.json", || Some(Json(Counter { count: 3 })))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done(()));

        let written = std::fs::read_to_string(dir.path().join("cfg.json")).unwrap();
        assert_eq!(written, r#"{"count":3}"#);
        assert!(fx.store.get("cfg").is_ok(), "locator committed under key");
        assert_eq!(fx.picker.requests().len(), 1);
    }

    #[tokio::test]
    async fn load_with_fresh_locator_skips_the_prompt() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cfg.json"), br#"{"count":3}"#).unwrap();

        let fx = fixture([]);
        let registry =
            BookmarkRegistry::new(Arc::new(FsBookmarks), Arc::new(fx.store.clone()));
        let locator = registry.create(&ResourceHandle::new(dir.path())).unwrap();
        registry.store("cfg", &locator).unwrap();

        let outcome = fx
            .satchel
            .load::<Json<Counter>>("cfg", "cfg.json")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done(Json(Counter { count: 3 })));
        assert!(fx.picker.requests().is_empty(), "no prompt shown");
    }

    #[tokio::test]
    async fn stale_locator_prompts_and_cancel_leaves_state_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let vanished = dir.path().join("vanished");
        std::fs::create_dir(&vanished).unwrap();

        let fx = fixture([Picked::Cancelled]);
        let registry =
            BookmarkRegistry::new(Arc::new(FsBookmarks), Arc::new(fx.store.clone()));
        let locator = registry.create(&ResourceHandle::new(&vanished)).unwrap();
        registry.store("cfg", &locator).unwrap();
        std::fs::remove_dir(&vanished).unwrap();

        let outcome = fx
            .satchel
            .load::<Json<Counter>>("cfg", "cfg.json")
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(fx.picker.requests().len(), 1, "prompt was shown");
        assert_eq!(
            registry.load("cfg").unwrap(),
            locator,
            "stored locator unchanged"
        );
    }

    #[tokio::test]
    async fn supplier_decline_cancels_without_writing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fx = fixture([Picked::Chosen(ResourceHandle::new(dir.path()))]);

        let outcome = fx
            .satchel
            .save::<Json<Counter>, _>("cfg", "cfg.json", || None)
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
        assert!(!dir.path().join("cfg.json").exists());
        assert!(matches!(fx.store.get("cfg"), Err(Error::NotFound(_))));
        assert_eq!(fx.broker.released(), 1, "access bracket still released");
    }

    #[tokio::test]
    async fn denied_access_is_an_error_and_commits_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MemoryStore::new();
        let picker = Arc::new(ScriptedPicker::with_responses([Picked::Chosen(
            ResourceHandle::new(dir.path()),
        )]));
        let satchel = Satchel::new(
            Arc::new(store.clone()),
            Arc::new(FsBookmarks),
            Arc::new(CountingBroker::denying()),
            picker,
        );

        let result = satchel
            .save("cfg", "cfg.json", || Some(Json(Counter { count: 1 })))
            .await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert!(matches!(store.get("cfg"), Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn decode_failure_surfaces_and_leaves_locator_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("cfg.json"), b"not json at all").unwrap();

        let fx = fixture([]);
        let registry =
            BookmarkRegistry::new(Arc::new(FsBookmarks), Arc::new(fx.store.clone()));
        let locator = registry.create(&ResourceHandle::new(dir.path())).unwrap();
        registry.store("cfg", &locator).unwrap();

        let result = fx.satchel.load::<Json<Counter>>("cfg", "cfg.json").await;
        assert!(matches!(result, Err(Error::Codec(_))));
        assert_eq!(registry.load("cfg").unwrap(), locator);
    }

    #[tokio::test]
    async fn save_refreshes_a_stale_locator_after_repick() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::create_dir(&first).unwrap();
        std::fs::create_dir(&second).unwrap();

        let fx = fixture([Picked::Chosen(ResourceHandle::new(&second))]);
        let registry =
            BookmarkRegistry::new(Arc::new(FsBookmarks), Arc::new(fx.store.clone()));
        let old = registry.create(&ResourceHandle::new(&first)).unwrap();
        registry.store("cfg", &old).unwrap();
        std::fs::remove_dir(&first).unwrap();

        let outcome = fx
            .satchel
            .save("cfg", "cfg.json", || Some(Json(Counter { count: 9 })))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done(()));
        assert!(second.join("cfg.json").exists());

        let refreshed = registry.load("cfg").unwrap();
        assert_ne!(refreshed, old);
        let resolved = registry.resolve(&refreshed).unwrap();
        assert!(!resolved.stale);
        assert_eq!(resolved.handle, ResourceHandle::new(&second));
    }

    #[tokio::test]
    async fn raw_bytes_pass_through_the_facade_unchanged() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fx = fixture([Picked::Chosen(ResourceHandle::new(dir.path()))]);
        let payload = crate::codec::RawBytes(vec![1, 2, 3, 0xff]);

        fx.satchel
            .save("blob", "blob.bin", || Some(payload.clone()))
            .await
            .unwrap();
        let outcome = fx
            .satchel
            .load::<crate::codec::RawBytes>("blob", "blob.bin")
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Done(payload));
    }

    #[tokio::test]
    async fn pick_request_carries_intent_and_filter() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fx = fixture([Picked::Chosen(ResourceHandle::new(dir.path()))]);
        let satchel = fx.satchel.with_allowed_types(["folder", "directory"]);

        satchel
            .save("cfg", "cfg.json", || Some(Json(Counter { count: 0 })))
            .await
            .unwrap();

        let requests = fx.picker.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].intent, PickIntent::Save);
        assert_eq!(requests[0].allowed, vec!["folder", "directory"]);
    }

    #[tokio::test]
    async fn forget_drops_the_remembered_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fx = fixture([
            Picked::Chosen(ResourceHandle::new(dir.path())),
            Picked::Cancelled,
        ]);

        fx.satchel
            .save("cfg", "cfg.json", || Some(Json(Counter { count: 1 })))
            .await
            .unwrap();
        fx.satchel.forget("cfg").unwrap();

        // With the location forgotten the next load prompts again.
        let outcome = fx
            .satchel
            .load::<Json<Counter>>("cfg", "cfg.json")
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(fx.picker.requests().len(), 2);
    }
}
