//! Shared test fakes for the collaborator traits.
//!
//! `ScriptedPicker` replays canned picker responses and records the
//! requests it saw; `CountingBroker` counts acquisitions and releases so
//! tests can assert the bracket discipline.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::access::AccessBroker;
use crate::bookmark::ResourceHandle;
use crate::error::Error;
use crate::picker::{FilePicker, PickRequest, Picked};

// ==============================================================================
// ScriptedPicker
// ==============================================================================

pub(crate) struct ScriptedPicker {
    responses: Mutex<VecDeque<Picked>>,
    requests: Mutex<Vec<PickRequest>>,
}

impl ScriptedPicker {
    pub fn with_responses(responses: impl IntoIterator<Item = Picked>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<PickRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clone()
    }
}

#[async_trait]
impl FilePicker for ScriptedPicker {
    async fn pick(&self, request: PickRequest) -> Result<Picked, Error> {
        self.requests
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .push(request);
        self.responses
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .pop_front()
            .ok_or_else(|| Error::Picker("picker script exhausted".to_owned()))
    }
}

// ==============================================================================
// CountingBroker
// ==============================================================================

pub(crate) struct CountingBroker {
    deny: bool,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl CountingBroker {
    pub fn granting() -> Self {
        Self {
            deny: false,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::granting()
        }
    }

    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl AccessBroker for CountingBroker {
    fn acquire(&self, handle: &ResourceHandle) -> Result<(), Error> {
        if self.deny {
            return Err(Error::PermissionDenied(
                handle.path().display().to_string(),
            ));
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self, _handle: &ResourceHandle) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
