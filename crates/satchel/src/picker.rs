//! File-selection UI collaborator.
//!
//! Selection is inherently asynchronous: the platform shows its UI and the
//! result arrives later as a single-shot continuation, with no timeout.
//! Cancellation is a terminal outcome of its own, not an error. The crate
//! ships no platform implementation — the embedding application injects
//! one, and tests script the trait directly.

use async_trait::async_trait;

use crate::bookmark::ResourceHandle;
use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickIntent {
    Open,
    Save,
}

/// What the selection UI is asked to offer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickRequest {
    pub intent: PickIntent,
    /// Allowed content types, e.g. extensions or platform type identifiers.
    pub allowed: Vec<String>,
}

impl PickRequest {
    pub fn new(intent: PickIntent, allowed: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            intent,
            allowed: allowed.into_iter().map(Into::into).collect(),
        }
    }
}

/// Terminal result of one picker interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Picked {
    Chosen(ResourceHandle),
    Cancelled,
}

#[async_trait]
pub trait FilePicker: Send + Sync {
    /// Present the selection UI and wait for the user's response.
    async fn pick(&self, request: PickRequest) -> Result<Picked, Error>;
}
