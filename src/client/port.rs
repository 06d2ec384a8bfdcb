use crate::domain_model::Route;
use std::fmt;
use std::sync::Arc;

// region status source

/// Fetches the current status of one externally executing job.
#[async_trait::async_trait]
pub trait StatusSource<S>: Send + Sync {
    async fn fetch_status(&self) -> anyhow::Result<S>;
}

// endregion

// region response hooks

#[derive(Debug, Clone, Copy, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct HookId(pub u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// A response as seen by registered hooks, before the caller decodes it.
#[derive(Debug)]
pub struct InspectedResponse<'a> {
    pub request_id: &'a str,
    pub status: u16,
    pub body: &'a [u8],
}

impl InspectedResponse<'_> {
    /// True when the body is a JSON object with `forceLogout: true`.
    pub fn has_force_logout(&self) -> bool {
        has_force_logout_marker(self.body)
    }
}

pub fn has_force_logout_marker(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("forceLogout").and_then(|v| v.as_bool()))
        .unwrap_or(false)
}

#[async_trait::async_trait]
pub trait ResponseHook: Send + Sync {
    async fn on_response(&self, response: &InspectedResponse<'_>);
}

/// Registration point for response hooks.
pub trait HookRegistry: Send + Sync {
    /// Returns `None` when the hook could not be stored.
    fn register(&self, hook: Arc<dyn ResponseHook>) -> Option<HookId>;
    /// Returns false when the id was not registered.
    fn eject(&self, id: HookId) -> bool;
}

// endregion

// region navigation

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

// endregion
