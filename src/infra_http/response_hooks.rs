use crate::client::{HookId, HookRegistry, InspectedResponse, ResponseHook};
use crate::logger::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Ordered set of response hooks run by [`super::ApiClient`] on every response.
pub struct ResponseHooks {
    next_id: AtomicU64,
    hooks: Mutex<Vec<(HookId, Arc<dyn ResponseHook>)>>,
}

impl ResponseHooks {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            hooks: Mutex::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().map(|lock| lock.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every hook registered at the time of the call, in registration order.
    pub async fn dispatch(&self, response: &InspectedResponse<'_>) {
        let hooks: Vec<Arc<dyn ResponseHook>> = match self.hooks.lock() {
            Ok(lock) => lock.iter().map(|(_, hook)| hook.clone()).collect(),
            Err(_) => return,
        };
        for hook in hooks {
            hook.on_response(response).await;
        }
    }
}

impl Default for ResponseHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl HookRegistry for ResponseHooks {
    fn register(&self, hook: Arc<dyn ResponseHook>) -> Option<HookId> {
        let mut lock = self.hooks.lock().ok()?;
        let id = HookId(self.next_id.fetch_add(1, Ordering::SeqCst));
        lock.push((id, hook));
        trace!(%id, "response hook registered");
        Some(id)
    }

    fn eject(&self, id: HookId) -> bool {
        let Ok(mut lock) = self.hooks.lock() else {
            return false;
        };
        let before = lock.len();
        lock.retain(|(hook_id, _)| *hook_id != id);
        let removed = lock.len() != before;
        if removed {
            trace!(%id, "response hook ejected");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingHook(AtomicUsize);

    #[async_trait::async_trait]
    impl ResponseHook for CountingHook {
        async fn on_response(&self, _response: &InspectedResponse<'_>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn response() -> InspectedResponse<'static> {
        InspectedResponse {
            request_id: "req",
            status: 200,
            body: b"{}",
        }
    }

    #[tokio::test]
    async fn ejected_hooks_stop_receiving_responses() {
        let hooks = ResponseHooks::new();
        let counter = Arc::new(CountingHook(AtomicUsize::new(0)));

        let id = hooks.register(counter.clone()).unwrap();
        hooks.dispatch(&response()).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        assert!(hooks.eject(id));
        assert!(!hooks.eject(id));
        hooks.dispatch(&response()).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
        assert!(hooks.is_empty());
    }

    #[tokio::test]
    async fn poisoned_registry_refuses_new_hooks() {
        let hooks = Arc::new(ResponseHooks::new());
        let poisoner = hooks.clone();
        let crashed = std::thread::spawn(move || {
            let _lock = poisoner.hooks.lock().unwrap();
            panic!("hook list poisoned");
        })
        .join();
        assert!(crashed.is_err());

        let counter = Arc::new(CountingHook(AtomicUsize::new(0)));
        assert_eq!(hooks.register(counter.clone()), None);
        hooks.dispatch(&response()).await;
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }
}
