use crate::domain_model::CachedSession;
use crate::domain_port::*;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemorySessionCache {
    session: Mutex<Option<CachedSession>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: CachedSession) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    pub fn snapshot(&self) -> Option<CachedSession> {
        self.session.lock().ok().and_then(|lock| lock.clone())
    }
}

#[async_trait::async_trait]
impl SessionCache for MemorySessionCache {
    async fn load(&self) -> Result<Option<CachedSession>, SessionCacheError> {
        Ok(self.snapshot())
    }

    async fn save(&self, session: &CachedSession) -> Result<(), SessionCacheError> {
        if let Ok(mut lock) = self.session.lock() {
            *lock = Some(session.clone());
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionCacheError> {
        if let Ok(mut lock) = self.session.lock() {
            *lock = None;
        }
        Ok(())
    }
}
