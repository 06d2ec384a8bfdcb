use crate::client::Navigator;
use crate::domain_model::Route;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

/// Polls `condition` until it holds, failing the test after one second.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached in time");
}
