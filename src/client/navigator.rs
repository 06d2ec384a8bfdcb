use crate::client::Navigator;
use crate::domain_model::Route;
use crate::logger::*;
use tokio::sync::watch;

/// Keeps the current route in a watch channel so screens can follow it.
pub struct RouteNavigator {
    tx: watch::Sender<Route>,
}

impl RouteNavigator {
    pub fn new(initial: Route) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    pub fn current(&self) -> Route {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.tx.subscribe()
    }
}

impl Navigator for RouteNavigator {
    fn navigate(&self, route: Route) {
        info!(%route, "navigate");
        self.tx.send_replace(route);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_model::JobId;

    #[tokio::test]
    async fn followers_see_route_changes() {
        let navigator = RouteNavigator::new(Route::Home);
        let mut rx = navigator.subscribe();

        navigator.navigate(Route::Recipe(JobId::from("abc")));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), Route::Recipe(JobId::from("abc")));
        assert_eq!(navigator.current().to_string(), "/recipe/abc");
    }
}
