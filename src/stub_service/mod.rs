//! In-memory stand-in for the recipe service, served with warp.

mod error;
mod handler;
mod router;
mod state;

pub use error::*;
pub use router::routes;
pub use state::*;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::Filter;

/// Binds the stub under `/api/v1` and returns the bound address with the
/// server future. The server stops once `shutdown` resolves.
pub fn bind(
    state: Arc<StubState>,
    address: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<(SocketAddr, impl Future<Output = ()>)> {
    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(routes(state))
        .recover(recover_error);

    let bound = warp::serve(api_v1).try_bind_with_graceful_shutdown(address, shutdown)?;
    Ok(bound)
}
