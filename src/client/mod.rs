mod auth_bootstrap;
mod auth_flow;
mod client;
mod credentials;
mod generation_view;
mod job_poller;
mod navigator;
mod port;
mod session_interceptor;
mod session_store;

#[cfg(test)]
pub(crate) mod testing;

pub use auth_bootstrap::*;
pub use auth_flow::*;
pub use client::*;
pub use credentials::*;
pub use generation_view::*;
pub use job_poller::*;
pub use navigator::*;
pub use port::*;
pub use session_interceptor::*;
pub use session_store::*;
