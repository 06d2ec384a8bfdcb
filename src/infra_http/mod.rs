mod api_client;
mod auth_api_http;
mod recipe_api_http;
mod response_hooks;

pub use api_client::*;
pub use auth_api_http::*;
pub use recipe_api_http::*;
pub use response_hooks::*;
