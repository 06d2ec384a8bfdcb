mod api_error;
mod auth_api;
mod recipe_api;

pub use api_error::*;
pub use auth_api::*;
pub use recipe_api::*;
