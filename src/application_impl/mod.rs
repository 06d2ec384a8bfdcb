mod auth_api_fake;
mod recipe_api_fake;

pub use auth_api_fake::*;
pub use recipe_api_fake::*;
