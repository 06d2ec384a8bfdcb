mod recipe;
mod route;
mod session;
mod user;

pub use recipe::*;
pub use route::*;
pub use session::*;
pub use user::*;
