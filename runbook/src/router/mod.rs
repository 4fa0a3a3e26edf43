//! Views of the console and the guard that gates navigation between them.

mod guard;
mod route;

pub use guard::{Navigation, RouteGuard};
pub use route::Route;
