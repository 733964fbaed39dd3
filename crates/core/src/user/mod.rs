//! Users that tickets can be assigned to.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteUserStore;
pub use store::{CreateUserRequest, UserError, UserStore};
pub use types::{skill_matches, Role, User};
