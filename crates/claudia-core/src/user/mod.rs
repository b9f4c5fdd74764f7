//! User domain module.

mod model;

pub use model::{NewUser, User, UserPreferences};
