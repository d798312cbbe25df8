//! Domain entities.

mod token;
mod user;

pub use token::AuthToken;
pub use user::{DEFAULT_AVATAR, User, UserStats};
