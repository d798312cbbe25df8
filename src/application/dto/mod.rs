//! Data transfer objects.

mod session_dto;

pub use session_dto::{Credentials, ProfileUpdate};
