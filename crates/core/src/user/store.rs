//! User storage trait and types.

use thiserror::Error;

use super::{Role, User};

/// Error type for user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid user: {0}")]
    Validation(String),
    #[error("Email already registered: {0}")]
    Duplicate(String),
    #[error("Database error: {0}")]
    Database(String),
}

/// Request to register a user.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub skills: Vec<String>,
}

impl CreateUserRequest {
    pub fn new(email: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role,
            skills: Vec::new(),
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills = skills.into_iter().map(Into::into).collect();
        self
    }
}

/// Trait for user storage backends.
pub trait UserStore: Send + Sync {
    /// Register a new user. Emails are unique, ignoring case.
    fn create(&self, request: CreateUserRequest) -> Result<User, UserError>;

    /// Get a user by ID.
    fn get(&self, id: &str) -> Result<Option<User>, UserError>;

    /// Users with the given role, in registration order.
    ///
    /// When `skills` is non-empty only users with at least one skill matching
    /// one of them (see [`super::skill_matches`]) are returned.
    fn find_by_role_and_skills(&self, role: Role, skills: &[String])
        -> Result<Vec<User>, UserError>;

    /// The earliest registered user with the given role.
    fn find_first_by_role(&self, role: Role) -> Result<Option<User>, UserError>;
}
