use thiserror::Error;

/// Failures from login and signup. The message is shown inline on the form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0}")]
    Authentication(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Animal {0} was not found")]
    UnknownAnimal(u32),
    #[error("{0} has already been adopted")]
    AlreadyAdopted(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommunityError {
    #[error("You must be logged in to do that")]
    NotLoggedIn,
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },
    #[error("Post {0} was not found")]
    PostNotFound(uuid::Uuid),
}
