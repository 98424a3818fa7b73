//! Authorization handler for the template library
//!
//! This crate answers the one authorization question the template library workflow asks of the
//! outside world: does this user hold a given capability. Collaborator roles are stored on the
//! template versions themselves and are checked by the workflow, not here.
//!
//! ## Architecture
//!
//! - Business logic depends on the [`AuthorizationOracle`] trait
//! - Infrastructure (a role directory, an identity service) implements the trait
//! - The API binary wires a concrete oracle in at startup

use std::fmt;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;

mod static_directory;

pub use static_directory::StaticRoleDirectory;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Result type for authorization operations
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Errors that can occur during authorization operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Role directory unavailable: {0}")]
    DirectoryUnavailable(String),
}

/// Capabilities a user can be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// May approve and reject template versions, and edit or hide any template.
    TemplateLibraryAdmin,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::TemplateLibraryAdmin => "template_library_admin",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability lookup service interface
///
/// Implementations are consulted on every mutation, inside the store transaction where the
/// workflow requires a fresh answer, so they must not cache beyond what they can invalidate.
#[async_trait]
pub trait AuthorizationOracle: Send + Sync {
    /// Check whether a user holds a capability
    ///
    /// # Parameters
    /// - `email`: The user's e-mail address
    /// - `capability`: The capability to check
    ///
    /// # Returns
    /// `true` if the user holds the capability
    ///
    /// # Errors
    /// Returns `AuthError::DirectoryUnavailable` if the lookup cannot be performed
    async fn has_capability(&self, email: &str, capability: Capability) -> AuthResult<bool>;

    /// Check whether a user is a template library administrator
    async fn is_template_library_admin(&self, email: &str) -> AuthResult<bool> {
        self.has_capability(email, Capability::TemplateLibraryAdmin)
            .await
    }
}

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_REGEX: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn validate_email(email: &str) -> AuthResult<()> {
    let pattern = EMAIL_REGEX
        .get_or_init(|| Regex::new(EMAIL_PATTERN))
        .as_ref()
        .map_err(|e| AuthError::InvalidIdentity(format!("email pattern failed to compile: {e}")))?;

    if !pattern.is_match(email) {
        return Err(AuthError::InvalidIdentity(format!(
            "'{email}' is not a valid e-mail address"
        )));
    }
    Ok(())
}

/// The authenticated user performing an operation.
///
/// `is_internal_staff` comes from the caller's credentials, not from the role directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    email: String,
    is_internal_staff: bool,
}

impl Actor {
    /// Create an actor from a validated e-mail address
    ///
    /// # Errors
    /// Returns `AuthError::InvalidIdentity` if `email` is not an e-mail address
    pub fn new(email: impl Into<String>, is_internal_staff: bool) -> AuthResult<Self> {
        let email = email.into().trim().to_string();
        validate_email(&email)?;
        Ok(Self {
            email,
            is_internal_staff,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn is_internal_staff(&self) -> bool {
        self.is_internal_staff
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}
