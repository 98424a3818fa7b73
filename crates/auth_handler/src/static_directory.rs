//! Role directory backed by a configured admin list
//!
//! Provides an implementation of `AuthorizationOracle` for deployments where the set of
//! template library administrators is part of the service configuration.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{AuthError, AuthResult, AuthorizationOracle, Capability};

#[cfg(test)]
#[path = "static_directory_tests.rs"]
mod tests;

/// Static role directory
///
/// Holds the e-mail addresses of template library administrators. Addresses are compared
/// case-insensitively. The list can be replaced at runtime; the next lookup sees the new list.
///
/// # Examples
///
/// ```rust
/// use auth_handler::{AuthorizationOracle, StaticRoleDirectory};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let directory = StaticRoleDirectory::new(["admin@example.com"]);
///
/// assert!(directory.is_template_library_admin("Admin@Example.com").await?);
/// assert!(!directory.is_template_library_admin("user@example.com").await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticRoleDirectory {
    admins: RwLock<HashSet<String>>,
}

impl StaticRoleDirectory {
    /// Create a directory from a list of administrator e-mail addresses
    pub fn new<I, S>(admins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            admins: RwLock::new(normalize(admins)),
        }
    }

    /// Replace the administrator list
    ///
    /// # Errors
    /// Returns `AuthError::DirectoryUnavailable` if the directory lock is poisoned
    pub fn replace_admins<I, S>(&self, admins: I) -> AuthResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let admins = normalize(admins);
        let count = admins.len();
        let mut guard = self
            .admins
            .write()
            .map_err(|_| AuthError::DirectoryUnavailable("admin list lock poisoned".to_string()))?;
        *guard = admins;
        info!(admin_count = count, "Template library admin list replaced");
        Ok(())
    }

    pub fn admin_count(&self) -> AuthResult<usize> {
        self.admins
            .read()
            .map(|admins| admins.len())
            .map_err(|_| AuthError::DirectoryUnavailable("admin list lock poisoned".to_string()))
    }
}

fn normalize<I, S>(admins: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    admins
        .into_iter()
        .map(|email| email.as_ref().trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[async_trait]
impl AuthorizationOracle for StaticRoleDirectory {
    async fn has_capability(&self, email: &str, capability: Capability) -> AuthResult<bool> {
        let key = email.trim().to_ascii_lowercase();
        let granted = match capability {
            Capability::TemplateLibraryAdmin => self
                .admins
                .read()
                .map_err(|_| {
                    AuthError::DirectoryUnavailable("admin list lock poisoned".to_string())
                })?
                .contains(&key),
        };
        debug!(email = %email, capability = %capability, granted = granted, "Capability checked");
        Ok(granted)
    }
}
