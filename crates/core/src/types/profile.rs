//! Signed-in user profile.

use serde::{Deserialize, Serialize};

use super::Email;

/// Role granted to a signed-in user.
///
/// Only `admin` unlocks the dashboard; every other role the backend hands out
/// is treated as a regular customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    User,
}

impl UserRole {
    /// Derive the role from the backend's role list.
    ///
    /// The first role wins, compared case-insensitively. No roles means
    /// [`UserRole::User`].
    ///
    /// ```
    /// use chinchin_core::UserRole;
    ///
    /// assert_eq!(UserRole::from_roles(&["Admin".to_string()]), UserRole::Admin);
    /// assert_eq!(UserRole::from_roles(&[]), UserRole::User);
    /// ```
    #[must_use]
    pub fn from_roles(roles: &[String]) -> Self {
        match roles.first() {
            Some(role) if role.eq_ignore_ascii_case("admin") => Self::Admin,
            _ => Self::User,
        }
    }

    /// Whether this role may use the admin dashboard.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Cached profile of the signed-in user.
///
/// Stored next to the tokens so the UI can greet the user without a round
/// trip; the backend remains the authority on who the user is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub name: String,
    /// Account email.
    pub email: Email,
    /// Effective role.
    pub role: UserRole,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_roles_first_wins() {
        let roles = vec!["USER".to_string(), "Admin".to_string()];
        assert_eq!(UserRole::from_roles(&roles), UserRole::User);

        let roles = vec!["ADMIN".to_string()];
        assert!(UserRole::from_roles(&roles).is_admin());
    }

    #[test]
    fn test_unknown_role_is_user() {
        let roles = vec!["florist".to_string()];
        assert_eq!(UserRole::from_roles(&roles), UserRole::User);
    }

    #[test]
    fn test_profile_json_shape() {
        let profile = UserProfile {
            name: "Lan".to_string(),
            email: Email::parse("lan@chinchin.vn").unwrap(),
            role: UserRole::Admin,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            value,
            json!({"name": "Lan", "email": "lan@chinchin.vn", "role": "admin"})
        );
    }
}
