use rocket_okapi::okapi::schemars::{self, JsonSchema};
use serde::{Deserialize, Serialize};

/// Closed role enumeration. Anything outside these three values is
/// rejected wherever a role crosses into the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Instructor,
    Student,
}

impl Role {
    /// Strict parse used at request boundaries.
    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "admin" => Some(Role::Admin),
            "instructor" => Some(Role::Instructor),
            "student" => Some(Role::Student),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Instructor => "instructor",
            Role::Student => "student",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Student
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Optional; defaults to `student`. Unknown values are a 400.
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of an account. Deliberately has no password field, so a
/// hash can never be serialized by accident.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_known_roles() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("instructor"), Some(Role::Instructor));
        assert_eq!(Role::parse("student"), Some(Role::Student));
    }

    #[test]
    fn rejects_unknown_and_miscased_roles() {
        assert_eq!(Role::parse("superuser"), None);
        assert_eq!(Role::parse("Admin"), None);
        assert_eq!(Role::parse(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Instructor).unwrap(), "\"instructor\"");
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
