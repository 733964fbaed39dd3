//! User data types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access role of a user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Free-form skill tags, matched case-insensitively.
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Returns true if either skill tag contains the other, ignoring case.
///
/// "React" matches "React.js" and the other way around. Blank tags never match.
pub fn skill_matches(a: &str, b: &str) -> bool {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(&b) || b.contains(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skill_matches_both_directions() {
        assert!(skill_matches("React", "react.js"));
        assert!(skill_matches("React.js", "REACT"));
        assert!(skill_matches("node", "Node"));
        assert!(!skill_matches("Python", "Rust"));
    }

    #[test]
    fn test_skill_matches_ignores_blank() {
        assert!(!skill_matches("", "React"));
        assert!(!skill_matches("React", "   "));
    }

    #[test]
    fn test_role_parse_is_case_insensitive() {
        assert_eq!("Moderator".parse::<Role>().unwrap(), Role::Moderator);
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
