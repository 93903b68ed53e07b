use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(Error::Unauthorized(format!("unknown role '{}'", other))),
        }
    }
}

/// Caller identity resolved from the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    /// Exam sessions belong to students; every other role is refused.
    pub fn require_student(&self) -> Result<Uuid> {
        match self.role {
            Role::Student => Ok(self.user_id),
            Role::Teacher | Role::Admin => Err(Error::Forbidden(
                "Only students can take tests".to_string(),
            )),
        }
    }
}
