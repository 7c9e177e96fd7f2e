use serde::{Deserialize, Serialize};

use super::repo_types::Role;

/// Account data supplied at registration or by setup code.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub id: String,
    pub role: Role,
    pub password: String,
}

impl NewAccount {
    pub fn new(id: impl Into<String>, role: Role, password: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            password: password.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterOutcome {
    Created,
    AlreadyExists,
}

impl RegisterOutcome {
    /// Legacy sentinel: 1 created, 0 already present.
    pub fn code(self) -> i32 {
        match self {
            RegisterOutcome::Created => 1,
            RegisterOutcome::AlreadyExists => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    WrongPassword,
    NoSuchUser,
}

impl LoginOutcome {
    /// Legacy sentinel: 1 success, -1 unknown user, -2 wrong password.
    pub fn code(self) -> i32 {
        match self {
            LoginOutcome::Success => 1,
            LoginOutcome::NoSuchUser => -1,
            LoginOutcome::WrongPassword => -2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChange {
    Updated(Role),
    NoOp,
}

impl RoleChange {
    pub fn count(self) -> u64 {
        match self {
            RoleChange::Updated(_) => 1,
            RoleChange::NoOp => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Result of a password reset. `password` is the only copy of the plaintext.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    pub updated: u64,
    pub password: String,
}
