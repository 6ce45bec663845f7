/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The capacity in which a user holds department memberships.
/// A single user may hold records of several kinds at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrincipalKind {
    Learner,
    Staff,
    GlobalAdmin,
}

impl PrincipalKind {
    pub const ALL: [PrincipalKind; 3] = [
        PrincipalKind::Learner,
        PrincipalKind::Staff,
        PrincipalKind::GlobalAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Learner => "learner",
            PrincipalKind::Staff => "staff",
            PrincipalKind::GlobalAdmin => "global-admin",
        }
    }
}

impl fmt::Display for PrincipalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrincipalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learner" => Ok(PrincipalKind::Learner),
            "staff" => Ok(PrincipalKind::Staff),
            "global-admin" => Ok(PrincipalKind::GlobalAdmin),
            other => Err(format!("unknown principal kind '{}'", other)),
        }
    }
}

/// Dashboard a client should open after login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dashboard {
    Learner,
    Staff,
}

impl Dashboard {
    /// Staff wins whenever a staff or global-admin capacity is present.
    pub fn for_kinds<'a>(kinds: impl IntoIterator<Item = &'a PrincipalKind>) -> Self {
        let staff_like = kinds
            .into_iter()
            .any(|k| matches!(k, PrincipalKind::Staff | PrincipalKind::GlobalAdmin));
        if staff_like {
            Dashboard::Staff
        } else {
            Dashboard::Learner
        }
    }
}
