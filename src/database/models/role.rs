use serde::{Deserialize, Serialize};

use crate::types::PrincipalKind;

/// A named role from the catalog. Access rights are either exact
/// `domain:resource:action` tokens or prefixes ending in `*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,
    pub principal_kind: PrincipalKind,
    #[serde(default)]
    pub access_rights: Vec<String>,
}

impl Role {
    pub fn new<I, S>(name: impl Into<String>, principal_kind: PrincipalKind, rights: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            principal_kind,
            access_rights: rights.into_iter().map(Into::into).collect(),
        }
    }
}
