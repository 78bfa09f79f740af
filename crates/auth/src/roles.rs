use serde::{Deserialize, Serialize};

use crate::permissions::{self, Permission};

/// A user's role inside their organization.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    Owner,
    Admin,
    /// Pipeline manager: may change pipeline structure.
    Pipeline,
    Member,
}

impl OrgRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgRole::Owner => "owner",
            OrgRole::Admin => "admin",
            OrgRole::Pipeline => "pipeline",
            OrgRole::Member => "member",
        }
    }

    /// Permissions granted by this role within its organization.
    pub fn permissions(&self) -> Vec<Permission> {
        match self {
            OrgRole::Owner => vec![Permission::wildcard()],
            OrgRole::Admin | OrgRole::Pipeline => vec![
                permissions::PIPELINE_READ,
                permissions::CARDS_WRITE,
                permissions::PIPELINE_MANAGE,
            ],
            OrgRole::Member => vec![permissions::PIPELINE_READ, permissions::CARDS_WRITE],
        }
    }
}

impl core::fmt::Display for OrgRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrgRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(OrgRole::Owner),
            "admin" => Ok(OrgRole::Admin),
            "pipeline" => Ok(OrgRole::Pipeline),
            "member" => Ok(OrgRole::Member),
            other => Err(format!("unknown organization role '{other}'")),
        }
    }
}
