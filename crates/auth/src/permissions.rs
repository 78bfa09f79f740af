use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "pipeline.read").
/// The wildcard permission `"*"` grants everything within the organization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

/// Read pipelines, boards and the event stream.
pub const PIPELINE_READ: Permission = Permission(Cow::Borrowed("pipeline.read"));

/// Create, update, move and delete cards.
pub const CARDS_WRITE: Permission = Permission(Cow::Borrowed("cards.write"));

/// Structural changes: pipelines and stages.
pub const PIPELINE_MANAGE: Permission = Permission(Cow::Borrowed("pipeline.manage"));

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn wildcard() -> Self {
        Self(Cow::Borrowed("*"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
