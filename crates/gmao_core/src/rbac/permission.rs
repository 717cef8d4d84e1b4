//! `action:resource` permission parsing and set membership.

use crate::model::referential::LookupKind;
use crate::service::ServiceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    /// Implies every other action.
    Manage,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "create" => Some(Self::Create),
            "read" => Some(Self::Read),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            "manage" => Some(Self::Manage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Site,
    Typeparc,
    Parc,
    Engin,
    Typepanne,
    Panne,
    Typelubrifiant,
    Lubrifiant,
    Typeconsommationlub,
    Saisiehrm,
    Saisiehim,
    Saisielubrifiant,
    Anomalie,
    Objectif,
    Report,
    User,
    Role,
    /// Wildcard covering every resource.
    All,
}

const RESOURCE_STRINGS: &[(&str, Resource)] = &[
    ("site", Resource::Site),
    ("typeparc", Resource::Typeparc),
    ("parc", Resource::Parc),
    ("engin", Resource::Engin),
    ("typepanne", Resource::Typepanne),
    ("panne", Resource::Panne),
    ("typelubrifiant", Resource::Typelubrifiant),
    ("lubrifiant", Resource::Lubrifiant),
    ("typeconsommationlub", Resource::Typeconsommationlub),
    ("saisiehrm", Resource::Saisiehrm),
    ("saisiehim", Resource::Saisiehim),
    ("saisielubrifiant", Resource::Saisielubrifiant),
    ("anomalie", Resource::Anomalie),
    ("objectif", Resource::Objectif),
    ("report", Resource::Report),
    ("user", Resource::User),
    ("role", Resource::Role),
    ("all", Resource::All),
];

impl Resource {
    pub fn as_str(self) -> &'static str {
        RESOURCE_STRINGS
            .iter()
            .find(|(_, resource)| *resource == self)
            .map_or("all", |(name, _)| name)
    }

    fn parse(value: &str) -> Option<Self> {
        RESOURCE_STRINGS
            .iter()
            .find(|(name, _)| *name == value)
            .map(|(_, resource)| *resource)
    }
}

impl From<LookupKind> for Resource {
    fn from(kind: LookupKind) -> Self {
        match kind {
            LookupKind::TypeParc => Self::Typeparc,
            LookupKind::TypePanne => Self::Typepanne,
            LookupKind::TypeLubrifiant => Self::Typelubrifiant,
            LookupKind::TypeConsommationLub => Self::Typeconsommationlub,
        }
    }
}

/// One granted `action:resource` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Permission {
    pub action: Action,
    pub resource: Resource,
}

impl Permission {
    pub const fn new(action: Action, resource: Resource) -> Self {
        Self { action, resource }
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.action.as_str(), self.resource.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_permission(&raw).map_err(serde::de::Error::custom)
    }
}

/// Permission parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    EmptyPermission,
    MissingSeparator(String),
    UnknownAction(String),
    UnknownResource(String),
}

impl Display for PermissionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission value must not be empty"),
            Self::MissingSeparator(value) => {
                write!(f, "permission `{value}` must have the form action:resource")
            }
            Self::UnknownAction(value) => write!(f, "unknown permission action: {value}"),
            Self::UnknownResource(value) => write!(f, "unknown permission resource: {value}"),
        }
    }
}

impl Error for PermissionError {}

/// Parses one `action:resource` string.
///
/// Matching is exact: tokens are lowercase and exactly one `:` separates
/// them.
pub fn parse_permission(value: &str) -> Result<Permission, PermissionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PermissionError::EmptyPermission);
    }

    let Some((action, resource)) = trimmed.split_once(':') else {
        return Err(PermissionError::MissingSeparator(trimmed.to_string()));
    };
    if resource.contains(':') {
        return Err(PermissionError::MissingSeparator(trimmed.to_string()));
    }

    let action =
        Action::parse(action).ok_or_else(|| PermissionError::UnknownAction(action.to_string()))?;
    let resource = Resource::parse(resource)
        .ok_or_else(|| PermissionError::UnknownResource(resource.to_string()))?;
    Ok(Permission { action, resource })
}

/// Effective permissions of one user, merged from all of their roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet {
    granted: BTreeSet<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, permission: Permission) {
        self.granted.insert(permission);
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.granted.iter()
    }

    /// Returns whether `action` on `resource` is granted, directly or via
    /// `manage` / `all` wildcards.
    pub fn allows(&self, action: Action, resource: Resource) -> bool {
        [
            Permission::new(action, resource),
            Permission::new(Action::Manage, resource),
            Permission::new(action, Resource::All),
            Permission::new(Action::Manage, Resource::All),
        ]
        .iter()
        .any(|candidate| self.granted.contains(candidate))
    }

    /// Like `allows`, but fails with `Forbidden` naming the missing pair.
    pub fn require(&self, action: Action, resource: Resource) -> Result<(), ServiceError> {
        if self.allows(action, resource) {
            return Ok(());
        }
        Err(ServiceError::Forbidden(
            Permission::new(action, resource).to_string(),
        ))
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
        }
    }
}
