//! The user on whose behalf links are built and followed
use std::collections::BTreeSet;

pub type UserId = u64;

/// Account id used for anonymous visitors.
pub const ANONYMOUS: UserId = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    id: UserId,
    permissions: BTreeSet<String>,
    is_admin: bool,
}

impl Account {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            permissions: BTreeSet::new(),
            is_admin: false,
        }
    }
    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS)
    }
    /// An account that holds every permission.
    pub fn administrator(id: UserId) -> Self {
        Self {
            id,
            permissions: BTreeSet::new(),
            is_admin: true,
        }
    }
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
    pub fn id(&self) -> UserId {
        self.id
    }
    pub fn is_anonymous(&self) -> bool {
        self.id == ANONYMOUS
    }
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_admin || self.permissions.contains(permission)
    }
}
