//! Reusable pieces of plugin behaviour
//!
//! Plugins pick these explicitly and delegate to them from their
//! `StateAction` implementation.
use crate::{access::AccessResult, account::Account, definition::ActionDefinition};

/// Two-state cycling between `"true"` and `"false"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Toggle;

impl Toggle {
    pub const STATES: [&'static str; 2] = ["false", "true"];

    pub fn next(self, current: bool) -> String {
        (!current).to_string()
    }

    pub fn parse(self, state: &str) -> Option<bool> {
        match state {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    pub fn label(self, subject: &str, state: &str) -> String {
        match self.parse(state) {
            Some(true) => format!("Set {subject}"),
            _ => format!("Unset {subject}"),
        }
    }
}

/// Labels and messages for actions that can be repeated in a direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Repeatable;

impl Repeatable {
    pub fn label(self, subject: &str, direction_label: &str) -> String {
        if direction_label.is_empty() {
            subject.to_string()
        } else {
            format!("{direction_label} {subject}")
        }
    }

    pub fn message(self, subject: &str, state: &str) -> String {
        format!("{subject} is now {state}.")
    }
}

/// Finer permission per direction: `use {action} action links in {direction} direction`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionPermissions;

impl DirectionPermissions {
    pub fn permission_name(self, definition: &ActionDefinition, direction: &str) -> String {
        format!(
            "use {} action links in {direction} direction",
            definition.id()
        )
    }

    pub fn check(self, definition: &ActionDefinition, direction: &str, account: &Account) -> AccessResult {
        AccessResult::allowed_if(account.has_permission(&self.permission_name(definition, direction)))
    }
}
