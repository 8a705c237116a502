//! Composite access resolution for action link transitions
//!
//! A transition is allowed when the user may use the link (blanket link
//! permission or the plugin's finer state permission) and may act on the
//! operand (general access to the resource class or access to the specific
//! target). Neutral counts as not allowed in both disjunctions.
use crate::{
    account::Account, definition::ActionDefinition, parameter::NamedParameters,
    state_action::StateAction,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessResult {
    Allowed,
    Neutral,
    Forbidden,
}

impl AccessResult {
    pub fn allowed_if(condition: bool) -> Self {
        if condition {
            AccessResult::Allowed
        } else {
            AccessResult::Neutral
        }
    }
    pub fn is_allowed(self) -> bool {
        self == AccessResult::Allowed
    }
    /// Boolean disjunction: either side being allowed suffices, even when the
    /// other side is forbidden.
    pub fn or(self, other: AccessResult) -> AccessResult {
        if self.is_allowed() || other.is_allowed() {
            AccessResult::Allowed
        } else if self == AccessResult::Forbidden || other == AccessResult::Forbidden {
            AccessResult::Forbidden
        } else {
            AccessResult::Neutral
        }
    }
    pub fn and(self, other: AccessResult) -> AccessResult {
        if self.is_allowed() && other.is_allowed() {
            AccessResult::Allowed
        } else if self == AccessResult::Forbidden || other == AccessResult::Forbidden {
            AccessResult::Forbidden
        } else {
            AccessResult::Neutral
        }
    }
}

/// The four independent decisions combined into one access verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDimensions {
    pub link_permission: AccessResult,
    pub state_permission: AccessResult,
    pub operand_general: AccessResult,
    pub operand_state: AccessResult,
}

impl AccessDimensions {
    pub fn permission(&self) -> AccessResult {
        self.link_permission.or(self.state_permission)
    }
    pub fn operand(&self) -> AccessResult {
        self.operand_general.or(self.operand_state)
    }
    pub fn resolve(&self) -> AccessResult {
        self.permission().and(self.operand())
    }
    pub fn is_allowed(&self) -> bool {
        self.resolve().is_allowed()
    }
}

/// Everything an access check may look at for one direction and state.
pub struct AccessRequest<'a> {
    pub definition: &'a ActionDefinition,
    pub plugin: &'a dyn StateAction,
    pub direction: &'a str,
    pub state: &'a str,
    pub account: &'a Account,
    pub parameters: &'a NamedParameters,
}

pub trait AccessResolver {
    fn dimensions(&self, request: &AccessRequest<'_>) -> AccessDimensions;

    fn is_allowed(&self, request: &AccessRequest<'_>) -> bool {
        self.dimensions(request).is_allowed()
    }
}

/// Evaluates all four dimensions, none short-circuits another.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAccessResolver;

impl AccessResolver for DefaultAccessResolver {
    fn dimensions(&self, request: &AccessRequest<'_>) -> AccessDimensions {
        let definition = request.definition;
        let plugin = request.plugin;
        let account = request.account;

        let link_permission =
            AccessResult::allowed_if(account.has_permission(&definition.permission_name()));
        let state_permission = plugin.check_permission_access(
            definition,
            request.direction,
            request.state,
            account,
            request.parameters,
        );
        let operand_general = plugin.check_operand_general_access(definition, account);
        let operand_state = plugin.check_operand_access(
            definition,
            request.direction,
            request.state,
            account,
            request.parameters,
        );

        AccessDimensions {
            link_permission,
            state_permission,
            operand_general,
            operand_state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AccessResult::*;

    fn dims(
        link: AccessResult,
        state: AccessResult,
        general: AccessResult,
        operand: AccessResult,
    ) -> AccessDimensions {
        AccessDimensions {
            link_permission: link,
            state_permission: state,
            operand_general: general,
            operand_state: operand,
        }
    }

    #[test]
    fn forbidden_link_permission_does_not_block_state_permission() {
        let d = dims(Forbidden, Allowed, Allowed, Neutral);
        assert!(d.is_allowed());
    }

    #[test]
    fn neutral_counts_as_not_allowed() {
        assert!(!dims(Neutral, Neutral, Allowed, Allowed).is_allowed());
        assert!(!dims(Allowed, Neutral, Neutral, Neutral).is_allowed());
    }

    #[test]
    fn permission_alone_is_not_enough() {
        // operand dimension all-false fails the conjunction
        let d = dims(Neutral, Allowed, Neutral, Neutral);
        assert_eq!(d.permission(), Allowed);
        assert_eq!(d.resolve(), Neutral);
    }

    #[test]
    fn forbidden_propagates_when_nothing_is_allowed() {
        assert_eq!(Forbidden.or(Neutral), Forbidden);
        assert_eq!(Allowed.and(Forbidden), Forbidden);
        assert_eq!(Neutral.and(Allowed), Neutral);
    }
}
