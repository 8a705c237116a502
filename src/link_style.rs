//! Link styles: how a followed link travels and what comes back
//!
//! Both styles share the same resolution, they differ only in presentation
//! hooks and response shape.
use crate::{
    account::{Account, UserId},
    definition::ActionDefinition,
    error::Result,
    link::{LinkBuildContext, LinkSet, link_key},
    parameter::RouteParameters,
    utils::unique_css_identifier,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    Replace { selector: String, html: String },
    Message { selector: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResponse {
    Redirect {
        location: String,
        message: Option<String>,
    },
    /// Replace operations in direction order, then at most one message.
    Patch(Vec<PatchOp>),
}

impl ActionResponse {
    pub fn status_code(&self) -> u16 {
        match self {
            ActionResponse::Redirect { .. } => 303,
            ActionResponse::Patch(_) => 200,
        }
    }
}

/// The result of an attempted transition, handed to the link style.
pub struct ActionOutcome<'a> {
    /// False for a stale link that was left alone.
    pub completed: bool,
    pub definition: &'a ActionDefinition,
    pub direction: &'a str,
    pub state: &'a str,
    pub account: &'a Account,
    pub route_parameters: &'a RouteParameters,
    /// Every direction of the action, whether currently linked or not.
    pub directions: Vec<String>,
    pub message: Option<String>,
    pub referer: Option<&'a str>,
    pub default_redirect: &'a str,
}

/// Rebuilds the link set as it looks after the transition.
pub trait LinkSetSource {
    fn rebuild(&self) -> Result<LinkSet>;
}

pub trait LinkStyle {
    fn id(&self) -> &str;

    fn label(&self) -> &str;

    fn alter_links_build(&self, _links: &mut LinkSet, _context: &LinkBuildContext<'_>) {}

    fn handle_action_request(
        &self,
        outcome: &ActionOutcome<'_>,
        links: &dyn LinkSetSource,
    ) -> Result<ActionResponse>;
}

/// Follow the link with a full page load, then redirect back.
#[derive(Debug, Default, Clone, Copy)]
pub struct FullReload;

impl LinkStyle for FullReload {
    fn id(&self) -> &str {
        "nojs"
    }

    fn label(&self) -> &str {
        "Full reload"
    }

    fn handle_action_request(
        &self,
        outcome: &ActionOutcome<'_>,
        _links: &dyn LinkSetSource,
    ) -> Result<ActionResponse> {
        let location = outcome.referer.unwrap_or(outcome.default_redirect).to_string();
        let message = outcome
            .message
            .clone()
            .filter(|message| outcome.completed && !message.is_empty());
        Ok(ActionResponse::Redirect { location, message })
    }
}

/// Follow the link in place and patch the affected markup.
#[derive(Debug, Default, Clone, Copy)]
pub struct PartialUpdate;

impl PartialUpdate {
    /// DOM id wrapping one direction's link.
    pub fn wrapper_id(
        action_id: &str,
        direction: &str,
        user: UserId,
        route_parameters: &RouteParameters,
    ) -> String {
        format!("{}-ajax", link_key(action_id, direction, user, route_parameters))
    }

    pub fn message_selector(action_id: &str, direction: &str) -> String {
        format!(".{}", unique_css_identifier(["action-link-message", action_id, direction]))
    }
}

impl LinkStyle for PartialUpdate {
    fn id(&self) -> &str {
        "ajax"
    }

    fn label(&self) -> &str {
        "Partial update"
    }

    fn alter_links_build(&self, links: &mut LinkSet, context: &LinkBuildContext<'_>) {
        for link in links.iter_mut() {
            link.wrapper_id = Some(Self::wrapper_id(
                context.definition.id(),
                &link.direction,
                context.account.id(),
                context.route_parameters,
            ));
        }
    }

    /// A completed transition re-renders every direction of the target. A
    /// stale link only gets its own markup refreshed and no message.
    fn handle_action_request(
        &self,
        outcome: &ActionOutcome<'_>,
        links: &dyn LinkSetSource,
    ) -> Result<ActionResponse> {
        let rebuilt = links.rebuild()?;
        let directions: Vec<&str> = if outcome.completed {
            outcome.directions.iter().map(String::as_str).collect()
        } else {
            vec![outcome.direction]
        };

        let mut ops = Vec::with_capacity(directions.len() + 1);
        for direction in directions {
            let id = Self::wrapper_id(
                outcome.definition.id(),
                direction,
                outcome.account.id(),
                outcome.route_parameters,
            );
            // keep an empty wrapper for directions without a link so the
            // next update can still find them
            let html = match rebuilt.get(direction) {
                Some(link) => link.render(),
                None => format!("<span id=\"{id}\" class=\"action-link-wrapper\"></span>"),
            };
            ops.push(PatchOp::Replace {
                selector: format!("#{id}"),
                html,
            });
        }

        if let Some(message) = outcome.message.as_ref().filter(|m| outcome.completed && !m.is_empty()) {
            ops.push(PatchOp::Message {
                selector: Self::message_selector(outcome.definition.id(), outcome.direction),
                message: message.clone(),
            });
        }
        Ok(ActionResponse::Patch(ops))
    }
}
