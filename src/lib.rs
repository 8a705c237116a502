//! Access-checked links that move an entity or counter from one state to the
//! next.

pub mod access;
pub mod account;
pub mod behavior;
pub mod config;
pub mod definition;
pub mod entity;
pub mod error;
pub mod handler;
pub mod link;
pub mod link_style;
pub mod logging;
pub mod parameter;
pub mod placeholder;
pub mod plugins;
pub mod registry;
pub mod route;
pub mod service;
pub mod state_action;
pub mod store;
pub mod token;
pub mod utils;

pub use account::Account;
pub use config::Settings;
pub use definition::ActionDefinition;
pub use error::{ActionLinkError, Result};
pub use handler::{ActionRequest, ResolvedRequest};
pub use link::{LinkDescriptor, LinkSet};
pub use link_style::{ActionResponse, PatchOp};
pub use service::ActionLinkService;
