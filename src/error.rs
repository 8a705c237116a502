//! Error types for action link resolution and request handling

/// Failures raised by the backing stores.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("storage backend failed: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode or decode a stored record: {0}")]
    Codec(String),
    #[error("store rejected the write: {0}")]
    Rejected(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ActionLinkError {
    #[error("action link `{action}` declares {expected} dynamic parameters but {given} were supplied")]
    ParameterArity {
        action: String,
        expected: usize,
        given: usize,
    },
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("access denied to action link `{action}` in direction `{direction}`")]
    AccessDenied { action: String, direction: String },
    #[error("transition of action link `{action}` to state `{state}` failed: {message}")]
    TransitionFailed {
        action: String,
        state: String,
        /// The plugin's failure message, fit for showing to the user.
        message: String,
        #[source]
        source: StoreError,
    },
    #[error("plugin `{plugin}` declares reserved dynamic parameter name `{name}`")]
    PluginDiscovery { plugin: String, name: String },
    #[error("no state action plugin registered as `{0}`")]
    UnknownPlugin(String),
    #[error("no link style registered as `{0}`")]
    UnknownLinkStyle(String),
    #[error("action link `{id}` is invalid: {reason}")]
    InvalidDefinition { id: String, reason: String },
    #[error("invalid or missing CSRF token for `{0}`")]
    InvalidToken(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ActionLinkError {
    /// HTTP-equivalent status for surfacing this error to a client.
    pub fn status_code(&self) -> u16 {
        match self {
            ActionLinkError::InvalidParameter { .. } => 400,
            ActionLinkError::AccessDenied { .. } | ActionLinkError::InvalidToken(_) => 403,
            ActionLinkError::NotFound(_) => 404,
            ActionLinkError::ParameterArity { .. }
            | ActionLinkError::TransitionFailed { .. }
            | ActionLinkError::PluginDiscovery { .. }
            | ActionLinkError::UnknownPlugin(_)
            | ActionLinkError::UnknownLinkStyle(_)
            | ActionLinkError::InvalidDefinition { .. }
            | ActionLinkError::Store(_)
            | ActionLinkError::Config(_) => 500,
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        ActionLinkError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = ActionLinkError> = std::result::Result<T, E>;
