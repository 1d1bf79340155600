//! Error types for settings-core

/// Result type for settings-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while declaring, resolving or reading settings
///
/// Every variant carries owned data only, so a single failure can be
/// cloned out to every task waiting on a manager or registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The same setting name was declared twice
    ///
    /// `manager` is the manager kind, or the module name when the clash
    /// involves explicit values or spans managers.
    #[error("duplicate setting '{name}' declared in '{manager}'")]
    DuplicateSetting { manager: String, name: String },

    /// Two managers of one registry own the same descriptor kind
    #[error("more than one manager owns descriptors of kind '{kind}'")]
    DuplicateManager { kind: String },

    /// No manager accepts the descriptor's kind
    #[error("no manager accepts setting '{name}' of kind '{kind}'")]
    UnmanagedDescriptor { name: String, kind: String },

    /// Setting names must be upper-case identifiers
    #[error("invalid setting name '{name}': {reason}")]
    InvalidSettingName { name: String, reason: String },

    /// A loader was installed after the manager started configuring
    #[error("cannot install a loader on manager '{manager}' after configuration started")]
    LoaderAfterConfigure { manager: String },

    /// Configuration was requested outside a tokio runtime
    #[error("settings must be initialized from within a tokio runtime")]
    NoRuntime,

    /// The settings registry was initialized a second time
    #[error("settings are already initialized")]
    AlreadyInitialized,

    /// The bootstrap environment variable is unset or empty
    #[error(
        "requested settings, but settings are not configured: define the environment variable {var}"
    )]
    MissingBootstrap { var: String },

    /// The bootstrap named a settings module that was never registered
    #[error("unknown settings module '{name}'")]
    UnknownModule { name: String },

    /// A settings manifest could not be parsed or converted
    #[error("invalid settings manifest: {message}")]
    InvalidManifest { message: String },

    /// Resolution stalled before every setting was satisfied
    #[error(
        "{}",
        unresolved_message(.manager, .missing_keys, .unresolved_refs, .without_source)
    )]
    Unresolved {
        manager: String,
        /// Settings whose lookup key never appeared in the backing data
        missing_keys: Vec<String>,
        /// Settings whose reference chain never bottomed out
        unresolved_refs: Vec<String>,
        /// Settings declared with no key, reference or default
        without_source: Vec<String>,
    },

    /// A setting was read before its descriptor was resolved
    #[error("setting '{name}' is not configured yet")]
    NotConfigured { name: String },

    /// A setting was read that was never declared
    #[error("unknown setting '{name}'")]
    UnknownSetting { name: String },

    /// A backing-data loader failed
    #[error("loader for manager '{manager}' failed: {reason}")]
    LoadFailed { manager: String, reason: String },

    /// A resolved value could not be converted to the requested type
    #[error("setting '{name}' has an unexpected shape: {reason}")]
    Deserialize { name: String, reason: String },
}

impl Error {
    /// Whether this error is the aggregated resolution failure
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved { .. })
    }

    /// Whether this error is a configuration-authoring mistake that is
    /// reported synchronously and never retried
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSetting { .. }
                | Self::DuplicateManager { .. }
                | Self::UnmanagedDescriptor { .. }
                | Self::InvalidSettingName { .. }
                | Self::LoaderAfterConfigure { .. }
                | Self::NoRuntime
                | Self::AlreadyInitialized
                | Self::MissingBootstrap { .. }
                | Self::UnknownModule { .. }
                | Self::InvalidManifest { .. }
        )
    }
}

fn unresolved_message(
    manager: &str,
    missing_keys: &[String],
    unresolved_refs: &[String],
    without_source: &[String],
) -> String {
    let mut parts = vec![format!("unresolved settings on manager '{manager}'")];
    if !missing_keys.is_empty() {
        parts.push(format!("missing keys: [{}]", missing_keys.join(", ")));
    }
    if !unresolved_refs.is_empty() {
        parts.push(format!(
            "circular or unresolved references: [{}]",
            unresolved_refs.join(", ")
        ));
    }
    if !without_source.is_empty() {
        parts.push(format!(
            "no key, ref or default: [{}]",
            without_source.join(", ")
        ));
    }
    parts.join("; ")
}
