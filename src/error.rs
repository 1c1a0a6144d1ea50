#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("UserError: {0}")]
    UserError(String),

    #[error("ConfigError: {0}")]
    ConfigError(String),

    /// Network failure or a non-2xx terminal response from the identity provider.
    #[error("TransportError({url}): {message}")]
    Transport { url: url::Url, message: String },

    /// The identity provider returned a page without the expected login form.
    #[error("Invalid credentials or unexpected response: form '{0}' not found")]
    FormNotFound(String),

    #[error("Invalid credentials or unexpected response: form '{0}' has no action URL")]
    FormActionMissing(String),

    /// Most commonly caused by wrong credentials; the IdP answers with a login page again.
    #[error("Invalid credentials or unexpected response: no SAML assertion returned")]
    AssertionMissing,

    #[error("Malformed SAML assertion (protocol mismatch?): {0}")]
    AssertionDecode(String),

    #[error("Authenticated, but no AWS roles are authorized for this user")]
    NoRolesAvailable,

    #[error("Invalid role selection: {0}")]
    InvalidSelection(String),

    #[error(transparent)]
    Exchange(#[from] crate::client::Error),

    #[error("CredentialStoreError({path}): {message}")]
    CredentialStoreError {
        path: std::path::PathBuf,
        message: String,
    },

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// Failure, but we don't want to emit error to stderr/out anymore. Used in cmd
    #[error("")]
    FailureButSilentlyExit,
}

pub type Result<T> = std::result::Result<T, Error>;
