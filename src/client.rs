/// Temporary credentials returned by sts:AssumeRoleWithSAML.
#[derive(Clone, Debug)]
pub struct CredentialBundle {
    pub access_key_id: String,
    pub secret_access_key: secrecy::SecretString,
    pub session_token: secrecy::SecretString,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

impl CredentialBundle {
    pub fn new(
        access_key_id: &str,
        secret_access_key: &str,
        session_token: &str,
        expiration: chrono::DateTime<chrono::Utc>,
    ) -> Result<Self, Error> {
        for (name, value) in [
            ("AccessKeyId", access_key_id),
            ("SecretAccessKey", secret_access_key),
            ("SessionToken", session_token),
        ] {
            if value.is_empty() {
                return Err(Error::Unknown(
                    format!("STS returned credentials with empty {name}"),
                    "empty field".into(),
                ));
            }
        }
        Ok(Self {
            access_key_id: access_key_id.to_owned(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration,
        })
    }

    /// Locale-independent UTC rendering used in terminal output.
    pub fn expiration_display(&self) -> String {
        self.expiration.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Rejections from the credential exchange, surfaced verbatim.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Permission denied: {0}")]
    PermissionDenied(String, #[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Unknown: {0}")]
    Unknown(String, #[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Trades a SAML assertion for temporary credentials of one role.
#[allow(async_fn_in_trait)]
pub trait CredentialExchanger {
    async fn exchange(
        &self,
        role: &crate::role::RolePair,
        assertion: &crate::assertion::Assertion,
    ) -> crate::Result<CredentialBundle>;
}
