//! sts:AssumeRoleWithSAML through the AWS SDK.

/// [`crate::client::CredentialExchanger`] calling AWS STS in a fixed region.
#[derive(Debug, Clone)]
pub struct StsExchanger {
    pub region: String,
    pub duration_seconds: Option<i32>,
}

impl StsExchanger {
    pub fn new(config: &crate::config::Config) -> Self {
        Self {
            region: config.region.clone(),
            duration_seconds: config.duration_seconds,
        }
    }
}

impl crate::client::CredentialExchanger for StsExchanger {
    #[tracing::instrument(skip(assertion))]
    async fn exchange(
        &self,
        role: &crate::role::RolePair,
        assertion: &crate::assertion::Assertion,
    ) -> crate::Result<crate::client::CredentialBundle> {
        let sts = create_sts_client(&self.region).await;

        tracing::debug!(
            region = self.region,
            role_arn = role.role_arn,
            principal_arn = role.principal_arn,
            "Performing AssumeRoleWithSAML"
        );

        let resp = sts
            .assume_role_with_saml()
            .role_arn(&role.role_arn)
            .principal_arn(&role.principal_arn)
            .saml_assertion(assertion.as_base64())
            .set_duration_seconds(self.duration_seconds)
            .send()
            .await
            .map_err(|e| sdk_error_to_crate_error("AssumeRoleWithSAML", e))?;

        let creds = resp.credentials().ok_or_else(|| {
            crate::client::Error::Unknown(
                "STS AssumeRoleWithSAML returned empty credentials".to_string(),
                "empty credentials".into(),
            )
        })?;

        let exp = creds.expiration();
        let expiration = chrono::DateTime::from_timestamp(exp.secs(), exp.subsec_nanos())
            .ok_or_else(|| {
                crate::client::Error::Unknown(
                    format!("Failed to parse expiration timestamp: {}", exp),
                    "invalid expiration".into(),
                )
            })?;

        let bundle = crate::client::CredentialBundle::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token(),
            expiration,
        )?;

        tracing::debug!(
            role_arn = role.role_arn,
            access_key_id = bundle.access_key_id,
            expiration = ?expiration,
            "AssumeRoleWithSAML completed successfully"
        );
        Ok(bundle)
    }
}

/// AssumeRoleWithSAML is authorized by the assertion itself; no AWS credentials are loaded.
async fn create_sts_client(region: &str) -> aws_sdk_sts::Client {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_owned()))
        .no_credentials()
        .load()
        .await;

    aws_sdk_sts::Client::new(&config)
}

fn sdk_error_to_crate_error<E, R>(
    context: &str,
    err: aws_sdk_sts::error::SdkError<E, R>,
) -> crate::client::Error
where
    E: std::marker::Send
        + std::marker::Sync
        + std::error::Error
        + aws_sdk_sts::error::ProvideErrorMetadata
        + 'static,
    R: std::marker::Send + std::marker::Sync + std::fmt::Debug + 'static,
{
    use aws_sdk_sts::error::ProvideErrorMetadata;

    macro_rules! match_map_error {
        (
            $e:expr,
            $(
                $c:literal => $t:ident,
            )*
        ) => {
            match $e {
                $(
                    e1 if e1.code() == Some($c) => {
                        let message = format!(
                            "AWS STS says {code} for {context}: {message:?}",
                            code = $c,
                            context = context,
                            message = e1.message(),
                        );
                        crate::client::Error::$t(message, Box::new(e1))
                    }
                )*
                e => {
                    let message = format!(
                        "AWS STS returned error for {context}: {code:?} {message:?}",
                        context = context,
                        code = e.code(),
                        message = e.message(),
                    );
                    crate::client::Error::Unknown(message, Box::new(e))
                }
            }
        }
    }

    match_map_error! {
        err,
        "AccessDenied" => PermissionDenied,
        "ExpiredTokenException" => Unauthenticated,
        "IDPRejectedClaim" => Unauthenticated,
        "InvalidIdentityToken" => Unauthenticated,
        "MalformedPolicyDocument" => InvalidArgument,
        "PackedPolicyTooLarge" => InvalidArgument,
        "RegionDisabledException" => InvalidArgument,
        "ValidationError" => InvalidArgument,
    }
}
