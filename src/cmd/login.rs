#[derive(clap::Args, Debug)]
pub struct LoginArgs {
    /// STA username; also used as the AWS profile name. Prompted when omitted.
    #[arg(short, long, env = "STACREDS_USERNAME")]
    pub username: Option<String>,

    /// Role ARN to assume when the assertion authorizes several roles.
    #[arg(short, long)]
    pub role: Option<String>,

    /// Configuration file to use instead of $XDG_CONFIG_HOME/stacreds/config.json
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the AWS region stored in the profile and used for STS.
    #[arg(long)]
    pub region: Option<String>,

    /// Override the AWS CLI output format stored in the profile.
    #[arg(short, long)]
    pub output: Option<String>,

    /// Override the AWS shared credentials file to write.
    #[arg(long, env = "AWS_SHARED_CREDENTIALS_FILE")]
    pub credentials_file: Option<std::path::PathBuf>,
}

#[tokio::main]
pub async fn run(args: &LoginArgs) -> Result<(), anyhow::Error> {
    let config = load_config(args).await?;
    tracing::debug!(config = ?config, "Loaded configuration");

    let product = env!("CARGO_PKG_NAME");
    let idp = &config.cloud_idp;
    let tenant = &config.tenant_reference_id;
    crate::terminal::send(&indoc::formatdoc! {"
        :: {product} :: Login to SafeNet Trusted Access {idp} ({tenant}) ::::::::
        :: {product} :: Authenticate with your username and One Time Password (OTP)
    "})
    .await;

    let username = match args.username.as_ref() {
        Some(u) if !u.trim().is_empty() => u.trim().to_owned(),
        _ => crate::terminal::read_line("(STA) username").await?,
    };
    let otp = crate::terminal::read_secret("OTP").await?;

    let mut flow = crate::login_flow::LoginFlow::new(
        &config,
        crate::http_session::ReqwestSession::new(&config)?,
        crate::sts_assume_role::StsExchanger::new(&config),
        crate::credential_store::IniCredentialStore::new(config.credentials_file()?),
        crate::terminal::TerminalChooser,
    );
    flow.preferred_role = args.role.clone();

    let outcome = match flow.run(&username, &otp).await {
        Ok(o) => o,
        Err(e) => {
            crate::terminal::send(&failure_line(product, &e)).await;
            return Err(crate::Error::FailureButSilentlyExit.into());
        }
    };

    let profile = &outcome.profile;
    let role = &outcome.role.role_arn;
    let expiration = outcome.expiration.format("%Y-%m-%d %H:%M:%S");
    crate::terminal::send(&indoc::formatdoc! {"
        :: {product} :: Obtained temporary credentials for {role}
        :: {product} :: Saved to profile [{profile}]; use with `aws --profile {profile}`
        :: {product} :: NOTE: These credentials will expire at {expiration} UTC.
    "})
    .await;
    tracing::info!(profile = profile, role = role, "Logged in");
    Ok(())
}

/// The only report of a failed login; kept to one line.
fn failure_line(product: &str, e: &crate::Error) -> String {
    let message = e.to_string();
    let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
    format!(":: {product} :: ERROR: {message}")
}

async fn load_config(args: &LoginArgs) -> Result<crate::config::Config, anyhow::Error> {
    let path = match args.config.as_ref() {
        Some(p) => p.clone(),
        None => crate::config::config_path()?,
    };
    let mut config = crate::config::Config::read_from_file(&path).await?;
    if let Some(region) = args.region.as_ref() {
        config.region = region.clone();
    }
    if let Some(output) = args.output.as_ref() {
        config.output = output.clone();
    }
    if let Some(file) = args.credentials_file.as_ref() {
        config.credentials_file = Some(file.clone());
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_line_is_single_line() {
        let line = failure_line("stacreds", &crate::Error::AssertionMissing);
        assert_eq!(
            line,
            ":: stacreds :: ERROR: Invalid credentials or unexpected response: no SAML assertion returned"
        );

        let e = crate::Error::Exchange(crate::client::Error::PermissionDenied(
            "AWS STS says AccessDenied\nfor AssumeRoleWithSAML".to_owned(),
            "denied".into(),
        ));
        let line = failure_line("stacreds", &e);
        assert!(!line.contains('\n'));
        assert!(line.ends_with("AWS STS says AccessDenied for AssumeRoleWithSAML"));
    }

    #[tokio::test]
    async fn load_config_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::new("T-STA");
        config.config_path = dir.path().join("config.json");
        config.save_to_file().await.unwrap();

        let args = LoginArgs {
            username: None,
            role: None,
            config: Some(config.config_path.clone()),
            region: Some("ap-northeast-1".to_owned()),
            output: Some("text".to_owned()),
            credentials_file: Some(dir.path().join("credentials")),
        };
        let loaded = load_config(&args).await.unwrap();
        assert_eq!(loaded.region, "ap-northeast-1");
        assert_eq!(loaded.output, "text");
        assert_eq!(
            loaded.credentials_file().unwrap(),
            dir.path().join("credentials")
        );
    }

    #[tokio::test]
    async fn load_config_rejects_empty_region() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = crate::config::Config::new("T-STA");
        config.config_path = dir.path().join("config.json");
        config.save_to_file().await.unwrap();

        let args = LoginArgs {
            username: None,
            role: None,
            config: Some(config.config_path.clone()),
            region: Some("".to_owned()),
            output: None,
            credentials_file: None,
        };
        assert!(load_config(&args).await.is_err());
    }
}
