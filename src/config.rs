pub fn config_dir() -> crate::Result<std::path::PathBuf> {
    let base = match std::env::var("XDG_CONFIG_HOME") {
        Ok(d) => std::path::PathBuf::from(d),
        Err(_) => home_dir()?.join(".config"),
    };
    Ok(base.join(env!("CARGO_PKG_NAME")))
}

pub fn config_path() -> crate::Result<std::path::PathBuf> {
    Ok(config_dir()?.join("config.json"))
}

fn home_dir() -> crate::Result<std::path::PathBuf> {
    std::env::var("HOME")
        .map(std::path::PathBuf::from)
        .map_err(|_| crate::Error::ConfigError("No $HOME environment variable present".to_owned()))
}

/// Location of the AWS shared credentials file, honouring `AWS_SHARED_CREDENTIALS_FILE`.
pub fn default_credentials_file() -> crate::Result<std::path::PathBuf> {
    if let Ok(p) = std::env::var("AWS_SHARED_CREDENTIALS_FILE") {
        if !p.is_empty() {
            return Ok(p.into());
        }
    }
    Ok(home_dir()?.join(".aws").join("credentials"))
}

/// Immutable settings for one run, loaded once at startup.
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: std::path::PathBuf,

    /// FQDN of the STA cloud zone, e.g. idp.eu.safenetid.com or idp.us.safenetid.com
    #[serde(default = "default_cloud_idp")]
    pub cloud_idp: String,
    /// Virtual server (tenant) ID, e.g. "BWTYF307CZ-STA"
    pub tenant_reference_id: String,
    /// Name of the AWS application configured in the STA console
    #[serde(default = "default_aws_app_name")]
    pub aws_app_name: String,

    #[serde(default = "default_region")]
    pub region: String,
    /// AWS CLI output format stored alongside the credentials
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_file: Option<std::path::PathBuf>,

    /// Disable only for dev/test IdPs
    #[serde(default = "default_true")]
    pub ssl_verification: bool,

    #[serde(default = "default_login_form_id")]
    pub login_form_id: String,
    #[serde(default = "default_username_field")]
    pub username_field: String,
    #[serde(default = "default_otp_field")]
    pub otp_field: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i32>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cloud_idp", &self.cloud_idp)
            .field("tenant_reference_id", &self.tenant_reference_id)
            .field("aws_app_name", &self.aws_app_name)
            .field("region", &self.region)
            .field("config_path", &self.config_path)
            .finish()
    }
}

fn default_cloud_idp() -> String {
    "idp.eu.safenetid.com".to_owned()
}

fn default_aws_app_name() -> String {
    "AWS".to_owned()
}

fn default_region() -> String {
    "us-east-2".to_owned()
}

fn default_output() -> String {
    "json".to_owned()
}

fn default_true() -> bool {
    true
}

fn default_login_form_id() -> String {
    "sas-login-form".to_owned()
}

fn default_username_field() -> String {
    "user".to_owned()
}

fn default_otp_field() -> String {
    "sas_response".to_owned()
}

impl Config {
    pub fn new(tenant_reference_id: impl Into<String>) -> Self {
        Self {
            config_path: std::path::PathBuf::new(),
            cloud_idp: default_cloud_idp(),
            tenant_reference_id: tenant_reference_id.into(),
            aws_app_name: default_aws_app_name(),
            region: default_region(),
            output: default_output(),
            credentials_file: None,
            ssl_verification: true,
            login_form_id: default_login_form_id(),
            username_field: default_username_field(),
            otp_field: default_otp_field(),
            duration_seconds: None,
        }
    }

    pub async fn read_from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let data = match tokio::fs::read(&path).await {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(crate::Error::ConfigError(format!(
                    "{} not found; run `{} setup` first",
                    path.as_ref().display(),
                    env!("CARGO_PKG_NAME"),
                )));
            }
            Err(e) => return Err(e.into()),
        };
        let mut parsed: Self = serde_json::from_slice(&data)?;
        parsed.config_path = path.as_ref().into();
        parsed.validate()?;
        Ok(parsed)
    }

    pub async fn save_to_file(&self) -> crate::Result<()> {
        use tokio::io::AsyncWriteExt;
        tracing::debug!(path = %self.config_path.display(), "saving Config");

        if let Some(dir) = self.config_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let data = serde_json::to_string_pretty(&self)?;
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&self.config_path)
            .await?;
        file.write_all(data.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }

    pub fn validate(&self) -> crate::Result<()> {
        for (name, value) in [
            ("cloud_idp", &self.cloud_idp),
            ("tenant_reference_id", &self.tenant_reference_id),
            ("aws_app_name", &self.aws_app_name),
            ("region", &self.region),
            ("login_form_id", &self.login_form_id),
            ("username_field", &self.username_field),
            ("otp_field", &self.otp_field),
        ] {
            if value.trim().is_empty() {
                return Err(crate::Error::ConfigError(format!("{name} must not be empty")));
            }
        }
        if let Some(d) = self.duration_seconds {
            if !(900..=43200).contains(&d) {
                return Err(crate::Error::ConfigError(format!(
                    "duration_seconds must be within 900..=43200, got {d}"
                )));
            }
        }
        Ok(())
    }

    /// `https://{cloud_idp}/auth/realms/{tenant}/protocol/saml/clients/{app}`
    pub fn entry_url(&self) -> crate::Result<url::Url> {
        let mut url = url::Url::parse(&format!("https://{}/", self.cloud_idp))?;
        url.path_segments_mut()
            .map_err(|_| {
                crate::Error::ConfigError(format!("cloud_idp '{}' is invalid", self.cloud_idp))
            })?
            .clear()
            .extend([
                "auth",
                "realms",
                self.tenant_reference_id.as_str(),
                "protocol",
                "saml",
                "clients",
                self.aws_app_name.as_str(),
            ]);
        Ok(url)
    }

    pub fn credentials_file(&self) -> crate::Result<std::path::PathBuf> {
        match self.credentials_file.as_ref() {
            Some(p) => Ok(p.clone()),
            None => default_credentials_file(),
        }
    }
}
