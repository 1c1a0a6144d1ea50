/// Writes a [`crate::client::CredentialBundle`] into a named profile.
pub trait CredentialPersister {
    fn persist(
        &self,
        profile: &str,
        bundle: &crate::client::CredentialBundle,
        region: &str,
        output: &str,
    ) -> crate::Result<()>;
}

/// Keys without a section header would otherwise land in configparser's default
/// section, which is named "default" and would swallow the AWS `[default]` profile.
const UNSECTIONED: &str = "\0unsectioned";

/// AWS shared credentials file (`~/.aws/credentials`), one INI section per profile.
#[derive(Debug, Clone)]
pub struct IniCredentialStore {
    pub path: std::path::PathBuf,
}

impl IniCredentialStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn error(&self, message: impl Into<String>) -> crate::Error {
        crate::Error::CredentialStoreError {
            path: self.path.clone(),
            message: message.into(),
        }
    }

    fn load(&self) -> crate::Result<configparser::ini::Ini> {
        let mut ini = configparser::ini::Ini::new_cs();
        ini.set_default_section(UNSECTIONED);
        // Secrets may contain `#` or `;`; only whole-line comments are comments.
        let no_inline_comments: &[char] = &[];
        ini.set_inline_comment_symbols(Some(no_inline_comments));

        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };
        ini.read(content)
            .map_err(|e| self.error(format!("failed to parse: {e}")))?;
        Ok(ini)
    }

    /// Replaces the file through a same-directory temporary file and rename, so an
    /// interrupted write never leaves a truncated store behind.
    fn store(&self, ini: &configparser::ini::Ini) -> crate::Result<()> {
        use std::io::Write;

        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => std::path::PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".credentials.")
            .tempfile_in(&dir)?;
        tmp.write_all(ini.writes().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| self.error(format!("failed to replace: {}", e.error)))?;
        Ok(())
    }

    pub fn profile(&self, profile: &str) -> crate::Result<Option<Vec<(String, String)>>> {
        let ini = self.load()?;
        let Some(section) = ini.get_map_ref().get(profile) else {
            return Ok(None);
        };
        Ok(Some(
            section
                .iter()
                .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                .collect(),
        ))
    }
}

impl CredentialPersister for IniCredentialStore {
    fn persist(
        &self,
        profile: &str,
        bundle: &crate::client::CredentialBundle,
        region: &str,
        output: &str,
    ) -> crate::Result<()> {
        use secrecy::ExposeSecret;

        if profile.is_empty() || profile.contains(['[', ']', '\n']) {
            return Err(crate::Error::UserError(format!(
                "'{profile}' cannot be used as a profile name"
            )));
        }

        let mut ini = self.load()?;
        for (key, value) in [
            ("output", output),
            ("region", region),
            ("aws_access_key_id", bundle.access_key_id.as_str()),
            ("aws_secret_access_key", bundle.secret_access_key.expose_secret()),
            ("aws_session_token", bundle.session_token.expose_secret()),
        ] {
            ini.set(profile, key, Some(value.to_owned()));
        }
        ini.set(profile, "expiration", Some(bundle.expiration.to_rfc3339()));

        tracing::debug!(path = %self.path.display(), profile = profile, "saving credentials");
        self.store(&ini)
    }
}
