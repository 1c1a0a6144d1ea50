/// One logical browser session against the identity provider: cookies and redirects
/// carry over between calls.
#[allow(async_fn_in_trait)]
pub trait SessionClient {
    /// GET following redirects; returns the final URL and the body.
    async fn get(&self, url: &url::Url) -> crate::Result<(url::Url, String)>;

    /// POST `payload` as a urlencoded form; returns the body.
    async fn post(&self, url: &url::Url, payload: &crate::form::Payload)
        -> crate::Result<String>;
}

const MAX_REDIRECTS: usize = 10;

pub struct ReqwestSession {
    http: reqwest::Client,
}

impl std::fmt::Debug for ReqwestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestSession").finish()
    }
}

impl ReqwestSession {
    pub fn new(config: &crate::config::Config) -> crate::Result<Self> {
        if !config.ssl_verification {
            tracing::warn!("TLS certificate verification is disabled (ssl_verification = false)");
        }
        let http = reqwest::ClientBuilder::new()
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(!config.ssl_verification)
            .build()
            .map_err(|e| crate::Error::ConfigError(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    async fn finish(url: &url::Url, resp: reqwest::Response) -> crate::Result<(url::Url, String)> {
        let final_url = resp.url().clone();
        let status = resp.status();
        if !status.is_success() {
            tracing::error!(url = %url, final_url = %final_url, status_code = ?status, "response was not ok");
            return Err(crate::Error::Transport {
                url: final_url,
                message: format!("unexpected HTTP status {status}"),
            });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(&final_url, e))?;
        tracing::debug!(url = %url, final_url = %final_url, status_code = ?status, len = body.len(), "response");
        Ok((final_url, body))
    }
}

fn transport_error(url: &url::Url, e: reqwest::Error) -> crate::Error {
    crate::Error::Transport {
        url: url.clone(),
        message: e.without_url().to_string(),
    }
}

impl SessionClient for ReqwestSession {
    async fn get(&self, url: &url::Url) -> crate::Result<(url::Url, String)> {
        tracing::debug!(url = %url, "GET");
        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        Self::finish(url, resp).await
    }

    async fn post(
        &self,
        url: &url::Url,
        payload: &crate::form::Payload,
    ) -> crate::Result<String> {
        tracing::debug!(url = %url, payload = ?payload, "POST");
        let resp = self
            .http
            .post(url.clone())
            .form(payload.pairs())
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;
        Ok(Self::finish(url, resp).await?.1)
    }
}
