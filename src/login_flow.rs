//! STA (SafeNet Trusted Access) SAML login, end to end.
//!
//! STA asks for the username on the first form page and for the OTP on the second,
//! then answers with an auto-submitting page carrying the SAML response for AWS.

/// Progress through [`LoginFlow::run`]; after a failure it names the last completed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    FormFetched,
    Step1Submitted,
    Step2Submitted,
    AssertionExtracted,
    RoleResolved,
    Exchanged,
    Persisted,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub profile: String,
    pub role: crate::role::RolePair,
    pub expiration: chrono::DateTime<chrono::Utc>,
}

pub struct LoginFlow<'a, S, X, P, C> {
    pub config: &'a crate::config::Config,
    pub session: S,
    pub exchanger: X,
    pub persister: P,
    pub chooser: C,
    /// Role ARN to pick without prompting
    pub preferred_role: Option<String>,
    state: State,
}

impl<'a, S, X, P, C> LoginFlow<'a, S, X, P, C>
where
    S: crate::http_session::SessionClient,
    X: crate::client::CredentialExchanger,
    P: crate::credential_store::CredentialPersister,
    C: crate::role::RoleChooser,
{
    pub fn new(
        config: &'a crate::config::Config,
        session: S,
        exchanger: X,
        persister: P,
        chooser: C,
    ) -> Self {
        Self {
            config,
            session,
            exchanger,
            persister,
            chooser,
            preferred_role: None,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Runs every stage in order; credentials are persisted under `username` only when
    /// all of them succeed.
    pub async fn run(
        &mut self,
        username: &str,
        otp: &secrecy::SecretString,
    ) -> crate::Result<LoginOutcome> {
        self.state = State::Init;
        let result = self.run_stages(username, otp).await;
        if let Err(ref e) = result {
            tracing::debug!(state = ?self.state, err = %e, "login failed");
        }
        result
    }

    async fn run_stages(
        &mut self,
        username: &str,
        otp: &secrecy::SecretString,
    ) -> crate::Result<LoginOutcome> {
        use secrecy::ExposeSecret;

        let entry_url = self.config.entry_url()?;
        let (form_url, body) = self.session.get(&entry_url).await?;
        let fields = parse_form(&body, &self.config.login_form_id)?;
        self.advance(State::FormFetched);

        let submit_url = fields.submit_url(&form_url)?;
        let payload = crate::form::fill_form(
            &fields,
            &crate::form::FieldMatcher::ContainsIgnoreCase(self.config.username_field.clone()),
            username,
        );
        let body = self.session.post(&submit_url, &payload).await?;
        self.advance(State::Step1Submitted);

        let fields = parse_form(&body, &self.config.login_form_id)?;
        let otp_url = fields.submit_url(&submit_url)?;
        let payload = crate::form::fill_form(
            &fields,
            &crate::form::FieldMatcher::Exact(self.config.otp_field.clone()),
            otp.expose_secret(),
        );
        let body = self.session.post(&otp_url, &payload).await?;
        self.advance(State::Step2Submitted);

        let assertion = {
            let doc = crate::html::ScraperDocument::parse(&body);
            crate::assertion::extract_assertion(&doc)?
        };
        self.advance(State::AssertionExtracted);

        let roles = assertion.roles()?;
        let role = crate::role::resolve(roles, self.preferred_role.as_deref(), &mut self.chooser)
            .await?;
        self.advance(State::RoleResolved);

        let bundle = self.exchanger.exchange(&role, &assertion).await?;
        self.advance(State::Exchanged);

        self.persister
            .persist(username, &bundle, &self.config.region, &self.config.output)?;
        self.advance(State::Persisted);

        Ok(LoginOutcome {
            profile: username.to_owned(),
            role,
            expiration: bundle.expiration,
        })
    }

    fn advance(&mut self, state: State) {
        tracing::debug!(from = ?self.state, to = ?state, "login flow");
        self.state = state;
    }
}

fn parse_form(body: &str, form_id: &str) -> crate::Result<crate::form::FormFields> {
    let doc = crate::html::ScraperDocument::parse(body);
    crate::form::extract_form(&doc, form_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const ENTRY: &str =
        "https://idp.eu.safenetid.com/auth/realms/T-STA/protocol/saml/clients/AWS";
    const STEP1: &str =
        "https://idp.eu.safenetid.com/auth/realms/T-STA/login-actions/authenticate?execution=u";
    const STEP2: &str =
        "https://idp.eu.safenetid.com/auth/realms/T-STA/login-actions/authenticate?execution=o";

    fn username_page() -> String {
        format!(
            r#"<html><body><form id="sas-login-form" action="{STEP1}" method="post">
                <input type="hidden" name="csrf_token" value="abc123">
                <input type="text" name="sas_user" value="">
                <input type="submit" value="Continue">
            </form></body></html>"#
        )
    }

    fn otp_page() -> String {
        format!(
            r#"<html><body><form id="sas-login-form" action="{STEP2}" method="post">
                <INPUT type="hidden" name="state" value="mfa-1">
                <input type="password" name="sas_response">
            </form></body></html>"#
        )
    }

    fn saml_page(values: &[&str]) -> String {
        use base64::Engine;
        let values = values
            .iter()
            .map(|v| format!("<saml:AttributeValue>{v}</saml:AttributeValue>"))
            .collect::<String>();
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol"><saml:Assertion xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion"><saml:AttributeStatement><saml:Attribute Name="https://aws.amazon.com/SAML/Attributes/Role">{values}</saml:Attribute></saml:AttributeStatement></saml:Assertion></samlp:Response>"#
        );
        let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
        format!(
            r#"<html><body onload="document.forms[0].submit()"><form method="post" action="https://signin.aws.amazon.com/saml"><input type="hidden" name="SAMLResponse" value="{encoded}"></form></body></html>"#
        )
    }

    #[derive(Debug, Clone, PartialEq)]
    enum Request {
        Get(String),
        Post(String, Vec<(String, String)>),
    }

    /// Replays canned pages in order and records requests.
    #[derive(Clone)]
    struct StubSession {
        get_final_url: String,
        pages: Arc<Mutex<Vec<String>>>,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl StubSession {
        fn new(pages: Vec<String>) -> Self {
            Self {
                get_final_url: ENTRY.to_owned(),
                pages: Arc::new(Mutex::new(pages.into_iter().rev().collect())),
                requests: Arc::new(Mutex::new(vec![])),
            }
        }

        fn next_page(&self) -> crate::Result<String> {
            self.pages
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| crate::Error::Transport {
                    url: url::Url::parse(ENTRY).unwrap(),
                    message: "no more canned pages".to_owned(),
                })
        }
    }

    impl crate::http_session::SessionClient for StubSession {
        async fn get(&self, url: &url::Url) -> crate::Result<(url::Url, String)> {
            self.requests
                .lock()
                .unwrap()
                .push(Request::Get(url.to_string()));
            Ok((url::Url::parse(&self.get_final_url).unwrap(), self.next_page()?))
        }

        async fn post(
            &self,
            url: &url::Url,
            payload: &crate::form::Payload,
        ) -> crate::Result<String> {
            self.requests
                .lock()
                .unwrap()
                .push(Request::Post(url.to_string(), payload.pairs().to_vec()));
            self.next_page()
        }
    }

    #[derive(Clone, Default)]
    struct StubExchanger {
        calls: Arc<Mutex<Vec<(crate::role::RolePair, String)>>>,
    }

    impl crate::client::CredentialExchanger for StubExchanger {
        async fn exchange(
            &self,
            role: &crate::role::RolePair,
            assertion: &crate::assertion::Assertion,
        ) -> crate::Result<crate::client::CredentialBundle> {
            self.calls
                .lock()
                .unwrap()
                .push((role.clone(), assertion.as_base64().to_owned()));
            Ok(crate::client::CredentialBundle::new(
                "ASIAFIXED",
                "fixedsecret",
                "fixedtoken",
                chrono::DateTime::parse_from_rfc3339("2019-11-21T10:00:00Z")
                    .unwrap()
                    .with_timezone(&chrono::Utc),
            )?)
        }
    }

    struct FailingExchanger;

    impl crate::client::CredentialExchanger for FailingExchanger {
        async fn exchange(
            &self,
            _role: &crate::role::RolePair,
            _assertion: &crate::assertion::Assertion,
        ) -> crate::Result<crate::client::CredentialBundle> {
            Err(crate::client::Error::PermissionDenied(
                "AWS STS says AccessDenied for AssumeRoleWithSAML: None".to_owned(),
                "AccessDenied".into(),
            )
            .into())
        }
    }

    struct StubChooser {
        answer: &'static str,
        prompted: Arc<Mutex<usize>>,
    }

    impl crate::role::RoleChooser for StubChooser {
        async fn choose(&mut self, _menu: &str) -> crate::Result<String> {
            *self.prompted.lock().unwrap() += 1;
            Ok(self.answer.to_owned())
        }
    }

    fn chooser(answer: &'static str) -> (StubChooser, Arc<Mutex<usize>>) {
        let prompted = Arc::new(Mutex::new(0));
        (
            StubChooser {
                answer,
                prompted: prompted.clone(),
            },
            prompted,
        )
    }

    fn otp() -> secrecy::SecretString {
        "246810".into()
    }

    fn config() -> crate::config::Config {
        crate::config::Config::new("T-STA")
    }

    const SINGLE_ROLE: &str = "arn:aws:iam::111:saml-provider/X,arn:aws:iam::111:role/Y";

    #[tokio::test]
    async fn single_role_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let store = crate::credential_store::IniCredentialStore::new(dir.path().join("credentials"));
        let session = StubSession::new(vec![username_page(), otp_page(), saml_page(&[SINGLE_ROLE])]);
        let exchanger = StubExchanger::default();
        let (chooser, prompted) = chooser("7");

        let mut flow = LoginFlow::new(&config, session.clone(), exchanger.clone(), store.clone(), chooser);
        let outcome = flow.run("alice", &otp()).await.unwrap();

        assert_eq!(flow.state(), State::Persisted);
        assert_eq!(outcome.profile, "alice");
        assert_eq!(outcome.role.role_arn, "arn:aws:iam::111:role/Y");
        assert_eq!(outcome.role.principal_arn, "arn:aws:iam::111:saml-provider/X");
        assert_eq!(*prompted.lock().unwrap(), 0);

        let requests = session.requests.lock().unwrap().clone();
        assert_eq!(
            requests,
            vec![
                Request::Get(ENTRY.to_owned()),
                Request::Post(
                    STEP1.to_owned(),
                    vec![
                        ("csrf_token".to_owned(), "abc123".to_owned()),
                        ("sas_user".to_owned(), "alice".to_owned()),
                    ]
                ),
                Request::Post(
                    STEP2.to_owned(),
                    vec![
                        ("state".to_owned(), "mfa-1".to_owned()),
                        ("sas_response".to_owned(), "246810".to_owned()),
                    ]
                ),
            ]
        );

        let calls = exchanger.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].0,
            crate::role::RolePair::new(
                "arn:aws:iam::111:role/Y",
                "arn:aws:iam::111:saml-provider/X"
            )
        );
        assert!(!calls[0].1.is_empty());

        let section = store.profile("alice").unwrap().unwrap();
        assert!(section.contains(&("aws_access_key_id".to_owned(), "ASIAFIXED".to_owned())));
        assert!(section.contains(&("region".to_owned(), "us-east-2".to_owned())));
        assert!(section.contains(&("output".to_owned(), "json".to_owned())));
    }

    #[tokio::test]
    async fn idempotent_rerun() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let config = config();

        let mut contents = vec![];
        for _ in 0..2 {
            let session =
                StubSession::new(vec![username_page(), otp_page(), saml_page(&[SINGLE_ROLE])]);
            let (chooser, _) = chooser("0");
            let mut flow = LoginFlow::new(
                &config,
                session,
                StubExchanger::default(),
                crate::credential_store::IniCredentialStore::new(&path),
                chooser,
            );
            flow.run("alice", &otp()).await.unwrap();
            contents.push(std::fs::read_to_string(&path).unwrap());
        }
        assert_eq!(contents[0], contents[1]);
        assert_eq!(contents[1].matches("[alice]").count(), 1);
    }

    #[tokio::test]
    async fn multiple_roles_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let session = StubSession::new(vec![
            username_page(),
            otp_page(),
            saml_page(&[
                "arn:aws:iam::111:role/A,arn:aws:iam::111:saml-provider/X",
                "arn:aws:iam::222:saml-provider/X,arn:aws:iam::222:role/B",
            ]),
        ]);
        let exchanger = StubExchanger::default();
        let (chooser, prompted) = chooser("1");
        let mut flow = LoginFlow::new(
            &config,
            session,
            exchanger.clone(),
            crate::credential_store::IniCredentialStore::new(dir.path().join("credentials")),
            chooser,
        );
        let outcome = flow.run("alice", &otp()).await.unwrap();
        assert_eq!(outcome.role.role_arn, "arn:aws:iam::222:role/B");
        assert_eq!(*prompted.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn wrong_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let config = config();
        // STA answers a wrong OTP with the OTP form again
        let session = StubSession::new(vec![username_page(), otp_page(), otp_page()]);
        let (chooser, _) = chooser("0");
        let mut flow = LoginFlow::new(
            &config,
            session,
            StubExchanger::default(),
            crate::credential_store::IniCredentialStore::new(&path),
            chooser,
        );
        let err = flow.run("alice", &otp()).await.unwrap_err();
        assert!(matches!(err, crate::Error::AssertionMissing));
        assert!(!err.to_string().contains("246810"));
        assert_eq!(flow.state(), State::Step2Submitted);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn missing_login_form() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let session = StubSession::new(vec!["<html><body>Maintenance</body></html>".to_owned()]);
        let (chooser, _) = chooser("0");
        let mut flow = LoginFlow::new(
            &config,
            session,
            StubExchanger::default(),
            crate::credential_store::IniCredentialStore::new(dir.path().join("credentials")),
            chooser,
        );
        assert!(matches!(
            flow.run("alice", &otp()).await,
            Err(crate::Error::FormNotFound(_))
        ));
        assert_eq!(flow.state(), State::Init);
    }

    #[tokio::test]
    async fn no_roles() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let session = StubSession::new(vec![username_page(), otp_page(), saml_page(&[])]);
        let (chooser, _) = chooser("0");
        let mut flow = LoginFlow::new(
            &config,
            session,
            StubExchanger::default(),
            crate::credential_store::IniCredentialStore::new(dir.path().join("credentials")),
            chooser,
        );
        assert!(matches!(
            flow.run("alice", &otp()).await,
            Err(crate::Error::NoRolesAvailable)
        ));
        assert_eq!(flow.state(), State::AssertionExtracted);
    }

    #[tokio::test]
    async fn exchange_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials");
        let config = config();
        let session = StubSession::new(vec![username_page(), otp_page(), saml_page(&[SINGLE_ROLE])]);
        let (chooser, _) = chooser("0");
        let mut flow = LoginFlow::new(
            &config,
            session,
            FailingExchanger,
            crate::credential_store::IniCredentialStore::new(&path),
            chooser,
        );
        let err = flow.run("alice", &otp()).await.unwrap_err();
        assert!(matches!(
            err,
            crate::Error::Exchange(crate::client::Error::PermissionDenied(..))
        ));
        assert!(err.to_string().contains("AccessDenied"));
        assert_eq!(flow.state(), State::RoleResolved);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn preferred_role_skips_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let config = config();
        let session = StubSession::new(vec![
            username_page(),
            otp_page(),
            saml_page(&[
                "arn:aws:iam::111:role/A,arn:aws:iam::111:saml-provider/X",
                "arn:aws:iam::111:role/B,arn:aws:iam::111:saml-provider/X",
            ]),
        ]);
        let (chooser, prompted) = chooser("0");
        let mut flow = LoginFlow::new(
            &config,
            session,
            StubExchanger::default(),
            crate::credential_store::IniCredentialStore::new(dir.path().join("credentials")),
            chooser,
        );
        flow.preferred_role = Some("arn:aws:iam::111:role/B".to_owned());
        let outcome = flow.run("alice", &otp()).await.unwrap();
        assert_eq!(outcome.role.role_arn, "arn:aws:iam::111:role/B");
        assert_eq!(*prompted.lock().unwrap(), 0);
    }
}
