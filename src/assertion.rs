//! SAML assertion extraction from the IdP's final HTML page, and role parsing.

use crate::html::{HtmlDocument, HtmlElement};

pub const SAML_RESPONSE_FIELD: &str = "SAMLResponse";
pub const SAML_ASSERTION_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
pub const AWS_ROLE_ATTRIBUTE: &str = "https://aws.amazon.com/SAML/Attributes/Role";

/// Base64-encoded SAML response as posted by the IdP. Decoded at most once.
pub struct Assertion {
    raw: String,
    decoded: once_cell::sync::OnceCell<String>,
}

impl std::fmt::Debug for Assertion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assertion")
            .field("len", &self.raw.len())
            .finish()
    }
}

impl Assertion {
    pub fn new(raw: impl Into<String>) -> crate::Result<Self> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(crate::Error::AssertionMissing);
        }
        Ok(Self {
            raw,
            decoded: once_cell::sync::OnceCell::new(),
        })
    }

    /// The base64 form, as `sts:AssumeRoleWithSAML` expects it.
    pub fn as_base64(&self) -> &str {
        &self.raw
    }

    pub fn xml(&self) -> crate::Result<&str> {
        self.decoded
            .get_or_try_init(|| decode(&self.raw))
            .map(String::as_str)
    }

    pub fn roles(&self) -> crate::Result<Vec<crate::role::RolePair>> {
        let values = role_attribute_values(self.xml()?)?;
        let pairs = values
            .iter()
            .map(|v| crate::role::RolePair::parse(v))
            .collect::<crate::Result<Vec<_>>>()?;
        Ok(crate::role::normalize(pairs))
    }
}

fn decode(raw: &str) -> crate::Result<String> {
    use base64::Engine;

    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| crate::Error::AssertionDecode(format!("invalid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| crate::Error::AssertionDecode(format!("invalid UTF-8: {e}")))
}

/// Value of the last `SAMLResponse` input on the page.
pub fn extract_assertion<D: HtmlDocument>(doc: &D) -> crate::Result<Assertion> {
    let inputs = doc.all_inputs(None);
    let value = inputs
        .iter()
        .filter(|input| input.attr("name") == Some(SAML_RESPONSE_FIELD))
        .last()
        .and_then(|input| input.attr("value"));

    match value {
        Some(v) if !v.trim().is_empty() => {
            tracing::debug!(len = v.len(), "found SAML assertion");
            Assertion::new(v.to_owned())
        }
        _ => Err(crate::Error::AssertionMissing),
    }
}

/// Decodes `raw` and returns its role pairs in `(role, principal)` order.
pub fn parse_assertion(raw: &str) -> crate::Result<Vec<crate::role::RolePair>> {
    Assertion::new(raw)
        .map_err(|_| crate::Error::AssertionDecode("assertion is empty".to_owned()))?
        .roles()
}

fn is_saml_element(n: &roxmltree::Node, name: &str) -> bool {
    n.is_element()
        && n.tag_name().namespace() == Some(SAML_ASSERTION_NS)
        && n.tag_name().name() == name
}

/// Texts of every `AttributeValue` under the AWS role `Attribute`s.
fn role_attribute_values(xml: &str) -> crate::Result<Vec<String>> {
    let doc = roxmltree::Document::parse(xml)
        .map_err(|e| crate::Error::AssertionDecode(format!("invalid XML: {e}")))?;

    let values = doc
        .descendants()
        .filter(|n| is_saml_element(n, "Attribute") && n.attribute("Name") == Some(AWS_ROLE_ATTRIBUTE))
        .flat_map(|attr| attr.descendants().filter(|n| is_saml_element(n, "AttributeValue")))
        .filter_map(|v| v.text().map(|t| t.trim().to_owned()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>();

    tracing::debug!(count = values.len(), "role attribute values in assertion");
    Ok(values)
}
