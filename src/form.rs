use crate::html::{HtmlDocument, HtmlElement};

/// Input fields of one HTML form, in document order, plus its submission target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    pub form_id: String,
    pub action: Option<String>,
    fields: Vec<(String, String)>,
}

impl FormFields {
    pub fn new(form_id: impl Into<String>, action: Option<String>) -> Self {
        Self {
            form_id: form_id.into(),
            action,
            fields: Vec::new(),
        }
    }

    /// Later values for an already-seen name replace the earlier one in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolves `action` against the URL the form was served from.
    pub fn submit_url(&self, base: &url::Url) -> crate::Result<url::Url> {
        match self.action.as_deref().map(str::trim) {
            Some(action) if !action.is_empty() => Ok(base.join(action)?),
            _ => Err(crate::Error::FormActionMissing(self.form_id.clone())),
        }
    }
}

/// Decides which form field receives the user-supplied credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldMatcher {
    ContainsIgnoreCase(String),
    Exact(String),
}

impl FieldMatcher {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FieldMatcher::ContainsIgnoreCase(needle) => name
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
            FieldMatcher::Exact(expected) => name == expected,
        }
    }
}

/// Form body ready to be POSTed as `application/x-www-form-urlencoded`.
///
/// Values may contain the username or the OTP, so `Debug` only lists field names.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pairs: Vec<(String, String)>,
}

impl Payload {
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl std::fmt::Debug for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Payload")
            .field(
                "fields",
                &self.pairs.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}

pub fn extract_form<D: HtmlDocument>(doc: &D, form_id: &str) -> crate::Result<FormFields> {
    let Some(form) = doc.find_by_id(form_id) else {
        return Err(crate::Error::FormNotFound(form_id.to_owned()));
    };

    let mut fields = FormFields::new(form_id, form.attr("action").map(str::to_owned));
    for input in doc.all_inputs(Some(&form)) {
        let Some(name) = input.attr("name") else {
            continue;
        };
        fields.insert(name, input.attr("value").unwrap_or_default());
    }

    tracing::debug!(form_id = form_id, action = ?fields.action, fields = ?fields.names().collect::<Vec<_>>(), "extracted form");
    Ok(fields)
}

/// Copies every field through, overriding the ones accepted by `matcher` with `value`.
pub fn fill_form(fields: &FormFields, matcher: &FieldMatcher, value: &str) -> Payload {
    let mut matched = false;
    let pairs = fields
        .fields
        .iter()
        .map(|(name, original)| {
            if matcher.matches(name) {
                matched = true;
                (name.clone(), value.to_owned())
            } else {
                (name.clone(), original.clone())
            }
        })
        .collect();

    if !matched {
        tracing::warn!(form_id = &fields.form_id, matcher = ?matcher, "no form field matched; submitting form without credential");
    }
    Payload { pairs }
}
