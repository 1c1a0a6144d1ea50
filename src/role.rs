/// Marker that identifies the SAML provider (principal) half of a role attribute value.
pub const PRINCIPAL_MARKER: &str = "saml-provider";

/// One `https://aws.amazon.com/SAML/Attributes/Role` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RolePair {
    pub role_arn: String,
    pub principal_arn: String,
}

impl RolePair {
    pub fn new(role_arn: impl Into<String>, principal_arn: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            principal_arn: principal_arn.into(),
        }
    }

    /// Parses `"A,B"` positionally as `role_arn,principal_arn` without reordering.
    pub fn parse(value: &str) -> crate::Result<Self> {
        let parts: Vec<&str> = value.trim().split(',').map(str::trim).collect();
        let &[first, second] = parts.as_slice() else {
            return Err(crate::Error::AssertionDecode(format!(
                "role attribute value must be 'role_arn,principal_arn': {value:?}"
            )));
        };
        for arn in [first, second] {
            if !arn.starts_with("arn:") || arn.len() <= "arn:".len() {
                return Err(crate::Error::AssertionDecode(format!(
                    "role attribute value contains an invalid ARN: {value:?}"
                )));
            }
        }
        Ok(Self::new(first, second))
    }

    /// Puts the member carrying [`PRINCIPAL_MARKER`] in `principal_arn`.
    /// Pairs where the marker is on neither or both members are kept as given.
    pub fn normalized(self) -> Self {
        match (
            self.role_arn.contains(PRINCIPAL_MARKER),
            self.principal_arn.contains(PRINCIPAL_MARKER),
        ) {
            (true, false) => Self {
                role_arn: self.principal_arn,
                principal_arn: self.role_arn,
            },
            (false, true) => self,
            _ => {
                tracing::warn!(pair = %self, "cannot tell the SAML provider apart from the role; keeping the given order");
                self
            }
        }
    }
}

impl std::fmt::Display for RolePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.role_arn, self.principal_arn)
    }
}

/// Identity providers disagree on `role,principal` vs `principal,role`; returns a new
/// list in `(role, principal)` order with the same length and positions as `pairs`.
pub fn normalize(pairs: Vec<RolePair>) -> Vec<RolePair> {
    pairs.into_iter().map(RolePair::normalized).collect()
}

/// A chosen entry of a role list; always in range for the list it was made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleSelection {
    index: usize,
}

impl RoleSelection {
    pub fn new(index: usize, len: usize) -> crate::Result<Self> {
        if index >= len {
            return Err(crate::Error::InvalidSelection(format!(
                "{index} is out of range (0..{len})"
            )));
        }
        Ok(Self { index })
    }

    pub fn parse(input: &str, len: usize) -> crate::Result<Self> {
        let index = input.trim().parse::<usize>().map_err(|_| {
            crate::Error::InvalidSelection(format!("'{}' is not a role number", input.trim()))
        })?;
        Self::new(index, len)
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Asks a human to pick from an enumerated role menu.
#[allow(async_fn_in_trait)]
pub trait RoleChooser {
    /// Presents `menu` and returns the raw answer.
    async fn choose(&mut self, menu: &str) -> crate::Result<String>;
}

pub fn render_menu(roles: &[RolePair]) -> String {
    let mut menu = String::from("Please choose the role you would like to assume:\n");
    for (i, role) in roles.iter().enumerate() {
        menu.push_str(&format!("[ {i} ]: {}\n", role.role_arn));
    }
    menu
}

/// Picks one role: `preferred` by role ARN when given, the only entry when there is
/// one, otherwise whatever `chooser` answers. No re-prompt on a bad answer.
pub async fn resolve<C: RoleChooser>(
    roles: Vec<RolePair>,
    preferred: Option<&str>,
    chooser: &mut C,
) -> crate::Result<RolePair> {
    if roles.is_empty() {
        return Err(crate::Error::NoRolesAvailable);
    }

    let selection = if let Some(arn) = preferred {
        match roles.iter().position(|r| r.role_arn == arn) {
            Some(i) => RoleSelection::new(i, roles.len())?,
            None => {
                return Err(crate::Error::InvalidSelection(format!(
                    "role '{arn}' is not authorized for this user"
                )))
            }
        }
    } else if roles.len() == 1 {
        RoleSelection::new(0, 1)?
    } else {
        let answer = chooser.choose(&render_menu(&roles)).await?;
        RoleSelection::parse(&answer, roles.len())?
    };

    tracing::debug!(index = selection.index(), count = roles.len(), "role selected");
    let mut roles = roles;
    Ok(roles.swap_remove(selection.index()))
}
