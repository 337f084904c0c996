use std::{convert::Infallible, fmt, str::FromStr};

/// A package name, optionally scoped (`@scope/name`). Stored as a single
/// string and split on demand rather than as two owned fields — most idents
/// are unscoped and never need the split.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    pub fn new<S: AsRef<str>>(full: S) -> Ident {
        Ident(full.as_ref().to_string())
    }

    pub fn scope(&self) -> Option<&str> {
        self.0.starts_with('@').then(|| self.0.split_once('/').map(|(scope, _)| scope)).flatten()
    }

    pub fn name(&self) -> &str {
        if self.0.starts_with('@') {
            self.0.split_once('/').map(|(_, name)| name).unwrap_or(&self.0)
        } else {
            &self.0
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ident {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ident {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Ident::new(s))
    }
}

serde_plain::derive_deserialize_from_fromstr!(Ident, "a package name");
serde_plain::derive_serialize_from_display!(Ident);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_scope_and_name() {
        let ident = Ident::new("@babel/core");
        assert_eq!(ident.scope(), Some("@babel"));
        assert_eq!(ident.name(), "core");
    }

    #[test]
    fn unscoped_name_has_no_scope() {
        let ident = Ident::new("lodash");
        assert_eq!(ident.scope(), None);
        assert_eq!(ident.name(), "lodash");
    }
}
