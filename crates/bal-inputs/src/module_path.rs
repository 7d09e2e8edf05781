use std::fmt;

/// `org/name.part` as written in an import, or the module a file belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ModulePath {
    org: Option<String>,
    names: Vec<String>,
}

impl ModulePath {
    pub fn new(org: Option<String>, names: Vec<String>) -> Self {
        Self { org, names }
    }

    /// Parses `org/a.b` or `a.b`. Empty segments are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        let (org, rest) = match text.split_once('/') {
            Some((org, rest)) => (Some(org.to_owned()), rest),
            None => (None, text),
        };
        if org.as_deref().is_some_and(str::is_empty) {
            return None;
        }
        let names: Vec<String> = rest.split('.').map(str::to_owned).collect();
        if names.iter().any(String::is_empty) {
            return None;
        }
        Some(Self { org, names })
    }

    pub fn org(&self) -> Option<&str> {
        self.org.as_deref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The default import prefix: the last name segment.
    pub fn default_prefix(&self) -> Option<&str> {
        self.names.last().map(String::as_str)
    }

    /// Whether an import written without an organization refers to `self`.
    pub fn matches(&self, import: &Self) -> bool {
        self.names == import.names && (import.org.is_none() || import.org == self.org)
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(org) = &self.org {
            write!(f, "{org}/")?;
        }
        f.write_str(&self.names.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let path = ModulePath::parse("ballerina/lang.array").expect("valid path");
        assert_eq!(path.org(), Some("ballerina"));
        assert_eq!(path.names(), ["lang", "array"]);
        assert_eq!(path.default_prefix(), Some("array"));
        assert_eq!(path.to_string(), "ballerina/lang.array");

        assert_eq!(ModulePath::parse("util").map(|path| path.to_string()).as_deref(), Some("util"));
        assert_eq!(ModulePath::parse("/util"), None);
        assert_eq!(ModulePath::parse("a..b"), None);
    }

    #[test]
    fn org_less_import_matches_any_org() {
        let module = ModulePath::parse("acme/util").expect("valid path");
        assert!(module.matches(&ModulePath::parse("util").expect("valid path")));
        assert!(module.matches(&ModulePath::parse("acme/util").expect("valid path")));
        assert!(!module.matches(&ModulePath::parse("other/util").expect("valid path")));
    }
}
