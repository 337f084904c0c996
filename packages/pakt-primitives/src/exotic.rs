use std::fmt;

/// A range that bypasses the semver reducer entirely. The resolver dispatches
/// to one of the exotic resolvers by inspecting which variant this is. Each
/// payload is the full original range string, scheme prefix included, so
/// `Display` round-trips byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExoticRange {
    File(String),
    Link(String),
    Url(String),
    Git(String),
    Workspace(String),
}

impl ExoticRange {
    /// Recognizes the scheme prefixes real manifests use for non-registry
    /// dependencies. Returns `None` for anything that should be handed to
    /// the semver parser instead.
    pub fn classify(range: &str) -> Option<ExoticRange> {
        if range.starts_with("file:") {
            return Some(ExoticRange::File(range.to_string()));
        }

        if range.starts_with("link:") {
            return Some(ExoticRange::Link(range.to_string()));
        }

        if range.starts_with("workspace:") {
            return Some(ExoticRange::Workspace(range.to_string()));
        }

        for prefix in ["git+ssh:", "git+http:", "git+https:", "git+file:", "git:"] {
            if range.starts_with(prefix) {
                return Some(ExoticRange::Git(range.to_string()));
            }
        }

        if is_git_host_shorthand(range) {
            return Some(ExoticRange::Git(range.to_string()));
        }

        for prefix in ["http:", "https:"] {
            if range.starts_with(prefix) {
                return Some(ExoticRange::Url(range.to_string()));
            }
        }

        None
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExoticRange::File(s)
            | ExoticRange::Link(s)
            | ExoticRange::Url(s)
            | ExoticRange::Git(s)
            | ExoticRange::Workspace(s) => s,
        }
    }
}

/// `user/repo` and `user/repo#committish` shorthands for GitHub dependencies
/// a bare semver range would never otherwise parse (no digits, contains `/`).
fn is_git_host_shorthand(range: &str) -> bool {
    let without_committish = range.split('#').next().unwrap_or(range);

    let Some((owner, repo)) = without_committish.split_once('/') else { return false };

    !owner.is_empty()
        && !repo.is_empty()
        && !owner.contains(':')
        && !repo.contains('/')
        && owner.chars().next().map_or(false, |c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl fmt::Display for ExoticRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_file_and_link() {
        assert_eq!(ExoticRange::classify("file:../local-pkg"), Some(ExoticRange::File("file:../local-pkg".to_string())));
        assert_eq!(ExoticRange::classify("link:../linked-pkg"), Some(ExoticRange::Link("link:../linked-pkg".to_string())));
    }

    #[test]
    fn classifies_workspace() {
        assert_eq!(ExoticRange::classify("workspace:^1.0.0"), Some(ExoticRange::Workspace("workspace:^1.0.0".to_string())));
    }

    #[test]
    fn classifies_git_urls_and_shorthand() {
        assert!(matches!(ExoticRange::classify("git+https://github.com/a/b.git"), Some(ExoticRange::Git(_))));
        assert!(matches!(ExoticRange::classify("user/repo"), Some(ExoticRange::Git(_))));
        assert!(matches!(ExoticRange::classify("user/repo#v1.0.0"), Some(ExoticRange::Git(_))));
    }

    #[test]
    fn classifies_plain_urls() {
        assert!(matches!(ExoticRange::classify("https://example.com/pkg.tgz"), Some(ExoticRange::Url(_))));
    }

    #[test]
    fn does_not_classify_semver_ranges() {
        assert_eq!(ExoticRange::classify("^1.2.3"), None);
        assert_eq!(ExoticRange::classify("latest"), None);
        assert_eq!(ExoticRange::classify("1.x"), None);
    }
}
