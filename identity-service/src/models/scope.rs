//! Scope strings and their parsed form.

use std::fmt;

pub const ADMIN_SCOPE: &str = "admin";
pub const ORGANIZATION_OWNER: &str = "organization:owner";
pub const ORGANIZATION_MEMBER: &str = "organization:member";
pub const MEMBER_OF_PREFIX: &str = "user:memberof:";

/// A requested scope, parsed once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Any scope passed through without a relationship check
    Direct(String),
    /// `user:memberof:<globalid>`
    MemberOf(String),
}

impl Scope {
    /// The raw string is kept verbatim so it renders back unchanged.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(MEMBER_OF_PREFIX) {
            Some(global_id) => Scope::MemberOf(global_id.to_string()),
            None => Scope::Direct(raw.to_string()),
        }
    }

    pub fn parse_all<S: AsRef<str>>(raw: &[S]) -> Vec<Self> {
        raw.iter().map(|s| Scope::parse(s.as_ref())).collect()
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Direct(scope) => f.write_str(scope),
            Scope::MemberOf(global_id) => write!(f, "{}{}", MEMBER_OF_PREFIX, global_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member_of() {
        assert_eq!(
            Scope::parse("user:memberof:acme.sales"),
            Scope::MemberOf("acme.sales".to_string())
        );
        assert_eq!(Scope::parse(" admin "), Scope::Direct(" admin ".to_string()));
        assert_eq!(
            Scope::parse("user:memberofacme"),
            Scope::Direct("user:memberofacme".to_string())
        );
    }

    #[test]
    fn test_display_restores_wire_form() {
        for raw in ["user:memberof:acme", "organization:owner", "user:name"] {
            assert_eq!(Scope::parse(raw).to_string(), raw);
        }
    }
}
