//! Account identity helpers
//!
//! Identities are domain-qualified (`CONTOSO\svc_search` or
//! `svc_search@contoso.com`) and compared case-insensitively, the way the
//! directory compares them.

/// Local part of an identity, without domain prefix or UPN suffix
pub fn local_name(identity: &str) -> &str {
    let after_domain = identity.rsplit('\\').next().unwrap_or(identity);
    after_domain.split('@').next().unwrap_or(after_domain)
}

/// Whether two identities name the same account
pub fn identity_matches(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CONTOSO\\svc_search", "svc_search")]
    #[case("svc_search@contoso.com", "svc_search")]
    #[case("svc_search", "svc_search")]
    #[case("", "")]
    fn test_local_name(#[case] identity: &str, #[case] expected: &str) {
        assert_eq!(local_name(identity), expected);
    }

    #[test]
    fn test_identity_matches_ignores_case() {
        assert!(identity_matches("CONTOSO\\SVC_Farm", "contoso\\svc_farm"));
        assert!(!identity_matches("CONTOSO\\svc_farm", "CONTOSO\\svc_farm2"));
    }
}
