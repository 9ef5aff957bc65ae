//! Account role classification
//!
//! The role of a managed account decides which subsystem-specific applier
//! receives its new secret. Roles are derived from the account's local name
//! by an ordered table of substring rules; the first matching rule wins.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::local_name;

/// Role of a managed account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// No role-specific propagation
    Default,
    /// Directory/profile synchronization service account
    FarmProfileSync,
    /// Enterprise search service account
    Search,
    /// Crawler default content-access account
    ContentCrawl,
    /// Anti-virus agent services
    Sophos,
    /// Workflow backend run-as account
    Workflow,
    /// Visio unattended account
    Visio,
    /// Excel unattended account
    Excel,
    /// Generic OS service account
    WindowsService,
    /// PerformancePoint unattended account
    PerformancePoint,
}

impl Role {
    /// Stable kebab-case label
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::FarmProfileSync => "farm-profile-sync",
            Self::Search => "search",
            Self::ContentCrawl => "content-crawl",
            Self::Sophos => "sophos",
            Self::Workflow => "workflow",
            Self::Visio => "visio",
            Self::Excel => "excel",
            Self::WindowsService => "windows-service",
            Self::PerformancePoint => "performance-point",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the classification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    /// Role assigned on match
    pub role: Role,
    /// Lower-case substrings; any one matching selects the role
    pub patterns: Vec<String>,
}

impl RoleRule {
    /// Create a rule
    pub fn new(role: Role, patterns: &[&str]) -> Self {
        Self {
            role,
            patterns: patterns.iter().map(|p| p.to_ascii_lowercase()).collect(),
        }
    }

    /// Whether the lower-cased local name matches this rule
    pub fn matches(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| name.contains(p.as_str()))
    }
}

/// Default rule table, in priority order
pub fn default_rules() -> Vec<RoleRule> {
    vec![
        RoleRule::new(Role::FarmProfileSync, &["sync"]),
        RoleRule::new(Role::Search, &["search"]),
        RoleRule::new(Role::ContentCrawl, &["crawl", "content"]),
        RoleRule::new(Role::Sophos, &["sophos"]),
        RoleRule::new(Role::Workflow, &["workflow"]),
        RoleRule::new(Role::Visio, &["visio"]),
        RoleRule::new(Role::Excel, &["excel"]),
        RoleRule::new(Role::WindowsService, &["winsvc", "windowsservice"]),
        RoleRule::new(Role::PerformancePoint, &["performancepoint", "perfpoint"]),
    ]
}

/// Pure, table-driven classifier
#[derive(Debug, Clone)]
pub struct RoleClassifier {
    rules: Vec<RoleRule>,
}

impl Default for RoleClassifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl RoleClassifier {
    /// Build a classifier from an ordered table
    pub fn new(rules: Vec<RoleRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| RoleRule {
                patterns: rule
                    .patterns
                    .into_iter()
                    .map(|p| p.to_ascii_lowercase())
                    .filter(|p| !p.is_empty())
                    .collect(),
                ..rule
            })
            .collect();
        Self { rules }
    }

    /// The table, in evaluation order
    pub fn rules(&self) -> &[RoleRule] {
        &self.rules
    }

    /// Role of an identity; `Default` when no rule matches
    pub fn classify(&self, identity: &str) -> Role {
        let name = local_name(identity).to_ascii_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&name))
            .map_or(Role::Default, |rule| rule.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("CONTOSO\\svc_ups_sync", Role::FarmProfileSync)]
    #[case("CONTOSO\\SVC_Search", Role::Search)]
    #[case("svc_crawl@contoso.com", Role::ContentCrawl)]
    #[case("CONTOSO\\svc_content_access", Role::ContentCrawl)]
    #[case("CONTOSO\\svc_sophos", Role::Sophos)]
    #[case("CONTOSO\\svc_workflow", Role::Workflow)]
    #[case("CONTOSO\\svc_visio", Role::Visio)]
    #[case("CONTOSO\\svc_excel", Role::Excel)]
    #[case("CONTOSO\\svc_winsvc_backup", Role::WindowsService)]
    #[case("CONTOSO\\svc_perfpoint", Role::PerformancePoint)]
    #[case("CONTOSO\\svc_farm", Role::Default)]
    fn test_classify(#[case] identity: &str, #[case] expected: Role) {
        assert_eq!(RoleClassifier::default().classify(identity), expected);
    }

    #[test]
    fn test_first_rule_wins() {
        let classifier = RoleClassifier::default();
        // "search" precedes "content" in the table
        assert_eq!(classifier.classify("CONTOSO\\svc_search_content"), Role::Search);
        assert_eq!(classifier.classify("CONTOSO\\svc_content_search"), Role::Search);
        // "sync" precedes everything
        assert_eq!(classifier.classify("CONTOSO\\svc_excel_sync"), Role::FarmProfileSync);
    }

    #[test]
    fn test_domain_is_not_matched() {
        // Only the local name is classified
        assert_eq!(RoleClassifier::default().classify("SEARCH\\svc_farm"), Role::Default);
    }

    #[test]
    fn test_custom_table_order_is_respected() {
        let classifier = RoleClassifier::new(vec![
            RoleRule::new(Role::ContentCrawl, &["content"]),
            RoleRule::new(Role::Search, &["search"]),
        ]);
        assert_eq!(classifier.classify("svc_search_content"), Role::ContentCrawl);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let classifier = RoleClassifier::default();
        let first = classifier.classify("CONTOSO\\svc_visio");
        assert!((0..100).all(|_| classifier.classify("CONTOSO\\svc_visio") == first));
    }
}
