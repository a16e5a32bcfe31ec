//! Delegation configuration and reserved accessor names.
//!
//! Accessors whose name matches a reserved rule are never delegated. The
//! standard rules cover the internal, query, reset, cast, "was" and
//! change-tracking helpers generated for every attribute, plus the optimistic
//! lock column.

use std::borrow::Cow;
use std::fmt;

use regex::Regex;

use crate::error::Result;

/// One reserved-name rule.
#[derive(Clone)]
pub enum NameRule {
    /// Name starts with the given text
    Prefix(Cow<'static, str>),
    /// Name ends with the given text
    Suffix(Cow<'static, str>),
    /// Name equals the given text
    Exact(Cow<'static, str>),
    /// Name matches a regular expression
    Pattern(Regex),
}

impl NameRule {
    /// Check whether `name` falls under this rule.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameRule::Prefix(p) => name.starts_with(p.as_ref()),
            NameRule::Suffix(s) => name.ends_with(s.as_ref()),
            NameRule::Exact(e) => name == e.as_ref(),
            NameRule::Pattern(re) => re.is_match(name),
        }
    }
}

impl fmt::Debug for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRule::Prefix(p) => write!(f, "Prefix({p:?})"),
            NameRule::Suffix(s) => write!(f, "Suffix({s:?})"),
            NameRule::Exact(e) => write!(f, "Exact({e:?})"),
            NameRule::Pattern(re) => write!(f, "Pattern({:?})", re.as_str()),
        }
    }
}

impl fmt::Display for NameRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRule::Prefix(p) => write!(f, "starts with '{p}'"),
            NameRule::Suffix(s) => write!(f, "ends with '{s}'"),
            NameRule::Exact(e) => write!(f, "is '{e}'"),
            NameRule::Pattern(re) => write!(f, "matches /{}/", re.as_str()),
        }
    }
}

/// The set of reserved-name rules applied to delegation candidates.
#[derive(Debug, Clone)]
pub struct ReservedNames {
    rules: Vec<NameRule>,
}

impl ReservedNames {
    /// No rules at all; every candidate passes.
    pub const fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard rules.
    pub fn standard() -> Self {
        Self {
            rules: vec![
                NameRule::Prefix(Cow::Borrowed("_")),
                NameRule::Suffix(Cow::Borrowed("?")),
                NameRule::Prefix(Cow::Borrowed("reset")),
                NameRule::Suffix(Cow::Borrowed("_cast")),
                NameRule::Suffix(Cow::Borrowed("_was")),
                NameRule::Suffix(Cow::Borrowed("_change")),
                NameRule::Suffix(Cow::Borrowed("_change!")),
                NameRule::Exact(Cow::Borrowed("lock_version")),
                NameRule::Exact(Cow::Borrowed("lock_version=")),
            ],
        }
    }

    /// Add a rule.
    pub fn rule(mut self, rule: NameRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Reserve one exact accessor name.
    pub fn exact(self, name: impl Into<Cow<'static, str>>) -> Self {
        self.rule(NameRule::Exact(name.into()))
    }

    /// Reserve every name matching a regular expression.
    pub fn pattern(self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)?;
        Ok(self.rule(NameRule::Pattern(re)))
    }

    pub fn rules(&self) -> &[NameRule] {
        &self.rules
    }

    /// The first rule reserving `name`, if any.
    pub fn matching_rule(&self, name: &str) -> Option<&NameRule> {
        self.rules.iter().find(|r| r.matches(name))
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.matching_rule(name).is_some()
    }
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self::standard()
    }
}

/// Configuration for building one association's delegation namespace.
#[derive(Debug, Clone)]
pub struct DelegationConfig {
    /// Rules removing candidates from delegation.
    pub reserved: ReservedNames,

    /// Prefix of the effective reader name (`effective_` + association).
    pub effective_prefix: &'static str,
}

impl DelegationConfig {
    /// Create a config with the standard reserved names.
    pub fn new() -> Self {
        Self {
            reserved: ReservedNames::standard(),
            effective_prefix: "effective_",
        }
    }

    /// Replace the reserved-name rules.
    pub fn reserved(mut self, reserved: ReservedNames) -> Self {
        self.reserved = reserved;
        self
    }

    /// Use a different effective reader prefix.
    pub fn effective_prefix(mut self, prefix: &'static str) -> Self {
        self.effective_prefix = prefix;
        self
    }

    /// Effective reader name for an association.
    pub fn effective_reader(&self, association: &str) -> String {
        format!("{}{}", self.effective_prefix, association)
    }
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self::new()
    }
}
