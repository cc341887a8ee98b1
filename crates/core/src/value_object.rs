//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

const MAX_EMAIL_LEN: usize = 254;

/// A syntactically valid, normalized email address.
///
/// Normalization is `trim` + ASCII lowercase, so two addresses that differ only
/// in case or surrounding whitespace compare equal. Invite acceptance relies on
/// this to bind a token to "the same" address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl ValueObject for EmailAddress {}

impl EmailAddress {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let normalized = raw.trim().to_lowercase();

        if normalized.is_empty() {
            return Err(DomainError::validation("email cannot be empty"));
        }
        if normalized.len() > MAX_EMAIL_LEN {
            return Err(DomainError::validation("email is too long"));
        }
        if normalized.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(DomainError::validation("email cannot contain whitespace"));
        }

        let Some((local, domain)) = normalized.split_once('@') else {
            return Err(DomainError::validation("invalid email address"));
        };
        if local.is_empty() || domain.contains('@') {
            return Err(DomainError::validation("invalid email address"));
        }
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return Err(DomainError::validation("invalid email address"));
        }

        let labels: Vec<&str> = domain.split('.').collect();
        if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
            return Err(DomainError::validation("invalid email domain"));
        }
        let valid_label = |l: &&str| {
            !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        };
        if !labels.iter().all(valid_label) {
            return Err(DomainError::validation("invalid email domain"));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl core::fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for EmailAddress {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl PartialEq<str> for EmailAddress {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EmailAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let email = EmailAddress::parse("  Alice@Example.COM ").unwrap();
        assert_eq!(email, "alice@example.com");
        assert_eq!(email, EmailAddress::parse("alice@example.com").unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "",
            "   ",
            "plainaddress",
            "@example.com",
            "alice@",
            "alice@example",
            "alice@@example.com",
            "alice@exa mple.com",
            "alice@-example.com",
            "alice@example..com",
            ".alice@example.com",
            "al..ice@example.com",
        ] {
            assert!(EmailAddress::parse(raw).is_err(), "accepted {raw:?}");
        }
    }

    #[test]
    fn accepts_common_shapes() {
        for raw in ["a@x.com", "first.last+tag@sub.example.co.uk", "ops-team@acme-corp.io"] {
            assert!(EmailAddress::parse(raw).is_ok(), "rejected {raw:?}");
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: EmailAddress = serde_json::from_str("\"Bob@Example.com\"").unwrap();
        assert_eq!(ok, "bob@example.com");
        assert!(serde_json::from_str::<EmailAddress>("\"nope\"").is_err());
    }

    proptest! {
        #[test]
        fn parsed_addresses_are_already_normalized(
            local in "[a-zA-Z0-9]{1,12}",
            domain in "[a-zA-Z0-9]{1,12}",
            tld in "[a-zA-Z]{2,6}",
        ) {
            let raw = format!("{local}@{domain}.{tld}");
            let email = EmailAddress::parse(&raw).unwrap();
            prop_assert_eq!(email.as_str(), raw.to_lowercase());
            prop_assert_eq!(EmailAddress::parse(email.as_str()).unwrap(), email);
        }
    }
}
