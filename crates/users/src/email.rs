//! Email address value object.

use serde::{Deserialize, Serialize};

use postboard_core::{DomainError, DomainResult};

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;
const MAX_LABEL_LEN: usize = 63;

/// A syntactically valid email address.
///
/// Validation is structural (one `@`, a dot-atom local part, a dotted domain
/// of letter/digit/hyphen labels with a non-numeric top-level label); there
/// is no deliverability check. Surrounding whitespace is dropped and the
/// domain is lowercased; the local part is kept exactly as submitted, so
/// `a@X.COM` and `a@x.com` are the same address but `A@x.com` is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let value = raw.trim();

        if value.is_empty() {
            return Err(DomainError::validation("email must not be empty"));
        }
        if value.len() > MAX_EMAIL_LEN {
            return Err(DomainError::validation("email is too long"));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::validation("email must contain an @-sign"));
        };
        if domain.contains('@') {
            return Err(DomainError::validation("email must contain a single @-sign"));
        }

        validate_local_part(local)?;
        validate_domain(domain)?;

        Ok(Self(format!("{local}@{}", domain.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_local_part(local: &str) -> DomainResult<()> {
    if local.is_empty() {
        return Err(DomainError::validation("email is missing the part before the @-sign"));
    }
    if local.len() > MAX_LOCAL_LEN {
        return Err(DomainError::validation("email local part is too long"));
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return Err(DomainError::validation("email local part has misplaced dots"));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~.".contains(c);
    if !local.chars().all(allowed) {
        return Err(DomainError::validation("email local part contains invalid characters"));
    }
    Ok(())
}

fn validate_domain(domain: &str) -> DomainResult<()> {
    if domain.is_empty() {
        return Err(DomainError::validation("email is missing the part after the @-sign"));
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return Err(DomainError::validation("email domain must contain a dot"));
    }

    for label in &labels {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(DomainError::validation("email domain has an empty or oversized label"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DomainError::validation("email domain label cannot start or end with a hyphen"));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation("email domain contains invalid characters"));
        }
    }

    let tld = labels[labels.len() - 1];
    if tld.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation("email domain must end in a named top-level domain"));
    }

    Ok(())
}

impl core::fmt::Display for Email {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Email {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_addresses() {
        for raw in ["a@x.com", "first.last+tag@mail.example.org", "o'neil@ex-ample.io"] {
            let email = Email::parse(raw).unwrap();
            assert_eq!(email.as_str(), raw);
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let email = Email::parse("  a@x.com \n").unwrap();
        assert_eq!(email.as_str(), "a@x.com");
    }

    #[test]
    fn domain_is_lowercased_local_part_is_not() {
        assert_eq!(Email::parse("a@X.COM").unwrap(), Email::parse("a@x.com").unwrap());
        assert_eq!(Email::parse("First.Last@Mail.Example.org").unwrap().as_str(), "First.Last@mail.example.org");
        assert_ne!(Email::parse("A@x.com").unwrap(), Email::parse("a@x.com").unwrap());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in [
            "",
            "plainaddress",
            "@x.com",
            "a@",
            "a@@x.com",
            "a@b@x.com",
            "a@localhost",
            "a@x..com",
            "a@-x.com",
            "a@x.123",
            ".a@x.com",
            "a..b@x.com",
            "a b@x.com",
        ] {
            assert!(
                matches!(Email::parse(raw), Err(DomainError::Validation(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn deserialization_validates() {
        let ok: Email = serde_json::from_str("\"a@x.com\"").unwrap();
        assert_eq!(ok.as_str(), "a@x.com");
        assert!(serde_json::from_str::<Email>("\"nope\"").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: any dot-atom local part at a lowercase dotted domain parses
            /// and round-trips unchanged.
            #[test]
            fn well_formed_addresses_round_trip(
                local in "[a-z0-9]{1,10}(\\.[a-z0-9]{1,10}){0,2}",
                host in "[a-z0-9]{1,10}",
                tld in "[a-z]{2,6}",
            ) {
                let raw = format!("{local}@{host}.{tld}");
                let email = Email::parse(&raw).unwrap();
                prop_assert_eq!(email.as_str(), raw.as_str());
            }

            /// Property: parsing is idempotent, so a stored address always
            /// matches itself when re-parsed from a lookup.
            #[test]
            fn parsing_is_idempotent(
                local in "[A-Za-z0-9]{1,10}",
                host in "[A-Za-z0-9]{1,10}",
                tld in "[A-Za-z]{2,6}",
            ) {
                let once = Email::parse(&format!("{local}@{host}.{tld}")).unwrap();
                let twice = Email::parse(once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }

            /// Property: a string without an @-sign is never an email.
            #[test]
            fn strings_without_at_sign_are_rejected(raw in "[^@]{0,40}") {
                prop_assert!(Email::parse(&raw).is_err());
            }
        }
    }
}
