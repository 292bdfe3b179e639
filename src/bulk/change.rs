//! Proposed attribute changes and when two states count as the same.

use crate::bulk::proxy;
use crate::directory::{Attribute, AttributePatch};
use serde_json::Value;
use std::fmt;

/// Value of one attribute, as read or as proposed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Single(Option<String>),
    Multi(Vec<String>),
}

impl AttributeValue {
    pub fn single(value: impl Into<String>) -> Self {
        AttributeValue::Single(Some(value.into()))
    }

    pub fn to_json(&self) -> Value {
        match self {
            AttributeValue::Single(Some(v)) => Value::String(v.clone()),
            AttributeValue::Single(None) => Value::Null,
            AttributeValue::Multi(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Single(Some(v)) => f.write_str(v),
            AttributeValue::Single(None) => f.write_str("(empty)"),
            AttributeValue::Multi(values) if values.is_empty() => f.write_str("(empty)"),
            AttributeValue::Multi(values) => f.write_str(&values.join(", ")),
        }
    }
}

/// Whether `current` and `proposed` are the same state of `attribute`.
///
/// UPNs must match exactly, mail addresses case-insensitively, and proxy
/// address lists as case-insensitive unordered sets naming the same primary.
pub fn equivalent(
    attribute: Attribute,
    current: &AttributeValue,
    proposed: &AttributeValue,
) -> bool {
    use AttributeValue::{Multi, Single};

    match (attribute, current, proposed) {
        (Attribute::UserPrincipalName, Single(a), Single(b)) => a == b,
        (Attribute::Mail, Single(a), Single(b)) => match (a, b) {
            (Some(a), Some(b)) => a.to_lowercase() == b.to_lowercase(),
            (None, None) => true,
            _ => false,
        },
        (Attribute::ProxyAddresses, Multi(a), Multi(b)) => proxy::same_addresses(a, b),
        _ => current == proposed,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributeChange {
    pub attribute: Attribute,
    pub current: AttributeValue,
    pub proposed: AttributeValue,
}

impl AttributeChange {
    pub fn is_unchanged(&self) -> bool {
        equivalent(self.attribute, &self.current, &self.proposed)
    }
}

/// New attribute values for one user, derived from its current state and one row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposedChange {
    changes: Vec<AttributeChange>,
    notes: Vec<String>,
}

impl ProposedChange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        mut self,
        attribute: Attribute,
        current: AttributeValue,
        proposed: AttributeValue,
    ) -> Self {
        self.changes.push(AttributeChange {
            attribute,
            current,
            proposed,
        });
        self
    }

    /// Operator-facing remark shown alongside the diff
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn all(&self) -> &[AttributeChange] {
        &self.changes
    }

    /// Attributes whose proposed value differs from the current one
    pub fn pending(&self) -> impl Iterator<Item = &AttributeChange> {
        self.changes.iter().filter(|c| !c.is_unchanged())
    }

    pub fn is_noop(&self) -> bool {
        self.pending().next().is_none()
    }

    /// Patch carrying only the attributes that change
    pub fn to_patch(&self) -> AttributePatch {
        let mut patch = AttributePatch::new();
        for change in self.pending() {
            patch.set(change.attribute, change.proposed.to_json());
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn multi(values: &[&str]) -> AttributeValue {
        AttributeValue::Multi(values.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_upn_comparison_is_exact() {
        assert!(equivalent(
            Attribute::UserPrincipalName,
            &AttributeValue::single("a@contoso.com"),
            &AttributeValue::single("a@contoso.com"),
        ));
        assert!(!equivalent(
            Attribute::UserPrincipalName,
            &AttributeValue::single("A@contoso.com"),
            &AttributeValue::single("a@contoso.com"),
        ));
    }

    #[test]
    fn test_mail_comparison_ignores_case() {
        assert!(equivalent(
            Attribute::Mail,
            &AttributeValue::single("A@Contoso.com"),
            &AttributeValue::single("a@contoso.com"),
        ));
        assert!(!equivalent(
            Attribute::Mail,
            &AttributeValue::Single(None),
            &AttributeValue::single("a@contoso.com"),
        ));
    }

    #[test]
    fn test_proxy_comparison_ignores_order_and_case() {
        assert!(equivalent(
            Attribute::ProxyAddresses,
            &multi(&["smtp:b@contoso.com", "SMTP:a@contoso.com", "X500:/o=x"]),
            &multi(&["SMTP:A@contoso.com", "x500:/o=X", "smtp:B@CONTOSO.com"]),
        ));
        // primary and secondary swapped is a change
        assert!(!equivalent(
            Attribute::ProxyAddresses,
            &multi(&["SMTP:a@contoso.com", "smtp:b@contoso.com"]),
            &multi(&["smtp:a@contoso.com", "SMTP:b@contoso.com"]),
        ));
    }

    #[test]
    fn test_patch_contains_only_pending_attributes() {
        let change = ProposedChange::new()
            .set(
                Attribute::ProxyAddresses,
                multi(&["SMTP:a@contoso.com"]),
                multi(&["SMTP:A@CONTOSO.COM"]),
            )
            .set(
                Attribute::Mail,
                AttributeValue::single("old@contoso.com"),
                AttributeValue::single("a@contoso.com"),
            );

        assert!(!change.is_noop());
        assert_eq!(change.pending().count(), 1);
        assert_eq!(
            serde_json::to_value(change.to_patch()).unwrap(),
            json!({"mail": "a@contoso.com"})
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Single(None).to_string(), "(empty)");
        assert_eq!(multi(&["a", "b"]).to_string(), "a, b");
        assert_eq!(multi(&[]).to_string(), "(empty)");
    }
}
