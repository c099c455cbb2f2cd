use super::MembershipOracle;
use crate::config::CollectionSpec;
use crate::core::{Document, Identity};
use serde_json::Value as JsonValue;

/// Why a record is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Owner field not present at all
    OwnerAbsent,
    /// Owner field present but null, blank, or not a string
    OwnerAmbiguous,
    /// Owner resolves to a valid identity
    OwnerResolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Not subject to ownership rules
    Exempt,
    Valid(Retention),
    /// Owner is set and does not resolve
    Actionable,
}

impl Classification {
    pub fn is_actionable(&self) -> bool {
        matches!(self, Classification::Actionable)
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Classification::Valid(Retention::OwnerAmbiguous))
    }
}

/// Orphan decision for one record. First matching rule wins.
pub fn classify(
    document: &Document,
    spec: &CollectionSpec,
    oracle: &MembershipOracle,
) -> Classification {
    if spec
        .exemption
        .as_ref()
        .is_some_and(|rule| rule.matches(document))
    {
        return Classification::Exempt;
    }

    match document.field(&spec.owner_field) {
        None => Classification::Valid(Retention::OwnerAbsent),
        Some(JsonValue::String(owner)) if !owner.trim().is_empty() => {
            if oracle.is_valid(owner) {
                Classification::Valid(Retention::OwnerResolved)
            } else {
                Classification::Actionable
            }
        }
        Some(_) => Classification::Valid(Retention::OwnerAmbiguous),
    }
}

/// Migration filter: exact, case-sensitive match on the owner field
pub fn owner_matches(document: &Document, field: &str, source: &Identity) -> bool {
    matches!(document.field(field), Some(JsonValue::String(owner)) if owner == source.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(fields: JsonValue) -> Document {
        Document::new("notes", "d", fields.as_object().cloned().unwrap_or_default())
    }

    fn oracle() -> MembershipOracle {
        MembershipOracle::from_identities("users", ["u1", "u2"])
    }

    fn notes() -> CollectionSpec {
        CollectionSpec::new("notes", "userId")
    }

    #[test]
    fn test_absent_owner_is_valid() {
        let c = classify(&doc(json!({"title": "x"})), &notes(), &oracle());
        assert_eq!(c, Classification::Valid(Retention::OwnerAbsent));

        let empty_oracle = MembershipOracle::from_identities("users", Vec::<String>::new());
        let c = classify(&doc(json!({})), &notes(), &empty_oracle);
        assert_eq!(c, Classification::Valid(Retention::OwnerAbsent));
    }

    #[test]
    fn test_blank_null_and_wrong_type_are_ambiguous() {
        let empty_oracle = MembershipOracle::from_identities("users", Vec::<String>::new());
        for value in [json!(null), json!(""), json!("   "), json!(42), json!(["u1"]), json!({"id": "u1"})] {
            let d = doc(json!({ "userId": value }));
            assert!(classify(&d, &notes(), &oracle()).is_ambiguous());
            assert!(classify(&d, &notes(), &empty_oracle).is_ambiguous());
        }
    }

    #[test]
    fn test_resolution() {
        assert_eq!(
            classify(&doc(json!({"userId": "u1"})), &notes(), &oracle()),
            Classification::Valid(Retention::OwnerResolved)
        );
        assert!(classify(&doc(json!({"userId": "ghost"})), &notes(), &oracle()).is_actionable());
        // no trimming before lookup
        assert!(classify(&doc(json!({"userId": " u1"})), &notes(), &oracle()).is_actionable());
    }

    #[test]
    fn test_exemption_wins() {
        let spec = CollectionSpec::new("paletteModels", "userId").exempt_when("isPredefined", json!(true));
        let d = doc(json!({"userId": "ghost", "isPredefined": true}));
        assert_eq!(classify(&d, &spec, &oracle()), Classification::Exempt);

        let d = doc(json!({"userId": "ghost", "isPredefined": false}));
        assert!(classify(&d, &spec, &oracle()).is_actionable());
    }

    #[test]
    fn test_owner_matches_is_exact() {
        let source = Identity::from("u1");
        assert!(owner_matches(&doc(json!({"userId": "u1"})), "userId", &source));
        assert!(!owner_matches(&doc(json!({"userId": "U1"})), "userId", &source));
        assert!(!owner_matches(&doc(json!({"userId": "u10"})), "userId", &source));
        assert!(!owner_matches(&doc(json!({"userId": null})), "userId", &source));
        assert!(!owner_matches(&doc(json!({})), "userId", &source));
    }
}
