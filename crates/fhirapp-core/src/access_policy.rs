//! Generated `AccessPolicy` granting public access to operations.

use serde_json::{Map, Value as JsonValue, json};

use crate::manifest::ResourceMap;

/// Resource type under which the policy is stored in the manifest.
pub const ACCESS_POLICY: &str = "AccessPolicy";

/// Errors raised when an existing policy document cannot be extended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum AccessPolicyError {
    /// The resource stored under the policy id is not a JSON object.
    #[error("AccessPolicy `{0}` is not an object")]
    NotAnObject(String),

    /// The policy's `link` field is present but not a list.
    #[error("AccessPolicy `{0}` has a `link` field that is not a list")]
    LinkNotList(String),
}

/// Name of the per-app policy: `{app_id}-endpoint`.
#[must_use]
pub fn endpoint_policy_id(app_id: &str) -> String {
    format!("{app_id}-endpoint")
}

/// Checks that the policy `policy_id`, if already present, can take links.
///
/// A missing policy, or one without a `link` field, passes.
///
/// # Errors
///
/// Same as [`ensure_public_access`].
pub fn check_public_access(
    resources: &ResourceMap,
    policy_id: &str,
) -> Result<(), AccessPolicyError> {
    let Some(policy) = resources
        .get(ACCESS_POLICY)
        .and_then(|policies| policies.get(policy_id))
    else {
        return Ok(());
    };

    match policy {
        JsonValue::Object(fields) => match fields.get("link") {
            None | Some(JsonValue::Array(_)) => Ok(()),
            Some(_) => Err(AccessPolicyError::LinkNotList(policy_id.to_string())),
        },
        _ => Err(AccessPolicyError::NotAnObject(policy_id.to_string())),
    }
}

/// Appends a link to `operation_id` on the policy `policy_id`.
///
/// The `AccessPolicy` category and an `allow` policy shell are created on
/// first use. Links are appended unconditionally, so registering the same
/// public operation twice yields two identical entries.
///
/// # Errors
///
/// Fails when a policy supplied by the caller under `policy_id` is not an
/// object, or carries a `link` field that is not a list.
pub fn ensure_public_access(
    resources: &mut ResourceMap,
    policy_id: &str,
    operation_id: &str,
) -> Result<(), AccessPolicyError> {
    let policy = resources
        .entry(ACCESS_POLICY.to_string())
        .or_default()
        .entry(policy_id.to_string())
        .or_insert_with(|| json!({ "link": [], "engine": "allow" }));

    let JsonValue::Object(policy) = policy else {
        return Err(AccessPolicyError::NotAnObject(policy_id.to_string()));
    };

    let links = policy
        .entry("link")
        .or_insert_with(|| JsonValue::Array(Vec::new()));
    let JsonValue::Array(links) = links else {
        return Err(AccessPolicyError::LinkNotList(policy_id.to_string()));
    };

    let mut link = Map::new();
    link.insert("id".to_string(), JsonValue::from(operation_id));
    link.insert("resourceType".to_string(), JsonValue::from("Operation"));
    links.push(JsonValue::Object(link));

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_first_public_operation_creates_policy_shell() {
        let mut resources = ResourceMap::new();

        ensure_public_access(&mut resources, "demo-endpoint", "GET.app.f.x").unwrap();

        assert_eq!(
            resources[ACCESS_POLICY]["demo-endpoint"],
            json!({
                "engine": "allow",
                "link": [{"id": "GET.app.f.x", "resourceType": "Operation"}],
            })
        );
    }

    #[test]
    fn test_duplicate_operation_appends_duplicate_link() {
        let mut resources = ResourceMap::new();

        ensure_public_access(&mut resources, "demo-endpoint", "GET.app.f.x").unwrap();
        ensure_public_access(&mut resources, "demo-endpoint", "GET.app.f.x").unwrap();

        let links = resources[ACCESS_POLICY]["demo-endpoint"]["link"]
            .as_array()
            .unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], links[1]);
    }

    #[test]
    fn test_existing_policies_are_kept() {
        let mut resources = ResourceMap::new();
        resources.insert(
            ACCESS_POLICY.to_string(),
            BTreeMap::from([(
                "admin".to_string(),
                json!({"engine": "json-schema", "schema": {}}),
            )]),
        );

        ensure_public_access(&mut resources, "demo-endpoint", "GET.app.f.x").unwrap();

        let policies = &resources[ACCESS_POLICY];
        assert_eq!(policies.len(), 2);
        assert_eq!(policies["admin"]["engine"], "json-schema");
    }

    #[test]
    fn test_user_policy_without_link_gets_one() {
        let mut resources = ResourceMap::new();
        resources.insert(
            ACCESS_POLICY.to_string(),
            BTreeMap::from([("demo-endpoint".to_string(), json!({"engine": "allow"}))]),
        );

        ensure_public_access(&mut resources, "demo-endpoint", "POST.app.g.").unwrap();

        assert_eq!(
            resources[ACCESS_POLICY]["demo-endpoint"]["link"],
            json!([{"id": "POST.app.g.", "resourceType": "Operation"}])
        );
    }

    #[test]
    fn test_malformed_user_policy_is_rejected_not_overwritten() {
        let mut resources = ResourceMap::new();
        resources.insert(
            ACCESS_POLICY.to_string(),
            BTreeMap::from([
                ("a-endpoint".to_string(), json!("oops")),
                ("b-endpoint".to_string(), json!({"link": {}})),
            ]),
        );

        assert_eq!(
            ensure_public_access(&mut resources, "a-endpoint", "x"),
            Err(AccessPolicyError::NotAnObject("a-endpoint".to_string()))
        );
        assert_eq!(
            ensure_public_access(&mut resources, "b-endpoint", "x"),
            Err(AccessPolicyError::LinkNotList("b-endpoint".to_string()))
        );
        assert_eq!(resources[ACCESS_POLICY]["a-endpoint"], json!("oops"));
    }

    #[test]
    fn test_check_public_access_matches_extend_outcome() {
        let mut resources = ResourceMap::new();
        assert_eq!(check_public_access(&resources, "demo-endpoint"), Ok(()));

        resources.insert(
            ACCESS_POLICY.to_string(),
            BTreeMap::from([
                ("ok-endpoint".to_string(), json!({"engine": "allow"})),
                ("a-endpoint".to_string(), json!(["oops"])),
                ("b-endpoint".to_string(), json!({"link": 1})),
            ]),
        );

        assert_eq!(check_public_access(&resources, "ok-endpoint"), Ok(()));
        assert_eq!(
            check_public_access(&resources, "a-endpoint"),
            Err(AccessPolicyError::NotAnObject("a-endpoint".to_string()))
        );
        assert_eq!(
            check_public_access(&resources, "b-endpoint"),
            Err(AccessPolicyError::LinkNotList("b-endpoint".to_string()))
        );
        assert!(resources[ACCESS_POLICY]["ok-endpoint"].get("link").is_none());
    }

    #[test]
    fn test_endpoint_policy_id_suffix() {
        assert_eq!(endpoint_policy_id("demo"), "demo-endpoint");
    }
}
