//! Wildcard permission string matching.
//!
//! Permission strings are colon-separated `<action>:<scope>` pairs. A scope
//! of `*` matches anything; `SOP*` (or any other `<prefix>*`) matches by
//! prefix; anything else is an exact match. The reserved admin permission
//! `*` (no colon) matches every action.

/// Whether `granted` authorizes `required`.
///
/// `granted` is a permission string a principal holds (e.g. `submit:SOP*`);
/// `required` is the permission the caller is checking for (e.g.
/// `submit:SOP001`). Unknown scopes never match implicitly — only the
/// patterns above are recognized.
#[must_use]
pub fn permission_matches(granted: &str, required: &str) -> bool {
    if granted == "*" {
        return true;
    }

    let Some((granted_action, granted_scope)) = granted.split_once(':') else {
        return false;
    };
    let Some((required_action, required_scope)) = required.split_once(':') else {
        return false;
    };
    if granted_action != required_action {
        return false;
    }

    if granted_scope == "*" {
        return true;
    }
    if let Some(prefix) = granted_scope.strip_suffix('*') {
        return required_scope.starts_with(prefix);
    }
    granted_scope == required_scope
}

/// Whether any permission in `held` authorizes `required`.
#[must_use]
pub fn any_permission_matches(held: &[String], required: &str) -> bool {
    held.iter().any(|g| permission_matches(g, required))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_match_exact_permission() {
        assert!(permission_matches("submit:SOP001", "submit:SOP001"));
        assert!(!permission_matches("submit:SOP001", "submit:SOP002"));
    }

    #[test]
    fn test_should_match_action_wildcard() {
        assert!(permission_matches("submit:*", "submit:SOP001"));
        assert!(!permission_matches("submit:*", "view:SOP001"));
    }

    #[test]
    fn test_should_match_prefix_wildcard() {
        assert!(permission_matches("submit:SOP*", "submit:SOP001"));
        assert!(!permission_matches("submit:SOP*", "submit:TMP001"));
    }

    #[test]
    fn test_should_match_admin_wildcard() {
        assert!(permission_matches("*", "anything:goes"));
    }

    #[test]
    fn test_should_reject_mismatched_action() {
        assert!(!permission_matches("draft:create", "submit:SOP001"));
    }

    #[test]
    fn test_should_reject_malformed_permission_strings() {
        assert!(!permission_matches("not-a-permission", "submit:SOP001"));
        assert!(!permission_matches("submit:*", "not-a-permission"));
    }

    #[test]
    fn test_any_permission_matches_across_list() {
        let held = vec!["draft:create".to_owned(), "submit:SOP*".to_owned()];
        assert!(any_permission_matches(&held, "submit:SOP001"));
        assert!(!any_permission_matches(&held, "approve:SOP001"));
    }
}
