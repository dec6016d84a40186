//! Query-string parameter lookup shared by the list/filter endpoints.

use http::Uri;

/// Look up a single query parameter by name, last occurrence wins.
#[must_use]
pub fn query_param(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    form_urlencoded::parse(query.as_bytes())
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_extract_named_param() {
        let uri: Uri = "/x?sop_id=SOP001&limit=10".parse().unwrap();
        assert_eq!(query_param(&uri, "sop_id"), Some("SOP001".to_owned()));
        assert_eq!(query_param(&uri, "limit"), Some("10".to_owned()));
    }

    #[test]
    fn test_should_return_none_for_absent_param() {
        let uri: Uri = "/x?a=1".parse().unwrap();
        assert_eq!(query_param(&uri, "b"), None);
    }

    #[test]
    fn test_should_return_none_without_query_string() {
        let uri: Uri = "/x".parse().unwrap();
        assert_eq!(query_param(&uri, "a"), None);
    }
}
