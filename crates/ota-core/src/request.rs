//! Canonical request produced by runtime adapters.

use ota_schema::SelectorSet;

/// Query parameters and validators of one device request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CanonicalRequest {
    params: Vec<(String, String)>,
    if_none_match: Option<String>,
}

impl CanonicalRequest {
    /// Build from a raw query string and the `If-None-Match` header value.
    pub fn from_query(query: &str, if_none_match: Option<&str>) -> Self {
        Self {
            params: parse_query(query),
            if_none_match: if_none_match.map(str::to_string),
        }
    }

    /// Build from already-decoded parameters; they are normalized the same way.
    pub fn from_params<I, K, V>(params: I, if_none_match: Option<&str>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self {
            params: normalize(
                params
                    .into_iter()
                    .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
            ),
            if_none_match: if_none_match.map(str::to_string),
        }
    }

    /// Normalized parameters in query order.
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Raw `If-None-Match` value.
    pub fn if_none_match(&self) -> Option<&str> {
        self.if_none_match.as_deref()
    }

    /// Derive the selector set.
    pub fn selectors(&self) -> SelectorSet {
        SelectorSet::from_params(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Decode an `application/x-www-form-urlencoded` query string.
///
/// Keys and values are lower-cased, blank values dropped, and only the first
/// value of a repeated key kept.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    let query = query.strip_prefix('?').unwrap_or(query);
    normalize(url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())))
}

fn normalize(pairs: impl Iterator<Item = (String, String)>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (key, value) in pairs {
        if value.is_empty() {
            continue;
        }
        let key = key.to_ascii_lowercase();
        if out.iter().any(|(k, _)| *k == key) {
            continue;
        }
        out.push((key, value.to_ascii_lowercase()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_decodes() {
        let params = parse_query("cpuArch=ARMv8&os=Beta&payloadType=metadataOnly&attrGamer=prod%20");
        assert_eq!(
            params,
            vec![
                ("cpuarch".to_string(), "armv8".to_string()),
                ("os".to_string(), "beta".to_string()),
                ("payloadtype".to_string(), "metadataonly".to_string()),
                ("attrgamer".to_string(), "prod ".to_string()),
            ]
        );
    }

    #[test]
    fn drops_blank_values_and_repeats() {
        let params = parse_query("?cpuArch=&os=beta&OS=prod&flag");
        assert_eq!(params, vec![("os".to_string(), "beta".to_string())]);
    }

    #[test]
    fn selectors_from_request() {
        let req = CanonicalRequest::from_query("cpuArch=armv7&os=beta", Some("H1,H2"));
        let selectors = req.selectors();
        assert_eq!(selectors.cpu_arch.as_deref(), Some("armv7"));
        assert_eq!(selectors.env, "beta");
        assert_eq!(req.if_none_match(), Some("H1,H2"));
    }

    #[test]
    fn from_params_normalizes_like_query() {
        let a = CanonicalRequest::from_params([("cpuArch", "ARMV8"), ("os", "")], None);
        let b = CanonicalRequest::from_query("cpuarch=armv8&os=", None);
        assert_eq!(a, b);
    }
}
