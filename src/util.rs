use serde_json::{Map, Value};
use tracing::warn;

/// Parameters the paginator controls itself.
const RESERVED_PARAMS: &[&str] = &["page_size", "page_num", "offset"];

pub(crate) fn urljoin(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }
    let base = base.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Flattens search parameters into CMR query pairs.
///
/// Arrays become `key[]=v` repeated, objects become `key[sub]=v`
/// (as in `options[provider][ignore_case]=true`), nulls are dropped.
pub(crate) fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in params {
        if RESERVED_PARAMS.contains(&key.as_str()) {
            warn!(param = %key, "ignoring search parameter managed by the paginator");
            continue;
        }
        push_pairs(key.clone(), value, &mut out);
    }
    out
}

fn push_pairs(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push((key, s.clone())),
        Value::Bool(_) | Value::Number(_) => out.push((key, value.to_string())),
        Value::Array(items) => {
            let key = format!("{}[]", key);
            for item in items {
                push_pairs(key.clone(), item, out);
            }
        }
        Value::Object(map) => {
            for (sub, v) in map {
                push_pairs(format!("{}[{}]", key, sub), v, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(v: Value) -> Vec<(String, String)> {
        let mut got = query_pairs(v.as_object().unwrap());
        // stable: repeated keys keep their order
        got.sort_by(|a, b| a.0.cmp(&b.0));
        got
    }

    fn pair(k: &str, v: &str) -> (String, String) {
        (k.to_string(), v.to_string())
    }

    #[test]
    fn urljoin_handles_slashes() {
        assert_eq!(urljoin("http://h/", "/search"), "http://h/search");
        assert_eq!(urljoin("http://h", "search"), "http://h/search");
        assert_eq!(urljoin("http://h", "https://other/x"), "https://other/x");
    }

    #[test]
    fn scalars_become_single_pairs() {
        let got = pairs(json!({"provider": "ORNL_DAAC", "downloadable": true, "revision": 3}));
        assert_eq!(
            got,
            vec![
                pair("downloadable", "true"),
                pair("provider", "ORNL_DAAC"),
                pair("revision", "3"),
            ]
        );
    }

    #[test]
    fn arrays_and_objects_use_bracket_syntax() {
        let got = pairs(json!({
            "short_name": ["A", "B"],
            "options": {"provider": {"ignore_case": true}},
            "skip": null
        }));
        assert_eq!(
            got,
            vec![
                pair("options[provider][ignore_case]", "true"),
                pair("short_name[]", "A"),
                pair("short_name[]", "B"),
            ]
        );
    }

    #[test]
    fn paging_params_are_dropped() {
        let got = pairs(json!({"page_size": 10, "page_num": 2, "offset": 5, "provider": "P"}));
        assert_eq!(got, vec![pair("provider", "P")]);
    }
}
