use anyhow::anyhow;
use reqwest::StatusCode;
use serde_json::Value;

#[derive(Debug, serde::Deserialize)]
pub(crate) struct CmrErrorResponse {
    // Usually plain strings; some validation failures nest {"path":..,"errors":[..]}.
    #[serde(default)]
    pub(crate) errors: Vec<Value>,
}

impl CmrErrorResponse {
    fn messages(&self) -> String {
        self.errors
            .iter()
            .map(|e| match e {
                Value::String(s) => s.clone(),
                Value::Object(map) => {
                    let path = map
                        .get("path")
                        .map(|p| p.to_string())
                        .unwrap_or_default();
                    let inner = map.get("errors").map(|v| v.to_string()).unwrap_or_default();
                    format!("{} {}", path, inner).trim().to_string()
                }
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

pub(crate) fn format_cmr_error(
    status: StatusCode,
    url: &str,
    e: &CmrErrorResponse,
) -> anyhow::Error {
    let messages = e.messages();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return anyhow!(
            "CMR authentication/authorization failed (HTTP {}).\n- Check that the token is valid for this environment (token files are suffixed per env, e.g. ~/.cmr_token.uat)\n- Ensure the token is not expired\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            messages,
            url
        );
    }

    if status == StatusCode::NOT_FOUND {
        return anyhow!(
            "CMR endpoint not found (HTTP 404).\n- Check the `env` setting or the `cmr.url` override\n\nServer message: {}\nrequest: {}",
            messages,
            url
        );
    }

    anyhow!(
        "CMR request failed: HTTP {} for url ({})\n{}",
        status.as_u16(),
        url,
        messages
    )
}
