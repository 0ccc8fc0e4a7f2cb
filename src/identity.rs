//! Network-identity safety gate.
//!
//! One outbound IP-geolocation lookup decides whether hardening may begin at
//! all. No response means no session: hardening must not start without knowing
//! the network context.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{GhostError, Result};

/// Geolocation lookup result. `ip-api.com`-style bodies name the address
/// field `query`; others use `ip`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkIdentity {
    #[serde(alias = "query")]
    pub ip: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub timezone: Option<String>,
}

/// Outcome of the safety gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SafetyDecision {
    /// Safe network context; carries the detected timezone for the sync step
    /// (`None` when the lookup reported no usable timezone).
    Proceed { timezone: Option<String> },
    /// Denylisted context, user explicitly confirmed anyway. Carries no
    /// timezone: overriding the gate forfeits timezone spoofing.
    ProceedOverridden,
    /// Denylisted context, override refused. No mutation may happen.
    Abort,
}

/// Query the identity service. Any transport, status, or parse failure is
/// `IdentityUnavailable`, fatal before the gate; nothing has been mutated yet.
pub async fn fetch(url: &str) -> Result<NetworkIdentity> {
    let client = reqwest::Client::builder()
        .user_agent("ghostmode/0.1")
        .timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| GhostError::IdentityUnavailable(e.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| GhostError::IdentityUnavailable(format!("query {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(GhostError::IdentityUnavailable(format!(
            "{url} returned {}",
            response.status()
        )));
    }

    response
        .json::<NetworkIdentity>()
        .await
        .map_err(|e| GhostError::IdentityUnavailable(format!("unusable body from {url}: {e}")))
}

/// Classify an identity against the denylisted country. `confirm` is only
/// invoked on a denylist match; anything but an explicit affirmative refuses.
pub fn gate(
    identity: &NetworkIdentity,
    deny_country: &str,
    confirm: impl FnOnce(&str) -> bool,
) -> SafetyDecision {
    if identity.country.eq_ignore_ascii_case(deny_country) {
        if confirm(&identity.country) {
            return SafetyDecision::ProceedOverridden;
        }
        return SafetyDecision::Abort;
    }

    let timezone = identity
        .timezone
        .as_deref()
        .map(str::trim)
        .filter(|tz| !tz.is_empty())
        .map(str::to_string);
    SafetyDecision::Proceed { timezone }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(country: &str, timezone: Option<&str>) -> NetworkIdentity {
        NetworkIdentity {
            ip: "1.2.3.4".into(),
            country: country.into(),
            timezone: timezone.map(str::to_string),
        }
    }

    #[test]
    fn test_safe_country_proceeds_with_timezone() {
        let decision = gate(&identity("Germany", Some("Europe/Berlin")), "United States", |_| {
            panic!("confirm must not be called for a safe country")
        });
        assert_eq!(
            decision,
            SafetyDecision::Proceed {
                timezone: Some("Europe/Berlin".into())
            }
        );
    }

    #[test]
    fn test_empty_timezone_becomes_none() {
        let decision = gate(&identity("Germany", Some("")), "United States", |_| false);
        assert_eq!(decision, SafetyDecision::Proceed { timezone: None });

        let decision = gate(&identity("Germany", None), "United States", |_| false);
        assert_eq!(decision, SafetyDecision::Proceed { timezone: None });
    }

    #[test]
    fn test_denylisted_country_refused_aborts() {
        let decision = gate(
            &identity("United States", Some("America/New_York")),
            "United States",
            |_| false,
        );
        assert_eq!(decision, SafetyDecision::Abort);
    }

    #[test]
    fn test_denylisted_country_confirmed_overrides_without_timezone() {
        let decision = gate(
            &identity("United States", Some("America/New_York")),
            "United States",
            |_| true,
        );
        assert_eq!(decision, SafetyDecision::ProceedOverridden);
    }

    #[test]
    fn test_denylist_match_is_case_insensitive() {
        let decision = gate(&identity("UNITED STATES", None), "united states", |_| false);
        assert_eq!(decision, SafetyDecision::Abort);
    }

    #[test]
    fn test_parses_ip_api_style_body() {
        let body = r#"{"query":"1.2.3.4","country":"Germany","timezone":"Europe/Berlin"}"#;
        let id: NetworkIdentity = serde_json::from_str(body).unwrap();
        assert_eq!(id.ip, "1.2.3.4");
        assert_eq!(id.country, "Germany");
        assert_eq!(id.timezone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_parses_body_without_timezone() {
        let body = r#"{"ip":"5.6.7.8","country":"France"}"#;
        let id: NetworkIdentity = serde_json::from_str(body).unwrap();
        assert_eq!(id.ip, "5.6.7.8");
        assert_eq!(id.timezone, None);
    }

    /// Serve one canned HTTP response on a local port, then hang up.
    fn serve_once(response: &'static str) -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                use std::io::{Read, Write};
                let mut buf = [0u8; 1024];
                let _ = stream.read(&mut buf);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{addr}/json")
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_identity_unavailable() {
        // Port 1 is never listening; the query itself fails.
        let err = fetch("http://127.0.0.1:1/json").await.unwrap_err();
        assert!(matches!(err, GhostError::IdentityUnavailable(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_error_status_is_identity_unavailable() {
        let url = serve_once("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n");
        let err = fetch(&url).await.unwrap_err();
        assert!(matches!(err, GhostError::IdentityUnavailable(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_unusable_body_is_identity_unavailable() {
        let url = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 8\r\n\r\nnot json");
        let err = fetch(&url).await.unwrap_err();
        assert!(matches!(err, GhostError::IdentityUnavailable(_)));
    }
}
