use crate::patterns::PatternLibrary;
use crate::types::{ProbeOutcome, ScanOptions};
use anyhow::{Context, Result};
use reqwest::redirect::Policy;
use reqwest::Client;
use ::time::{format_description::well_known, OffsetDateTime};

/// Status codes interesting enough to report. Anything else is a deliberate
/// no-result, never an error.
pub const INTERESTING_STATUS: [u16; 4] = [200, 301, 302, 403];

/// Build the HTTP client for one run: bounded request time, redirects
/// disabled, TLS verification controlled by the options. The client (and its
/// connection pool) is owned by the worker pool and dropped with the run.
pub fn build_client(options: &ScanOptions) -> Result<Client> {
    Client::builder()
        .timeout(options.timeout)
        .redirect(Policy::none())
        .danger_accept_invalid_certs(options.insecure_tls)
        .build()
        .context("failed to build HTTP client")
}

/// Join the base URL and a candidate path: trailing slash on the base and
/// leading slash on the path are both normalized away.
pub fn build_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Probe one candidate path with a single GET.
///
/// - Transport failures (timeout, refused, TLS, DNS) return `Err`; fatal only
///   to this candidate, never to the run.
/// - A response outside [`INTERESTING_STATUS`] returns `Ok(None)`.
/// - Otherwise returns a populated outcome; when a pattern library is given,
///   the body is decoded lossily and classified for sensitive content.
pub async fn probe(
    client: &Client,
    base_url: &str,
    path: &str,
    patterns: Option<&PatternLibrary>,
) -> Result<Option<ProbeOutcome>> {
    let url = build_url(base_url, path);
    let resp = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("request failed: {url}"))?;

    let status = resp.status().as_u16();
    if !INTERESTING_STATUS.contains(&status) {
        return Ok(None);
    }

    let body = resp
        .bytes()
        .await
        .with_context(|| format!("failed to read response body: {url}"))?;

    let sensitive = match patterns {
        Some(lib) => lib.classify(&String::from_utf8_lossy(&body)),
        None => Vec::new(),
    };

    Ok(Some(ProbeOutcome {
        url,
        status,
        size: body.len() as u64,
        path: path.to_string(),
        sensitive,
        timestamp: now_iso_like(),
    }))
}

fn now_iso_like() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_normalizes_slashes() {
        assert_eq!(
            build_url("http://target/", "/admin"),
            "http://target/admin"
        );
        assert_eq!(build_url("http://target", "admin"), "http://target/admin");
        assert_eq!(
            build_url("http://target///", "a/b.txt"),
            "http://target/a/b.txt"
        );
    }

    #[test]
    fn interesting_statuses_are_the_fixed_whitelist() {
        for s in [200, 301, 302, 403] {
            assert!(INTERESTING_STATUS.contains(&s));
        }
        for s in [204, 304, 404, 401, 500, 503] {
            assert!(!INTERESTING_STATUS.contains(&s));
        }
    }
}
