//! reqwest-backed page fetcher.
//!
//! Turns a bare domain into a URL, refuses private/loopback targets on the
//! first request and on every redirect hop, follows a bounded number of
//! redirects, and renders the response body as text.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

use prospector_shared::{FetcherConfig, PageContent, ProspectorError, Result};

use crate::PageFetcher;
use crate::text::{html_to_text, truncate_text};

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("Prospector/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// HttpPageFetcher
// ---------------------------------------------------------------------------

/// Fetches company websites over HTTP(S).
pub struct HttpPageFetcher {
    config: FetcherConfig,
    client: Client,
    /// Allow loopback addresses (for integration tests with mock servers).
    /// Private and link-local ranges stay blocked.
    allow_loopback: bool,
}

impl HttpPageFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self> {
        let client = build_client(&config, false)?;

        Ok(Self {
            config,
            client,
            allow_loopback: false,
        })
    }

    /// Allow fetching loopback addresses (for integration tests).
    #[cfg(test)]
    pub fn allow_loopback(mut self) -> Self {
        self.allow_loopback = true;
        self.client = build_client(&self.config, true).expect("client builds");
        self
    }
}

/// Build the HTTP client. Every redirect hop is checked against the SSRF
/// rules, not just the first URL. The hop count matches `Policy::limited`.
fn build_client(config: &FetcherConfig, allow_loopback: bool) -> Result<Client> {
    let max_redirects = config.max_redirects;
    let redirect = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() > max_redirects {
            let msg = format!("too many redirects (max {max_redirects})");
            attempt.error(msg)
        } else if is_ssrf_target(attempt.url(), allow_loopback) {
            let msg = format!(
                "refusing redirect to private or local address {}",
                attempt.url()
            );
            attempt.error(msg)
        } else {
            attempt.follow()
        }
    });

    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(redirect)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .map_err(|e| ProspectorError::Network(format!("failed to build HTTP client: {e}")))
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    #[instrument(skip_all, fields(domain = %domain))]
    async fn fetch(&self, domain: &str) -> Result<Option<PageContent>> {
        let url = page_url(domain, &self.config.scheme)?;

        if is_ssrf_target(&url, self.allow_loopback) {
            return Err(ProspectorError::Fetch(format!(
                "{url}: refusing to fetch private or local address"
            )));
        }

        debug!(%url, "fetching page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ProspectorError::Fetch(format!("{url}: {}", error_chain(&e))))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProspectorError::Fetch(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| ProspectorError::Fetch(format!("{url}: body read failed: {e}")))?;

        let text = html_to_text(&body)?;
        if text.is_empty() {
            debug!(%final_url, body_len = body.len(), "page has no text");
            return Ok(None);
        }

        let text = truncate_text(&text, self.config.max_chars);
        info!(%final_url, chars = text.chars().count(), "page fetched");

        Ok(Some(PageContent::new(final_url, text)))
    }
}

/// `e` followed by its sources. reqwest keeps redirect-policy refusals in
/// the source chain, not in its own message.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// ---------------------------------------------------------------------------
// URL handling
// ---------------------------------------------------------------------------

/// Reduce user- or model-supplied input to a bare host/path: trims
/// whitespace, drops an `http://`/`https://` prefix and trailing slashes.
pub fn bare_domain(input: &str) -> String {
    let trimmed = input.trim();
    let lower = trimmed.to_ascii_lowercase();
    let without_scheme = if lower.starts_with("https://") {
        &trimmed["https://".len()..]
    } else if lower.starts_with("http://") {
        &trimmed["http://".len()..]
    } else {
        trimmed
    };
    without_scheme.trim_end_matches('/').to_string()
}

/// Build the URL to request for a bare domain.
pub fn page_url(domain: &str, scheme: &str) -> Result<Url> {
    let bare = bare_domain(domain);
    if bare.is_empty() {
        return Err(ProspectorError::validation("cannot fetch an empty domain"));
    }

    let url = Url::parse(&format!("{scheme}://{bare}"))
        .map_err(|e| ProspectorError::validation(format!("invalid domain '{domain}': {e}")))?;

    if url.host_str().is_none() {
        return Err(ProspectorError::validation(format!(
            "invalid domain '{domain}': no host"
        )));
    }

    Ok(url)
}

// ---------------------------------------------------------------------------
// SSRF protection
// ---------------------------------------------------------------------------

/// Check if a URL targets a potentially dangerous resource.
fn is_ssrf_target(url: &Url, allow_loopback: bool) -> bool {
    match url.scheme() {
        "http" | "https" => {}
        _ => return true,
    }

    let ip = match url.host() {
        Some(url::Host::Ipv4(v4)) => IpAddr::V4(v4),
        Some(url::Host::Ipv6(v6)) => IpAddr::V6(v6),
        Some(url::Host::Domain(host)) => {
            return (!allow_loopback && host == "localhost")
                || host.ends_with(".local")
                || host.ends_with(".internal");
        }
        None => return true,
    };

    if allow_loopback && ip.to_canonical().is_loopback() {
        return false;
    }
    is_private_ip(&ip)
}

/// Check if an IP is in a private/reserved range. IPv4-mapped IPv6
/// addresses are judged by their IPv4 form.
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_v4(&v4);
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 (unique local)
                || (first & 0xfe00) == 0xfc00
                // fe80::/10 (link-local)
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_broadcast()
        || v4.is_unspecified()
        // 100.64.0.0/10 (Carrier-grade NAT)
        || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xC0) == 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> FetcherConfig {
        FetcherConfig {
            scheme: "http".into(),
            timeout_secs: 5,
            max_redirects: 3,
            max_chars: 10_000,
        }
    }

    /// `http://127.0.0.1:1234` → `127.0.0.1:1234`, the form a record would carry.
    fn domain_of(server: &wiremock::MockServer) -> String {
        bare_domain(&server.uri())
    }

    #[test]
    fn test_bare_domain() {
        assert_eq!(bare_domain("acme.com"), "acme.com");
        assert_eq!(bare_domain(" https://acme.ai/ "), "acme.ai");
        assert_eq!(bare_domain("HTTP://Acme.io/about/"), "Acme.io/about");
    }

    #[test]
    fn test_page_url_prefixes_scheme() {
        let url = page_url("acme.com", "https").unwrap();
        assert_eq!(url.as_str(), "https://acme.com/");

        let url = page_url("https://acme.com/team", "https").unwrap();
        assert_eq!(url.as_str(), "https://acme.com/team");
    }

    #[test]
    fn test_page_url_rejects_empty() {
        assert!(page_url("  ", "https").is_err());
        assert!(page_url("https://", "https").is_err());
    }

    #[test]
    fn test_ssrf_protection_blocks_private_ip() {
        let url = Url::parse("http://192.168.1.1/admin").unwrap();
        assert!(is_ssrf_target(&url, false));

        let url = Url::parse("http://10.0.0.1/").unwrap();
        assert!(is_ssrf_target(&url, false));

        let url = Url::parse("http://127.0.0.1:8080/").unwrap();
        assert!(is_ssrf_target(&url, false));
    }

    #[test]
    fn test_ssrf_blocks_local_hostnames() {
        assert!(is_ssrf_target(&Url::parse("http://localhost:3000/").unwrap(), false));
        assert!(is_ssrf_target(&Url::parse("https://printer.local/").unwrap(), false));
        assert!(is_ssrf_target(&Url::parse("file:///etc/passwd").unwrap(), false));
    }

    #[test]
    fn test_ssrf_blocks_mapped_and_local_v6() {
        for url in [
            "http://[::ffff:127.0.0.1]/",
            "http://[::ffff:10.1.2.3]/",
            "http://[fd00::1]/",
            "http://[fc00::abcd]/",
            "http://[fe80::1]/",
            "http://[::1]/",
        ] {
            let parsed = page_url(url, "http").unwrap();
            assert!(is_ssrf_target(&parsed, false), "{url} should be blocked");
        }
        assert!(!is_ssrf_target(&Url::parse("http://[2606:4700::1111]/").unwrap(), false));
        assert!(!is_ssrf_target(&Url::parse("http://[::ffff:8.8.8.8]/").unwrap(), false));
    }

    #[test]
    fn test_loopback_allowance_keeps_private_blocked() {
        assert!(!is_ssrf_target(&Url::parse("http://127.0.0.1:8080/").unwrap(), true));
        assert!(is_ssrf_target(&Url::parse("http://192.168.0.1/").unwrap(), true));
        assert!(is_ssrf_target(&Url::parse("http://[fe80::1]/").unwrap(), true));
    }

    #[test]
    fn test_ssrf_protection_allows_public() {
        let url = Url::parse("https://acme.com/").unwrap();
        assert!(!is_ssrf_target(&url, false));
    }

    #[tokio::test]
    async fn test_fetch_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        let page = r#"<html><head><title>Acme</title></head><body>
            <main><h1>Acme Inc</h1><p>Voice agents for dental clinics.</p></main>
        </body></html>"#;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let content = fetcher
            .fetch(&domain_of(&server))
            .await
            .unwrap()
            .expect("page has text");

        assert!(content.source_url.starts_with(&server.uri()));
        assert!(content.text.contains("Voice agents for dental clinics"));
    }

    #[tokio::test]
    async fn test_fetch_follows_redirect() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(
                wiremock::ResponseTemplate::new(301).insert_header("Location", "/home"),
            )
            .mount(&server)
            .await;

        wiremock::Mock::given(wiremock::matchers::path("/home"))
            .respond_with(
                wiremock::ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Welcome home</p></body></html>"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let content = fetcher.fetch(&domain_of(&server)).await.unwrap().unwrap();

        assert!(content.source_url.ends_with("/home"));
        assert!(content.text.contains("Welcome home"));
    }

    #[tokio::test]
    async fn test_fetch_http_error_is_err() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let err = fetcher.fetch(&domain_of(&server)).await.unwrap_err();

        assert!(matches!(err, ProspectorError::Fetch(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_fetch_blank_page_is_none() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                "<html><body><div id=\"root\"></div><script>render()</script></body></html>",
            ))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let result = fetcher.fetch(&domain_of(&server)).await.unwrap();

        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_truncates_long_pages() {
        let server = wiremock::MockServer::start().await;

        let body = format!("<html><body><p>{}</p></body></html>", "word ".repeat(5_000));
        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let config = FetcherConfig {
            max_chars: 100,
            ..test_config()
        };
        let fetcher = HttpPageFetcher::new(config).unwrap().allow_loopback();
        let content = fetcher.fetch(&domain_of(&server)).await.unwrap().unwrap();

        assert!(content.text.contains("truncated"));
        assert!(content.text.chars().count() < 200);
    }

    #[tokio::test]
    async fn test_fetch_refuses_redirect_to_private_address() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(
                wiremock::ResponseTemplate::new(302)
                    .insert_header("Location", "http://192.168.0.1/admin"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let err = fetcher.fetch(&domain_of(&server)).await.unwrap_err();

        assert!(matches!(err, ProspectorError::Fetch(_)));
        assert!(err.to_string().contains("refusing redirect"), "{err}");
    }

    #[tokio::test]
    async fn test_fetch_refuses_redirect_to_mapped_v6_private() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(
                wiremock::ResponseTemplate::new(301)
                    .insert_header("Location", "http://[::ffff:10.0.0.1]/home"),
            )
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let err = fetcher.fetch(&domain_of(&server)).await.unwrap_err();

        assert!(err.to_string().contains("refusing redirect"), "{err}");
    }

    #[tokio::test]
    async fn test_fetch_stops_after_max_redirects() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(302).insert_header("Location", "/"))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap().allow_loopback();
        let err = fetcher.fetch(&domain_of(&server)).await.unwrap_err();

        assert!(err.to_string().contains("too many redirects"), "{err}");
    }

    #[tokio::test]
    async fn test_fetch_refuses_loopback_by_default() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<p>hi</p>"))
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(test_config()).unwrap();
        let err = fetcher.fetch(&domain_of(&server)).await.unwrap_err();

        assert!(err.to_string().contains("refusing"));
    }
}
