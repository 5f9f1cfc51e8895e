//! Shared transport for the `wp-json` namespaces.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::WordPressError;

/// Request timeout for every call to the site.
const TIMEOUT_SECS: u64 = 30;

/// Error body WordPress returns for REST failures.
#[derive(Debug, Deserialize)]
struct WpErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Basic-auth JSON client rooted at one `wp-json/<namespace>/` URL.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    root: Url,
    username: String,
    password: SecretString,
}

impl RestClient {
    /// Create a client for `namespace` (e.g. `wp/v2`) on the site at `site_url`.
    ///
    /// # Errors
    ///
    /// Returns `WordPressError::Parse` if the namespace URL can't be built.
    /// Returns `WordPressError::Http` if the HTTP client fails to build.
    pub fn new(
        site_url: &Url,
        namespace: &str,
        username: &str,
        password: &SecretString,
    ) -> Result<Self, WordPressError> {
        let root = api_root(site_url, namespace)?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(TIMEOUT_SECS))
            .user_agent(concat!("deskops/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client,
                root,
                username: username.to_owned(),
                password: SecretString::from(password.expose_secret().to_owned()),
            }),
        })
    }

    /// The namespace root, e.g. `https://example.com/wp-json/wc/v3/`.
    #[must_use]
    pub fn root(&self) -> &Url {
        &self.inner.root
    }

    fn url(&self, path: &str) -> Result<Url, WordPressError> {
        self.inner
            .root
            .join(path.trim_start_matches('/'))
            .map_err(|e| WordPressError::Parse(format!("invalid endpoint {path}: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .basic_auth(&self.inner.username, Some(self.inner.password.expose_secret()))
    }

    /// Execute a GET request.
    pub(crate) async fn get<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, WordPressError> {
        let url = self.url(path)?;
        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Execute a GET request and read the `X-WP-TotalPages` header.
    ///
    /// A missing header counts as a single page.
    pub(crate) async fn get_paged<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<(T, u32), WordPressError> {
        let url = self.url(path)?;
        let response = self
            .request(reqwest::Method::GET, url)
            .query(query)
            .send()
            .await?;

        let total_pages = response
            .headers()
            .get("X-WP-TotalPages")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1);

        let body = handle_response(response).await?;
        Ok((body, total_pages))
    }

    /// Execute a POST request.
    pub(crate) async fn post<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WordPressError> {
        let url = self.url(path)?;
        let response = self
            .request(reqwest::Method::POST, url)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Execute a PUT request.
    pub(crate) async fn put<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WordPressError> {
        let url = self.url(path)?;
        let response = self
            .request(reqwest::Method::PUT, url)
            .json(body)
            .send()
            .await?;
        handle_response(response).await
    }

    /// Execute a DELETE request.
    pub(crate) async fn delete<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, WordPressError> {
        let url = self.url(path)?;
        let response = self
            .request(reqwest::Method::DELETE, url)
            .query(query)
            .send()
            .await?;
        handle_response(response).await
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("root", &self.inner.root.as_str())
            .field("username", &self.inner.username)
            .finish_non_exhaustive()
    }
}

/// Build `<site>/wp-json/<namespace>/`.
fn api_root(site_url: &Url, namespace: &str) -> Result<Url, WordPressError> {
    let mut site = site_url.clone();
    if !site.path().ends_with('/') {
        let path = format!("{}/", site.path());
        site.set_path(&path);
    }

    site.join(&format!("wp-json/{}/", namespace.trim_matches('/')))
        .map_err(|e| WordPressError::Parse(format!("invalid namespace {namespace}: {e}")))
}

/// Handle API response and parse JSON.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, WordPressError> {
    let status = response.status();

    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| WordPressError::Parse(format!("Failed to parse response: {e}")));
    }

    Err(parse_error(response).await)
}

/// Parse error response from the REST API.
async fn parse_error(response: reqwest::Response) -> WordPressError {
    let status = response.status().as_u16();

    if status == 401 || status == 403 {
        return WordPressError::Unauthorized;
    }

    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let body = serde_json::from_str::<WpErrorBody>(&text).ok();

    if status == 404 {
        let message = body
            .map(|b| b.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Resource not found".to_string());
        return WordPressError::NotFound(message);
    }

    match body {
        Some(body) => WordPressError::Api {
            status,
            code: body.code,
            message: body.message,
        },
        None => WordPressError::Api {
            status,
            code: String::new(),
            message: text,
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root() {
        let site = Url::parse("https://example.com/").unwrap();
        assert_eq!(
            api_root(&site, "wp/v2").unwrap().as_str(),
            "https://example.com/wp-json/wp/v2/"
        );
    }

    #[test]
    fn test_api_root_subdirectory_install() {
        let site = Url::parse("https://example.com/blog").unwrap();
        assert_eq!(
            api_root(&site, "/wc/v3/").unwrap().as_str(),
            "https://example.com/blog/wp-json/wc/v3/"
        );
    }

    #[test]
    fn test_debug_hides_password() {
        let site = Url::parse("https://example.com/").unwrap();
        let client = RestClient::new(
            &site,
            "wp/v2",
            "admin",
            &SecretString::from("hunter2 hunter2"),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }
}
