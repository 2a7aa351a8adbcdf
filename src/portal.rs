use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{
    Client, ClientBuilder, RequestBuilder, Response,
    header::{COOKIE, LOCATION},
    multipart::Form,
    redirect::Policy,
};
use scraper::Html;

use crate::{
    error::{AuthError, FetchError},
    session::{Cookie, Credentials, SessionCookies},
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const POOL_MAX_IDLE: usize = 100;

/// Only the login page carries the password input.
const LOGIN_FORM_MARKER: &str = "name=\"pasw\"";
const LOGIN_PAGE_QUERY: &str = "page=login";

/// Pure function from a parsed page to its records.
pub type Extractor<R> = fn(&Html) -> Vec<R>;

/// How to talk to the portal. Implementations never touch the cache.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Absolute URL of a portal page, e.g. `page_url("vbpp")`.
    fn page_url(&self, page: &str) -> String;

    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionCookies, AuthError>;

    /// Full body of `url`, fetched with `cookies` attached.
    async fn fetch_page(&self, url: &str, cookies: &SessionCookies) -> Result<String, FetchError>;
}

/// Fetches `url` and runs `extractor` over the complete document.
///
/// Every call owns its own document and result buffer, so concurrent fetches
/// share nothing.
pub async fn fetch_authenticated<P, R>(
    portal: &P,
    url: &str,
    cookies: &SessionCookies,
    extractor: Extractor<R>,
) -> Result<Vec<R>, FetchError>
where
    P: Portal + ?Sized,
{
    let body = portal.fetch_page(url, cookies).await?;
    Ok(extract(&body, extractor))
}

fn extract<R>(body: &str, extractor: Extractor<R>) -> Vec<R> {
    let document = Html::parse_document(body);
    extractor(&document)
}

/// reqwest-backed portal client.
///
/// Redirects are not followed: the login response's cookies must be seen,
/// and a portal that bounces an expired session to its login page must show
/// up as an error rather than as an empty table.
pub struct PortalClient {
    client: Client,
    base_url: String,
}

impl PortalClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = ClientBuilder::new()
            .timeout(request_timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(POOL_MAX_IDLE)
            .redirect(Policy::none())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn harvest(response: &Response, cookies: &mut SessionCookies) {
        for cookie in response.cookies() {
            cookies.upsert(Cookie::from_response(&cookie));
        }
    }

    /// Sends one request of the login exchange, carrying and collecting cookies.
    async fn login_step(
        &self,
        request: RequestBuilder,
        cookies: &mut SessionCookies,
    ) -> Result<Response, AuthError> {
        let response = self
            .with_cookies(request, cookies)
            .send()
            .await
            .map_err(AuthError::Network)?;
        if !accepted(&response) {
            return Err(AuthError::Status(response.status()));
        }
        Self::harvest(&response, cookies);
        Ok(response)
    }

    fn with_cookies(&self, request: RequestBuilder, cookies: &SessionCookies) -> RequestBuilder {
        if cookies.is_empty() {
            request
        } else {
            request.header(COOKIE, cookies.header_value())
        }
    }
}

fn accepted(response: &Response) -> bool {
    let status = response.status();
    status.is_success() || status.is_redirection()
}

/// A redirect back to the login page, how the portal answers bad credentials.
fn bounced_to_login(response: &Response) -> bool {
    response.status().is_redirection()
        && response
            .headers()
            .get(LOCATION)
            .and_then(|location| location.to_str().ok())
            .is_some_and(|location| location.contains(LOGIN_PAGE_QUERY))
}

#[async_trait]
impl Portal for PortalClient {
    fn page_url(&self, page: &str) -> String {
        format!("{}?page={}", self.base_url, page)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<SessionCookies, AuthError> {
        let mut cookies = SessionCookies::default();

        // The portal opens its PHP session on the login page.
        self.login_step(self.client.get(self.page_url("login")), &mut cookies)
            .await?;

        let form = Form::new()
            .text("email", credentials.identifier.clone())
            .text("pasw", credentials.secret.clone())
            .text("juser", "MHS");
        let submitted = self
            .login_step(
                self.client.post(self.page_url("login&aksi=masuk")).multipart(form),
                &mut cookies,
            )
            .await?;
        if bounced_to_login(&submitted) {
            return Err(AuthError::Rejected);
        }

        // Home shows the login form again, or redirects to it, when the
        // credentials were wrong.
        let home = self
            .login_step(self.client.get(&self.base_url), &mut cookies)
            .await?;
        if bounced_to_login(&home) {
            return Err(AuthError::Rejected);
        }
        if home.status().is_success() {
            let body = home.text().await.map_err(AuthError::Network)?;
            if body.contains(LOGIN_FORM_MARKER) {
                return Err(AuthError::Rejected);
            }
        }

        if cookies.is_empty() {
            return Err(AuthError::Rejected);
        }
        debug!(
            "portal accepted {} with {} cookie(s)",
            credentials.identifier,
            cookies.0.len()
        );
        Ok(cookies)
    }

    async fn fetch_page(&self, url: &str, cookies: &SessionCookies) -> Result<String, FetchError> {
        let response = self.with_cookies(self.client.get(url), cookies).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        Ok(body)
    }
}
