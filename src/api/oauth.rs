//! OAuth 2.0 for Google Drive API access.
//!
//! This module handles:
//! - Loading OAuth client credentials from `client_secret.json`
//! - Running the consent flow with a local loopback callback server
//! - Managing access and refresh tokens in `token.json`
//! - Refreshing the access token when it is about to expire

use crate::api::files::{SecretFile, TokenFile};
use crate::api::OAUTH_SCOPES;
use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Used when Google does not say how long a token lives.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

/// How many requests the callback server answers before giving up, e.g. favicon requests.
const MAX_CALLBACK_REQUESTS: usize = 10;

/// Holds the client credentials and the current token and hands out valid access tokens.
#[derive(Debug, Clone)]
pub(crate) struct TokenProvider {
    secret: SecretFile,
    token: TokenFile,
    token_path: PathBuf,
}

impl TokenProvider {
    /// Runs the consent flow: prints the authorization URL, waits for Google to redirect back to a
    /// local callback server, exchanges the code for tokens and saves them to `token_path`.
    pub(crate) async fn initialize(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let (secret_path, token_path) = (secret_path.into(), token_path.into());
        let secret = SecretFile::load(&secret_path).await?;

        let listener = TcpListener::bind(("127.0.0.1", 0))
            .await
            .context("Unable to start the local OAuth callback server")?;
        let port = listener
            .local_addr()
            .context("Unable to read the callback server address")?
            .port();
        let redirect = format!("http://localhost:{port}");

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let client = client(&secret, Some(&redirect))?;
        let mut request = client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent");
        for scope in OAUTH_SCOPES {
            request = request.add_scope(Scope::new(scope.to_string()));
        }
        let (auth_url, csrf) = request.url();

        info!("Open this URL in your browser to authorize access to Google Drive:\n\n{auth_url}\n");
        info!("Waiting for the authorization callback on {redirect}");

        let code = wait_for_code(listener, csrf.secret()).await?;
        let token = exchange_code(&secret, &redirect, code, pkce_verifier).await?;
        token.save(&token_path).await?;
        info!("Authorization successful, tokens saved to {}", token_path.display());

        Ok(Self {
            secret,
            token,
            token_path,
        })
    }

    /// Loads existing credentials and tokens. Never starts the consent flow.
    pub(crate) async fn load(
        secret_path: impl Into<PathBuf>,
        token_path: impl Into<PathBuf>,
    ) -> Res<Self> {
        let (secret_path, token_path) = (secret_path.into(), token_path.into());
        let secret = SecretFile::load(&secret_path).await?;
        let token = TokenFile::load(&token_path).await.with_context(|| {
            format!(
                "Unable to use the token file at {}. Run the 'auth' command first",
                token_path.display()
            )
        })?;
        Ok(Self {
            secret,
            token,
            token_path,
        })
    }

    /// The current access token, which may be expired.
    pub(crate) fn token(&self) -> &str {
        self.token.access_token()
    }

    /// The current access token, refreshed first if it expires soon.
    pub(crate) async fn token_with_refresh(&mut self) -> Res<&str> {
        if self.token.is_expired() {
            debug!("Access token is expired or about to expire, refreshing");
            self.refresh().await?;
        }
        Ok(self.token())
    }

    /// Exchanges the refresh token for a new access token and saves it.
    pub(crate) async fn refresh(&mut self) -> Res<()> {
        if self.token.refresh_token().is_empty() {
            bail!("The token file has no refresh token. Run the 'auth' command again");
        }
        let client = client(&self.secret, None)?;
        let response = client
            .exchange_refresh_token(&RefreshToken::new(self.token.refresh_token().to_string()))
            .request_async(&http_client()?)
            .await
            .context("Unable to refresh the OAuth access token")?;
        self.token.update(
            response.access_token().secret().to_string(),
            expiry(response.expires_in()),
            response.refresh_token().map(|rt| rt.secret().to_string()),
        );
        self.token.save(&self.token_path).await?;
        debug!("Refreshed access token saved to {}", self.token_path.display());
        Ok(())
    }
}

/// Builds the `oauth2` client for the given credentials.
fn client(
    secret: &SecretFile,
    redirect: Option<&str>,
) -> Res<BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>> {
    let mut client = BasicClient::new(ClientId::new(secret.client_id().to_string()))
        .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
        .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
        .set_token_uri(TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?);
    if let Some(redirect) = redirect {
        client = client
            .set_redirect_uri(RedirectUrl::new(redirect.to_string()).context("Invalid redirect")?);
    }
    Ok(client)
}

/// An HTTP client for token requests. Redirects are disabled to prevent SSRF.
fn http_client() -> Res<reqwest::Client> {
    reqwest::ClientBuilder::new()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .context("Unable to build the HTTP client")
}

async fn exchange_code(
    secret: &SecretFile,
    redirect: &str,
    code: String,
    pkce_verifier: PkceCodeVerifier,
) -> Res<TokenFile> {
    let response = client(secret, Some(redirect))?
        .exchange_code(AuthorizationCode::new(code))
        .set_pkce_verifier(pkce_verifier)
        .request_async(&http_client()?)
        .await
        .context("Unable to exchange the authorization code for tokens")?;

    let scopes = match response.scopes() {
        Some(granted) => granted.iter().map(|s| s.to_string()).collect(),
        None => OAUTH_SCOPES.iter().map(|s| s.to_string()).collect(),
    };
    let refresh_token = match response.refresh_token() {
        Some(rt) => rt.secret().to_string(),
        None => {
            warn!("Google did not return a refresh token, the login will not survive expiry");
            String::new()
        }
    };
    Ok(TokenFile::new(
        scopes,
        response.access_token().secret().to_string(),
        refresh_token,
        expiry(response.expires_in()),
    ))
}

fn expiry(expires_in: Option<Duration>) -> DateTime<Utc> {
    let lifetime = expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME);
    Utc::now() + chrono::Duration::from_std(lifetime).unwrap_or(chrono::Duration::hours(1))
}

/// Serves loopback requests until one carries the authorization code with the expected `state`.
async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Res<String> {
    let (tx, mut rx) = mpsc::channel::<Res<String>>(1);
    let expected_state = Arc::new(expected_state.to_string());
    let tx = Arc::new(Mutex::new(Some(tx)));

    for _ in 0..MAX_CALLBACK_REQUESTS {
        let (stream, _) = listener
            .accept()
            .await
            .context("The OAuth callback server failed to accept a connection")?;
        let io = TokioIo::new(stream);
        let expected_state = expected_state.clone();
        let tx = tx.clone();
        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let outcome = parse_callback(&req, &expected_state);
            let (status, body) = match &outcome {
                Some(Ok(_)) => (
                    StatusCode::OK,
                    "Authorization complete. You can close this window.",
                ),
                Some(Err(_)) => (StatusCode::BAD_REQUEST, "Authorization failed."),
                None => (StatusCode::NOT_FOUND, "Not found."),
            };
            if let Some(outcome) = outcome {
                let sender = tx.lock().ok().and_then(|mut guard| guard.take());
                if let Some(sender) = sender {
                    let _ = sender.try_send(outcome);
                }
            }
            let response = Response::builder()
                .status(status)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(body.to_string());
            async move { response }
        });
        if let Err(e) = http1::Builder::new()
            .keep_alive(false)
            .serve_connection(io, service)
            .await
        {
            debug!("OAuth callback connection error: {e}");
        }
        if let Ok(outcome) = rx.try_recv() {
            return outcome;
        }
    }
    bail!("No authorization code was received by the OAuth callback server")
}

/// Reads the authorization result from a callback request. `None` means the request was not an
/// OAuth callback at all.
fn parse_callback<B>(req: &Request<B>, expected_state: &str) -> Option<Res<String>> {
    let query = req.uri().query()?;
    let url = url::Url::parse(&format!("http://localhost/?{query}")).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "code" => code = Some(v.into_owned()),
            "state" => state = Some(v.into_owned()),
            "error" => error = Some(v.into_owned()),
            _ => {}
        }
    }
    if let Some(error) = error {
        return Some(Err(anyhow::anyhow!("Authorization was denied: {error}")));
    }
    let code = code?;
    if state.as_deref() != Some(expected_state) {
        return Some(Err(anyhow::anyhow!(
            "The OAuth state parameter did not match, refusing the callback"
        )));
    }
    Some(Ok(code))
}
