use crate::target::{RequestError, Target, TargetError};
use rand::distributions::{Alphanumeric, DistString};
use reqwest::{redirect::Policy, Client, Response};
use serde::{Deserialize, Serialize};
use stampede_core::RequestKind;
use tracing::{debug, info, instrument};

const PASSWORD: &str = "test";
const SHORTENED_URL: &str = "https://google.com";

/// A URL-shortener service: users sign up and sign in, and shortened aliases redirect.
#[derive(Debug, Clone)]
pub struct ShortenerTarget {
    host: String,
    client: Client,
}

/// State established once per worker: the alias its redirects hit.
#[derive(Debug, Clone)]
pub struct Session {
    pub alias: String,
}

#[derive(Serialize)]
struct SignUp<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignIn<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Shorten<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ShortenerTarget {
    pub fn new(host: impl Into<String>) -> Result<Self, TargetError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| TargetError::Client(e.into()))?;

        Ok(Self {
            host: host.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }

    async fn sign_up(&self, email: &str) -> reqwest::Result<Response> {
        self.client
            .post(self.url("/users/signup"))
            .json(&SignUp {
                email,
                password: PASSWORD,
            })
            .send()
            .await
    }

    async fn sign_in(&self, username: &str) -> reqwest::Result<Response> {
        self.client
            .post(self.url("/login"))
            .json(&SignIn {
                username,
                password: PASSWORD,
            })
            .send()
            .await
    }
}

impl Target for ShortenerTarget {
    type Fixture = Session;

    async fn probe(&self) -> Result<(), TargetError> {
        self.client
            .get(self.url("/"))
            .send()
            .await
            .map_err(|e| TargetError::Unreachable(e.into()))?;
        Ok(())
    }

    #[instrument(name = "setup", skip_all, fields(host = %self.host))]
    async fn setup(&self) -> Result<Session, TargetError> {
        let email = random_email();

        let res = self
            .sign_up(&email)
            .await
            .map_err(|e| setup_error("signup", e))?;
        expect_success("signup", &res)?;

        let res = self
            .sign_in(&email)
            .await
            .map_err(|e| setup_error("login", e))?;
        expect_success("login", &res)?;
        let TokenResponse { access_token } =
            res.json().await.map_err(|e| setup_error("login", e))?;

        let res = self
            .client
            .post(self.url("/urls/shorten"))
            .bearer_auth(&access_token)
            .json(&Shorten { url: SHORTENED_URL })
            .send()
            .await
            .map_err(|e| setup_error("shorten", e))?;
        expect_success("shorten", &res)?;
        let body = res.text().await.map_err(|e| setup_error("shorten", e))?;
        let alias = alias_of(&body).to_string();

        info!("Session established for {email}, alias {alias}");
        Ok(Session { alias })
    }

    async fn issue(&self, kind: RequestKind, session: &Session) -> Result<(), RequestError> {
        let res = match kind {
            RequestKind::Redirect => {
                self.client
                    .get(self.url(&format!("/r/{}", session.alias)))
                    .send()
                    .await
            }
            RequestKind::SignUp => self.sign_up(&random_email()).await,
            RequestKind::SignIn => self.sign_in(&random_email()).await,
        }
        .map_err(RequestError::transport)?;

        debug!("{kind} answered {}", res.status());
        RequestError::check_status(res.status().as_u16())
    }
}

fn random_email() -> String {
    let user = Alphanumeric.sample_string(&mut rand::thread_rng(), 16);
    format!("{user}@example.com")
}

/// The alias is the last path segment of the shortened URL.
fn alias_of(shortened: &str) -> &str {
    let shortened = shortened.trim().trim_matches('"');
    shortened.rsplit('/').next().unwrap_or(shortened)
}

fn setup_error(step: &'static str, err: reqwest::Error) -> TargetError {
    TargetError::Setup {
        step,
        source: err.into(),
    }
}

fn expect_success(step: &'static str, res: &Response) -> Result<(), TargetError> {
    if res.status().is_success() {
        Ok(())
    } else {
        Err(TargetError::UnexpectedStatus {
            step,
            status: res.status().as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_is_last_segment() {
        assert_eq!(alias_of("http://localhost:8080/r/abc123"), "abc123");
        assert_eq!(alias_of("\"http://localhost/r/xyz\"\n"), "xyz");
        assert_eq!(alias_of("plain"), "plain");
    }

    #[test]
    fn emails_are_unique() {
        let a = random_email();
        let b = random_email();
        assert_ne!(a, b);
        assert!(a.ends_with("@example.com"));
    }

    #[test]
    fn host_is_normalized() {
        let target = ShortenerTarget::new("http://localhost:8080/").unwrap();
        assert_eq!(target.host(), "http://localhost:8080");
        assert_eq!(target.url("/login"), "http://localhost:8080/login");
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    #[ntest::timeout(2_000)]
    async fn unreachable_host_is_not_ready() {
        // Port 9 (discard) is closed on test hosts.
        let target = ShortenerTarget::new("http://127.0.0.1:9").unwrap();
        assert!(matches!(
            target.probe().await,
            Err(TargetError::Unreachable(_))
        ));

        let session = Session { alias: "a".into() };
        let res = target.issue(RequestKind::Redirect, &session).await;
        assert!(matches!(res, Err(RequestError::Transport(_))));
    }
}
