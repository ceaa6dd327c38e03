//! In-process URL shortener used as a load target in tests and demos.
use axum::{
    debug_handler,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use metrics::counter;
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::num::{NonZeroU32, NonZeroU64};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, RwLock,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Added to every response.
    pub delay: Duration,
    /// Every n-th redirect answers 500.
    pub fail_every: Option<NonZeroU64>,
    /// Redirects above this rate answer 503.
    pub max_redirect_rate: Option<NonZeroU32>,
}

impl MockConfig {
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fail_every(mut self, n: NonZeroU64) -> Self {
        self.fail_every = Some(n);
        self
    }

    pub fn max_redirect_rate(mut self, rate: NonZeroU32) -> Self {
        self.max_redirect_rate = Some(rate);
        self
    }
}

/// Shared state of a running mock; also exposes request counters to tests.
pub struct MockState {
    config: MockConfig,
    limiter: Option<DefaultDirectRateLimiter>,
    users: RwLock<HashMap<String, String>>,
    tokens: RwLock<HashSet<String>>,
    urls: RwLock<HashMap<String, String>>,
    requests: AtomicU64,
    redirects: AtomicU64,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        let limiter = config
            .max_redirect_rate
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));
        Self {
            config,
            limiter,
            users: RwLock::default(),
            tokens: RwLock::default(),
            urls: RwLock::default(),
            requests: AtomicU64::new(0),
            redirects: AtomicU64::new(0),
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn redirects(&self) -> u64 {
        self.redirects.load(Ordering::Relaxed)
    }

    pub fn users(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or_default()
    }

    async fn enter(&self) {
        counter!("mock-service.requests").increment(1);
        self.requests.fetch_add(1, Ordering::Relaxed);
        if !self.config.delay.is_zero() {
            tokio::time::sleep(self.config.delay).await;
        }
    }
}

type AppState = Arc<MockState>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/users/signup", post(sign_up))
        .route("/login", post(login))
        .route("/urls/shorten", post(shorten))
        .route("/r/:alias", get(redirect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    info!("Mock service listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

pub async fn run(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, state).await
}

/// A mock serving from its own thread and runtime.
pub struct MockHandle {
    pub addr: SocketAddr,
    pub state: AppState,
}

impl MockHandle {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Serve on an ephemeral localhost port.
pub fn spawn(config: MockConfig) -> anyhow::Result<MockHandle> {
    spawn_on("127.0.0.1:0".parse()?, config)
}

pub fn spawn_on(addr: SocketAddr, config: MockConfig) -> anyhow::Result<MockHandle> {
    let listener = std::net::TcpListener::bind(addr)?;
    listener.set_nonblocking(true)?;
    let addr = listener.local_addr()?;
    let state = Arc::new(MockState::new(config));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let served = state.clone();
    std::thread::Builder::new()
        .name("mock-service".into())
        .spawn(move || {
            let res = runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener)?;
                serve(listener, served).await
            });
            if let Err(err) = res {
                error!("Mock service stopped: {err}");
            }
        })?;

    Ok(MockHandle { addr, state })
}

#[debug_handler]
async fn health(State(state): State<AppState>) -> &'static str {
    state.enter().await;
    "ok"
}

#[derive(Deserialize)]
struct SignUp {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct Login {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct Token {
    access_token: String,
}

#[derive(Deserialize)]
struct Shorten {
    url: String,
}

async fn sign_up(State(state): State<AppState>, Json(body): Json<SignUp>) -> StatusCode {
    state.enter().await;
    let Ok(mut users) = state.users.write() else {
        return StatusCode::INTERNAL_SERVER_ERROR;
    };
    if users.contains_key(&body.email) {
        return StatusCode::CONFLICT;
    }
    users.insert(body.email, body.password);
    StatusCode::OK
}

async fn login(State(state): State<AppState>, Json(body): Json<Login>) -> Response {
    state.enter().await;
    let known = state
        .users
        .read()
        .map(|users| users.get(&body.username) == Some(&body.password));
    match known {
        Ok(true) => {
            let access_token = random_string(32);
            if let Ok(mut tokens) = state.tokens.write() {
                tokens.insert(access_token.clone());
            }
            Json(Token { access_token }).into_response()
        }
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

async fn shorten(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Shorten>,
) -> Response {
    state.enter().await;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let authorized = match (token, state.tokens.read()) {
        (Some(token), Ok(tokens)) => tokens.contains(token),
        _ => false,
    };
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let alias = random_string(8);
    let Ok(mut urls) = state.urls.write() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    urls.insert(alias.clone(), body.url);

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("http://{host}/r/{alias}").into_response()
}

async fn redirect(State(state): State<AppState>, Path(alias): Path<String>) -> Response {
    state.enter().await;
    let n = state.redirects.fetch_add(1, Ordering::Relaxed) + 1;

    if let Some(every) = state.config.fail_every {
        if n % every.get() == 0 {
            debug!("Failing redirect #{n}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            return StatusCode::SERVICE_UNAVAILABLE.into_response();
        }
    }

    let url = state
        .urls
        .read()
        .ok()
        .and_then(|urls| urls.get(&alias).cloned());
    match url {
        Some(url) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, url)]).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}
