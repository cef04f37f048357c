#![allow(dead_code)]

use chrono::Utc;
use cookie::Cookie;
use std::convert::Infallible;
use std::sync::Arc;
use tallyguard::api;
use tallyguard::infra_memory::ManualClock;
use tallyguard::server::Server;
use tallyguard::settings::{Auth, Http, Log, Settings, Store, Transport};
use warp::Filter;
use warp::http::Response;
use warp::hyper::body::Bytes;

pub const ACCESS_TTL_MINUTES: u64 = 60;
pub const REFRESH_TTL_DAYS: u64 = 7;

pub fn settings() -> Settings {
    Settings {
        auth: Auth {
            identity_backend: "fake".to_string(),
            access_ttl_minutes: ACCESS_TTL_MINUTES,
            refresh_ttl_days: REFRESH_TTL_DAYS,
            issuer: "tallyguard.test".to_string(),
            audience: "tallyguard-client".to_string(),
            store_timeout_ms: 1000,
        },
        store: Store {
            backend: "memory".to_string(),
            redis_dsn: None,
            mysql_dsn: None,
            key_prefix: "tallyguard:test".to_string(),
            purge_interval_secs: 3600,
        },
        transport: Transport {
            secure_cookies: true,
        },
        http: Http {
            address: "127.0.0.1:0".to_string(),
            cert_path: None,
            key_path: None,
        },
        log: Log {
            filter: "warn".to_string(),
        },
    }
}

pub struct TestApp {
    pub clock: Arc<ManualClock>,
    pub server: Arc<Server>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let server = Server::with_clock(&settings(), clock.clone())
            .await
            .expect("server should start on the memory store");
        TestApp {
            clock,
            server: Arc::new(server),
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(chrono::Duration::minutes(minutes));
    }

    /// Log in as a native client and return the issued (access, refresh) pair.
    pub async fn login_native(&self, username: &str) -> (String, String) {
        let res = warp::test::request()
            .method("POST")
            .path("/api/v1/login")
            .header("x-client-type", "android")
            .json(&serde_json::json!({ "username": username, "password": "pw" }))
            .reply(&app_routes(self.server.clone()))
            .await;
        assert_eq!(res.status(), 200, "login failed: {:?}", res.body());
        (
            header(&res, "x-access-token").expect("access token header"),
            header(&res, "x-refresh-token").expect("refresh token header"),
        )
    }
}

pub fn app_routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server))
        .recover(api::v1::recover_error)
}

pub fn header(res: &Response<Bytes>, name: &str) -> Option<String> {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

pub fn set_cookies(res: &Response<Bytes>) -> Vec<Cookie<'static>> {
    res.headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_owned()).ok())
        .collect()
}

pub fn cookie_value(res: &Response<Bytes>, name: &str) -> Option<String> {
    set_cookies(res)
        .into_iter()
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
}

pub fn body_json(res: &Response<Bytes>) -> serde_json::Value {
    serde_json::from_slice(res.body()).expect("response body should be json")
}

pub fn error_code(res: &Response<Bytes>) -> String {
    body_json(res)["error"]["code"]
        .as_str()
        .unwrap_or_default()
        .to_owned()
}
