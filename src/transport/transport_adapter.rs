use crate::application_port::*;
use cookie::{Cookie, SameSite};
use std::time::Duration;
use tracing::warn;
use warp::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE, USER_AGENT};
use warp::http::{HeaderMap, HeaderName, HeaderValue};

pub const ACCESS_COOKIE_NAME: &str = "accessToken";
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";
pub const ROTATION_COOKIE_NAME: &str = "newAccessToken";

pub const REFRESH_HEADER: &str = "x-refresh-token";
pub const ACCESS_ECHO_HEADER: &str = "x-access-token";
pub const ROTATION_HEADER: &str = "new-access-token";
pub const CLIENT_TYPE_HEADER: &str = "x-client-type";

const BEARER_PREFIX: &str = "Bearer ";
const WEB_CLIENT_TYPE: &str = "web";
const NATIVE_AGENT_MARKER: &str = "okhttp";

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("cannot encode value for header {0}")]
    Unencodable(String),
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub secure_cookies: bool,
    /// Lifetime of both credential cookies. The access cookie must outlive its
    /// token so an expired token still reaches the guard and triggers a refresh.
    pub cookie_max_age: Duration,
}

pub struct TransportAdapter {
    cfg: TransportConfig,
}

impl TransportAdapter {
    pub fn new(cfg: TransportConfig) -> Self {
        TransportAdapter { cfg }
    }

    /// Explicit `x-client-type` wins; otherwise an okhttp user agent means native.
    pub fn profile_for(&self, headers: &HeaderMap) -> TransportProfile {
        if let Some(client_type) = header_str(headers, CLIENT_TYPE_HEADER) {
            return if client_type.trim().eq_ignore_ascii_case(WEB_CLIENT_TYPE) {
                TransportProfile::Cookie
            } else {
                TransportProfile::Header
            };
        }
        match headers.get(USER_AGENT).and_then(|v| v.to_str().ok()) {
            Some(agent) if agent.contains(NATIVE_AGENT_MARKER) => TransportProfile::Header,
            _ => TransportProfile::Cookie,
        }
    }

    /// Cookie values take precedence over header values for each token.
    ///
    /// The channel follows the access token. Without one it follows the refresh
    /// token, and only a request carrying neither falls back to `profile_for`.
    pub fn extract(&self, headers: &HeaderMap) -> ClientCredentials {
        let cookie_access = get_cookie(headers, ACCESS_COOKIE_NAME);
        let cookie_refresh = get_cookie(headers, REFRESH_COOKIE_NAME);
        let bearer = header_str(headers, AUTHORIZATION.as_str())
            .and_then(|v| v.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);
        let header_refresh = header_str(headers, REFRESH_HEADER)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let channel = match (&cookie_access, &bearer, &cookie_refresh, &header_refresh) {
            (Some(_), _, _, _) => TransportProfile::Cookie,
            (None, Some(_), _, _) => TransportProfile::Header,
            (None, None, Some(_), _) => TransportProfile::Cookie,
            (None, None, None, Some(_)) => TransportProfile::Header,
            (None, None, None, None) => self.profile_for(headers),
        };

        ClientCredentials {
            access_token: cookie_access.or(bearer).map(AccessToken),
            refresh_token: cookie_refresh.or(header_refresh).map(RefreshToken),
            channel,
        }
    }

    /// Write a fresh pair onto a response: cookies for the cookie channel only,
    /// echo headers and the rotation signal always.
    ///
    /// Fails if any value cannot be carried in a header; the caller must then
    /// fail the request rather than answer without credentials.
    pub fn emit(
        &self,
        headers: &mut HeaderMap,
        tokens: &TokenPair,
        channel: TransportProfile,
    ) -> Result<(), TransportError> {
        if channel == TransportProfile::Cookie {
            let access = self.credential_cookie(ACCESS_COOKIE_NAME, &tokens.access_token.0);
            let refresh = self.credential_cookie(REFRESH_COOKIE_NAME, &tokens.refresh_token.0);
            let signal = Cookie::build((ROTATION_COOKIE_NAME, "true"))
                .path("/")
                .same_site(SameSite::Strict)
                .secure(self.cfg.secure_cookies)
                .build();
            for cookie in [access, refresh, signal] {
                append(headers, SET_COOKIE, &cookie.to_string())?;
            }
        }

        append(
            headers,
            HeaderName::from_static(ACCESS_ECHO_HEADER),
            &tokens.access_token.0,
        )?;
        append(
            headers,
            HeaderName::from_static(REFRESH_HEADER),
            &tokens.refresh_token.0,
        )?;
        headers.insert(
            HeaderName::from_static(ROTATION_HEADER),
            HeaderValue::from_static("true"),
        );
        Ok(())
    }

    /// Expire both credential cookies.
    pub fn clear(
        &self,
        headers: &mut HeaderMap,
        channel: TransportProfile,
    ) -> Result<(), TransportError> {
        if channel != TransportProfile::Cookie {
            return Ok(());
        }
        for name in [ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME] {
            let cookie = Cookie::build((name, ""))
                .http_only(true)
                .same_site(SameSite::Strict)
                .secure(self.cfg.secure_cookies)
                .path("/")
                .max_age(time::Duration::ZERO)
                .build();
            append(headers, SET_COOKIE, &cookie.to_string())?;
        }
        Ok(())
    }

    fn credential_cookie(&self, name: &'static str, value: &str) -> Cookie<'static> {
        let max_age = time::Duration::seconds(self.cfg.cookie_max_age.as_secs() as i64);
        Cookie::build((name, value.to_owned()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(self.cfg.secure_cookies)
            .path("/")
            .max_age(max_age)
            .build()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn append(headers: &mut HeaderMap, name: HeaderName, value: &str) -> Result<(), TransportError> {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.append(name, value);
            Ok(())
        }
        Err(e) => {
            warn!(header = %name, error = %e, "unencodable header value");
            Err(TransportError::Unencodable(name.to_string()))
        }
    }
}

/// Value of cookie `name` from the request `Cookie` headers, if non-empty.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn adapter() -> TransportAdapter {
        TransportAdapter::new(TransportConfig {
            secure_cookies: true,
            cookie_max_age: Duration::from_secs(3 * 24 * 60 * 60),
        })
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    fn pair() -> TokenPair {
        TokenPair {
            access_token: AccessToken("acc.tok.en".to_string()),
            refresh_token: RefreshToken("refresh-value".to_string()),
            access_token_expires_at: Utc::now(),
            refresh_token_expires_at: Utc::now(),
        }
    }

    #[test]
    fn cookie_beats_header_for_both_tokens() {
        let h = headers(&[
            ("cookie", "theme=dark; accessToken=from-cookie; refreshToken=r-cookie"),
            ("authorization", "Bearer from-header"),
            ("x-refresh-token", "r-header"),
        ]);
        let creds = adapter().extract(&h);
        assert_eq!(creds.access_token, Some(AccessToken("from-cookie".to_string())));
        assert_eq!(creds.refresh_token, Some(RefreshToken("r-cookie".to_string())));
        assert_eq!(creds.channel, TransportProfile::Cookie);
    }

    #[test]
    fn bearer_and_refresh_header_select_header_channel() {
        let h = headers(&[
            ("authorization", "Bearer a1"),
            ("x-refresh-token", "r1"),
        ]);
        let creds = adapter().extract(&h);
        assert_eq!(creds.access_token, Some(AccessToken("a1".to_string())));
        assert_eq!(creds.refresh_token, Some(RefreshToken("r1".to_string())));
        assert_eq!(creds.channel, TransportProfile::Header);
    }

    #[test]
    fn empty_and_non_bearer_values_are_absent() {
        let h = headers(&[("cookie", "accessToken="), ("authorization", "Basic abc")]);
        let creds = adapter().extract(&h);
        assert!(creds.access_token.is_none());
        assert!(creds.refresh_token.is_none());
    }

    #[test]
    fn profile_prefers_explicit_client_type() {
        let a = adapter();
        assert_eq!(
            a.profile_for(&headers(&[("x-client-type", "mobile"), ("user-agent", "Mozilla/5.0")])),
            TransportProfile::Header
        );
        assert_eq!(
            a.profile_for(&headers(&[("x-client-type", "web"), ("user-agent", "okhttp/4.12")])),
            TransportProfile::Cookie
        );
        assert_eq!(
            a.profile_for(&headers(&[("user-agent", "okhttp/4.12.0")])),
            TransportProfile::Header
        );
        assert_eq!(a.profile_for(&HeaderMap::new()), TransportProfile::Cookie);
    }

    #[test]
    fn cookie_channel_gets_strict_http_only_cookies_and_headers() {
        let mut h = HeaderMap::new();
        adapter().emit(&mut h, &pair(), TransportProfile::Cookie).unwrap();

        let cookies: Vec<&str> = h
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 3);
        let access = cookies.iter().find(|c| c.starts_with("accessToken=")).unwrap();
        assert!(access.contains("HttpOnly"));
        assert!(access.contains("SameSite=Strict"));
        assert!(access.contains("Secure"));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=refresh-value")));
        assert!(cookies.iter().any(|c| c.starts_with("newAccessToken=true")));

        assert_eq!(h.get("x-access-token").unwrap(), "acc.tok.en");
        assert_eq!(h.get("x-refresh-token").unwrap(), "refresh-value");
        assert_eq!(h.get("new-access-token").unwrap(), "true");
    }

    #[test]
    fn header_channel_never_gets_cookies() {
        let mut h = HeaderMap::new();
        adapter().emit(&mut h, &pair(), TransportProfile::Header).unwrap();

        assert!(h.get(SET_COOKIE).is_none());
        assert_eq!(h.get("x-access-token").unwrap(), "acc.tok.en");
        assert_eq!(h.get("new-access-token").unwrap(), "true");
    }

    #[test]
    fn clear_expires_both_cookies() {
        let mut h = HeaderMap::new();
        adapter().clear(&mut h, TransportProfile::Cookie).unwrap();
        let cookies: Vec<&str> = h
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[test]
    fn refresh_only_request_follows_the_refresh_token_channel() {
        let a = adapter();
        let h = headers(&[("user-agent", "curl/8.0"), ("x-refresh-token", "r1")]);
        assert_eq!(a.extract(&h).channel, TransportProfile::Header);

        let h = headers(&[
            ("x-client-type", "android"),
            ("cookie", "refreshToken=r-cookie"),
        ]);
        assert_eq!(a.extract(&h).channel, TransportProfile::Cookie);

        let h = headers(&[("user-agent", "okhttp/4.12.0")]);
        assert_eq!(a.extract(&h).channel, TransportProfile::Header);
    }

    #[test]
    fn unencodable_token_fails_emission() {
        let mut tokens = pair();
        tokens.access_token = AccessToken("line\nbreak".to_string());

        let mut h = HeaderMap::new();
        let result = adapter().emit(&mut h, &tokens, TransportProfile::Header);
        assert!(matches!(result, Err(TransportError::Unencodable(_))));
    }
}
