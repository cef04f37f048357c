mod common;

use common::*;

#[tokio::test]
async fn logout_spends_the_refresh_token_and_is_idempotent() {
    let app = TestApp::spawn().await;
    let api = app_routes(app.server.clone());
    let (_a1, r1) = app.login_native("leaver").await;

    let logout = || {
        warp::test::request()
            .method("POST")
            .path("/api/v1/logout")
            .header("x-client-type", "android")
            .header("x-refresh-token", &r1)
            .reply(&api)
    };

    let res = logout().await;
    assert_eq!(res.status(), 200);
    assert_eq!(body_json(&res)["data"]["revoked"], true);

    let res = logout().await;
    assert_eq!(res.status(), 200);
    assert_eq!(body_json(&res)["data"]["revoked"], false);

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .header("x-refresh-token", &r1)
        .reply(&api)
        .await;
    assert_eq!(error_code(&res), "REFRESH_EXPIRED_OR_UNKNOWN");
}

#[tokio::test]
async fn browser_logout_expires_both_cookies() {
    let app = TestApp::spawn().await;
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/logout")
        .header("x-client-type", "web")
        .header("cookie", "refreshToken=whatever")
        .reply(&app_routes(app.server.clone()))
        .await;
    assert_eq!(res.status(), 200);

    let cookies = set_cookies(&res);
    for name in ["accessToken", "refreshToken"] {
        let cookie = cookies.iter().find(|c| c.name() == name).unwrap();
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(time::Duration::ZERO));
    }
}

#[tokio::test]
async fn logout_all_revokes_every_session_of_the_user() {
    let app = TestApp::spawn().await;
    let api = app_routes(app.server.clone());
    let (a1, _r1) = app.login_native("multi-device").await;
    let (_a2, r2) = app.login_native("multi-device").await;
    let (_other_access, other_refresh) = app.login_native("someone-else").await;

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/logout_all")
        .header("authorization", format!("Bearer {a1}"))
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
    assert_eq!(body_json(&res)["data"]["revoked"], 2);

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .header("x-refresh-token", &r2)
        .reply(&api)
        .await;
    assert_eq!(error_code(&res), "REFRESH_EXPIRED_OR_UNKNOWN");

    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/refresh")
        .header("x-refresh-token", &other_refresh)
        .reply(&api)
        .await;
    assert_eq!(res.status(), 200);
}

#[tokio::test]
async fn logout_all_requires_a_session() {
    let app = TestApp::spawn().await;
    let res = warp::test::request()
        .method("POST")
        .path("/api/v1/logout_all")
        .reply(&app_routes(app.server.clone()))
        .await;
    assert_eq!(res.status(), 401);
    assert_eq!(error_code(&res), "MISSING_ACCESS_TOKEN");
}
