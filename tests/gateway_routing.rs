//! Route selection, body limits and local serving through a running gateway.

use std::time::Duration;

use axum::http::StatusCode;

mod common;

const MIB: usize = 1024 * 1024;

#[tokio::test]
async fn test_pattern_route_selected_over_catch_all() {
    let web = common::start_echo_backend("web", Duration::ZERO).await;
    let geo = common::start_echo_backend("geo", Duration::ZERO).await;
    let root = tempfile::tempdir().unwrap();
    let (addr, shutdown) = common::start_gateway(common::gateway_config(web.addr, geo.addr, root.path())).await;

    // 19 MiB only fits under the unlocked-geometries limit, not the 1 MiB default.
    let res = common::client()
        .post(format!("http://{}/districtmapping/plan/42/unlockedgeometries/?version=3", addr))
        .body(vec![b'g'; 19 * MIB])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("web "), "{}", body);
    assert!(body.contains("path=/districtmapping/plan/42/unlockedgeometries/?version=3"), "{}", body);
    assert!(body.ends_with(&format!("bytes={}", 19 * MIB)), "{}", body);

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_body_rejected_before_forwarding() {
    let web = common::start_echo_backend("web", Duration::ZERO).await;
    let geo = common::start_echo_backend("geo", Duration::ZERO).await;
    let root = tempfile::tempdir().unwrap();
    let (addr, shutdown) = common::start_gateway(common::gateway_config(web.addr, geo.addr, root.path())).await;

    let response = common::raw_request(
        addr,
        &format!(
            "POST /districtmapping/plan/42/unlockedgeometries/ HTTP/1.1\r\nHost: maps.example.org\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            21 * MIB
        ),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);
    assert_eq!(web.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_non_numeric_plan_falls_through_to_catch_all() {
    let web = common::start_echo_backend("web", Duration::ZERO).await;
    let geo = common::start_echo_backend("geo", Duration::ZERO).await;
    let root = tempfile::tempdir().unwrap();
    let (addr, shutdown) = common::start_gateway(common::gateway_config(web.addr, geo.addr, root.path())).await;

    let res = common::client()
        .get(format!("http://{}/districtmapping/plan/abc/unlockedgeometries/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.text().await.unwrap().starts_with("web "));

    // The catch-all carries the default 1 MiB limit, not the 20 MiB one.
    let response = common::raw_request(
        addr,
        &format!(
            "POST /districtmapping/plan/abc/unlockedgeometries/ HTTP/1.1\r\nHost: maps.example.org\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            2 * MIB
        ),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 413"), "{}", response);

    shutdown.trigger();
}

#[tokio::test]
async fn test_geoserver_prefix_preserved_and_host_forwarded() {
    let web = common::start_echo_backend("web", Duration::ZERO).await;
    let geo = common::start_echo_backend("geo", Duration::ZERO).await;
    let root = tempfile::tempdir().unwrap();
    let (addr, shutdown) = common::start_gateway(common::gateway_config(web.addr, geo.addr, root.path())).await;

    let res = common::client()
        .get(format!("http://{}/geoserver/wms?layers=county", addr))
        .header("Host", "maps.example.org")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body = res.text().await.unwrap();
    assert!(body.starts_with("geo "), "{}", body);
    assert!(body.contains("host=maps.example.org"), "{}", body);
    assert!(body.contains("path=/geoserver/wms?layers=county"), "{}", body);
    assert_eq!(web.hits(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_static_served_locally_without_upstreams() {
    let root = tempfile::tempdir().unwrap();
    std::fs::write(root.path().join("foo.css"), "h1 { color: teal }").unwrap();
    std::fs::write(root.path().join("plan42.html"), "<h1>Report</h1>").unwrap();

    let nowhere = common::closed_addr().await;
    let (addr, shutdown) = common::start_gateway(common::gateway_config(nowhere, nowhere, root.path())).await;
    let client = common::client();

    let res = client.get(format!("http://{}/static/foo.css", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/css");
    assert_eq!(res.text().await.unwrap(), "h1 { color: teal }");

    let res = client.get(format!("http://{}/reports/plan42.html", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(format!("http://{}/static/missing.css", addr)).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    shutdown.trigger();
}

#[tokio::test]
async fn test_static_traversal_rejected() {
    let parent = tempfile::tempdir().unwrap();
    let root = parent.path().join("static");
    std::fs::create_dir(&root).unwrap();
    std::fs::write(parent.path().join("secret"), "do not serve").unwrap();

    let nowhere = common::closed_addr().await;
    let (addr, shutdown) = common::start_gateway(common::gateway_config(nowhere, nowhere, &root)).await;

    for target in ["/static/../secret", "/static/%2e%2e/secret", "/static/..%2fsecret"] {
        let response = common::raw_request(
            addr,
            &format!("GET {} HTTP/1.1\r\nHost: maps.example.org\r\nConnection: close\r\n\r\n", target),
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 404"), "{} -> {}", target, response);
        assert!(!response.contains("do not serve"));
    }

    shutdown.trigger();
}
