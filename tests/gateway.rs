//! End-to-end tests: config → router → proxy against mock backends.

use std::net::SocketAddr;
use std::time::Duration;

use api_gateway::config::{BackendConfig, FrontendConfig, GatewayConfig, RouteConfig};
use api_gateway::lifecycle::Shutdown;
use api_gateway::GatewayServer;

mod common;

fn route(methods: &[&str], path: &str, backend_url: &str) -> RouteConfig {
    RouteConfig {
        frontend: FrontendConfig {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            path: path.to_string(),
        },
        backend: BackendConfig {
            url: backend_url.to_string(),
        },
    }
}

fn config_for(proxy_addr: SocketAddr, routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.server.address = proxy_addr.ip().to_string();
    config.server.port = proxy_addr.port();
    config.observability.metrics_enabled = false;
    config.routes = routes;
    config
}

async fn start_gateway(config: GatewayConfig) -> Shutdown {
    let addr: SocketAddr = config.server.listen_address().parse().unwrap();
    let server = GatewayServer::new(config).expect("route table must compile");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn proxies_static_and_param_routes() {
    let backend_addr: SocketAddr = "127.0.0.1:28401".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28402".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![
            route(&["GET"], "/hi", &format!("http://{backend_addr}/upstream")),
            route(
                &["GET", "PUT"],
                "/users/:id",
                &format!("http://{backend_addr}/user-svc"),
            ),
        ],
    ))
    .await;

    let client = client();

    let res = client
        .get(format!("http://{proxy_addr}/hi"))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("GET /upstream|{proxy_addr}"));

    // The path parameter binds and the request reaches the same
    // backend path regardless of the concrete id.
    let res = client
        .put(format!("http://{proxy_addr}/users/42"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("PUT /user-svc|{proxy_addr}"));

    shutdown.trigger();
}

#[tokio::test]
async fn preserves_the_query_string() {
    let backend_addr: SocketAddr = "127.0.0.1:28403".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28404".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![route(
            &["GET"],
            "/search/:query",
            &format!("http://{backend_addr}/find"),
        )],
    ))
    .await;

    let res = client()
        .get(format!("http://{proxy_addr}/search/rust?page=2&lang=en"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("GET /find?page=2&lang=en|{proxy_addr}"));

    shutdown.trigger();
}

#[tokio::test]
async fn forwards_catch_all_routes() {
    let backend_addr: SocketAddr = "127.0.0.1:28405".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28406".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![route(
            &["GET"],
            "/static/*filepath",
            &format!("http://{backend_addr}/assets"),
        )],
    ))
    .await;

    let res = client()
        .get(format!("http://{proxy_addr}/static/css/app.css"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body = res.text().await.unwrap();
    assert_eq!(body, format!("GET /assets|{proxy_addr}"));

    shutdown.trigger();
}

#[tokio::test]
async fn redirects_on_trailing_slash_recommendation() {
    let backend_addr: SocketAddr = "127.0.0.1:28407".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28408".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![
            route(&["GET"], "/hi", &format!("http://{backend_addr}/hi")),
            route(&["GET"], "/b/", &format!("http://{backend_addr}/b")),
        ],
    ))
    .await;

    let client = client();

    // Registered without slash, requested with one.
    let res = client
        .get(format!("http://{proxy_addr}/hi/"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/hi");

    // Registered with slash, requested without; query survives.
    let res = client
        .get(format!("http://{proxy_addr}/b?x=1"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/b/?x=1");

    shutdown.trigger();
}

#[tokio::test]
async fn redirects_after_case_repair() {
    let backend_addr: SocketAddr = "127.0.0.1:28409".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28410".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![route(
            &["GET"],
            "/ABC/",
            &format!("http://{backend_addr}/abc"),
        )],
    ))
    .await;

    let res = client()
        .get(format!("http://{proxy_addr}/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/ABC/");

    shutdown.trigger();
}

#[tokio::test]
async fn unmatched_requests_get_404() {
    let backend_addr: SocketAddr = "127.0.0.1:28411".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28412".parse().unwrap();

    common::start_echo_backend(backend_addr).await;
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![route(&["GET"], "/hi", &format!("http://{backend_addr}/hi"))],
    ))
    .await;

    let client = client();

    let res = client
        .get(format!("http://{proxy_addr}/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // Same path, unregistered method.
    let res = client
        .post(format!("http://{proxy_addr}/hi"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_backend_maps_to_502() {
    let proxy_addr: SocketAddr = "127.0.0.1:28413".parse().unwrap();

    // 28414 has no listener.
    let shutdown = start_gateway(config_for(
        proxy_addr,
        vec![route(&["GET"], "/down", "http://127.0.0.1:28414/x")],
    ))
    .await;

    let res = client()
        .get(format!("http://{proxy_addr}/down"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    shutdown.trigger();
}

#[tokio::test]
async fn conflicting_route_table_fails_startup() {
    let config = config_for(
        "127.0.0.1:28415".parse().unwrap(),
        vec![
            route(&["GET"], "/cmd/:tool", "http://127.0.0.1:28416/a"),
            route(&["GET"], "/cmd/vet", "http://127.0.0.1:28416/b"),
        ],
    );

    assert!(GatewayServer::new(config).is_err());
}
