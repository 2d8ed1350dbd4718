//! End-to-end tests of the series routes through `Server::test_request`.

use hyper::body::Bytes;
use serde_json::{json, Value};
use seriewatch_core::{register_routes, ApiResponse, Database, Method, SeriesService, Server};
use std::collections::HashMap;
use std::sync::Arc;

fn app_with(db: Database<seriewatch_core::Platform>) -> (Server, Arc<SeriesService>) {
    let service = Arc::new(SeriesService::new(db));
    let mut server = Server::default();
    register_routes(&mut server, service.clone()).unwrap();
    (server, service)
}

fn app() -> Server {
    app_with(Database::in_memory()).0
}

async fn call(server: &Server, method: Method, url: &str, body: Option<Value>) -> ApiResponse {
    let body = body.map(|v| Bytes::from(v.to_string()));
    server.test_request(method, url, HashMap::new(), body).await
}

fn body_json(resp: &ApiResponse) -> Value {
    serde_json::from_str(&resp.body).unwrap()
}

async fn add(server: &Server, platform: &str, title: &str) {
    let resp = call(
        server,
        Method::Post,
        "/series/add",
        Some(json!({"plataformaNome": platform, "nome_da_serie": title})),
    )
    .await;
    assert_eq!(resp.status, 201);
}

#[tokio::test]
async fn test_add_then_list() {
    let server = app();
    add(&server, "Netflix", "Dark").await;

    let resp = call(&server, Method::Get, "/series", None).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.content_type, "application/json");

    let listings = body_json(&resp);
    let listings = listings.as_array().unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["plataformaNome"], "Netflix");
    assert_eq!(listings[0]["nome_da_serie"], "Dark");
    assert_eq!(listings[0]["assistiu"], "Não");
}

#[tokio::test]
async fn test_add_response_text() {
    let server = app();
    let resp = call(
        &server,
        Method::Post,
        "/series/add",
        Some(json!({"plataformaNome": "Netflix", "nome_da_serie": "Dark", "assistiu": "Sim"})),
    )
    .await;
    assert_eq!(resp.status, 201);
    assert_eq!(resp.body, "Série adicionada com sucesso");
}

#[tokio::test]
async fn test_add_reuses_platform() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    add(&server, "Netflix", "Ozark").await;

    let listings = body_json(&call(&server, Method::Get, "/series", None).await);
    let listings = listings.as_array().unwrap();
    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0]["plataformaId"], listings[1]["plataformaId"]);
}

#[tokio::test]
async fn test_series_for_platform() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    add(&server, "Max", "Succession").await;

    let listings = body_json(&call(&server, Method::Get, "/series", None).await);
    let max_id = listings
        .as_array()
        .unwrap()
        .iter()
        .find(|l| l["plataformaNome"] == "Max")
        .map(|l| l["plataformaId"].as_str().unwrap().to_string())
        .unwrap();

    let resp = call(&server, Method::Get, &format!("/series/{max_id}"), None).await;
    assert_eq!(resp.status, 200);
    let series = body_json(&resp);
    assert_eq!(series.as_array().unwrap().len(), 1);
    assert_eq!(series[0]["nome_da_serie"], "Succession");
    assert!(series[0].get("plataformaId").is_none());
}

#[tokio::test]
async fn test_update_and_delete() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    let listings = body_json(&call(&server, Method::Get, "/series", None).await);
    let platform_id = listings[0]["plataformaId"].as_str().unwrap().to_string();
    let series_id = listings[0]["id"].as_str().unwrap().to_string();

    let resp = call(
        &server,
        Method::Put,
        "/series/update",
        Some(json!({"plataformaId": platform_id, "serieId": series_id, "assistiu": "Sim"})),
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "Status da série atualizado com sucesso");

    let listings = body_json(&call(&server, Method::Get, "/series", None).await);
    assert_eq!(listings[0]["assistiu"], "Sim");

    let resp = call(
        &server,
        Method::Delete,
        "/series/delete",
        Some(json!({"plataformaId": platform_id, "serieId": series_id})),
    )
    .await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "Série removida com sucesso");

    let resp = call(&server, Method::Get, "/series", None).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, "Nenhuma série encontrada");
}

#[tokio::test]
async fn test_update_unknown_series_leaves_store_unchanged() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    let before = call(&server, Method::Get, "/series", None).await.body;
    let platform_id = body_json(&call(&server, Method::Get, "/series", None).await)[0]
        ["plataformaId"]
        .as_str()
        .unwrap()
        .to_string();

    let resp = call(
        &server,
        Method::Put,
        "/series/update",
        Some(json!({"plataformaId": platform_id, "serieId": "nope", "assistiu": "Sim"})),
    )
    .await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, "Série ou plataforma não encontrada");

    let after = call(&server, Method::Get, "/series", None).await.body;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_delete_unknown_platform() {
    let server = app();
    let resp = call(
        &server,
        Method::Delete,
        "/series/delete",
        Some(json!({"plataformaId": "x", "serieId": "y"})),
    )
    .await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, "Plataforma ou série não encontrada");
}

#[tokio::test]
async fn test_missing_fields_are_rejected() {
    let server = app();

    let resp = call(&server, Method::Post, "/series/add", Some(json!({"plataformaNome": "Netflix"}))).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "Dados inválidos");

    let resp = call(&server, Method::Put, "/series/update", None).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "Dados inválidos");

    let resp = call(&server, Method::Delete, "/series/delete", Some(json!({"serieId": "s"}))).await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "IDs de plataforma ou série não especificados");
}

#[tokio::test]
async fn test_unknown_platform_is_404() {
    let server = app();
    let resp = call(&server, Method::Get, "/series/does-not-exist", None).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, "Nenhuma série encontrada para a plataforma especificada");
}

#[tokio::test]
async fn test_platform_with_no_series_is_404() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    let listings = body_json(&call(&server, Method::Get, "/series", None).await);
    let platform_id = listings[0]["plataformaId"].as_str().unwrap().to_string();
    let series_id = listings[0]["id"].as_str().unwrap().to_string();

    let resp = call(
        &server,
        Method::Delete,
        "/series/delete",
        Some(json!({"plataformaId": platform_id, "serieId": series_id})),
    )
    .await;
    assert_eq!(resp.status, 200);

    let resp = call(&server, Method::Get, &format!("/series/{platform_id}"), None).await;
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, "Nenhuma série encontrada para a plataforma especificada");
}

#[tokio::test]
async fn test_non_string_fields_are_accepted() {
    let server = app();
    let resp = call(
        &server,
        Method::Post,
        "/series/add",
        Some(json!({"plataformaNome": "Netflix", "nome_da_serie": 1984})),
    )
    .await;
    assert_eq!(resp.status, 201);

    let resp = call(
        &server,
        Method::Put,
        "/series/update",
        Some(json!({"plataformaId": 7, "serieId": "s1", "assistiu": "Sim"})),
    )
    .await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn test_malformed_json() {
    let server = app();
    let resp = server
        .test_request(
            Method::Post,
            "/series/add",
            HashMap::new(),
            Some(Bytes::from_static(b"{\"plataformaNome\": ")),
        )
        .await;
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, "JSON Inválido");
}

#[tokio::test]
async fn test_unmatched_route() {
    let server = app();
    for (method, url) in [
        (Method::Get, "/filmes"),
        (Method::Patch, "/series"),
        (Method::Post, "/series"),
        (Method::Get, "/series/a/b"),
    ] {
        let resp = call(&server, method, url, None).await;
        assert_eq!(resp.status, 404, "{method} {url}");
        assert!(resp.body.is_empty(), "{method} {url}");
    }
}

#[tokio::test]
async fn test_query_string_is_tolerated() {
    let server = app();
    add(&server, "Netflix", "Dark").await;
    let resp = call(&server, Method::Get, "/series?page=1", None).await;
    assert_eq!(resp.status, 200);
}

#[tokio::test]
async fn test_changes_reach_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    let (server, service) = app_with(Database::open(&path).await);
    add(&server, "Netflix", "Dark").await;
    service.flush().unwrap().wait().await.unwrap();

    let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(saved["plataformas"][0]["nome"], "Netflix");
    assert_eq!(saved["plataformas"][0]["series"][0]["nome_da_serie"], "Dark");

    let (reopened, _) = app_with(Database::open(&path).await);
    let listings = body_json(&call(&reopened, Method::Get, "/series", None).await);
    assert_eq!(listings[0]["nome_da_serie"], "Dark");
}

#[test]
fn test_existing_file_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    std::fs::write(
        &path,
        r#"{"plataformas":[{"id":"p1","nome":"Netflix","series":[{"id":"s1","nome_da_serie":"Dark","assistiu":"Sim"}]}]}"#,
    )
    .unwrap();

    let resp = tokio_test::block_on(async {
        let (server, _) = app_with(Database::open(&path).await);
        call(&server, Method::Get, "/series/p1", None).await
    });
    assert_eq!(resp.status, 200);
    assert_eq!(body_json(&resp)[0]["assistiu"], "Sim");
}
