use axum::body::{Body, Bytes};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pubsearch_core::persist::{rebuild_index, save_corpus, DataPaths};
use pubsearch_core::Publication;
use serde_json::Value;
use tempfile::tempdir;
use tower::ServiceExt;

fn publication(title: &str, slug: &str) -> Publication {
    Publication {
        title: title.into(),
        authors: vec![],
        publication_year: "2023".into(),
        journal: Some("Journal of Health Economics".into()),
        volume: None,
        link: format!("https://portal.example/en/publications/{slug}"),
    }
}

fn write_tiny_corpus(dir: &std::path::Path) {
    let paths = DataPaths::new(dir);
    let corpus = vec![
        publication("Deep Learning for Health Outcomes", "deep"),
        publication("Political Economy of Health", "political"),
        publication("Sovereign Debt Restructuring", "debt"),
    ];
    save_corpus(&paths, &corpus).unwrap();
    rebuild_index(&paths).unwrap().unwrap();
}

async fn call(app: Router, method: Method, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

fn app_for(dir: &std::path::Path) -> Router {
    pubsearch_server::build_app(dir.to_string_lossy().to_string()).unwrap()
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());

    let (status, body) = call(app_for(dir.path()), Method::GET, "/search?query=health%20outcomes").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["query"], "health outcomes");
    assert_eq!(json["total_hits"], 2);
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["doc_id"], 0);
    assert_eq!(arr[0]["title"], "Deep Learning for Health Outcomes");
    assert_eq!(arr[0]["volume"], "N/A");
    assert_eq!(arr[1]["doc_id"], 1);
    assert!(arr[0]["score"].as_f64().unwrap() > arr[1]["score"].as_f64().unwrap());
}

#[tokio::test]
async fn k_truncates_results_but_not_total_hits() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());

    let (status, body) = call(app_for(dir.path()), Method::GET, "/search?query=health&k=1").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 2);
    assert_eq!(json["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unmatched_query_is_empty_not_an_error() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());

    let (status, body) = call(app_for(dir.path()), Method::GET, "/search?query=quantum").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total_hits"], 0);
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());
    let app = app_for(dir.path());

    let (status, body) = call(app.clone(), Method::GET, "/search?query=%20%20").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["error"].is_string());

    let (status, _) = call(app, Method::GET, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_data_reports_unavailable() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app_for(dir.path()), Method::GET, "/search?query=health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], pubsearch_server::NO_DATA_MESSAGE);
}

#[tokio::test]
async fn publication_lookup() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());
    let app = app_for(dir.path());

    let (status, body) = call(app.clone(), Method::GET, "/publication/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["title"], "Sovereign Debt Restructuring");

    let (status, _) = call(app, Method::GET, "/publication/99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reload_picks_up_a_new_build() {
    let dir = tempdir().unwrap();
    let app = app_for(dir.path());

    let (status, _) = call(app.clone(), Method::GET, "/search?query=debt").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    write_tiny_corpus(dir.path());
    let (status, body) = call(app.clone(), Method::POST, "/reload").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["num_docs"], 3);

    let (status, body) = call(app, Method::GET, "/search?query=debt").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"][0]["doc_id"], 2);
}

#[tokio::test]
async fn stale_index_fails_startup_and_reload() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());
    let app = app_for(dir.path());

    let paths = DataPaths::new(dir.path());
    save_corpus(&paths, &[publication("Audit Quality", "audit")]).unwrap();

    let (status, body) = call(app.clone(), Method::POST, "/reload").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(serde_json::from_slice::<Value>(&body).unwrap()["error"].is_string());
    // previous artifacts stay live
    let (status, _) = call(app, Method::GET, "/search?query=health").await;
    assert_eq!(status, StatusCode::OK);

    assert!(pubsearch_server::build_app(dir.path().to_string_lossy().to_string()).is_err());
}

#[tokio::test]
async fn health_check() {
    let dir = tempdir().unwrap();
    let (status, body) = call(app_for(dir.path()), Method::GET, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn reload_runs_alongside_queries_on_a_single_worker() {
    let dir = tempdir().unwrap();
    write_tiny_corpus(dir.path());
    let app = app_for(dir.path());

    let (reload, search) = tokio::join!(
        call(app.clone(), Method::POST, "/reload"),
        call(app, Method::GET, "/search?query=health"),
    );
    assert_eq!(reload.0, StatusCode::OK);
    assert_eq!(search.0, StatusCode::OK);
    let json: Value = serde_json::from_slice(&reload.1).unwrap();
    assert!(json["num_terms"].as_u64().unwrap() > 0);
}
