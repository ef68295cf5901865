use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, archive_bytes, Project, DEFAULT_TOKEN};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn form_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("PRIVATE-TOKEN", DEFAULT_TOKEN)
        .body(body.to_string())
        .unwrap()
}

fn authed(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("PRIVATE-TOKEN", DEFAULT_TOKEN)
        .body(String::new())
        .unwrap()
}

fn anonymous(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- auth ---

#[tokio::test]
async fn version_requires_token() {
    let resp = app().oneshot(anonymous("/api/v4/version")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "401 Unauthorized");
}

#[tokio::test]
async fn version_accepts_bearer_token() {
    let req = Request::builder()
        .uri("/api/v4/version")
        .header(http::header::AUTHORIZATION, format!("Bearer {DEFAULT_TOKEN}"))
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_token_is_rejected() {
    let req = Request::builder()
        .uri("/api/v4/version")
        .header("PRIVATE-TOKEN", "nope")
        .body(String::new())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- list ---

#[tokio::test]
async fn list_projects_empty_has_pagination_headers() {
    let resp = app().oneshot(authed("GET", "/api/v4/projects")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-page"], "1");
    assert_eq!(resp.headers()["x-per-page"], "20");
    assert_eq!(resp.headers()["x-total"], "0");
    assert_eq!(resp.headers()["x-total-pages"], "1");
    assert_eq!(resp.headers()["x-next-page"], "");
    let projects: Vec<Project> = body_json(resp).await;
    assert!(projects.is_empty());
}

// --- create ---

#[tokio::test]
async fn create_project_returns_201() {
    let resp = app()
        .oneshot(form_request("POST", "/api/v4/projects", "name=My+Project"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let project: Project = body_json(resp).await;
    assert_eq!(project.name, "My Project");
    assert_eq!(project.path, "my-project");
    assert_eq!(project.path_with_namespace, "mock/my-project");
    assert_eq!(project.visibility, "private");
}

#[tokio::test]
async fn create_project_without_name_returns_400() {
    let resp = app()
        .oneshot(form_request("POST", "/api/v4/projects", "description=x"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "name is missing");
}

#[tokio::test]
async fn create_project_with_bad_visibility_returns_400() {
    let resp = app()
        .oneshot(form_request("POST", "/api/v4/projects", "name=x&visibility=secret"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_project_requires_token() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/v4/projects")
        .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body("name=x".to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- get ---

#[tokio::test]
async fn get_project_not_found() {
    let resp = app().oneshot(authed("GET", "/api/v4/projects/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "404 Project Not Found");
}

// --- raw content ---

#[tokio::test]
async fn archive_is_binary() {
    use tower::Service;

    let mut app = app().into_service();
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("POST", "/api/v4/projects", "name=Alpha"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/v4/projects/1/repository/archive"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/zip");
    let body = body_bytes(resp).await;
    assert_eq!(body.as_ref(), archive_bytes(1).as_slice());
    assert!(std::str::from_utf8(&body).is_err());
}

#[tokio::test]
async fn redirect_points_at_target() {
    let resp = app()
        .oneshot(anonymous("/api/v4/redirect?to=http%3A%2F%2Felsewhere.test%2Fsteal"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION], "http://elsewhere.test/steal");
}

// --- status ---

#[tokio::test]
async fn status_route_echoes_code_with_message() {
    for code in [400u16, 401, 403, 404, 405, 409, 422, 500, 418] {
        let resp = app()
            .oneshot(anonymous(&format!("/api/v4/status/{code}")))
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), code);
        let body: Value = body_json(resp).await;
        assert_eq!(body["message"], "Error Message");
    }
}

// --- full lifecycle ---

#[tokio::test]
async fn project_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two, one public
    for body in ["name=Alpha", "name=Beta&visibility=public"] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(form_request("POST", "/api/v4/projects", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // duplicate path: 400 with structured message
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("POST", "/api/v4/projects", "name=Alpha"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"]["name"][0], "has already been taken");

    // paged list: first page of one
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/v4/projects?per_page=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-total"], "2");
    assert_eq!(resp.headers()["x-total-pages"], "2");
    assert_eq!(resp.headers()["x-next-page"], "2");
    let projects: Vec<Project> = body_json(resp).await;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Alpha");

    // anonymous list: only the public one
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(anonymous("/api/v4/projects"))
        .await
        .unwrap();
    let projects: Vec<Project> = body_json(resp).await;
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "Beta");

    // get by encoded namespaced path
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/v4/projects/mock%2Falpha"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let alpha: Project = body_json(resp).await;
    assert_eq!(alpha.id, 1);

    // update: partial: only archived
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(form_request("PUT", "/api/v4/projects/1", "archived=true"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Project = body_json(resp).await;
    assert_eq!(updated.name, "Alpha"); // unchanged
    assert!(updated.archived);

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("DELETE", "/api/v4/projects/1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert!(!body.is_empty());

    // get after delete: 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(authed("GET", "/api/v4/projects/1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
