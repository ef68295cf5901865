use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, LOCATION},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::info;

pub const DEFAULT_TOKEN: &str = "mock-token";
pub const NAMESPACE: &str = "mock";
pub const DEFAULT_PER_PAGE: u64 = 20;
pub const MAX_PER_PAGE: u64 = 100;
const VISIBILITIES: [&str; 3] = ["private", "internal", "public"];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: u64,
    pub name: String,
    pub path: String,
    pub path_with_namespace: String,
    pub description: Option<String>,
    pub visibility: String,
    pub archived: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateProject {
    pub name: Option<String>,
    pub path: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub visibility: Option<String>,
    pub archived: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub visibility: Option<String>,
    pub archived: Option<bool>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Default)]
struct Store {
    projects: BTreeMap<u64, Project>,
    next_id: u64,
}

impl Store {
    /// Numeric id, or the namespaced path the client percent-encodes.
    fn resolve(&self, id: &str) -> Option<u64> {
        match id.parse::<u64>() {
            Ok(n) => self.projects.contains_key(&n).then_some(n),
            Err(_) => self
                .projects
                .values()
                .find(|p| p.path_with_namespace == id)
                .map(|p| p.id),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    token: Arc<str>,
}

/// Error response in the service's JSON shape.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    body: Value,
}

impl ApiFailure {
    fn message(status: StatusCode, message: impl Into<Value>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    fn error(status: StatusCode, error: &str) -> Self {
        Self {
            status,
            body: json!({ "error": error }),
        }
    }

    fn unauthorized() -> Self {
        Self::message(StatusCode::UNAUTHORIZED, "401 Unauthorized")
    }

    fn not_found() -> Self {
        Self::message(StatusCode::NOT_FOUND, "404 Project Not Found")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Page bounds for a collection of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PageWindow {
    pub fn new(total: u64, page: Option<u64>, per_page: Option<u64>) -> Self {
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        Self {
            page: page.unwrap_or(1).max(1),
            per_page,
            total,
            total_pages: total.div_ceil(per_page).max(1),
        }
    }

    pub fn offset(&self) -> usize {
        ((self.page - 1) * self.per_page) as usize
    }

    pub fn prev_page(&self) -> Option<u64> {
        (self.page > 1).then(|| self.page - 1)
    }

    pub fn next_page(&self) -> Option<u64> {
        (self.page < self.total_pages).then(|| self.page + 1)
    }

    /// Pagination headers; absent neighbours are sent as empty values.
    pub fn headers(&self) -> HeaderMap {
        let optional = |v: Option<u64>| v.map(HeaderValue::from).unwrap_or(HeaderValue::from_static(""));
        let mut headers = HeaderMap::new();
        headers.insert("x-page", HeaderValue::from(self.page));
        headers.insert("x-per-page", HeaderValue::from(self.per_page));
        headers.insert("x-total", HeaderValue::from(self.total));
        headers.insert("x-total-pages", HeaderValue::from(self.total_pages));
        headers.insert("x-prev-page", optional(self.prev_page()));
        headers.insert("x-next-page", optional(self.next_page()));
        headers
    }
}

pub fn app() -> Router {
    app_with_token(DEFAULT_TOKEN)
}

pub fn app_with_token(token: &str) -> Router {
    let state = AppState {
        store: Arc::new(RwLock::new(Store::default())),
        token: Arc::from(token),
    };
    Router::new()
        .route("/api/v4/version", get(version))
        .route("/api/v4/projects", get(list_projects).post(create_project))
        .route(
            "/api/v4/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/api/v4/projects/{id}/repository/archive", get(project_archive))
        .route("/api/v4/redirect", get(redirect))
        .route("/api/v4/status/{code}", get(status_code))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_token(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_token(token)).await
}

/// Accepts `PRIVATE-TOKEN`, `JOB-TOKEN` or `Authorization: Bearer`.
fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let presented = headers
        .get("private-token")
        .or_else(|| headers.get("job-token"))
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
        });
    presented == Some(&*state.token)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiFailure> {
    if is_authorized(state, headers) {
        Ok(())
    } else {
        Err(ApiFailure::unauthorized())
    }
}

fn check_visibility(visibility: Option<&str>) -> Result<(), ApiFailure> {
    match visibility {
        Some(v) if !VISIBILITIES.contains(&v) => Err(ApiFailure::error(
            StatusCode::BAD_REQUEST,
            "visibility does not have a valid value",
        )),
        _ => Ok(()),
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

async fn version(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiFailure> {
    authorize(&state, &headers)?;
    Ok(Json(json!({ "version": "17.0.0-mock", "revision": "mock" })))
}

/// Anonymous callers only see public projects.
async fn list_projects(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<(HeaderMap, Json<Vec<Project>>), ApiFailure> {
    check_visibility(params.visibility.as_deref())?;
    let anonymous = !is_authorized(&state, &headers);
    let search = params.search.as_deref().map(str::to_lowercase);

    let store = state.store.read().await;
    let matching: Vec<&Project> = store
        .projects
        .values()
        .filter(|p| !anonymous || p.visibility == "public")
        .filter(|p| search.as_ref().map_or(true, |s| p.name.to_lowercase().contains(s)))
        .filter(|p| params.visibility.as_ref().map_or(true, |v| &p.visibility == v))
        .filter(|p| params.archived.map_or(true, |a| p.archived == a))
        .collect();

    let window = PageWindow::new(matching.len() as u64, params.page, params.per_page);
    let page = matching
        .into_iter()
        .skip(window.offset())
        .take(window.per_page as usize)
        .cloned()
        .collect();
    Ok((window.headers(), Json(page)))
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(input): Form<CreateProject>,
) -> Result<(StatusCode, Json<Project>), ApiFailure> {
    authorize(&state, &headers)?;
    let name = input
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiFailure::error(StatusCode::BAD_REQUEST, "name is missing"))?;
    check_visibility(input.visibility.as_deref())?;
    let path = input.path.unwrap_or_else(|| slug(&name));

    let mut store = state.store.write().await;
    if store.projects.values().any(|p| p.path == path) {
        return Err(ApiFailure::message(
            StatusCode::BAD_REQUEST,
            json!({ "name": ["has already been taken"], "path": ["has already been taken"] }),
        ));
    }
    store.next_id += 1;
    let project = Project {
        id: store.next_id,
        path_with_namespace: format!("{NAMESPACE}/{path}"),
        name,
        path,
        description: input.description,
        visibility: input.visibility.unwrap_or_else(|| "private".to_string()),
        archived: false,
    };
    store.projects.insert(project.id, project.clone());
    info!(id = project.id, path = %project.path_with_namespace, "project created");
    Ok((StatusCode::CREATED, Json(project)))
}

/// Private and internal projects are reported as missing to anonymous
/// callers.
async fn get_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiFailure> {
    let anonymous = !is_authorized(&state, &headers);
    let store = state.store.read().await;
    store
        .resolve(&id)
        .and_then(|id| store.projects.get(&id))
        .filter(|p| !anonymous || p.visibility == "public")
        .cloned()
        .map(Json)
        .ok_or_else(ApiFailure::not_found)
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Form(input): Form<UpdateProject>,
) -> Result<Json<Project>, ApiFailure> {
    authorize(&state, &headers)?;
    check_visibility(input.visibility.as_deref())?;
    let mut store = state.store.write().await;
    let id = store.resolve(&id).ok_or_else(ApiFailure::not_found)?;
    let project = store.projects.get_mut(&id).ok_or_else(ApiFailure::not_found)?;
    if let Some(name) = input.name {
        project.name = name;
    }
    if let Some(description) = input.description {
        project.description = Some(description);
    }
    if let Some(visibility) = input.visibility {
        project.visibility = visibility;
    }
    if let Some(archived) = input.archived {
        project.archived = archived;
    }
    Ok(Json(project.clone()))
}

async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    authorize(&state, &headers)?;
    let mut store = state.store.write().await;
    let id = store.resolve(&id).ok_or_else(ApiFailure::not_found)?;
    store.projects.remove(&id);
    info!(id, "project deleted");
    Ok((StatusCode::OK, Json(json!({ "message": "Project deleted" }))))
}

/// Bytes served as a project's archive. Deliberately not valid UTF-8.
pub fn archive_bytes(id: u64) -> Vec<u8> {
    let mut bytes = b"PK\x03\x04".to_vec();
    bytes.extend_from_slice(&id.to_be_bytes());
    bytes.extend_from_slice(&[0xff, 0xfe, 0x00]);
    bytes
}

async fn project_archive(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Response, ApiFailure> {
    authorize(&state, &headers)?;
    let store = state.store.read().await;
    let id = store.resolve(&id).ok_or_else(ApiFailure::not_found)?;
    Ok((
        [(CONTENT_TYPE, "application/zip")],
        archive_bytes(id),
    )
        .into_response())
}

#[derive(Debug, Deserialize)]
pub struct RedirectParams {
    pub to: String,
}

/// `302 Found` pointing at `to`, for checking that clients do not follow.
async fn redirect(Query(params): Query<RedirectParams>) -> Response {
    (
        StatusCode::FOUND,
        [(LOCATION, params.to)],
        Json(json!({ "message": "302 Found" })),
    )
        .into_response()
}

/// Answers with the requested status and a `{"message": "Error Message"}`
/// body, for exercising client error handling.
async fn status_code(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, Json(json!({ "message": "Error Message" }))).into_response(),
        Err(_) => ApiFailure::error(StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}
