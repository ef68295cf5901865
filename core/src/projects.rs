//! Projects endpoints.
//!
//! One resource wrapper on top of the executor: each method validates its
//! own required arguments, builds a descriptor and unwraps the response.
//! Errors from the executor are passed through unchanged.

use std::sync::Arc;

use crate::descriptor::{ParamValue, RequestDescriptor};
use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::http::Response;
use crate::pagination::PaginatedResult;
use crate::types::{CreateProject, Project, ProjectQuery, UpdateProject};

const PROJECTS: &str = "projects";
const PROJECT: &str = "projects/{id}";

/// Project operations over a shared executor.
#[derive(Clone)]
pub struct ProjectsRepository {
    executor: Arc<RequestExecutor>,
}

impl ProjectsRepository {
    pub fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    pub fn list(&self, query: &ProjectQuery) -> Result<PaginatedResult<Project>, ApiError> {
        self.executor.execute_paged(&list_descriptor(query), true)
    }

    pub async fn list_async(
        &self,
        query: &ProjectQuery,
    ) -> Result<PaginatedResult<Project>, ApiError> {
        self.executor
            .execute_paged_async(&list_descriptor(query), true)
            .await
    }

    /// `id` is the numeric id or the namespaced path (`group/project`).
    pub fn get(&self, id: impl ParamValue) -> Result<Project, ApiError> {
        let descriptor = RequestDescriptor::get(PROJECT).segment("id", id);
        require_data(self.executor.execute_data(&descriptor, true)?)
    }

    pub async fn get_async(&self, id: impl ParamValue) -> Result<Project, ApiError> {
        let descriptor = RequestDescriptor::get(PROJECT).segment("id", id);
        require_data(self.executor.execute_data_async(&descriptor, true).await?)
    }

    pub fn create(&self, input: &CreateProject) -> Result<Project, ApiError> {
        require_data(self.executor.execute_data(&create_descriptor(input)?, true)?)
    }

    pub async fn create_async(&self, input: &CreateProject) -> Result<Project, ApiError> {
        let descriptor = create_descriptor(input)?;
        require_data(self.executor.execute_data_async(&descriptor, true).await?)
    }

    pub fn update(&self, id: impl ParamValue, input: &UpdateProject) -> Result<Project, ApiError> {
        require_data(self.executor.execute_data(&update_descriptor(id, input), true)?)
    }

    pub async fn update_async(
        &self,
        id: impl ParamValue,
        input: &UpdateProject,
    ) -> Result<Project, ApiError> {
        let descriptor = update_descriptor(id, input);
        require_data(self.executor.execute_data_async(&descriptor, true).await?)
    }

    pub fn delete(&self, id: impl ParamValue) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::delete(PROJECT).segment("id", id);
        self.executor.execute(&descriptor, true).map(|_| ())
    }

    pub async fn delete_async(&self, id: impl ParamValue) -> Result<(), ApiError> {
        let descriptor = RequestDescriptor::delete(PROJECT).segment("id", id);
        self.executor.execute_async(&descriptor, true).await.map(|_| ())
    }
}

fn list_descriptor(query: &ProjectQuery) -> RequestDescriptor {
    RequestDescriptor::get(PROJECTS)
        .param("search", query.search.as_deref())
        .param("visibility", query.visibility)
        .param("archived", query.archived)
        .param("page", query.page)
        .param("per_page", query.per_page)
}

fn create_descriptor(input: &CreateProject) -> Result<RequestDescriptor, ApiError> {
    if input.name.trim().is_empty() {
        return Err(ApiError::InvalidArgument("project name is required".to_string()));
    }
    Ok(RequestDescriptor::post(PROJECTS)
        .param("name", input.name.as_str())
        .param("path", input.path.as_deref())
        .param("description", input.description.as_deref())
        .param("visibility", input.visibility))
}

fn update_descriptor(id: impl ParamValue, input: &UpdateProject) -> RequestDescriptor {
    RequestDescriptor::put(PROJECT)
        .segment("id", id)
        .param("name", input.name.as_deref())
        .param("description", input.description.as_deref())
        .param("visibility", input.visibility)
        .param("archived", input.archived)
}

fn require_data<T>(response: Response<T>) -> Result<T, ApiError> {
    response
        .into_data()
        .ok_or_else(|| ApiError::Deserialization("expected a response body".to_string()))
}
