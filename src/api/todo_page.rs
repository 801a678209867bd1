//! Server-rendered todo list. Every navigation to [TODOS_PAGE_PATH] renders the list on the
//! server (or serves the viewer's cached copy), and the page's forms post back to handlers
//! here which write to the store, invalidate the cached page, and redirect back.

use crate::api::identity::CurrentUser;
use crate::domain::todo::driving_ports::{TodoError, TodoPort};
use crate::domain::todo::{InvalidPriority, MutationOutcome, NewTodo, Priority, Todo, UpdateTodo};
use crate::domain::user::UserIdentity;
use crate::external_connections::ExternalConnectivity;
use crate::page_cache::PageCache;
use crate::persistence::db_todo_driven_ports::{DbTodoReader, DbTodoWriter};
use crate::{AppState, SharedData};
use askama::Template;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

/// Route of the rendered list. Also the key its cached copies are filed under.
pub const TODOS_PAGE_PATH: &str = "/todos";

pub fn todo_page_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            TODOS_PAGE_PATH,
            get(
                |State(app_state): AppState, CurrentUser(viewer): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    render_todos_page(
                        viewer.as_ref(),
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
        .route(
            "/todos/add",
            post(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Form(form): Form<TodoForm>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    add_todo(
                        viewer.as_ref(),
                        form,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
        .route(
            "/todos/edit",
            post(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Form(form): Form<TodoForm>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    edit_todo(
                        viewer.as_ref(),
                        form,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
        .route(
            "/todos/delete",
            post(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Form(form): Form<TodoForm>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    delete_todo(
                        viewer.as_ref(),
                        form,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
}

/// Fields posted by the add, edit, and delete forms. Each form only sends the fields it
/// has, so everything defaults to empty.
#[derive(Debug, Default, Deserialize)]
pub struct TodoForm {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    priority: String,
}

impl TodoForm {
    /// An empty or unreadable id is treated as missing
    fn todo_id(&self) -> Option<i32> {
        self.id.trim().parse().ok()
    }

    /// Priority falls back to low when the field is absent
    fn priority(&self) -> Result<Priority, PageError> {
        let raw = self.priority.trim();
        if raw.is_empty() {
            return Ok(Priority::Low);
        }

        let value = raw
            .parse::<i32>()
            .map_err(|_| PageError::UnreadablePriority(raw.to_owned()))?;
        Ok(Priority::try_from(value)?)
    }
}

#[derive(Debug, Error)]
enum PageError {
    #[error("Error fetching todos: {0:#}")]
    Fetch(anyhow::Error),
    #[error("Failed to {action} todo: {cause:#}")]
    Mutation {
        action: &'static str,
        cause: anyhow::Error,
    },
    #[error("Template rendering failed")]
    Template(#[from] askama::Error),
    #[error(transparent)]
    InvalidPriority(#[from] InvalidPriority),
    #[error("priority must be a number but was {0:?}")]
    UnreadablePriority(String),
}

impl PageError {
    fn mutation(action: &'static str) -> impl FnOnce(TodoError) -> PageError {
        move |TodoError::Store(cause)| PageError::Mutation { action, cause }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        error!("Todo page failed: {self}");
        let status_code = match self {
            PageError::InvalidPriority(_) | PageError::UnreadablePriority(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error_template = ErrorMessageTemplate {
            message: self.to_string(),
        };
        let Ok(rendered) = error_template.render() else {
            return status_code.into_response();
        };

        (status_code, Html(rendered)).into_response()
    }
}

struct PriorityOption {
    value: i32,
    label: &'static str,
    selected: bool,
}

fn priority_options(selected: Priority) -> Vec<PriorityOption> {
    Priority::ALL
        .into_iter()
        .map(|priority| PriorityOption {
            value: priority.value(),
            label: priority.label(),
            selected: priority == selected,
        })
        .collect()
}

struct TodoRowView {
    id: i32,
    title: String,
    updated_at: String,
    options: Vec<PriorityOption>,
}

impl From<Todo> for TodoRowView {
    fn from(value: Todo) -> Self {
        TodoRowView {
            id: value.id,
            updated_at: value.updated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            options: priority_options(value.priority),
            title: value.title,
        }
    }
}

#[derive(Template)]
#[template(path = "todos.html")]
struct TodosPageTemplate {
    todos: Vec<TodoRowView>,
    new_todo_options: Vec<PriorityOption>,
}

impl TodosPageTemplate {
    fn new(todos: Vec<Todo>) -> Self {
        Self {
            todos: todos.into_iter().map(TodoRowView::from).collect(),
            new_todo_options: priority_options(Priority::Low),
        }
    }
}

#[derive(Template)]
#[template(path = "error_message.html")]
struct ErrorMessageTemplate {
    message: String,
}

/// Renders the viewer's list, reading the store at most once per render. A fresh render
/// only happens when no cached copy survived the last invalidation.
#[tracing::instrument(skip_all)]
async fn render_todos_page(
    viewer: Option<&UserIdentity>,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Html<String>, PageError> {
    let viewer_key = viewer.map(|user| user.id.clone());
    if let Some(cached) = page_cache.get(TODOS_PAGE_PATH, &viewer_key) {
        debug!("Serving cached todo page");
        return Ok(Html(cached));
    }

    let rendered_from = page_cache.generation();
    let todos = todo_service
        .list_todos(viewer, &mut *ext_cxn, &DbTodoReader)
        .await
        .map_err(|TodoError::Store(err)| PageError::Fetch(err))?;
    let rendered = TodosPageTemplate::new(todos).render()?;
    page_cache.store(TODOS_PAGE_PATH, viewer_key, rendered.clone(), rendered_from);

    Ok(Html(rendered))
}

/// Sends the browser back to the list, dropping cached copies if the store changed
fn back_to_list(outcome: MutationOutcome, page_cache: &PageCache) -> Redirect {
    if outcome.reached_store() {
        page_cache.invalidate(TODOS_PAGE_PATH);
    }

    Redirect::to(TODOS_PAGE_PATH)
}

async fn add_todo(
    viewer: Option<&UserIdentity>,
    form: TodoForm,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Redirect, PageError> {
    info!("Adding todo from form");
    let new_todo = NewTodo {
        priority: form.priority()?,
        title: form.title,
    };

    let outcome = todo_service
        .create_todo(viewer, &new_todo, &mut *ext_cxn, &DbTodoWriter)
        .await
        .map_err(PageError::mutation("add"))?;

    Ok(back_to_list(outcome, page_cache))
}

async fn edit_todo(
    viewer: Option<&UserIdentity>,
    form: TodoForm,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Redirect, PageError> {
    let todo_id = form.todo_id();
    info!(?todo_id, "Editing todo from form");
    let update = UpdateTodo {
        priority: form.priority()?,
        title: form.title,
    };

    let outcome = todo_service
        .update_todo(viewer, todo_id, &update, &mut *ext_cxn, &DbTodoWriter)
        .await
        .map_err(PageError::mutation("update"))?;

    Ok(back_to_list(outcome, page_cache))
}

async fn delete_todo(
    viewer: Option<&UserIdentity>,
    form: TodoForm,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Redirect, PageError> {
    let todo_id = form.todo_id();
    info!(?todo_id, "Deleting todo from form");

    let outcome = todo_service
        .delete_todo(viewer, todo_id, &mut *ext_cxn, &DbTodoWriter)
        .await
        .map_err(PageError::mutation("delete"))?;

    Ok(back_to_list(outcome, page_cache))
}
