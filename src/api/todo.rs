use crate::api::identity::CurrentUser;
use crate::api::todo_page::TODOS_PAGE_PATH;
use crate::domain::todo::MutationOutcome;
use crate::domain::todo::driving_ports::TodoPort;
use crate::domain::user::UserIdentity;
use crate::external_connections::ExternalConnectivity;
use crate::page_cache::PageCache;
use crate::routing_utils::{BasicErrorResponse, GenericErrorResponse, Json, ValidationErrorResponse};
use crate::{AppState, SharedData, domain, dto, persistence};
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::ErrorResponse;
use axum::routing::{get, patch};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(paths(list_todos, create_todo, update_todo, delete_todo))]
/// Defines the OpenAPI spec for todo endpoints
pub struct TodoApi;

/// Used to group todo endpoints together in the OpenAPI documentation
pub const TODO_API_GROUP: &str = "Todos";

/// Builds a router for the todo endpoints. Meant to be nested under "/api/todos".
pub fn todo_routes() -> Router<Arc<SharedData>> {
    Router::new()
        .route(
            "/",
            get(
                |State(app_state): AppState, CurrentUser(viewer): CurrentUser| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    list_todos(viewer.as_ref(), &mut ext_cxn, &app_state.todo_service).await
                },
            )
            .post(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Json(new_todo): Json<dto::NewTodo>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    create_todo(
                        viewer.as_ref(),
                        new_todo,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
        .route(
            "/:todo_id",
            patch(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Path(todo_id): Path<i32>,
                 Json(update): Json<dto::UpdateTodo>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    update_todo(
                        viewer.as_ref(),
                        todo_id,
                        update,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            )
            .delete(
                |State(app_state): AppState,
                 CurrentUser(viewer): CurrentUser,
                 Path(todo_id): Path<i32>| async move {
                    let mut ext_cxn = app_state.ext_cxn.clone();

                    delete_todo(
                        viewer.as_ref(),
                        todo_id,
                        &mut ext_cxn,
                        &app_state.todo_service,
                        &app_state.page_cache,
                    )
                    .await
                },
            ),
        )
}

/// A write through the API also makes the server-rendered list stale
fn receipt_for(outcome: MutationOutcome, page_cache: &PageCache) -> dto::MutationReceipt {
    if outcome.reached_store() {
        page_cache.invalidate(TODOS_PAGE_PATH);
    }

    dto::MutationReceipt::from(outcome)
}

#[utoipa::path(
    get,
    path = "/api/todos",
    tag = TODO_API_GROUP,
    responses(
        (status = 200, description = "The caller's active todos in insertion order", body = [dto::TodoItem]),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Lists the caller's todos. Anonymous callers get an empty list unless the service
/// runs in single-user mode.
async fn list_todos(
    viewer: Option<&UserIdentity>,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
) -> Result<Json<Vec<dto::TodoItem>>, ErrorResponse> {
    info!("Listing todos");
    let todo_reader = persistence::db_todo_driven_ports::DbTodoReader;

    let todos = todo_service
        .list_todos(viewer, &mut *ext_cxn, &todo_reader)
        .await
        .map_err(|err| {
            error!("Could not list todos: {err:#}");
            GenericErrorResponse::from(err)
        })?;

    Ok(Json(todos.into_iter().map(dto::TodoItem::from).collect()))
}

#[utoipa::path(
    post,
    path = "/api/todos",
    tag = TODO_API_GROUP,
    request_body = dto::NewTodo,
    responses(
        (status = 201, description = "The todo was created", body = dto::MutationReceipt),
        (status = 200, description = "Nothing was stored, see skip_reason", body = dto::MutationReceipt),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Creates a todo owned by the caller
async fn create_todo(
    viewer: Option<&UserIdentity>,
    new_todo: dto::NewTodo,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<(StatusCode, Json<dto::MutationReceipt>), ErrorResponse> {
    info!("Creating todo {new_todo}");
    let domain_todo =
        domain::todo::NewTodo::try_from(new_todo).map_err(ValidationErrorResponse::from)?;
    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;

    let outcome = todo_service
        .create_todo(viewer, &domain_todo, &mut *ext_cxn, &todo_writer)
        .await
        .map_err(|err| {
            error!("Could not create todo: {err:#}");
            GenericErrorResponse::from(err)
        })?;

    let status = match outcome {
        MutationOutcome::Created { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(receipt_for(outcome, page_cache))))
}

#[utoipa::path(
    patch,
    path = "/api/todos/{todo_id}",
    tag = TODO_API_GROUP,
    params(
        ("todo_id" = i32, Path, description = "The ID of the todo to update"),
    ),
    request_body = dto::UpdateTodo,
    responses(
        (status = 200, description = "The update ran. Zero affected rows means the todo isn't the caller's.", body = dto::MutationReceipt),
        (status = 400, response = BasicErrorResponse),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Replaces a todo's title and priority
async fn update_todo(
    viewer: Option<&UserIdentity>,
    todo_id: i32,
    update: dto::UpdateTodo,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Json<dto::MutationReceipt>, ErrorResponse> {
    info!("Updating todo {todo_id} to {update}");
    let domain_update =
        domain::todo::UpdateTodo::try_from(update).map_err(ValidationErrorResponse::from)?;
    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;

    let outcome = todo_service
        .update_todo(viewer, Some(todo_id), &domain_update, &mut *ext_cxn, &todo_writer)
        .await
        .map_err(|err| {
            error!("Could not update todo {todo_id}: {err:#}");
            GenericErrorResponse::from(err)
        })?;

    Ok(Json(receipt_for(outcome, page_cache)))
}

#[utoipa::path(
    delete,
    path = "/api/todos/{todo_id}",
    tag = TODO_API_GROUP,
    params(
        ("todo_id" = i32, Path, description = "The ID of the todo to delete"),
    ),
    responses(
        (status = 200, description = "The todo is hidden from listings. Its row is kept.", body = dto::MutationReceipt),
        (status = 401, response = BasicErrorResponse),
        (status = 500, response = BasicErrorResponse),
    ),
)]
/// Soft-deletes a todo
async fn delete_todo(
    viewer: Option<&UserIdentity>,
    todo_id: i32,
    ext_cxn: &mut impl ExternalConnectivity,
    todo_service: &impl TodoPort,
    page_cache: &PageCache,
) -> Result<Json<dto::MutationReceipt>, ErrorResponse> {
    info!("Deleting todo {todo_id}");
    let todo_writer = persistence::db_todo_driven_ports::DbTodoWriter;

    let outcome = todo_service
        .delete_todo(viewer, Some(todo_id), &mut *ext_cxn, &todo_writer)
        .await
        .map_err(|err| {
            error!("Could not delete todo {todo_id}: {err:#}");
            GenericErrorResponse::from(err)
        })?;

    Ok(Json(receipt_for(outcome, page_cache)))
}
