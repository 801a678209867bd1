use utoipa::OpenApi;

use crate::routing_utils::BasicErrorResponse;

pub mod todo;

pub use todo::*;

/// Schemas and shared responses for the DTOs used across the API
#[derive(OpenApi)]
#[openapi(
    components(
        schemas(TodoItem, NewTodo, UpdateTodo, MutationReceipt),
        responses(BasicErrorResponse),
    )
)]
pub struct OpenApiSchemas;
