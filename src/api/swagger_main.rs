use crate::dto;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(info(
    title = "Owned Todos API",
    description = "Per-user todo lists. Every call is scoped to the identity behind the request's access token."
))]
struct RootApi;

/// Builds the swagger UI route and the raw OpenAPI document, stitched together from the
/// [dto] schemas and each API submodule's paths
pub fn build_documentation() -> SwaggerUi {
    let mut api_docs = RootApi::openapi();
    api_docs.merge(dto::OpenApiSchemas::openapi());
    api_docs.merge(super::todo::TodoApi::openapi());

    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api_docs)
}
