//! OpenAPI documentation and schema generation
//!
//! The document is generated at compile time by utoipa and served at
//! `/api/v1/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the link-resolver REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "link-resolver REST API",
        version = "0.1.0",
        description = "Resolves multi-hop download links into direct URLs and streams per-link progress as NDJSON",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6790", description = "Local development server")
    ),
    paths(
        crate::api::routes::resolve_links,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::types::ResolveRequest,
        crate::types::ResolveRequestItem,
        crate::types::ResolutionEvent,
        crate::types::EventLevel,
        crate::types::EventStatus,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "resolve", description = "Batch link resolution with a live progress stream"),
        (name = "system", description = "Health check and OpenAPI document"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `X-Api-Key` security scheme
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-Api-Key"),
                    ),
                ),
            );
        }
    }
}
