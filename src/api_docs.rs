use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::products::list_products,
        api::products::get_product,
        api::payments::create_intent,
        api::payments::webhook,
        api::payments::public_config,
    ),
    tags(
        (name = "ferramenta", description = "Ferramenta Lucini storefront API")
    )
)]
pub struct ApiDoc;
