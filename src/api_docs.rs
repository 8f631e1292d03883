use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::books::list_books,
        api::books::create_book,
        api::books::delete_book,
        api::loans::create_loan,
        api::loans::return_loan,
        // Add other endpoints here as we document them
    ),
    tags(
        (name = "openshelf", description = "OpenShelf library API")
    )
)]
pub struct ApiDoc;
