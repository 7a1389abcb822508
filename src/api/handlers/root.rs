use axum::response::IntoResponse;

// Undocumented landing route; deliberately says nothing about the service.
pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}
