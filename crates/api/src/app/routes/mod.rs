use axum::Router;

pub mod orders;
pub mod system;

pub fn router() -> Router {
    Router::new().merge(orders::router())
}
