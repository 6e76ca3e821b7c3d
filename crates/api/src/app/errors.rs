use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use orderdesk_ordering::OrderError;

/// Map a transaction failure onto a status code and a structured body.
///
/// Offending identifiers travel in `details` as JSON arrays so clients can
/// render their own messages instead of parsing ours.
pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    let message = err.to_string();
    match err {
        OrderError::CustomerNotFound(id) => json_error_with_details(
            StatusCode::NOT_FOUND,
            "customer_not_found",
            message,
            json!({ "customer_id": id }),
        ),
        OrderError::EmptyOrder => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "empty_order", message)
        }
        OrderError::ProductsNotFound { ids } => json_error_with_details(
            StatusCode::NOT_FOUND,
            "products_not_found",
            message,
            json!({ "product_ids": ids }),
        ),
        OrderError::InsufficientStock { ids } => json_error_with_details(
            StatusCode::CONFLICT,
            "insufficient_stock",
            message,
            json!({ "product_ids": ids }),
        ),
        OrderError::StockRaceLost => json_error(StatusCode::CONFLICT, "stock_race_lost", message),
        OrderError::PersistenceFailure(_) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", message)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

fn json_error_with_details(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "details": details,
        })),
    )
        .into_response()
}
