use serde::Deserialize;

use orderdesk_ordering::Order;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub customer_id: String,
    pub products: Vec<OrderItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

// -------------------------
// Response mapping
// -------------------------

pub fn order_to_json(order: &Order) -> serde_json::Value {
    serde_json::json!({
        "id": order.id.to_string(),
        "customer_id": order.customer_id.to_string(),
        "created_at": order.created_at,
        "total": order.total(),
        "line_items": order
            .line_items
            .iter()
            .map(|item| serde_json::json!({
                "product_id": item.product_id.to_string(),
                "quantity": item.quantity,
                "unit_price": item.unit_price,
                "total": item.total(),
            }))
            .collect::<Vec<_>>(),
    })
}
