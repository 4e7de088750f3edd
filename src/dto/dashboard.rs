use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::dto::cart::CartItemDto;
use crate::dto::orders::OrderItemDetail;
use crate::models::Order;

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardOrder {
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct OrderStats {
    pub total_orders: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub delivered_orders: i64,
    pub total_spent: i64,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CartStats {
    pub total_cart_items: i64,
    pub pending_cart_items: i64,
    pub approved_cart_items: i64,
    pub rejected_cart_items: i64,
    pub cart_total_value: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardResponse {
    pub orders: Vec<DashboardOrder>,
    pub cart_items: Vec<CartItemDto>,
    pub stats: OrderStats,
    pub cart_stats: CartStats,
}
