use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::dto::orders::OrderItemDetail;
use crate::entity::enums::{CartStatus, OrderStatus};
use crate::models::{Order, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartStatusRequest {
    pub status: CartStatus,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct TopProduct {
    pub name: String,
    pub total_sold: i64,
    pub revenue: i64,
}

/// Storefront-wide aggregate snapshot, recomputed on every call.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_products: i64,
    pub total_customers: i64,
    pub total_orders: i64,
    pub total_revenue: i64,
    pub delivered_revenue: i64,
    pub pending_orders: i64,
    pub approved_orders: i64,
    pub delivered_orders: i64,
    pub total_cart_items: i64,
    pub pending_cart_items: i64,
    pub approved_cart_items: i64,
    pub cart_total_value: i64,
    pub orders_today: i64,
    pub revenue_today: i64,
    pub low_stock: i64,
    pub top_products: Vec<TopProduct>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderDto {
    pub order: Order,
    pub customer: String,
    pub items: Vec<OrderItemDetail>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminOrderList {
    pub items: Vec<AdminOrderDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminCartDto {
    pub id: Uuid,
    pub quantity: i32,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_email: String,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AdminCartList {
    #[schema(value_type = Vec<AdminCartDto>)]
    pub items: Vec<AdminCartDto>,
}

/// Per-customer rollup; customers with no activity appear with zero counts.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct CustomerRollup {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub total_orders: i64,
    pub total_cart_items: i64,
    pub total_spent: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CustomerList {
    #[schema(value_type = Vec<CustomerRollup>)]
    pub items: Vec<CustomerRollup>,
}
