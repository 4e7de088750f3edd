use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::cart::CartItemDto,
    dto::dashboard::{CartStats, DashboardOrder, DashboardResponse, OrderStats},
    entity::cart_items::{Column as CartCol, Entity as CartItems},
    entity::orders::{Column as OrderCol, Entity as Orders},
    entity::products::Entity as Products,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_customer},
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

/// Everything the customer landing page needs in one response: own orders
/// with line detail, the cart with live product data, and both stat blocks.
pub async fn customer_dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardResponse>> {
    ensure_customer(user)?;

    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut details = order_service::order_item_details(&state.orm, &order_ids).await?;

    let orders: Vec<DashboardOrder> = orders
        .into_iter()
        .map(|o| DashboardOrder {
            items: details.remove(&o.id).unwrap_or_default(),
            order: o.into(),
        })
        .collect();

    let cart_items: Vec<CartItemDto> = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .find_also_related(Products)
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|p| CartItemDto {
                id: item.id,
                product: p.into(),
                quantity: item.quantity,
                status: item.status,
                created_at: item.created_at.with_timezone(&Utc),
                updated_at: item.updated_at.with_timezone(&Utc),
            })
        })
        .collect();

    let stats: OrderStats = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_orders,
               COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
               COUNT(*) FILTER (WHERE status = 'approved') AS approved_orders,
               COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders,
               COALESCE(SUM(total_amount) FILTER (WHERE status = 'delivered'), 0)::BIGINT
                   AS total_spent
        FROM orders
        WHERE user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    let cart_stats: CartStats = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_cart_items,
               COUNT(*) FILTER (WHERE ci.status = 'pending') AS pending_cart_items,
               COUNT(*) FILTER (WHERE ci.status = 'approved') AS approved_cart_items,
               COUNT(*) FILTER (WHERE ci.status = 'rejected') AS rejected_cart_items,
               COALESCE(SUM(ci.quantity::BIGINT * p.price), 0)::BIGINT AS cart_total_value
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        "#,
    )
    .bind(user.user_id)
    .fetch_one(&state.pool)
    .await?;

    let data = DashboardResponse {
        orders,
        cart_items,
        stats,
        cart_stats,
    };

    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}
