use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    dto::admin::{
        AdminCartDto, AdminCartList, AdminOrderDto, AdminOrderList, CustomerList, CustomerRollup,
        SummaryStats, TopProduct, UpdateCartStatusRequest, UpdateOrderStatusRequest,
    },
    entity::cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    entity::products::Entity as Products,
    entity::users::{Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CartItem, Order},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::order_service,
    state::AppState,
};

/// Aggregate snapshot over the whole store. Recomputed from scratch on every
/// call; there is no caching or incremental maintenance to invalidate.
pub async fn summary(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<SummaryStats>> {
    ensure_admin(user)?;

    let (total_products,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
        .fetch_one(&state.pool)
        .await?;
    let (total_customers,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'customer'")
            .fetch_one(&state.pool)
            .await?;

    #[derive(FromRow)]
    struct OrderAgg {
        total_orders: i64,
        total_revenue: i64,
        pending_orders: i64,
        approved_orders: i64,
        delivered_orders: i64,
        delivered_revenue: i64,
    }

    let order_agg: OrderAgg = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_orders,
               COALESCE(SUM(total_amount), 0)::BIGINT AS total_revenue,
               COUNT(*) FILTER (WHERE status = 'pending') AS pending_orders,
               COUNT(*) FILTER (WHERE status = 'approved') AS approved_orders,
               COUNT(*) FILTER (WHERE status = 'delivered') AS delivered_orders,
               COALESCE(SUM(total_amount) FILTER (WHERE status = 'delivered'), 0)::BIGINT
                   AS delivered_revenue
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    #[derive(FromRow)]
    struct CartAgg {
        total_cart_items: i64,
        pending_cart_items: i64,
        approved_cart_items: i64,
        cart_total_value: i64,
    }

    // Notional value counts every cart line regardless of approval status.
    let cart_agg: CartAgg = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS total_cart_items,
               COUNT(*) FILTER (WHERE ci.status = 'pending') AS pending_cart_items,
               COUNT(*) FILTER (WHERE ci.status = 'approved') AS approved_cart_items,
               COALESCE(SUM(ci.quantity::BIGINT * p.price), 0)::BIGINT AS cart_total_value
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    #[derive(FromRow)]
    struct TodayAgg {
        orders_today: i64,
        revenue_today: i64,
    }

    let today: TodayAgg = sqlx::query_as(
        r#"
        SELECT COUNT(*) AS orders_today,
               COALESCE(SUM(total_amount), 0)::BIGINT AS revenue_today
        FROM orders
        WHERE created_at::date = CURRENT_DATE
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let (low_stock,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM products WHERE stock <= reorder_level")
            .fetch_one(&state.pool)
            .await?;

    // Top sellers count delivered orders only.
    let top_products: Vec<TopProduct> = sqlx::query_as(
        r#"
        SELECT p.name,
               SUM(oi.quantity)::BIGINT AS total_sold,
               SUM(oi.quantity::BIGINT * oi.price_each)::BIGINT AS revenue
        FROM order_items oi
        JOIN products p ON p.id = oi.product_id
        JOIN orders o ON o.id = oi.order_id
        WHERE o.status = 'delivered'
        GROUP BY p.id, p.name
        ORDER BY total_sold DESC
        LIMIT 5
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let stats = SummaryStats {
        total_products,
        total_customers,
        total_orders: order_agg.total_orders,
        total_revenue: order_agg.total_revenue,
        delivered_revenue: order_agg.delivered_revenue,
        pending_orders: order_agg.pending_orders,
        approved_orders: order_agg.approved_orders,
        delivered_orders: order_agg.delivered_orders,
        total_cart_items: cart_agg.total_cart_items,
        pending_cart_items: cart_agg.pending_cart_items,
        approved_cart_items: cart_agg.approved_cart_items,
        cart_total_value: cart_agg.cart_total_value,
        orders_today: today.orders_today,
        revenue_today: today.revenue_today,
        low_stock,
        top_products,
    };

    Ok(ApiResponse::success("Summary", stats, Some(Meta::empty())))
}

pub async fn list_orders_admin(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<AdminOrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut details = order_service::order_item_details(&state.orm, &order_ids).await?;

    let user_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();
    let emails: HashMap<Uuid, String> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, u.email))
        .collect();

    let items = orders
        .into_iter()
        .map(|o| AdminOrderDto {
            customer: emails.get(&o.user_id).cloned().unwrap_or_default(),
            items: details.remove(&o.id).unwrap_or_default(),
            order: o.into(),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        AdminOrderList { items },
        Some(meta),
    ))
}

pub async fn list_carts_admin(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AdminCartList>> {
    ensure_admin(user)?;

    let rows = CartItems::find()
        .find_also_related(Products)
        .order_by_desc(CartCol::CreatedAt)
        .all(&state.orm)
        .await?;

    let user_ids: Vec<Uuid> = rows.iter().map(|(item, _)| item.user_id).collect();
    let customers: HashMap<Uuid, (String, String)> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, (u.name, u.email)))
        .collect();

    let items = rows
        .into_iter()
        .filter_map(|(item, product)| {
            let product = product?;
            let (customer_name, customer_email) =
                customers.get(&item.user_id).cloned().unwrap_or_default();
            Some(AdminCartDto {
                id: item.id,
                quantity: item.quantity,
                status: item.status,
                created_at: item.created_at.with_timezone(&Utc),
                updated_at: item.updated_at.with_timezone(&Utc),
                customer_name,
                customer_email,
                product: product.into(),
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "Carts",
        AdminCartList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CustomerList>> {
    ensure_admin(user)?;

    let items: Vec<CustomerRollup> = sqlx::query_as(
        r#"
        SELECT u.id, u.name, u.email, u.created_at,
               (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id) AS total_orders,
               (SELECT COUNT(*) FROM cart_items ci WHERE ci.user_id = u.id) AS total_cart_items,
               (SELECT COALESCE(SUM(o.total_amount), 0)
                  FROM orders o
                 WHERE o.user_id = u.id AND o.status = 'delivered')::BIGINT AS total_spent
        FROM users u
        WHERE u.role = 'customer'
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    Ok(ApiResponse::success(
        "Customers",
        CustomerList { items },
        Some(Meta::empty()),
    ))
}

/// Admin may set any status from any status; only the value set is closed.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, status = ?order.status, "order status updated");

    Ok(ApiResponse::success(
        "Order updated",
        order.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_cart_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartStatusRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let existing = CartItems::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    let mut active: CartActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success(
        "Cart item status updated",
        item.into(),
        Some(Meta::empty()),
    ))
}
