use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
    entity::cart_items::{ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
    entity::enums::CartStatus,
    entity::products::Entity as Products,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_customer},
    models::CartItem,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Any authenticated principal may read their own cart.
pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();

    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .find_also_related(Products)
        .order_by_desc(CartCol::CreatedAt)
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let total = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .count(&state.orm)
        .await? as i64;

    let items = rows
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

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    ensure_customer(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    // A second add merges into the existing line instead of duplicating it.
    let new_quantity = existing
        .as_ref()
        .map_or(payload.quantity, |item| item.quantity + payload.quantity);

    // Stock is only checked here; it is decremented at order placement.
    if new_quantity > product.stock {
        return Err(AppError::InsufficientStock(product.id));
    }

    let cart_item = match existing {
        Some(item) => {
            let mut active: CartActive = item.into();
            active.quantity = Set(new_quantity);
            active.updated_at = Set(Utc::now().into());
            active.update(&txn).await?
        }
        None => {
            CartActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(user.user_id),
                product_id: Set(payload.product_id),
                quantity: Set(new_quantity),
                status: Set(CartStatus::Pending),
                created_at: NotSet,
                updated_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    Ok(ApiResponse::success("Item added to cart", cart_item.into(), None))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    cart_item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<Option<CartItem>>> {
    ensure_customer(user)?;
    if payload.quantity < 0 {
        return Err(AppError::Validation(
            "quantity must not be negative".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let item = CartItems::find_by_id(cart_item_id)
        .filter(CartCol::UserId.eq(user.user_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if payload.quantity == 0 {
        CartItems::delete_by_id(item.id).exec(&txn).await?;
        txn.commit().await?;
        return Ok(ApiResponse::success(
            "Cart item removed",
            None,
            Some(Meta::empty()),
        ));
    }

    let product = Products::find_by_id(item.product_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if payload.quantity > product.stock {
        return Err(AppError::InsufficientStock(product.id));
    }

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    active.updated_at = Set(Utc::now().into());
    let item = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Cart updated",
        Some(item.into()),
        Some(Meta::empty()),
    ))
}

pub async fn remove_cart_item(
    state: &AppState,
    user: &AuthUser,
    cart_item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_customer(user)?;

    let result = CartItems::delete_many()
        .filter(CartCol::Id.eq(cart_item_id))
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    Ok(ApiResponse::success(
        "Item removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
