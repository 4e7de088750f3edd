use quickcart_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::admin::{UpdateCartStatusRequest, UpdateOrderStatusRequest},
    dto::auth::RegisterRequest,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    dto::orders::{OrderLine, PlaceOrderRequest},
    entity::enums::{CartStatus, OrderStatus, Role},
    entity::products::{self, ActiveModel as ProductActive, Entity as Products},
    entity::users::ActiveModel as UserActive,
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::Pagination,
    services::{admin_service, auth_service, cart_service, dashboard_service, order_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

// Integration tests run against a real Postgres and are skipped when no
// database is configured in the environment. Each test creates its own users
// and products so they can run concurrently on a shared database.

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run store flow tests."
            );
            return Ok(None);
        }
    };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    Ok(Some(AppState { pool, orm }))
}

async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let id = Uuid::new_v4();
    UserActive {
        id: Set(id),
        name: Set("test user".into()),
        email: Set(format!("{id}@example.com")),
        password_hash: Set("dummy".into()),
        role: Set(role),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser { user_id: id, role })
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
    reorder_level: i32,
) -> anyhow::Result<products::Model> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        category: Set("Test".into()),
        price: Set(price),
        stock: Set(stock),
        reorder_level: Set(reorder_level),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(product)
}

async fn stock_of(state: &AppState, id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .expect("product exists");
    Ok(product.stock)
}

fn one_line(product_id: Uuid, quantity: i32) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items: vec![OrderLine {
            product_id,
            quantity,
        }],
    }
}

// Stock 5: adding 3 succeeds, adding 3 more fails and leaves the cart at 3,
// then ordering 5 directly succeeds and drains the stock.
#[tokio::test]
async fn cart_checks_stock_but_order_decrements_it() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, "widget", 1_000, 5, 2).await?;

    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await?;

    let err = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 3,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    let cart = cart_service::list_cart(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    // Cart never touched stock.
    assert_eq!(stock_of(&state, product.id).await?, 5);

    let placed = order_service::place_order(&state, &customer, one_line(product.id, 5))
        .await?
        .data
        .unwrap();
    assert_eq!(placed.order.total_amount, 5_000);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(stock_of(&state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn adding_same_product_twice_merges_into_one_row() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, "gadget", 500, 10, 2).await?;

    for quantity in [1, 2] {
        cart_service::add_to_cart(
            &state,
            &customer,
            AddToCartRequest {
                product_id: product.id,
                quantity,
            },
        )
        .await?;
    }

    let cart = cart_service::list_cart(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1, "adds must merge, never duplicate");
    assert_eq!(cart.items[0].quantity, 3);

    Ok(())
}

#[tokio::test]
async fn failed_order_leaves_stock_and_orders_untouched() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let small = create_product(&state, "scarce", 700, 2, 1).await?;
    let plenty = create_product(&state, "plenty", 300, 50, 5).await?;

    // Single line over stock.
    let err = order_service::place_order(&state, &customer, one_line(small.id, 3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&state, small.id).await?, 2);

    // Mixed list: the valid line must roll back with the invalid one.
    let err = order_service::place_order(
        &state,
        &customer,
        PlaceOrderRequest {
            items: vec![
                OrderLine {
                    product_id: plenty.id,
                    quantity: 1,
                },
                OrderLine {
                    product_id: small.id,
                    quantity: 99,
                },
            ],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&state, plenty.id).await?, 50);
    assert_eq!(stock_of(&state, small.id).await?, 2);

    let orders = order_service::list_orders(
        &state,
        &customer,
        quickcart_api::routes::params::OrderListQuery {
            pagination: Pagination {
                page: None,
                per_page: None,
            },
            status: None,
            sort_order: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(orders.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn duplicate_lines_cannot_jointly_overdraw_stock() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, "split", 100, 5, 1).await?;

    let err = order_service::place_order(
        &state,
        &customer,
        PlaceOrderRequest {
            items: vec![
                OrderLine {
                    product_id: product.id,
                    quantity: 3,
                },
                OrderLine {
                    product_id: product.id,
                    quantity: 3,
                },
            ],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&state, product.id).await?, 5);

    Ok(())
}

#[tokio::test]
async fn order_total_is_frozen_against_later_price_changes() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "volatile", 1_000, 5, 1).await?;

    let placed = order_service::place_order(&state, &customer, one_line(product.id, 2))
        .await?
        .data
        .unwrap();
    assert_eq!(placed.order.total_amount, 2_000);

    quickcart_api::services::product_service::update_product(
        &state,
        &admin,
        product.id,
        quickcart_api::dto::products::UpdateProductRequest {
            price: Some(9_999),
            ..Default::default()
        },
    )
    .await?;

    let fetched = order_service::get_order(&state, &customer, placed.order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(fetched.order.total_amount, 2_000);
    let line_sum: i64 = fetched
        .items
        .iter()
        .map(|item| item.price_each * i64::from(item.quantity))
        .sum();
    assert_eq!(fetched.order.total_amount, line_sum);
    assert_eq!(fetched.items[0].price_each, 1_000);

    Ok(())
}

#[tokio::test]
async fn ordered_products_cannot_be_deleted() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let ordered = create_product(&state, "keepsake", 1_000, 5, 1).await?;
    let disposable = create_product(&state, "ephemeral", 1_000, 5, 1).await?;

    order_service::place_order(&state, &customer, one_line(ordered.id, 1)).await?;

    let err =
        quickcart_api::services::product_service::delete_product(&state, &admin, ordered.id)
            .await
            .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // A cart reference does not block deletion; the cart row goes with it.
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: disposable.id,
            quantity: 1,
        },
    )
    .await?;
    quickcart_api::services::product_service::delete_product(&state, &admin, disposable.id)
        .await?;
    let err = quickcart_api::services::product_service::get_product(&state, disposable.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

#[tokio::test]
async fn concurrent_orders_for_last_unit_admit_exactly_one() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let first = create_user(&state, Role::Customer).await?;
    let second = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, "last unit", 2_500, 1, 1).await?;

    let state_a = state.clone();
    let state_b = state.clone();
    let product_id = product.id;

    let task_a = tokio::spawn(async move {
        order_service::place_order(&state_a, &first, one_line(product_id, 1)).await
    });
    let task_b = tokio::spawn(async move {
        order_service::place_order(&state_b, &second, one_line(product_id, 1)).await
    });

    let result_a = task_a.await?;
    let result_b = task_b.await?;

    let successes = [&result_a, &result_b]
        .iter()
        .filter(|result| result.is_ok())
        .count();
    assert_eq!(successes, 1, "exactly one order may win the last unit");

    let loser = if result_a.is_err() {
        result_a.unwrap_err()
    } else {
        result_b.unwrap_err()
    };
    assert!(matches!(loser, AppError::InsufficientStock(_)));
    assert_eq!(stock_of(&state, product.id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn cart_approval_status_never_gates_checkout() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "unapproved", 800, 10, 2).await?;

    let cart_item = cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart_item.status, CartStatus::Pending);

    let rejected = admin_service::update_cart_status(
        &state,
        &admin,
        cart_item.id,
        UpdateCartStatusRequest {
            status: CartStatus::Rejected,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(rejected.status, CartStatus::Rejected);

    // Rejection has no effect on ordering, and ordering leaves the cart alone.
    order_service::place_order(&state, &customer, one_line(product.id, 2)).await?;

    let cart = cart_service::list_cart(
        &state,
        &customer,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].status, CartStatus::Rejected);

    Ok(())
}

#[tokio::test]
async fn update_cart_item_enforces_ownership_and_bounds() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let owner = create_user(&state, Role::Customer).await?;
    let stranger = create_user(&state, Role::Customer).await?;
    let product = create_product(&state, "bounded", 400, 5, 1).await?;

    let cart_item = cart_service::add_to_cart(
        &state,
        &owner,
        AddToCartRequest {
            product_id: product.id,
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();

    let err = cart_service::update_cart_item(
        &state,
        &stranger,
        cart_item.id,
        UpdateCartItemRequest { quantity: 1 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let err = cart_service::update_cart_item(
        &state,
        &owner,
        cart_item.id,
        UpdateCartItemRequest { quantity: 6 },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock(_)));

    // Quantity zero deletes the row.
    cart_service::update_cart_item(
        &state,
        &owner,
        cart_item.id,
        UpdateCartItemRequest { quantity: 0 },
    )
    .await?;
    let cart = cart_service::list_cart(
        &state,
        &owner,
        Pagination {
            page: None,
            per_page: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(cart.items.is_empty());

    Ok(())
}

#[tokio::test]
async fn summary_tracks_low_stock_and_delivered_revenue() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;

    let before = admin_service::summary(&state, &admin).await?.data.unwrap();

    // stock <= reorder_level flags the product immediately.
    create_product(&state, "nearly out", 100, 2, 5).await?;

    let seller_name = format!("bestseller-{}", Uuid::new_v4());
    let seller = create_product(&state, &seller_name, 50, 10_000, 1).await?;
    let placed = order_service::place_order(&state, &customer, one_line(seller.id, 10_000))
        .await?
        .data
        .unwrap();
    admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await?;

    let after = admin_service::summary(&state, &admin).await?.data.unwrap();
    assert!(after.low_stock >= before.low_stock + 2, "both new products sit at/below reorder level");
    assert!(after.delivered_orders >= before.delivered_orders + 1);
    assert!(after.delivered_revenue >= before.delivered_revenue + placed.order.total_amount);
    assert!(
        after
            .top_products
            .iter()
            .any(|top| top.name == seller_name),
        "delivered volume should put the product among top sellers"
    );

    Ok(())
}

#[tokio::test]
async fn dashboard_reports_own_activity_only() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "dash", 600, 10, 2).await?;

    let placed = order_service::place_order(&state, &customer, one_line(product.id, 2))
        .await?
        .data
        .unwrap();
    admin_service::update_order_status(
        &state,
        &admin,
        placed.order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::Delivered,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state,
        &customer,
        AddToCartRequest {
            product_id: product.id,
            quantity: 1,
        },
    )
    .await?;

    let dashboard = dashboard_service::customer_dashboard(&state, &customer)
        .await?
        .data
        .unwrap();
    assert_eq!(dashboard.stats.total_orders, 1);
    assert_eq!(dashboard.stats.delivered_orders, 1);
    assert_eq!(dashboard.stats.total_spent, placed.order.total_amount);
    assert_eq!(dashboard.cart_stats.total_cart_items, 1);
    assert_eq!(dashboard.cart_stats.cart_total_value, 600);
    assert_eq!(dashboard.orders.len(), 1);
    assert_eq!(dashboard.orders[0].items[0].name, "dash");

    Ok(())
}

#[tokio::test]
async fn registration_only_creates_customers() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let email = format!("{}@example.com", Uuid::new_v4());
    let user = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "new user".into(),
            email: email.clone(),
            password: "hunter2".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(user.role, Role::Customer);

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "imposter".into(),
            email,
            password: "hunter2".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "".into(),
            email: format!("{}@example.com", Uuid::new_v4()),
            password: "hunter2".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    Ok(())
}

#[tokio::test]
async fn role_guards_reject_the_wrong_side() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let customer = create_user(&state, Role::Customer).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let product = create_product(&state, "guarded", 100, 5, 1).await?;

    let err = admin_service::summary(&state, &customer).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = order_service::place_order(&state, &admin, one_line(product.id, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}
