use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminCartDto, AdminCartList, AdminOrderDto, AdminOrderList, CustomerList,
            CustomerRollup, SummaryStats, TopProduct, UpdateCartStatusRequest,
            UpdateOrderStatusRequest,
        },
        cart::{AddToCartRequest, CartItemDto, CartList, UpdateCartItemRequest},
        dashboard::{CartStats, DashboardOrder, DashboardResponse, OrderStats},
        orders::{OrderItemDetail, OrderLine, OrderList, OrderWithItems, PlaceOrderRequest},
        products::{CreateProductRequest, ProductList, UpdateProductRequest},
    },
    entity::enums::{CartStatus, OrderStatus, Role},
    models::{CartItem, Order, OrderItem, Product, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, dashboard, health, orders, params, products as product_routes},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        product_routes::list_products,
        product_routes::get_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_cart_item,
        orders::list_orders,
        orders::place_order,
        orders::get_order,
        dashboard::dashboard,
        admin::summary,
        admin::list_products,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::list_orders,
        admin::update_order_status,
        admin::list_carts,
        admin::update_cart_status,
        admin::list_customers
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            Role,
            CartStatus,
            OrderStatus,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartList,
            OrderLine,
            PlaceOrderRequest,
            OrderWithItems,
            OrderList,
            OrderItemDetail,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            SummaryStats,
            TopProduct,
            AdminOrderDto,
            AdminOrderList,
            AdminCartDto,
            AdminCartList,
            CustomerRollup,
            CustomerList,
            UpdateOrderStatusRequest,
            UpdateCartStatusRequest,
            DashboardOrder,
            DashboardResponse,
            OrderStats,
            CartStats,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<SummaryStats>,
            ApiResponse<DashboardResponse>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Public catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Customer", description = "Customer dashboard"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
