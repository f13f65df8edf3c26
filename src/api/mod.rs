use chrono::{DateTime, Utc};
use rocket::form::FromForm;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::{Request, Route, State, get, post, routes};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::io::Cursor;
use tracing::error;

use vcn_payments::DynGateway;

use crate::checkout::{self, CompleteOutcome, ReceiptRequest};
use crate::error::{CheckoutError, StoreError, ValidationError};
use crate::inventory::ItemFailure;
use crate::notify::DynNotifier;
use crate::store::{
    self, Order, OrderDraft, OrderSummary, SortDirection, SortField, SortSpec,
};
use crate::views::{self, ShopOrderView};

pub mod guards;

use guards::{AdminIdentity, BuyerIdentity, ShopOperator};

impl<'r> Responder<'r, 'static> for CheckoutError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let (status, retryable) = match &self {
            Self::Validation(_) => (Status::BadRequest, false),
            Self::Store(StoreError::OrderNotFound(_)) => (Status::NotFound, false),
            Self::Gateway(_) => (Status::BadGateway, true),
            Self::Notify(_) => (Status::BadGateway, false),
            Self::Store(_) => (Status::InternalServerError, false),
        };

        let message = if status == Status::InternalServerError {
            // Database and corrupt-state details stay out of responses
            error!("Internal error handling {}: {self}", request.uri());
            "internal error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "error": message, "retryable": retryable }).to_string();
        Response::build()
            .status(status)
            .header(ContentType::JSON)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[get("/health")]
pub fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct PaymentKeyResponse {
    pub gateway_public_key: String,
}

#[get("/payment-key")]
pub fn payment_key(_buyer: BuyerIdentity, gateway: &State<DynGateway>) -> Json<PaymentKeyResponse> {
    Json(PaymentKeyResponse {
        gateway_public_key: gateway.publishable_key().to_string(),
    })
}

#[derive(Serialize, Deserialize)]
pub struct InitiateResponse {
    pub client_secret: String,
    pub gateway_public_key: String,
    #[serde(rename = "orderId")]
    pub order_id: String,
}

#[post("/order/initiate", format = "json", data = "<draft>")]
pub async fn initiate_order(
    buyer: BuyerIdentity,
    draft: Json<OrderDraft>,
    pool: &State<SqlitePool>,
    gateway: &State<DynGateway>,
) -> Result<Json<InitiateResponse>, CheckoutError> {
    let initiated = checkout::initiate_order(pool, gateway, buyer.0, draft.into_inner()).await?;

    Ok(Json(InitiateResponse {
        client_secret: initiated.client_secret,
        gateway_public_key: gateway.publishable_key().to_string(),
        order_id: initiated.order_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    #[serde(rename = "orderId")]
    pub order_id: Option<String>,
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<String>,
}

#[derive(Serialize)]
pub struct CompleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub inventory_warnings: Vec<ItemFailure>,
}

#[post("/order/complete", format = "json", data = "<request>")]
pub async fn complete_order(
    _buyer: BuyerIdentity,
    request: Json<CompleteRequest>,
    pool: &State<SqlitePool>,
) -> Result<Json<CompleteResponse>, CheckoutError> {
    let request = request.into_inner();
    let outcome = checkout::complete_order(
        pool,
        request.order_id.as_deref().unwrap_or(""),
        request.payment_method.as_deref().unwrap_or(""),
    )
    .await?;

    let inventory_warnings = match outcome {
        CompleteOutcome::Completed { inventory_warnings } => inventory_warnings,
        CompleteOutcome::AlreadyCompleted => Vec::new(),
    };

    Ok(Json(CompleteResponse {
        success: true,
        inventory_warnings,
    }))
}

#[derive(Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[post("/order/receipt", format = "json", data = "<request>")]
pub async fn send_receipt(
    buyer: BuyerIdentity,
    request: Json<ReceiptRequest>,
    notifier: &State<DynNotifier>,
) -> Result<Json<SuccessResponse>, CheckoutError> {
    checkout::send_receipt(notifier, &buyer.0.email, request.into_inner()).await?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Debug, FromForm)]
pub struct OrderSelector {
    #[field(name = "paymentId")]
    pub payment_id: Option<String>,
    #[field(name = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[get("/order?<selector..>")]
pub async fn get_order(
    _buyer: BuyerIdentity,
    selector: OrderSelector,
    pool: &State<SqlitePool>,
) -> Result<Json<OrderResponse>, CheckoutError> {
    let order = Order::find_by_selector(
        pool,
        selector.payment_id.as_deref(),
        selector.order_id.as_deref(),
    )
    .await?;

    Ok(Json(OrderResponse { order }))
}

#[derive(Debug, FromForm)]
pub struct ProductQuery {
    #[field(name = "productId")]
    pub product_id: Option<String>,
}

#[derive(Serialize)]
pub struct OrdersResponse {
    pub orders: Vec<Order>,
}

#[get("/order/by-product?<query..>")]
pub async fn orders_by_product(
    _admin: AdminIdentity,
    query: ProductQuery,
    pool: &State<SqlitePool>,
) -> Result<Json<OrdersResponse>, CheckoutError> {
    let product_id = query
        .product_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingField("productId"))?;

    let orders = Order::find_with_product(pool, &product_id).await?;
    Ok(Json(OrdersResponse { orders }))
}

#[derive(Debug, FromForm)]
pub struct OrderIdQuery {
    #[field(name = "orderId")]
    pub order_id: Option<String>,
}

#[derive(Serialize)]
pub struct ShopOrderResponse {
    pub order: ShopOrderView,
}

#[get("/order/shop/one?<query..>")]
pub async fn shop_order(
    shop: ShopOperator,
    query: OrderIdQuery,
    pool: &State<SqlitePool>,
) -> Result<Json<ShopOrderResponse>, CheckoutError> {
    let order_id = query
        .order_id
        .filter(|id| !id.trim().is_empty())
        .ok_or(ValidationError::MissingField("orderId"))?;

    let order = views::get_one_for_shop(pool, &shop.shop_id, &order_id).await?;
    Ok(Json(ShopOrderResponse { order }))
}

#[derive(Debug, FromForm)]
pub struct BuyerOrdersQuery {
    #[field(default = 1)]
    pub page: i64,
    #[field(default = 10)]
    pub limit: i64,
    #[field(name = "paymentStatus")]
    pub payment_status: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

#[derive(Serialize)]
pub struct BuyerOrdersResponse {
    pub orders: Vec<OrderSummary>,
    #[serde(rename = "countOrders")]
    pub count_orders: i64,
}

#[get("/order/mine?<query..>")]
pub async fn my_orders(
    buyer: BuyerIdentity,
    query: BuyerOrdersQuery,
    pool: &State<SqlitePool>,
) -> Result<Json<BuyerOrdersResponse>, CheckoutError> {
    let payment_status = query
        .payment_status
        .as_deref()
        .map(|status| {
            status
                .parse()
                .map_err(|_| ValidationError::UnknownStatusFilter(status.to_string()))
        })
        .transpose()?;

    let sort = SortSpec {
        field: query
            .sort
            .as_deref()
            .map(SortField::parse)
            .transpose()?
            .unwrap_or_default(),
        direction: query
            .dir
            .as_deref()
            .map(SortDirection::parse)
            .transpose()?
            .unwrap_or_default(),
    };

    let page = store::list_for_buyer(
        pool,
        &buyer.0.id,
        query.page,
        query.limit,
        payment_status,
        sort,
    )
    .await?;

    Ok(Json(BuyerOrdersResponse {
        orders: page.orders,
        count_orders: page.count_orders,
    }))
}

#[derive(Debug, FromForm)]
pub struct ShopOrdersQuery {
    #[field(default = 1)]
    pub page: i64,
    #[field(default = 10)]
    pub limit: i64,
    #[field(name = "orderStatus")]
    pub order_status: Option<String>,
}

#[derive(Serialize)]
pub struct ShopOrdersResponse {
    pub orders: Vec<ShopOrderView>,
}

#[get("/order/shop?<query..>")]
pub async fn shop_orders(
    shop: ShopOperator,
    query: ShopOrdersQuery,
    pool: &State<SqlitePool>,
) -> Result<Json<ShopOrdersResponse>, CheckoutError> {
    let order_status = query
        .order_status
        .as_deref()
        .map(|status| {
            status
                .parse()
                .map_err(|_| ValidationError::UnknownStatusFilter(status.to_string()))
        })
        .transpose()?;

    let orders =
        views::list_for_shop(pool, &shop.shop_id, query.page, query.limit, order_status).await?;
    Ok(Json(ShopOrdersResponse { orders }))
}

#[derive(Serialize)]
pub struct AdminListResponse {
    pub list: Vec<serde_json::Value>,
}

#[get("/order/admin?<fields>")]
pub async fn admin_orders(
    _admin: AdminIdentity,
    fields: Option<String>,
    pool: &State<SqlitePool>,
) -> Result<Json<AdminListResponse>, CheckoutError> {
    let fields = fields.unwrap_or_default();
    let names: Vec<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect();

    let list = store::admin_projection(pool, &names).await?;
    Ok(Json(AdminListResponse { list }))
}

// Route Configuration
pub fn routes() -> Vec<Route> {
    routes![
        health,
        payment_key,
        initiate_order,
        complete_order,
        send_receipt,
        get_order,
        orders_by_product,
        shop_order,
        my_orders,
        shop_orders,
        admin_orders,
    ]
}
