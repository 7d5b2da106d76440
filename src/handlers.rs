use crate::{
    AppState,
    auth::{self, AuthUser},
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    models::{
        CreatePaymentIntentRequest, CustomerFilter, DeleteResult, Document, Game, InsertResult,
        PaymentIntentResponse, UpdateResult, UserTokenResponse,
    },
    payments::{MAX_AMOUNT_MINOR_UNITS, PAYMENT_CURRENCY, amount_in_minor_units},
};
use axum::{Json, extract::State};
use serde_json::Value;
use uuid::Uuid;

/// Body of `GET /`.
pub const LIVENESS_MESSAGE: &str = "Running Sherrif's Video Game Server";

// --- Handlers ---

/// root
///
/// [Public Route] Static liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn root() -> &'static str {
    LIVENESS_MESSAGE
}

/// get_games
///
/// [Public Route] The whole catalogue, unfiltered and unpaginated. Documents are
/// returned as stored; `Game` only describes their usual shape.
#[utoipa::path(
    get,
    path = "/games",
    responses((status = 200, description = "All games", body = [Game]))
)]
pub async fn get_games(State(state): State<AppState>) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.repo.list_games().await?))
}

/// get_game
///
/// [Public Route] One game by identifier. An unknown id is answered with `null`, not 404.
#[utoipa::path(
    get,
    path = "/game/{id}",
    params(("id" = Uuid, Path, description = "Game ID")),
    responses(
        (status = 200, description = "The game, or null when absent", body = Game),
        (status = 400, description = "Malformed id")
    )
)]
pub async fn get_game(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Option<Document>>, ApiError> {
    Ok(Json(state.repo.get_game(id).await?))
}

/// get_reviews
///
/// [Public Route] Every review document, as stored.
#[utoipa::path(
    get,
    path = "/reviews",
    responses((status = 200, description = "All reviews as free-form JSON documents"))
)]
pub async fn get_reviews(State(state): State<AppState>) -> Result<Json<Vec<Document>>, ApiError> {
    Ok(Json(state.repo.list_reviews().await?))
}

/// upsert_user
///
/// [Public Route] Creates or merges the profile stored under `email`, then signs a new
/// one-day token for that email. A token is issued on every call, whether the write
/// inserted, modified, or changed nothing.
#[utoipa::path(
    put,
    path = "/user/{email}",
    params(("email" = String, Path, description = "User email (natural key)")),
    responses((status = 200, description = "Upsert result and a fresh bearer token", body = UserTokenResponse))
)]
pub async fn upsert_user(
    State(state): State<AppState>,
    ApiPath(email): ApiPath<String>,
    ApiJson(profile): ApiJson<Document>,
) -> Result<Json<UserTokenResponse>, ApiError> {
    let result = state.repo.upsert_user(&email, profile).await?;
    let token = auth::issue_token(&email, &state.config.jwt_secret)?;

    Ok(Json(UserTokenResponse { result, token }))
}

/// create_order
///
/// [Public Route] Stores the request body as a new order. Only `customer` is checked;
/// every other field is kept verbatim.
#[utoipa::path(
    post,
    path = "/order",
    responses(
        (status = 200, description = "Order stored", body = InsertResult),
        (status = 400, description = "Missing or malformed customer email")
    )
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(order): ApiJson<Document>,
) -> Result<Json<InsertResult>, ApiError> {
    check_customer(&order)?;
    Ok(Json(state.repo.insert_order(order).await?))
}

/// get_customer_orders
///
/// [Authenticated Route] Every order of `customer`. The query value must equal the
/// caller's token email byte for byte; anything else is refused, never filtered.
#[utoipa::path(
    get,
    path = "/order",
    params(CustomerFilter),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "The customer's orders as JSON documents"),
        (status = 403, description = "Customer does not match the token")
    )
)]
pub async fn get_customer_orders(
    AuthUser { email }: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<CustomerFilter>,
) -> Result<Json<Vec<Document>>, ApiError> {
    if filter.customer != email {
        return Err(ApiError::CustomerMismatch);
    }
    Ok(Json(state.repo.find_orders_by_customer(&filter.customer).await?))
}

/// get_order
///
/// [Authenticated Route] One order by identifier, or `null`.
///
/// *Note*: Unlike `get_customer_orders`, this does not compare the order's customer
/// with the token; any authenticated caller may read any order by id.
#[utoipa::path(
    get,
    path = "/order/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    security(("bearer" = [])),
    responses((status = 200, description = "The order document, or null when absent"))
)]
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Option<Document>>, ApiError> {
    Ok(Json(state.repo.get_order(id).await?))
}

/// confirm_order_payment
///
/// [Authenticated Route] Marks the order paid with the body's `transactionId` and
/// records the body as a payment, in one transaction.
#[utoipa::path(
    patch,
    path = "/order/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Order update result", body = UpdateResult),
        (status = 400, description = "transactionId missing")
    )
)]
pub async fn confirm_order_payment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payment): ApiJson<Document>,
) -> Result<Json<UpdateResult>, ApiError> {
    let transaction_id = payment
        .get("transactionId")
        .and_then(Value::as_str)
        .filter(|tx| !tx.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("transactionId is required".to_string()))?;

    let result = state
        .repo
        .confirm_order_payment(id, &transaction_id, payment)
        .await?;
    Ok(Json(result))
}

/// delete_order
///
/// [Authenticated Route] Removes one order. An unknown id yields `deletedCount: 0`.
#[utoipa::path(
    delete,
    path = "/order/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    security(("bearer" = [])),
    responses((status = 200, description = "Delete result", body = DeleteResult))
)]
pub async fn delete_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<DeleteResult>, ApiError> {
    Ok(Json(state.repo.delete_order(id).await?))
}

/// create_payment_intent
///
/// [Authenticated Route] Opens a card payment intent for `price` dollars and hands the
/// client secret back to the storefront. The secret is never logged.
#[utoipa::path(
    post,
    path = "/create-payment-intent",
    request_body = CreatePaymentIntentRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Client secret of the new intent", body = PaymentIntentResponse),
        (status = 400, description = "Price outside the chargeable range"),
        (status = 502, description = "Payment processor failure")
    )
)]
pub async fn create_payment_intent(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePaymentIntentRequest>,
) -> Result<Json<PaymentIntentResponse>, ApiError> {
    let amount = amount_in_minor_units(payload.price).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "price must be between 0.01 and {:.2}",
            MAX_AMOUNT_MINOR_UNITS as f64 / 100.0
        ))
    })?;
    let intent = state
        .payments
        .create_payment_intent(amount, PAYMENT_CURRENCY)
        .await?;

    Ok(Json(PaymentIntentResponse {
        client_secret: intent.client_secret,
    }))
}

/// check_customer
///
/// An order must name its customer by email: a string with a non-empty local part
/// and domain around a single `@`.
fn check_customer(order: &Document) -> Result<(), ApiError> {
    let customer = order
        .get("customer")
        .and_then(Value::as_str)
        .ok_or_else(|| ApiError::BadRequest("customer email is required".to_string()))?;

    match customer.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(ApiError::BadRequest(format!(
            "customer is not a valid email: {customer}"
        ))),
    }
}
