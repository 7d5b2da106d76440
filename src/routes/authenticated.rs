use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes that require a valid bearer token. The router returned here is wrapped in
/// `auth_middleware` by `create_router`, so no handler runs for an unauthenticated
/// request. Handlers that need the caller's email also take `AuthUser` directly.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /order?customer=<email>
        // Lists the caller's own orders. The customer must equal the token email.
        .route("/order", get(handlers::get_customer_orders))
        // GET/PATCH/DELETE /order/{id}
        // Read by id (no ownership check), confirm payment, or remove.
        .route(
            "/order/{id}",
            get(handlers::get_order)
                .patch(handlers::confirm_order_payment)
                .delete(handlers::delete_order),
        )
        // POST /create-payment-intent
        // Opens a processor-side card payment intent and returns its client secret.
        .route(
            "/create-payment-intent",
            post(handlers::create_payment_intent),
        )
}
