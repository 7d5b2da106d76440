use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: the liveness probe, the read-only
/// catalogue, the user upsert that issues tokens, and order placement.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /
        // Static liveness string for monitors and load balancers.
        .route("/", get(handlers::root))
        // GET /games
        // Whole catalogue, unfiltered.
        .route("/games", get(handlers::get_games))
        // GET /game/{id}
        // One game; `null` when the id is unknown.
        .route("/game/{id}", get(handlers::get_game))
        // GET /reviews
        .route("/reviews", get(handlers::get_reviews))
        // PUT /user/{email}
        // Upserts the profile and returns a fresh one-day bearer token.
        .route("/user/{email}", put(handlers::upsert_user))
        // POST /order
        // Places an order. Listing and mutating orders requires a token.
        .route("/order", post(handlers::create_order))
}
