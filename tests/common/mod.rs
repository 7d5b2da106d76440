#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;
use video_game_store::{
    AppConfig, AppState, MockPaymentGateway, create_router,
    models::{DeleteResult, Document, ID_FIELD, InsertResult, UpdateResult},
    payments::PaymentState,
    repository::{RepoError, Repository, RepositoryState, strip_id},
};

pub const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";

// --- In-Memory Repository ---

/// Collection-per-Vec stand-in for Postgres. Mirrors the upsert, filter and
/// all-or-nothing payment semantics of `PostgresRepository`.
#[derive(Default)]
pub struct InMemoryRepository {
    games: Mutex<Vec<(Uuid, Document)>>,
    reviews: Mutex<Vec<Document>>,
    users: Mutex<Vec<(Uuid, Document)>>,
    orders: Mutex<Vec<(Uuid, Document)>>,
    payments: Mutex<Vec<(Uuid, Document)>>,
    /// Every call fails as if the database were unreachable.
    pub unavailable: bool,
    /// The payment insert of `confirm_order_payment` fails; the order must stay untouched.
    pub fail_payment_insert: bool,
}

fn with_id(id: Uuid, doc: &Document) -> Document {
    let mut doc = doc.clone();
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn failing_payment_insert() -> Self {
        Self {
            fail_payment_insert: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.unavailable {
            Err(RepoError::Database(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }

    pub fn seed_game(&self, game: Value) -> Uuid {
        let Value::Object(doc) = game else {
            panic!("game seed must be a JSON object");
        };
        let id = Uuid::new_v4();
        self.games.lock().unwrap().push((id, strip_id(doc)));
        id
    }

    pub fn seed_review(&self, review: Value) {
        let Value::Object(doc) = review else {
            panic!("review seed must be a JSON object");
        };
        self.reviews.lock().unwrap().push(doc);
    }

    pub fn seed_order(&self, order: Value) -> Uuid {
        let Value::Object(doc) = order else {
            panic!("order seed must be a JSON object");
        };
        let id = Uuid::new_v4();
        self.orders.lock().unwrap().push((id, doc));
        id
    }

    pub fn users(&self) -> Vec<Document> {
        self.users.lock().unwrap().iter().map(|(_, doc)| doc.clone()).collect()
    }

    pub fn orders_is_empty(&self) -> bool {
        self.orders.lock().unwrap().is_empty()
    }

    pub fn payments(&self) -> Vec<Document> {
        self.payments.lock().unwrap().iter().map(|(_, doc)| doc.clone()).collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn list_games(&self) -> Result<Vec<Document>, RepoError> {
        self.check()?;
        let games = self.games.lock().unwrap();
        Ok(games.iter().map(|(id, doc)| with_id(*id, doc)).collect())
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Document>, RepoError> {
        self.check()?;
        let games = self.games.lock().unwrap();
        Ok(games
            .iter()
            .find(|(game_id, _)| *game_id == id)
            .map(|(game_id, doc)| with_id(*game_id, doc)))
    }

    async fn list_reviews(&self) -> Result<Vec<Document>, RepoError> {
        self.check()?;
        Ok(self.reviews.lock().unwrap().clone())
    }

    async fn upsert_user(&self, email: &str, profile: Document) -> Result<UpdateResult, RepoError> {
        self.check()?;
        let mut users = self.users.lock().unwrap();
        let mut incoming = strip_id(profile);
        incoming.insert("email".to_string(), Value::String(email.to_string()));

        let existing = users
            .iter()
            .position(|(_, doc)| doc.get("email").and_then(Value::as_str) == Some(email));

        match existing {
            Some(index) => {
                let doc = &mut users[index].1;
                let before = doc.clone();
                doc.extend(incoming);
                Ok(UpdateResult::matched(*doc != before))
            }
            None => {
                let id = Uuid::new_v4();
                users.push((id, incoming));
                Ok(UpdateResult::upserted(id))
            }
        }
    }

    async fn insert_order(&self, order: Document) -> Result<InsertResult, RepoError> {
        self.check()?;
        let id = Uuid::new_v4();
        self.orders.lock().unwrap().push((id, strip_id(order)));
        Ok(InsertResult::new(id))
    }

    async fn find_orders_by_customer(&self, customer: &str) -> Result<Vec<Document>, RepoError> {
        self.check()?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, doc)| doc.get("customer").and_then(Value::as_str) == Some(customer))
            .map(|(id, doc)| with_id(*id, doc))
            .collect())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Document>, RepoError> {
        self.check()?;
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|(order_id, _)| *order_id == id)
            .map(|(order_id, doc)| with_id(*order_id, doc)))
    }

    async fn confirm_order_payment(
        &self,
        id: Uuid,
        transaction_id: &str,
        payment: Document,
    ) -> Result<UpdateResult, RepoError> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let Some((_, order)) = orders.iter_mut().find(|(order_id, _)| *order_id == id) else {
            return Ok(UpdateResult::unmatched());
        };

        // Nothing is applied before the payment write is known to succeed.
        if self.fail_payment_insert {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }

        let before = order.clone();
        order.insert("paid".to_string(), Value::Bool(true));
        order.insert(
            "transactionId".to_string(),
            Value::String(transaction_id.to_string()),
        );
        let modified = *order != before;

        self.payments
            .lock()
            .unwrap()
            .push((Uuid::new_v4(), strip_id(payment)));
        Ok(UpdateResult::matched(modified))
    }

    async fn delete_order(&self, id: Uuid) -> Result<DeleteResult, RepoError> {
        self.check()?;
        let mut orders = self.orders.lock().unwrap();
        let before = orders.len();
        orders.retain(|(order_id, _)| *order_id != id);
        Ok(DeleteResult::new((before - orders.len()) as u64))
    }
}

// --- Application Harness ---

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub payments: Arc<MockPaymentGateway>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(InMemoryRepository::new(), MockPaymentGateway::new())
}

pub fn spawn_app_with(repo: InMemoryRepository, payments: MockPaymentGateway) -> TestApp {
    let repo = Arc::new(repo);
    let payments = Arc::new(payments);

    let state = AppState {
        repo: repo.clone() as RepositoryState,
        payments: payments.clone() as PaymentState,
        config: test_config(),
    };

    TestApp {
        router: create_router(state),
        repo,
        payments,
    }
}

/// `Authorization` header value carrying a valid token for `email`.
pub fn bearer(email: &str) -> String {
    let token = video_game_store::auth::issue_token(email, TEST_JWT_SECRET).unwrap();
    format!("Bearer {token}")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).expect("response body is not UTF-8")
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, auth: Option<&str>) -> TestResponse {
        let mut builder = Request::get(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: &Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        self.send(builder.body(Body::from(serde_json::to_vec(body).unwrap())).unwrap())
            .await
    }
}
