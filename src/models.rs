use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::{FromRow, types::Json};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

/// Document
///
/// A schema-free record as stored in one of the collections. Reviews, users, orders
/// and payments are kept in this shape; the API passes them through untouched.
pub type Document = Map<String, Value>;

/// Name of the identifier field merged into every document returned to clients.
pub const ID_FIELD: &str = "_id";

// --- Storage Rows ---

/// DocumentRow
///
/// One row of a collection table: `(id UUID, doc JSONB)`.
#[derive(Debug, Clone, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub doc: Json<Document>,
}

impl DocumentRow {
    /// Flattens the row into the client-facing document, exposing the key as `_id`.
    pub fn into_document(self) -> Document {
        let mut doc = self.doc.0;
        doc.insert(ID_FIELD.to_string(), Value::String(self.id.to_string()));
        doc
    }
}

// --- Catalogue ---

/// Game
///
/// The usual shape of a catalogue entry, as published in the API docs. Stored game
/// documents are served as-is, so extra fields and loosely typed values pass through.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
#[serde(default)]
pub struct Game {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub description: String,
    // Image URL shown by the storefront.
    pub image: String,
}

// --- Write Acknowledgements ---

/// InsertResult
///
/// Acknowledgement of a single-document insert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

/// UpdateResult
///
/// Acknowledgement of a single-document update or upsert. `upserted_id` is only set
/// when the write created a new document.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

impl UpdateResult {
    /// The filter matched an existing document.
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: modified as u64,
            upserted_count: 0,
            upserted_id: None,
        }
    }

    /// Nothing matched the filter and nothing was written.
    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 0,
            upserted_id: None,
        }
    }

    /// Nothing matched, so a new document was inserted under `id`.
    pub fn upserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        }
    }
}

/// DeleteResult
///
/// Acknowledgement of a single-document delete. Deleting an absent id is not an error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}

// --- Request Payloads ---

/// CustomerFilter
///
/// Query string of `GET /order`. The value must equal the caller's token claim exactly.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CustomerFilter {
    /// Email of the customer whose orders are listed.
    pub customer: String,
}

/// CreatePaymentIntentRequest
///
/// Body of `POST /create-payment-intent`. The price is in major currency units (dollars).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    #[schema(example = 19.99)]
    pub price: f64,
}

// --- Responses ---

/// PaymentIntentResponse
///
/// The processor-issued secret the storefront uses to confirm the charge client-side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub client_secret: String,
}

/// UserTokenResponse
///
/// Response of `PUT /user/{email}`: the upsert acknowledgement plus a freshly signed token.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserTokenResponse {
    pub result: UpdateResult,
    pub token: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(id: Uuid, doc: Value) -> DocumentRow {
        let Value::Object(doc) = doc else {
            panic!("row document must be a JSON object");
        };
        DocumentRow { id, doc: Json(doc) }
    }

    #[test]
    fn stored_game_is_served_with_every_field_and_original_types() {
        let id = Uuid::new_v4();
        let stored = json!({
            "title": "Halo",
            "price": "59.99",
            "genre": "shooter",
            "rating": { "esrb": "M" }
        });

        let doc = row(id, stored).into_document();

        assert_eq!(
            Value::Object(doc),
            json!({
                "_id": id.to_string(),
                "title": "Halo",
                "price": "59.99",
                "genre": "shooter",
                "rating": { "esrb": "M" }
            })
        );
    }

    #[test]
    fn row_key_overrides_any_stored_id_field() {
        let id = Uuid::new_v4();

        let doc = row(id, json!({ "_id": "legacy-id", "title": "Celeste" })).into_document();

        assert_eq!(doc[ID_FIELD], id.to_string());
    }
}
