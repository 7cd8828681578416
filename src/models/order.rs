use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A completed purchase. Creating one is what flips the listing to SOLD
/// and records who bought it.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub price: f64,
    pub created_at: i64,
}

impl Order {
    pub fn new(listing_id: Uuid, buyer_id: Uuid, seller_id: Uuid, price: f64) -> Self {
        Order {
            id: Uuid::new_v4(),
            listing_id,
            buyer_id,
            seller_id,
            price,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
