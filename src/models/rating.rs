use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::PublicUser;

/// One buyer's score for one completed sale. Unique per (listingId, buyerId),
/// enforced by an index on the collection.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SellerRating {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub listing_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SellerRating {
    pub fn new(
        seller_id: Uuid,
        buyer_id: Uuid,
        listing_id: Uuid,
        rating: i32,
        review: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        SellerRating {
            id: Uuid::new_v4(),
            seller_id,
            buyer_id,
            listing_id,
            rating,
            review,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Denormalized per-seller aggregate. Recomputed from the rating rows on
/// every write, never mutated on its own.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SellerProfile {
    pub seller_id: Uuid,
    pub average_rating: f64,
    pub total_ratings: i64,
    pub updated_at: i64,
}

impl SellerProfile {
    pub fn empty(seller_id: Uuid) -> Self {
        SellerProfile {
            seller_id,
            average_rating: 0.0,
            total_ratings: 0,
            updated_at: chrono::Utc::now().timestamp(),
        }
    }
}

/// Rating as served to clients: the row plus the restricted buyer view.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    #[serde(flatten)]
    pub rating: SellerRating,
    pub buyer: Option<PublicUser>,
}

/// Answer to "can this buyer rate this listing, and have they already?".
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BuyerRatingState {
    pub listing_id: Uuid,
    pub seller_id: Uuid,
    pub can_rate: bool,
    pub has_rated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_value: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}
