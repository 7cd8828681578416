use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Bookmark of a listing by a user. Unique per (userId, listingId).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub user_id: Uuid,
    pub listing_id: Uuid,
    pub created_at: i64,
}

impl Favorite {
    pub fn new(user_id: Uuid, listing_id: Uuid) -> Self {
        Favorite {
            user_id,
            listing_id,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
