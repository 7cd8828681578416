use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ListingStatus {
    Active,
    Sold,   // sale completed, prerequisite for rating
    Hidden,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: ListingStatus,
    pub sold_to_user_id: Option<Uuid>,
    pub created_at: i64,
    pub deleted_at: Option<i64>, // soft delete marker
}

impl Listing {
    pub fn new(
        seller_id: Uuid,
        title: String,
        description: String,
        price: f64,
        category: Option<String>,
        image_url: Option<String>,
    ) -> Self {
        Listing {
            id: Uuid::new_v4(),
            seller_id,
            title,
            description,
            price,
            category,
            image_url,
            status: ListingStatus::Active,
            sold_to_user_id: None,
            created_at: chrono::Utc::now().timestamp(),
            deleted_at: None,
        }
    }
}
