use futures::stream::TryStreamExt;
use mongodb::bson::{doc, Bson};
use mongodb::error::Result;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};
use uuid::Uuid;

use crate::models::listing::{Listing, ListingStatus};

pub struct ListingRepository {
    collection: Collection<Listing>,
}

impl ListingRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let collection = db.collection::<Listing>("listings");
        ListingRepository { collection }
    }

    pub async fn create_listing(&self, listing: &Listing) -> Result<()> {
        self.collection.insert_one(listing, None).await.map(|_| ())
    }

    /// Lookup by id regardless of soft-delete state. The rating flow needs
    /// to see deleted listings too.
    pub async fn find_listing_any(&self, listing_id: Uuid) -> Result<Option<Listing>> {
        let filter = doc! { "id": listing_id.to_string() };
        self.collection.find_one(filter, None).await
    }

    /// Lookup by id, soft-deleted listings excluded.
    pub async fn find_listing_by_id(&self, listing_id: Uuid) -> Result<Option<Listing>> {
        let filter = doc! { "id": listing_id.to_string(), "deletedAt": Bson::Null };
        self.collection.find_one(filter, None).await
    }

    pub async fn get_active_listings(&self) -> Result<Vec<Listing>> {
        let filter = doc! { "status": "ACTIVE", "deletedAt": Bson::Null };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let mut cursor = self.collection.find(filter, options).await?;
        let mut listings = Vec::new();
        while let Some(listing) = cursor.try_next().await? {
            listings.push(listing);
        }
        Ok(listings)
    }

    pub async fn get_listings_by_seller(&self, seller_id: Uuid) -> Result<Vec<Listing>> {
        let filter = doc! { "sellerId": seller_id.to_string(), "deletedAt": Bson::Null };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let mut cursor = self.collection.find(filter, options).await?;
        let mut listings = Vec::new();
        while let Some(listing) = cursor.try_next().await? {
            listings.push(listing);
        }
        Ok(listings)
    }

    pub async fn update_listing_fields(
        &self,
        listing_id: Uuid,
        new_title: Option<String>,
        new_description: Option<String>,
        new_price: Option<f64>,
        new_category: Option<String>,
        new_image_url: Option<String>,
    ) -> Result<()> {
        let filter = doc! { "id": listing_id.to_string() };

        let mut update_fields = doc! {};
        if let Some(title) = new_title {
            update_fields.insert("title", title);
        }
        if let Some(description) = new_description {
            update_fields.insert("description", description);
        }
        if let Some(price) = new_price {
            update_fields.insert("price", price);
        }
        if let Some(category) = new_category {
            update_fields.insert("category", category);
        }
        if let Some(image_url) = new_image_url {
            update_fields.insert("imageUrl", image_url);
        }

        if update_fields.is_empty() {
            return Ok(());
        }

        let update = doc! { "$set": update_fields };
        self.collection.update_one(filter, update, None).await.map(|_| ())
    }

    /// ACTIVE -> SOLD, recording the purchaser. The filter doubles as the
    /// guard: only a still-active listing matches, so of two concurrent
    /// buyers exactly one claims it. Returns whether the claim landed.
    pub async fn mark_sold(&self, listing_id: Uuid, buyer_id: Uuid) -> Result<bool> {
        let filter = doc! {
            "id": listing_id.to_string(),
            "status": "ACTIVE",
            "deletedAt": Bson::Null,
        };
        let update = doc! {
            "$set": {
                "status": "SOLD",
                "soldToUserId": buyer_id.to_string(),
            }
        };
        let result = self.collection.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }

    pub async fn set_status(&self, listing_id: Uuid, status: ListingStatus) -> Result<()> {
        let status_str = match status {
            ListingStatus::Active => "ACTIVE",
            ListingStatus::Sold => "SOLD",
            ListingStatus::Hidden => "HIDDEN",
        };
        let filter = doc! { "id": listing_id.to_string() };
        let update = doc! { "$set": { "status": status_str } };
        self.collection.update_one(filter, update, None).await.map(|_| ())
    }

    pub async fn soft_delete_listing(&self, listing_id: Uuid) -> Result<()> {
        let filter = doc! { "id": listing_id.to_string() };
        let update = doc! { "$set": { "deletedAt": chrono::Utc::now().timestamp() } };
        self.collection.update_one(filter, update, None).await.map(|_| ())
    }
}
