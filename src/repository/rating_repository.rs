use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, Result, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Client, Collection, IndexModel};
use uuid::Uuid;

use crate::models::rating::{SellerProfile, SellerRating};

/// True when the store rejected a write because it would duplicate a unique
/// key. Concurrent double-submits for the same (listing, buyer) land here.
pub fn is_duplicate_key_error(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        _ => false,
    }
}

pub struct RatingRepository {
    ratings: Collection<SellerRating>,
    profiles: Collection<SellerProfile>,
}

impl RatingRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let ratings = db.collection::<SellerRating>("seller_ratings");
        let profiles = db.collection::<SellerProfile>("seller_profiles");
        RatingRepository { ratings, profiles }
    }

    /// One rating per (listing, buyer), enforced by the store so a race
    /// between duplicate submissions surfaces as a write error.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let rating_index = IndexModel::builder()
            .keys(doc! { "listingId": 1, "buyerId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.ratings.create_index(rating_index, None).await?;

        let profile_index = IndexModel::builder()
            .keys(doc! { "sellerId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.profiles.create_index(profile_index, None).await.map(|_| ())
    }

    pub async fn find_by_listing_and_buyer(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<Option<SellerRating>> {
        let filter = doc! {
            "listingId": listing_id.to_string(),
            "buyerId": buyer_id.to_string(),
        };
        self.ratings.find_one(filter, None).await
    }

    pub async fn insert_rating(&self, rating: &SellerRating) -> Result<()> {
        self.ratings.insert_one(rating, None).await.map(|_| ())
    }

    /// In-place update of score and review for an existing rating.
    pub async fn update_rating(
        &self,
        rating_id: Uuid,
        rating: i32,
        review: Option<&str>,
    ) -> Result<()> {
        let filter = doc! { "id": rating_id.to_string() };
        let update = doc! {
            "$set": {
                "rating": rating,
                "review": review,
                "updatedAt": chrono::Utc::now().timestamp(),
            }
        };
        self.ratings.update_one(filter, update, None).await.map(|_| ())
    }

    /// All ratings for a seller, newest first.
    pub async fn get_ratings_for_seller(&self, seller_id: Uuid) -> Result<Vec<SellerRating>> {
        let filter = doc! { "sellerId": seller_id.to_string() };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let mut cursor = self.ratings.find(filter, options).await?;
        let mut ratings = Vec::new();
        while let Some(rating) = cursor.try_next().await? {
            ratings.push(rating);
        }
        Ok(ratings)
    }

    pub async fn find_seller_profile(&self, seller_id: Uuid) -> Result<Option<SellerProfile>> {
        let filter = doc! { "sellerId": seller_id.to_string() };
        self.profiles.find_one(filter, None).await
    }

    /// Write the freshly recomputed aggregate, creating the profile row on
    /// the seller's first rating.
    pub async fn upsert_seller_profile(
        &self,
        seller_id: Uuid,
        average_rating: f64,
        total_ratings: i64,
    ) -> Result<()> {
        let filter = doc! { "sellerId": seller_id.to_string() };
        let update = doc! {
            "$set": {
                "averageRating": average_rating,
                "totalRatings": total_ratings,
                "updatedAt": chrono::Utc::now().timestamp(),
            },
            "$setOnInsert": {
                "sellerId": seller_id.to_string(),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.profiles.update_one(filter, update, options).await.map(|_| ())
    }
}
