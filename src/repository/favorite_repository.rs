use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::Result;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use uuid::Uuid;

use crate::models::favorite::Favorite;

pub struct FavoriteRepository {
    collection: Collection<Favorite>,
}

impl FavoriteRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let collection = db.collection::<Favorite>("favorites");
        FavoriteRepository { collection }
    }

    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "userId": 1, "listingId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index, None).await.map(|_| ())
    }

    pub async fn find_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<Option<Favorite>> {
        let filter = doc! {
            "userId": user_id.to_string(),
            "listingId": listing_id.to_string(),
        };
        self.collection.find_one(filter, None).await
    }

    pub async fn add_favorite(&self, favorite: &Favorite) -> Result<()> {
        self.collection.insert_one(favorite, None).await.map(|_| ())
    }

    pub async fn remove_favorite(&self, user_id: Uuid, listing_id: Uuid) -> Result<()> {
        let filter = doc! {
            "userId": user_id.to_string(),
            "listingId": listing_id.to_string(),
        };
        self.collection.delete_one(filter, None).await.map(|_| ())
    }

    pub async fn get_favorites_for_user(&self, user_id: Uuid) -> Result<Vec<Favorite>> {
        let filter = doc! { "userId": user_id.to_string() };
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let mut cursor = self.collection.find(filter, options).await?;
        let mut favorites = Vec::new();
        while let Some(favorite) = cursor.try_next().await? {
            favorites.push(favorite);
        }
        Ok(favorites)
    }
}
