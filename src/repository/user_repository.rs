use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::Result;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use uuid::Uuid;

use crate::models::user::User;

pub struct UserRepository {
    collection: Collection<User>,
}

impl UserRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let collection = db.collection::<User>("users");
        UserRepository { collection }
    }

    /// Unique index on email so duplicate registrations lose the race at
    /// the store instead of silently doubling up.
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection.create_index(index, None).await.map(|_| ())
    }

    pub async fn create_user(&self, user: &User) -> Result<()> {
        self.collection.insert_one(user, None).await.map(|_| ())
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let filter = doc! { "id": user_id.to_string() };
        self.collection.find_one(filter, None).await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let filter = doc! { "email": email };
        self.collection.find_one(filter, None).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        let mut cursor = self.collection.find(None, None).await?;
        let mut users = Vec::new();
        while let Some(user) = cursor.try_next().await? {
            users.push(user);
        }
        Ok(users)
    }

    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        new_name: Option<String>,
        new_avatar: Option<String>,
        new_university: Option<String>,
    ) -> Result<()> {
        let filter = doc! { "id": user_id.to_string() };

        let mut update_fields = doc! {};
        if let Some(name) = new_name {
            update_fields.insert("name", name);
        }
        if let Some(avatar) = new_avatar {
            update_fields.insert("avatar", avatar);
        }
        if let Some(university) = new_university {
            update_fields.insert("university", university);
        }

        // Nothing to change, nothing to write.
        if update_fields.is_empty() {
            return Ok(());
        }

        let update = doc! { "$set": update_fields };
        self.collection.update_one(filter, update, None).await.map(|_| ())
    }
}
