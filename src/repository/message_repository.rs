use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::Result;
use mongodb::options::{FindOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use uuid::Uuid;

use crate::models::message::{Conversation, Message};

pub struct MessageRepository {
    conversations: Collection<Conversation>,
    messages: Collection<Message>,
}

impl MessageRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let conversations = db.collection::<Conversation>("conversations");
        let messages = db.collection::<Message>("messages");
        MessageRepository { conversations, messages }
    }

    /// One thread per (listing, buyer).
    pub async fn ensure_indexes(&self) -> Result<()> {
        let index = IndexModel::builder()
            .keys(doc! { "listingId": 1, "buyerId": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.conversations.create_index(index, None).await.map(|_| ())
    }

    pub async fn find_conversation_by_id(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let filter = doc! { "id": conversation_id.to_string() };
        self.conversations.find_one(filter, None).await
    }

    pub async fn find_conversation(
        &self,
        listing_id: Uuid,
        buyer_id: Uuid,
    ) -> Result<Option<Conversation>> {
        let filter = doc! {
            "listingId": listing_id.to_string(),
            "buyerId": buyer_id.to_string(),
        };
        self.conversations.find_one(filter, None).await
    }

    pub async fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conversations.insert_one(conversation, None).await.map(|_| ())
    }

    /// All threads a user takes part in, most recent activity first.
    pub async fn get_conversations_for_user(&self, user_id: Uuid) -> Result<Vec<Conversation>> {
        let id = user_id.to_string();
        let filter = doc! {
            "$or": [
                { "buyerId": &id },
                { "sellerId": &id },
            ]
        };
        let options = FindOptions::builder().sort(doc! { "lastMessageAt": -1 }).build();
        let mut cursor = self.conversations.find(filter, options).await?;
        let mut conversations = Vec::new();
        while let Some(conversation) = cursor.try_next().await? {
            conversations.push(conversation);
        }
        Ok(conversations)
    }

    pub async fn insert_message(&self, message: &Message) -> Result<()> {
        self.messages.insert_one(message, None).await?;

        // Bump the thread so it sorts to the top of the inbox.
        let filter = doc! { "id": message.conversation_id.to_string() };
        let update = doc! { "$set": { "lastMessageAt": message.created_at } };
        self.conversations.update_one(filter, update, None).await.map(|_| ())
    }

    /// Messages in a thread, oldest first.
    pub async fn get_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>> {
        let filter = doc! { "conversationId": conversation_id.to_string() };
        let options = FindOptions::builder().sort(doc! { "createdAt": 1 }).build();
        let mut cursor = self.messages.find(filter, options).await?;
        let mut messages = Vec::new();
        while let Some(message) = cursor.try_next().await? {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Mark everything the other party sent as read.
    pub async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<()> {
        let filter = doc! {
            "conversationId": conversation_id.to_string(),
            "senderId": { "$ne": reader_id.to_string() },
            "read": false,
        };
        let update = doc! { "$set": { "read": true } };
        self.messages.update_many(filter, update, None).await.map(|_| ())
    }
}
