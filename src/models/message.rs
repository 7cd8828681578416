use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One buyer/seller thread about one listing. Unique per (listingId, buyerId).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub created_at: i64,
    pub last_message_at: i64,
}

impl Conversation {
    pub fn new(listing_id: Uuid, buyer_id: Uuid, seller_id: Uuid) -> Self {
        let now = chrono::Utc::now().timestamp();
        Conversation {
            id: Uuid::new_v4(),
            listing_id,
            buyer_id,
            seller_id,
            created_at: now,
            last_message_at: now,
        }
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == user_id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub read: bool,
    pub created_at: i64,
}

impl Message {
    pub fn new(conversation_id: Uuid, sender_id: Uuid, body: String) -> Self {
        Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            body,
            read: false,
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}
