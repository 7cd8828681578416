use futures::stream::TryStreamExt;
use mongodb::bson::doc;
use mongodb::error::Result;
use mongodb::options::FindOptions;
use mongodb::{Client, Collection};
use uuid::Uuid;

use crate::models::order::Order;

pub struct OrderRepository {
    collection: Collection<Order>,
}

impl OrderRepository {
    pub fn new(client: &Client) -> Self {
        let db = client.database("unimarket");
        let collection = db.collection::<Order>("orders");
        OrderRepository { collection }
    }

    pub async fn create_order(&self, order: &Order) -> Result<()> {
        self.collection.insert_one(order, None).await.map(|_| ())
    }

    pub async fn get_orders_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
        let filter = doc! { "buyerId": buyer_id.to_string() };
        self.find_sorted(filter).await
    }

    pub async fn get_orders_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>> {
        let filter = doc! { "sellerId": seller_id.to_string() };
        self.find_sorted(filter).await
    }

    async fn find_sorted(&self, filter: mongodb::bson::Document) -> Result<Vec<Order>> {
        let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
        let mut cursor = self.collection.find(filter, options).await?;
        let mut orders = Vec::new();
        while let Some(order) = cursor.try_next().await? {
            orders.push(order);
        }
        Ok(orders)
    }
}
