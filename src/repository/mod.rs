pub mod favorite_repository;
pub mod listing_repository;
pub mod message_repository;
pub mod order_repository;
pub mod rating_repository;
pub mod user_repository;
