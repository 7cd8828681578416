pub mod favorite;
pub mod listing;
pub mod message;
pub mod order;
pub mod rating;
pub mod user;
