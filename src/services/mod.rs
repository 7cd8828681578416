pub mod password_service;
pub mod rating_service;
