use mongodb::{options::ClientOptions, Client};

pub async fn setup_mongo() -> mongodb::error::Result<Client> {
    let mongo_uri =
        std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());
    let mut client_options = ClientOptions::parse(&mongo_uri).await?;
    client_options.app_name = Some("unimarket-backend".to_string());
    Client::with_options(client_options)
}
