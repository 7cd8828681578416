#[macro_use]
extern crate rocket;

mod config;
mod jwt;
mod models;
mod repository;
mod services;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catch, catchers, delete, get, options, post, put, routes, Request, Response, State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use models::favorite::Favorite;
use models::listing::{Listing, ListingStatus};
use models::message::{Conversation, Message};
use models::order::Order;
use models::rating::{BuyerRatingState, RatingView, SellerProfile, SellerRating};
use models::user::{PublicUser, User};
use repository::favorite_repository::FavoriteRepository;
use repository::listing_repository::ListingRepository;
use repository::message_repository::MessageRepository;
use repository::order_repository::OrderRepository;
use repository::rating_repository::{is_duplicate_key_error, RatingRepository};
use repository::user_repository::UserRepository;
use services::{password_service, rating_service};

// CORS fairing so the React frontend can talk to us from another origin.
pub struct CORS;

#[rocket::async_trait]
impl Fairing for CORS {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PUT, DELETE, OPTIONS",
        ));
        response.set_header(Header::new(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        ));
    }
}

#[options("/<_path..>")]
fn all_options(_path: std::path::PathBuf) -> Status {
    Status::Ok
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub message: String,
    pub result: Option<T>,
}

fn ok<T>(result: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        message: "200: Success".to_string(),
        result: Some(result),
    })
}

fn fail<T>(status: Status, message: &str) -> (Status, Json<ApiResponse<T>>) {
    (
        status,
        Json(ApiResponse {
            message: message.to_string(),
            result: None,
        }),
    )
}

fn internal_error<T>(context: &str, err: impl std::fmt::Debug) -> (Status, Json<ApiResponse<T>>) {
    eprintln!("{}: {:?}", context, err);
    fail(Status::InternalServerError, "500: Internal Server Error")
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<String>,
    pub university: Option<String>,
}

#[post("/users", format = "json", data = "<register_data>")]
async fn register_user(
    user_repo: &State<UserRepository>,
    register_data: Json<RegisterRequest>,
) -> (Status, Json<ApiResponse<(PublicUser, String)>>) {
    let data = register_data.into_inner();
    if data.name.trim().is_empty() || data.email.trim().is_empty() || data.password.is_empty() {
        return fail(
            Status::BadRequest,
            "400: Bad Request - name, email and password are required",
        );
    }

    match user_repo.find_user_by_email(&data.email).await {
        Ok(Some(_)) => {
            return fail(Status::Conflict, "409: Conflict - Email already registered");
        }
        Ok(None) => {}
        Err(e) => return internal_error("Error looking up email", e),
    }

    let salt = password_service::new_salt();
    let user = User {
        id: Uuid::new_v4(),
        name: data.name,
        email: data.email,
        password_hash: password_service::hash_password(&data.password, &salt),
        password_salt: salt,
        avatar: data.avatar,
        university: data.university,
        created_at: chrono::Utc::now().timestamp(),
    };

    if let Err(e) = user_repo.create_user(&user).await {
        if is_duplicate_key_error(&e) {
            return fail(Status::Conflict, "409: Conflict - Email already registered");
        }
        return internal_error("Error creating user", e);
    }

    let token = jwt::jwt_helper::create_token(user.id)
        .unwrap_or_else(|_| "Error creating token".to_string());

    (
        Status::Created,
        Json(ApiResponse {
            message: "201: Created".to_string(),
            result: Some((PublicUser::from(&user), token)),
        }),
    )
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[post("/login", format = "json", data = "<login_data>")]
async fn login(
    user_repo: &State<UserRepository>,
    login_data: Json<LoginRequest>,
) -> (Status, Json<ApiResponse<(PublicUser, String)>>) {
    match user_repo.find_user_by_email(&login_data.email).await {
        Ok(Some(user)) => {
            if !password_service::verify_password(
                &login_data.password,
                &user.password_salt,
                &user.password_hash,
            ) {
                return fail(Status::Unauthorized, "401: Unauthorized - Invalid credentials");
            }
            let token = jwt::jwt_helper::create_token(user.id)
                .unwrap_or_else(|_| "Error creating token".to_string());
            (Status::Ok, ok((PublicUser::from(&user), token)))
        }
        Ok(None) => fail(Status::Unauthorized, "401: Unauthorized - Invalid credentials"),
        Err(e) => internal_error("Error finding user", e),
    }
}

#[get("/users")]
async fn get_all_users(user_repo: &State<UserRepository>) -> Json<ApiResponse<Vec<PublicUser>>> {
    match user_repo.get_all_users().await {
        Ok(users) if !users.is_empty() => ok(users.iter().map(PublicUser::from).collect()),
        Ok(_) => Json(ApiResponse {
            message: "204: No Content".to_string(),
            result: None,
        }),
        Err(e) => {
            eprintln!("Error listing users: {:?}", e);
            Json(ApiResponse {
                message: "500: Internal Server Error".to_string(),
                result: None,
            })
        }
    }
}

#[get("/users/<user_id>")]
async fn get_user_by_id(
    user_repo: &State<UserRepository>,
    user_id: Uuid,
) -> (Status, Json<ApiResponse<PublicUser>>) {
    match user_repo.find_user_by_id(user_id).await {
        Ok(Some(user)) => (Status::Ok, ok(PublicUser::from(&user))),
        Ok(None) => fail(Status::NotFound, "404: Not Found - User not found"),
        Err(e) => internal_error("Error finding user", e),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub university: Option<String>,
}

#[put("/users/<user_id>", format = "json", data = "<profile_data>")]
async fn update_user_profile(
    user_repo: &State<UserRepository>,
    user_id: Uuid,
    profile_data: Json<UpdateProfileRequest>,
) -> (Status, Json<ApiResponse<PublicUser>>) {
    match user_repo.find_user_by_id(user_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(Status::NotFound, "404: Not Found - User not found"),
        Err(e) => return internal_error("Error finding user", e),
    }

    let data = profile_data.into_inner();
    if let Err(e) = user_repo
        .update_user_profile(user_id, data.name, data.avatar, data.university)
        .await
    {
        return internal_error("Error updating profile", e);
    }

    match user_repo.find_user_by_id(user_id).await {
        Ok(Some(user)) => (Status::Ok, ok(PublicUser::from(&user))),
        Ok(None) => fail(Status::NotFound, "404: Not Found - User not found after update"),
        Err(e) => internal_error("Error fetching updated user", e),
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewListingRequest {
    pub seller_id: Uuid,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[post("/listings", format = "json", data = "<listing_data>")]
async fn create_listing(
    listing_repo: &State<ListingRepository>,
    user_repo: &State<UserRepository>,
    listing_data: Json<NewListingRequest>,
) -> (Status, Json<ApiResponse<Listing>>) {
    let data = listing_data.into_inner();
    if data.title.trim().is_empty() {
        return fail(Status::BadRequest, "400: Bad Request - title is required");
    }
    if data.price <= 0.0 {
        return fail(Status::BadRequest, "400: Bad Request - price must be positive");
    }

    match user_repo.find_user_by_id(data.seller_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Seller not found"),
        Err(e) => return internal_error("Error finding seller", e),
    }

    let listing = Listing::new(
        data.seller_id,
        data.title,
        data.description,
        data.price,
        data.category,
        data.image_url,
    );
    match listing_repo.create_listing(&listing).await {
        Ok(_) => (
            Status::Created,
            Json(ApiResponse {
                message: "201: Created".to_string(),
                result: Some(listing),
            }),
        ),
        Err(e) => internal_error("Error creating listing", e),
    }
}

#[get("/listings")]
async fn get_active_listings(
    listing_repo: &State<ListingRepository>,
) -> (Status, Json<ApiResponse<Vec<Listing>>>) {
    match listing_repo.get_active_listings().await {
        Ok(listings) => (Status::Ok, ok(listings)),
        Err(e) => internal_error("Error listing listings", e),
    }
}

#[get("/listings/<listing_id>")]
async fn get_listing_by_id(
    listing_repo: &State<ListingRepository>,
    listing_id: Uuid,
) -> (Status, Json<ApiResponse<Listing>>) {
    match listing_repo.find_listing_by_id(listing_id).await {
        Ok(Some(listing)) => (Status::Ok, ok(listing)),
        Ok(None) => fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => internal_error("Error finding listing", e),
    }
}

#[get("/users/<user_id>/listings")]
async fn get_user_listings(
    listing_repo: &State<ListingRepository>,
    user_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Listing>>>) {
    match listing_repo.get_listings_by_seller(user_id).await {
        Ok(listings) => (Status::Ok, ok(listings)),
        Err(e) => internal_error("Error listing seller listings", e),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    pub seller_id: Uuid,
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

#[put("/listings/<listing_id>", format = "json", data = "<listing_data>")]
async fn update_listing(
    listing_repo: &State<ListingRepository>,
    listing_id: Uuid,
    listing_data: Json<UpdateListingRequest>,
) -> (Status, Json<ApiResponse<Listing>>) {
    let data = listing_data.into_inner();

    let listing = match listing_repo.find_listing_by_id(listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    };
    if listing.seller_id != data.seller_id {
        return fail(Status::Forbidden, "403: Forbidden - Not your listing");
    }
    if listing.status != ListingStatus::Active {
        return fail(Status::BadRequest, "400: Bad Request - Only active listings can be edited");
    }
    if let Some(price) = data.price {
        if price <= 0.0 {
            return fail(Status::BadRequest, "400: Bad Request - price must be positive");
        }
    }

    if let Err(e) = listing_repo
        .update_listing_fields(
            listing_id,
            data.title,
            data.description,
            data.price,
            data.category,
            data.image_url,
        )
        .await
    {
        return internal_error("Error updating listing", e);
    }

    match listing_repo.find_listing_by_id(listing_id).await {
        Ok(Some(updated)) => (Status::Ok, ok(updated)),
        Ok(None) => fail(Status::NotFound, "404: Not Found - Listing not found after update"),
        Err(e) => internal_error("Error fetching updated listing", e),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OwnerRequest {
    pub seller_id: Uuid,
}

#[post("/listings/<listing_id>/hide", format = "json", data = "<owner_data>")]
async fn hide_listing(
    listing_repo: &State<ListingRepository>,
    listing_id: Uuid,
    owner_data: Json<OwnerRequest>,
) -> (Status, Json<ApiResponse<String>>) {
    let listing = match listing_repo.find_listing_by_id(listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    };
    if listing.seller_id != owner_data.seller_id {
        return fail(Status::Forbidden, "403: Forbidden - Not your listing");
    }
    if listing.status != ListingStatus::Active {
        return fail(Status::BadRequest, "400: Bad Request - Only active listings can be hidden");
    }

    match listing_repo.set_status(listing_id, ListingStatus::Hidden).await {
        Ok(_) => (Status::Ok, ok("Listing hidden".to_string())),
        Err(e) => internal_error("Error hiding listing", e),
    }
}

#[delete("/listings/<listing_id>", format = "json", data = "<owner_data>")]
async fn delete_listing(
    listing_repo: &State<ListingRepository>,
    listing_id: Uuid,
    owner_data: Json<OwnerRequest>,
) -> (Status, Json<ApiResponse<String>>) {
    let listing = match listing_repo.find_listing_by_id(listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    };
    if listing.seller_id != owner_data.seller_id {
        return fail(Status::Forbidden, "403: Forbidden - Not your listing");
    }

    match listing_repo.soft_delete_listing(listing_id).await {
        Ok(_) => (Status::Ok, ok("Listing deleted".to_string())),
        Err(e) => internal_error("Error deleting listing", e),
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct NewOrderRequest {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
}

#[post("/orders", format = "json", data = "<order_data>")]
async fn create_order(
    listing_repo: &State<ListingRepository>,
    order_repo: &State<OrderRepository>,
    user_repo: &State<UserRepository>,
    order_data: Json<NewOrderRequest>,
) -> (Status, Json<ApiResponse<Order>>) {
    let data = order_data.into_inner();

    let listing = match listing_repo.find_listing_by_id(data.listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    };
    if listing.seller_id == data.buyer_id {
        return fail(Status::BadRequest, "400: Bad Request - You cannot buy your own listing");
    }
    match user_repo.find_user_by_id(data.buyer_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Buyer not found"),
        Err(e) => return internal_error("Error finding buyer", e),
    }

    // Completed sale: the ACTIVE -> SOLD transition that later makes the
    // listing ratable by the buyer. The claim is conditional on the listing
    // still being active, so a second buyer loses here, not after.
    match listing_repo.mark_sold(listing.id, data.buyer_id).await {
        Ok(true) => {}
        Ok(false) => {
            return fail(Status::Conflict, "409: Conflict - Listing is no longer for sale");
        }
        Err(e) => return internal_error("Error marking listing sold", e),
    }

    let order = Order::new(listing.id, data.buyer_id, listing.seller_id, listing.price);
    if let Err(e) = order_repo.create_order(&order).await {
        return internal_error("Error creating order", e);
    }

    (
        Status::Created,
        Json(ApiResponse {
            message: "201: Created".to_string(),
            result: Some(order),
        }),
    )
}

#[get("/orders/buyer/<buyer_id>")]
async fn get_buyer_orders(
    order_repo: &State<OrderRepository>,
    buyer_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Order>>>) {
    match order_repo.get_orders_for_buyer(buyer_id).await {
        Ok(orders) => (Status::Ok, ok(orders)),
        Err(e) => internal_error("Error listing buyer orders", e),
    }
}

#[get("/orders/seller/<seller_id>")]
async fn get_seller_orders(
    order_repo: &State<OrderRepository>,
    seller_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Order>>>) {
    match order_repo.get_orders_for_seller(seller_id).await {
        Ok(orders) => (Status::Ok, ok(orders)),
        Err(e) => internal_error("Error listing seller orders", e),
    }
}

// ---------------------------------------------------------------------------
// Favorites
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub user_id: Uuid,
    pub listing_id: Uuid,
}

#[post("/favorites", format = "json", data = "<favorite_data>")]
async fn add_favorite(
    favorite_repo: &State<FavoriteRepository>,
    listing_repo: &State<ListingRepository>,
    favorite_data: Json<FavoriteRequest>,
) -> (Status, Json<ApiResponse<Favorite>>) {
    let data = favorite_data.into_inner();

    match listing_repo.find_listing_by_id(data.listing_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    }

    let favorite = Favorite::new(data.user_id, data.listing_id);
    if let Err(e) = favorite_repo.add_favorite(&favorite).await {
        if is_duplicate_key_error(&e) {
            return fail(Status::Conflict, "409: Conflict - Already favorited");
        }
        return internal_error("Error adding favorite", e);
    }

    (
        Status::Created,
        Json(ApiResponse {
            message: "201: Created".to_string(),
            result: Some(favorite),
        }),
    )
}

#[delete("/favorites/<user_id>/<listing_id>")]
async fn remove_favorite(
    favorite_repo: &State<FavoriteRepository>,
    user_id: Uuid,
    listing_id: Uuid,
) -> (Status, Json<ApiResponse<String>>) {
    match favorite_repo.find_favorite(user_id, listing_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Favorite not found"),
        Err(e) => return internal_error("Error finding favorite", e),
    }
    match favorite_repo.remove_favorite(user_id, listing_id).await {
        Ok(_) => (Status::Ok, ok("Favorite removed".to_string())),
        Err(e) => internal_error("Error removing favorite", e),
    }
}

#[get("/favorites/<user_id>")]
async fn get_favorites(
    favorite_repo: &State<FavoriteRepository>,
    listing_repo: &State<ListingRepository>,
    user_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Listing>>>) {
    let favorites = match favorite_repo.get_favorites_for_user(user_id).await {
        Ok(favorites) => favorites,
        Err(e) => return internal_error("Error listing favorites", e),
    };

    // Resolve to listings, dropping ones that were deleted since.
    let mut listings = Vec::new();
    for favorite in favorites {
        match listing_repo.find_listing_by_id(favorite.listing_id).await {
            Ok(Some(listing)) => listings.push(listing),
            Ok(None) => {}
            Err(e) => return internal_error("Error resolving favorite listing", e),
        }
    }
    (Status::Ok, ok(listings))
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StartConversationRequest {
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
}

#[post("/conversations", format = "json", data = "<conversation_data>")]
async fn start_conversation(
    message_repo: &State<MessageRepository>,
    listing_repo: &State<ListingRepository>,
    conversation_data: Json<StartConversationRequest>,
) -> (Status, Json<ApiResponse<Conversation>>) {
    let data = conversation_data.into_inner();

    let listing = match listing_repo.find_listing_by_id(data.listing_id).await {
        Ok(Some(listing)) => listing,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Listing not found"),
        Err(e) => return internal_error("Error finding listing", e),
    };
    if listing.seller_id == data.buyer_id {
        return fail(
            Status::BadRequest,
            "400: Bad Request - You cannot message yourself about your own listing",
        );
    }

    match message_repo.find_conversation(data.listing_id, data.buyer_id).await {
        Ok(Some(existing)) => return (Status::Ok, ok(existing)),
        Ok(None) => {}
        Err(e) => return internal_error("Error finding conversation", e),
    }

    let conversation = Conversation::new(data.listing_id, data.buyer_id, listing.seller_id);
    if let Err(e) = message_repo.create_conversation(&conversation).await {
        if is_duplicate_key_error(&e) {
            // Lost a create race; the thread exists now, return it.
            return match message_repo.find_conversation(data.listing_id, data.buyer_id).await {
                Ok(Some(existing)) => (Status::Ok, ok(existing)),
                _ => fail(Status::Conflict, "409: Conflict - Conversation already exists"),
            };
        }
        return internal_error("Error creating conversation", e);
    }

    (
        Status::Created,
        Json(ApiResponse {
            message: "201: Created".to_string(),
            result: Some(conversation),
        }),
    )
}

#[get("/conversations/<user_id>")]
async fn get_conversations(
    message_repo: &State<MessageRepository>,
    user_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Conversation>>>) {
    match message_repo.get_conversations_for_user(user_id).await {
        Ok(conversations) => (Status::Ok, ok(conversations)),
        Err(e) => internal_error("Error listing conversations", e),
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub body: String,
}

#[post("/conversations/<conversation_id>/messages", format = "json", data = "<message_data>")]
async fn send_message(
    message_repo: &State<MessageRepository>,
    conversation_id: Uuid,
    message_data: Json<SendMessageRequest>,
) -> (Status, Json<ApiResponse<Message>>) {
    let data = message_data.into_inner();
    if data.body.trim().is_empty() {
        return fail(Status::BadRequest, "400: Bad Request - message body is required");
    }

    let conversation = match message_repo.find_conversation_by_id(conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Conversation not found"),
        Err(e) => return internal_error("Error finding conversation", e),
    };
    if !conversation.has_participant(data.sender_id) {
        return fail(Status::Forbidden, "403: Forbidden - Not part of this conversation");
    }

    let message = Message::new(conversation_id, data.sender_id, data.body);
    match message_repo.insert_message(&message).await {
        Ok(_) => (
            Status::Created,
            Json(ApiResponse {
                message: "201: Created".to_string(),
                result: Some(message),
            }),
        ),
        Err(e) => internal_error("Error sending message", e),
    }
}

#[get("/conversations/<conversation_id>/messages/<user_id>")]
async fn get_messages(
    message_repo: &State<MessageRepository>,
    conversation_id: Uuid,
    user_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<Message>>>) {
    let conversation = match message_repo.find_conversation_by_id(conversation_id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => return fail(Status::NotFound, "404: Not Found - Conversation not found"),
        Err(e) => return internal_error("Error finding conversation", e),
    };
    if !conversation.has_participant(user_id) {
        return fail(Status::Forbidden, "403: Forbidden - Not part of this conversation");
    }

    // Reading the thread marks the other side's messages as read.
    if let Err(e) = message_repo.mark_read(conversation_id, user_id).await {
        return internal_error("Error marking messages read", e);
    }
    match message_repo.get_messages(conversation_id).await {
        Ok(messages) => (Status::Ok, ok(messages)),
        Err(e) => internal_error("Error listing messages", e),
    }
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRatingRequest {
    pub listing_id: Uuid,
    pub rating: i32,
    pub review: Option<String>,
}

#[post("/ratings/<seller_id>/<buyer_id>", format = "json", data = "<rating_data>")]
async fn submit_rating(
    listing_repo: &State<ListingRepository>,
    rating_repo: &State<RatingRepository>,
    user_repo: &State<UserRepository>,
    seller_id: Uuid,
    buyer_id: Uuid,
    rating_data: Json<SubmitRatingRequest>,
) -> (Status, Json<ApiResponse<RatingView>>) {
    let data = rating_data.into_inner();

    // Eligibility is checked against the listing even if it was soft-deleted;
    // a finished sale stays ratable after the listing is taken down.
    let listing = match listing_repo.find_listing_any(data.listing_id).await {
        Ok(listing) => listing,
        Err(e) => return internal_error("Error finding listing", e),
    };
    if let Err(e) =
        rating_service::validate_submission(buyer_id, seller_id, data.rating, listing.as_ref())
    {
        return fail(e.status(), &e.to_string());
    }

    let existing = match rating_repo.find_by_listing_and_buyer(data.listing_id, buyer_id).await {
        Ok(existing) => existing,
        Err(e) => return internal_error("Error finding rating", e),
    };

    let saved = match existing {
        Some(mut current) => {
            // A score-only resubmit keeps the earlier review text.
            let review = data.review.or_else(|| current.review.clone());
            if let Err(e) = rating_repo
                .update_rating(current.id, data.rating, review.as_deref())
                .await
            {
                return internal_error("Error updating rating", e);
            }
            current.rating = data.rating;
            current.review = review;
            current.updated_at = chrono::Utc::now().timestamp();
            current
        }
        None => {
            let new_rating =
                SellerRating::new(seller_id, buyer_id, data.listing_id, data.rating, data.review);
            if let Err(e) = rating_repo.insert_rating(&new_rating).await {
                if is_duplicate_key_error(&e) {
                    return fail(
                        Status::Conflict,
                        "409: Conflict - Rating already submitted for this listing",
                    );
                }
                return internal_error("Error inserting rating", e);
            }
            new_rating
        }
    };

    // Recompute the seller aggregate from the live rows every time a rating
    // changes; the profile is derived state, never adjusted incrementally.
    let ratings = match rating_repo.get_ratings_for_seller(seller_id).await {
        Ok(ratings) => ratings,
        Err(e) => return internal_error("Error loading seller ratings", e),
    };
    let (average, total) = rating_service::aggregate_ratings(&ratings);
    if let Err(e) = rating_repo.upsert_seller_profile(seller_id, average, total).await {
        return internal_error("Error updating seller profile", e);
    }

    let buyer = match user_repo.find_user_by_id(buyer_id).await {
        Ok(buyer) => buyer,
        Err(e) => return internal_error("Error finding buyer", e),
    };

    (
        Status::Created,
        Json(ApiResponse {
            message: "201: Created".to_string(),
            result: Some(RatingView {
                rating: saved,
                buyer: buyer.as_ref().map(PublicUser::from),
            }),
        }),
    )
}

#[get("/ratings/<seller_id>")]
async fn get_seller_ratings(
    rating_repo: &State<RatingRepository>,
    user_repo: &State<UserRepository>,
    seller_id: Uuid,
) -> (Status, Json<ApiResponse<Vec<RatingView>>>) {
    let ratings = match rating_repo.get_ratings_for_seller(seller_id).await {
        Ok(ratings) => ratings,
        Err(e) => return internal_error("Error listing seller ratings", e),
    };

    let mut views = Vec::with_capacity(ratings.len());
    for rating in ratings {
        let buyer = match user_repo.find_user_by_id(rating.buyer_id).await {
            Ok(buyer) => buyer,
            Err(e) => return internal_error("Error finding buyer", e),
        };
        views.push(RatingView {
            rating,
            buyer: buyer.as_ref().map(PublicUser::from),
        });
    }
    (Status::Ok, ok(views))
}

/// Eligibility check; the body is the state object or literal `null`.
#[get("/ratings/state/<listing_id>/<buyer_id>")]
async fn get_buyer_rating_state(
    listing_repo: &State<ListingRepository>,
    rating_repo: &State<RatingRepository>,
    listing_id: Uuid,
    buyer_id: Uuid,
) -> (Status, Json<Option<BuyerRatingState>>) {
    let listing = match listing_repo.find_listing_any(listing_id).await {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("Error finding listing: {:?}", e);
            return (Status::InternalServerError, Json(None));
        }
    };
    let existing = match rating_repo.find_by_listing_and_buyer(listing_id, buyer_id).await {
        Ok(existing) => existing,
        Err(e) => {
            eprintln!("Error finding rating: {:?}", e);
            return (Status::InternalServerError, Json(None));
        }
    };

    (
        Status::Ok,
        Json(rating_service::buyer_rating_state(
            buyer_id,
            listing.as_ref(),
            existing.as_ref(),
        )),
    )
}

#[get("/sellers/<seller_id>/profile")]
async fn get_seller_profile(
    rating_repo: &State<RatingRepository>,
    seller_id: Uuid,
) -> (Status, Json<ApiResponse<SellerProfile>>) {
    match rating_repo.find_seller_profile(seller_id).await {
        Ok(Some(profile)) => (Status::Ok, ok(profile)),
        // An unrated seller just has the zero aggregate.
        Ok(None) => (Status::Ok, ok(SellerProfile::empty(seller_id))),
        Err(e) => internal_error("Error finding seller profile", e),
    }
}

#[catch(404)]
fn not_found(req: &Request) -> Json<ApiResponse<String>> {
    Json(ApiResponse {
        message: format!("404: '{}' route not found", req.uri()),
        result: None,
    })
}

#[launch]
async fn rocket() -> _ {
    let client = config::mongo_config::setup_mongo()
        .await
        .expect("Failed to connect to MongoDB");

    let user_repo = UserRepository::new(&client);
    let listing_repo = ListingRepository::new(&client);
    let rating_repo = RatingRepository::new(&client);
    let message_repo = MessageRepository::new(&client);
    let order_repo = OrderRepository::new(&client);
    let favorite_repo = FavoriteRepository::new(&client);

    user_repo.ensure_indexes().await.expect("Failed to create user indexes");
    rating_repo.ensure_indexes().await.expect("Failed to create rating indexes");
    message_repo.ensure_indexes().await.expect("Failed to create conversation indexes");
    favorite_repo.ensure_indexes().await.expect("Failed to create favorite indexes");

    rocket::build()
        .manage(user_repo)
        .manage(listing_repo)
        .manage(rating_repo)
        .manage(message_repo)
        .manage(order_repo)
        .manage(favorite_repo)
        .attach(CORS)
        .mount("/", routes![
            all_options,
            register_user,
            login,
            get_all_users,
            get_user_by_id,
            update_user_profile,
            create_listing,
            get_active_listings,
            get_listing_by_id,
            get_user_listings,
            update_listing,
            hide_listing,
            delete_listing,
            create_order,
            get_buyer_orders,
            get_seller_orders,
            add_favorite,
            remove_favorite,
            get_favorites,
            start_conversation,
            get_conversations,
            send_message,
            get_messages,
            submit_rating,
            get_seller_ratings,
            get_buyer_rating_state,
            get_seller_profile,
        ])
        .register("/", catchers![not_found])
}
