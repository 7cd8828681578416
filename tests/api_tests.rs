//! End-to-end tests against a running instance.
//!
//! These need the server listening on BASE_URL (default http://localhost:8000)
//! with MongoDB behind it, so they are ignored by default:
//!
//!     cargo test -- --ignored

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn register(client: &Client, name: &str) -> Value {
    let email = format!("{}-{}@uni.test", name, uuid::Uuid::new_v4().simple());
    let res = client
        .post(format!("{}/users", base_url()))
        .json(&json!({ "name": name, "email": email, "password": "secret123" }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<Value>().unwrap()["result"][0].clone()
}

fn create_listing(client: &Client, seller_id: &str) -> Value {
    let res = client
        .post(format!("{}/listings", base_url()))
        .json(&json!({
            "sellerId": seller_id,
            "title": "Linear algebra textbook",
            "description": "Third edition, some notes in the margins",
            "price": 20.0,
        }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json::<Value>().unwrap()["result"].clone()
}

fn place_order(client: &Client, listing_id: &str, buyer_id: &str) {
    let res = client
        .post(format!("{}/orders", base_url()))
        .json(&json!({ "listingId": listing_id, "buyerId": buyer_id }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

fn submit_rating(
    client: &Client,
    seller_id: &str,
    buyer_id: &str,
    listing_id: &str,
    rating: i32,
) -> reqwest::blocking::Response {
    client
        .post(format!("{}/ratings/{}/{}", base_url(), seller_id, buyer_id))
        .json(&json!({ "listingId": listing_id, "rating": rating }))
        .send()
        .unwrap()
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn rating_your_own_sale_is_rejected() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let seller_id = seller["id"].as_str().unwrap();
    let listing = create_listing(&client, seller_id);

    let res = submit_rating(&client, seller_id, seller_id, listing["id"].as_str().unwrap(), 5);
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn rating_a_missing_listing_is_not_found() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let buyer = register(&client, "buyer");

    let res = submit_rating(
        &client,
        seller["id"].as_str().unwrap(),
        buyer["id"].as_str().unwrap(),
        &uuid::Uuid::new_v4().to_string(),
        5,
    );
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn rating_flow_updates_in_place_and_recomputes_the_aggregate() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let seller_id = seller["id"].as_str().unwrap();
    let buyer = register(&client, "buyer");
    let buyer_id = buyer["id"].as_str().unwrap();

    // First sale, first rating.
    let listing = create_listing(&client, seller_id);
    let listing_id = listing["id"].as_str().unwrap();
    place_order(&client, listing_id, buyer_id);

    let res = submit_rating(&client, seller_id, buyer_id, listing_id, 5);
    assert_eq!(res.status(), StatusCode::CREATED);
    let saved = res.json::<Value>().unwrap()["result"].clone();
    assert_eq!(saved["rating"], 5);
    assert_eq!(saved["buyer"]["id"].as_str().unwrap(), buyer_id);
    assert!(saved["buyer"].get("passwordHash").is_none());

    let ratings: Value = client
        .get(format!("{}/ratings/{}", base_url(), seller_id))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(ratings["result"].as_array().unwrap().len(), 1);

    // Resubmitting for the same (listing, buyer) updates rather than duplicates.
    let res = submit_rating(&client, seller_id, buyer_id, listing_id, 4);
    assert_eq!(res.status(), StatusCode::CREATED);
    let ratings: Value = client
        .get(format!("{}/ratings/{}", base_url(), seller_id))
        .send()
        .unwrap()
        .json()
        .unwrap();
    let entries = ratings["result"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["rating"], 4);

    // Second sale to another buyer brings the aggregate to (4 + 2) / 2 = 3.00.
    let other_buyer = register(&client, "buyer2");
    let other_buyer_id = other_buyer["id"].as_str().unwrap();
    let second_listing = create_listing(&client, seller_id);
    let second_listing_id = second_listing["id"].as_str().unwrap();
    place_order(&client, second_listing_id, other_buyer_id);
    let res = submit_rating(&client, seller_id, other_buyer_id, second_listing_id, 2);
    assert_eq!(res.status(), StatusCode::CREATED);

    let profile: Value = client
        .get(format!("{}/sellers/{}/profile", base_url(), seller_id))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(profile["result"]["averageRating"], 3.0);
    assert_eq!(profile["result"]["totalRatings"], 2);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn registering_the_same_email_twice_conflicts() {
    let client = Client::new();
    let email = format!("dup-{}@uni.test", uuid::Uuid::new_v4().simple());
    let body = json!({ "name": "dup", "email": email, "password": "secret123" });

    let res = client.post(format!("{}/users", base_url())).json(&body).send().unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Same email again loses against the unique index.
    let res = client.post(format!("{}/users", base_url())).json(&body).send().unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn favoriting_a_listing_twice_conflicts() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let buyer = register(&client, "buyer");
    let listing = create_listing(&client, seller["id"].as_str().unwrap());
    let body = json!({
        "userId": buyer["id"].as_str().unwrap(),
        "listingId": listing["id"].as_str().unwrap(),
    });

    let res = client.post(format!("{}/favorites", base_url())).json(&body).send().unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client.post(format!("{}/favorites", base_url())).json(&body).send().unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn ordering_a_listing_twice_conflicts() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let listing = create_listing(&client, seller["id"].as_str().unwrap());
    let listing_id = listing["id"].as_str().unwrap();
    let first_buyer = register(&client, "buyer");
    let second_buyer = register(&client, "buyer2");

    place_order(&client, listing_id, first_buyer["id"].as_str().unwrap());

    // The sold-claim only matches an active listing, so the second buyer
    // is turned away and the recorded purchaser stays the first.
    let res = client
        .post(format!("{}/orders", base_url()))
        .json(&json!({
            "listingId": listing_id,
            "buyerId": second_buyer["id"].as_str().unwrap(),
        }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let state: Value = client
        .get(format!(
            "{}/ratings/state/{}/{}",
            base_url(),
            listing_id,
            first_buyer["id"].as_str().unwrap()
        ))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(state["canRate"], true);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn score_only_resubmit_keeps_the_review() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let seller_id = seller["id"].as_str().unwrap();
    let buyer = register(&client, "buyer");
    let buyer_id = buyer["id"].as_str().unwrap();
    let listing = create_listing(&client, seller_id);
    let listing_id = listing["id"].as_str().unwrap();
    place_order(&client, listing_id, buyer_id);

    let res = client
        .post(format!("{}/ratings/{}/{}", base_url(), seller_id, buyer_id))
        .json(&json!({ "listingId": listing_id, "rating": 5, "review": "Fast and friendly" }))
        .send()
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // Resubmit with no review field: the score changes, the text survives.
    let res = submit_rating(&client, seller_id, buyer_id, listing_id, 3);
    assert_eq!(res.status(), StatusCode::CREATED);
    let saved = res.json::<Value>().unwrap()["result"].clone();
    assert_eq!(saved["rating"], 3);
    assert_eq!(saved["review"], "Fast and friendly");

    let ratings: Value = client
        .get(format!("{}/ratings/{}", base_url(), seller_id))
        .send()
        .unwrap()
        .json()
        .unwrap();
    let entries = ratings["result"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["review"], "Fast and friendly");
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn rating_state_is_null_for_a_non_purchaser() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let seller_id = seller["id"].as_str().unwrap();
    let buyer = register(&client, "buyer");
    let bystander = register(&client, "bystander");

    let listing = create_listing(&client, seller_id);
    let listing_id = listing["id"].as_str().unwrap();
    place_order(&client, listing_id, buyer["id"].as_str().unwrap());

    let state: Value = client
        .get(format!(
            "{}/ratings/state/{}/{}",
            base_url(),
            listing_id,
            bystander["id"].as_str().unwrap()
        ))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert!(state.is_null());

    // The actual purchaser gets a live eligibility object.
    let state: Value = client
        .get(format!(
            "{}/ratings/state/{}/{}",
            base_url(),
            listing_id,
            buyer["id"].as_str().unwrap()
        ))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(state["canRate"], true);
    assert_eq!(state["hasRated"], false);
}

#[test]
#[ignore = "needs a running server and MongoDB"]
fn rating_an_unsold_listing_is_rejected() {
    let client = Client::new();
    let seller = register(&client, "seller");
    let seller_id = seller["id"].as_str().unwrap();
    let buyer = register(&client, "buyer");

    let listing = create_listing(&client, seller_id);
    let res = submit_rating(
        &client,
        seller_id,
        buyer["id"].as_str().unwrap(),
        listing["id"].as_str().unwrap(),
        5,
    );
    // Never sold, so the buyer is not the recorded purchaser.
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
