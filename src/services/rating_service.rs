use rocket::http::Status;
use thiserror::Error;
use uuid::Uuid;

use crate::models::listing::{Listing, ListingStatus};
use crate::models::rating::{BuyerRatingState, SellerRating};

/// Why a rating submission was refused. Each precondition is its own
/// variant so the caller gets a precise message and status.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RatingError {
    #[error("400: Bad Request - You cannot rate yourself")]
    SelfRating,
    #[error("400: Bad Request - Rating must be between 1 and 5")]
    InvalidScore,
    #[error("404: Not Found - Listing not found")]
    ListingNotFound,
    #[error("400: Bad Request - Listing does not belong to this seller")]
    SellerMismatch,
    #[error("403: Forbidden - Only the recorded purchaser can rate this sale")]
    BuyerMismatch,
    #[error("400: Bad Request - Sale is not finalized yet")]
    SaleNotFinal,
}

impl RatingError {
    pub fn status(&self) -> Status {
        match self {
            RatingError::SelfRating => Status::BadRequest,
            RatingError::InvalidScore => Status::BadRequest,
            RatingError::ListingNotFound => Status::NotFound,
            RatingError::SellerMismatch => Status::BadRequest,
            RatingError::BuyerMismatch => Status::Forbidden,
            RatingError::SaleNotFinal => Status::BadRequest,
        }
    }
}

/// Eligibility gate for submitting a rating. Checks run in a fixed order;
/// the first failed precondition wins.
pub fn validate_submission(
    buyer_id: Uuid,
    seller_id: Uuid,
    rating: i32,
    listing: Option<&Listing>,
) -> Result<(), RatingError> {
    if buyer_id == seller_id {
        return Err(RatingError::SelfRating);
    }
    if !(1..=5).contains(&rating) {
        return Err(RatingError::InvalidScore);
    }
    let listing = listing.ok_or(RatingError::ListingNotFound)?;
    if listing.seller_id != seller_id {
        return Err(RatingError::SellerMismatch);
    }
    if listing.sold_to_user_id != Some(buyer_id) {
        return Err(RatingError::BuyerMismatch);
    }
    if listing.status != ListingStatus::Sold {
        return Err(RatingError::SaleNotFinal);
    }
    Ok(())
}

/// Mean and count over a seller's rating rows, mean rounded to 2 decimals.
/// An empty slice aggregates to (0.00, 0).
pub fn aggregate_ratings(ratings: &[SellerRating]) -> (f64, i64) {
    if ratings.is_empty() {
        return (0.0, 0);
    }
    let total: i64 = ratings.iter().map(|r| i64::from(r.rating)).sum();
    let average = total as f64 / ratings.len() as f64;
    (round_two_decimals(average), ratings.len() as i64)
}

fn round_two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Eligibility snapshot for a buyer on a listing. `None` when the listing
/// is unknown or the buyer is not the recorded purchaser.
pub fn buyer_rating_state(
    buyer_id: Uuid,
    listing: Option<&Listing>,
    existing: Option<&SellerRating>,
) -> Option<BuyerRatingState> {
    let listing = listing?;
    if listing.sold_to_user_id != Some(buyer_id) {
        return None;
    }
    let has_rated = existing.is_some();
    Some(BuyerRatingState {
        listing_id: listing.id,
        seller_id: listing.seller_id,
        can_rate: listing.status == ListingStatus::Sold && !has_rated,
        has_rated,
        rating_id: existing.map(|r| r.id),
        rating_value: existing.map(|r| r.rating),
        review: existing.and_then(|r| r.review.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sold_listing(seller_id: Uuid, buyer_id: Uuid) -> Listing {
        let mut listing = Listing::new(
            seller_id,
            "Calculus textbook".to_string(),
            "Barely used".to_string(),
            25.0,
            Some("books".to_string()),
            None,
        );
        listing.status = ListingStatus::Sold;
        listing.sold_to_user_id = Some(buyer_id);
        listing
    }

    #[test]
    fn self_rating_is_rejected_first() {
        let user = Uuid::new_v4();
        let err = validate_submission(user, user, 5, None).unwrap_err();
        assert_eq!(err, RatingError::SelfRating);
        assert_eq!(err.status(), Status::BadRequest);
    }

    #[test]
    fn out_of_range_score_is_rejected() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, buyer);
        assert_eq!(
            validate_submission(buyer, seller, 0, Some(&listing)).unwrap_err(),
            RatingError::InvalidScore
        );
        assert_eq!(
            validate_submission(buyer, seller, 6, Some(&listing)).unwrap_err(),
            RatingError::InvalidScore
        );
    }

    #[test]
    fn missing_listing_is_not_found() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let err = validate_submission(buyer, seller, 4, None).unwrap_err();
        assert_eq!(err, RatingError::ListingNotFound);
        assert_eq!(err.status(), Status::NotFound);
    }

    #[test]
    fn wrong_seller_is_rejected() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(Uuid::new_v4(), buyer);
        assert_eq!(
            validate_submission(buyer, seller, 4, Some(&listing)).unwrap_err(),
            RatingError::SellerMismatch
        );
    }

    #[test]
    fn non_purchaser_is_forbidden() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, Uuid::new_v4());
        let err = validate_submission(buyer, seller, 4, Some(&listing)).unwrap_err();
        assert_eq!(err, RatingError::BuyerMismatch);
        assert_eq!(err.status(), Status::Forbidden);
    }

    #[test]
    fn unsold_listing_is_rejected() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let mut listing = sold_listing(seller, buyer);
        listing.status = ListingStatus::Active;
        assert_eq!(
            validate_submission(buyer, seller, 4, Some(&listing)).unwrap_err(),
            RatingError::SaleNotFinal
        );
    }

    #[test]
    fn purchaser_of_sold_listing_may_rate() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, buyer);
        assert!(validate_submission(buyer, seller, 5, Some(&listing)).is_ok());
    }

    #[test]
    fn soft_deleted_listing_still_counts_as_found() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let mut listing = sold_listing(seller, buyer);
        listing.deleted_at = Some(chrono::Utc::now().timestamp());
        assert!(validate_submission(buyer, seller, 3, Some(&listing)).is_ok());
    }

    fn rating_of(seller_id: Uuid, value: i32) -> SellerRating {
        SellerRating::new(seller_id, Uuid::new_v4(), Uuid::new_v4(), value, None)
    }

    #[test]
    fn aggregate_of_five_and_three_is_four() {
        let seller = Uuid::new_v4();
        let ratings = vec![rating_of(seller, 5), rating_of(seller, 3)];
        assert_eq!(aggregate_ratings(&ratings), (4.0, 2));
    }

    #[test]
    fn aggregate_rounds_to_two_decimals() {
        let seller = Uuid::new_v4();
        let ratings = vec![rating_of(seller, 5), rating_of(seller, 4), rating_of(seller, 4)];
        assert_eq!(aggregate_ratings(&ratings), (4.33, 3));
    }

    #[test]
    fn aggregate_of_nothing_is_zero() {
        assert_eq!(aggregate_ratings(&[]), (0.0, 0));
    }

    #[test]
    fn state_is_null_for_missing_listing() {
        assert!(buyer_rating_state(Uuid::new_v4(), None, None).is_none());
    }

    #[test]
    fn state_is_null_for_non_purchaser() {
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, Uuid::new_v4());
        let other_buyer = Uuid::new_v4();
        assert!(buyer_rating_state(other_buyer, Some(&listing), None).is_none());
    }

    #[test]
    fn purchaser_without_rating_can_rate() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, buyer);
        let state = buyer_rating_state(buyer, Some(&listing), None).unwrap();
        assert!(state.can_rate);
        assert!(!state.has_rated);
        assert_eq!(state.seller_id, seller);
        assert!(state.rating_id.is_none());
    }

    #[test]
    fn purchaser_with_rating_cannot_rate_again() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let listing = sold_listing(seller, buyer);
        let existing = SellerRating::new(seller, buyer, listing.id, 4, Some("Great".to_string()));
        let state = buyer_rating_state(buyer, Some(&listing), Some(&existing)).unwrap();
        assert!(!state.can_rate);
        assert!(state.has_rated);
        assert_eq!(state.rating_value, Some(4));
        assert_eq!(state.review.as_deref(), Some("Great"));
    }

    #[test]
    fn unsold_listing_blocks_can_rate_but_keeps_state() {
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let mut listing = sold_listing(seller, buyer);
        listing.status = ListingStatus::Hidden;
        let state = buyer_rating_state(buyer, Some(&listing), None).unwrap();
        assert!(!state.can_rate);
    }
}
