//! Products and their embedded reviews.
//!
//! A product carries its reviews inline. The `rating` and `num_reviews`
//! fields are derived from that list and must be recomputed whenever it
//! changes; [`Product::add_review`] is the only mutation and does so.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::types::{PageRequest, ProductId, UserId};

/// Number of products returned by the top-rated carousel.
pub const TOP_PRODUCTS: i64 = 3;

/// Lowest accepted review rating.
pub const MIN_RATING: i32 = 1;

/// Highest accepted review rating.
pub const MAX_RATING: i32 = 5;

/// Largest price a product can carry (fits `NUMERIC(12, 2)`).
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);

/// A review stored inside its product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Author display name at the time of submission.
    pub name: String,
    pub rating: u8,
    pub comment: String,
    /// Author.
    pub user: UserId,
    pub created_at: DateTime<Utc>,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    /// The admin who created the product.
    pub user: UserId,
    pub name: String,
    pub image: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub reviews: Vec<Review>,
    /// Mean of review ratings, `0` with no reviews.
    pub rating: f64,
    pub num_reviews: i32,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Errors rejecting a review submission.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("Product already reviewed")]
    AlreadyReviewed,
    #[error("Rating must be between {MIN_RATING} and {MAX_RATING}")]
    InvalidRating(i32),
    #[error("Comment is required")]
    EmptyComment,
}

/// Who is submitting a review.
#[derive(Debug, Clone, Copy)]
pub struct ReviewAuthor<'a> {
    pub id: UserId,
    pub name: &'a str,
}

/// `POST /api/products/{id}/reviews` body.
///
/// Browsers post the rating from a `<select>`, so `"4"` is accepted as well
/// as `4`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReview {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub rating: i32,
    pub comment: String,
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Product {
    /// Whether `user` has already reviewed this product.
    #[must_use]
    pub fn reviewed_by(&self, user: UserId) -> bool {
        self.reviews.iter().any(|r| r.user == user)
    }

    /// Append a review and refresh the derived rating fields.
    ///
    /// # Errors
    ///
    /// Rejects a second review by the same author, a rating outside 1-5, or
    /// a blank comment. The review list is untouched on error.
    pub fn add_review(
        &mut self,
        author: ReviewAuthor<'_>,
        review: NewReview,
        now: DateTime<Utc>,
    ) -> Result<Review, ReviewError> {
        if self.reviewed_by(author.id) {
            return Err(ReviewError::AlreadyReviewed);
        }

        let rating = u8::try_from(review.rating)
            .ok()
            .filter(|r| (MIN_RATING..=MAX_RATING).contains(&i32::from(*r)))
            .ok_or(ReviewError::InvalidRating(review.rating))?;

        let comment = review.comment.trim();
        if comment.is_empty() {
            return Err(ReviewError::EmptyComment);
        }

        let added = Review {
            id: Uuid::new_v4(),
            name: author.name.to_owned(),
            rating,
            comment: comment.to_owned(),
            user: author.id,
            created_at: now,
        };
        self.reviews.push(added.clone());
        self.recompute_rating();
        self.updated_at = now;

        Ok(added)
    }

    /// Recompute `rating` and `num_reviews` from the review list.
    pub fn recompute_rating(&mut self) {
        self.num_reviews = i32::try_from(self.reviews.len()).unwrap_or(i32::MAX);
        self.rating = mean_rating(&self.reviews);
    }
}

/// Mean rating of `reviews`, `0.0` for none.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: u32 = reviews.iter().map(|r| u32::from(r.rating)).sum();
    f64::from(total) / reviews.len() as f64
}

/// Fields written when a product is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub price: Decimal,
    pub image: String,
    pub brand: String,
    pub category: String,
    pub count_in_stock: i32,
    pub description: String,
}

impl NewProduct {
    /// The placeholder product an admin creates and then edits.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            name: "Sample name".to_owned(),
            price: Decimal::ZERO,
            image: "/images/sample.jpg".to_owned(),
            brand: "Sample brand".to_owned(),
            category: "Sample category".to_owned(),
            count_in_stock: 0,
            description: "Sample description".to_owned(),
        }
    }
}

/// Errors rejecting a product edit.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductUpdateError {
    #[error("Price cannot be negative")]
    NegativePrice,
    #[error("Price cannot exceed {MAX_PRICE}")]
    PriceTooLarge,
    #[error("Price cannot have more than 2 decimal places")]
    PriceTooPrecise,
    #[error("Count in stock cannot be negative")]
    NegativeStock,
}

/// `PUT /api/products/{id}` body. Every field is overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image: String,
    pub brand: String,
    pub category: String,
    pub count_in_stock: i32,
}

impl ProductUpdate {
    /// Check the numeric fields.
    ///
    /// # Errors
    ///
    /// Returns an error for a negative stock count, or a price that is
    /// negative, above [`MAX_PRICE`] or finer than cents.
    pub fn validate(&self) -> Result<(), ProductUpdateError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ProductUpdateError::NegativePrice);
        }
        if self.price > MAX_PRICE {
            return Err(ProductUpdateError::PriceTooLarge);
        }
        if self.price.normalize().scale() > 2 {
            return Err(ProductUpdateError::PriceTooPrecise);
        }
        if self.count_in_stock < 0 {
            return Err(ProductUpdateError::NegativeStock);
        }
        Ok(())
    }
}

/// `GET /api/products` query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<String>,
}

impl ProductListQuery {
    /// The search keyword, if one was given and is not blank.
    #[must_use]
    pub fn keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// The requested page, defaulting to the first.
    #[must_use]
    pub fn page(&self) -> PageRequest {
        PageRequest::from_param(self.page_number.as_deref())
    }
}

/// One page of the product catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub page: u32,
    pub pages: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            user: UserId::new(1),
            name: "Airpods Wireless Bluetooth Headphones".to_owned(),
            image: "/images/airpods.jpg".to_owned(),
            brand: "Apple".to_owned(),
            category: "Electronics".to_owned(),
            description: "Bluetooth technology".to_owned(),
            reviews: Vec::new(),
            rating: 0.0,
            num_reviews: 0,
            price: "89.99".parse().unwrap(),
            count_in_stock: 10,
            created_at: now,
            updated_at: now,
        }
    }

    fn author(id: i32) -> ReviewAuthor<'static> {
        ReviewAuthor {
            id: UserId::new(id),
            name: "Jane Doe",
        }
    }

    fn review(rating: i32, comment: &str) -> NewReview {
        NewReview {
            rating,
            comment: comment.to_owned(),
        }
    }

    #[test]
    fn test_add_review_recomputes_rating() {
        let mut p = product();
        p.add_review(author(2), review(5, "Great"), Utc::now()).unwrap();
        p.add_review(author(3), review(4, "Good"), Utc::now()).unwrap();
        p.add_review(author(4), review(2, "Meh"), Utc::now()).unwrap();

        assert_eq!(p.num_reviews, 3);
        assert!((p.rating - 11.0 / 3.0).abs() < f64::EPSILON);
        assert!((p.rating - mean_rating(&p.reviews)).abs() < f64::EPSILON);
    }

    #[test]
    fn test_add_review_records_author() {
        let mut p = product();
        let added = p
            .add_review(author(2), review(4, "  Solid  "), Utc::now())
            .unwrap();
        assert_eq!(added.user, UserId::new(2));
        assert_eq!(added.name, "Jane Doe");
        assert_eq!(added.comment, "Solid");
        assert_eq!(added.rating, 4);
        assert!(p.reviewed_by(UserId::new(2)));
    }

    #[test]
    fn test_duplicate_review_rejected_and_list_unchanged() {
        let mut p = product();
        p.add_review(author(2), review(5, "Great"), Utc::now()).unwrap();
        let before = p.clone();

        let err = p
            .add_review(author(2), review(1, "Changed my mind"), Utc::now())
            .unwrap_err();

        assert_eq!(err, ReviewError::AlreadyReviewed);
        assert_eq!(err.to_string(), "Product already reviewed");
        assert_eq!(p, before);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let mut p = product();
        for rating in [0, 6, -1, 300] {
            let err = p
                .add_review(author(2), review(rating, "x"), Utc::now())
                .unwrap_err();
            assert_eq!(err, ReviewError::InvalidRating(rating));
        }
        assert!(p.reviews.is_empty());
        assert_eq!(p.num_reviews, 0);
    }

    #[test]
    fn test_blank_comment_rejected() {
        let mut p = product();
        let err = p
            .add_review(author(2), review(3, "   "), Utc::now())
            .unwrap_err();
        assert_eq!(err, ReviewError::EmptyComment);
    }

    #[test]
    fn test_mean_rating_empty_is_zero() {
        assert!(mean_rating(&[]).abs() < f64::EPSILON);
    }

    #[test]
    fn test_placeholder_product() {
        let p = NewProduct::placeholder();
        assert_eq!(p.name, "Sample name");
        assert_eq!(p.price, Decimal::ZERO);
        assert_eq!(p.image, "/images/sample.jpg");
        assert_eq!(p.count_in_stock, 0);
    }

    #[test]
    fn test_update_validation() {
        let mut update = ProductUpdate {
            name: "Cam".to_owned(),
            price: "10.50".parse().unwrap(),
            description: "d".to_owned(),
            image: "/images/cam.jpg".to_owned(),
            brand: "b".to_owned(),
            category: "c".to_owned(),
            count_in_stock: 3,
        };
        assert!(update.validate().is_ok());

        update.count_in_stock = -1;
        assert_eq!(update.validate(), Err(ProductUpdateError::NegativeStock));

        update.count_in_stock = 0;
        update.price = "-0.01".parse().unwrap();
        assert_eq!(update.validate(), Err(ProductUpdateError::NegativePrice));
    }

    #[test]
    fn test_update_price_must_fit_storage() {
        let mut update = ProductUpdate {
            name: "Cam".to_owned(),
            price: MAX_PRICE,
            description: "d".to_owned(),
            image: "/images/cam.jpg".to_owned(),
            brand: "b".to_owned(),
            category: "c".to_owned(),
            count_in_stock: 3,
        };
        assert_eq!(MAX_PRICE.to_string(), "9999999999.99");
        assert!(update.validate().is_ok());

        update.price = "10000000000".parse().unwrap();
        assert_eq!(update.validate(), Err(ProductUpdateError::PriceTooLarge));

        update.price = "19.999".parse().unwrap();
        assert_eq!(update.validate(), Err(ProductUpdateError::PriceTooPrecise));

        // Trailing zeros are not extra precision
        update.price = "19.9900".parse().unwrap();
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_review_rating_accepts_number_or_string() {
        let from_number: NewReview =
            serde_json::from_str(r#"{"rating":4,"comment":"Nice"}"#).unwrap();
        let from_string: NewReview =
            serde_json::from_str(r#"{"rating":" 4 ","comment":"Nice"}"#).unwrap();
        assert_eq!(from_number, review(4, "Nice"));
        assert_eq!(from_string, review(4, "Nice"));

        assert!(serde_json::from_str::<NewReview>(r#"{"rating":"four","comment":"x"}"#).is_err());
        assert!(serde_json::from_str::<NewReview>(r#"{"rating":null,"comment":"x"}"#).is_err());
    }

    #[test]
    fn test_update_accepts_numeric_price() {
        let update: ProductUpdate = serde_json::from_str(
            r#"{"name":"n","price":12.5,"description":"d","image":"i","brand":"b","category":"c","countInStock":2}"#,
        )
        .unwrap();
        assert_eq!(update.price, "12.5".parse().unwrap());
    }

    #[test]
    fn test_list_query_defaults() {
        let q = ProductListQuery::default();
        assert_eq!(q.keyword(), None);
        assert_eq!(q.page().page(), 1);

        let q = ProductListQuery {
            keyword: Some("  ".to_owned()),
            page_number: Some("2".to_owned()),
        };
        assert_eq!(q.keyword(), None);
        assert_eq!(q.page().offset(), 10);
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(product()).unwrap();
        assert_eq!(json["_id"], 1);
        assert_eq!(json["countInStock"], 10);
        assert_eq!(json["numReviews"], 0);
        assert_eq!(json["price"], "89.99");
        assert!(json.get("id").is_none());
    }
}
