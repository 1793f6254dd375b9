//! Integration tests for the product catalog and reviews.
//!
//! These tests require:
//! - A migrated and seeded `PostgreSQL` database (bazaar-cli migrate, seed import)
//! - The API server running (cargo run -p bazaar-api)

use bazaar_core::product::{NewReview, ProductUpdate};
use bazaar_core::types::ProductId;
use bazaar_integration_tests::{api, base_url, login_admin, register_user};
use rust_decimal::Decimal;
use uuid::Uuid;

fn edit(name: &str, price: Decimal) -> ProductUpdate {
    ProductUpdate {
        name: name.to_string(),
        price,
        description: "Made by the integration suite".to_string(),
        image: "/images/sample.jpg".to_string(),
        brand: "Bazaar".to_string(),
        category: "Testing".to_string(),
        count_in_stock: 4,
    }
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_health() {
    let response = reqwest::get(format!("{}/health", base_url())).await.unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_list_products_first_page() {
    let page = api().list_products(None, 1).await.unwrap();

    assert_eq!(page.page, 1);
    assert!(page.pages >= 1);
    assert!(!page.products.is_empty());
    assert!(page.products.len() <= 10);
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_keyword_matches_case_insensitively() {
    let page = api().list_products(Some("IPHONE"), 1).await.unwrap();

    assert!(!page.products.is_empty());
    assert!(
        page.products
            .iter()
            .all(|p| p.name.to_lowercase().contains("iphone"))
    );
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_unknown_keyword_is_empty_page() {
    let page = api()
        .list_products(Some("no-such-product-zzz"), 1)
        .await
        .unwrap();

    assert!(page.products.is_empty());
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_top_products_sorted_by_rating() {
    let top = api().top_products().await.unwrap();

    assert!(top.len() <= 3);
    assert!(top.windows(2).all(|w| w[0].rating >= w[1].rating));
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_malformed_product_id_is_bad_request() {
    let response = reqwest::get(format!("{}/api/products/not-a-number", base_url()))
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Invalid product id");
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_product_lifecycle_with_reviews() {
    let api = api();
    let admin = login_admin(&api).await;
    let admin_token = Some(admin.token.as_str());

    let created = api.create_product(admin_token).await.unwrap();
    assert_eq!(created.name, "Sample name");
    assert_eq!(created.num_reviews, 0);

    let err = api
        .update_product(
            admin_token,
            created.id,
            &edit("Integration Widget", Decimal::new(10_000_000_000, 0)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message(), "Price cannot exceed 9999999999.99");

    let err = api
        .update_product(
            admin_token,
            created.id,
            &edit("Integration Widget", Decimal::new(19_999, 3)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));

    let updated = api
        .update_product(
            admin_token,
            created.id,
            &edit("Integration Widget", Decimal::new(1999, 2)),
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Integration Widget");
    assert_eq!(updated.count_in_stock, 4);

    let first = register_user(&api, "reviewer-a").await;
    let second = register_user(&api, "reviewer-b").await;

    api.create_review(
        Some(&first.token),
        created.id,
        &NewReview {
            rating: 5,
            comment: "Great".to_string(),
        },
    )
    .await
    .unwrap();
    api.create_review(
        Some(&second.token),
        created.id,
        &NewReview {
            rating: 2,
            comment: "Meh".to_string(),
        },
    )
    .await
    .unwrap();

    let err = api
        .create_review(
            Some(&first.token),
            created.id,
            &NewReview {
                rating: 1,
                comment: "Changed my mind".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(err.message(), "Product already reviewed");

    let reviewed = api.product(created.id).await.unwrap();
    assert_eq!(reviewed.num_reviews, 2);
    assert!((reviewed.rating - 3.5).abs() < f64::EPSILON);

    let removed = api.delete_product(admin_token, created.id).await.unwrap();
    assert_eq!(removed.message, "Product removed");

    let err = api.product(created.id).await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.message(), "Product not found");
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_catalog_writes_require_admin() {
    let api = api();
    let user = register_user(&api, "shopper").await;

    let err = api.create_product(Some(&user.token)).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.message(), "Not authorized as an admin");
}

#[tokio::test]
#[ignore = "Requires running API server and seeded database"]
async fn test_pages_follow_product_id_order() {
    let api = api();
    let admin = login_admin(&api).await;
    let admin_token = Some(admin.token.as_str());

    // A unique name keeps other tests' products out of the listing
    let tag = format!("Paging{}", Uuid::new_v4().simple());
    let count: u32 = 11;
    let mut ids: Vec<ProductId> = Vec::new();
    for n in 0..count {
        let created = api.create_product(admin_token).await.unwrap();
        api.update_product(
            admin_token,
            created.id,
            &edit(&format!("{tag} {n}"), Decimal::ONE),
        )
        .await
        .unwrap();
        ids.push(created.id);
    }
    ids.sort();

    let first = api.list_products(Some(&tag), 1).await.unwrap();
    let second = api.list_products(Some(&tag), 2).await.unwrap();

    assert_eq!(first.pages, count.div_ceil(10));
    assert_eq!(second.pages, first.pages);
    assert_eq!(second.page, 2);
    assert_eq!(first.products.len(), 10);
    assert_eq!(second.products[0].id, ids[10]);

    let listed: Vec<ProductId> = first
        .products
        .iter()
        .chain(&second.products)
        .map(|p| p.id)
        .collect();
    assert_eq!(listed, ids);

    for id in ids {
        api.delete_product(admin_token, id).await.unwrap();
    }
}
