//! Query and Pagination Tests
//!
//! Filtering, ordering, limits, cursor continuation, and the
//! offset-to-cursor pagination envelope (exact totals, navigation
//! flags, timing metadata).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use doccache::query::OrderDirection;
use doccache::{
    AccessConfig, DataAccess, FilterOp, MemoryStore, OrderSpec, PageOptions, QueryOptions, Stored,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Car {
    make: String,
    price: i64,
}

fn car(make: &str, price: i64) -> Car {
    Car {
        make: make.to_string(),
        price,
    }
}

fn access() -> (Arc<MemoryStore>, DataAccess<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let access = DataAccess::with_config(
        Arc::clone(&store),
        AccessConfig {
            audit_enabled: false,
            ..AccessConfig::default()
        },
    );
    (store, access)
}

async fn seed(access: &DataAccess<MemoryStore>, cars: &[(&str, i64)]) {
    for (make, price) in cars {
        access.create("cars", &car(make, *price)).await.unwrap();
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Equality filtering returns exactly the matching documents.
#[tokio::test]
async fn test_equality_query() {
    let (_, access) = access();
    seed(
        &access,
        &[
            ("BMW", 20000),
            ("BMW", 25000),
            ("BMW", 30000),
            ("Audi", 22000),
            ("Audi", 28000),
        ],
    )
    .await;

    let options = QueryOptions::new().filter("make", FilterOp::Eq, json!("BMW"));
    let results: Vec<Stored<Car>> = access.query("cars", &options, false).await.unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|doc| doc.fields.make == "BMW"));

    access.destroy();
}

/// Range filters, ordering, and limit compose.
#[tokio::test]
async fn test_range_order_limit() {
    let (_, access) = access();
    seed(
        &access,
        &[
            ("BMW", 20000),
            ("BMW", 25000),
            ("BMW", 30000),
            ("Audi", 22000),
            ("VW", 15000),
        ],
    )
    .await;

    let options = QueryOptions::new()
        .filter("price", FilterOp::Gte, json!(20000))
        .order(OrderSpec::desc("price"))
        .limit(2);
    let results: Vec<Stored<Car>> = access.query("cars", &options, false).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].fields.price, 30000);
    assert_eq!(results[1].fields.price, 25000);

    access.destroy();
}

/// Cursor continuation resumes after the anchor document.
#[tokio::test]
async fn test_cursor_continuation() {
    let (_, access) = access();
    seed(&access, &[("BMW", 10), ("BMW", 20), ("BMW", 30), ("BMW", 40)]).await;

    let ordered = QueryOptions::new().order(OrderSpec::asc("price"));
    let first_page: Vec<Stored<Car>> = access
        .query("cars", &ordered.clone().limit(2), false)
        .await
        .unwrap();
    assert_eq!(first_page[1].fields.price, 20);

    let second_page: Vec<Stored<Car>> = access
        .query(
            "cars",
            &ordered.clone().start_after(first_page[1].id.as_str()).limit(2),
            false,
        )
        .await
        .unwrap();
    assert_eq!(second_page.len(), 2);
    assert_eq!(second_page[0].fields.price, 30);
    assert_eq!(second_page[1].fields.price, 40);

    access.destroy();
}

/// Soft-deleted documents remain queryable and can be excluded with an
/// isActive filter.
#[tokio::test]
async fn test_filter_out_soft_deleted() {
    let (_, access) = access();
    let id = access.create("cars", &car("BMW", 20000)).await.unwrap();
    access.create("cars", &car("BMW", 25000)).await.unwrap();
    access.delete("cars", &id, true).await.unwrap();

    let all: Vec<Stored<Car>> = access
        .query("cars", &QueryOptions::new(), false)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let active: Vec<Stored<Car>> = access
        .query(
            "cars",
            &QueryOptions::new().filter("isActive", FilterOp::Eq, json!(true)),
            false,
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].fields.price, 25000);

    access.destroy();
}

/// An empty collection queries to an empty result set.
#[tokio::test]
async fn test_query_empty_collection() {
    let (_, access) = access();

    let results: Vec<Stored<Car>> = access
        .query("cars", &QueryOptions::new(), false)
        .await
        .unwrap();
    assert!(results.is_empty());

    access.destroy();
}

// =============================================================================
// Pagination
// =============================================================================

/// Page envelope carries exact totals and navigation flags.
#[tokio::test]
async fn test_paginate_totals_and_flags() {
    let (_, access) = access();
    for price in 1..=7 {
        access.create("cars", &car("BMW", price)).await.unwrap();
    }

    let options = PageOptions {
        page: 1,
        page_size: 3,
        order_by: Some("price".to_string()),
        direction: Some(OrderDirection::Asc),
    };

    let page = access.paginate::<Car>("cars", &options, None).await.unwrap();
    assert_eq!(page.data.len(), 3);
    assert_eq!(page.data[0].fields.price, 1);
    assert_eq!(page.pagination.total_items, 7);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next);
    assert!(!page.pagination.has_previous);
    assert!(!page.metadata.from_cache);

    access.destroy();
}

/// Middle and last pages line up with the offset translation.
#[tokio::test]
async fn test_paginate_middle_and_last_pages() {
    let (_, access) = access();
    for price in 1..=7 {
        access.create("cars", &car("BMW", price)).await.unwrap();
    }

    let mut options = PageOptions {
        page: 2,
        page_size: 3,
        order_by: Some("price".to_string()),
        direction: Some(OrderDirection::Asc),
    };

    let middle = access.paginate::<Car>("cars", &options, None).await.unwrap();
    assert_eq!(middle.data.len(), 3);
    assert_eq!(middle.data[0].fields.price, 4);
    assert!(middle.pagination.has_next);
    assert!(middle.pagination.has_previous);

    options.page = 3;
    let last = access.paginate::<Car>("cars", &options, None).await.unwrap();
    assert_eq!(last.data.len(), 1);
    assert_eq!(last.data[0].fields.price, 7);
    assert!(!last.pagination.has_next);
    assert!(last.pagination.has_previous);

    access.destroy();
}

/// A page past the end is empty but still reports exact totals.
#[tokio::test]
async fn test_paginate_beyond_end() {
    let (_, access) = access();
    for price in 1..=5 {
        access.create("cars", &car("BMW", price)).await.unwrap();
    }

    let options = PageOptions {
        page: 4,
        page_size: 3,
        order_by: Some("price".to_string()),
        direction: Some(OrderDirection::Asc),
    };

    let page = access.paginate::<Car>("cars", &options, None).await.unwrap();
    assert!(page.data.is_empty());
    assert_eq!(page.pagination.total_items, 5);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(!page.pagination.has_next);

    access.destroy();
}

/// Filters narrow the totals, not just the page rows.
#[tokio::test]
async fn test_paginate_with_filters() {
    let (_, access) = access();
    seed(
        &access,
        &[
            ("BMW", 20000),
            ("BMW", 25000),
            ("BMW", 30000),
            ("Audi", 22000),
            ("Audi", 28000),
        ],
    )
    .await;

    let filters = QueryOptions::new().filter("make", FilterOp::Eq, json!("BMW"));
    let options = PageOptions {
        page: 1,
        page_size: 2,
        order_by: Some("price".to_string()),
        direction: Some(OrderDirection::Asc),
    };

    let page = access
        .paginate::<Car>("cars", &options, Some(&filters))
        .await
        .unwrap();
    assert_eq!(page.data.len(), 2);
    assert_eq!(page.pagination.total_items, 3);
    assert_eq!(page.pagination.total_pages, 2);
    assert!(page.data.iter().all(|doc| doc.fields.make == "BMW"));

    access.destroy();
}

/// Default ordering is createdAt descending (newest first).
#[tokio::test]
async fn test_paginate_default_order_is_newest_first() {
    let (_, access) = access();
    access.create("cars", &car("first", 1)).await.unwrap();
    access.create("cars", &car("second", 2)).await.unwrap();
    access.create("cars", &car("third", 3)).await.unwrap();

    let page = access
        .paginate::<Car>("cars", &PageOptions::new(1, 2), None)
        .await
        .unwrap();
    assert_eq!(page.data[0].fields.make, "third");
    assert_eq!(page.data[1].fields.make, "second");

    access.destroy();
}
