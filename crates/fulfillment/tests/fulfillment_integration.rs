//! Integration tests for order creation and the order lifecycle.

use async_trait::async_trait;
use common::{OrderId, ProductId};
use domain::{Money, NewProduct, Order, OrderStatus, Product, ProductPatch};
use fulfillment::{FulfillmentError, OrderLineRequest, OrderService, ProductService, StockCheck};
use store::{Committed, InMemoryStore, Store, StoreExt, UnitOfWork};

struct TestHarness {
    store: InMemoryStore,
    orders: OrderService<InMemoryStore>,
    products: ProductService<InMemoryStore>,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryStore::new();
        Self {
            orders: OrderService::new(store.clone()),
            products: ProductService::new(store.clone()),
            store,
        }
    }

    async fn product(&self, name: &str, price: Money, stock: u32) -> Product {
        self.products
            .create_product(NewProduct::new(
                name,
                "Electronics",
                "Integration test product",
                price,
                stock,
            ))
            .await
            .unwrap()
    }

    async fn stock_of(&self, id: &ProductId) -> u32 {
        self.products.get_product(id).await.unwrap().stock_quantity()
    }

    async fn all_stock(&self) -> Vec<u32> {
        self.products
            .list_products()
            .await
            .unwrap()
            .iter()
            .map(Product::stock_quantity)
            .collect()
    }
}

fn line(product: &Product, quantity: u32) -> OrderLineRequest {
    OrderLineRequest::new(product.id().clone(), quantity)
}

fn assert_total_matches_lines(order: &Order) {
    let sum = Money::checked_sum(order.lines().iter().map(|l| l.line_total().unwrap()));
    assert_eq!(Some(order.total()), sum);
}

#[tokio::test]
async fn test_happy_path_order_creation() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 10).await;

    let order = h.orders.create_order(vec![line(&p, 3)]).await.unwrap();

    assert_eq!(order.total(), Money::from_dollars(150));
    assert_eq!(order.status(), OrderStatus::Pending);
    assert_total_matches_lines(&order);
    assert_eq!(h.stock_of(p.id()).await, 7);
}

#[tokio::test]
async fn test_insufficient_stock_leaves_stock_unchanged() {
    let h = TestHarness::new();
    let q = h.product("Scarce", Money::from_dollars(20), 1).await;

    let result = h.orders.create_order(vec![line(&q, 2)]).await;

    match result {
        Err(FulfillmentError::InsufficientStock {
            product_id,
            requested,
            available,
            detected_at,
        }) => {
            assert_eq!(&product_id, q.id());
            assert_eq!(requested, 2);
            assert_eq!(available, 1);
            assert_eq!(detected_at, StockCheck::Validation);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }
    assert_eq!(h.stock_of(q.id()).await, 1);
    assert!(h.orders.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_product_mutates_nothing() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 10).await;

    let result = h
        .orders
        .create_order(vec![line(&p, 1), OrderLineRequest::new("missing-id", 1)])
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::ProductNotFound(id)) if id.as_str() == "missing-id"
    ));
    assert_eq!(h.all_stock().await, vec![10]);
    assert!(h.orders.list_orders().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_partial_validity_fails_whole_order() {
    let h = TestHarness::new();
    let plenty = h.product("Plenty", Money::from_dollars(10), 10).await;
    let scarce = h.product("Scarce", Money::from_dollars(10), 1).await;

    let result = h
        .orders
        .create_order(vec![line(&plenty, 5), line(&scarce, 2)])
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock { product_id, .. }) if &product_id == scarce.id()
    ));
    assert_eq!(h.stock_of(plenty.id()).await, 10);
    assert_eq!(h.stock_of(scarce.id()).await, 1);
}

#[tokio::test]
async fn test_cancellation_restitutes_stock() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 10).await;
    let order = h.orders.create_order(vec![line(&p, 3)]).await.unwrap();
    assert_eq!(h.stock_of(p.id()).await, 7);

    let cancelled = h
        .orders
        .update_order_status(order.id(), OrderStatus::Cancelled)
        .await
        .unwrap();

    assert_eq!(cancelled.status(), OrderStatus::Cancelled);
    assert_total_matches_lines(&cancelled);
    assert_eq!(h.stock_of(p.id()).await, 10);

    let stored = h.orders.get_order(order.id()).await.unwrap();
    assert_eq!(stored.status(), OrderStatus::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_for_last_unit() {
    let h = TestHarness::new();
    let p = h.product("Last One", Money::from_dollars(99), 1).await;

    let spawn_order = |store: InMemoryStore, id: ProductId| {
        tokio::spawn(async move {
            OrderService::new(store)
                .create_order(vec![OrderLineRequest::new(id, 1)])
                .await
        })
    };
    let a = spawn_order(h.store.clone(), p.id().clone());
    let b = spawn_order(h.store.clone(), p.id().clone());
    let results = [a.await.unwrap(), b.await.unwrap()];

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(FulfillmentError::InsufficientStock { available: 0, .. })
    )));
    assert_eq!(h.stock_of(p.id()).await, 0);
    assert_eq!(h.orders.list_orders().await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_cancellations_restitute_once() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(5), 10).await;
    let order = h.orders.create_order(vec![line(&p, 4)]).await.unwrap();

    let spawn_cancel = |store: InMemoryStore, id: OrderId| {
        tokio::spawn(async move {
            OrderService::new(store)
                .update_order_status(&id, OrderStatus::Cancelled)
                .await
        })
    };
    let handles: Vec<_> = (0..8)
        .map(|_| spawn_cancel(h.store.clone(), order.id().clone()))
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(FulfillmentError::InvalidStatusTransition { from, .. }) => {
                assert_eq!(from, OrderStatus::Cancelled);
            }
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(h.stock_of(p.id()).await, 10);
}

#[tokio::test]
async fn test_totals_survive_every_transition() {
    let h = TestHarness::new();
    let a = h.product("A", Money::from_cents(1999), 10).await;
    let b = h.product("B", Money::from_cents(250), 10).await;

    let order = h
        .orders
        .create_order(vec![line(&a, 2), line(&b, 3), line(&a, 1)])
        .await
        .unwrap();
    assert_eq!(order.total(), Money::from_cents(3 * 1999 + 3 * 250));
    assert_total_matches_lines(&order);

    let completed = h
        .orders
        .update_order_status(order.id(), OrderStatus::Completed)
        .await
        .unwrap();
    assert_eq!(completed.total(), order.total());
    assert_eq!(completed.lines(), order.lines());
    assert_total_matches_lines(&completed);
}

#[tokio::test]
async fn test_line_prices_are_snapshotted() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 10).await;
    let order = h.orders.create_order(vec![line(&p, 2)]).await.unwrap();

    h.products
        .update_product(
            p.id(),
            ProductPatch {
                price: Some(Money::from_dollars(75)),
                name: Some("Widget v2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = h.orders.get_order(order.id()).await.unwrap();
    assert_eq!(stored.lines()[0].unit_price, Money::from_dollars(50));
    assert_eq!(stored.lines()[0].product_name, "Widget");
    assert_eq!(stored.total(), Money::from_dollars(100));
}

#[tokio::test]
async fn test_terminal_orders_reject_every_transition() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 10).await;
    let order = h.orders.create_order(vec![line(&p, 1)]).await.unwrap();
    h.orders
        .update_order_status(order.id(), OrderStatus::Completed)
        .await
        .unwrap();

    for next in [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ] {
        let result = h.orders.update_order_status(order.id(), next).await;
        assert!(matches!(
            result,
            Err(FulfillmentError::InvalidStatusTransition {
                from: OrderStatus::Completed,
                ..
            })
        ));
    }
    assert_eq!(h.stock_of(p.id()).await, 9);
}

#[tokio::test]
async fn test_restock_then_order() {
    let h = TestHarness::new();
    let p = h.product("Widget", Money::from_dollars(50), 0).await;

    assert!(h.orders.create_order(vec![line(&p, 1)]).await.is_err());

    h.products.restock_product(p.id(), 3).await.unwrap();
    h.orders.create_order(vec![line(&p, 3)]).await.unwrap();
    assert_eq!(h.stock_of(p.id()).await, 0);
}

/// A store that lets another buyer take stock between validation and commit.
#[derive(Clone)]
struct RacingStore {
    inner: InMemoryStore,
    steal: ProductId,
}

#[async_trait]
impl Store for RacingStore {
    async fn find_product(&self, id: &ProductId) -> store::Result<Option<Product>> {
        self.inner.find_product(id).await
    }

    async fn find_products(&self, ids: &[ProductId]) -> store::Result<Vec<Product>> {
        self.inner.find_products(ids).await
    }

    async fn list_products(&self) -> store::Result<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn create_product(&self, attrs: NewProduct) -> store::Result<Product> {
        self.inner.create_product(attrs).await
    }

    async fn update_product(&self, id: &ProductId, patch: ProductPatch) -> store::Result<Product> {
        self.inner.update_product(id, patch).await
    }

    async fn delete_product(&self, id: &ProductId) -> store::Result<()> {
        self.inner.delete_product(id).await
    }

    async fn find_order(&self, id: &OrderId) -> store::Result<Option<Order>> {
        self.inner.find_order(id).await
    }

    async fn list_orders(&self) -> store::Result<Vec<Order>> {
        self.inner.list_orders().await
    }

    async fn commit(&self, work: UnitOfWork) -> store::Result<Committed> {
        self.inner.decrement_stock(&self.steal, 1).await?;
        self.inner.commit(work).await
    }
}

#[tokio::test]
async fn test_stock_taken_after_validation_is_caught_at_commit() {
    let inner = InMemoryStore::new();
    let plenty = inner
        .create_product(NewProduct::new(
            "Plenty",
            "Hardware",
            "Always in stock",
            Money::from_dollars(1),
            10,
        ))
        .await
        .unwrap();
    let contested = inner
        .create_product(NewProduct::new(
            "Contested",
            "Hardware",
            "Last unit",
            Money::from_dollars(1),
            1,
        ))
        .await
        .unwrap();

    let service = OrderService::new(RacingStore {
        inner: inner.clone(),
        steal: contested.id().clone(),
    });
    let result = service
        .create_order(vec![line(&plenty, 4), line(&contested, 1)])
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InsufficientStock {
            detected_at: StockCheck::Commit,
            available: 0,
            ..
        })
    ));
    // the earlier decrement in the same unit of work was rolled back
    let plenty = inner.find_product(plenty.id()).await.unwrap().unwrap();
    assert_eq!(plenty.stock_quantity(), 10);
    assert_eq!(inner.order_count().await, 0);
}
