//! Contention on a file-backed database with a real connection pool.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{product, stock};
use tally_core::{CoreError, InvoiceStatus, Money, NewTransaction, OrderLineRequest, PaymentMethod, PaymentType, PlaceOrderRequest};
use tally_db::{Database, DbConfig, DbError};
use tally_engine::{BackOffice, EngineError};
use tempfile::TempDir;

const CONTENDERS: usize = 8;

async fn file_office(dir: &TempDir) -> BackOffice {
    let config = DbConfig::new(dir.path().join("tally.db"))
        .max_connections(CONTENDERS as u32)
        .busy_timeout(Duration::from_secs(10));
    BackOffice::with_defaults(Database::new(config).await.unwrap())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_never_oversell() {
    let dir = TempDir::new().unwrap();
    let office = Arc::new(file_office(&dir).await);
    let p = product(&office, "LAST", 25_00, 5, 0).await;

    let mut handles = Vec::new();
    for i in 0..CONTENDERS {
        let office = Arc::clone(&office);
        let product_id = p.id.clone();
        handles.push(tokio::spawn(async move {
            office
                .place_order(PlaceOrderRequest::new(
                    format!("clerk-{}", i),
                    vec![OrderLineRequest::new(product_id, 5)],
                ))
                .await
        }));
    }

    let mut placed = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => placed += 1,
            Err(EngineError::Core(CoreError::InsufficientStock { available, requested, .. })) => {
                assert_eq!(available, 0);
                assert_eq!(requested, 5);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(rejected, CONTENDERS - 1);

    let level = stock(&office, &p.id).await;
    assert_eq!((level.on_hand, level.reserved), (5, 5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_never_overpay() {
    let dir = TempDir::new().unwrap();
    let office = Arc::new(file_office(&dir).await);
    let recorded = office
        .record_transaction(NewTransaction::new("cust-1", Money::from_major(100), PaymentType::Credit))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..CONTENDERS {
        let office = Arc::clone(&office);
        let invoice_id = recorded.invoice.id.clone();
        handles.push(tokio::spawn(async move {
            office
                .apply_invoice_payment(&invoice_id, Money::from_major(60), PaymentMethod::Cash, None)
                .await
        }));
    }

    let mut applied = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => applied += 1,
            Err(EngineError::Core(CoreError::Overpayment { .. })) => {}
            Err(EngineError::Db(DbError::Conflict { .. })) => {}
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }
    assert_eq!(applied, 1);

    let invoice = office.get_invoice(&recorded.invoice.id).await.unwrap();
    assert_eq!(invoice.paid_amount(), Money::from_major(60));
    assert_eq!(invoice.status, InvoiceStatus::Partial);
    assert_eq!(office.invoice_payments(&invoice.id).await.unwrap().len(), 1);
}
