//! End-to-end back-office workflows on an in-memory database.

mod common;

use common::{office, product, stock};
use tally_core::{
    AccountName, CoreError, DateRange, EntryFilter, EntryType, InvoiceStatus, InvoiceType, LedgerStatus, Money,
    NewTransaction, OrderLineRequest, OrderStatus, OrderStatusChange, PaymentMethod, PaymentType, PlaceOrderRequest,
    PostingRequest, TransactionStatus,
};
use tally_engine::{EngineError, LedgerOutcome, DEFAULT_LIST_LIMIT};

#[tokio::test]
async fn full_order_sells_out_and_posts_sale() {
    let office = office().await;
    let p = product(&office, "WATER", 100_00, 10, 0).await;

    let order = office
        .place_order(PlaceOrderRequest::new("clerk-1", vec![OrderLineRequest::new(&p.id, 10)]))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total(), Money::from_major(1000));
    let level = stock(&office, &p.id).await;
    assert_eq!((level.on_hand, level.reserved), (10, 10));

    let done = office
        .set_order_status(&order.id, OrderStatusChange::complete(PaymentType::Cash))
        .await
        .unwrap();
    assert_eq!(done.order.status, OrderStatus::Completed);
    assert!(done.skipped.is_empty());
    let level = stock(&office, &p.id).await;
    assert_eq!((level.on_hand, level.reserved), (0, 0));

    let LedgerOutcome::Posted(posting) = done.ledger else {
        panic!("expected a SALE posting, got {:?}", done.ledger);
    };
    assert_eq!(posting.debit.entry_type, EntryType::Sale);
    assert_eq!(posting.debit.account_name, AccountName::Cash);
    assert_eq!(posting.credit.account_name, AccountName::SalesRevenue);
    assert_eq!(posting.amount(), Money::from_major(1000));

    let entries = office
        .ledger_entries(&EntryFilter::for_order(&order.id), DEFAULT_LIST_LIMIT)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let err = office
        .place_order(PlaceOrderRequest::new("clerk-1", vec![OrderLineRequest::new(&p.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStock { available: 0, requested: 1, .. })
    ));
}

#[tokio::test]
async fn credit_transaction_paid_in_full_issues_receipt() {
    let office = office().await;
    let recorded = office
        .record_transaction(NewTransaction::new("cust-9", Money::from_major(500), PaymentType::Credit))
        .await
        .unwrap();
    assert_eq!(recorded.transaction.status, TransactionStatus::Pending);
    assert_eq!(recorded.invoice.status, InvoiceStatus::Outstanding);
    assert_eq!(recorded.invoice.remaining_amount(), Money::from_major(500));

    let outcome = office
        .apply_invoice_payment(&recorded.invoice.id, Money::from_major(500), PaymentMethod::Cash, None)
        .await
        .unwrap();
    assert_eq!(outcome.invoice.status, InvoiceStatus::Paid);
    assert_eq!(outcome.invoice.remaining_amount(), Money::zero());

    let receipt = outcome.receipt.expect("settling payment issues a receipt");
    assert_eq!(receipt.invoice_type, InvoiceType::Receipt);
    assert_eq!(receipt.status, InvoiceStatus::Paid);
    assert_eq!(receipt.original_amount(), Money::from_major(500));
    assert_eq!(receipt.settles_invoice_id.as_deref(), Some(recorded.invoice.id.as_str()));
    assert_eq!(receipt.invoice_number, "RCT-000001");

    let paid = office.pay_receivable(&recorded.transaction.id).await.unwrap();
    assert_eq!(paid.transaction.status, TransactionStatus::Paid);
    assert!(paid.transaction.paid_at.is_some());

    let invoices = office.list_invoices_for_customer("cust-9").await.unwrap();
    assert_eq!(invoices.len(), 2);
}

#[tokio::test]
async fn discount_starts_exactly_at_threshold() {
    let office = office().await;
    let at = product(&office, "AT", 300_000_00, 1, 1000).await;
    let below = product(&office, "BELOW", 299_999_99, 1, 1000).await;

    let discounted = office
        .place_order(PlaceOrderRequest::new("clerk", vec![OrderLineRequest::new(&at.id, 1)]))
        .await
        .unwrap();
    assert_eq!(discounted.original_total(), Money::from_major(300_000));
    assert_eq!(discounted.total(), Money::from_major(270_000));
    assert_eq!(discounted.items[0].discount_bps, 1000);

    let full_price = office
        .place_order(PlaceOrderRequest::new("clerk", vec![OrderLineRequest::new(&below.id, 1)]))
        .await
        .unwrap();
    assert_eq!(full_price.total(), Money::from_cents(299_999_99));
    assert_eq!(full_price.discount_total(), Money::zero());
}

#[tokio::test]
async fn invoice_payments_only_move_forward() {
    let office = office().await;
    let recorded = office
        .record_transaction(NewTransaction::new("cust-1", Money::from_major(300), PaymentType::Credit))
        .await
        .unwrap();
    let id = recorded.invoice.id.clone();

    let mut last_remaining = recorded.invoice.remaining_amount();
    let mut statuses = vec![recorded.invoice.status];
    for amount in [100, 150, 50] {
        let outcome = office
            .apply_invoice_payment(&id, Money::from_major(amount), PaymentMethod::BankTransfer, None)
            .await
            .unwrap();
        assert!(outcome.invoice.remaining_amount() < last_remaining);
        last_remaining = outcome.invoice.remaining_amount();
        statuses.push(outcome.invoice.status);
    }
    assert_eq!(
        statuses,
        vec![
            InvoiceStatus::Outstanding,
            InvoiceStatus::Partial,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid
        ]
    );

    let payments = office.invoice_payments(&id).await.unwrap();
    assert_eq!(payments.len(), 3);
    let total: Money = payments.iter().map(|p| p.amount()).sum();
    assert_eq!(total, Money::from_major(300));

    let err = office
        .apply_invoice_payment(&id, Money::from_major(1), PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::InvalidTransition { .. })));
}

#[tokio::test]
async fn overpayment_leaves_invoice_untouched() {
    let office = office().await;
    let recorded = office
        .record_transaction(NewTransaction::new("cust-1", Money::from_major(100), PaymentType::Credit))
        .await
        .unwrap();
    office
        .apply_invoice_payment(&recorded.invoice.id, Money::from_major(60), PaymentMethod::Cash, None)
        .await
        .unwrap();

    let err = office
        .apply_invoice_payment(&recorded.invoice.id, Money::from_major(50), PaymentMethod::Cash, None)
        .await
        .unwrap_err();
    match err {
        EngineError::Core(CoreError::Overpayment { attempted, remaining, .. }) => {
            assert_eq!(attempted, Money::from_major(50));
            assert_eq!(remaining, Money::from_major(40));
        }
        other => panic!("expected overpayment, got {:?}", other),
    }

    let invoice = office.get_invoice(&recorded.invoice.id).await.unwrap();
    assert_eq!(invoice.paid_amount(), Money::from_major(60));
    assert_eq!(invoice.status, InvoiceStatus::Partial);
    assert_eq!(office.invoice_payments(&invoice.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn invoice_numbers_follow_their_series() {
    let office = office().await;
    let mut numbers = Vec::new();
    for customer in ["a", "b", "c"] {
        let recorded = office
            .record_transaction(NewTransaction::new(customer, Money::from_major(10), PaymentType::Cash))
            .await
            .unwrap();
        numbers.push(recorded.invoice.invoice_number);
    }
    assert_eq!(numbers, vec!["INV-000001", "INV-000002", "INV-000003"]);
}

#[tokio::test]
async fn books_balance_after_mixed_activity() {
    let office = office().await;
    let p = product(&office, "RICE", 50_00, 20, 0).await;

    let cash = office
        .place_order(PlaceOrderRequest::new("clerk", vec![OrderLineRequest::new(&p.id, 4)]))
        .await
        .unwrap();
    office
        .set_order_status(&cash.id, OrderStatusChange::complete(PaymentType::Cash))
        .await
        .unwrap();

    let credit = office
        .place_order(
            PlaceOrderRequest::new("clerk", vec![OrderLineRequest::new(&p.id, 2)]).with_customer("cust-3"),
        )
        .await
        .unwrap();
    office
        .set_order_status(&credit.id, OrderStatusChange::complete(PaymentType::Credit))
        .await
        .unwrap();

    let receivable = office
        .record_transaction(
            NewTransaction::new("cust-3", credit.total(), PaymentType::Credit).for_order(&credit.id),
        )
        .await
        .unwrap();
    assert_eq!(receivable.invoice.invoice_type, InvoiceType::Sales);
    assert_eq!(receivable.invoice.items.len(), 1);
    office.pay_receivable(&receivable.transaction.id).await.unwrap();

    let rent = office
        .post_journal(PostingRequest::journal(
            EntryType::Expense,
            AccountName::OperatingExpenses,
            AccountName::Cash,
            Money::from_major(40),
            "Rent",
        ))
        .await
        .unwrap();
    let mistake = office
        .post_journal(PostingRequest::journal(
            EntryType::Purchase,
            AccountName::Inventory,
            AccountName::Cash,
            Money::from_major(15),
            "Duplicate delivery",
        ))
        .await
        .unwrap();
    office.cancel_posting(&mistake.posting_id).await.unwrap();
    office.reverse_posting(&rent.posting_id).await.unwrap();

    let trial = office.verify_books(&DateRange::all()).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, trial.total_credit);

    // 200 cash sale + 100 credit sale collected; rent reversed; purchase cancelled.
    let cash_account = office.account_balance(AccountName::Cash, &DateRange::all()).await.unwrap();
    assert_eq!(cash_account.balance, Money::from_major(300));
    let receivables = office
        .account_balance(AccountName::AccountsReceivable, &DateRange::all())
        .await
        .unwrap();
    assert_eq!(receivables.balance, Money::zero());

    let pnl = office.profit_and_loss(&DateRange::all()).await.unwrap();
    assert_eq!(pnl.total_revenue, Money::from_major(300));
    assert_eq!(pnl.net_profit, Money::from_major(300));

    let sheet = office.balance_sheet(&DateRange::all()).await.unwrap();
    assert!(sheet.is_balanced);
    assert_eq!(sheet.difference, sheet.net_profit);

    let cancelled = office
        .ledger_entries(
            &EntryFilter {
                status: Some(LedgerStatus::Cancelled),
                ..Default::default()
            },
            DEFAULT_LIST_LIMIT,
        )
        .await
        .unwrap();
    assert_eq!(cancelled.len(), 2);
}

#[tokio::test]
async fn stock_moves_only_through_reservations() {
    let office = office().await;
    let a = product(&office, "A", 10_00, 5, 0).await;
    let b = product(&office, "B", 20_00, 3, 0).await;

    let kept = office
        .place_order(PlaceOrderRequest::new(
            "clerk",
            vec![OrderLineRequest::new(&a.id, 2), OrderLineRequest::new(&b.id, 1)],
        ))
        .await
        .unwrap();

    // A can be reserved, B cannot; nothing sticks.
    let err = office
        .place_order(PlaceOrderRequest::new(
            "clerk",
            vec![OrderLineRequest::new(&a.id, 1), OrderLineRequest::new(&b.id, 3)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Core(CoreError::InsufficientStock { .. })));
    let level = stock(&office, &a.id).await;
    assert_eq!((level.on_hand, level.reserved), (5, 2));

    let dropped = office
        .place_order(PlaceOrderRequest::new("clerk", vec![OrderLineRequest::new(&a.id, 3)]))
        .await
        .unwrap();

    let level = stock(&office, &a.id).await;
    assert_eq!((level.on_hand, level.reserved), (5, 5));
    assert!(level.is_consistent());

    office.set_order_status(&dropped.id, OrderStatusChange::cancel()).await.unwrap();
    let level = stock(&office, &a.id).await;
    assert_eq!((level.on_hand, level.reserved), (5, 2));

    office
        .set_order_status(&kept.id, OrderStatusChange::complete(PaymentType::Cash))
        .await
        .unwrap();
    let a_level = stock(&office, &a.id).await;
    let b_level = stock(&office, &b.id).await;
    assert_eq!((a_level.on_hand, a_level.reserved), (3, 0));
    assert_eq!((b_level.on_hand, b_level.reserved), (2, 0));

    let completed = office
        .list_orders(Some(OrderStatus::Completed), DEFAULT_LIST_LIMIT)
        .await
        .unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, kept.id);
}
