//! Availability and ledger-reporting scenarios over the in-memory store.

use std::sync::Arc;

use bookcore::{
    Customer, CustomerId, DurationMinutes, FinancialRecord, FixedClock, LedgerCategory,
    LedgerReport, MaxCapacity, Money, OperatingWindow, RecordStore, Scheduler, ServiceId,
    ServiceOffering, Timestamp, WriteBatch,
};
use bookcore_memory::InMemoryRecordStore;
use chrono::{NaiveDate, TimeZone, Utc};

fn ts(hour: u32, min: u32) -> Timestamp {
    Timestamp::new(Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap())
}

fn minutes(m: u32) -> DurationMinutes {
    DurationMinutes::try_new(m).unwrap()
}

fn seeded() -> (InMemoryRecordStore, Scheduler<InMemoryRecordStore>, CustomerId, ServiceId) {
    let store = InMemoryRecordStore::new();
    let customer = CustomerId::new();
    store.insert_customer(Customer::new(customer, "Cedar Fox", ts(6, 0)));
    let service = ServiceId::new();
    store.insert_service(ServiceOffering {
        id: service,
        name: "Hot Spring Bath".into(),
        price: Money::from_cents(4500),
        duration: minutes(60),
        max_capacity: MaxCapacity::try_new(1).unwrap(),
        is_available: true,
    });
    let scheduler = Scheduler::new(store.clone(), Arc::new(FixedClock::at(ts(7, 0))));
    (store, scheduler, customer, service)
}

#[tokio::test]
async fn available_slots_reflect_existing_bookings() {
    let (_store, scheduler, customer, service) = seeded();
    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();

    scheduler
        .create_appointment(customer, service, ts(10, 0), None, None)
        .await
        .unwrap();

    let slots = scheduler
        .available_slots(service, date, OperatingWindow::default(), None)
        .await
        .unwrap();
    let starts: Vec<_> = slots.iter().collect();

    // 60-minute service, 30-minute grid, 09:00-17:00 window, 10:00-11:00
    // occupied: 09:30, 10:00, and 10:30 candidates all cross the booking.
    assert_eq!(starts.first().copied(), Some(ts(9, 0)));
    assert!(!starts.contains(&ts(9, 30)));
    assert!(!starts.contains(&ts(10, 0)));
    assert!(!starts.contains(&ts(10, 30)));
    assert!(starts.contains(&ts(11, 0)));
    // 16:30 + 60 overshoots closing; 16:00 is the last candidate.
    assert_eq!(starts.last().copied(), Some(ts(16, 0)));

    // Restartable: a second pass over the same value agrees.
    assert_eq!(starts, slots.iter().collect::<Vec<_>>());

    // Every offered slot passes the conflict check it is derived from.
    for start in starts {
        let check = scheduler
            .check_conflict(service, bookcore::TimeSlot::new(start, minutes(60)), None)
            .await
            .unwrap();
        assert!(!check.would_conflict());
    }
}

#[tokio::test]
async fn unavailable_service_offers_no_slots() {
    let (store, scheduler, _customer, _service) = seeded();
    let closed = ServiceId::new();
    store.insert_service(ServiceOffering {
        id: closed,
        name: "Winter Plunge".into(),
        price: Money::from_cents(2000),
        duration: minutes(30),
        max_capacity: MaxCapacity::try_new(1).unwrap(),
        is_available: false,
    });
    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let slots = scheduler
        .available_slots(closed, date, OperatingWindow::default(), None)
        .await
        .unwrap();
    assert_eq!(slots.iter().count(), 0);
}

#[tokio::test]
async fn custom_granularity_changes_the_grid() {
    let (_store, scheduler, _customer, service) = seeded();
    let date = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
    let slots = scheduler
        .available_slots(service, date, OperatingWindow::default(), Some(minutes(120)))
        .await
        .unwrap();
    let starts: Vec<_> = slots.iter().collect();
    assert_eq!(starts, vec![ts(9, 0), ts(11, 0), ts(13, 0), ts(15, 0)]);
}

#[tokio::test]
async fn summary_combines_posted_revenue_and_entered_expenses() {
    let (store, scheduler, customer, service) = seeded();

    let first = scheduler
        .create_appointment(customer, service, ts(9, 0), None, None)
        .await
        .unwrap();
    let second = scheduler
        .create_appointment(customer, service, ts(11, 0), None, None)
        .await
        .unwrap();
    scheduler.complete_appointment(first.id).await.unwrap();
    scheduler.complete_appointment(second.id).await.unwrap();

    // Expenses enter through the surrounding application's workflow; here
    // that is a plain batch append.
    let towels = FinancialRecord::expense(
        Money::from_cents(1200),
        LedgerCategory::Supplies,
        "towels",
        None,
        Some("R-778".into()),
        ts(12, 0),
    )
    .unwrap();
    let heater = FinancialRecord::expense(
        Money::from_cents(30_000),
        LedgerCategory::Equipment,
        "replacement heater",
        None,
        None,
        ts(13, 0),
    )
    .unwrap();
    store
        .commit(WriteBatch::new().append_ledger(towels).append_ledger(heater))
        .await
        .unwrap();

    let report = LedgerReport::new(&store);
    assert_eq!(
        report.revenue_total(None, None).await.unwrap(),
        Money::from_cents(9000)
    );
    assert_eq!(
        report.expense_total(None, None).await.unwrap(),
        Money::from_cents(31_200)
    );

    let summary = report.summary(None, None).await.unwrap();
    assert_eq!(summary.net_cents, 9000 - 31_200);
    assert!(!summary.is_profitable());
    assert_eq!(
        summary.expense_breakdown.get(&LedgerCategory::Supplies),
        Some(&Money::from_cents(1200))
    );
    assert_eq!(
        summary.expense_breakdown.get(&LedgerCategory::Equipment),
        Some(&Money::from_cents(30_000))
    );

    // A date range clips the books: only the towels fall before 12:30.
    let morning = report.summary(None, Some(ts(12, 30))).await.unwrap();
    assert_eq!(morning.revenue, Money::from_cents(9000));
    assert_eq!(morning.expenses, Money::from_cents(1200));
    assert!(morning.is_profitable());
}
