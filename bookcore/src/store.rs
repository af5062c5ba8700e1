//! Record-store abstraction for `bookcore`.
//!
//! This module defines the [`RecordStore`] trait that serves as the port
//! interface for persistence backends. The trait is backend-independent and
//! built around one primitive: [`RecordStore::commit`], an atomic
//! all-or-nothing batch of heterogeneous record writes, optionally guarded
//! by the schedule version a conflict check observed. Everything the
//! lifecycle needs (insert an appointment, post revenue, bump customer
//! totals) goes through a single commit so partial application cannot
//! happen.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::StoreResult;
use crate::records::{
    Appointment, AppointmentStatus, Customer, FinancialRecord, LedgerCategory, ServiceOffering,
    TransactionType,
};
use crate::types::{AppointmentId, CustomerId, ScheduleVersion, ServiceId, Timestamp};

/// A consistent view of one service's `scheduled` appointments.
///
/// The snapshot carries the schedule version it was taken at; a commit
/// guarded by that version succeeds only if no appointment write for the
/// service landed in between. That is what makes check-then-act race-free
/// with respect to the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSnapshot {
    /// The service the snapshot is for.
    pub service: ServiceId,
    /// All appointments for the service currently in `Scheduled` status.
    pub appointments: Vec<Appointment>,
    /// Version of the schedule at snapshot time.
    pub version: ScheduleVersion,
}

impl ScheduleSnapshot {
    /// Returns a guard pinning commits to this snapshot's version.
    pub const fn guard(&self) -> ScheduleGuard {
        ScheduleGuard {
            service: self.service,
            expected: self.version,
        }
    }
}

/// Optimistic precondition for a batch commit: the named service's schedule
/// must still be at the expected version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleGuard {
    /// The guarded service.
    pub service: ServiceId,
    /// The version the conflict check observed.
    pub expected: ScheduleVersion,
}

/// One write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordWrite {
    /// Insert a brand-new appointment. Fails the batch if the id exists.
    InsertAppointment(Appointment),
    /// Replace an existing appointment. Fails the batch if the id is
    /// unknown.
    UpdateAppointment(Appointment),
    /// Replace an existing customer record (aggregate updates). Fails the
    /// batch if the id is unknown.
    UpdateCustomer(Customer),
    /// Append an immutable ledger entry. A second revenue entry for the
    /// same appointment fails the batch.
    AppendLedger(FinancialRecord),
}

/// An atomic unit of record writes.
///
/// All writes in a batch are applied together or not at all. Implementors
/// must validate the guard and every write before applying any of them; a
/// failed batch leaves the store exactly as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    /// Optional schedule-version precondition.
    pub guard: Option<ScheduleGuard>,
    /// The writes, applied in order.
    pub writes: Vec<RecordWrite>,
}

impl WriteBatch {
    /// Creates an empty, unguarded batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the batch to a schedule snapshot's version.
    #[must_use]
    pub fn guarded_by(mut self, guard: ScheduleGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Adds an appointment insert.
    #[must_use]
    pub fn insert_appointment(mut self, appointment: Appointment) -> Self {
        self.writes.push(RecordWrite::InsertAppointment(appointment));
        self
    }

    /// Adds an appointment replacement.
    #[must_use]
    pub fn update_appointment(mut self, appointment: Appointment) -> Self {
        self.writes.push(RecordWrite::UpdateAppointment(appointment));
        self
    }

    /// Adds a customer replacement.
    #[must_use]
    pub fn update_customer(mut self, customer: Customer) -> Self {
        self.writes.push(RecordWrite::UpdateCustomer(customer));
        self
    }

    /// Adds a ledger append.
    #[must_use]
    pub fn append_ledger(mut self, record: FinancialRecord) -> Self {
        self.writes.push(RecordWrite::AppendLedger(record));
        self
    }

    /// Whether the batch carries no writes.
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Number of writes in the batch.
    pub fn len(&self) -> usize {
        self.writes.len()
    }
}

/// Filter for appointment reads.
///
/// `None` fields do not constrain. The date bounds select on the scheduled
/// start (inclusive), which is what calendar views and reporting filter on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentFilter {
    /// Restrict to one customer.
    pub customer: Option<CustomerId>,
    /// Restrict to one service.
    pub service: Option<ServiceId>,
    /// Restrict to one status.
    pub status: Option<AppointmentStatus>,
    /// Earliest scheduled start to include.
    pub from: Option<Timestamp>,
    /// Latest scheduled start to include.
    pub to: Option<Timestamp>,
}

impl AppointmentFilter {
    /// Matches every appointment.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts to one customer.
    #[must_use]
    pub const fn for_customer(mut self, customer: CustomerId) -> Self {
        self.customer = Some(customer);
        self
    }

    /// Restricts to one service.
    #[must_use]
    pub const fn for_service(mut self, service: ServiceId) -> Self {
        self.service = Some(service);
        self
    }

    /// Restricts to one status.
    #[must_use]
    pub const fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the inclusive scheduled-start range.
    #[must_use]
    pub const fn between(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Whether an appointment passes the filter.
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if let Some(customer) = self.customer {
            if appointment.customer != customer {
                return false;
            }
        }
        if let Some(service) = self.service {
            if appointment.service != service {
                return false;
            }
        }
        if let Some(status) = self.status {
            if appointment.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if appointment.slot.start < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if appointment.slot.start > to {
                return false;
            }
        }
        true
    }
}

/// Filter for ledger reads.
///
/// `None` fields do not constrain; date bounds are inclusive, matching the
/// reporting semantics of the surrounding bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerFilter {
    /// Restrict to revenue or expense entries.
    pub transaction_type: Option<TransactionType>,
    /// Restrict to one category.
    pub category: Option<LedgerCategory>,
    /// Earliest transaction date to include.
    pub from: Option<Timestamp>,
    /// Latest transaction date to include.
    pub to: Option<Timestamp>,
}

impl LedgerFilter {
    /// Matches every entry.
    pub fn any() -> Self {
        Self::default()
    }

    /// Restricts to one transaction type.
    #[must_use]
    pub const fn with_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Restricts to one category.
    #[must_use]
    pub const fn with_category(mut self, category: LedgerCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the inclusive date range. Either bound may be `None`.
    #[must_use]
    pub const fn between(mut self, from: Option<Timestamp>, to: Option<Timestamp>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Whether an entry passes the filter.
    pub fn matches(&self, record: &FinancialRecord) -> bool {
        if let Some(t) = self.transaction_type {
            if record.transaction_type() != t {
                return false;
            }
        }
        if let Some(category) = self.category {
            if record.category != category {
                return false;
            }
        }
        if let Some(from) = self.from {
            if record.transaction_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if record.transaction_date > to {
                return false;
            }
        }
        true
    }
}

/// Port interface for the transactional record store.
///
/// Reads do not require a transaction but must observe a consistent view;
/// [`RecordStore::scheduled_for_service`] pairs its result with the version
/// that [`WriteBatch::guard`] later checks.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a customer by id.
    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>>;

    /// Looks up a service offering by id.
    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<ServiceOffering>>;

    /// Looks up an appointment by id.
    async fn get_appointment(&self, id: AppointmentId) -> StoreResult<Option<Appointment>>;

    /// Snapshot of a service's `scheduled` appointments plus the schedule
    /// version the snapshot was taken at.
    async fn scheduled_for_service(&self, service: ServiceId) -> StoreResult<ScheduleSnapshot>;

    /// Appointments passing the filter, in creation order.
    async fn find_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>>;

    /// Ledger entries passing the filter, in append order.
    async fn ledger_entries(&self, filter: LedgerFilter) -> StoreResult<Vec<FinancialRecord>>;

    /// Current schedule versions, for diagnostics and tests.
    async fn schedule_versions(&self) -> StoreResult<HashMap<ServiceId, ScheduleVersion>>;

    /// Atomically applies a batch: every write lands, or none do and the
    /// error explains why.
    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{AppointmentStatus, TimeSlot};
    use crate::types::{DurationMinutes, Money};
    use chrono::{TimeZone, Utc};

    fn ts(hour: u32) -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2025, 6, 2, hour, 0, 0).unwrap())
    }

    #[test]
    fn batch_builder_preserves_write_order() {
        let appointment = Appointment::book(
            AppointmentId::new(),
            CustomerId::new(),
            ServiceId::new(),
            TimeSlot::new(ts(10), DurationMinutes::try_new(30).unwrap()),
            Money::from_cents(5000),
            None,
            ts(8),
        );
        let entry = FinancialRecord::revenue(
            appointment.id,
            Money::from_cents(5000),
            "visit",
            ts(11),
        )
        .unwrap();

        let batch = WriteBatch::new()
            .update_appointment(appointment.clone())
            .append_ledger(entry);
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert!(matches!(
            &batch.writes[0],
            RecordWrite::UpdateAppointment(a) if a.id == appointment.id
        ));
        assert!(matches!(&batch.writes[1], RecordWrite::AppendLedger(_)));
    }

    #[test]
    fn snapshot_guard_carries_service_and_version() {
        let service = ServiceId::new();
        let snapshot = ScheduleSnapshot {
            service,
            appointments: Vec::new(),
            version: ScheduleVersion::new(7),
        };
        let guard = snapshot.guard();
        assert_eq!(guard.service, service);
        assert_eq!(guard.expected, ScheduleVersion::new(7));
    }

    #[test]
    fn ledger_filter_combines_type_category_and_range() {
        let revenue =
            FinancialRecord::revenue(AppointmentId::new(), Money::from_cents(100), "r", ts(10))
                .unwrap();
        let expense = FinancialRecord::expense(
            Money::from_cents(200),
            LedgerCategory::Supplies,
            "towels",
            None,
            None,
            ts(12),
        )
        .unwrap();

        assert!(LedgerFilter::any().matches(&revenue));
        assert!(LedgerFilter::any().matches(&expense));

        let only_expense = LedgerFilter::any().with_type(TransactionType::Expense);
        assert!(!only_expense.matches(&revenue));
        assert!(only_expense.matches(&expense));

        let supplies = LedgerFilter::any().with_category(LedgerCategory::Supplies);
        assert!(supplies.matches(&expense));
        assert!(!supplies.matches(&revenue));

        let morning = LedgerFilter::any().between(Some(ts(9)), Some(ts(11)));
        assert!(morning.matches(&revenue));
        assert!(!morning.matches(&expense));

        // Bounds are inclusive.
        let exact = LedgerFilter::any().between(Some(ts(10)), Some(ts(10)));
        assert!(exact.matches(&revenue));
    }

    #[test]
    fn appointment_filter_combines_dimensions() {
        let customer = CustomerId::new();
        let service = ServiceId::new();
        let appointment = Appointment::book(
            AppointmentId::new(),
            customer,
            service,
            TimeSlot::new(ts(10), DurationMinutes::try_new(30).unwrap()),
            Money::from_cents(5000),
            None,
            ts(8),
        );

        assert!(AppointmentFilter::any().matches(&appointment));
        assert!(AppointmentFilter::any()
            .for_customer(customer)
            .for_service(service)
            .with_status(AppointmentStatus::Scheduled)
            .matches(&appointment));
        assert!(!AppointmentFilter::any()
            .for_customer(CustomerId::new())
            .matches(&appointment));
        assert!(!AppointmentFilter::any()
            .with_status(AppointmentStatus::Completed)
            .matches(&appointment));
        assert!(AppointmentFilter::any()
            .between(Some(ts(10)), Some(ts(10)))
            .matches(&appointment));
        assert!(!AppointmentFilter::any()
            .between(Some(ts(11)), None)
            .matches(&appointment));
    }

    #[test]
    fn filter_ignores_status_of_referenced_records() {
        // The filter looks only at the ledger entry itself.
        let appointment = Appointment::book(
            AppointmentId::new(),
            CustomerId::new(),
            ServiceId::new(),
            TimeSlot::new(ts(10), DurationMinutes::try_new(30).unwrap()),
            Money::from_cents(5000),
            None,
            ts(8),
        );
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        let entry =
            FinancialRecord::revenue(appointment.id, appointment.amount_charged, "v", ts(11))
                .unwrap();
        assert!(LedgerFilter::any()
            .with_type(TransactionType::Revenue)
            .matches(&entry));
    }
}
