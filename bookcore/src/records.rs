//! Domain records: appointments, customers, service offerings, and ledger
//! entries.
//!
//! The appointment state machine lives here as pure transition methods that
//! consume the record and return the transitioned copy, or an
//! `InvalidState` error when the transition is not legal from the current
//! status. The [`crate::scheduler::Scheduler`] orchestrates persistence
//! around these transitions; nothing in this module touches a store.

use serde::{Deserialize, Serialize};

use crate::errors::SchedulingError;
use crate::types::{
    AppointmentId, CancellationReason, CustomerId, DurationMinutes, LedgerEntryId, MaxCapacity,
    Money, ServiceId, SupplierId, Timestamp,
};

/// A half-open occupation interval [start, start + duration).
///
/// Two slots overlap when `a.start < b.end && b.start < a.end`; intervals
/// that only touch at an endpoint do not overlap, so back-to-back bookings
/// are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    /// Scheduled start of the occupation.
    pub start: Timestamp,
    /// Occupation length in minutes.
    pub duration: DurationMinutes,
}

impl TimeSlot {
    /// Creates a slot from a start timestamp and a duration.
    pub const fn new(start: Timestamp, duration: DurationMinutes) -> Self {
        Self { start, duration }
    }

    /// Exclusive end of the slot.
    pub fn end(&self) -> Timestamp {
        self.start.plus(self.duration.to_duration())
    }

    /// Half-open overlap test against another slot.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    /// Whether the given instant falls inside the slot.
    pub fn covers(&self, instant: Timestamp) -> bool {
        self.start <= instant && instant < self.end()
    }
}

/// The lifecycle status of an appointment.
///
/// `Scheduled` is the only non-terminal status. No transition ever leaves a
/// terminal status; a cancelled slot stays cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked and still expected to happen.
    Scheduled,
    /// The visit happened; revenue has been posted. Terminal.
    Completed,
    /// Called off before the visit. Terminal.
    Cancelled,
    /// The customer never arrived. Terminal.
    NoShow,
}

impl AppointmentStatus {
    /// Whether this status admits no further transitions.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Scheduled)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::NoShow => "no_show",
        };
        f.write_str(s)
    }
}

/// One scheduled occupation of a service slot by a customer.
///
/// Field invariants: `completed_at` is set iff status is `Completed`;
/// `cancelled_at` and `cancellation_reason` are set iff status is
/// `Cancelled`. The transition methods are the only way to move between
/// statuses, so a record obtained from [`Appointment::book`] always
/// satisfies them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    /// Unique identity, assigned at booking and immutable.
    pub id: AppointmentId,
    /// The customer who booked. Referenced, never owned.
    pub customer: CustomerId,
    /// The service being occupied. Referenced, never owned.
    pub service: ServiceId,
    /// The occupied interval. Duration is copied from the service at
    /// booking time and may later diverge from the catalog.
    pub slot: TimeSlot,
    /// Current lifecycle status.
    pub status: AppointmentStatus,
    /// Amount charged for the visit, fixed at booking from the service's
    /// then-current price.
    pub amount_charged: Money,
    /// Free-text notes. The one field that stays mutable in terminal
    /// states, for corrections.
    pub notes: Option<String>,
    /// When the booking was made.
    pub created_at: Timestamp,
    /// When the visit was completed, if it was.
    pub completed_at: Option<Timestamp>,
    /// When the booking was cancelled, if it was.
    pub cancelled_at: Option<Timestamp>,
    /// Why the booking was cancelled, if it was.
    pub cancellation_reason: Option<CancellationReason>,
}

impl Appointment {
    /// Books a new appointment in the `Scheduled` state.
    pub fn book(
        id: AppointmentId,
        customer: CustomerId,
        service: ServiceId,
        slot: TimeSlot,
        amount_charged: Money,
        notes: Option<String>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            customer,
            service,
            slot,
            status: AppointmentStatus::Scheduled,
            amount_charged,
            notes,
            created_at,
            completed_at: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }

    fn require_scheduled(&self) -> Result<(), SchedulingError> {
        if self.status == AppointmentStatus::Scheduled {
            Ok(())
        } else {
            Err(SchedulingError::InvalidState {
                appointment: self.id,
                status: self.status,
            })
        }
    }

    /// Transitions `Scheduled` -> `Completed`, stamping the completion
    /// time. Fails with `InvalidState` from any terminal status.
    pub fn complete(mut self, at: Timestamp) -> Result<Self, SchedulingError> {
        self.require_scheduled()?;
        self.status = AppointmentStatus::Completed;
        self.completed_at = Some(at);
        Ok(self)
    }

    /// Transitions `Scheduled` -> `Cancelled` with a timestamp and reason.
    pub fn cancel(
        mut self,
        at: Timestamp,
        reason: CancellationReason,
    ) -> Result<Self, SchedulingError> {
        self.require_scheduled()?;
        self.status = AppointmentStatus::Cancelled;
        self.cancelled_at = Some(at);
        self.cancellation_reason = Some(reason);
        Ok(self)
    }

    /// Transitions `Scheduled` -> `NoShow`. No timestamps are stamped and
    /// no financial effect follows.
    pub fn mark_no_show(mut self) -> Result<Self, SchedulingError> {
        self.require_scheduled()?;
        self.status = AppointmentStatus::NoShow;
        Ok(self)
    }

    /// Moves a still-`Scheduled` appointment to a new start, keeping its
    /// duration. Conflict checking is the scheduler's job.
    pub fn reschedule(mut self, new_start: Timestamp) -> Result<Self, SchedulingError> {
        self.require_scheduled()?;
        self.slot.start = new_start;
        Ok(self)
    }

    /// Replaces the notes. Permitted in every status; corrective notes are
    /// the one mutation terminal appointments accept.
    pub fn amend_notes(&mut self, notes: Option<String>) {
        self.notes = notes;
    }
}

/// Denormalized per-customer summary values, derivable from appointment
/// history and maintained incrementally for read performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerTotals {
    /// Count of visits (completed appointments, plus no-shows when policy
    /// counts them).
    pub total_visits: u64,
    /// Sum of `amount_charged` over completed appointments.
    pub total_spent: Money,
    /// Latest scheduled start among counted visits.
    pub last_visit: Option<Timestamp>,
}

impl CustomerTotals {
    /// Totals for a customer with no history.
    pub fn empty() -> Self {
        Self {
            total_visits: 0,
            total_spent: Money::zero(),
            last_visit: None,
        }
    }

    fn bump_last_visit(&mut self, visited_at: Timestamp) {
        // Completions can arrive out of schedule order; keep the max.
        self.last_visit = Some(self.last_visit.map_or(visited_at, |t| t.max(visited_at)));
    }

    /// Applies one completed visit: `total_visits + 1`, spend added,
    /// `last_visit` refreshed to the latest scheduled start seen.
    pub fn record_completed_visit(&mut self, amount: Money, visited_at: Timestamp) {
        self.total_visits += 1;
        self.total_spent = self.total_spent.saturating_add(amount);
        self.bump_last_visit(visited_at);
    }

    /// Applies one counted no-show: visit count and `last_visit` only,
    /// never spend (no revenue exists for a no-show).
    pub fn record_counted_no_show(&mut self, visited_at: Timestamp) {
        self.total_visits += 1;
        self.bump_last_visit(visited_at);
    }

    /// Recomputes totals directly from appointment history.
    ///
    /// `count_no_shows` mirrors the scheduler's policy flag; the
    /// incrementally maintained fields must equal this recomputation at
    /// every checkpoint.
    pub fn recompute<'a, I>(appointments: I, count_no_shows: bool) -> Self
    where
        I: IntoIterator<Item = &'a Appointment>,
    {
        let mut totals = Self::empty();
        for appointment in appointments {
            match appointment.status {
                AppointmentStatus::Completed => {
                    totals.record_completed_visit(appointment.amount_charged, appointment.slot.start);
                }
                AppointmentStatus::NoShow if count_no_shows => {
                    totals.record_counted_no_show(appointment.slot.start);
                }
                _ => {}
            }
        }
        totals
    }
}

/// A customer record. Only the [`CustomerTotals`] portion is owned by this
/// core; the identity fields belong to the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identity.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Phone, email, or whatever reaches them.
    pub contact_info: Option<String>,
    /// Inactive customers keep their history but take no new bookings
    /// (enforced outside this core).
    pub is_active: bool,
    /// When the record was created.
    pub created_at: Timestamp,
    /// Aggregates maintained by the appointment lifecycle.
    pub totals: CustomerTotals,
}

impl Customer {
    /// Creates an active customer with empty totals.
    pub fn new(id: CustomerId, name: impl Into<String>, created_at: Timestamp) -> Self {
        Self {
            id,
            name: name.into(),
            contact_info: None,
            is_active: true,
            created_at,
            totals: CustomerTotals::empty(),
        }
    }
}

/// A catalog entry for one bookable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOffering {
    /// Unique identity.
    pub id: ServiceId,
    /// Display name.
    pub name: String,
    /// Current price; copied onto appointments at booking time.
    pub price: Money,
    /// Default appointment duration; copied at booking time.
    pub duration: DurationMinutes,
    /// How many appointments may occupy the same instant.
    pub max_capacity: MaxCapacity,
    /// Unavailable services reject new bookings and yield no slots.
    pub is_available: bool,
}

/// Expense categories recognized by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCategory {
    /// Revenue from completed appointments. The only revenue category.
    ServiceRevenue,
    /// Consumables.
    Supplies,
    /// Durable equipment purchases.
    Equipment,
    /// Repairs and upkeep.
    Maintenance,
    /// Power, water, heating.
    Utilities,
    /// Anything else.
    Other,
}

impl std::fmt::Display for LedgerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ServiceRevenue => "service_revenue",
            Self::Supplies => "supplies",
            Self::Equipment => "equipment",
            Self::Maintenance => "maintenance",
            Self::Utilities => "utilities",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

/// Whether a ledger entry adds to or subtracts from the books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// Money in.
    Revenue,
    /// Money out.
    Expense,
}

/// The origin of a ledger entry. Revenue always points at the appointment
/// it was posted for; expenses may point at a supplier and carry a receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Posted by `complete_appointment`, exactly once per appointment.
    Revenue {
        /// The completed appointment this revenue was posted for.
        appointment: AppointmentId,
    },
    /// Entered by the surrounding application's expense workflow.
    Expense {
        /// Supplier the expense was paid to, when known.
        supplier: Option<SupplierId>,
        /// Receipt or invoice number, when kept.
        receipt_number: Option<String>,
    },
}

/// An immutable entry in the append-only financial log.
///
/// Never edited after creation; corrections happen via new offsetting
/// entries, a policy of the surrounding system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialRecord {
    /// Unique identity.
    pub id: LedgerEntryId,
    /// Revenue or expense, with the matching reference.
    pub kind: TransactionKind,
    /// Transaction amount, always strictly positive.
    pub amount: Money,
    /// Reporting category.
    pub category: LedgerCategory,
    /// Human-readable description.
    pub description: String,
    /// Additional free-form notes.
    pub notes: Option<String>,
    /// When the transaction occurred.
    pub transaction_date: Timestamp,
    /// When the entry was written.
    pub created_at: Timestamp,
}

impl FinancialRecord {
    /// Builds a revenue entry for a completed appointment.
    ///
    /// Fails with `Validation` on a zero amount; the ledger only holds
    /// strictly positive entries.
    pub fn revenue(
        appointment: AppointmentId,
        amount: Money,
        description: impl Into<String>,
        posted_at: Timestamp,
    ) -> Result<Self, SchedulingError> {
        Self::check_positive(amount)?;
        Ok(Self {
            id: LedgerEntryId::new(),
            kind: TransactionKind::Revenue { appointment },
            amount,
            category: LedgerCategory::ServiceRevenue,
            description: description.into(),
            notes: None,
            transaction_date: posted_at,
            created_at: posted_at,
        })
    }

    /// Builds an expense entry.
    pub fn expense(
        amount: Money,
        category: LedgerCategory,
        description: impl Into<String>,
        supplier: Option<SupplierId>,
        receipt_number: Option<String>,
        posted_at: Timestamp,
    ) -> Result<Self, SchedulingError> {
        Self::check_positive(amount)?;
        if category == LedgerCategory::ServiceRevenue {
            return Err(SchedulingError::Validation(
                "service_revenue is reserved for appointment revenue".into(),
            ));
        }
        Ok(Self {
            id: LedgerEntryId::new(),
            kind: TransactionKind::Expense {
                supplier,
                receipt_number,
            },
            amount,
            category,
            description: description.into(),
            notes: None,
            transaction_date: posted_at,
            created_at: posted_at,
        })
    }

    fn check_positive(amount: Money) -> Result<(), SchedulingError> {
        if amount.is_zero() {
            Err(SchedulingError::Validation(
                "ledger amounts must be strictly positive".into(),
            ))
        } else {
            Ok(())
        }
    }

    /// Revenue or expense.
    pub const fn transaction_type(&self) -> TransactionType {
        match self.kind {
            TransactionKind::Revenue { .. } => TransactionType::Revenue,
            TransactionKind::Expense { .. } => TransactionType::Expense,
        }
    }

    /// The appointment this entry was posted for, if it is revenue.
    pub const fn appointment(&self) -> Option<AppointmentId> {
        match self.kind {
            TransactionKind::Revenue { appointment } => Some(appointment),
            TransactionKind::Expense { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ts(hour: u32, min: u32) -> Timestamp {
        Timestamp::new(Utc.with_ymd_and_hms(2025, 6, 2, hour, min, 0).unwrap())
    }

    fn minutes(m: u32) -> DurationMinutes {
        DurationMinutes::try_new(m).unwrap()
    }

    fn scheduled(start: Timestamp, duration: DurationMinutes) -> Appointment {
        Appointment::book(
            AppointmentId::new(),
            CustomerId::new(),
            ServiceId::new(),
            TimeSlot::new(start, duration),
            Money::from_cents(5000),
            None,
            ts(8, 0),
        )
    }

    #[test]
    fn touching_slots_do_not_overlap() {
        let first = TimeSlot::new(ts(10, 0), minutes(30));
        let second = TimeSlot::new(ts(10, 30), minutes(30));
        assert!(!first.overlaps(&second));
        assert!(!second.overlaps(&first));
    }

    #[test]
    fn nested_and_straddling_slots_overlap() {
        let outer = TimeSlot::new(ts(10, 0), minutes(60));
        let inner = TimeSlot::new(ts(10, 15), minutes(15));
        let straddle = TimeSlot::new(ts(10, 45), minutes(30));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
        assert!(outer.overlaps(&straddle));
    }

    #[test]
    fn slot_covers_start_but_not_end() {
        let slot = TimeSlot::new(ts(10, 0), minutes(30));
        assert!(slot.covers(ts(10, 0)));
        assert!(slot.covers(ts(10, 29)));
        assert!(!slot.covers(ts(10, 30)));
    }

    #[test]
    fn booking_starts_scheduled_with_clean_stamps() {
        let appointment = scheduled(ts(10, 0), minutes(30));
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        assert!(appointment.completed_at.is_none());
        assert!(appointment.cancelled_at.is_none());
        assert!(appointment.cancellation_reason.is_none());
    }

    #[test]
    fn complete_stamps_completion_time() {
        let appointment = scheduled(ts(10, 0), minutes(30));
        let done = appointment.complete(ts(10, 35)).unwrap();
        assert_eq!(done.status, AppointmentStatus::Completed);
        assert_eq!(done.completed_at, Some(ts(10, 35)));
        assert!(done.cancelled_at.is_none());
    }

    #[test]
    fn cancel_stamps_time_and_reason() {
        let appointment = scheduled(ts(10, 0), minutes(30));
        let reason = CancellationReason::try_new("caught a cold").unwrap();
        let cancelled = appointment.cancel(ts(9, 0), reason.clone()).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at, Some(ts(9, 0)));
        assert_eq!(cancelled.cancellation_reason, Some(reason));
        assert!(cancelled.completed_at.is_none());
    }

    #[test]
    fn no_show_leaves_stamps_null() {
        let appointment = scheduled(ts(10, 0), minutes(30));
        let gone = appointment.mark_no_show().unwrap();
        assert_eq!(gone.status, AppointmentStatus::NoShow);
        assert!(gone.completed_at.is_none());
        assert!(gone.cancelled_at.is_none());
    }

    #[test]
    fn every_terminal_status_rejects_every_transition() {
        let reason = CancellationReason::try_new("any").unwrap();
        let terminals = [
            scheduled(ts(10, 0), minutes(30)).complete(ts(11, 0)).unwrap(),
            scheduled(ts(10, 0), minutes(30))
                .cancel(ts(9, 0), reason.clone())
                .unwrap(),
            scheduled(ts(10, 0), minutes(30)).mark_no_show().unwrap(),
        ];
        for terminal in terminals {
            assert!(terminal.status.is_terminal());
            assert!(matches!(
                terminal.clone().complete(ts(12, 0)),
                Err(SchedulingError::InvalidState { .. })
            ));
            assert!(matches!(
                terminal.clone().cancel(ts(12, 0), reason.clone()),
                Err(SchedulingError::InvalidState { .. })
            ));
            assert!(matches!(
                terminal.clone().mark_no_show(),
                Err(SchedulingError::InvalidState { .. })
            ));
            assert!(matches!(
                terminal.clone().reschedule(ts(12, 0)),
                Err(SchedulingError::InvalidState { .. })
            ));
        }
    }

    #[test]
    fn notes_stay_amendable_after_completion() {
        let mut done = scheduled(ts(10, 0), minutes(30)).complete(ts(11, 0)).unwrap();
        done.amend_notes(Some("customer paid cash".into()));
        assert_eq!(done.notes.as_deref(), Some("customer paid cash"));
    }

    #[test]
    fn reschedule_moves_start_and_keeps_duration() {
        let appointment = scheduled(ts(10, 0), minutes(45));
        let moved = appointment.reschedule(ts(14, 0)).unwrap();
        assert_eq!(moved.slot.start, ts(14, 0));
        assert_eq!(moved.slot.duration, minutes(45));
        assert_eq!(moved.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn totals_recompute_matches_incremental_updates() {
        let done_early = scheduled(ts(9, 0), minutes(30)).complete(ts(16, 0)).unwrap();
        let done_late = scheduled(ts(15, 0), minutes(30)).complete(ts(15, 40)).unwrap();
        let skipped = scheduled(ts(12, 0), minutes(30)).mark_no_show().unwrap();

        let mut incremental = CustomerTotals::empty();
        // Complete the later appointment first; last_visit must still end
        // up at the max scheduled start.
        incremental.record_completed_visit(done_late.amount_charged, done_late.slot.start);
        incremental.record_completed_visit(done_early.amount_charged, done_early.slot.start);

        let history = [done_early, done_late, skipped.clone()];
        assert_eq!(incremental, CustomerTotals::recompute(&history, false));
        assert_eq!(incremental.total_visits, 2);
        assert_eq!(incremental.total_spent, Money::from_cents(10_000));
        assert_eq!(incremental.last_visit, Some(ts(15, 0)));

        incremental.record_counted_no_show(skipped.slot.start);
        assert_eq!(incremental, CustomerTotals::recompute(&history, true));
        assert_eq!(incremental.total_visits, 3);
        assert_eq!(incremental.total_spent, Money::from_cents(10_000));
    }

    #[test]
    fn ledger_rejects_zero_amounts_and_misused_categories() {
        assert!(matches!(
            FinancialRecord::revenue(AppointmentId::new(), Money::zero(), "free", ts(10, 0)),
            Err(SchedulingError::Validation(_))
        ));
        assert!(matches!(
            FinancialRecord::expense(
                Money::from_cents(100),
                LedgerCategory::ServiceRevenue,
                "mislabeled",
                None,
                None,
                ts(10, 0),
            ),
            Err(SchedulingError::Validation(_))
        ));
    }

    #[test]
    fn revenue_entry_references_its_appointment() {
        let id = AppointmentId::new();
        let entry =
            FinancialRecord::revenue(id, Money::from_cents(5000), "visit", ts(11, 0)).unwrap();
        assert_eq!(entry.transaction_type(), TransactionType::Revenue);
        assert_eq!(entry.appointment(), Some(id));
        assert_eq!(entry.category, LedgerCategory::ServiceRevenue);
    }
}
