//! `bookcore` - appointment scheduling and bookkeeping core
//!
//! This library implements the scheduling core of a single-location service
//! business: the appointment state machine, the slot conflict algorithm,
//! and the atomic revenue-posting workflow that keeps the financial ledger
//! and customer aggregates consistent with appointment history.
//!
//! Completing an appointment writes the status transition, the revenue
//! ledger entry, and the customer aggregate update as one atomic
//! [`store::WriteBatch`]; create and reschedule commit under the schedule
//! version their conflict check observed, so check-then-act cannot race
//! its own insert.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod availability;
pub mod clock;
pub mod errors;
pub mod ledger;
pub mod records;
pub mod scheduler;
pub mod store;
pub mod types;

pub use availability::{default_granularity, AvailableSlots, OperatingWindow, SlotIter};
pub use clock::{Clock, FixedClock, SystemClock};
pub use errors::{SchedulingError, SchedulingResult, StoreError, StoreResult};
pub use ledger::{FinancialSummary, LedgerReport};
pub use records::{
    Appointment, AppointmentStatus, Customer, CustomerTotals, FinancialRecord, LedgerCategory,
    ServiceOffering, TimeSlot, TransactionKind, TransactionType,
};
pub use scheduler::{overlap_count, ConflictCheck, Scheduler, SchedulingPolicy};
pub use store::{
    AppointmentFilter, LedgerFilter, RecordStore, RecordWrite, ScheduleGuard, ScheduleSnapshot,
    WriteBatch,
};
pub use types::{
    AppointmentId, CancellationReason, CustomerId, DurationMinutes, LedgerEntryId, MaxCapacity,
    Money, ScheduleVersion, ServiceId, SupplierId, Timestamp,
};
