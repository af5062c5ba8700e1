//! Error types for `bookcore`.
//!
//! Two layers, matching the two seams of the crate:
//!
//! - [`SchedulingError`]: lifecycle-operation failures surfaced to the
//!   caller. All are terminal to the invoking operation; the core never
//!   retries internally. Callers decide what to do (offer another slot,
//!   show a message, give up).
//! - [`StoreError`]: persistence-port failures. A store error inside a
//!   batch commit always means the whole batch rolled back; no partial
//!   state is ever left committed.

use thiserror::Error;

use crate::records::AppointmentStatus;
use crate::types::{AppointmentId, CustomerId, ScheduleVersion, ServiceId};

/// Type alias for lifecycle-operation results.
pub type SchedulingResult<T> = Result<T, SchedulingError>;

/// Type alias for persistence-port results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the appointment lifecycle operations.
///
/// # Handling strategy
///
/// - **Validation**: correct the input and resubmit.
/// - **CustomerNotFound / ServiceNotFound / AppointmentNotFound**: the
///   reference does not resolve; nothing to retry.
/// - **Conflict**: the slot is taken; offer another one.
/// - **InvalidState**: the appointment already reached a terminal status.
/// - **Store**: persistence failed and the batch rolled back.
#[derive(Debug, Error)]
pub enum SchedulingError {
    /// Malformed or out-of-range input, e.g. a past-dated booking while
    /// backdating is disabled, or a zero ledger amount.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced customer does not resolve.
    #[error("customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// The referenced service does not resolve.
    #[error("service not found: {0}")]
    ServiceNotFound(ServiceId),

    /// The referenced appointment does not resolve.
    #[error("appointment not found: {0}")]
    AppointmentNotFound(AppointmentId),

    /// Accepting the requested interval would push concurrent bookings on
    /// the service past its capacity.
    #[error("slot conflict on service {service}: {occupied} of {capacity} concurrent bookings already scheduled")]
    Conflict {
        /// The service whose schedule is full.
        service: ServiceId,
        /// Overlapping `scheduled` appointments already present.
        occupied: u32,
        /// The service's concurrent-booking limit.
        capacity: u32,
    },

    /// A lifecycle transition was attempted from a terminal status.
    #[error("appointment {appointment} is {status}; no further transition is permitted")]
    InvalidState {
        /// The appointment that refused the transition.
        appointment: AppointmentId,
        /// Its current, terminal status.
        status: AppointmentStatus,
    },

    /// The record store failed; the enclosing batch was rolled back.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from the record-store port.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update or lookup targeted a record that does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// An insert collided with an existing record, or a second revenue
    /// entry referenced an already-posted appointment.
    #[error("duplicate record: {0}")]
    DuplicateRecord(String),

    /// A batch's schedule guard was stale: the service's schedule moved
    /// between the conflict check and the commit.
    #[error("schedule for service {service} moved: guard expected {expected}, store at {current}")]
    VersionConflict {
        /// The guarded service.
        service: ServiceId,
        /// Version the guard was captured at.
        expected: ScheduleVersion,
        /// Version the store is actually at.
        current: ScheduleVersion,
    },

    /// The store aborted the batch; nothing was applied.
    #[error("transaction aborted: {0}")]
    TransactionAborted(String),

    /// Encoding or decoding a persisted record failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(String),

    /// Backend I/O failure.
    #[error("i/o error: {0}")]
    Io(String),
}
