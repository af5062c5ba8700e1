//! Core types for the `bookcore` scheduling library.
//!
//! This module defines the fundamental types used throughout the library.
//! All types use smart constructors to ensure validity at construction time,
//! following the "parse, don't validate" principle.

use chrono::{DateTime, Duration, Utc};
use nutype::nutype;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A globally unique appointment identifier using UUIDv7 format.
///
/// `AppointmentId` values are guaranteed to be UUIDv7, which provides
/// time-based ordering and globally unique identification. Assigned once at
/// booking time and never changed afterwards.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct AppointmentId(Uuid);

impl AppointmentId {
    /// Creates a new `AppointmentId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for AppointmentId {
    fn default() -> Self {
        Self::new()
    }
}

/// A globally unique customer identifier using UUIDv7 format.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CustomerId(Uuid);

impl CustomerId {
    /// Creates a new `CustomerId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for CustomerId {
    fn default() -> Self {
        Self::new()
    }
}

/// A globally unique service-offering identifier using UUIDv7 format.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct ServiceId(Uuid);

impl ServiceId {
    /// Creates a new `ServiceId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for ServiceId {
    fn default() -> Self {
        Self::new()
    }
}

/// A globally unique identifier for a financial ledger entry.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct LedgerEntryId(Uuid);

impl LedgerEntryId {
    /// Creates a new `LedgerEntryId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for LedgerEntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// A globally unique supplier identifier, referenced by expense entries.
#[nutype(
    validate(predicate = |id: &Uuid| id.get_version() == Some(uuid::Version::SortRand)),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct SupplierId(Uuid);

impl SupplierId {
    /// Creates a new `SupplierId` with the current timestamp.
    pub fn new() -> Self {
        Self::try_new(Uuid::now_v7()).expect("Uuid::now_v7() should always return a valid v7 UUID")
    }
}

impl Default for SupplierId {
    fn default() -> Self {
        Self::new()
    }
}

/// An appointment or service duration, in whole minutes.
///
/// The type system guarantees a duration is never zero or negative, so the
/// half-open slot interval [start, start + duration) is never empty.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct DurationMinutes(u32);

impl DurationMinutes {
    /// Converts into a [`chrono::Duration`] for timestamp arithmetic.
    pub fn to_duration(self) -> Duration {
        Duration::minutes(i64::from(u32::from(self)))
    }
}

/// Maximum number of concurrently scheduled appointments a service admits.
///
/// A capacity of 1 means classic exclusive booking; higher values model
/// group services (a shared pool, a class) where several customers occupy
/// the same slot.
#[nutype(
    validate(greater = 0),
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Display,
        Into,
        Serialize,
        Deserialize
    )
)]
pub struct MaxCapacity(u32);

/// A monetary amount in integer minor units (cents).
///
/// Integer representation keeps aggregate accumulation exact. Amounts are
/// never negative by construction.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct Money(u64);

impl Money {
    /// The zero amount.
    pub fn zero() -> Self {
        Self::new(0)
    }

    /// Creates an amount from a count of minor units (cents).
    pub fn from_cents(cents: u64) -> Self {
        Self::new(cents)
    }

    /// Returns the amount as minor units (cents).
    pub fn cents(self) -> u64 {
        self.into_inner()
    }

    /// Whether this is the zero amount.
    pub fn is_zero(self) -> bool {
        self.into_inner() == 0
    }

    /// Checked addition, `None` on overflow.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.into_inner().checked_add(other.into_inner()).map(Self::new)
    }

    /// Saturating addition. Aggregate totals prefer saturation over panics;
    /// u64 cents overflows only past 184 quadrillion dollars.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self::new(self.into_inner().saturating_add(other.into_inner()))
    }
}

/// The version of a service's schedule, bumped on every appointment write
/// touching that service.
///
/// Versions start at 0 and increment monotonically. Create and reschedule
/// operations commit under the version their conflict check observed, which
/// makes check-then-act atomic with respect to the insert.
#[nutype(derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    Into,
    Serialize,
    Deserialize
))]
pub struct ScheduleVersion(u64);

impl ScheduleVersion {
    /// The version of a schedule with no appointment writes yet.
    pub fn initial() -> Self {
        Self::new(0)
    }

    /// Returns the next version after this one.
    #[must_use]
    pub fn next(self) -> Self {
        Self::new(self.into_inner().wrapping_add(1))
    }
}

/// A free-text reason recorded when an appointment is cancelled.
///
/// Guaranteed non-empty and at most 200 characters, matching the ledger's
/// storage contract for the field.
#[nutype(
    sanitize(trim),
    validate(not_empty, len_char_max = 200),
    derive(
        Debug,
        Clone,
        PartialEq,
        Eq,
        Hash,
        AsRef,
        Deref,
        Display,
        Serialize,
        Deserialize
    )
)]
pub struct CancellationReason(String);

/// A timestamp for when something happened in the system.
///
/// This wrapper ensures consistent UTC timestamp handling throughout the
/// crate and keeps timestamp arithmetic in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Creates a new timestamp from a UTC `DateTime`.
    pub const fn new(datetime: DateTime<Utc>) -> Self {
        Self(datetime)
    }

    /// Creates a timestamp representing the current moment.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the underlying `DateTime`.
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Converts the timestamp into the underlying `DateTime`.
    pub const fn into_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp shifted forward by the given duration.
    #[must_use]
    pub fn plus(self, duration: Duration) -> Self {
        Self(self.0 + duration)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(datetime: DateTime<Utc>) -> Self {
        Self::new(datetime)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(timestamp: Timestamp) -> Self {
        timestamp.into_datetime()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
