//! Appointment lifecycle operations.
//!
//! [`Scheduler`] orchestrates every status transition around the pure state
//! machine on [`Appointment`]: it resolves references, runs the conflict
//! check, and commits all resulting record writes as one atomic
//! [`WriteBatch`]. Completing an appointment writes the status change, the
//! revenue ledger entry, and the customer aggregate update in a single
//! batch, so the three can never be observed partially applied.
//!
//! Create and reschedule commit under the [`crate::store::ScheduleGuard`] their conflict
//! check captured; if the service's schedule moved in between, the store
//! rejects the batch and the operation fails without retrying (single
//! active writer is the expected deployment, so a stale guard is news the
//! caller should hear about).

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, instrument, warn};

use crate::availability::{default_granularity, AvailableSlots, OperatingWindow};
use crate::clock::Clock;
use crate::errors::{SchedulingError, SchedulingResult};
use crate::records::{
    Appointment, AppointmentStatus, Customer, CustomerTotals, FinancialRecord, ServiceOffering,
    TimeSlot,
};
use crate::store::{AppointmentFilter, RecordStore, ScheduleSnapshot, WriteBatch};
use crate::types::{
    AppointmentId, CancellationReason, CustomerId, DurationMinutes, ServiceId, Timestamp,
};

/// The two policy knobs the domain leaves open, made explicit so both
/// behaviors stay testable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulingPolicy {
    /// Accept bookings whose start is not strictly in the future
    /// (backdated walk-ins). Off by default.
    pub allow_backdated_booking: bool,
    /// Count no-shows toward `total_visits` and `last_visit`. They never
    /// touch `total_spent`; no revenue exists for a no-show. Off by
    /// default.
    pub no_show_counts_as_visit: bool,
}

/// Outcome of a conflict check: how many overlapping `scheduled`
/// appointments exist against the service's capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictCheck {
    /// Overlapping `scheduled` appointments found.
    pub occupied: u32,
    /// The service's concurrent-booking limit.
    pub capacity: u32,
}

impl ConflictCheck {
    /// Whether accepting one more booking would exceed capacity.
    pub const fn would_conflict(self) -> bool {
        self.occupied >= self.capacity
    }
}

/// Counts `scheduled` appointments whose slots overlap the requested one,
/// excluding at most one appointment id (a reschedule must not conflict
/// with its own superseded slot).
pub fn overlap_count(
    appointments: &[Appointment],
    slot: &TimeSlot,
    exclude: Option<AppointmentId>,
) -> u32 {
    let count = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .filter(|a| Some(a.id) != exclude)
        .filter(|a| a.slot.overlaps(slot))
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// The appointment lifecycle component.
///
/// Generic over the [`RecordStore`] backend; the clock is injected so tests
/// pin time. All operations are terminal on failure; nothing is retried
/// internally.
pub struct Scheduler<S> {
    store: S,
    clock: Arc<dyn Clock>,
    policy: SchedulingPolicy,
}

impl<S> Scheduler<S> {
    /// Creates a scheduler with the default policy (no backdating, no-shows
    /// not counted).
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            policy: SchedulingPolicy::default(),
        }
    }

    /// Replaces the policy.
    #[must_use]
    pub fn with_policy(mut self, policy: SchedulingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active policy.
    pub const fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// The underlying store, for read access by the surrounding
    /// application.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: RecordStore> Scheduler<S> {
    async fn require_customer(&self, id: CustomerId) -> SchedulingResult<Customer> {
        self.store
            .get_customer(id)
            .await?
            .ok_or(SchedulingError::CustomerNotFound(id))
    }

    async fn require_service(&self, id: ServiceId) -> SchedulingResult<ServiceOffering> {
        self.store
            .get_service(id)
            .await?
            .ok_or(SchedulingError::ServiceNotFound(id))
    }

    async fn require_appointment(&self, id: AppointmentId) -> SchedulingResult<Appointment> {
        self.store
            .get_appointment(id)
            .await?
            .ok_or(SchedulingError::AppointmentNotFound(id))
    }

    fn assess(
        snapshot: &ScheduleSnapshot,
        service: &ServiceOffering,
        slot: &TimeSlot,
        exclude: Option<AppointmentId>,
    ) -> ConflictCheck {
        ConflictCheck {
            occupied: overlap_count(&snapshot.appointments, slot, exclude),
            capacity: u32::from(service.max_capacity),
        }
    }

    /// Books a new appointment in the `Scheduled` state.
    ///
    /// Fails with `Validation` when the service is unavailable or the start
    /// is not in the future while backdating is disabled;
    /// `CustomerNotFound` / `ServiceNotFound` when a reference does not
    /// resolve; `Conflict` when the interval would exceed the service's
    /// capacity. The conflict check and the insert share one guarded
    /// commit.
    #[instrument(skip(self, notes), fields(%customer, %service, %start))]
    pub async fn create_appointment(
        &self,
        customer: CustomerId,
        service: ServiceId,
        start: Timestamp,
        duration_override: Option<DurationMinutes>,
        notes: Option<String>,
    ) -> SchedulingResult<Appointment> {
        let now = self.clock.now();
        self.require_customer(customer).await?;
        let offering = self.require_service(service).await?;
        if !offering.is_available {
            return Err(SchedulingError::Validation(format!(
                "service {} is not available for booking",
                offering.name
            )));
        }
        if !self.policy.allow_backdated_booking && start <= now {
            return Err(SchedulingError::Validation(format!(
                "appointment start {start} is not in the future"
            )));
        }

        let duration = duration_override.unwrap_or(offering.duration);
        let slot = TimeSlot::new(start, duration);
        let snapshot = self.store.scheduled_for_service(service).await?;
        let check = Self::assess(&snapshot, &offering, &slot, None);
        if check.would_conflict() {
            warn!(occupied = check.occupied, capacity = check.capacity, "slot conflict");
            return Err(SchedulingError::Conflict {
                service,
                occupied: check.occupied,
                capacity: check.capacity,
            });
        }

        let appointment = Appointment::book(
            AppointmentId::new(),
            customer,
            service,
            slot,
            offering.price,
            notes,
            now,
        );
        self.store
            .commit(
                WriteBatch::new()
                    .guarded_by(snapshot.guard())
                    .insert_appointment(appointment.clone()),
            )
            .await?;
        debug!(appointment = %appointment.id, "appointment booked");
        Ok(appointment)
    }

    /// Pure conflict query: would booking this slot exceed the service's
    /// capacity? No side effects.
    pub async fn check_conflict(
        &self,
        service: ServiceId,
        slot: TimeSlot,
        exclude: Option<AppointmentId>,
    ) -> SchedulingResult<ConflictCheck> {
        let offering = self.require_service(service).await?;
        let snapshot = self.store.scheduled_for_service(service).await?;
        Ok(Self::assess(&snapshot, &offering, &slot, exclude))
    }

    /// Completes a `scheduled` appointment.
    ///
    /// One atomic batch carries the status change, the revenue ledger entry
    /// (exactly one per appointment; the store rejects a duplicate), and
    /// the customer aggregate update. A zero-charge visit posts no ledger
    /// entry; the ledger holds strictly positive amounts only.
    #[instrument(skip(self), fields(%appointment))]
    pub async fn complete_appointment(
        &self,
        appointment: AppointmentId,
    ) -> SchedulingResult<Appointment> {
        let now = self.clock.now();
        let record = self.require_appointment(appointment).await?;
        let completed = record.complete(now)?;

        let mut customer = self.require_customer(completed.customer).await?;
        customer
            .totals
            .record_completed_visit(completed.amount_charged, completed.slot.start);

        let mut batch = WriteBatch::new()
            .update_appointment(completed.clone())
            .update_customer(customer.clone());
        if completed.amount_charged.is_zero() {
            debug!("zero-charge visit, no revenue posted");
        } else {
            let entry = FinancialRecord::revenue(
                completed.id,
                completed.amount_charged,
                format!(
                    "Service revenue from appointment {} - {}",
                    completed.id, customer.name
                ),
                now,
            )?;
            batch = batch.append_ledger(entry);
        }

        self.store.commit(batch).await?;
        debug!(amount = completed.amount_charged.cents(), "appointment completed");
        Ok(completed)
    }

    /// Cancels a `scheduled` appointment. No financial or aggregate
    /// effect: a cancellation is not a visit.
    #[instrument(skip(self, reason), fields(%appointment))]
    pub async fn cancel_appointment(
        &self,
        appointment: AppointmentId,
        reason: CancellationReason,
    ) -> SchedulingResult<Appointment> {
        let now = self.clock.now();
        let record = self.require_appointment(appointment).await?;
        let cancelled = record.cancel(now, reason)?;
        self.store
            .commit(WriteBatch::new().update_appointment(cancelled.clone()))
            .await?;
        debug!("appointment cancelled");
        Ok(cancelled)
    }

    /// Marks a `scheduled` appointment as a no-show. Never any financial
    /// effect; visit counting follows
    /// [`SchedulingPolicy::no_show_counts_as_visit`].
    #[instrument(skip(self), fields(%appointment))]
    pub async fn mark_no_show(&self, appointment: AppointmentId) -> SchedulingResult<Appointment> {
        let record = self.require_appointment(appointment).await?;
        let missed = record.mark_no_show()?;

        let mut batch = WriteBatch::new().update_appointment(missed.clone());
        if self.policy.no_show_counts_as_visit {
            let mut customer = self.require_customer(missed.customer).await?;
            customer.totals.record_counted_no_show(missed.slot.start);
            batch = batch.update_customer(customer);
        }
        self.store.commit(batch).await?;
        debug!(counted = self.policy.no_show_counts_as_visit, "no-show recorded");
        Ok(missed)
    }

    /// Moves a `scheduled` appointment to a new start.
    ///
    /// Re-runs the conflict check at the new time excluding the
    /// appointment's own id, and commits under the schedule guard the check
    /// captured.
    #[instrument(skip(self), fields(%appointment, %new_start))]
    pub async fn reschedule_appointment(
        &self,
        appointment: AppointmentId,
        new_start: Timestamp,
    ) -> SchedulingResult<Appointment> {
        let record = self.require_appointment(appointment).await?;
        let moved = record.reschedule(new_start)?;
        let offering = self.require_service(moved.service).await?;

        let snapshot = self.store.scheduled_for_service(moved.service).await?;
        let check = Self::assess(&snapshot, &offering, &moved.slot, Some(moved.id));
        if check.would_conflict() {
            warn!(occupied = check.occupied, capacity = check.capacity, "reschedule conflict");
            return Err(SchedulingError::Conflict {
                service: moved.service,
                occupied: check.occupied,
                capacity: check.capacity,
            });
        }

        self.store
            .commit(
                WriteBatch::new()
                    .guarded_by(snapshot.guard())
                    .update_appointment(moved.clone()),
            )
            .await?;
        debug!("appointment rescheduled");
        Ok(moved)
    }

    /// Replaces an appointment's notes. The one mutation terminal
    /// appointments accept, for corrections.
    pub async fn amend_notes(
        &self,
        appointment: AppointmentId,
        notes: Option<String>,
    ) -> SchedulingResult<Appointment> {
        let mut record = self.require_appointment(appointment).await?;
        record.amend_notes(notes);
        self.store
            .commit(WriteBatch::new().update_appointment(record.clone()))
            .await?;
        Ok(record)
    }

    /// Free start times for a service on a date within the operating
    /// window. Unavailable services yield no slots.
    pub async fn available_slots(
        &self,
        service: ServiceId,
        date: NaiveDate,
        window: OperatingWindow,
        granularity: Option<DurationMinutes>,
    ) -> SchedulingResult<AvailableSlots> {
        let offering = self.require_service(service).await?;
        if !offering.is_available {
            return Ok(AvailableSlots::none());
        }
        let snapshot = self.store.scheduled_for_service(service).await?;
        let busy = snapshot
            .appointments
            .iter()
            .filter(|a| a.status == AppointmentStatus::Scheduled)
            .map(|a| a.slot)
            .collect();
        let (open, close) = window.on(date);
        Ok(AvailableSlots::new(
            open,
            close,
            offering.duration,
            granularity.unwrap_or_else(default_granularity),
            u32::from(offering.max_capacity),
            busy,
        ))
    }

    /// Appointments passing the filter.
    pub async fn find_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> SchedulingResult<Vec<Appointment>> {
        Ok(self.store.find_appointments(filter).await?)
    }

    /// All appointments for a customer, any status.
    pub async fn appointments_for_customer(
        &self,
        customer: CustomerId,
    ) -> SchedulingResult<Vec<Appointment>> {
        self.find_appointments(AppointmentFilter::any().for_customer(customer))
            .await
    }

    /// All appointments for a service, any status.
    pub async fn appointments_for_service(
        &self,
        service: ServiceId,
    ) -> SchedulingResult<Vec<Appointment>> {
        self.find_appointments(AppointmentFilter::any().for_service(service))
            .await
    }

    /// Recomputes a customer's totals directly from appointment history,
    /// honoring the active no-show policy. The incrementally maintained
    /// [`Customer::totals`] must equal this at every checkpoint.
    pub async fn recomputed_totals(&self, customer: CustomerId) -> SchedulingResult<CustomerTotals> {
        let history = self.appointments_for_customer(customer).await?;
        Ok(CustomerTotals::recompute(
            &history,
            self.policy.no_show_counts_as_visit,
        ))
    }
}
