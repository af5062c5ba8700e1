//! In-memory record store for the `bookcore` scheduling library
//!
//! This crate provides an in-memory implementation of the `RecordStore`
//! trait from the bookcore crate, useful for testing and development
//! scenarios where persistence is not required. Batches are validated in
//! full before any write is applied, so a failed commit leaves the store
//! exactly as it was.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bookcore::errors::{StoreError, StoreResult};
use bookcore::records::{
    Appointment, AppointmentStatus, Customer, FinancialRecord, ServiceOffering,
};
use bookcore::store::{
    AppointmentFilter, LedgerFilter, RecordStore, RecordWrite, ScheduleSnapshot, WriteBatch,
};
use bookcore::types::{AppointmentId, CustomerId, ScheduleVersion, ServiceId};

#[derive(Debug, Default)]
struct Tables {
    customers: HashMap<CustomerId, Customer>,
    services: HashMap<ServiceId, ServiceOffering>,
    appointments: HashMap<AppointmentId, Appointment>,
    ledger: Vec<FinancialRecord>,
    schedule_versions: HashMap<ServiceId, ScheduleVersion>,
}

impl Tables {
    fn schedule_version(&self, service: ServiceId) -> ScheduleVersion {
        self.schedule_versions
            .get(&service)
            .copied()
            .unwrap_or_else(ScheduleVersion::initial)
    }

    fn bump_schedule(&mut self, service: ServiceId) {
        let next = self.schedule_version(service).next();
        self.schedule_versions.insert(service, next);
    }

    fn has_revenue_for(&self, appointment: AppointmentId) -> bool {
        self.ledger
            .iter()
            .any(|entry| entry.appointment() == Some(appointment))
    }
}

/// Thread-safe in-memory record store for testing
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecordStore {
    /// Create a new empty in-memory record store
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a customer record directly, outside any batch.
    pub fn insert_customer(&self, customer: Customer) {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.customers.insert(customer.id, customer);
    }

    /// Seed a service offering directly, outside any batch.
    pub fn insert_service(&self, service: ServiceOffering) {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        tables.services.insert(service.id, service);
    }

    /// Number of ledger entries currently stored.
    pub fn ledger_len(&self) -> usize {
        self.tables.read().expect("RwLock poisoned").ledger.len()
    }

    fn validate(tables: &Tables, batch: &WriteBatch) -> StoreResult<()> {
        if let Some(guard) = batch.guard {
            let current = tables.schedule_version(guard.service);
            if current != guard.expected {
                return Err(StoreError::VersionConflict {
                    service: guard.service,
                    expected: guard.expected,
                    current,
                });
            }
        }

        // Revenue references appearing earlier in the same batch also count
        // as duplicates.
        let mut batch_revenue: Vec<AppointmentId> = Vec::new();
        for write in &batch.writes {
            match write {
                RecordWrite::InsertAppointment(appointment) => {
                    if tables.appointments.contains_key(&appointment.id) {
                        return Err(StoreError::DuplicateRecord(format!(
                            "appointment {}",
                            appointment.id
                        )));
                    }
                }
                RecordWrite::UpdateAppointment(appointment) => {
                    if !tables.appointments.contains_key(&appointment.id) {
                        return Err(StoreError::RecordNotFound(format!(
                            "appointment {}",
                            appointment.id
                        )));
                    }
                }
                RecordWrite::UpdateCustomer(customer) => {
                    if !tables.customers.contains_key(&customer.id) {
                        return Err(StoreError::RecordNotFound(format!(
                            "customer {}",
                            customer.id
                        )));
                    }
                }
                RecordWrite::AppendLedger(entry) => {
                    if let Some(appointment) = entry.appointment() {
                        if tables.has_revenue_for(appointment)
                            || batch_revenue.contains(&appointment)
                        {
                            return Err(StoreError::DuplicateRecord(format!(
                                "revenue already posted for appointment {appointment}"
                            )));
                        }
                        batch_revenue.push(appointment);
                    }
                }
            }
        }
        Ok(())
    }

    fn apply(tables: &mut Tables, batch: WriteBatch) {
        for write in batch.writes {
            match write {
                RecordWrite::InsertAppointment(appointment)
                | RecordWrite::UpdateAppointment(appointment) => {
                    tables.bump_schedule(appointment.service);
                    tables.appointments.insert(appointment.id, appointment);
                }
                RecordWrite::UpdateCustomer(customer) => {
                    tables.customers.insert(customer.id, customer);
                }
                RecordWrite::AppendLedger(entry) => {
                    tables.ledger.push(entry);
                }
            }
        }
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.customers.get(&id).cloned())
    }

    async fn get_service(&self, id: ServiceId) -> StoreResult<Option<ServiceOffering>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.services.get(&id).cloned())
    }

    async fn get_appointment(&self, id: AppointmentId) -> StoreResult<Option<Appointment>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.appointments.get(&id).cloned())
    }

    async fn scheduled_for_service(&self, service: ServiceId) -> StoreResult<ScheduleSnapshot> {
        let tables = self.tables.read().expect("RwLock poisoned");
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| a.service == service && a.status == AppointmentStatus::Scheduled)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| (a.slot.start, a.id));
        Ok(ScheduleSnapshot {
            service,
            appointments,
            version: tables.schedule_version(service),
        })
    }

    async fn find_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        let mut matching: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        // Creation order; appointment ids are v7, so id order is it.
        matching.sort_by_key(|a| a.id);
        Ok(matching)
    }

    async fn ledger_entries(&self, filter: LedgerFilter) -> StoreResult<Vec<FinancialRecord>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables
            .ledger
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect())
    }

    async fn schedule_versions(&self) -> StoreResult<HashMap<ServiceId, ScheduleVersion>> {
        let tables = self.tables.read().expect("RwLock poisoned");
        Ok(tables.schedule_versions.clone())
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tables = self.tables.write().expect("RwLock poisoned");
        Self::validate(&tables, &batch)?;
        Self::apply(&mut tables, batch);
        Ok(())
    }
}
