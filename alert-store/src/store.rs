//! Alert persistence using RocksDB
//!
//! # Column Families
//!
//! - `alerts` - Alert records (key: alert_id)
//! - `submissions` - submission_id -> alert_id (enforces one live alert
//!   per submission)
//! - `status_idx` - status || alert_id (sweep and dashboard queries)
//! - `subject_idx` - length-framed subject_id || alert_id

use crate::{
    config::Config,
    error::{Error, Result},
    state,
    types::{Alert, AlertEvent, AlertPriority, AlertStatus},
};
use chrono::{DateTime, Utc};
use ledger_core::SubjectId;
use parking_lot::Mutex;
use risk_engine::RiskCategory;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use std::sync::Arc;
use uuid::Uuid;

/// Column family names
const CF_ALERTS: &str = "alerts";
const CF_SUBMISSIONS: &str = "submissions";
const CF_STATUS_IDX: &str = "status_idx";
const CF_SUBJECT_IDX: &str = "subject_idx";

/// Persistent alert store
///
/// `create` and `transition` serialize their check-then-write sections, so
/// concurrent creators converge on one alert and concurrent sweepers on one
/// escalation.
pub struct AlertStore {
    db: Arc<DB>,

    /// Serializes create/transition check-then-write sections
    write_lock: Mutex<()>,

    config: Config,
}

impl AlertStore {
    /// Open or create database
    pub fn open(config: Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_ALERTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_SUBMISSIONS, Options::default()),
            ColumnFamilyDescriptor::new(CF_STATUS_IDX, Options::default()),
            ColumnFamilyDescriptor::new(CF_SUBJECT_IDX, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(path = %path.display(), "Opened alert RocksDB");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
            config,
        })
    }

    fn cf_handle(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    /// Create an alert for a submission (idempotent)
    ///
    /// When the submission already has a non-terminal alert, that alert is
    /// returned instead of creating a duplicate. A submission whose prior
    /// alert reached a terminal status may get a fresh one.
    pub fn create(
        &self,
        submission_id: Uuid,
        subject_id: SubjectId,
        category: RiskCategory,
        priority: AlertPriority,
        risk_score: i64,
    ) -> Result<Alert> {
        let _guard = self.write_lock.lock();

        let cf_submissions = self.cf_handle(CF_SUBMISSIONS)?;
        if let Some(id_bytes) = self.db.get_cf(&cf_submissions, submission_id.as_bytes())? {
            let existing = self.get(Self::uuid_from_bytes(&id_bytes)?)?;
            if !existing.is_terminal() {
                tracing::debug!(
                    alert_id = %existing.alert_id,
                    submission_id = %submission_id,
                    "Live alert already exists for submission"
                );
                return Ok(existing);
            }
        }

        let created_at = Utc::now();
        let alert = Alert {
            alert_id: Uuid::now_v7(),
            subject_id,
            submission_id,
            category,
            priority,
            risk_score,
            status: AlertStatus::Pending,
            created_at,
            sla_deadline: created_at + self.config.sla.duration(priority),
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            escalation_count: 0,
        };

        let mut batch = WriteBatch::default();

        let cf_alerts = self.cf_handle(CF_ALERTS)?;
        batch.put_cf(&cf_alerts, alert.alert_id.as_bytes(), bincode::serialize(&alert)?);
        batch.put_cf(&cf_submissions, submission_id.as_bytes(), alert.alert_id.as_bytes());

        let cf_status = self.cf_handle(CF_STATUS_IDX)?;
        batch.put_cf(&cf_status, Self::status_key(alert.status, alert.alert_id), []);

        let cf_subject = self.cf_handle(CF_SUBJECT_IDX)?;
        batch.put_cf(
            &cf_subject,
            Self::subject_key(&alert.subject_id, Some(alert.alert_id)),
            [],
        );

        self.db.write(batch)?;

        tracing::info!(
            alert_id = %alert.alert_id,
            submission_id = %submission_id,
            subject_id = %alert.subject_id,
            priority = %priority,
            sla_deadline = %alert.sla_deadline,
            "Alert created"
        );

        Ok(alert)
    }

    /// Apply a lifecycle event to an alert
    ///
    /// Illegal transitions fail with [`Error::InvalidTransition`].
    /// `Escalate` on an already-escalated alert is a no-op returning the
    /// alert unchanged, so concurrent sweepers do not error on each other.
    pub fn transition(
        &self,
        alert_id: Uuid,
        event: AlertEvent,
        actor: Option<&str>,
    ) -> Result<Alert> {
        if event.requires_actor() && actor.is_none() {
            return Err(Error::MissingActor(event));
        }

        let _guard = self.write_lock.lock();

        let mut alert = self.get(alert_id)?;
        let from = alert.status;

        if event == AlertEvent::Escalate && from == AlertStatus::Escalated {
            return Ok(alert);
        }

        let next = state::next_status(from, event)
            .ok_or(Error::InvalidTransition { from, event })?;

        let now = Utc::now();
        alert.status = next;
        match event {
            AlertEvent::Acknowledge => {
                alert.acknowledged_at = Some(now);
                alert.acknowledged_by = actor.map(str::to_string);
            }
            AlertEvent::Resolve => {
                alert.resolved_at = Some(now);
            }
            AlertEvent::Escalate => {
                alert.escalation_count += 1;
            }
            AlertEvent::Start | AlertEvent::Dismiss => {}
        }

        let mut batch = WriteBatch::default();

        let cf_alerts = self.cf_handle(CF_ALERTS)?;
        batch.put_cf(&cf_alerts, alert.alert_id.as_bytes(), bincode::serialize(&alert)?);

        let cf_status = self.cf_handle(CF_STATUS_IDX)?;
        batch.delete_cf(&cf_status, Self::status_key(from, alert.alert_id));
        batch.put_cf(&cf_status, Self::status_key(alert.status, alert.alert_id), []);

        self.db.write(batch)?;

        tracing::info!(
            alert_id = %alert.alert_id,
            from = %from,
            to = %alert.status,
            event = %event,
            actor = actor.unwrap_or("system"),
            "Alert transitioned"
        );

        Ok(alert)
    }

    /// Escalate an alert for the SLA sweep, reporting whether this call
    /// did the work
    ///
    /// Returns `Ok(None)` when the alert is already escalated or reached a
    /// terminal status in the meantime, so concurrent sweepers escalate
    /// exactly once and exactly one of them emits the notification.
    pub fn escalate(&self, alert_id: Uuid) -> Result<Option<Alert>> {
        let _guard = self.write_lock.lock();

        let mut alert = self.get(alert_id)?;
        let from = alert.status;

        if from == AlertStatus::Escalated || from.is_terminal() {
            return Ok(None);
        }

        // Pending, Acknowledged and InProgress all escalate
        alert.status = state::next_status(from, AlertEvent::Escalate)
            .ok_or(Error::InvalidTransition {
                from,
                event: AlertEvent::Escalate,
            })?;
        alert.escalation_count += 1;

        let mut batch = WriteBatch::default();

        let cf_alerts = self.cf_handle(CF_ALERTS)?;
        batch.put_cf(&cf_alerts, alert.alert_id.as_bytes(), bincode::serialize(&alert)?);

        let cf_status = self.cf_handle(CF_STATUS_IDX)?;
        batch.delete_cf(&cf_status, Self::status_key(from, alert.alert_id));
        batch.put_cf(&cf_status, Self::status_key(alert.status, alert.alert_id), []);

        self.db.write(batch)?;

        tracing::warn!(
            alert_id = %alert.alert_id,
            from = %from,
            escalation_count = alert.escalation_count,
            sla_deadline = %alert.sla_deadline,
            "Alert escalated on SLA breach"
        );

        Ok(Some(alert))
    }

    /// Get alert by ID
    pub fn get(&self, alert_id: Uuid) -> Result<Alert> {
        let cf = self.cf_handle(CF_ALERTS)?;

        let value = self
            .db
            .get_cf(&cf, alert_id.as_bytes())?
            .ok_or_else(|| Error::AlertNotFound(alert_id.to_string()))?;

        Ok(bincode::deserialize(&value)?)
    }

    /// Alert currently recorded for a submission, if any
    pub fn find_by_submission(&self, submission_id: Uuid) -> Result<Option<Alert>> {
        let cf = self.cf_handle(CF_SUBMISSIONS)?;

        match self.db.get_cf(&cf, submission_id.as_bytes())? {
            Some(id_bytes) => Ok(Some(self.get(Self::uuid_from_bytes(&id_bytes)?)?)),
            None => Ok(None),
        }
    }

    /// Non-terminal alerts whose SLA deadline has passed
    ///
    /// Already-escalated alerts are excluded; they have no further
    /// automatic transition.
    pub fn find_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Alert>> {
        let mut overdue = Vec::new();
        for status in [
            AlertStatus::Pending,
            AlertStatus::Acknowledged,
            AlertStatus::InProgress,
        ] {
            for alert in self.list_by_status(status)? {
                if alert.sla_deadline < now {
                    overdue.push(alert);
                }
            }
        }
        Ok(overdue)
    }

    /// All alerts in a given status (dashboard query)
    pub fn list_by_status(&self, status: AlertStatus) -> Result<Vec<Alert>> {
        let cf_status = self.cf_handle(CF_STATUS_IDX)?;
        let prefix = [status as u8];

        let iter = self
            .db
            .iterator_cf(&cf_status, IteratorMode::From(&prefix, rocksdb::Direction::Forward));

        let mut alerts = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            alerts.push(self.get(Self::uuid_from_bytes(&key[1..])?)?);
        }

        Ok(alerts)
    }

    /// All alerts for a subject, oldest first (dashboard query)
    pub fn list_by_subject(&self, subject: &SubjectId) -> Result<Vec<Alert>> {
        let cf_subject = self.cf_handle(CF_SUBJECT_IDX)?;
        let prefix = Self::subject_key(subject, None);

        let iter = self
            .db
            .iterator_cf(&cf_subject, IteratorMode::From(&prefix, rocksdb::Direction::Forward));

        let mut alerts = Vec::new();
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            alerts.push(self.get(Self::uuid_from_bytes(&key[prefix.len()..])?)?);
        }

        Ok(alerts)
    }

    // Index key helpers

    fn status_key(status: AlertStatus, alert_id: Uuid) -> Vec<u8> {
        let mut key = vec![status as u8];
        key.extend_from_slice(alert_id.as_bytes());
        key
    }

    /// Length-framed subject prefix; subject IDs are opaque strings, so a
    /// separator byte alone would let prefix-sharing subjects collide
    fn subject_key(subject: &SubjectId, alert_id: Option<Uuid>) -> Vec<u8> {
        let name = subject.as_str().as_bytes();
        let mut key = Vec::with_capacity(4 + name.len() + 16);
        key.extend_from_slice(&(name.len() as u32).to_be_bytes());
        key.extend_from_slice(name);
        if let Some(id) = alert_id {
            key.extend_from_slice(id.as_bytes());
        }
        key
    }

    fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| Error::Storage("Malformed UUID key in index".to_string()))?;
        Ok(Uuid::from_bytes(arr))
    }
}
