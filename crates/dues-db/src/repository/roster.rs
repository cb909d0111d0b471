//! # Roster Repository
//!
//! Members, events and registrations: the inputs the dues ledger reads.
//!
//! ## Lifecycle of a Registration
//! ```text
//! register_attendance ──► ACTIVE, fee_paid = 0
//!        ▲                    │
//!        │ (re-register)      │ withdraw_registration
//!        │                    ▼          (refused while fee_paid = 1)
//!        └──────────────  CANCELLED
//! ```
//!
//! The fee flag itself is only ever changed by the ledger engines.

use chrono::{NaiveDate, Utc};
use dues_core::validation::{
    validate_display_name, validate_event_id, validate_event_title, validate_member_id,
};
use dues_core::{BillingModel, CoreError, Event, EventType, Member, Registration};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Repository for the club roster.
#[derive(Debug, Clone)]
pub struct RosterRepository {
    pool: SqlitePool,
}

impl RosterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RosterRepository { pool }
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Adds a new active member.
    pub async fn register_member(
        &self,
        display_name: &str,
        billing_model: BillingModel,
    ) -> DbResult<Member> {
        let member = Member {
            id: Uuid::new_v4().to_string(),
            display_name: validate_display_name(display_name)?,
            billing_model,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO members (id, display_name, billing_model, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&member.id)
        .bind(&member.display_name)
        .bind(member.billing_model)
        .bind(member.is_active)
        .bind(member.created_at)
        .execute(&self.pool)
        .await?;

        info!(id = %member.id, model = member.billing_model.as_str(), "Member registered");
        Ok(member)
    }

    pub async fn get_member(&self, member_id: &str) -> DbResult<Option<Member>> {
        let member = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, display_name, billing_model, is_active, created_at
            FROM members
            WHERE id = ?1
            "#,
        )
        .bind(member_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(member)
    }

    /// Active members sorted by name.
    pub async fn list_active_members(&self) -> DbResult<Vec<Member>> {
        let members = sqlx::query_as::<_, Member>(
            r#"
            SELECT id, display_name, billing_model, is_active, created_at
            FROM members
            WHERE is_active = 1
            ORDER BY display_name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(members)
    }

    /// Switches a member's billing model.
    ///
    /// Refused once any dues record exists for the member, because existing
    /// records were reconciled under the old model.
    pub async fn change_billing_model(
        &self,
        member_id: &str,
        billing_model: BillingModel,
    ) -> DbResult<Member> {
        let member_id = validate_member_id(member_id)?;
        let mut tx = self.pool.begin().await?;

        let mut member = sqlx::query_as::<_, Member>(
            "SELECT id, display_name, billing_model, is_active, created_at FROM members WHERE id = ?1",
        )
        .bind(&member_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::MemberNotFound(member_id.clone()))?;

        if member.billing_model == billing_model {
            return Ok(member);
        }

        let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM monthly_dues WHERE member_id = ?1")
            .bind(&member_id)
            .fetch_one(&mut *tx)
            .await?;
        if records > 0 {
            return Err(CoreError::BillingModelLocked(member_id).into());
        }

        sqlx::query("UPDATE members SET billing_model = ?2 WHERE id = ?1")
            .bind(&member_id)
            .bind(billing_model)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(
            id = %member_id,
            from = member.billing_model.as_str(),
            to = billing_model.as_str(),
            "Billing model changed"
        );
        member.billing_model = billing_model;
        Ok(member)
    }

    /// Marks a member inactive. Their ledger history is kept.
    pub async fn deactivate_member(&self, member_id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE members SET is_active = 0 WHERE id = ?1")
            .bind(member_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::MemberNotFound(member_id.to_string()).into());
        }
        info!(id = %member_id, "Member deactivated");
        Ok(())
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub async fn schedule_event(
        &self,
        title: &str,
        event_type: EventType,
        event_date: NaiveDate,
    ) -> DbResult<Event> {
        let event = Event {
            id: Uuid::new_v4().to_string(),
            title: validate_event_title(title)?,
            event_type,
            event_date,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO events (id, title, event_type, event_date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(event.event_type)
        .bind(event.event_date)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        debug!(id = %event.id, kind = event.event_type.as_str(), date = %event.event_date, "Event scheduled");
        Ok(event)
    }

    pub async fn get_event(&self, event_id: &str) -> DbResult<Option<Event>> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, title, event_type, event_date, created_at FROM events WHERE id = ?1",
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    // =========================================================================
    // Registrations
    // =========================================================================

    /// Registers a member for an event.
    ///
    /// Idempotent: registering again returns the existing row, re-activating
    /// it if it had been withdrawn. The fee flag is left as it was.
    pub async fn register_attendance(&self, member_id: &str, event_id: &str) -> DbResult<Registration> {
        let member_id = validate_member_id(member_id)?;
        let event_id = validate_event_id(event_id)?;

        if self.get_member(&member_id).await?.is_none() {
            return Err(CoreError::MemberNotFound(member_id).into());
        }
        if self.get_event(&event_id).await?.is_none() {
            return Err(CoreError::EventNotFound(event_id).into());
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO registrations (
                id, member_id, event_id, status, fee_paid, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 'active', 0, ?4, ?4)
            ON CONFLICT (member_id, event_id) DO UPDATE SET
                status = 'active',
                updated_at = excluded.updated_at
            WHERE registrations.status <> 'active'
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&member_id)
        .bind(&event_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let registration = self
            .get_registration(&member_id, &event_id)
            .await?
            .ok_or_else(|| DbError::not_found("Registration", format!("{}/{}", member_id, event_id)))?;

        debug!(id = %registration.id, member_id = %member_id, event_id = %event_id, "Attendance registered");
        Ok(registration)
    }

    /// Withdraws a registration.
    ///
    /// A registration whose fee is flagged paid cannot be withdrawn; the
    /// payment has to be cancelled first.
    pub async fn withdraw_registration(&self, member_id: &str, event_id: &str) -> DbResult<Registration> {
        let mut registration = self
            .get_registration(member_id, event_id)
            .await?
            .ok_or_else(|| DbError::not_found("Registration", format!("{}/{}", member_id, event_id)))?;

        if registration.fee_paid {
            return Err(CoreError::RegistrationLocked {
                member_id: member_id.to_string(),
                reason: "attendance fee is already paid".to_string(),
            }
            .into());
        }

        let now = Utc::now();
        sqlx::query("UPDATE registrations SET status = 'cancelled', updated_at = ?2 WHERE id = ?1")
            .bind(&registration.id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        info!(id = %registration.id, "Registration withdrawn");
        registration.status = dues_core::RegistrationStatus::Cancelled;
        registration.updated_at = now;
        Ok(registration)
    }

    pub async fn get_registration(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> DbResult<Option<Registration>> {
        let registration = sqlx::query_as::<_, Registration>(
            r#"
            SELECT id, member_id, event_id, status, fee_paid, created_at, updated_at
            FROM registrations
            WHERE member_id = ?1 AND event_id = ?2
            "#,
        )
        .bind(member_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(registration)
    }
}

#[cfg(test)]
mod tests {
    use dues_core::RegistrationStatus;

    use crate::test_support::{date, test_db};

    use super::*;

    #[tokio::test]
    async fn test_register_and_fetch_member() {
        let db = test_db().await;
        let roster = db.roster();

        let member = roster.register_member("  Ana  ", BillingModel::Single).await.unwrap();
        assert_eq!(member.display_name, "Ana");

        let loaded = roster.get_member(&member.id).await.unwrap().unwrap();
        assert_eq!(loaded.billing_model, BillingModel::Single);
        assert!(loaded.is_active);
    }

    #[tokio::test]
    async fn test_register_member_rejects_blank_name() {
        let db = test_db().await;
        let err = db
            .roster()
            .register_member("   ", BillingModel::Fixed)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_register_attendance_is_idempotent_and_reactivates() {
        let db = test_db().await;
        let roster = db.roster();
        let member = roster.register_member("Ben", BillingModel::Single).await.unwrap();
        let event = roster
            .schedule_event("Tuesday practice", EventType::Practice, date(2026, 5, 5))
            .await
            .unwrap();

        let first = roster.register_attendance(&member.id, &event.id).await.unwrap();
        let again = roster.register_attendance(&member.id, &event.id).await.unwrap();
        assert_eq!(first.id, again.id);
        assert!(!again.fee_paid);

        let withdrawn = roster.withdraw_registration(&member.id, &event.id).await.unwrap();
        assert_eq!(withdrawn.status, RegistrationStatus::Cancelled);

        let back = roster.register_attendance(&member.id, &event.id).await.unwrap();
        assert_eq!(back.id, first.id);
        assert_eq!(back.status, RegistrationStatus::Active);
    }

    #[tokio::test]
    async fn test_register_attendance_unknown_ids() {
        let db = test_db().await;
        let roster = db.roster();
        let member = roster.register_member("Cai", BillingModel::Fixed).await.unwrap();

        let err = roster.register_attendance("nobody", "nothing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MemberNotFound(_))));

        let err = roster.register_attendance(&member.id, "nothing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EventNotFound(_))));
    }

    #[tokio::test]
    async fn test_withdraw_paid_registration_is_locked() {
        let db = test_db().await;
        let roster = db.roster();
        let member = roster.register_member("Dee", BillingModel::Single).await.unwrap();
        let event = roster
            .schedule_event("League match", EventType::Match, date(2026, 5, 9))
            .await
            .unwrap();
        let registration = roster.register_attendance(&member.id, &event.id).await.unwrap();

        sqlx::query("UPDATE registrations SET fee_paid = 1 WHERE id = ?1")
            .bind(&registration.id)
            .execute(db.pool())
            .await
            .unwrap();

        let err = roster.withdraw_registration(&member.id, &event.id).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::RegistrationLocked { .. })));
    }

    #[tokio::test]
    async fn test_change_billing_model_locked_by_dues() {
        let db = test_db().await;
        let roster = db.roster();
        let member = roster.register_member("Eli", BillingModel::Fixed).await.unwrap();

        let switched = roster
            .change_billing_model(&member.id, BillingModel::Single)
            .await
            .unwrap();
        assert_eq!(switched.billing_model, BillingModel::Single);

        sqlx::query(
            "INSERT INTO monthly_dues (id, member_id, month, created_at, updated_at) \
             VALUES ('d-1', ?1, '2026-05', '2026-05-01T00:00:00Z', '2026-05-01T00:00:00Z')",
        )
        .bind(&member.id)
        .execute(db.pool())
        .await
        .unwrap();

        let err = roster
            .change_billing_model(&member.id, BillingModel::Fixed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::BillingModelLocked(_))));
    }

    #[tokio::test]
    async fn test_deactivate_member_hides_from_active_list() {
        let db = test_db().await;
        let roster = db.roster();
        let a = roster.register_member("Fay", BillingModel::Fixed).await.unwrap();
        let b = roster.register_member("Gus", BillingModel::Single).await.unwrap();

        roster.deactivate_member(&a.id).await.unwrap();

        let active = roster.list_active_members().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);
    }
}
