//! # Finance Category Lookup
//!
//! Resolves the category dues transactions post under, creating it on first
//! use. Runs inside the caller's unit of work.

use chrono::Utc;
use dues_core::{CoreError, FinanceCategory, TransactionDirection};
use sqlx::SqliteConnection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Get-or-create lookup for one named finance category.
#[derive(Debug, Clone)]
pub struct CategoryLookup {
    name: String,
    direction: TransactionDirection,
}

impl CategoryLookup {
    /// Lookup for an income category (dues are always income).
    pub fn income(name: impl Into<String>) -> Self {
        CategoryLookup {
            name: name.into(),
            direction: TransactionDirection::Income,
        }
    }

    /// Returns the category, inserting it if it doesn't exist yet.
    pub async fn resolve(&self, conn: &mut SqliteConnection) -> DbResult<FinanceCategory> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO finance_categories (id, name, direction, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&self.name)
        .bind(self.direction)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        if inserted > 0 {
            info!(name = %self.name, "Finance category created");
        }

        let category = sqlx::query_as::<_, FinanceCategory>(
            "SELECT id, name, direction FROM finance_categories WHERE name = ?1",
        )
        .bind(&self.name)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("FinanceCategory", &self.name))?;

        if category.direction != self.direction {
            warn!(
                name = %self.name,
                expected = ?self.direction,
                actual = ?category.direction,
                "Finance category has the wrong direction"
            );
            return Err(CoreError::CategoryDirectionMismatch {
                name: category.name,
                expected: self.direction,
                actual: category.direction,
            }
            .into());
        }

        debug!(id = %category.id, name = %category.name, "Finance category resolved");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use dues_core::{BillingModel, EventType};

    use crate::test_support::{date, test_db, Fixture};

    use super::*;

    #[tokio::test]
    async fn test_resolve_creates_once() {
        let db = test_db().await;
        let lookup = CategoryLookup::income("Dues");

        let mut uow = db.begin().await.unwrap();
        let first = lookup.resolve(uow.conn()).await.unwrap();
        let second = lookup.resolve(uow.conn()).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.direction, TransactionDirection::Income);
    }

    #[tokio::test]
    async fn test_resolve_rejects_expense_category() {
        let fx = Fixture::new().await;
        fx.exec(
            "INSERT INTO finance_categories (id, name, direction, created_at) \
             VALUES ('cat-1', 'Monthly Dues', 'expense', '2026-01-01T00:00:00Z')",
        )
        .await;
        let member = fx.member("Ivy", BillingModel::Fixed).await;
        fx.event(EventType::Practice, date(2026, 5, 5)).await;

        let err = fx.ledger.mark_paid_fixed(&member.id, "2026-05").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CategoryDirectionMismatch { .. })
        ));
        assert!(fx.record(&member, "2026-05").await.is_none());
    }
}
