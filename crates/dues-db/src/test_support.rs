//! Fixtures shared by the db tests.

use std::path::Path;

use chrono::NaiveDate;
use dues_core::{
    AttendanceFeeFlag, BillingModel, BillingMonth, Event, EventType, FlagFilter, Member,
    MonthlyDuesRecord, Registration, TransactionRecord,
};

use crate::config::LedgerConfig;
use crate::ledger::DuesLedger;
use crate::pool::{Database, DbConfig};

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub(crate) fn month(key: &str) -> BillingMonth {
    key.parse().unwrap()
}

pub(crate) async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// In-memory database plus a ledger with the default fee schedule.
pub(crate) struct Fixture {
    pub db: Database,
    pub ledger: DuesLedger,
}

impl Fixture {
    pub async fn new() -> Self {
        Self::with_config(LedgerConfig::default()).await
    }

    pub async fn with_config(config: LedgerConfig) -> Self {
        let db = test_db().await;
        let ledger = db.ledger(&config);
        Fixture { db, ledger }
    }

    /// File-backed database with a multi-connection pool, so concurrent
    /// units of work really contend for the write lock.
    pub async fn on_disk(path: &Path, connections: u32) -> Self {
        let config = DbConfig::new(path).max_connections(connections);
        let db = Database::new(config).await.unwrap();
        let ledger = db.ledger(&LedgerConfig::default());
        Fixture { db, ledger }
    }

    pub async fn member(&self, name: &str, model: BillingModel) -> Member {
        self.db.roster().register_member(name, model).await.unwrap()
    }

    pub async fn event(&self, kind: EventType, on: NaiveDate) -> Event {
        let title = format!("{} {}", kind.as_str(), on);
        self.db.roster().schedule_event(&title, kind, on).await.unwrap()
    }

    pub async fn attend(&self, member: &Member, event: &Event) -> Registration {
        self.db
            .roster()
            .register_attendance(&member.id, &event.id)
            .await
            .unwrap()
    }

    pub async fn record(&self, member: &Member, key: &str) -> Option<MonthlyDuesRecord> {
        let mut uow = self.db.begin().await.unwrap();
        let record = uow
            .ledger()
            .find_monthly_record(&member.id, month(key))
            .await
            .unwrap();
        uow.rollback().await.unwrap();
        record
    }

    pub async fn transactions(&self, member: &Member, key: &str) -> Vec<TransactionRecord> {
        let Some(record) = self.record(member, key).await else {
            return Vec::new();
        };
        let mut uow = self.db.begin().await.unwrap();
        let transactions = uow.ledger().find_transactions_for(&record.id).await.unwrap();
        uow.rollback().await.unwrap();
        transactions
    }

    pub async fn flags(&self, member: &Member, key: &str) -> Vec<AttendanceFeeFlag> {
        let mut uow = self.db.begin().await.unwrap();
        let flags = uow
            .ledger()
            .find_qualifying_attendance(&member.id, month(key), FlagFilter::All)
            .await
            .unwrap();
        uow.rollback().await.unwrap();
        flags
    }

    /// Event ids whose fee flag is paid, in event order.
    pub async fn paid_events(&self, member: &Member, key: &str) -> Vec<String> {
        self.flags(member, key)
            .await
            .into_iter()
            .filter(|f| f.paid)
            .map(|f| f.event_id)
            .collect()
    }

    /// Runs a raw statement, for corrupting state in invariant tests.
    pub async fn exec(&self, sql: &str) {
        sqlx::query(sql).execute(self.db.pool()).await.unwrap();
    }
}
