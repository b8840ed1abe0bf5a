//! SQLite-backed store.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` by constraint kind:
//!
//! | SQLx error kind | StoreError | Scenario |
//! |-----------------|------------|----------|
//! | `UniqueViolation` | `Duplicate` | donor id already registered |
//! | `ForeignKeyViolation` | `NotFound` | outreach record points at a missing donor/request |
//! | `CheckViolation` | `Domain(InvariantViolation)` | value rejected by a table `CHECK` (e.g. negative stock) |
//! | anything else | `Database` | connection failures, pool closed, corrupt rows |
//!
//! ## Stock Guard
//!
//! `adjust_stock` applies the delta with a single guarded `UPDATE ... RETURNING`
//! statement, so the non-negative invariant holds under concurrent writers
//! without explicit locking. The guard also refuses deltas that would push the
//! quantity past `i64::MAX`. The `CHECK (quantity >= 0)` column constraint
//! backs it up.
//!
//! When the guard rejects a delta, the error is built from a follow-up read,
//! and the update is retried if that read shows the delta now fits. The
//! `available` figure in `InsufficientStock` is therefore always one that
//! really was too small.
//!
//! ## Outreach Transitions
//!
//! `resolve_donation_request` updates only rows still `pending` and inserts
//! the requester notification in the same transaction, so two racing
//! responses to one donation request cannot both win.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::{FromRow, Row};
use tracing::{debug, instrument};

use bloodbank_core::{
    BloodType, DomainError, DonationRequestId, DonorId, Entity, NotificationId, RequestId,
};
use bloodbank_inventory::{AdjustStock, InventoryUnit, StockAdjusted};
use bloodbank_registry::{
    BloodRequest, ContactInfo, DonationRequest, DonationStatus, Donor, Notification,
};

use super::r#trait::{DonorStore, InventoryStore, OutreachStore, RequestStore, StoreError};
use crate::config::DatabaseConfig;
use crate::db;

/// Persistent store over a SQLite connection pool.
///
/// `SqlitePool` is internally reference counted, so cloning the store is cheap
/// and clones share connections.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Wrap an existing pool. The schema must already exist (see [`db::migrate`]).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect and create the schema if needed.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = db::connect(config).await?;
        db::migrate(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl DonorStore for SqliteStore {
    #[instrument(skip(self, donor), fields(donor_id = %donor.id()), err)]
    async fn insert_donor(&self, donor: &Donor) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO donors (
                donor_id,
                name,
                age,
                blood_type,
                phone,
                address,
                email,
                last_donation,
                registered_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(donor.id().as_str())
        .bind(donor.name())
        .bind(i64::from(donor.age()))
        .bind(donor.blood_type().label())
        .bind(&donor.contact().phone)
        .bind(&donor.contact().address)
        .bind(donor.contact().email.as_deref())
        .bind(donor.last_donation().map(encode_date))
        .bind(encode_time(donor.registered_at()))
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("donor {}", donor.id()))
            } else {
                map_sqlx_error("insert_donor", e)
            }
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(donor_id = %id), err)]
    async fn get_donor(&self, id: &DonorId) -> Result<Option<Donor>, StoreError> {
        let row = sqlx::query(&format!("{DONOR_COLUMNS} WHERE donor_id = ?1"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_donor", e))?;

        row.map(|r| Donor::try_from(decode_row::<DonorRow>(&r)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_donors(&self, blood_type: Option<BloodType>) -> Result<Vec<Donor>, StoreError> {
        let rows = sqlx::query(&format!(
            "{DONOR_COLUMNS} WHERE (?1 IS NULL OR blood_type = ?1) ORDER BY name ASC, donor_id ASC"
        ))
        .bind(blood_type.map(BloodType::label))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_donors", e))?;

        let donors = rows
            .iter()
            .map(|r| Donor::try_from(decode_row::<DonorRow>(r)?))
            .collect::<Result<Vec<Donor>, StoreError>>()?;

        debug!(count = donors.len(), "listed donors");
        Ok(donors)
    }

    #[instrument(skip(self, donor), fields(donor_id = %donor.id()), err)]
    async fn update_donor(&self, donor: &Donor) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE donors
            SET name = ?2,
                age = ?3,
                blood_type = ?4,
                phone = ?5,
                address = ?6,
                email = ?7,
                last_donation = ?8
            WHERE donor_id = ?1
            "#,
        )
        .bind(donor.id().as_str())
        .bind(donor.name())
        .bind(i64::from(donor.age()))
        .bind(donor.blood_type().label())
        .bind(&donor.contact().phone)
        .bind(&donor.contact().address)
        .bind(donor.contact().email.as_deref())
        .bind(donor.last_donation().map(encode_date))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_donor", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("donor {}", donor.id())));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(donor_id = %id), err)]
    async fn delete_donor(&self, id: &DonorId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM donors WHERE donor_id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_donor", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl InventoryStore for SqliteStore {
    #[instrument(skip(self), err)]
    async fn seed_inventory(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for blood_type in BloodType::ALL {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO inventory (blood_type, quantity, updated_at)
                VALUES (?1, 0, ?2)
                "#,
            )
            .bind(blood_type.label())
            .bind(encode_time(at))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("seed_inventory", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn get_unit(&self, blood_type: BloodType) -> Result<Option<InventoryUnit>, StoreError> {
        let row = sqlx::query(
            "SELECT blood_type, quantity, updated_at FROM inventory WHERE blood_type = ?1",
        )
        .bind(blood_type.label())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_unit", e))?;

        row.map(|r| InventoryUnit::try_from(decode_row::<UnitRow>(&r)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_units(&self) -> Result<Vec<InventoryUnit>, StoreError> {
        let rows = sqlx::query("SELECT blood_type, quantity, updated_at FROM inventory")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_units", e))?;

        let mut units = rows
            .iter()
            .map(|r| InventoryUnit::try_from(decode_row::<UnitRow>(r)?))
            .collect::<Result<Vec<InventoryUnit>, StoreError>>()?;
        units.sort_by_key(|u| u.blood_type().ordinal());
        Ok(units)
    }

    #[instrument(
        skip(self, cmd),
        fields(blood_type = %cmd.blood_type, delta = cmd.delta),
        err
    )]
    async fn adjust_stock(&self, cmd: &AdjustStock) -> Result<StockAdjusted, StoreError> {
        for _ in 0..ADJUST_ATTEMPTS {
            if let Some(adjusted) = self.try_adjust(cmd).await? {
                return Ok(adjusted);
            }

            // The guard rejected the delta or the unit is missing. Judge the
            // rejection against a fresh read; if that read would accept the
            // delta, another writer got in between and the update is retried.
            let available: Option<i64> =
                sqlx::query_scalar("SELECT quantity FROM inventory WHERE blood_type = ?1")
                    .bind(cmd.blood_type.label())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| map_sqlx_error("adjust_stock", e))?;

            let Some(available) = available else {
                return Err(StoreError::NotFound(format!("inventory unit {}", cmd.blood_type)));
            };
            match available.checked_add(cmd.delta) {
                None => return Err(DomainError::validation("quantity overflow").into()),
                Some(after) if after < 0 => {
                    return Err(StoreError::InsufficientStock {
                        blood_type: cmd.blood_type,
                        available,
                        requested: cmd.delta.saturating_neg(),
                    });
                }
                Some(_) => debug!(available, "stock moved under a rejected adjustment, retrying"),
            }
        }

        Err(StoreError::Database(format!(
            "adjust_stock: {} stock kept changing, gave up after {ADJUST_ATTEMPTS} attempts",
            cmd.blood_type
        )))
    }
}

impl SqliteStore {
    /// One guarded `UPDATE`. `None` means no row passed the guard.
    async fn try_adjust(&self, cmd: &AdjustStock) -> Result<Option<StockAdjusted>, StoreError> {
        // Both bounds are checked before the addition so the stored integer
        // never overflows into a REAL.
        let after: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE inventory
            SET quantity = quantity + ?1,
                updated_at = ?2
            WHERE blood_type = ?3
              AND CASE
                    WHEN ?1 >= 0 THEN quantity <= 9223372036854775807 - ?1
                    ELSE quantity >= -?1
                  END
            RETURNING quantity
            "#,
        )
        .bind(cmd.delta)
        .bind(encode_time(cmd.occurred_at))
        .bind(cmd.blood_type.label())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        Ok(after.map(|quantity_after| StockAdjusted {
            blood_type: cmd.blood_type,
            delta: cmd.delta,
            quantity_before: quantity_after - cmd.delta,
            quantity_after,
            occurred_at: cmd.occurred_at,
        }))
    }
}

#[async_trait]
impl RequestStore for SqliteStore {
    #[instrument(skip(self, request), fields(request_id = %request.id), err)]
    async fn insert_request(&self, request: &BloodRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO blood_requests (
                request_id,
                name,
                phone,
                blood_type,
                reason,
                message,
                location,
                date_needed,
                requested_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(request.id.to_string())
        .bind(&request.name)
        .bind(&request.phone)
        .bind(request.blood_type.label())
        .bind(&request.reason)
        .bind(&request.message)
        .bind(request.location.as_deref())
        .bind(request.date_needed.map(encode_date))
        .bind(encode_time(request.requested_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_request", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn get_request(&self, id: RequestId) -> Result<Option<BloodRequest>, StoreError> {
        let row = sqlx::query(&format!("{REQUEST_COLUMNS} WHERE request_id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_request", e))?;

        row.map(|r| BloodRequest::try_from(decode_row::<RequestRow>(&r)?))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_requests(&self) -> Result<Vec<BloodRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "{REQUEST_COLUMNS} ORDER BY requested_at DESC, request_id DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_requests", e))?;

        rows.iter()
            .map(|r| BloodRequest::try_from(decode_row::<RequestRow>(r)?))
            .collect()
    }

    #[instrument(skip(self, request), fields(request_id = %request.id), err)]
    async fn update_request(&self, request: &BloodRequest) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE blood_requests
            SET name = ?2,
                phone = ?3,
                blood_type = ?4,
                reason = ?5,
                message = ?6,
                location = ?7,
                date_needed = ?8
            WHERE request_id = ?1
            "#,
        )
        .bind(request.id.to_string())
        .bind(&request.name)
        .bind(&request.phone)
        .bind(request.blood_type.label())
        .bind(&request.reason)
        .bind(&request.message)
        .bind(request.location.as_deref())
        .bind(request.date_needed.map(encode_date))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_request", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("blood request {}", request.id)));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(request_id = %id), err)]
    async fn delete_request(&self, id: RequestId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM blood_requests WHERE request_id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_request", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OutreachStore for SqliteStore {
    #[instrument(
        skip(self, request),
        fields(donation_request_id = %request.id, donor_id = %request.donor_id),
        err
    )]
    async fn insert_donation_request(&self, request: &DonationRequest) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO donation_requests (
                donation_request_id,
                donor_id,
                request_id,
                message,
                status,
                is_read,
                created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(request.id.to_string())
        .bind(request.donor_id.as_str())
        .bind(request.request_id.to_string())
        .bind(&request.message)
        .bind(request.status.as_str())
        .bind(request.is_read)
        .bind(encode_time(request.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_donation_request", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(donation_request_id = %id), err)]
    async fn get_donation_request(
        &self,
        id: DonationRequestId,
    ) -> Result<Option<DonationRequest>, StoreError> {
        let row = sqlx::query(&format!(
            "{DONATION_REQUEST_COLUMNS} WHERE donation_request_id = ?1"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_donation_request", e))?;

        row.map(|r| DonationRequest::try_from(decode_row::<DonationRequestRow>(&r)?))
            .transpose()
    }

    #[instrument(
        skip(self, resolved, notification),
        fields(donation_request_id = %resolved.id, status = %resolved.status),
        err
    )]
    async fn resolve_donation_request(
        &self,
        resolved: &DonationRequest,
        notification: Option<&Notification>,
    ) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        // Writing first takes the write lock, so the status read below cannot
        // be stale.
        let result = sqlx::query(
            r#"
            UPDATE donation_requests
            SET status = ?2,
                is_read = ?3
            WHERE donation_request_id = ?1
              AND status = 'pending'
            "#,
        )
        .bind(resolved.id.to_string())
        .bind(resolved.status.as_str())
        .bind(resolved.is_read)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("resolve_donation_request", e))?;

        if result.rows_affected() == 0 {
            let current: Option<String> = sqlx::query_scalar(
                "SELECT status FROM donation_requests WHERE donation_request_id = ?1",
            )
            .bind(resolved.id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("resolve_donation_request", e))?;

            return Err(match current {
                None => StoreError::NotFound(format!("donation request {}", resolved.id)),
                Some(status) => DomainError::conflict(format!(
                    "donation request is already {}",
                    decode::<DonationStatus>("status", &status)?
                ))
                .into(),
            });
        }

        if let Some(notification) = notification {
            insert_notification_row(&mut *tx, notification).await?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(donor_id = %donor), err)]
    async fn list_donation_requests(
        &self,
        donor: &DonorId,
        status: Option<DonationStatus>,
    ) -> Result<Vec<DonationRequest>, StoreError> {
        let rows = sqlx::query(&format!(
            "{DONATION_REQUEST_COLUMNS} \
             WHERE donor_id = ?1 AND (?2 IS NULL OR status = ?2) \
             ORDER BY created_at DESC, donation_request_id DESC"
        ))
        .bind(donor.as_str())
        .bind(status.map(DonationStatus::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_donation_requests", e))?;

        rows.iter()
            .map(|r| DonationRequest::try_from(decode_row::<DonationRequestRow>(r)?))
            .collect()
    }

    #[instrument(
        skip(self, notification),
        fields(notification_id = %notification.id, request_id = %notification.request_id),
        err
    )]
    async fn insert_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire_connection", e))?;
        insert_notification_row(&mut *conn, notification).await
    }

    #[instrument(skip(self), fields(request_id = %request), err)]
    async fn list_notifications(
        &self,
        request: RequestId,
    ) -> Result<Vec<Notification>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT notification_id, request_id, donor_id, message, is_read, created_at
            FROM notifications
            WHERE request_id = ?1
            ORDER BY created_at DESC, notification_id DESC
            "#,
        )
        .bind(request.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_notifications", e))?;

        rows.iter()
            .map(|r| Notification::try_from(decode_row::<NotificationRow>(r)?))
            .collect()
    }

    #[instrument(skip(self), fields(notification_id = %id), err)]
    async fn mark_notification_read(&self, id: NotificationId) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE notifications SET is_read = 1 WHERE notification_id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_notification_read", e))?;
        Ok(result.rows_affected() > 0)
    }
}

/// Rejected adjustments are re-judged this many times before giving up.
const ADJUST_ATTEMPTS: usize = 8;

const DONOR_COLUMNS: &str = "SELECT donor_id, name, age, blood_type, phone, address, email, \
                             last_donation, registered_at FROM donors";

const REQUEST_COLUMNS: &str = "SELECT request_id, name, phone, blood_type, reason, message, \
                               location, date_needed, requested_at FROM blood_requests";

const DONATION_REQUEST_COLUMNS: &str = "SELECT donation_request_id, donor_id, request_id, \
                                        message, status, is_read, created_at \
                                        FROM donation_requests";

async fn insert_notification_row(
    conn: &mut SqliteConnection,
    notification: &Notification,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO notifications (
            notification_id,
            request_id,
            donor_id,
            message,
            is_read,
            created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(notification.id.to_string())
    .bind(notification.request_id.to_string())
    .bind(notification.donor_id.as_str())
    .bind(&notification.message)
    .bind(notification.is_read)
    .bind(encode_time(notification.created_at))
    .execute(conn)
    .await
    .map_err(|e| map_sqlx_error("insert_notification", e))?;
    Ok(())
}

/// Map a SQLx error into the store's error taxonomy.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("{operation}: {}", db_err.message());
            match db_err.kind() {
                ErrorKind::UniqueViolation => StoreError::Duplicate(msg),
                ErrorKind::ForeignKeyViolation => StoreError::NotFound(msg),
                ErrorKind::CheckViolation => StoreError::Domain(DomainError::invariant(msg)),
                _ => StoreError::Database(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Database(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Database(format!("{operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.kind() == ErrorKind::UniqueViolation,
        _ => false,
    }
}

// Timestamps are stored as fixed-width RFC 3339 (microseconds, `Z`) so that
// text ordering matches time ordering.
fn encode_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn encode_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn decode_row<'r, T: FromRow<'r, SqliteRow>>(row: &'r SqliteRow) -> Result<T, StoreError> {
    T::from_row(row).map_err(|e| StoreError::Database(format!("failed to decode row: {e}")))
}

fn corrupt(column: &str, err: impl core::fmt::Display) -> StoreError {
    StoreError::Database(format!("invalid stored value in {column}: {err}"))
}

fn decode_time(column: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(column, e))
}

fn decode_date(column: &str, raw: Option<&str>) -> Result<Option<NaiveDate>, StoreError> {
    raw.map(|r| NaiveDate::parse_from_str(r, "%Y-%m-%d").map_err(|e| corrupt(column, e)))
        .transpose()
}

fn decode<T>(column: &str, raw: &str) -> Result<T, StoreError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    raw.parse().map_err(|e| corrupt(column, e))
}

// SQLx row types

#[derive(Debug)]
struct DonorRow {
    donor_id: String,
    name: String,
    age: i64,
    blood_type: String,
    phone: String,
    address: String,
    email: Option<String>,
    last_donation: Option<String>,
    registered_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for DonorRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(DonorRow {
            donor_id: row.try_get("donor_id")?,
            name: row.try_get("name")?,
            age: row.try_get("age")?,
            blood_type: row.try_get("blood_type")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            email: row.try_get("email")?,
            last_donation: row.try_get("last_donation")?,
            registered_at: row.try_get("registered_at")?,
        })
    }
}

impl TryFrom<DonorRow> for Donor {
    type Error = StoreError;

    fn try_from(row: DonorRow) -> Result<Self, Self::Error> {
        Ok(Donor::restore(
            decode("donor_id", &row.donor_id)?,
            row.name,
            u8::try_from(row.age).map_err(|e| corrupt("age", e))?,
            decode("blood_type", &row.blood_type)?,
            ContactInfo {
                phone: row.phone,
                address: row.address,
                email: row.email,
            },
            decode_date("last_donation", row.last_donation.as_deref())?,
            decode_time("registered_at", &row.registered_at)?,
        ))
    }
}

#[derive(Debug)]
struct UnitRow {
    blood_type: String,
    quantity: i64,
    updated_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for UnitRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(UnitRow {
            blood_type: row.try_get("blood_type")?,
            quantity: row.try_get("quantity")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<UnitRow> for InventoryUnit {
    type Error = StoreError;

    fn try_from(row: UnitRow) -> Result<Self, Self::Error> {
        Ok(InventoryUnit::restore(
            decode("blood_type", &row.blood_type)?,
            row.quantity,
            decode_time("updated_at", &row.updated_at)?,
        )?)
    }
}

#[derive(Debug)]
struct RequestRow {
    request_id: String,
    name: String,
    phone: String,
    blood_type: String,
    reason: String,
    message: String,
    location: Option<String>,
    date_needed: Option<String>,
    requested_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for RequestRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(RequestRow {
            request_id: row.try_get("request_id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            blood_type: row.try_get("blood_type")?,
            reason: row.try_get("reason")?,
            message: row.try_get("message")?,
            location: row.try_get("location")?,
            date_needed: row.try_get("date_needed")?,
            requested_at: row.try_get("requested_at")?,
        })
    }
}

impl TryFrom<RequestRow> for BloodRequest {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        Ok(BloodRequest {
            id: decode::<RequestId>("request_id", &row.request_id)?,
            name: row.name,
            phone: row.phone,
            blood_type: decode("blood_type", &row.blood_type)?,
            reason: row.reason,
            message: row.message,
            location: row.location,
            date_needed: decode_date("date_needed", row.date_needed.as_deref())?,
            requested_at: decode_time("requested_at", &row.requested_at)?,
        })
    }
}

#[derive(Debug)]
struct DonationRequestRow {
    donation_request_id: String,
    donor_id: String,
    request_id: String,
    message: String,
    status: String,
    is_read: bool,
    created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for DonationRequestRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(DonationRequestRow {
            donation_request_id: row.try_get("donation_request_id")?,
            donor_id: row.try_get("donor_id")?,
            request_id: row.try_get("request_id")?,
            message: row.try_get("message")?,
            status: row.try_get("status")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<DonationRequestRow> for DonationRequest {
    type Error = StoreError;

    fn try_from(row: DonationRequestRow) -> Result<Self, Self::Error> {
        Ok(DonationRequest {
            id: decode::<DonationRequestId>("donation_request_id", &row.donation_request_id)?,
            donor_id: decode("donor_id", &row.donor_id)?,
            request_id: decode("request_id", &row.request_id)?,
            message: row.message,
            status: decode("status", &row.status)?,
            is_read: row.is_read,
            created_at: decode_time("created_at", &row.created_at)?,
        })
    }
}

#[derive(Debug)]
struct NotificationRow {
    notification_id: String,
    request_id: String,
    donor_id: String,
    message: String,
    is_read: bool,
    created_at: String,
}

impl<'r> FromRow<'r, SqliteRow> for NotificationRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(NotificationRow {
            notification_id: row.try_get("notification_id")?,
            request_id: row.try_get("request_id")?,
            donor_id: row.try_get("donor_id")?,
            message: row.try_get("message")?,
            is_read: row.try_get("is_read")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<NotificationRow> for Notification {
    type Error = StoreError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        Ok(Notification {
            id: decode::<NotificationId>("notification_id", &row.notification_id)?,
            request_id: decode("request_id", &row.request_id)?,
            donor_id: decode("donor_id", &row.donor_id)?,
            message: row.message,
            is_read: row.is_read,
            created_at: decode_time("created_at", &row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::now;

    async fn store() -> SqliteStore {
        SqliteStore::connect(&DatabaseConfig::in_memory())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn migrate_is_idempotent() {
        let store = store().await;
        db::migrate(store.pool()).await.unwrap();
        store.seed_inventory(now()).await.unwrap();
        store.seed_inventory(now()).await.unwrap();
        assert_eq!(store.list_units().await.unwrap().len(), BloodType::ALL.len());
    }

    #[tokio::test]
    async fn check_constraint_backs_the_stock_guard() {
        let store = store().await;
        store.seed_inventory(now()).await.unwrap();

        let err = sqlx::query("UPDATE inventory SET quantity = -1 WHERE blood_type = 'O+'")
            .execute(store.pool())
            .await
            .map_err(|e| map_sqlx_error("raw_update", e))
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
    }

    #[tokio::test]
    async fn adjusting_an_unseeded_unit_is_not_found() {
        let store = store().await;
        let err = store
            .adjust_stock(&AdjustStock {
                blood_type: BloodType::AbNeg,
                delta: 1,
                occurred_at: now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_blood_type_is_reported_not_panicked() {
        let store = store().await;
        sqlx::query("PRAGMA ignore_check_constraints = ON")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO inventory (blood_type, quantity, updated_at) VALUES ('C+', 1, 'x')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        assert!(matches!(
            store.list_units().await,
            Err(StoreError::Database(msg)) if msg.contains("blood_type")
        ));
    }

    #[tokio::test]
    async fn file_database_persists_across_connections() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("bank.db").display());
        let config = DatabaseConfig::new(url, 2);

        {
            let store = SqliteStore::connect(&config).await.unwrap();
            store.seed_inventory(now()).await.unwrap();
            store
                .adjust_stock(&AdjustStock {
                    blood_type: BloodType::BNeg,
                    delta: 4,
                    occurred_at: now(),
                })
                .await
                .unwrap();
            store.pool().close().await;
        }

        let reopened = SqliteStore::connect(&config).await.unwrap();
        let unit = reopened.get_unit(BloodType::BNeg).await.unwrap().unwrap();
        assert_eq!(unit.quantity(), 4);
    }
}
