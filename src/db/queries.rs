use chrono::Utc;
use rusqlite::{Connection, params, types::Value};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Coupon, CouponUpdate, NewCoupon, UsageMark};

use super::from_row::{COUPON_COLS, query_all, query_one};

type Result<T> = std::result::Result<T, StoreError>;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query; `updated_at` is always
/// stamped, so even an update with no fields touches the row.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
        }
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Returns false when no row has this id.
    fn execute(mut self, conn: &Connection) -> Result<bool> {
        self.fields.push(("updated_at", now().into()));
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Coupons ============

fn insert_coupon(conn: &Connection, input: &NewCoupon, now: i64) -> Result<Coupon> {
    let coupon = Coupon {
        id: gen_id(),
        code: input.code.trim().to_uppercase(),
        kind: input.kind.clone().unwrap_or_default(),
        used: input.used,
        used_by: input.used_by.clone(),
        used_date: input.used_date.clone(),
        note: input.note.clone(),
        valid_from: input.valid_from.clone(),
        valid_to: input.valid_to.clone(),
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO coupons (id, code, type, used, used_by, used_date, note, valid_from, valid_to, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            &coupon.id,
            &coupon.code,
            &coupon.kind,
            coupon.used as i64,
            &coupon.used_by,
            &coupon.used_date,
            &coupon.note,
            &coupon.valid_from,
            &coupon.valid_to,
            coupon.created_at,
            coupon.updated_at,
        ],
    )?;

    Ok(coupon)
}

/// Create a coupon. The code is stored upper-cased.
pub fn create_coupon(conn: &Connection, input: &NewCoupon) -> Result<Coupon> {
    insert_coupon(conn, input, now())
}

/// Insert coupons as given, in sequential batches, one transaction per batch.
///
/// A failing batch leaves earlier batches committed.
pub fn create_coupons_batched(
    conn: &mut Connection,
    inputs: &[NewCoupon],
    batch_size: usize,
) -> Result<usize> {
    let mut inserted = 0;
    for chunk in inputs.chunks(batch_size.max(1)) {
        let tx = conn.transaction()?;
        let now = now();
        for input in chunk {
            insert_coupon(&tx, input, now)?;
        }
        tx.commit()?;
        inserted += chunk.len();
    }
    Ok(inserted)
}

pub fn get_coupon_by_id(conn: &Connection, id: &str) -> Result<Option<Coupon>> {
    query_one(
        conn,
        &format!("SELECT {} FROM coupons WHERE id = ?1", COUPON_COLS),
        params![id],
    )
}

/// First coupon carrying `code` (compared upper-cased).
pub fn get_coupon_by_code(conn: &Connection, code: &str) -> Result<Option<Coupon>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM coupons WHERE code = ?1 ORDER BY created_at, rowid LIMIT 1",
            COUPON_COLS
        ),
        params![code.to_uppercase()],
    )
}

pub fn list_coupons(conn: &Connection) -> Result<Vec<Coupon>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM coupons ORDER BY created_at DESC, rowid DESC",
            COUPON_COLS
        ),
        [],
    )
}

/// Apply a partial update. Returns false when no coupon has this id.
pub fn update_coupon(conn: &Connection, id: &str, input: &CouponUpdate) -> Result<bool> {
    UpdateBuilder::new("coupons", id)
        .set_opt("code", input.code.as_ref().map(|c| c.trim().to_uppercase()))
        .set_opt("type", input.kind.clone())
        .set_opt("used", input.used.map(|u| u as i64))
        .set_opt("used_by", input.used_by.clone())
        .set_opt("used_date", input.used_date.clone())
        .set_opt("note", input.note.clone())
        .set_opt("valid_from", input.valid_from.clone())
        .set_opt("valid_to", input.valid_to.clone())
        .execute(conn)
}

/// Mark a coupon used only if it is still unused.
/// Returns false when the coupon is missing or was already redeemed.
pub fn mark_coupon_used(conn: &Connection, id: &str, mark: &UsageMark) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE coupons SET used = 1, used_by = ?1, used_date = ?2, note = ?3, updated_at = ?4
         WHERE id = ?5 AND used = 0",
        params![&mark.used_by, &mark.used_date, &mark.note, now(), id],
    )?;
    Ok(affected > 0)
}

pub fn delete_coupon(conn: &Connection, id: &str) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM coupons WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Delete every coupon in sequential batches, one transaction per batch.
pub fn delete_all_coupons_batched(conn: &mut Connection, batch_size: usize) -> Result<usize> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM coupons")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut deleted = 0;
    for chunk in ids.chunks(batch_size.max(1)) {
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare("DELETE FROM coupons WHERE id = ?1")?;
            for id in chunk {
                deleted += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;
    }
    Ok(deleted)
}
