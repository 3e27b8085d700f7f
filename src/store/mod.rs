//! Coupon record store: the contract the core depends on and its SQLite adapter.

mod feed;

pub use feed::{ChangeFeed, Listener, Subscription};

use std::sync::Arc;

use crate::db::{DbPool, queries};
use crate::error::StoreError;
use crate::models::{Coupon, CouponUpdate, NewCoupon, UsageMark};

/// Upper bound on writes grouped into one batch.
pub const STORE_BATCH_LIMIT: usize = 500;

pub trait CouponStore: Send + Sync {
    fn fetch_all(&self) -> Result<Vec<Coupon>, StoreError>;

    fn fetch_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;

    fn fetch_by_id(&self, id: &str) -> Result<Option<Coupon>, StoreError>;

    /// Store a coupon and return its new id.
    fn create(&self, coupon: &NewCoupon) -> Result<String, StoreError>;

    /// Store coupons as given, in batches of [`STORE_BATCH_LIMIT`]; returns how
    /// many were written. Usage fields are not reset here.
    fn create_many(&self, coupons: &[NewCoupon]) -> Result<usize, StoreError>;

    /// Partial update; fails with [`StoreError::NotFound`] for an unknown id.
    fn update(&self, id: &str, update: &CouponUpdate) -> Result<(), StoreError>;

    /// Conditional redemption: writes `mark` only if the coupon is still unused.
    /// Returns whether this call performed the transition.
    fn mark_used(&self, id: &str, mark: &UsageMark) -> Result<bool, StoreError>;

    fn delete(&self, id: &str) -> Result<(), StoreError>;

    fn delete_all(&self) -> Result<usize, StoreError>;

    /// Push the full collection to `listener` now and after every change.
    fn subscribe(&self, listener: Listener) -> Subscription;
}

#[derive(Clone)]
pub struct SqliteCouponStore {
    pool: DbPool,
    feed: Arc<ChangeFeed>,
    batch_size: usize,
}

impl SqliteCouponStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            feed: ChangeFeed::new(),
            batch_size: STORE_BATCH_LIMIT,
        }
    }

    /// Override the batch size (capped at [`STORE_BATCH_LIMIT`]).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, STORE_BATCH_LIMIT);
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.feed.listener_count()
    }

    fn notify(&self) {
        if !self.feed.has_listeners() {
            return;
        }
        match self.fetch_all() {
            Ok(snapshot) => self.feed.publish(&snapshot),
            Err(e) => {
                tracing::error!("Failed to refresh coupon feed: {}", e);
                self.feed.publish(&[]);
            }
        }
    }
}

impl CouponStore for SqliteCouponStore {
    fn fetch_all(&self) -> Result<Vec<Coupon>, StoreError> {
        let conn = self.pool.get()?;
        queries::list_coupons(&conn)
    }

    fn fetch_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let conn = self.pool.get()?;
        queries::get_coupon_by_code(&conn, code)
    }

    fn fetch_by_id(&self, id: &str) -> Result<Option<Coupon>, StoreError> {
        let conn = self.pool.get()?;
        queries::get_coupon_by_id(&conn, id)
    }

    fn create(&self, coupon: &NewCoupon) -> Result<String, StoreError> {
        let created = {
            let conn = self.pool.get()?;
            queries::create_coupon(&conn, coupon)?
        };
        self.notify();
        Ok(created.id)
    }

    fn create_many(&self, coupons: &[NewCoupon]) -> Result<usize, StoreError> {
        if coupons.is_empty() {
            return Ok(0);
        }
        let result = {
            let mut conn = self.pool.get()?;
            queries::create_coupons_batched(&mut conn, coupons, self.batch_size)
        };
        // Earlier batches may have committed even when a later one failed.
        self.notify();
        result
    }

    fn update(&self, id: &str, update: &CouponUpdate) -> Result<(), StoreError> {
        let updated = {
            let conn = self.pool.get()?;
            queries::update_coupon(&conn, id, update)?
        };
        if !updated {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.notify();
        Ok(())
    }

    fn mark_used(&self, id: &str, mark: &UsageMark) -> Result<bool, StoreError> {
        let marked = {
            let conn = self.pool.get()?;
            queries::mark_coupon_used(&conn, id, mark)?
        };
        if marked {
            self.notify();
        }
        Ok(marked)
    }

    fn delete(&self, id: &str) -> Result<(), StoreError> {
        let deleted = {
            let conn = self.pool.get()?;
            queries::delete_coupon(&conn, id)?
        };
        if !deleted {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.notify();
        Ok(())
    }

    fn delete_all(&self) -> Result<usize, StoreError> {
        let result = {
            let mut conn = self.pool.get()?;
            queries::delete_all_coupons_batched(&mut conn, self.batch_size)
        };
        self.notify();
        result
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let snapshot = match self.fetch_all() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Failed to set up coupon subscription: {}", e);
                return Subscription::noop();
            }
        };
        listener(snapshot.as_slice());
        self.feed.register(listener)
    }
}
