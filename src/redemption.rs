//! Coupon redemption.
//!
//! [`evaluate`] is the pure decision over a fetched record. [`redeem`] wraps it
//! with the store lookup and the conditional write, and turns every failure into
//! a [`RedemptionOutcome`]. Checks run in a fixed order: existence, used state,
//! window presence, not-yet-valid, expired, then the write.

use serde::Serialize;

use crate::dates::{self, CalendarDate};
use crate::error::CouponError;
use crate::messages::{self, Locale};
use crate::models::{Coupon, UsageMark};
use crate::store::CouponStore;
use crate::util::normalize_code;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RedemptionOutcome {
    Redeemed,
    NotFound,
    AlreadyUsed {
        used_by: String,
        /// Display-formatted date, `None` when the record has none.
        used_date: Option<String>,
    },
    NotYetValid {
        valid_from: String,
    },
    Expired {
        valid_to: String,
    },
    NoValidityWindow,
    Error {
        message: String,
    },
}

impl RedemptionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RedemptionOutcome::Redeemed)
    }

    pub fn message(&self, locale: Locale) -> String {
        match self {
            RedemptionOutcome::Redeemed => messages::redeemed(locale).to_string(),
            RedemptionOutcome::NotFound => messages::not_found(locale).to_string(),
            RedemptionOutcome::AlreadyUsed { used_by, used_date } => {
                let used_by = if used_by.trim().is_empty() {
                    locale.unknown()
                } else {
                    used_by.as_str()
                };
                let used_date = used_date.as_deref().unwrap_or(locale.unknown());
                messages::already_used(locale, used_by, used_date)
            }
            RedemptionOutcome::NotYetValid { valid_from } => messages::not_yet_valid(locale, valid_from),
            RedemptionOutcome::Expired { valid_to } => messages::expired(locale, valid_to),
            RedemptionOutcome::NoValidityWindow => messages::no_validity_window(locale).to_string(),
            RedemptionOutcome::Error { message } => message.clone(),
        }
    }

    fn already_used(coupon: &Coupon) -> Self {
        RedemptionOutcome::AlreadyUsed {
            used_by: coupon.used_by.clone(),
            used_date: dates::format_for_display_or_fallback(&coupon.used_date),
        }
    }
}

/// What [`evaluate`] decided for a looked-up record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Reject(RedemptionOutcome),
    Redeem { id: String },
}

/// Per-request inputs to [`redeem`].
#[derive(Debug, Clone)]
pub struct RedeemContext {
    pub today: CalendarDate,
    /// Who is redeeming; recorded as `used_by`.
    pub actor: Option<String>,
    pub locale: Locale,
}

impl RedeemContext {
    pub fn new(today: CalendarDate, locale: Locale) -> Self {
        Self {
            today,
            actor: None,
            locale,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    fn usage_mark(&self) -> UsageMark {
        let used_by = self
            .actor
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(self.locale.unknown());
        UsageMark {
            used_by: used_by.to_string(),
            used_date: dates::format_long(self.today),
            note: String::new(),
        }
    }
}

/// Parsed, inclusive validity window of a coupon.
pub fn validity_window(coupon: &Coupon) -> Result<(CalendarDate, CalendarDate), CouponError> {
    if !coupon.has_validity_window() {
        return Err(CouponError::MissingValidityWindow);
    }
    let from = dates::parse_flexible_date(coupon.valid_from.as_str())?;
    let to = dates::parse_flexible_date(coupon.valid_to.as_str())?;
    Ok((from, to))
}

/// Decide whether `coupon` can be redeemed on `today`. Performs no I/O.
pub fn evaluate(coupon: Option<&Coupon>, today: CalendarDate) -> Result<Decision, CouponError> {
    let Some(coupon) = coupon else {
        return Ok(Decision::Reject(RedemptionOutcome::NotFound));
    };

    if coupon.used {
        return Ok(Decision::Reject(RedemptionOutcome::already_used(coupon)));
    }

    let (from, to) = match validity_window(coupon) {
        Ok(window) => window,
        Err(CouponError::MissingValidityWindow) => {
            return Ok(Decision::Reject(RedemptionOutcome::NoValidityWindow));
        }
        Err(e) => return Err(e),
    };

    if today < from {
        return Ok(Decision::Reject(RedemptionOutcome::NotYetValid {
            valid_from: dates::format_canonical(from),
        }));
    }

    if today > to {
        return Ok(Decision::Reject(RedemptionOutcome::Expired {
            valid_to: dates::format_canonical(to),
        }));
    }

    if coupon.id.trim().is_empty() {
        return Err(CouponError::RecordIdMissing);
    }

    Ok(Decision::Redeem {
        id: coupon.id.clone(),
    })
}

/// Redeem `raw_code`. Never fails: errors become [`RedemptionOutcome::Error`].
pub fn redeem<S>(store: &S, raw_code: &str, ctx: &RedeemContext) -> RedemptionOutcome
where
    S: CouponStore + ?Sized,
{
    match try_redeem(store, raw_code, ctx) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::warn!("Redemption of {:?} failed: {}", raw_code.trim(), err);
            RedemptionOutcome::Error {
                message: messages::coupon_error(ctx.locale, &err),
            }
        }
    }
}

fn try_redeem<S>(store: &S, raw_code: &str, ctx: &RedeemContext) -> Result<RedemptionOutcome, CouponError>
where
    S: CouponStore + ?Sized,
{
    let code = normalize_code(raw_code);
    if code.is_empty() {
        return Err(CouponError::EmptyCode);
    }

    let coupon = store.fetch_by_code(&code)?;

    let id = match evaluate(coupon.as_ref(), ctx.today)? {
        Decision::Reject(outcome) => return Ok(outcome),
        Decision::Redeem { id } => id,
    };

    if store.mark_used(&id, &ctx.usage_mark())? {
        tracing::info!("Coupon {} redeemed", code);
        return Ok(RedemptionOutcome::Redeemed);
    }

    // The record changed between the read and the write; judge it again.
    tracing::warn!("Coupon {} changed before it could be marked used", code);
    let current = store.fetch_by_id(&id)?;
    match evaluate(current.as_ref(), ctx.today)? {
        Decision::Reject(outcome) => Ok(outcome),
        Decision::Redeem { id } => Err(CouponError::WriteNotApplied(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::error::StoreError;

    use chrono::NaiveDate;

    use crate::models::{CouponUpdate, NewCoupon};
    use crate::store::{Listener, Subscription};

    fn day(d: u32, m: u32, y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn coupon(code: &str, from: &str, to: &str) -> Coupon {
        Coupon {
            id: format!("id-{}", code),
            code: code.to_string(),
            kind: String::new(),
            used: false,
            used_by: String::new(),
            used_date: String::new(),
            note: String::new(),
            valid_from: from.to_string(),
            valid_to: to.to_string(),
            created_at: 0,
            updated_at: 0,
        }
    }

    /// Store double that records writes.
    #[derive(Default)]
    struct RecordingStore {
        coupons: Mutex<Vec<Coupon>>,
        marks: Mutex<Vec<(String, UsageMark)>>,
        fail_reads: bool,
        /// `mark_used` reports no change without touching the record.
        drop_writes: bool,
        /// Applied to the record when `mark_used` runs, before the condition is checked.
        before_write: Option<fn(&mut Coupon)>,
    }

    impl RecordingStore {
        fn with(coupons: Vec<Coupon>) -> Self {
            Self {
                coupons: Mutex::new(coupons),
                ..Default::default()
            }
        }

        fn write_count(&self) -> usize {
            self.marks.lock().unwrap().len()
        }
    }

    impl CouponStore for RecordingStore {
        fn fetch_all(&self) -> Result<Vec<Coupon>, StoreError> {
            Ok(self.coupons.lock().unwrap().clone())
        }

        fn fetch_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::NotFound("offline".into()));
            }
            Ok(self.coupons.lock().unwrap().iter().find(|c| c.code == code).cloned())
        }

        fn fetch_by_id(&self, id: &str) -> Result<Option<Coupon>, StoreError> {
            Ok(self.coupons.lock().unwrap().iter().find(|c| c.id == id).cloned())
        }

        fn create(&self, _coupon: &NewCoupon) -> Result<String, StoreError> {
            unimplemented!()
        }

        fn create_many(&self, _coupons: &[NewCoupon]) -> Result<usize, StoreError> {
            unimplemented!()
        }

        fn update(&self, _id: &str, _update: &CouponUpdate) -> Result<(), StoreError> {
            unimplemented!()
        }

        fn mark_used(&self, id: &str, mark: &UsageMark) -> Result<bool, StoreError> {
            let mut coupons = self.coupons.lock().unwrap();
            if let Some(change) = self.before_write {
                coupons.iter_mut().filter(|c| c.id == id).for_each(change);
            }
            if self.drop_writes {
                return Ok(false);
            }
            let Some(c) = coupons.iter_mut().find(|c| c.id == id && !c.used) else {
                return Ok(false);
            };
            c.used = true;
            c.used_by = mark.used_by.clone();
            c.used_date = mark.used_date.clone();
            c.note = mark.note.clone();
            self.marks.lock().unwrap().push((id.to_string(), mark.clone()));
            Ok(true)
        }

        fn delete(&self, _id: &str) -> Result<(), StoreError> {
            unimplemented!()
        }

        fn delete_all(&self) -> Result<usize, StoreError> {
            unimplemented!()
        }

        fn subscribe(&self, _listener: Listener) -> Subscription {
            Subscription::noop()
        }
    }

    #[test]
    fn missing_record_is_not_found() {
        assert_eq!(
            evaluate(None, day(1, 1, 2024)).unwrap(),
            Decision::Reject(RedemptionOutcome::NotFound)
        );
    }

    #[test]
    fn used_wins_over_window_checks() {
        let mut c = coupon("A", "", "");
        c.used = true;
        c.used_by = "Alice".into();
        c.used_date = "15 June 2024".into();

        assert_eq!(
            evaluate(Some(&c), day(1, 1, 2030)).unwrap(),
            Decision::Reject(RedemptionOutcome::AlreadyUsed {
                used_by: "Alice".into(),
                used_date: Some("15/06/2024".into()),
            })
        );
    }

    #[test]
    fn blank_window_is_reported_before_parsing() {
        let c = coupon("A", "01/01/2024", "  ");
        assert_eq!(
            evaluate(Some(&c), day(1, 6, 2024)).unwrap(),
            Decision::Reject(RedemptionOutcome::NoValidityWindow)
        );
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let c = coupon("A", "01/01/2024", "31/12/2024");
        for today in [day(1, 1, 2024), day(15, 6, 2024), day(31, 12, 2024)] {
            assert_eq!(
                evaluate(Some(&c), today).unwrap(),
                Decision::Redeem { id: "id-A".into() }
            );
        }
        assert_eq!(
            evaluate(Some(&c), day(31, 12, 2023)).unwrap(),
            Decision::Reject(RedemptionOutcome::NotYetValid {
                valid_from: "01/01/2024".into()
            })
        );
        assert_eq!(
            evaluate(Some(&c), day(1, 1, 2025)).unwrap(),
            Decision::Reject(RedemptionOutcome::Expired {
                valid_to: "31/12/2024".into()
            })
        );
    }

    #[test]
    fn unparseable_window_is_an_error() {
        let c = coupon("A", "31/02/2024", "31/12/2024");
        assert!(matches!(
            evaluate(Some(&c), day(1, 6, 2024)),
            Err(CouponError::InvalidDate(_))
        ));
    }

    #[test]
    fn missing_id_is_fatal() {
        let mut c = coupon("A", "01/01/2024", "31/12/2024");
        c.id = String::new();
        assert!(matches!(
            evaluate(Some(&c), day(1, 6, 2024)),
            Err(CouponError::RecordIdMissing)
        ));
    }

    #[test]
    fn redeem_writes_once() {
        let store = RecordingStore::with(vec![coupon("SAVE10", "01/01/2024", "31/12/2024")]);
        let ctx = RedeemContext::new(day(15, 6, 2024), Locale::En);

        assert_eq!(redeem(&store, " save10 ", &ctx), RedemptionOutcome::Redeemed);
        assert_eq!(store.write_count(), 1);

        let marks = store.marks.lock().unwrap();
        assert_eq!(marks[0].1.used_by, "unknown");
        assert_eq!(marks[0].1.used_date, "June 15, 2024");
        assert_eq!(marks[0].1.note, "");
    }

    #[test]
    fn second_redeem_reports_already_used() {
        let store = RecordingStore::with(vec![coupon("SAVE10", "01/01/2024", "31/12/2024")]);
        let ctx = RedeemContext::new(day(15, 6, 2024), Locale::En).with_actor(Some("Bob".into()));

        assert!(redeem(&store, "SAVE10", &ctx).is_success());
        assert_eq!(
            redeem(&store, "SAVE10", &ctx),
            RedemptionOutcome::AlreadyUsed {
                used_by: "Bob".into(),
                used_date: Some("15/06/2024".into()),
            }
        );
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn not_found_and_expired_do_not_write() {
        let store = RecordingStore::with(vec![coupon("OLD", "01/01/2024", "31/12/2024")]);
        let ctx = RedeemContext::new(day(1, 1, 2025), Locale::En);

        assert_eq!(redeem(&store, "NOPE", &ctx), RedemptionOutcome::NotFound);
        assert_eq!(
            redeem(&store, "OLD", &ctx),
            RedemptionOutcome::Expired {
                valid_to: "31/12/2024".into()
            }
        );
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn errors_become_outcomes() {
        let store = RecordingStore::with(vec![coupon("BAD", "31/02/2024", "31/12/2024")]);
        let ctx = RedeemContext::new(day(1, 6, 2024), Locale::En);

        assert_eq!(
            redeem(&store, "   ", &ctx),
            RedemptionOutcome::Error {
                message: "Please enter a coupon code.".into()
            }
        );
        assert_eq!(
            redeem(&store, "bad", &ctx),
            RedemptionOutcome::Error {
                message: "Invalid date: 31/02/2024".into()
            }
        );

        let offline = RecordingStore {
            fail_reads: true,
            ..Default::default()
        };
        let outcome = redeem(&offline, "ANY", &ctx);
        assert_eq!(outcome.message(Locale::En), messages::unexpected(Locale::En));
    }

    #[test]
    fn already_used_message_fills_blanks() {
        let outcome = RedemptionOutcome::AlreadyUsed {
            used_by: String::new(),
            used_date: None,
        };
        assert_eq!(
            outcome.message(Locale::En),
            "This coupon was already used by: unknown on: unknown"
        );
    }

    #[test]
    fn lost_race_reports_the_winner() {
        let store = RecordingStore {
            coupons: Mutex::new(vec![coupon("RACE", "01/01/2024", "31/12/2024")]),
            before_write: Some(|c: &mut Coupon| {
                c.used = true;
                c.used_by = "Winner".into();
                c.used_date = "June 14, 2024".into();
            }),
            ..Default::default()
        };
        let ctx = RedeemContext::new(day(15, 6, 2024), Locale::En);

        assert_eq!(
            redeem(&store, "RACE", &ctx),
            RedemptionOutcome::AlreadyUsed {
                used_by: "Winner".into(),
                used_date: Some("14/06/2024".into()),
            }
        );
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn record_deleted_before_write_is_not_found() {
        let store = RecordingStore {
            coupons: Mutex::new(vec![coupon("GONE", "01/01/2024", "31/12/2024")]),
            before_write: Some(|c: &mut Coupon| c.id = "moved".into()),
            ..Default::default()
        };
        let ctx = RedeemContext::new(day(15, 6, 2024), Locale::En);
        assert_eq!(redeem(&store, "GONE", &ctx), RedemptionOutcome::NotFound);
    }

    #[test]
    fn unapplied_write_on_unused_record_is_an_error() {
        let store = RecordingStore {
            coupons: Mutex::new(vec![coupon("STUCK", "01/01/2024", "31/12/2024")]),
            drop_writes: true,
            ..Default::default()
        };
        let ctx = RedeemContext::new(day(15, 6, 2024), Locale::En);

        assert!(matches!(
            try_redeem(&store, "STUCK", &ctx),
            Err(CouponError::WriteNotApplied(id)) if id == "id-STUCK"
        ));
        assert_eq!(
            redeem(&store, "STUCK", &ctx).message(Locale::En),
            messages::unexpected(Locale::En)
        );
    }
}
