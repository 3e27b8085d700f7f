//! Dashboard counters and the admin list view (search + sort).

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::dates;
use crate::models::{Coupon, CouponStats, SortDirection, SortField};

/// Count coupons by state. An unused coupon is expired once `today` is past its
/// `valid_to`; one whose end date cannot be read counts as active.
pub fn compute_stats(coupons: &[Coupon], today: NaiveDate) -> CouponStats {
    let mut stats = CouponStats {
        total: coupons.len(),
        ..Default::default()
    };

    for coupon in coupons {
        if coupon.used {
            stats.used += 1;
            continue;
        }
        stats.unused += 1;
        match dates::parse_flexible_date(coupon.valid_to.trim()) {
            Ok(valid_to) if today > valid_to => stats.expired += 1,
            _ => stats.active += 1,
        }
    }
    stats
}

/// Case-insensitive substring match on the code.
pub fn filter_by_code<'a>(coupons: &'a [Coupon], search: &str) -> Vec<&'a Coupon> {
    let needle = search.trim().to_uppercase();
    coupons
        .iter()
        .filter(|c| needle.is_empty() || c.code.to_uppercase().contains(&needle))
        .collect()
}

fn sort_key(coupon: &Coupon, field: SortField) -> String {
    match field {
        SortField::Code => coupon.code.to_uppercase(),
        SortField::Kind => coupon.kind.to_uppercase(),
        SortField::Used => String::new(),
        SortField::UsedBy => coupon.used_by.to_uppercase(),
        SortField::UsedDate => coupon.used_date.to_uppercase(),
        SortField::ValidFrom => coupon.valid_from.to_uppercase(),
        SortField::ValidTo => coupon.valid_to.to_uppercase(),
        SortField::CreatedAt => String::new(),
    }
}

fn compare(a: &Coupon, b: &Coupon, field: SortField) -> Ordering {
    match field {
        SortField::Used => a.used.cmp(&b.used),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        _ => sort_key(a, field).cmp(&sort_key(b, field)),
    }
}

/// Stable sort; equal keys keep their incoming order in both directions.
pub fn sort_coupons(coupons: &mut [&Coupon], field: SortField, direction: SortDirection) {
    coupons.sort_by(|a, b| {
        let ord = compare(a, b, field);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}
