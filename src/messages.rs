//! User-facing text for redemption outcomes and errors.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

use crate::dates;
use crate::error::CouponError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Locale {
    #[default]
    Ar,
    En,
}

impl Locale {
    /// Placeholder shown for missing names and dates.
    pub fn unknown(self) -> &'static str {
        match self {
            Locale::Ar => "غير معروف",
            Locale::En => "unknown",
        }
    }
}

/// Display a stored date, falling back to the localized placeholder when blank.
pub fn display_date(stored: &str, locale: Locale) -> String {
    dates::format_for_display_or_fallback(stored).unwrap_or_else(|| locale.unknown().to_string())
}

pub fn enter_code(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "يرجى إدخال رمز الكوبون",
        Locale::En => "Please enter a coupon code.",
    }
}

pub fn not_found(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "الكوبون غير موجود. يرجى التحقق من الرمز وإعادة المحاولة.",
        Locale::En => "Coupon not found. Please check the code and try again.",
    }
}

pub fn already_used(locale: Locale, used_by: &str, used_date: &str) -> String {
    match locale {
        Locale::Ar => format!("هذا الكوبون مستخدم بالفعل بواسطة: {used_by} في تاريخ: {used_date}"),
        Locale::En => format!("This coupon was already used by: {used_by} on: {used_date}"),
    }
}

pub fn no_validity_window(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "تاريخ الصلاحية غير محدد في بيانات الكوبون",
        Locale::En => "This coupon has no validity period set.",
    }
}

pub fn not_yet_valid(locale: Locale, valid_from: &str) -> String {
    match locale {
        Locale::Ar => format!("الكوبون غير صالح بعد. تاريخ بدء الصلاحية: {valid_from}"),
        Locale::En => format!("This coupon is not valid yet. Valid from: {valid_from}"),
    }
}

pub fn expired(locale: Locale, valid_to: &str) -> String {
    match locale {
        Locale::Ar => format!("الكوبون منتهي الصلاحية. تاريخ انتهاء الصلاحية: {valid_to}"),
        Locale::En => format!("This coupon has expired. Valid until: {valid_to}"),
    }
}

pub fn redeemed(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "تم تفعيل الكوبون بنجاح! شكراً لاستخدامك.",
        Locale::En => "Coupon redeemed successfully! Thank you.",
    }
}

pub fn unexpected(locale: Locale) -> &'static str {
    match locale {
        Locale::Ar => "حدث خطأ غير متوقع. يرجى المحاولة مرة أخرى.",
        Locale::En => "An unexpected error occurred. Please try again.",
    }
}

/// Message shown to the person redeeming when a [`CouponError`] ends the flow.
pub fn coupon_error(locale: Locale, err: &CouponError) -> String {
    match (err, locale) {
        (CouponError::EmptyCode, _) => enter_code(locale).to_string(),
        (CouponError::InvalidDate(invalid), Locale::Ar) => format!("تاريخ غير صالح: {}", invalid.0),
        (CouponError::InvalidDate(invalid), Locale::En) => format!("Invalid date: {}", invalid.0),
        (CouponError::MissingValidityWindow, _) => no_validity_window(locale).to_string(),
        (CouponError::RecordIdMissing, Locale::Ar) => "معرف الكوبون غير موجود".to_string(),
        (CouponError::RecordIdMissing, Locale::En) => "Coupon identifier is missing".to_string(),
        (CouponError::WriteNotApplied(_) | CouponError::Store(_), _) => unexpected(locale).to_string(),
    }
}
