use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub used: bool,
    pub used_by: String,
    pub used_date: String,
    pub note: String,
    /// Inclusive start of the validity window (`dd/mm/yyyy`)
    pub valid_from: String,
    /// Inclusive end of the validity window (`dd/mm/yyyy`)
    pub valid_to: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Coupon {
    pub fn has_validity_window(&self) -> bool {
        !self.valid_from.trim().is_empty() && !self.valid_to.trim().is_empty()
    }
}

/// A coupon that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub used: bool,
    #[serde(default)]
    pub used_by: String,
    #[serde(default)]
    pub used_date: String,
    #[serde(default)]
    pub note: String,
    pub valid_from: String,
    pub valid_to: String,
}

impl NewCoupon {
    /// An unused coupon with the given code and window.
    pub fn unused(code: impl Into<String>, valid_from: impl Into<String>, valid_to: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            kind: None,
            used: false,
            used_by: String::new(),
            used_date: String::new(),
            note: String::new(),
            valid_from: valid_from.into(),
            valid_to: valid_to.into(),
        }
    }

    /// The same code, type and window with the usage fields cleared.
    pub fn into_unused(self) -> Self {
        Self {
            used: false,
            used_by: String::new(),
            used_date: String::new(),
            note: String::new(),
            ..self
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

/// Partial update: only `Some` slots are written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CouponUpdate {
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub used: Option<bool>,
    pub used_by: Option<String>,
    pub used_date: Option<String>,
    pub note: Option<String>,
    pub valid_from: Option<String>,
    pub valid_to: Option<String>,
}

impl CouponUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Fields written when a coupon is redeemed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageMark {
    pub used_by: String,
    pub used_date: String,
    pub note: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CouponStats {
    pub total: usize,
    pub used: usize,
    pub unused: usize,
    pub expired: usize,
    pub active: usize,
}

/// Column a coupon listing can be sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    Code,
    #[serde(rename = "type")]
    #[strum(serialize = "type")]
    Kind,
    Used,
    UsedBy,
    UsedDate,
    ValidFrom,
    ValidTo,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}
