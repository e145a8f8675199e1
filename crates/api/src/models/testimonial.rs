//! Customer testimonials shown on the storefront.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A customer quote. Only active testimonials are listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub role: String,
    pub content: String,
    /// 1 to 5 stars.
    pub rating: u8,
    pub avatar: String,
    #[serde(skip, default = "active_default")]
    pub is_active: bool,
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

const fn active_default() -> bool {
    true
}
