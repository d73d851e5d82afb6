//! Business-type classification for provisioned accounts.

use serde::{Deserialize, Serialize};

/// The kind of business an account was provisioned for.
///
/// Checkout metadata carries this as a free-form string filled in by the
/// sales funnel; parsing is lenient so an unrecognized value never blocks
/// fulfillment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BusinessType {
    /// Hair salon (the default offering).
    #[default]
    Salon,
    Barbershop,
    NailStudio,
    Spa,
    /// Anything the funnel sent that we do not recognize.
    Other,
}

impl BusinessType {
    /// Stable snake_case name, as stored in `accounts.business_type`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Salon => "salon",
            Self::Barbershop => "barbershop",
            Self::NailStudio => "nail_studio",
            Self::Spa => "spa",
            Self::Other => "other",
        }
    }

    /// Lenient parse: case-insensitive, unknown values map to `Other`,
    /// absent values should use [`BusinessType::default`].
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "salon" | "hair_salon" | "hairdresser" => Self::Salon,
            "barbershop" | "barber" => Self::Barbershop,
            "nail_studio" | "nails" => Self::NailStudio,
            "spa" => Self::Spa,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for BusinessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
