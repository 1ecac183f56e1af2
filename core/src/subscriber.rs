//! Canonical subscriber schema shared by reconciliation, deduplication,
//! the weekly report join and the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The upstream roster a subscriber row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceSystem {
    VMobile,
    BlueMobile,
    ArrowMobile,
}

impl SourceSystem {
    pub const ALL: [SourceSystem; 3] = [
        SourceSystem::VMobile,
        SourceSystem::BlueMobile,
        SourceSystem::ArrowMobile,
    ];

    /// Stable name written to output tables and used in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSystem::VMobile     => "VMobile",
            SourceSystem::BlueMobile  => "BlueMobile",
            SourceSystem::ArrowMobile => "ArrowMobile",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One roster row after schema reconciliation.
///
/// Every canonical field is present; sources that do not carry a field
/// contribute `None`. Field names match the output table columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriberRecord {
    #[serde(rename = "cell_phone_number")]
    pub phone_number:        Option<String>,
    pub first_name:          Option<String>,
    pub last_name:           Option<String>,
    pub date_of_birth:       Option<NaiveDate>,
    pub region:              Option<String>,
    #[serde(rename = "source_system_name")]
    pub source_system:       SourceSystem,
    pub sim_activation_date: Option<NaiveDate>,
    pub source_priority:     u32,
    #[serde(rename = "is_master_record")]
    pub is_master:           bool,
}

impl SubscriberRecord {
    /// The phone number if it can take part in matching.
    /// Null and digit-less numbers never match anything.
    pub fn match_key(&self) -> Option<&str> {
        self.phone_number.as_deref().filter(|p| !p.is_empty())
    }
}
