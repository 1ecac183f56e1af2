//! Deduplication engine: picks one master record per phone number.
//!
//! Order of precedence among records sharing a phone number:
//!   1. source priority, lowest value first
//!   2. SIM activation date, most recent first; unknown dates lose
//!   3. remaining fields, so the choice never depends on input order
//!
//! Records without a usable phone number are never matched against each
//! other. They stay in `all_with_flag` with `is_master = false`.

use crate::{
    normalize::normalize_phone_number,
    subscriber::SubscriberRecord,
};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    /// Every input record, sorted, with the master flag set.
    pub all_with_flag: Vec<SubscriberRecord>,
    /// The master record for each distinct phone number, in phone order.
    pub master_only: Vec<SubscriberRecord>,
    /// Records with a null or digit-less phone number.
    pub unmatchable: usize,
}

pub fn deduplicate(mut records: Vec<SubscriberRecord>) -> Deduplicated {
    for r in &mut records {
        r.phone_number = normalize_phone_number(r.phone_number.as_deref());
        r.is_master = false;
    }

    records.sort_by(master_order);

    let mut unmatchable = 0;
    let mut last_key: Option<String> = None;
    for r in &mut records {
        let Some(key) = r.match_key() else {
            unmatchable += 1;
            continue;
        };
        if last_key.as_deref() != Some(key) {
            last_key = Some(key.to_string());
            r.is_master = true;
        }
    }

    let master_only: Vec<SubscriberRecord> =
        records.iter().filter(|r| r.is_master).cloned().collect();

    if unmatchable > 0 {
        log::warn!("{unmatchable} subscriber record(s) have no usable phone number and were not deduplicated");
    }
    log::debug!(
        "dedup: {} records, {} masters",
        records.len(),
        master_only.len()
    );

    Deduplicated {
        all_with_flag: records,
        master_only,
        unmatchable,
    }
}

/// Total order used to pick masters. Matchable records come first,
/// grouped by phone number.
pub fn master_order(a: &SubscriberRecord, b: &SubscriberRecord) -> Ordering {
    match (a.match_key(), b.match_key()) {
        (Some(pa), Some(pb)) => pa.cmp(pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.source_priority.cmp(&b.source_priority))
    .then_with(|| newest_first(a, b))
    .then_with(|| a.first_name.cmp(&b.first_name))
    .then_with(|| a.last_name.cmp(&b.last_name))
    .then_with(|| a.region.cmp(&b.region))
    .then_with(|| a.date_of_birth.cmp(&b.date_of_birth))
    .then_with(|| a.source_system.cmp(&b.source_system))
}

fn newest_first(a: &SubscriberRecord, b: &SubscriberRecord) -> Ordering {
    match (a.sim_activation_date, b.sim_activation_date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
