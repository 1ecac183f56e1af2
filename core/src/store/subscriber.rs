use super::PipelineStore;
use crate::{
    error::EtlResult,
    subscriber::{SourceSystem, SubscriberRecord},
};
use chrono::NaiveDate;
use rusqlite::params;

/// The two consolidated roster tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberTable {
    Combined,
    Master,
}

impl SubscriberTable {
    pub fn name(&self) -> &'static str {
        match self {
            SubscriberTable::Combined => "combined_subscribers",
            SubscriberTable::Master   => "master_subscribers",
        }
    }
}

impl PipelineStore {
    /// Replace the contents of a roster table in one transaction.
    pub fn replace_subscribers(
        &mut self,
        table: SubscriberTable,
        records: &[SubscriberRecord],
    ) -> EtlResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", table.name()), [])?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {}
                 (cell_phone_number, first_name, last_name, date_of_birth, region,
                  source_system_name, sim_activation_date, source_priority, is_master_record)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                table.name()
            ))?;
            for r in records {
                stmt.execute(params![
                    r.phone_number,
                    r.first_name,
                    r.last_name,
                    r.date_of_birth.map(|d| d.to_string()),
                    r.region,
                    r.source_system.as_str(),
                    r.sim_activation_date.map(|d| d.to_string()),
                    r.source_priority,
                    r.is_master,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    pub fn subscriber_count(&self, table: SubscriberTable) -> EtlResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Master record for a phone number, if any.
    pub fn master_for_phone(&self, phone: &str) -> EtlResult<Option<SubscriberRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT cell_phone_number, first_name, last_name, date_of_birth, region,
                    source_system_name, sim_activation_date, source_priority, is_master_record
             FROM master_subscribers WHERE cell_phone_number = ?1",
        )?;
        let mut rows = stmt.query_map(params![phone], |row| {
            let source: String = row.get(5)?;
            let source_system = SourceSystem::from_name(&source).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    5,
                    rusqlite::types::Type::Text,
                    format!("unknown source system '{source}'").into(),
                )
            })?;
            Ok(SubscriberRecord {
                phone_number:        row.get(0)?,
                first_name:          row.get(1)?,
                last_name:           row.get(2)?,
                date_of_birth:       parse_stored_date(row.get(3)?),
                region:              row.get(4)?,
                source_system,
                sim_activation_date: parse_stored_date(row.get(6)?),
                source_priority:     row.get(7)?,
                is_master:           row.get(8)?,
            })
        })?;
        let found = rows.next().transpose()?;
        Ok(found)
    }
}

fn parse_stored_date(raw: Option<String>) -> Option<NaiveDate> {
    raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}
