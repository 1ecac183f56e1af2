use super::PipelineStore;
use crate::{
    error::EtlResult,
    usage::UsageEventRecord,
    weekly_report::{WeeklyQualificationRecord, WeeklyReport},
};
use rusqlite::params;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl PipelineStore {
    pub fn replace_usage_records(&mut self, events: &[UsageEventRecord]) -> EtlResult<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM usage_records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO usage_records
                 (msisdn, usage_event_date_time, usage_event_city_id, usage_event_type_id,
                  usage_event_tracking_quantity, usage_event_tracking_unit,
                  usage_event_billing_quantity, usage_event_billing_unit, usage_event_revenue)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for e in events {
                stmt.execute(params![
                    e.msisdn,
                    e.event_timestamp.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string()),
                    e.event_city_id,
                    e.event_type_id,
                    e.tracking_quantity,
                    e.tracking_unit,
                    e.billing_quantity,
                    e.billing_unit,
                    e.revenue,
                ])?;
            }
        }
        tx.commit()?;
        Ok(events.len())
    }

    pub fn usage_record_count(&self) -> EtlResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM usage_records", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Replace the weekly qualification table with this run's report.
    pub fn replace_report(&mut self, report: &WeeklyReport) -> EtlResult<usize> {
        let (week_start, week_end) = report.window.label();
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM weekly_qualification", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO weekly_qualification
                 (msisdn, first_name, last_name, region, total_weekly_revenue,
                  total_sms_count, total_voice_call_count, week_start, week_end)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in &report.records {
                stmt.execute(params![
                    r.msisdn,
                    r.first_name,
                    r.last_name,
                    r.region,
                    r.total_weekly_revenue,
                    r.total_sms_count,
                    r.total_voice_call_count,
                    week_start,
                    week_end,
                ])?;
            }
        }
        tx.commit()?;
        Ok(report.records.len())
    }

    pub fn report_rows(&self) -> EtlResult<Vec<WeeklyQualificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT first_name, last_name, msisdn, total_weekly_revenue,
                    total_sms_count, total_voice_call_count, region
             FROM weekly_qualification
             ORDER BY msisdn ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WeeklyQualificationRecord {
                    first_name:             row.get(0)?,
                    last_name:              row.get(1)?,
                    msisdn:                 row.get(2)?,
                    total_weekly_revenue:   row.get(3)?,
                    total_sms_count:        row.get(4)?,
                    total_voice_call_count: row.get(5)?,
                    region:                 row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
