//! Schema reconciler: maps each roster's columns onto the canonical
//! subscriber schema and unions the sources.
//!
//! Mandatory fields (phone, first name, last name) must be mapped and
//! present in the source table; anything else missing becomes null.

use crate::{
    config::{mandatory_columns, PipelineConfig, SourceConfig},
    error::{EtlError, EtlResult},
    event::Degradation,
    normalize::{non_blank, parse_date, ParseOutcome},
    subscriber::{SourceSystem, SubscriberRecord},
    table::{Row, Table},
};
use std::collections::BTreeMap;

/// One roster as read from its source system.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: SourceSystem,
    pub table:  Table,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub records: Vec<SubscriberRecord>,
    /// Rows contributed per source, in batch order.
    pub rows_per_source: Vec<(SourceSystem, usize)>,
    /// Defaulted values keyed by canonical field name.
    pub degradations: BTreeMap<&'static str, Degradation>,
}

pub struct SchemaReconciler<'a> {
    config: &'a PipelineConfig,
}

/// Resolved column names for one batch.
struct Columns<'t> {
    phone:      &'t str,
    first_name: &'t str,
    last_name:  &'t str,
    activation: Option<&'t str>,
    birth:      Option<&'t str>,
    region:     Option<&'t str>,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    pub fn reconcile(&self, batches: &[SourceBatch]) -> EtlResult<Reconciliation> {
        let mut out = Reconciliation::default();

        for batch in batches {
            let src = self.config.source(batch.source)?;
            let priority = self.config.priority_of(batch.source)?;
            let columns = resolve_columns(src, &batch.table)?;

            for row in &batch.table.rows {
                let record = self.reconcile_row(row, &columns, batch.source, priority, &mut out);
                out.records.push(record);
            }

            log::debug!("reconciled {} rows from {}", batch.table.len(), batch.source);
            out.rows_per_source.push((batch.source, batch.table.len()));
        }

        Ok(out)
    }

    fn reconcile_row(
        &self,
        row: &Row,
        columns: &Columns<'_>,
        source: SourceSystem,
        source_priority: u32,
        out: &mut Reconciliation,
    ) -> SubscriberRecord {
        let text = |col: Option<&str>| {
            col.and_then(|c| non_blank(row.get(c).map(String::as_str)))
                .map(str::to_string)
        };
        let mut date = |col: Option<&str>, field: &'static str| {
            let raw = col.and_then(|c| row.get(c)).map(String::as_str);
            match parse_date(raw, &self.config.date_formats, &self.config.usage.timestamp_formats) {
                ParseOutcome::Parsed(d) => Some(d),
                ParseOutcome::Missing => None,
                ParseOutcome::Defaulted { raw, .. } => {
                    out.degradations.entry(field).or_default().record(&raw);
                    None
                }
            }
        };

        SubscriberRecord {
            phone_number:        text(Some(columns.phone)),
            first_name:          text(Some(columns.first_name)),
            last_name:           text(Some(columns.last_name)),
            date_of_birth:       date(columns.birth, "date_of_birth"),
            region:              text(columns.region),
            source_system:       source,
            sim_activation_date: date(columns.activation, "sim_activation_date"),
            source_priority,
            is_master:           false,
        }
    }
}

fn resolve_columns<'t>(src: &'t SourceConfig, table: &Table) -> EtlResult<Columns<'t>> {
    let (phone, first_name, last_name) = mandatory_columns(src)?;
    for column in [phone, first_name, last_name] {
        if !table.has_column(column) {
            return Err(EtlError::MissingColumn {
                table: table.name.clone(),
                column: column.to_string(),
            });
        }
    }

    let optional = |col: &'t Option<String>| {
        let col = col.as_deref()?;
        if table.has_column(col) {
            Some(col)
        } else {
            log::debug!("{}: optional column '{col}' not present, filling with null", table.name);
            None
        }
    };

    Ok(Columns {
        phone,
        first_name,
        last_name,
        activation: optional(&src.columns.sim_activation_date),
        birth:      optional(&src.columns.date_of_birth),
        region:     optional(&src.columns.region),
    })
}
