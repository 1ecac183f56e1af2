//! Untyped tables: raw lookup files loaded verbatim, and canned
//! analysis queries read back as tables.

use super::{quote_ident, PipelineStore};
use crate::{error::EtlResult, table::Table};
use rusqlite::types::ValueRef;

impl PipelineStore {
    /// Drop and recreate `name` with one TEXT column per table column.
    pub fn load_lookup(&mut self, name: &str, table: &Table) -> EtlResult<usize> {
        let tx = self.conn.transaction()?;
        let ident = quote_ident(name);
        let column_defs: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect();
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {ident};
             CREATE TABLE {ident} ({});",
            column_defs.join(", ")
        ))?;
        {
            let placeholders: Vec<String> =
                (1..=table.columns.len()).map(|i| format!("?{i}")).collect();
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {ident} VALUES ({})",
                placeholders.join(", ")
            ))?;
            for row in &table.rows {
                let values: Vec<Option<&str>> = table
                    .columns
                    .iter()
                    .map(|c| row.get(c).map(String::as_str).filter(|v| !v.is_empty()))
                    .collect();
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(table.len())
    }

    /// Run a read-only query and return every cell as text.
    pub fn query_to_table(&self, name: &str, sql: &str) -> EtlResult<Table> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let mut out = Table {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        };
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut cells = crate::table::Row::new();
            for (i, column) in out.columns.iter().enumerate() {
                let text = match row.get_ref(i)? {
                    ValueRef::Null => continue,
                    ValueRef::Integer(v) => v.to_string(),
                    ValueRef::Real(v) => v.to_string(),
                    ValueRef::Text(v) | ValueRef::Blob(v) => String::from_utf8_lossy(v).into_owned(),
                };
                cells.insert(column.clone(), text);
            }
            out.rows.push(cells);
        }
        Ok(out)
    }

    pub fn table_row_count(&self, name: &str) -> EtlResult<i64> {
        let n = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
