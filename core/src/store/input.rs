use super::{is_identifier, FlowStore};
use crate::{
    error::{FlowError, FlowResult},
    table::{Cell, Table},
};
use rusqlite::{params, types::ValueRef, OptionalExtension};
use serde_json::Value;

impl FlowStore {
    // ── Input tables ──────────────────────────────────────────────

    pub fn table_exists(&self, name: &str) -> FlowResult<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Read a whole table into an untyped Table, column order preserved.
    pub fn load_table(&self, name: &str) -> FlowResult<Table> {
        if !is_identifier(name) || !self.table_exists(name)? {
            return Err(FlowError::MissingTable {
                table: name.to_string(),
            });
        }
        let mut stmt = self.conn.prepare(&format!("SELECT * FROM \"{name}\""))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(cell_from_sql))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("store: loaded {} row(s) from {name}", rows.len());
        Ok(Table {
            name: name.to_string(),
            columns,
            rows,
        })
    }

    /// Create (or replace) a loosely typed table holding `table`'s rows.
    /// This is how loaders and fixtures stage input for `load_table`.
    pub fn write_table(&self, table: &Table) -> FlowResult<()> {
        if !is_identifier(&table.name) {
            return Err(FlowError::MissingTable {
                table: table.name.clone(),
            });
        }
        if let Some(bad) = table.columns.iter().find(|c| !is_identifier(c)) {
            return Err(anyhow::anyhow!("invalid column name '{bad}' in {}", table.name).into());
        }
        let cols = table
            .columns
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=table.columns.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS \"{name}\"; CREATE TABLE \"{name}\" ({cols});",
            name = table.name
        ))?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" ({cols}) VALUES ({placeholders})",
                table.name
            ))?;
            for row in &table.rows {
                let values: Vec<rusqlite::types::Value> = (0..table.columns.len())
                    .map(|i| row.get(i).map(cell_to_sql).unwrap_or(rusqlite::types::Value::Null))
                    .collect();
                stmt.execute(rusqlite::params_from_iter(values))?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn cell_from_sql(v: ValueRef<'_>) -> Cell {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn cell_to_sql(cell: &Cell) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match cell {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => n.as_f64().map(Sql::Real).unwrap_or(Sql::Null),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}
