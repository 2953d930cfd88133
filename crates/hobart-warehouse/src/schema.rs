//! Table schema description and SQL generation for the load protocol.
//!
//! A [`TableSpec`] describes a merge target once: its columns, their
//! types, and the natural-key columns. Every statement the loader needs
//! (durable create, staging create, multi-row insert, merge, drop) is
//! generated from the spec so the shapes can never drift apart.

/// Scalar column type in the analytical store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// UTF-8 text.
    Text,
    /// 8-byte float.
    Real,
    /// 8-byte signed integer.
    Integer,
}

impl ColumnType {
    /// SQL type name.
    #[must_use]
    pub const fn sql_type(&self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Integer => "INTEGER",
        }
    }
}

/// One column in a table schema.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    /// Column name.
    pub name: &'static str,
    /// Scalar type.
    pub ty: ColumnType,
    /// Whether NULL is allowed.
    pub nullable: bool,
}

impl ColumnSpec {
    /// A NOT NULL column.
    #[must_use]
    pub const fn required(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: false,
        }
    }

    /// A nullable column.
    #[must_use]
    pub const fn nullable(name: &'static str, ty: ColumnType) -> Self {
        Self {
            name,
            ty,
            nullable: true,
        }
    }
}

/// Schema of a merge target: durable table name, full column list, and the
/// natural-key columns the merge matches on.
#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    /// Durable table name.
    pub name: &'static str,
    /// All columns, key columns included, in bind order.
    pub columns: &'static [ColumnSpec],
    /// Natural-key column names.
    pub key: &'static [&'static str],
}

impl TableSpec {
    /// CREATE TABLE IF NOT EXISTS statement for `table` with this schema.
    #[must_use]
    pub fn create_sql(&self, table: &str) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|column| {
                if column.nullable {
                    format!("{} {}", column.name, column.ty.sql_type())
                } else {
                    format!("{} {} NOT NULL", column.name, column.ty.sql_type())
                }
            })
            .collect();
        parts.push(format!("PRIMARY KEY ({})", self.key.join(", ")));

        format!("CREATE TABLE IF NOT EXISTS {} ({})", table, parts.join(", "))
    }

    /// Unique staging-table name derived from a millisecond timestamp.
    #[must_use]
    pub fn staging_name(&self, timestamp_millis: i64) -> String {
        format!("{}_temp_{}", self.name, timestamp_millis)
    }

    /// Multi-row INSERT statement binding `rows` rows into `table`.
    #[must_use]
    pub fn insert_sql(&self, table: &str, rows: usize) -> String {
        let tuple = format!("({})", vec!["?"; self.columns.len()].join(", "));
        let values = vec![tuple; rows].join(", ");

        format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            self.column_list(),
            values
        )
    }

    /// Single-statement merge from `staging` into the durable table:
    /// insert new keys, overwrite every non-key column on a key match.
    #[must_use]
    pub fn merge_sql(&self, staging: &str) -> String {
        let assignments = self
            .columns
            .iter()
            .filter(|column| !self.key.contains(&column.name))
            .map(|column| format!("{} = excluded.{}", column.name, column.name))
            .collect::<Vec<_>>()
            .join(", ");

        // WHERE true disambiguates the upsert clause from a multi-row
        // VALUES continuation.
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {} WHERE true \
             ON CONFLICT ({}) DO UPDATE SET {}",
            self.name,
            self.column_list(),
            self.column_list(),
            staging,
            self.key.join(", "),
            assignments
        )
    }

    /// DROP statement for a staging table.
    #[must_use]
    pub fn drop_sql(staging: &str) -> String {
        format!("DROP TABLE IF EXISTS {}", staging)
    }

    /// Rows per insert statement under a bind-parameter budget.
    #[must_use]
    pub const fn rows_per_insert(&self, max_bind_params: usize) -> usize {
        let rows = max_bind_params / self.columns.len();
        if rows == 0 { 1 } else { rows }
    }

    fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|column| column.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: TableSpec = TableSpec {
        name: "widgets",
        columns: &[
            ColumnSpec::required("id", ColumnType::Text),
            ColumnSpec::required("date", ColumnType::Text),
            ColumnSpec::nullable("weight", ColumnType::Real),
            ColumnSpec::required("count", ColumnType::Integer),
        ],
        key: &["id", "date"],
    };

    #[test]
    fn test_create_sql() {
        let sql = SPEC.create_sql("widgets");
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS widgets (id TEXT NOT NULL, date TEXT NOT NULL, \
             weight REAL, count INTEGER NOT NULL, PRIMARY KEY (id, date))"
        );
    }

    #[test]
    fn test_staging_name() {
        assert_eq!(SPEC.staging_name(1700000000123), "widgets_temp_1700000000123");
    }

    #[test]
    fn test_insert_sql_tuple_count() {
        let sql = SPEC.insert_sql("widgets_temp_1", 3);
        assert_eq!(
            sql,
            "INSERT INTO widgets_temp_1 (id, date, weight, count) \
             VALUES (?, ?, ?, ?), (?, ?, ?, ?), (?, ?, ?, ?)"
        );
    }

    #[test]
    fn test_merge_sql_updates_only_non_key_columns() {
        let sql = SPEC.merge_sql("widgets_temp_1");
        assert_eq!(
            sql,
            "INSERT INTO widgets (id, date, weight, count) \
             SELECT id, date, weight, count FROM widgets_temp_1 WHERE true \
             ON CONFLICT (id, date) DO UPDATE SET weight = excluded.weight, \
             count = excluded.count"
        );
    }

    #[test]
    fn test_rows_per_insert() {
        assert_eq!(SPEC.rows_per_insert(999), 249);
        assert_eq!(SPEC.rows_per_insert(8), 2);
        // Never zero, even under an absurdly small budget
        assert_eq!(SPEC.rows_per_insert(3), 1);
    }
}
