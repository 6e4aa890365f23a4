/// The four relational backends this store can persist metadata into.
///
/// Dialect differences are encapsulated entirely behind this type and the
/// `Backend` implementations in the sibling modules; nothing above
/// `docstore-storage` ever branches on dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
    SqlServer,
}

impl Dialect {
    /// Quote an already-sanitized identifier for inclusion in DDL/DML text.
    pub fn quote_ident(&self, ident: &str) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgres => format!("\"{ident}\""),
            Dialect::MySql => format!("`{ident}`"),
            Dialect::SqlServer => format!("[{ident}]"),
        }
    }

    /// Render a `LIMIT n OFFSET m` clause (SQL Server uses the windowed
    /// `OFFSET ... FETCH NEXT` form since it has no `LIMIT`).
    pub fn limit_offset(&self, limit: usize, offset: usize) -> String {
        match self {
            Dialect::Sqlite | Dialect::Postgres | Dialect::MySql => {
                format!("LIMIT {limit} OFFSET {offset}")
            }
            Dialect::SqlServer => {
                format!("OFFSET {offset} ROWS FETCH NEXT {limit} ROWS ONLY")
            }
        }
    }

    pub fn bool_literal(&self, value: bool) -> &'static str {
        match self {
            Dialect::Sqlite | Dialect::MySql | Dialect::SqlServer => {
                if value {
                    "1"
                } else {
                    "0"
                }
            }
            Dialect::Postgres => {
                if value {
                    "TRUE"
                } else {
                    "FALSE"
                }
            }
        }
    }

    /// DDL for one per-field index table. Columns mirror §3's IndexEntry:
    /// `{id, document_id, position?, value}`.
    pub fn create_index_table_ddl(&self, table: &str) -> Vec<String> {
        let q = |s: &str| self.quote_ident(s);
        let t = q(table);
        let body = match self {
            // `value_numeric` is a typed secondary column alongside the
            // canonical text `value`: range comparisons on integer/number
            // fields cast against it instead of comparing text
            // lexicographically (a plain-text "10" < "9" bug otherwise).
            Dialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT, \
                 document_id TEXT NOT NULL, \
                 position INTEGER, \
                 value TEXT, \
                 value_numeric REAL, \
                 created_utc TEXT NOT NULL)"
            ),
            Dialect::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 id BIGSERIAL PRIMARY KEY, \
                 document_id TEXT NOT NULL, \
                 position INTEGER, \
                 value TEXT, \
                 value_numeric DOUBLE PRECISION, \
                 created_utc TIMESTAMPTZ NOT NULL)"
            ),
            Dialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {t} (\
                 id BIGINT AUTO_INCREMENT PRIMARY KEY, \
                 document_id VARCHAR(64) NOT NULL, \
                 position INT, \
                 value TEXT, \
                 value_numeric DOUBLE, \
                 created_utc DATETIME NOT NULL)"
            ),
            Dialect::SqlServer => format!(
                "IF OBJECT_ID(N'{table}', N'U') IS NULL \
                 CREATE TABLE {t} (\
                 id BIGINT IDENTITY(1,1) PRIMARY KEY, \
                 document_id NVARCHAR(64) NOT NULL, \
                 position INT NULL, \
                 value NVARCHAR(MAX), \
                 value_numeric FLOAT NULL, \
                 created_utc DATETIME2 NOT NULL)"
            ),
        };

        let doc_idx = format!(
            "CREATE INDEX {} ON {t} (document_id)",
            q(&format!("{table}_docid_idx"))
        );
        let val_idx = format!(
            "CREATE INDEX {} ON {t} (value)",
            q(&format!("{table}_value_idx"))
        );

        match self {
            Dialect::SqlServer => vec![body],
            _ => vec![body, doc_idx, val_idx],
        }
    }

    pub fn drop_table_ddl(&self, table: &str) -> String {
        let t = self.quote_ident(table);
        match self {
            Dialect::SqlServer => format!("DROP TABLE IF EXISTS {t}"),
            _ => format!("DROP TABLE IF EXISTS {t}"),
        }
    }

    /// Semantic column-type mapping used by fixed-table DDL (C8's
    /// `collections`/`documents`/... tables) so that crate consumers never
    /// have to know per-dialect type names.
    pub fn text_type(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "NVARCHAR(MAX)",
            Dialect::MySql => "TEXT",
            _ => "TEXT",
        }
    }

    pub fn short_text_type(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "NVARCHAR(256)",
            Dialect::MySql => "VARCHAR(256)",
            _ => "TEXT",
        }
    }

    pub fn integer_type(&self) -> &'static str {
        match self {
            Dialect::SqlServer => "BIGINT",
            Dialect::MySql => "BIGINT",
            _ => "INTEGER",
        }
    }

    pub fn timestamp_type(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "TEXT",
            Dialect::Postgres => "TIMESTAMPTZ",
            Dialect::MySql => "DATETIME",
            Dialect::SqlServer => "DATETIME2",
        }
    }

    pub fn boolean_type(&self) -> &'static str {
        match self {
            Dialect::Postgres => "BOOLEAN",
            _ => "INTEGER",
        }
    }

    pub fn autoincrement_pk(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
            Dialect::MySql => "BIGINT AUTO_INCREMENT PRIMARY KEY",
            Dialect::SqlServer => "BIGINT IDENTITY(1,1) PRIMARY KEY",
        }
    }

    pub fn create_if_not_exists(&self, table_bare: &str, quoted: &str, columns: &str) -> String {
        match self {
            Dialect::SqlServer => format!(
                "IF OBJECT_ID(N'{table_bare}', N'U') IS NULL CREATE TABLE {quoted} ({columns})"
            ),
            _ => format!("CREATE TABLE IF NOT EXISTS {quoted} ({columns})"),
        }
    }
}
