// src/schema/mod.rs
//
// Typed schema definitions for the FinserveNew store. A `TableDef` is the
// unit the migration engine creates, rebuilds and drops; `Snapshot` (in
// `snapshot.rs`) is the cumulative shape obtained by folding the migration
// list.

pub mod ddl;
pub mod introspect;
pub mod snapshot;

pub use snapshot::Snapshot;

use serde::Serialize;

// ─── Column types ─────────────────────────────────────────────────────────────

/// The column type vocabulary the schema consumes and produces.
///
/// Monetary amounts are standardized at `Decimal(18, 2)`; fractional leave
/// days use `Double`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    Text,
    VarChar(u16),
    Integer,
    BigInt,
    Boolean,
    Decimal(u8, u8),
    Date,
    DateTime,
    Double,
}

impl ColumnType {
    pub fn sql(&self) -> String {
        match self {
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::VarChar(n) => format!("VARCHAR({n})"),
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Decimal(p, s) => format!("DECIMAL({p},{s})"),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Double => "DOUBLE".to_string(),
        }
    }

    /// Parse a declared type back from `pragma table_info`. SQLite echoes the
    /// type text exactly as written in the CREATE TABLE statement.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_uppercase();
        match s.as_str() {
            "TEXT" => return Some(ColumnType::Text),
            "INTEGER" => return Some(ColumnType::Integer),
            "BIGINT" => return Some(ColumnType::BigInt),
            "BOOLEAN" => return Some(ColumnType::Boolean),
            "DATE" => return Some(ColumnType::Date),
            "DATETIME" => return Some(ColumnType::DateTime),
            "DOUBLE" => return Some(ColumnType::Double),
            _ => {}
        }
        if let Some(inner) = s.strip_prefix("VARCHAR(").and_then(|r| r.strip_suffix(')')) {
            return inner.parse().ok().map(ColumnType::VarChar);
        }
        if let Some(inner) = s.strip_prefix("DECIMAL(").and_then(|r| r.strip_suffix(')')) {
            let (p, sc) = inner.split_once(',')?;
            return Some(ColumnType::Decimal(
                p.trim().parse().ok()?,
                sc.trim().parse().ok()?,
            ));
        }
        None
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

/// Storage-level default values. Status columns default to domain sentinel
/// strings so inserts omitting them land in a well-defined initial state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DefaultValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    /// `CURRENT_TIMESTAMP`. Not a constant, so it forces a table rebuild when
    /// added to an existing table.
    Now,
    /// The `0001-01-01` placeholder date. A backfill sentinel, never valid
    /// business data; rows still carrying it are flagged for operator review.
    EpochDate,
}

impl DefaultValue {
    pub fn text(s: &str) -> Self {
        DefaultValue::Text(s.to_string())
    }

    pub fn sql_literal(&self) -> String {
        match self {
            DefaultValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DefaultValue::Now => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::EpochDate => "'0001-01-01'".to_string(),
        }
    }

    /// Whether the literal is a constant expression. SQLite only accepts
    /// constant defaults in `ALTER TABLE ... ADD COLUMN`.
    pub fn is_constant(&self) -> bool {
        !matches!(self, DefaultValue::Now)
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, DefaultValue::EpochDate)
    }

    /// Best-effort parse of a `pragma table_info` default literal.
    pub fn parse(lit: &str) -> Self {
        let lit = lit.trim();
        if lit.eq_ignore_ascii_case("CURRENT_TIMESTAMP") {
            return DefaultValue::Now;
        }
        if let Ok(i) = lit.parse::<i64>() {
            return DefaultValue::Integer(i);
        }
        if lit.len() >= 2 && lit.starts_with('\'') && lit.ends_with('\'') {
            let inner = lit[1..lit.len() - 1].replace("''", "'");
            if inner == "0001-01-01" {
                return DefaultValue::EpochDate;
            }
            return DefaultValue::Text(inner);
        }
        DefaultValue::Text(lit.to_string())
    }
}

// ─── Columns ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<DefaultValue>,
}

impl ColumnDef {
    pub fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            nullable: false,
            default: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Defaults compare by rendered literal: the fold carries typed variants
    /// while introspection carries whatever SQLite echoed back.
    pub fn default_literal(&self) -> Option<String> {
        self.default.as_ref().map(DefaultValue::sql_literal)
    }
}

// Column shorthands used throughout the migration history.

pub fn text(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Text)
}

pub fn varchar(name: &str, len: u16) -> ColumnDef {
    ColumnDef::new(name, ColumnType::VarChar(len))
}

pub fn integer(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Integer)
}

pub fn bigint(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::BigInt)
}

pub fn boolean(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Boolean)
}

/// Monetary column: fixed `DECIMAL(18,2)` for MYR-denominated amounts.
pub fn money(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Decimal(18, 2))
}

pub fn date(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Date)
}

pub fn datetime(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::DateTime)
}

pub fn double(name: &str) -> ColumnDef {
    ColumnDef::new(name, ColumnType::Double)
}

// ─── Foreign keys ─────────────────────────────────────────────────────────────

/// Delete policy of a foreign key. There is no implicit default; every FK in
/// the schema declares its policy explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OnDelete {
    Cascade,
    Restrict,
    SetNull,
    NoAction,
}

impl OnDelete {
    pub fn sql(&self) -> &'static str {
        match self {
            OnDelete::Cascade => "CASCADE",
            OnDelete::Restrict => "RESTRICT",
            OnDelete::SetNull => "SET NULL",
            OnDelete::NoAction => "NO ACTION",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASCADE" => Some(OnDelete::Cascade),
            "RESTRICT" => Some(OnDelete::Restrict),
            "SET NULL" => Some(OnDelete::SetNull),
            "NO ACTION" => Some(OnDelete::NoAction),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKeyDef {
    /// Constraint name. SQLite's `pragma foreign_key_list` does not report
    /// names, so diffs compare FKs structurally and ignore this field.
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
    pub on_delete: OnDelete,
}

impl ForeignKeyDef {
    pub fn new(
        name: &str,
        columns: &[&str],
        ref_table: &str,
        ref_columns: &[&str],
        on_delete: OnDelete,
    ) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            ref_table: ref_table.to_string(),
            ref_columns: ref_columns.iter().map(|c| c.to_string()).collect(),
            on_delete,
        }
    }

    /// Structural identity used for diffing.
    pub fn shape(&self) -> (Vec<String>, String, Vec<String>, OnDelete) {
        (
            self.columns.clone(),
            self.ref_table.clone(),
            self.ref_columns.clone(),
            self.on_delete,
        )
    }
}

// ─── Indexes ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDef {
    pub fn new(name: &str, table: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

// ─── Tables ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKeyDef>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    pub fn columns(mut self, columns: Vec<ColumnDef>) -> Self {
        self.columns = columns;
        self
    }

    pub fn primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// True when the primary key is a single rowid-aliased integer column,
    /// rendered inline as `INTEGER PRIMARY KEY AUTOINCREMENT`.
    pub fn has_rowid_pk(&self) -> bool {
        self.primary_key.len() == 1
            && self
                .column(&self.primary_key[0])
                .is_some_and(|c| c.ty == ColumnType::Integer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_type_sql_and_parse_agree() {
        let types = [
            ColumnType::Text,
            ColumnType::VarChar(36),
            ColumnType::Integer,
            ColumnType::BigInt,
            ColumnType::Boolean,
            ColumnType::Decimal(18, 2),
            ColumnType::Date,
            ColumnType::DateTime,
            ColumnType::Double,
        ];
        for ty in types {
            assert_eq!(ColumnType::parse(&ty.sql()), Some(ty));
        }
    }

    #[test]
    fn default_literals() {
        assert_eq!(DefaultValue::text("Pending").sql_literal(), "'Pending'");
        assert_eq!(DefaultValue::text("it's").sql_literal(), "'it''s'");
        assert_eq!(DefaultValue::Integer(0).sql_literal(), "0");
        assert_eq!(DefaultValue::Bool(true).sql_literal(), "1");
        assert_eq!(DefaultValue::Now.sql_literal(), "CURRENT_TIMESTAMP");
        assert_eq!(DefaultValue::EpochDate.sql_literal(), "'0001-01-01'");
        assert!(!DefaultValue::Now.is_constant());
        assert!(DefaultValue::EpochDate.is_sentinel());
    }

    #[test]
    fn default_parse_roundtrips_through_literal() {
        for d in [
            DefaultValue::text("Draft"),
            DefaultValue::Integer(1),
            DefaultValue::Now,
            DefaultValue::EpochDate,
        ] {
            assert_eq!(DefaultValue::parse(&d.sql_literal()).sql_literal(), d.sql_literal());
        }
    }

    #[test]
    fn on_delete_parse() {
        for od in [
            OnDelete::Cascade,
            OnDelete::Restrict,
            OnDelete::SetNull,
            OnDelete::NoAction,
        ] {
            assert_eq!(OnDelete::parse(od.sql()), Some(od));
        }
        assert_eq!(OnDelete::parse("cascade"), Some(OnDelete::Cascade));
        assert_eq!(OnDelete::parse("SET DEFAULT"), None);
    }

    #[test]
    fn rowid_pk_detection() {
        let t = TableDef::new("claims")
            .columns(vec![integer("id"), varchar("title", 200)])
            .primary_key(&["id"]);
        assert!(t.has_rowid_pk());

        let t = TableDef::new("employees")
            .columns(vec![varchar("id", 36)])
            .primary_key(&["id"]);
        assert!(!t.has_rowid_pk());
    }
}
