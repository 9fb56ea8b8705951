// src/migrate/mod.rs
//
// Reversible schema migrations. A migration is an ordered list of tagged
// operations; each operation captures enough of the old state (full column,
// index and table definitions) that its exact inverse can be derived. The
// planner turns operations into SQLite statements, falling back to the
// table-rebuild workflow for changes ALTER TABLE cannot express.

pub mod runner;
pub mod validator;

pub use runner::Migrator;

use std::fmt;

use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::schema::{ddl, ColumnDef, DefaultValue, ForeignKeyDef, IndexDef, Snapshot, TableDef};

/// Applied-migrations ledger table. Holds one row per applied migration:
/// identifier plus the product version that applied it.
pub const LEDGER_TABLE: &str = "_finserve_migrations";

// ─── Identifiers ──────────────────────────────────────────────────────────────

/// Migration identifier: `<14-digit UTC timestamp>_<DescriptiveName>`.
/// Lexicographic order on the full string is the application order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct MigrationId(String);

impl MigrationId {
    pub fn parse(s: &str) -> AppResult<Self> {
        let (ts, name) = s.split_once('_').ok_or_else(|| {
            AppError::Validation(format!("migration id '{s}' missing '_' separator"))
        })?;
        if ts.len() != 14 || !ts.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(format!(
                "migration id '{s}' must start with a 14-digit UTC timestamp"
            )));
        }
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(format!(
                "migration id '{s}' has an invalid descriptive name"
            )));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn timestamp(&self) -> &str {
        &self.0[..14]
    }

    pub fn name(&self) -> &str {
        &self.0[15..]
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Operations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Operation {
    CreateTable(TableDef),
    /// Carries the full definition so the inverse can recreate the table.
    DropTable(TableDef),
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    /// Carries the full column definition; the inverse recreates the column
    /// empty, which is why drops are the canonical lossy operation.
    DropColumn {
        table: String,
        column: ColumnDef,
    },
    /// `from` must match the snapshot exactly: explicit old-type capture is
    /// what makes the reversal exact.
    AlterColumn {
        table: String,
        from: ColumnDef,
        to: ColumnDef,
    },
    CreateIndex(IndexDef),
    DropIndex(IndexDef),
    AddForeignKey {
        table: String,
        foreign_key: ForeignKeyDef,
    },
    DropForeignKey {
        table: String,
        foreign_key: ForeignKeyDef,
    },
    /// Replaces the primary key, e.g. composite key to surrogate key. Columns
    /// entering the key are tightened to NOT NULL.
    SetPrimaryKey {
        table: String,
        from: Vec<String>,
        to: Vec<String>,
    },
    /// Data-only: fill NULLs in `column` with a literal. Pairs with a
    /// nullable AddColumn and a tightening AlterColumn when introducing a
    /// required column on a populated table.
    Backfill {
        table: String,
        column: String,
        value: DefaultValue,
    },
}

impl Operation {
    /// Exact inverse, or `None` for data-only operations that have no schema
    /// effect to undo.
    pub fn invert(&self) -> Option<Operation> {
        match self {
            Operation::CreateTable(def) => Some(Operation::DropTable(def.clone())),
            Operation::DropTable(def) => Some(Operation::CreateTable(def.clone())),
            Operation::AddColumn { table, column } => Some(Operation::DropColumn {
                table: table.clone(),
                column: column.clone(),
            }),
            Operation::DropColumn { table, column } => Some(Operation::AddColumn {
                table: table.clone(),
                column: column.clone(),
            }),
            Operation::AlterColumn { table, from, to } => Some(Operation::AlterColumn {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            }),
            Operation::CreateIndex(def) => Some(Operation::DropIndex(def.clone())),
            Operation::DropIndex(def) => Some(Operation::CreateIndex(def.clone())),
            Operation::AddForeignKey { table, foreign_key } => Some(Operation::DropForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            }),
            Operation::DropForeignKey { table, foreign_key } => Some(Operation::AddForeignKey {
                table: table.clone(),
                foreign_key: foreign_key.clone(),
            }),
            Operation::SetPrimaryKey { table, from, to } => Some(Operation::SetPrimaryKey {
                table: table.clone(),
                from: to.clone(),
                to: from.clone(),
            }),
            Operation::Backfill { .. } => None,
        }
    }

    pub fn table_name(&self) -> &str {
        match self {
            Operation::CreateTable(def) | Operation::DropTable(def) => &def.name,
            Operation::AddColumn { table, .. }
            | Operation::DropColumn { table, .. }
            | Operation::AlterColumn { table, .. }
            | Operation::AddForeignKey { table, .. }
            | Operation::DropForeignKey { table, .. }
            | Operation::SetPrimaryKey { table, .. }
            | Operation::Backfill { table, .. } => table,
            Operation::CreateIndex(def) | Operation::DropIndex(def) => &def.table,
        }
    }

    /// Render the operation as SQLite statements. `before` is the snapshot
    /// the operation applies to, `after` the snapshot with it applied.
    pub fn plan(&self, before: &Snapshot, after: &Snapshot) -> AppResult<Vec<String>> {
        match self {
            Operation::CreateTable(def) => Ok(vec![ddl::create_table(def)]),
            Operation::DropTable(def) => Ok(vec![ddl::drop_table(&def.name)]),
            Operation::CreateIndex(def) => Ok(vec![ddl::create_index(def)]),
            Operation::DropIndex(def) => Ok(vec![ddl::drop_index(&def.name)]),
            Operation::Backfill {
                table,
                column,
                value,
            } => Ok(vec![ddl::backfill(table, column, &value.sql_literal())]),
            Operation::AddColumn { table, column } => {
                let addable = column.nullable
                    || column
                        .default
                        .as_ref()
                        .is_some_and(DefaultValue::is_constant);
                if addable {
                    Ok(vec![ddl::add_column(table, column)])
                } else {
                    // Non-constant default: SQLite only accepts it in a full
                    // CREATE TABLE, so rebuild.
                    self.plan_rebuild(before, after)
                }
            }
            Operation::DropColumn { .. }
            | Operation::AlterColumn { .. }
            | Operation::AddForeignKey { .. }
            | Operation::DropForeignKey { .. }
            | Operation::SetPrimaryKey { .. } => self.plan_rebuild(before, after),
        }
    }

    fn plan_rebuild(&self, before: &Snapshot, after: &Snapshot) -> AppResult<Vec<String>> {
        let table = self.table_name();
        let old = before.table(table)?;
        let new = after.table(table)?;

        let shared: Vec<String> = new
            .columns
            .iter()
            .filter(|c| old.has_column(&c.name))
            .map(|c| c.name.clone())
            .collect();

        Ok(ddl::rebuild_table(new, &shared, &after.indexes_on(table)))
    }
}

// ─── Migrations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Migration {
    pub id: MigrationId,
    pub up: Vec<Operation>,
    /// Explicit Down sequence. When absent, Down is derived by inverting the
    /// Up operations in reverse order.
    pub down_override: Option<Vec<Operation>>,
    /// Documentation of data lost by this migration's Down (or Up). A lossy
    /// revert is permitted but logged, never silent.
    pub lossy: Option<&'static str>,
    /// A Down that cannot be expressed at all; reverting fails.
    pub irreversible: bool,
}

impl Migration {
    /// Registry entries use static, pre-validated identifiers; a malformed id
    /// is a programming error caught the first time the registry loads.
    pub fn new(id: &str, up: Vec<Operation>) -> Self {
        let id = MigrationId::parse(id)
            .unwrap_or_else(|e| panic!("invalid migration id in registry: {e}"));
        Self {
            id,
            up,
            down_override: None,
            lossy: None,
            irreversible: false,
        }
    }

    pub fn with_down(mut self, down: Vec<Operation>) -> Self {
        self.down_override = Some(down);
        self
    }

    pub fn lossy(mut self, note: &'static str) -> Self {
        self.lossy = Some(note);
        self
    }

    pub fn irreversible(mut self) -> Self {
        self.irreversible = true;
        self
    }

    pub fn down(&self) -> AppResult<Vec<Operation>> {
        if self.irreversible {
            return Err(AppError::IrreversibleDown {
                id: self.id.to_string(),
                detail: self
                    .lossy
                    .unwrap_or("the Up operations destroyed state no Down can restore")
                    .to_string(),
            });
        }
        if let Some(ops) = &self.down_override {
            return Ok(ops.clone());
        }
        Ok(self.up.iter().rev().filter_map(Operation::invert).collect())
    }
}
