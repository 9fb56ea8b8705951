// src/schema/snapshot.rs
//
// The cumulative model snapshot. Never hand-maintained: always the result of
// folding the ordered migration list over an empty schema.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::{AppError, AppResult};
use crate::migrate::Operation;
use crate::schema::{IndexDef, TableDef};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub tables: BTreeMap<String, TableDef>,
    /// Index namespace is schema-wide in SQLite, so indexes live beside the
    /// tables rather than inside them.
    pub indexes: BTreeMap<String, IndexDef>,
}

impl Snapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn table(&self, name: &str) -> AppResult<&TableDef> {
        self.tables
            .get(name)
            .ok_or_else(|| AppError::Schema(format!("unknown table '{name}'")))
    }

    pub fn indexes_on(&self, table: &str) -> Vec<&IndexDef> {
        self.indexes.values().filter(|i| i.table == table).collect()
    }

    /// Whether `columns` on `table` are covered by an index or primary-key
    /// prefix. Every foreign key's referencing side must satisfy this.
    pub fn is_indexed(&self, table: &str, columns: &[String]) -> bool {
        if let Some(t) = self.tables.get(table) {
            if t.primary_key.len() >= columns.len() && t.primary_key[..columns.len()] == *columns {
                return true;
            }
        }
        self.indexes.values().any(|i| {
            i.table == table
                && i.columns.len() >= columns.len()
                && i.columns[..columns.len()] == *columns
        })
    }

    /// Fold one operation into the snapshot, checking the structural
    /// preconditions the operation relies on.
    pub fn apply(&mut self, op: &Operation) -> AppResult<()> {
        match op {
            Operation::CreateTable(def) => {
                if self.tables.contains_key(&def.name) {
                    return Err(AppError::Schema(format!(
                        "cannot create table '{}': it already exists",
                        def.name
                    )));
                }
                self.tables.insert(def.name.clone(), def.clone());
            }
            Operation::DropTable(def) => {
                let current = self.table(&def.name)?;
                if current != def {
                    return Err(AppError::Schema(format!(
                        "captured definition of table '{}' does not match the snapshot",
                        def.name
                    )));
                }
                if let Some(ix) = self.indexes.values().find(|i| i.table == def.name) {
                    return Err(AppError::Schema(format!(
                        "cannot drop table '{}': index '{}' still exists (drop it first so the reversal is exact)",
                        def.name, ix.name
                    )));
                }
                self.tables.remove(&def.name);
            }
            Operation::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.has_column(&column.name) {
                    return Err(AppError::Schema(format!(
                        "column '{}' already exists on '{table}'",
                        column.name
                    )));
                }
                t.columns.push(column.clone());
            }
            Operation::DropColumn { table, column } => {
                let indexed = self
                    .indexes
                    .values()
                    .find(|i| i.table == *table && i.columns.contains(&column.name))
                    .map(|i| i.name.clone());
                let t = self.table_mut(table)?;
                if !t.has_column(&column.name) {
                    return Err(AppError::Schema(format!(
                        "column '{}' does not exist on '{table}'",
                        column.name
                    )));
                }
                if t.primary_key.contains(&column.name) {
                    return Err(AppError::Schema(format!(
                        "column '{}' is part of the primary key of '{table}'",
                        column.name
                    )));
                }
                if let Some(fk) = t.foreign_keys.iter().find(|f| f.columns.contains(&column.name)) {
                    return Err(AppError::Schema(format!(
                        "column '{}' on '{table}' is used by foreign key '{}'",
                        column.name, fk.name
                    )));
                }
                if let Some(ix) = indexed {
                    return Err(AppError::Schema(format!(
                        "column '{}' on '{table}' is used by index '{ix}'",
                        column.name
                    )));
                }
                t.columns.retain(|c| c.name != column.name);
            }
            Operation::AlterColumn { table, from, to } => {
                if from.name != to.name {
                    return Err(AppError::Schema(
                        "alter_column does not rename; old and new names must match".to_string(),
                    ));
                }
                let t = self.table_mut(table)?;
                let slot = t
                    .columns
                    .iter_mut()
                    .find(|c| c.name == from.name)
                    .ok_or_else(|| {
                        AppError::Schema(format!(
                            "column '{}' does not exist on '{table}'",
                            from.name
                        ))
                    })?;
                if *slot != *from {
                    return Err(AppError::Schema(format!(
                        "captured old definition of '{}.{}' does not match the snapshot",
                        table, from.name
                    )));
                }
                *slot = to.clone();
            }
            Operation::CreateIndex(def) => {
                if self.indexes.contains_key(&def.name) {
                    return Err(AppError::Schema(format!(
                        "index '{}' already exists",
                        def.name
                    )));
                }
                let t = self.table(&def.table)?;
                for c in &def.columns {
                    if !t.has_column(c) {
                        return Err(AppError::Schema(format!(
                            "index '{}' references missing column '{}.{c}'",
                            def.name, def.table
                        )));
                    }
                }
                self.indexes.insert(def.name.clone(), def.clone());
            }
            Operation::DropIndex(def) => {
                let current = self.indexes.get(&def.name).ok_or_else(|| {
                    AppError::Schema(format!("index '{}' does not exist", def.name))
                })?;
                if current != def {
                    return Err(AppError::Schema(format!(
                        "captured definition of index '{}' does not match the snapshot",
                        def.name
                    )));
                }
                self.indexes.remove(&def.name);
            }
            Operation::AddForeignKey { table, foreign_key } => {
                let t = self.table_mut(table)?;
                if t.foreign_keys.iter().any(|f| f.name == foreign_key.name) {
                    return Err(AppError::Schema(format!(
                        "foreign key '{}' already exists on '{table}'",
                        foreign_key.name
                    )));
                }
                t.foreign_keys.push(foreign_key.clone());
            }
            Operation::DropForeignKey { table, foreign_key } => {
                let t = self.table_mut(table)?;
                let pos = t
                    .foreign_keys
                    .iter()
                    .position(|f| f.name == foreign_key.name && f == foreign_key)
                    .ok_or_else(|| {
                        AppError::Schema(format!(
                            "foreign key '{}' does not match any constraint on '{table}'",
                            foreign_key.name
                        ))
                    })?;
                t.foreign_keys.remove(pos);
            }
            Operation::SetPrimaryKey { table, from, to } => {
                let t = self.table_mut(table)?;
                if t.primary_key != *from {
                    return Err(AppError::Schema(format!(
                        "captured primary key of '{table}' does not match the snapshot"
                    )));
                }
                for name in to {
                    let col = t.columns.iter_mut().find(|c| c.name == *name).ok_or_else(|| {
                        AppError::Schema(format!("primary key column '{name}' missing on '{table}'"))
                    })?;
                    col.nullable = false;
                }
                t.primary_key = to.clone();
            }
            Operation::Backfill { table, column, .. } => {
                let t = self.table(table)?;
                if !t.has_column(column) {
                    return Err(AppError::Schema(format!(
                        "cannot backfill missing column '{table}.{column}'"
                    )));
                }
                // Data-only; no schema change.
            }
        }
        Ok(())
    }

    fn table_mut(&mut self, name: &str) -> AppResult<&mut TableDef> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| AppError::Schema(format!("unknown table '{name}'")))
    }

    /// Structural diff against `other`. Empty result means the snapshots are
    /// identical in tables, columns, types, defaults, primary keys, foreign
    /// keys and indexes. Foreign keys compare by shape, not name, because
    /// SQLite introspection cannot report constraint names.
    pub fn diff(&self, other: &Snapshot) -> Vec<String> {
        let mut out = Vec::new();

        for name in self.tables.keys() {
            if !other.tables.contains_key(name) {
                out.push(format!("table '{name}' missing on right side"));
            }
        }
        for name in other.tables.keys() {
            if !self.tables.contains_key(name) {
                out.push(format!("table '{name}' missing on left side"));
            }
        }

        for (name, left) in &self.tables {
            let Some(right) = other.tables.get(name) else {
                continue;
            };
            diff_table(left, right, &mut out);
        }

        for (name, left) in &self.indexes {
            match other.indexes.get(name) {
                None => out.push(format!("index '{name}' missing on right side")),
                Some(right) if left != right => out.push(format!(
                    "index '{name}' differs: {left:?} vs {right:?}"
                )),
                _ => {}
            }
        }
        for name in other.indexes.keys() {
            if !self.indexes.contains_key(name) {
                out.push(format!("index '{name}' missing on left side"));
            }
        }

        out
    }
}

fn diff_table(left: &TableDef, right: &TableDef, out: &mut Vec<String>) {
    let name = &left.name;

    for c in &left.columns {
        match right.column(&c.name) {
            None => out.push(format!("table '{name}': column '{}' missing on right side", c.name)),
            Some(r) => {
                if c.ty != r.ty {
                    out.push(format!(
                        "table '{name}': column '{}' type {} vs {}",
                        c.name,
                        c.ty.sql(),
                        r.ty.sql()
                    ));
                }
                if c.nullable != r.nullable {
                    out.push(format!(
                        "table '{name}': column '{}' nullable {} vs {}",
                        c.name, c.nullable, r.nullable
                    ));
                }
                if c.default_literal() != r.default_literal() {
                    out.push(format!(
                        "table '{name}': column '{}' default {:?} vs {:?}",
                        c.name,
                        c.default_literal(),
                        r.default_literal()
                    ));
                }
            }
        }
    }
    for c in &right.columns {
        if left.column(&c.name).is_none() {
            out.push(format!("table '{name}': column '{}' missing on left side", c.name));
        }
    }

    if left.primary_key != right.primary_key {
        out.push(format!(
            "table '{name}': primary key {:?} vs {:?}",
            left.primary_key, right.primary_key
        ));
    }

    let mut l_fks: Vec<_> = left.foreign_keys.iter().map(ForeignKeyShape::of).collect();
    let mut r_fks: Vec<_> = right.foreign_keys.iter().map(ForeignKeyShape::of).collect();
    l_fks.sort();
    r_fks.sort();
    if l_fks != r_fks {
        out.push(format!(
            "table '{name}': foreign keys {l_fks:?} vs {r_fks:?}"
        ));
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct ForeignKeyShape {
    columns: Vec<String>,
    ref_table: String,
    ref_columns: Vec<String>,
    on_delete: String,
}

impl ForeignKeyShape {
    fn of(fk: &crate::schema::ForeignKeyDef) -> Self {
        Self {
            columns: fk.columns.clone(),
            ref_table: fk.ref_table.clone(),
            ref_columns: fk.ref_columns.clone(),
            on_delete: fk.on_delete.sql().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{integer, varchar, ForeignKeyDef, IndexDef, OnDelete, TableDef};

    fn claims() -> TableDef {
        TableDef::new("claims")
            .columns(vec![integer("id"), varchar("employee_id", 36)])
            .primary_key(&["id"])
            .foreign_key(ForeignKeyDef::new(
                "fk_claims_employees",
                &["employee_id"],
                "employees",
                &["id"],
                OnDelete::Cascade,
            ))
    }

    #[test]
    fn create_then_duplicate_create_fails() {
        let mut snap = Snapshot::empty();
        snap.apply(&Operation::CreateTable(claims())).unwrap();
        let err = snap.apply(&Operation::CreateTable(claims())).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn drop_table_requires_indexes_gone_first() {
        let mut snap = Snapshot::empty();
        snap.apply(&Operation::CreateTable(claims())).unwrap();
        let ix = IndexDef::new("ix_claims_employee_id", "claims", &["employee_id"]);
        snap.apply(&Operation::CreateIndex(ix.clone())).unwrap();

        let err = snap.apply(&Operation::DropTable(claims())).unwrap_err();
        assert!(err.to_string().contains("ix_claims_employee_id"));

        snap.apply(&Operation::DropIndex(ix)).unwrap();
        snap.apply(&Operation::DropTable(claims())).unwrap();
        assert!(snap.tables.is_empty());
    }

    #[test]
    fn alter_column_verifies_captured_old_definition() {
        let mut snap = Snapshot::empty();
        snap.apply(&Operation::CreateTable(claims())).unwrap();

        let err = snap
            .apply(&Operation::AlterColumn {
                table: "claims".to_string(),
                from: varchar("employee_id", 40), // wrong capture
                to: varchar("employee_id", 40).nullable(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn drop_column_guards_foreign_keys() {
        let mut snap = Snapshot::empty();
        snap.apply(&Operation::CreateTable(claims())).unwrap();
        let err = snap
            .apply(&Operation::DropColumn {
                table: "claims".to_string(),
                column: varchar("employee_id", 36),
            })
            .unwrap_err();
        assert!(err.to_string().contains("foreign key"));
    }

    #[test]
    fn pk_prefix_counts_as_index_coverage() {
        let mut snap = Snapshot::empty();
        let t = TableDef::new("claim_details")
            .columns(vec![integer("claim_id"), integer("claim_type_id")])
            .primary_key(&["claim_id", "claim_type_id"]);
        snap.apply(&Operation::CreateTable(t)).unwrap();
        assert!(snap.is_indexed("claim_details", &["claim_id".to_string()]));
        assert!(!snap.is_indexed("claim_details", &["claim_type_id".to_string()]));
    }

    #[test]
    fn diff_reports_column_and_fk_changes() {
        let mut a = Snapshot::empty();
        a.apply(&Operation::CreateTable(claims())).unwrap();

        let mut b = a.clone();
        b.apply(&Operation::AlterColumn {
            table: "claims".to_string(),
            from: varchar("employee_id", 36),
            to: varchar("employee_id", 36).nullable(),
        })
        .unwrap();

        let diff = a.diff(&b);
        assert_eq!(diff.len(), 1);
        assert!(diff[0].contains("nullable"));
        assert!(a.diff(&a.clone()).is_empty());
    }
}
