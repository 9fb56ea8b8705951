// src/migrate/validator.rs
//
// Design-time checks run over every migration before it can be applied (the
// registry runs them at load, so an inconsistent migration never reaches a
// database). The snapshot fold already guards structural preconditions;
// this layer asserts the authoring rules that folds alone cannot see.

use std::collections::HashSet;

use crate::migrate::{Migration, Operation};
use crate::schema::{ColumnDef, ForeignKeyDef, OnDelete, Snapshot, TableDef};

/// Validate `migration` against the snapshot it would apply to. Returns every
/// issue found, not just the first.
pub fn validate(before: &Snapshot, migration: &Migration) -> Vec<String> {
    let mut issues = Vec::new();
    let mut snap = before.clone();

    // Columns backfilled earlier in this migration, eligible for tightening.
    let mut backfilled: HashSet<(String, String)> = HashSet::new();
    // Tables created by this migration are empty, so required columns may be
    // added to them without a backfill.
    let mut created: HashSet<String> = HashSet::new();

    for op in &migration.up {
        match op {
            Operation::CreateTable(def) => {
                check_table(def, &snap, &mut issues);
                created.insert(def.name.clone());
            }
            Operation::AddColumn { table, column } => {
                if !column.nullable && column.default.is_none() && !created.contains(table) {
                    issues.push(format!(
                        "{}: adding required column '{}.{}' without a default; \
                         add it nullable, backfill existing rows, then tighten",
                        migration.id, table, column.name
                    ));
                }
            }
            Operation::AlterColumn { table, from, to } => {
                let tightens = from.nullable && !to.nullable;
                let covered = backfilled.contains(&(table.clone(), to.name.clone()))
                    || to.default.is_some()
                    || created.contains(table);
                if tightens && !covered {
                    issues.push(format!(
                        "{}: tightening '{}.{}' to NOT NULL without a backfill step \
                         in the same migration",
                        migration.id, table, to.name
                    ));
                }
            }
            Operation::AddForeignKey { table, foreign_key } => {
                check_foreign_key(table, foreign_key, column_defs(&snap, table), &snap, &mut issues);
            }
            Operation::Backfill { table, column, .. } => {
                // Sentinel backfills are allowed; the rows they produce are
                // operator-review material, surfaced at the service layer.
                backfilled.insert((table.clone(), column.clone()));
            }
            _ => {}
        }

        if let Err(e) = snap.apply(op) {
            issues.push(format!("{}: {e}", migration.id));
            // The fold is now unreliable; later checks would cascade noise.
            return issues;
        }
    }

    // After the whole migration folds, every foreign key's referencing side
    // must be covered by an index (or primary-key prefix).
    for table in snap.tables.values() {
        for fk in &table.foreign_keys {
            if !snap.is_indexed(&table.name, &fk.columns) {
                issues.push(format!(
                    "{}: foreign key '{}' on '{}' has no covering index on ({})",
                    migration.id,
                    fk.name,
                    table.name,
                    fk.columns.join(", ")
                ));
            }
        }
    }

    issues
}

fn column_defs<'a>(snap: &'a Snapshot, table: &str) -> Option<&'a TableDef> {
    snap.tables.get(table)
}

fn check_table(def: &TableDef, snap: &Snapshot, issues: &mut Vec<String>) {
    let mut seen = HashSet::new();
    for c in &def.columns {
        if !seen.insert(c.name.as_str()) {
            issues.push(format!(
                "table '{}': duplicate column '{}'",
                def.name, c.name
            ));
        }
    }
    for pk in &def.primary_key {
        if !def.has_column(pk) {
            issues.push(format!(
                "table '{}': primary key names missing column '{pk}'",
                def.name
            ));
        }
    }
    for fk in &def.foreign_keys {
        check_foreign_key(&def.name, fk, Some(def), snap, issues);
    }
}

/// FK target must exist (self-references allowed) with the referenced columns
/// forming its primary key; SET NULL requires nullable referencing columns.
fn check_foreign_key(
    table: &str,
    fk: &ForeignKeyDef,
    owner: Option<&TableDef>,
    snap: &Snapshot,
    issues: &mut Vec<String>,
) {
    let target = if fk.ref_table == table {
        owner
    } else {
        snap.tables.get(&fk.ref_table)
    };
    match target {
        None => issues.push(format!(
            "foreign key '{}' on '{table}' references unknown table '{}'",
            fk.name, fk.ref_table
        )),
        Some(t) => {
            for c in &fk.ref_columns {
                if !t.has_column(c) {
                    issues.push(format!(
                        "foreign key '{}' on '{table}' references missing column '{}.{c}'",
                        fk.name, fk.ref_table
                    ));
                }
            }
            if t.primary_key != fk.ref_columns {
                issues.push(format!(
                    "foreign key '{}' on '{table}' must reference the primary key of '{}'",
                    fk.name, fk.ref_table
                ));
            }
        }
    }

    if fk.on_delete == OnDelete::SetNull {
        let nullable = |c: &str| -> bool {
            owner
                .and_then(|t| t.column(c))
                .map(|c: &ColumnDef| c.nullable)
                .unwrap_or(false)
        };
        for c in &fk.columns {
            if !nullable(c) {
                issues.push(format!(
                    "foreign key '{}' on '{table}': SET NULL requires nullable column '{c}'",
                    fk.name
                ));
            }
        }
    }

    if fk.columns.len() != fk.ref_columns.len() {
        issues.push(format!(
            "foreign key '{}' on '{table}': column count mismatch",
            fk.name
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::Migration;
    use crate::schema::{integer, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef};

    fn base() -> Snapshot {
        let mut snap = Snapshot::empty();
        snap.apply(&Operation::CreateTable(
            TableDef::new("employees")
                .columns(vec![varchar("id", 36), varchar("full_name", 100)])
                .primary_key(&["id"]),
        ))
        .unwrap();
        snap
    }

    #[test]
    fn required_column_without_default_is_rejected_on_existing_table() {
        let m = Migration::new(
            "20240101000000_bad_add",
            vec![Operation::AddColumn {
                table: "employees".to_string(),
                column: varchar("confirmation_status", 20),
            }],
        );
        let issues = validate(&base(), &m);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("backfill"));
    }

    #[test]
    fn nullable_add_backfill_tighten_is_accepted() {
        let m = Migration::new(
            "20240101000000_good_add",
            vec![
                Operation::AddColumn {
                    table: "employees".to_string(),
                    column: varchar("confirmation_status", 20).nullable(),
                },
                Operation::Backfill {
                    table: "employees".to_string(),
                    column: "confirmation_status".to_string(),
                    value: DefaultValue::text("Pending"),
                },
                Operation::AlterColumn {
                    table: "employees".to_string(),
                    from: varchar("confirmation_status", 20).nullable(),
                    to: varchar("confirmation_status", 20),
                },
            ],
        );
        assert!(validate(&base(), &m).is_empty());
    }

    #[test]
    fn tightening_without_backfill_is_rejected() {
        let mut snap = base();
        snap.apply(&Operation::AddColumn {
            table: "employees".to_string(),
            column: varchar("ic", 14).nullable(),
        })
        .unwrap();
        let m = Migration::new(
            "20240101000000_tighten",
            vec![Operation::AlterColumn {
                table: "employees".to_string(),
                from: varchar("ic", 14).nullable(),
                to: varchar("ic", 14),
            }],
        );
        let issues = validate(&snap, &m);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("NOT NULL"));
    }

    #[test]
    fn fk_must_reference_primary_key_and_be_indexed() {
        let m = Migration::new(
            "20240101000000_claims",
            vec![Operation::CreateTable(
                TableDef::new("claims")
                    .columns(vec![integer("id"), varchar("employee_id", 36)])
                    .primary_key(&["id"])
                    .foreign_key(ForeignKeyDef::new(
                        "fk_claims_employees",
                        &["employee_id"],
                        "employees",
                        &["full_name"],
                        OnDelete::Cascade,
                    )),
            )],
        );
        let issues = validate(&base(), &m);
        assert!(issues.iter().any(|i| i.contains("primary key")));
        assert!(issues.iter().any(|i| i.contains("no covering index")));
    }

    #[test]
    fn fk_with_covering_index_created_later_in_migration_passes() {
        let m = Migration::new(
            "20240101000000_claims",
            vec![
                Operation::CreateTable(
                    TableDef::new("claims")
                        .columns(vec![integer("id"), varchar("employee_id", 36)])
                        .primary_key(&["id"])
                        .foreign_key(ForeignKeyDef::new(
                            "fk_claims_employees",
                            &["employee_id"],
                            "employees",
                            &["id"],
                            OnDelete::Cascade,
                        )),
                ),
                Operation::CreateIndex(IndexDef::new(
                    "ix_claims_employee_id",
                    "claims",
                    &["employee_id"],
                )),
            ],
        );
        assert!(validate(&base(), &m).is_empty());
    }

    #[test]
    fn set_null_requires_nullable_column() {
        let m = Migration::new(
            "20240101000000_badnull",
            vec![Operation::CreateTable(
                TableDef::new("claims")
                    .columns(vec![integer("id"), varchar("employee_id", 36)])
                    .primary_key(&["id"])
                    .foreign_key(ForeignKeyDef::new(
                        "fk_claims_employees",
                        &["employee_id"],
                        "employees",
                        &["id"],
                        OnDelete::SetNull,
                    )),
            )],
        );
        let issues = validate(&base(), &m);
        assert!(issues.iter().any(|i| i.contains("SET NULL")));
    }

    #[test]
    fn unknown_reference_target_is_reported() {
        let m = Migration::new(
            "20240101000000_orphan",
            vec![Operation::CreateTable(
                TableDef::new("claims")
                    .columns(vec![integer("id"), integer("claim_type_id")])
                    .primary_key(&["id"])
                    .foreign_key(ForeignKeyDef::new(
                        "fk_claims_types",
                        &["claim_type_id"],
                        "claim_types",
                        &["id"],
                        OnDelete::Restrict,
                    )),
            )],
        );
        let issues = validate(&base(), &m);
        assert!(issues.iter().any(|i| i.contains("unknown table 'claim_types'")));
    }
}
