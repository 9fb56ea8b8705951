// src/schema/ddl.rs
//
// Pure SQLite DDL rendering. The migration planner decides which statements
// to emit; nothing here touches a connection.

use crate::schema::{ColumnDef, IndexDef, TableDef};

fn quote(ident: &str) -> String {
    format!("\"{ident}\"")
}

fn column_sql(c: &ColumnDef, inline_pk: bool) -> String {
    let mut s = format!("{} {}", quote(&c.name), c.ty.sql());
    if !c.nullable {
        s.push_str(" NOT NULL");
    }
    if inline_pk {
        s.push_str(" PRIMARY KEY AUTOINCREMENT");
    }
    if let Some(lit) = c.default_literal() {
        s.push_str(" DEFAULT ");
        s.push_str(&lit);
    }
    s
}

/// Render a full CREATE TABLE statement. A single integer primary key is
/// rendered inline as a rowid alias with AUTOINCREMENT; composite or string
/// keys become a table-level PRIMARY KEY constraint.
pub fn create_table(def: &TableDef) -> String {
    create_table_named(def, &def.name)
}

fn create_table_named(def: &TableDef, name: &str) -> String {
    let rowid_pk = def.has_rowid_pk();
    let mut parts: Vec<String> = def
        .columns
        .iter()
        .map(|c| column_sql(c, rowid_pk && def.primary_key[0] == c.name))
        .collect();

    if !rowid_pk && !def.primary_key.is_empty() {
        let cols: Vec<String> = def.primary_key.iter().map(|c| quote(c)).collect();
        parts.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    for fk in &def.foreign_keys {
        let cols: Vec<String> = fk.columns.iter().map(|c| quote(c)).collect();
        let refs: Vec<String> = fk.ref_columns.iter().map(|c| quote(c)).collect();
        parts.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON DELETE {}",
            quote(&fk.name),
            cols.join(", "),
            quote(&fk.ref_table),
            refs.join(", "),
            fk.on_delete.sql()
        ));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote(name),
        parts.join(",\n    ")
    )
}

pub fn drop_table(name: &str) -> String {
    format!("DROP TABLE {}", quote(name))
}

pub fn create_index(def: &IndexDef) -> String {
    let cols: Vec<String> = def.columns.iter().map(|c| quote(c)).collect();
    format!(
        "CREATE {}INDEX {} ON {} ({})",
        if def.unique { "UNIQUE " } else { "" },
        quote(&def.name),
        quote(&def.table),
        cols.join(", ")
    )
}

pub fn drop_index(name: &str) -> String {
    format!("DROP INDEX {}", quote(name))
}

/// `ALTER TABLE ... ADD COLUMN`, legal only for nullable columns or columns
/// with a constant default.
pub fn add_column(table: &str, column: &ColumnDef) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote(table),
        column_sql(column, false)
    )
}

pub fn backfill(table: &str, column: &str, literal: &str) -> String {
    format!(
        "UPDATE {} SET {c} = {literal} WHERE {c} IS NULL",
        quote(table),
        c = quote(column)
    )
}

/// The SQLite table-rebuild workflow for changes ALTER TABLE cannot express
/// (column type changes, primary-key changes, dropping constrained columns,
/// adding or dropping foreign keys). Runs with foreign key enforcement off;
/// the runner checks `foreign_key_check` before commit.
///
/// `shared` is the column intersection whose data survives; `indexes` are the
/// post-state indexes on the table, recreated because DROP TABLE removed them.
pub fn rebuild_table(
    target: &TableDef,
    shared: &[String],
    indexes: &[&IndexDef],
) -> Vec<String> {
    let scratch = format!("{}__rebuild", target.name);
    let cols: Vec<String> = shared.iter().map(|c| quote(c)).collect();

    let mut stmts = vec![create_table_named(target, &scratch)];
    if !shared.is_empty() {
        stmts.push(format!(
            "INSERT INTO {} ({cols}) SELECT {cols} FROM {}",
            quote(&scratch),
            quote(&target.name),
            cols = cols.join(", ")
        ));
    }
    stmts.push(drop_table(&target.name));
    stmts.push(format!(
        "ALTER TABLE {} RENAME TO {}",
        quote(&scratch),
        quote(&target.name)
    ));
    for ix in indexes {
        stmts.push(create_index(ix));
    }
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{integer, money, varchar, DefaultValue, ForeignKeyDef, OnDelete, TableDef};

    fn claims() -> TableDef {
        TableDef::new("claims")
            .columns(vec![
                integer("id"),
                varchar("employee_id", 36),
                money("amount").default_value(DefaultValue::Integer(0)),
                varchar("status", 20).default_value(DefaultValue::text("Pending")),
            ])
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
    fn create_table_renders_inline_rowid_pk_and_fk() {
        let sql = create_table(&claims());
        assert!(sql.contains("\"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("\"status\" VARCHAR(20) NOT NULL DEFAULT 'Pending'"));
        assert!(sql.contains("\"amount\" DECIMAL(18,2) NOT NULL DEFAULT 0"));
        assert!(sql.contains(
            "CONSTRAINT \"fk_claims_employees\" FOREIGN KEY (\"employee_id\") REFERENCES \"employees\" (\"id\") ON DELETE CASCADE"
        ));
        assert!(!sql.contains("PRIMARY KEY ("));
    }

    #[test]
    fn create_table_renders_table_level_pk_for_string_keys() {
        let t = TableDef::new("employees")
            .columns(vec![varchar("id", 36), varchar("full_name", 100)])
            .primary_key(&["id"]);
        let sql = create_table(&t);
        assert!(sql.contains("PRIMARY KEY (\"id\")"));
        assert!(!sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn rebuild_copies_shared_columns_and_recreates_indexes() {
        let ix = crate::schema::IndexDef::new("ix_claims_employee_id", "claims", &["employee_id"]);
        let stmts = rebuild_table(
            &claims(),
            &["id".to_string(), "employee_id".to_string()],
            &[&ix],
        );
        assert_eq!(stmts.len(), 5);
        assert!(stmts[0].starts_with("CREATE TABLE \"claims__rebuild\""));
        assert_eq!(
            stmts[1],
            "INSERT INTO \"claims__rebuild\" (\"id\", \"employee_id\") SELECT \"id\", \"employee_id\" FROM \"claims\""
        );
        assert_eq!(stmts[2], "DROP TABLE \"claims\"");
        assert_eq!(stmts[3], "ALTER TABLE \"claims__rebuild\" RENAME TO \"claims\"");
        assert!(stmts[4].starts_with("CREATE INDEX \"ix_claims_employee_id\""));
    }

    #[test]
    fn backfill_targets_only_null_rows() {
        assert_eq!(
            backfill("employees", "ic", "'000000-00-0000'"),
            "UPDATE \"employees\" SET \"ic\" = '000000-00-0000' WHERE \"ic\" IS NULL"
        );
    }
}
