// src/schema/introspect.rs
//
// Reads the live SQLite schema into a `Snapshot` via pragma queries, for
// diffing against the folded migration history. Constraint names are not
// recoverable from pragmas, so foreign keys come back nameless and diffs
// compare them structurally.

use std::collections::BTreeMap;

use sqlx::{Row, SqlitePool};

use crate::errors::{AppError, AppResult};
use crate::migrate::LEDGER_TABLE;
use crate::schema::{
    ColumnDef, ColumnType, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, Snapshot, TableDef,
};

/// Identifiers are interpolated into pragma statements (pragmas cannot take
/// bound parameters), so reject anything that is not a plain identifier.
fn check_ident(name: &str) -> AppResult<()> {
    if !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        Ok(())
    } else {
        Err(AppError::Schema(format!("suspicious identifier '{name}'")))
    }
}

pub async fn snapshot(pool: &SqlitePool) -> AppResult<Snapshot> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name <> ?1 \
         ORDER BY name",
    )
    .bind(LEDGER_TABLE)
    .fetch_all(pool)
    .await?;

    let mut tables = BTreeMap::new();
    let mut indexes = BTreeMap::new();

    for name in names {
        check_ident(&name)?;
        let table = read_table(pool, &name).await?;
        for ix in read_indexes(pool, &name).await? {
            indexes.insert(ix.name.clone(), ix);
        }
        tables.insert(name, table);
    }

    Ok(Snapshot { tables, indexes })
}

async fn read_table(pool: &SqlitePool, name: &str) -> AppResult<TableDef> {
    let mut def = TableDef::new(name);

    let rows = sqlx::query(&format!("PRAGMA table_info(\"{name}\")"))
        .fetch_all(pool)
        .await?;

    // pk ordinal -> column name, for composite key ordering
    let mut pk: Vec<(i64, String)> = Vec::new();

    for row in rows {
        let col_name: String = row.try_get("name")?;
        let declared: String = row.try_get("type")?;
        let notnull: i64 = row.try_get("notnull")?;
        let dflt: Option<String> = row.try_get("dflt_value")?;
        let pk_ord: i64 = row.try_get("pk")?;

        let ty = ColumnType::parse(&declared).ok_or_else(|| {
            AppError::Schema(format!(
                "table '{name}': unrecognized declared type '{declared}' on column '{col_name}'"
            ))
        })?;

        let mut column = ColumnDef::new(&col_name, ty);
        column.nullable = notnull == 0;
        column.default = dflt.as_deref().map(DefaultValue::parse);

        if pk_ord > 0 {
            pk.push((pk_ord, col_name.clone()));
        }
        def.columns.push(column);
    }

    pk.sort();
    def.primary_key = pk.into_iter().map(|(_, c)| c).collect();
    def.foreign_keys = read_foreign_keys(pool, name).await?;

    Ok(def)
}

async fn read_foreign_keys(pool: &SqlitePool, table: &str) -> AppResult<Vec<ForeignKeyDef>> {
    let rows = sqlx::query(&format!("PRAGMA foreign_key_list(\"{table}\")"))
        .fetch_all(pool)
        .await?;

    // Rows of a composite FK share an id and are ordered by seq.
    let mut grouped: BTreeMap<i64, ForeignKeyDef> = BTreeMap::new();

    for row in rows {
        let id: i64 = row.try_get("id")?;
        let ref_table: String = row.try_get("table")?;
        let from: String = row.try_get("from")?;
        let to: Option<String> = row.try_get("to")?;
        let on_delete: String = row.try_get("on_delete")?;

        let to = to.ok_or_else(|| {
            AppError::Schema(format!(
                "table '{table}': foreign key on '{from}' omits target columns"
            ))
        })?;
        let action = OnDelete::parse(&on_delete).ok_or_else(|| {
            AppError::Schema(format!(
                "table '{table}': unrecognized ON DELETE action '{on_delete}'"
            ))
        })?;

        let entry = grouped.entry(id).or_insert_with(|| ForeignKeyDef {
            name: String::new(),
            columns: Vec::new(),
            ref_table,
            ref_columns: Vec::new(),
            on_delete: action,
        });
        entry.columns.push(from);
        entry.ref_columns.push(to);
    }

    // foreign_key_list reports constraints in reverse declaration order;
    // shape-level diffing does not care, but keep it deterministic.
    let mut fks: Vec<ForeignKeyDef> = grouped.into_values().collect();
    fks.sort_by(|a, b| a.columns.cmp(&b.columns));
    Ok(fks)
}

async fn read_indexes(pool: &SqlitePool, table: &str) -> AppResult<Vec<IndexDef>> {
    let rows = sqlx::query(&format!("PRAGMA index_list(\"{table}\")"))
        .fetch_all(pool)
        .await?;

    let mut out = Vec::new();
    for row in rows {
        let name: String = row.try_get("name")?;
        let unique: i64 = row.try_get("unique")?;
        let origin: String = row.try_get("origin")?;

        // 'c' = explicitly created; skip pk/unique autoindexes.
        if origin != "c" {
            continue;
        }
        check_ident(&name)?;

        let cols = sqlx::query(&format!("PRAGMA index_info(\"{name}\")"))
            .fetch_all(pool)
            .await?;
        let mut columns: Vec<(i64, String)> = Vec::new();
        for c in cols {
            let seqno: i64 = c.try_get("seqno")?;
            let col: Option<String> = c.try_get("name")?;
            let col = col.ok_or_else(|| {
                AppError::Schema(format!("index '{name}' uses an expression column"))
            })?;
            columns.push((seqno, col));
        }
        columns.sort();

        out.push(IndexDef {
            name,
            table: table.to_string(),
            columns: columns.into_iter().map(|(_, c)| c).collect(),
            unique: unique != 0,
        });
    }
    Ok(out)
}
