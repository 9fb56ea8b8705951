// src/migrate/runner.rs
//
// Applies and reverts migrations against the store. Each migration runs
// all-or-nothing inside one transaction; rebuild statements run with foreign
// key enforcement off and a `foreign_key_check` gate before commit, which is
// SQLite's documented ALTER workflow.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::errors::{AppError, AppResult};
use crate::migrate::{validator, Migration, MigrationId, LEDGER_TABLE};
use crate::schema::{introspect, Snapshot};

/// Nominal product version recorded beside each applied migration.
pub const PRODUCT_VERSION: &str = env!("CARGO_PKG_VERSION");

enum LedgerChange<'a> {
    Apply(&'a MigrationId),
    Revert(&'a MigrationId),
}

#[derive(Debug)]
pub struct Migrator {
    registry: Vec<Migration>,
    /// `fold_points[n]` is the snapshot after the first `n` migrations;
    /// `fold_points[0]` is the empty schema. Computed once at load, after
    /// validating every migration against its predecessor state.
    fold_points: Vec<Snapshot>,
}

impl Migrator {
    pub fn new(registry: Vec<Migration>) -> AppResult<Self> {
        for pair in registry.windows(2) {
            if pair[0].id >= pair[1].id {
                return Err(AppError::MigrationOrdering(format!(
                    "registry is not strictly increasing: '{}' precedes '{}'",
                    pair[0].id, pair[1].id
                )));
            }
        }

        let mut fold_points = vec![Snapshot::empty()];
        for (n, migration) in registry.iter().enumerate() {
            let before = fold_points[n].clone();
            let issues = validator::validate(&before, migration);
            if !issues.is_empty() {
                return Err(AppError::SchemaValidation(issues));
            }
            let mut after = before;
            for op in &migration.up {
                after.apply(op)?;
            }
            fold_points.push(after);
        }

        Ok(Self {
            registry,
            fold_points,
        })
    }

    pub fn registry(&self) -> &[Migration] {
        &self.registry
    }

    /// Snapshot after the first `n` migrations.
    pub fn snapshot_at(&self, n: usize) -> &Snapshot {
        &self.fold_points[n]
    }

    /// The final recorded model snapshot: the fold of the whole history.
    pub fn final_snapshot(&self) -> &Snapshot {
        &self.fold_points[self.registry.len()]
    }

    async fn ensure_ledger(&self, pool: &SqlitePool) -> AppResult<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS \"{LEDGER_TABLE}\" (\n\
             \x20   \"migration_id\" TEXT NOT NULL PRIMARY KEY,\n\
             \x20   \"product_version\" TEXT NOT NULL,\n\
             \x20   \"applied_at\" DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP\n\
             )"
        ))
        .execute(pool)
        .await?;
        Ok(())
    }

    /// The applied-migrations ledger, in application order.
    pub async fn applied(&self, pool: &SqlitePool) -> AppResult<Vec<MigrationId>> {
        self.ensure_ledger(pool).await?;
        let ids: Vec<String> = sqlx::query_scalar(&format!(
            "SELECT migration_id FROM \"{LEDGER_TABLE}\" ORDER BY migration_id"
        ))
        .fetch_all(pool)
        .await?;
        ids.iter().map(|s| MigrationId::parse(s)).collect()
    }

    /// The applied set must be a prefix of the registry; anything else means
    /// the database was migrated by a diverged or newer history.
    fn check_prefix(&self, applied: &[MigrationId]) -> AppResult<usize> {
        if applied.len() > self.registry.len() {
            return Err(AppError::MigrationOrdering(format!(
                "ledger holds {} migrations but the registry only knows {}",
                applied.len(),
                self.registry.len()
            )));
        }
        for (i, id) in applied.iter().enumerate() {
            if self.registry[i].id != *id {
                return Err(AppError::MigrationOrdering(format!(
                    "ledger position {i} holds '{id}' but the registry expects '{}'",
                    self.registry[i].id
                )));
            }
        }
        Ok(applied.len())
    }

    pub async fn status(&self, pool: &SqlitePool) -> AppResult<Vec<(MigrationId, bool)>> {
        let applied = self.applied(pool).await?;
        let n = self.check_prefix(&applied)?;
        Ok(self
            .registry
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i < n))
            .collect())
    }

    /// Apply pending migrations, optionally stopping after `target`.
    /// Returns the number applied.
    pub async fn up(&self, pool: &SqlitePool, target: Option<&str>) -> AppResult<usize> {
        let applied = self.applied(pool).await?;
        let n = self.check_prefix(&applied)?;

        let stop = match target {
            None => self.registry.len(),
            Some(t) => {
                let pos = self
                    .registry
                    .iter()
                    .position(|m| m.id.as_str() == t)
                    .ok_or_else(|| {
                        AppError::MigrationOrdering(format!("unknown target migration '{t}'"))
                    })?;
                pos + 1
            }
        };

        for i in n..stop.max(n) {
            let migration = &self.registry[i];
            let stmts = self.plan_up(i)?;
            info!(id = %migration.id, statements = stmts.len(), "applying migration");
            self.execute(pool, &migration.id, &stmts, LedgerChange::Apply(&migration.id))
                .await?;
        }
        Ok(stop.saturating_sub(n))
    }

    /// Revert the last `steps` applied migrations. Lossy reverts proceed but
    /// are logged with their documented data-loss note.
    pub async fn down(&self, pool: &SqlitePool, steps: usize) -> AppResult<usize> {
        let applied = self.applied(pool).await?;
        let n = self.check_prefix(&applied)?;
        let take = steps.min(n);

        for k in 0..take {
            let i = n - 1 - k;
            let migration = &self.registry[i];
            if let Some(note) = migration.lossy {
                warn!(id = %migration.id, "lossy revert: {note}");
            }
            let stmts = self.plan_down(i)?;
            info!(id = %migration.id, statements = stmts.len(), "reverting migration");
            self.execute(pool, &migration.id, &stmts, LedgerChange::Revert(&migration.id))
                .await?;
        }
        Ok(take)
    }

    /// Diff the live schema against the fold at the applied point. Empty
    /// result means the database matches the recorded history exactly.
    pub async fn verify(&self, pool: &SqlitePool) -> AppResult<Vec<String>> {
        let applied = self.applied(pool).await?;
        let n = self.check_prefix(&applied)?;
        let live = introspect::snapshot(pool).await?;
        Ok(self.fold_points[n].diff(&live))
    }

    fn plan_up(&self, i: usize) -> AppResult<Vec<String>> {
        self.plan_ops(&self.registry[i].up, self.fold_points[i].clone(), None)
    }

    fn plan_down(&self, i: usize) -> AppResult<Vec<String>> {
        let ops = self.registry[i].down()?;
        self.plan_ops(
            &ops,
            self.fold_points[i + 1].clone(),
            Some((&self.registry[i].id, &self.fold_points[i])),
        )
    }

    /// Plan a statement batch by folding `ops` from `start`. When `expect` is
    /// given (reverts), the reached snapshot must equal the recorded prior
    /// fold point; `Down(Up(M))` being the identity is checked here, not
    /// assumed.
    fn plan_ops(
        &self,
        ops: &[crate::migrate::Operation],
        start: Snapshot,
        expect: Option<(&MigrationId, &Snapshot)>,
    ) -> AppResult<Vec<String>> {
        let mut snap = start;
        let mut stmts = Vec::new();
        for op in ops {
            let mut after = snap.clone();
            after.apply(op)?;
            stmts.extend(op.plan(&snap, &after)?);
            snap = after;
        }
        if let Some((id, expected)) = expect {
            let diff = snap.diff(expected);
            if !diff.is_empty() {
                return Err(AppError::MigrationFailed {
                    id: id.to_string(),
                    detail: format!(
                        "down does not restore the prior snapshot: {}",
                        diff.join("; ")
                    ),
                });
            }
        }
        Ok(stmts)
    }

    async fn execute(
        &self,
        pool: &SqlitePool,
        id: &MigrationId,
        stmts: &[String],
        ledger: LedgerChange<'_>,
    ) -> AppResult<()> {
        // Rebuild statements drop and recreate tables other tables reference;
        // enforcement must be off for the duration and is restored afterwards
        // on both success and failure. Pragmas are connection-scoped and the
        // pool is pinned to one connection.
        sqlx::query("PRAGMA foreign_keys = OFF").execute(pool).await?;
        let result = self.execute_in_tx(pool, id, stmts, ledger).await;
        let restored = sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await;
        result?;
        restored?;
        Ok(())
    }

    async fn execute_in_tx(
        &self,
        pool: &SqlitePool,
        id: &MigrationId,
        stmts: &[String],
        ledger: LedgerChange<'_>,
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        for stmt in stmts {
            sqlx::query(stmt)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::MigrationFailed {
                    id: id.to_string(),
                    detail: format!("statement `{stmt}` failed: {e}"),
                })?;
        }

        let violations = sqlx::query("PRAGMA foreign_key_check")
            .fetch_all(&mut *tx)
            .await?;
        if !violations.is_empty() {
            return Err(AppError::MigrationFailed {
                id: id.to_string(),
                detail: format!(
                    "foreign_key_check reported {} violating rows; rolled back",
                    violations.len()
                ),
            });
        }

        match ledger {
            LedgerChange::Apply(mid) => {
                sqlx::query(&format!(
                    "INSERT INTO \"{LEDGER_TABLE}\" (migration_id, product_version) VALUES (?1, ?2)"
                ))
                .bind(mid.as_str())
                .bind(PRODUCT_VERSION)
                .execute(&mut *tx)
                .await?;
            }
            LedgerChange::Revert(mid) => {
                sqlx::query(&format!(
                    "DELETE FROM \"{LEDGER_TABLE}\" WHERE migration_id = ?1"
                ))
                .bind(mid.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::{Migration, Operation};
    use crate::schema::{integer, varchar, TableDef};

    fn tiny_registry() -> Vec<Migration> {
        vec![
            Migration::new(
                "20240101000000_one",
                vec![Operation::CreateTable(
                    TableDef::new("a")
                        .columns(vec![integer("id")])
                        .primary_key(&["id"]),
                )],
            ),
            Migration::new(
                "20240102000000_two",
                vec![Operation::AddColumn {
                    table: "a".to_string(),
                    column: varchar("note", 50).nullable(),
                }],
            ),
        ]
    }

    #[test]
    fn registry_must_be_strictly_increasing() {
        let mut reg = tiny_registry();
        reg.swap(0, 1);
        let err = Migrator::new(reg).unwrap_err();
        assert!(matches!(err, AppError::MigrationOrdering(_)));
    }

    #[test]
    fn fold_points_accumulate() {
        let m = Migrator::new(tiny_registry()).unwrap();
        assert!(m.snapshot_at(0).tables.is_empty());
        assert!(!m.snapshot_at(1).tables["a"].has_column("note"));
        assert!(m.final_snapshot().tables["a"].has_column("note"));
    }

    #[test]
    fn prefix_check_rejects_divergence() {
        let m = Migrator::new(tiny_registry()).unwrap();
        let ok = vec![MigrationId::parse("20240101000000_one").unwrap()];
        assert_eq!(m.check_prefix(&ok).unwrap(), 1);

        let diverged = vec![MigrationId::parse("20240101000000_other").unwrap()];
        assert!(m.check_prefix(&diverged).is_err());

        let skipped = vec![MigrationId::parse("20240102000000_two").unwrap()];
        assert!(m.check_prefix(&skipped).is_err());
    }

    #[test]
    fn invalid_registry_migration_is_rejected_at_load() {
        let reg = vec![Migration::new(
            "20240101000000_bad",
            vec![Operation::AddColumn {
                table: "missing".to_string(),
                column: varchar("x", 10).nullable(),
            }],
        )];
        let err = Migrator::new(reg).unwrap_err();
        assert!(matches!(err, AppError::SchemaValidation(_)));
    }
}
