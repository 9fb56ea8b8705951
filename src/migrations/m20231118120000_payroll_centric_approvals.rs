//! Second-generation approval workflow, re-centered on payroll. The generic
//! approver/subject table tied to claims and salaries goes away, along with
//! the salaries table the payroll records replaced.

use crate::migrate::{Migration, Operation};
use crate::migrations::m20230901100000_initial_schema as initial;
use crate::schema::{
    datetime, integer, text, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef,
};

pub fn migration() -> Migration {
    let mut ops: Vec<Operation> = initial::approvals_v1_indexes()
        .into_iter()
        .map(Operation::DropIndex)
        .collect();
    ops.extend(vec![
        Operation::DropTable(initial::approvals_v1()),
        Operation::DropIndex(initial::salaries_index()),
        Operation::DropTable(initial::salaries()),
        Operation::CreateTable(approvals_v2()),
        Operation::CreateIndex(IndexDef::new(
            "ix_approvals_payroll_id",
            "approvals",
            &["payroll_id"],
        )),
        Operation::CreateIndex(IndexDef::new(
            "ix_approvals_employee_id",
            "approvals",
            &["employee_id"],
        )),
    ]);
    Migration::new("20231118120000_payroll_centric_approvals", ops).lossy(
        "first-generation approvals and all salaries rows are dropped; \
         Down recreates both tables empty",
    )
}

/// One action-taker, one payroll. The employee reference is NoAction so an
/// approver's history never blocks their own record keeping, while the
/// payroll cascade removes approvals with the payroll they sign off.
fn approvals_v2() -> TableDef {
    TableDef::new("approvals")
        .columns(vec![
            integer("id"),
            integer("payroll_id"),
            varchar("employee_id", 36),
            varchar("action", 30),
            varchar("action_by", 100),
            varchar("status", 20).default_value(DefaultValue::text("Pending")),
            text("remarks").nullable(),
            datetime("acted_at").nullable(),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_payrolls_payroll_id",
            &["payroll_id"],
            "payrolls",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::NoAction,
        ))
}
