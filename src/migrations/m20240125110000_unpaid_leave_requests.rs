//! Unpaid leave requests. Kept separate from the leaves ledger because they
//! carry their own review trail and an excess-days figure that only exists
//! once the paid entitlement is exhausted.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    date, datetime, double, integer, text, varchar, DefaultValue, ForeignKeyDef, IndexDef,
    OnDelete, TableDef,
};

pub fn migration() -> Migration {
    let table = TableDef::new("unpaid_leave_requests")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            integer("leave_type_id"),
            date("start_date"),
            date("end_date"),
            double("excess_days").default_value(DefaultValue::Integer(0)),
            text("reason").nullable(),
            varchar("status", 20).default_value(DefaultValue::text("Pending")),
            datetime("requested_at").default_value(DefaultValue::Now),
            varchar("reviewed_by", 36).nullable(),
            datetime("reviewed_at").nullable(),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_unpaid_leave_requests_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_unpaid_leave_requests_leave_types_leave_type_id",
            &["leave_type_id"],
            "leave_types",
            &["id"],
            OnDelete::Restrict,
        ));
    Migration::new(
        "20240125110000_unpaid_leave_requests",
        vec![
            Operation::CreateTable(table),
            Operation::CreateIndex(IndexDef::new(
                "ix_unpaid_leave_requests_employee_id",
                "unpaid_leave_requests",
                &["employee_id"],
            )),
            Operation::CreateIndex(IndexDef::new(
                "ix_unpaid_leave_requests_leave_type_id",
                "unpaid_leave_requests",
                &["leave_type_id"],
            )),
        ],
    )
}
