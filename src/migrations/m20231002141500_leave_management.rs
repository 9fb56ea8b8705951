//! Leave management: leave types, leave requests and supporting documents.
//! Day counts are whole integers here; fractional half-days arrive in
//! `20240110091500_fractional_leave_days`.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    boolean, date, datetime, integer, text, varchar, DefaultValue, ForeignKeyDef, IndexDef,
    OnDelete, TableDef,
};

pub fn migration() -> Migration {
    Migration::new(
        "20231002141500_leave_management",
        vec![
            Operation::CreateTable(leave_types()),
            Operation::CreateIndex(
                IndexDef::new("ux_leave_types_name", "leave_types", &["name"]).unique(),
            ),
            Operation::CreateTable(leaves()),
            Operation::CreateIndex(IndexDef::new("ix_leaves_employee_id", "leaves", &["employee_id"])),
            Operation::CreateIndex(IndexDef::new(
                "ix_leaves_leave_type_id",
                "leaves",
                &["leave_type_id"],
            )),
            Operation::CreateTable(leave_details()),
            Operation::CreateIndex(IndexDef::new(
                "ix_leave_details_leave_id",
                "leave_details",
                &["leave_id"],
            )),
            Operation::CreateIndex(IndexDef::new(
                "ix_leave_details_leave_type_id",
                "leave_details",
                &["leave_type_id"],
            )),
        ],
    )
}

fn leave_types() -> TableDef {
    TableDef::new("leave_types")
        .columns(vec![
            integer("id"),
            varchar("name", 100),
            boolean("is_paid").default_value(DefaultValue::Bool(true)),
            integer("default_days").default_value(DefaultValue::Integer(0)),
        ])
        .primary_key(&["id"])
}

fn leaves() -> TableDef {
    TableDef::new("leaves")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            integer("leave_type_id"),
            date("start_date"),
            date("end_date"),
            integer("total_days"),
            text("reason").nullable(),
            varchar("status", 20).default_value(DefaultValue::text("Pending")),
            datetime("applied_at").default_value(DefaultValue::Now),
            varchar("approved_by", 36).nullable(),
            datetime("approval_date").nullable(),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_leaves_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_leaves_leave_types_leave_type_id",
            &["leave_type_id"],
            "leave_types",
            &["id"],
            OnDelete::Restrict,
        ))
}

fn leave_details() -> TableDef {
    TableDef::new("leave_details")
        .columns(vec![
            integer("id"),
            integer("leave_id"),
            integer("leave_type_id"),
            varchar("document_path", 260),
            datetime("uploaded_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_leave_details_leaves_leave_id",
            &["leave_id"],
            "leaves",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_leave_details_leave_types_leave_type_id",
            &["leave_type_id"],
            "leave_types",
            &["id"],
            OnDelete::Cascade,
        ))
}

// Captured for the fractional-days revision.
pub(super) fn leaves_total_days_v1() -> crate::schema::ColumnDef {
    integer("total_days")
}
