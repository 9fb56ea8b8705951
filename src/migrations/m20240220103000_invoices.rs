//! Client invoicing, first cut. One invoice is one service line, so the
//! per-line fields live directly on the invoice row. The next revision splits
//! them out into invoice_items.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    boolean, date, datetime, integer, money, text, varchar, DefaultValue, ForeignKeyDef, IndexDef,
    OnDelete, TableDef,
};

pub fn migration() -> Migration {
    Migration::new(
        "20240220103000_invoices",
        vec![
            Operation::CreateTable(invoices_v1()),
            Operation::CreateIndex(
                IndexDef::new("ux_invoices_invoice_number", "invoices", &["invoice_number"])
                    .unique(),
            ),
            Operation::CreateIndex(invoices_employee_index()),
        ],
    )
}

pub(super) fn invoices_v1() -> TableDef {
    let zero = || DefaultValue::Integer(0);
    TableDef::new("invoices")
        .columns(vec![
            integer("id"),
            varchar("invoice_number", 30),
            varchar("employee_id", 36),
            varchar("client_name", 200),
            varchar("client_email", 255).nullable(),
            text("service_description").nullable(),
            integer("quantity").default_value(DefaultValue::Integer(1)),
            money("unit_price").default_value(zero()),
            varchar("currency", 3).default_value(DefaultValue::text("MYR")),
            money("subtotal").default_value(zero()),
            money("tax_amount").default_value(zero()),
            money("total_amount").default_value(zero()),
            varchar("status", 20).default_value(DefaultValue::text("Draft")),
            date("issued_date").nullable(),
            boolean("is_deleted").default_value(DefaultValue::Bool(false)),
            datetime("deleted_date").nullable(),
            datetime("created_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(invoices_employee_fk())
}

pub(super) fn invoices_employee_fk() -> ForeignKeyDef {
    ForeignKeyDef::new(
        "fk_invoices_employees_employee_id",
        &["employee_id"],
        "employees",
        &["id"],
        OnDelete::Cascade,
    )
}

pub(super) fn invoices_employee_index() -> IndexDef {
    IndexDef::new("ix_invoices_employee_id", "invoices", &["employee_id"])
}
