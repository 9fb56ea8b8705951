//! Invoices grow proper line items. The per-line columns on the invoice row
//! move to a child table, and the employee link goes with them: invoices are
//! billed to external clients and no longer hang off an employee record.

use crate::migrate::{Migration, Operation};
use crate::migrations::m20240220103000_invoices as invoices;
use crate::schema::{
    integer, money, text, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef,
};

pub fn migration() -> Migration {
    let items = TableDef::new("invoice_items")
        .columns(vec![
            integer("id"),
            integer("invoice_id"),
            varchar("description", 200),
            integer("quantity").default_value(DefaultValue::Integer(1)),
            money("unit_price").default_value(DefaultValue::Integer(0)),
            money("line_total").default_value(DefaultValue::Integer(0)),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_invoice_items_invoices_invoice_id",
            &["invoice_id"],
            "invoices",
            &["id"],
            OnDelete::Cascade,
        ));
    Migration::new(
        "20240305133000_invoice_line_items",
        vec![
            Operation::CreateTable(items),
            Operation::CreateIndex(IndexDef::new(
                "ix_invoice_items_invoice_id",
                "invoice_items",
                &["invoice_id"],
            )),
            Operation::DropIndex(invoices::invoices_employee_index()),
            Operation::DropForeignKey {
                table: "invoices".to_string(),
                foreign_key: invoices::invoices_employee_fk(),
            },
            Operation::DropColumn {
                table: "invoices".to_string(),
                column: varchar("employee_id", 36),
            },
            Operation::DropColumn {
                table: "invoices".to_string(),
                column: text("service_description").nullable(),
            },
            Operation::DropColumn {
                table: "invoices".to_string(),
                column: integer("quantity").default_value(DefaultValue::Integer(1)),
            },
            Operation::DropColumn {
                table: "invoices".to_string(),
                column: money("unit_price").default_value(DefaultValue::Integer(0)),
            },
        ],
    )
    .lossy("flat per-invoice line fields are dropped; Down restores the columns empty")
}
