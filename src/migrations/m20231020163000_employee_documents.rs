//! Employee document registry: path references to uploaded files, owned by
//! the employee and removed with them.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    bigint, datetime, integer, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef,
};

pub fn migration() -> Migration {
    Migration::new(
        "20231020163000_employee_documents",
        vec![
            Operation::CreateTable(employee_documents()),
            Operation::CreateIndex(IndexDef::new(
                "ix_employee_documents_employee_id",
                "employee_documents",
                &["employee_id"],
            )),
        ],
    )
}

fn employee_documents() -> TableDef {
    TableDef::new("employee_documents")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            varchar("file_name", 255),
            varchar("file_path", 260),
            bigint("file_size").nullable(),
            datetime("uploaded_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_employee_documents_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
}
