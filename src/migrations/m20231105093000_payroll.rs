//! Monthly payroll records with the employer/employee statutory contribution
//! breakdown (EPF, SOCSO, EIS, PCB). One record per employee per month/year,
//! enforced at the storage layer.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    datetime, integer, money, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef,
};

pub fn migration() -> Migration {
    Migration::new(
        "20231105093000_payroll",
        vec![
            Operation::CreateTable(payrolls()),
            // Doubles as foreign key coverage for employee_id via its prefix.
            Operation::CreateIndex(
                IndexDef::new(
                    "ux_payrolls_employee_id_month_year",
                    "payrolls",
                    &["employee_id", "month", "year"],
                )
                .unique(),
            ),
        ],
    )
}

fn payrolls() -> TableDef {
    let zero = || DefaultValue::Integer(0);
    TableDef::new("payrolls")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            integer("month"),
            integer("year"),
            money("basic_salary").default_value(zero()),
            money("allowances").default_value(zero()),
            money("employer_epf").default_value(zero()),
            money("employee_epf").default_value(zero()),
            money("employer_socso").default_value(zero()),
            money("employee_socso").default_value(zero()),
            money("employer_eis").default_value(zero()),
            money("employee_eis").default_value(zero()),
            money("pcb_tax").default_value(zero()),
            money("gross_pay").default_value(zero()),
            money("net_pay").default_value(zero()),
            varchar("payment_status", 20).default_value(DefaultValue::text("Pending")),
            datetime("generated_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_payrolls_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
}
