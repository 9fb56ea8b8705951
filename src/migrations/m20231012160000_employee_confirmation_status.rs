//! Probation tracking on employees. The status column is required, so it
//! carries a storage-level 'Pending' default and existing rows are covered by
//! the default when the column is added.

use crate::migrate::{Migration, Operation};
use crate::schema::{date, varchar, DefaultValue};

pub fn migration() -> Migration {
    Migration::new(
        "20231012160000_employee_confirmation_status",
        vec![
            Operation::AddColumn {
                table: "employees".to_string(),
                column: varchar("confirmation_status", 20)
                    .default_value(DefaultValue::text("Pending")),
            },
            Operation::AddColumn {
                table: "employees".to_string(),
                column: date("confirmation_date").nullable(),
            },
        ],
    )
}
