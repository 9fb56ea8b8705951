//! Foreign hires have no national IC, so the IC column relaxes to nullable
//! and a passport number arrives as the alternate identifier. The override
//! Down cannot conjure IC values back, so it backfills the storage sentinel
//! before re-tightening the column.

use crate::migrate::{Migration, Operation};
use crate::migrations::m20230901100000_initial_schema as initial;
use crate::schema::{varchar, DefaultValue};

pub fn migration() -> Migration {
    Migration::new(
        "20240207150000_passport_as_alternate_identifier",
        vec![
            Operation::AlterColumn {
                table: "employees".to_string(),
                from: initial::employees_ic_v1(),
                to: varchar("ic", 14).nullable(),
            },
            Operation::AddColumn {
                table: "employees".to_string(),
                column: varchar("passport_no", 20).nullable(),
            },
        ],
    )
    .with_down(vec![
        Operation::DropColumn {
            table: "employees".to_string(),
            column: varchar("passport_no", 20).nullable(),
        },
        Operation::Backfill {
            table: "employees".to_string(),
            column: "ic".to_string(),
            value: DefaultValue::text("000000-00-0000"),
        },
        Operation::AlterColumn {
            table: "employees".to_string(),
            from: varchar("ic", 14).nullable(),
            to: initial::employees_ic_v1(),
        },
    ])
    .lossy("Down backfills missing IC numbers with the 000000-00-0000 sentinel")
}
