//! Claims switch to soft deletion so approved expense history survives a
//! removal from the working set.

use crate::migrate::{Migration, Operation};
use crate::schema::{boolean, datetime, DefaultValue};

pub fn migration() -> Migration {
    Migration::new(
        "20231201100000_claim_soft_delete",
        vec![
            Operation::AddColumn {
                table: "claims".to_string(),
                column: boolean("is_deleted").default_value(DefaultValue::Bool(false)),
            },
            Operation::AddColumn {
                table: "claims".to_string(),
                column: datetime("deleted_date").nullable(),
            },
        ],
    )
}
