//! Half-day leave. total_days widens from a whole-day integer to a double.

use crate::migrate::{Migration, Operation};
use crate::migrations::m20231002141500_leave_management as leave;
use crate::schema::double;

pub fn migration() -> Migration {
    Migration::new(
        "20240110091500_fractional_leave_days",
        vec![Operation::AlterColumn {
            table: "leaves".to_string(),
            from: leave::leaves_total_days_v1(),
            to: double("total_days"),
        }],
    )
    .lossy("fractional day counts are truncated back to whole days")
}
