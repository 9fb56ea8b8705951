//! Replace the (claim_id, claim_type_id) composite key on claim_details with
//! a surrogate id, so a claim can carry several lines of the same type. The
//! old leading-key lookup is preserved by an explicit index on claim_id.

use crate::migrate::{Migration, Operation};
use crate::schema::{integer, IndexDef};

pub fn migration() -> Migration {
    Migration::new(
        "20231215143000_claim_details_surrogate_key",
        vec![
            Operation::AddColumn {
                table: "claim_details".to_string(),
                column: integer("id").nullable(),
            },
            Operation::SetPrimaryKey {
                table: "claim_details".to_string(),
                from: vec!["claim_id".to_string(), "claim_type_id".to_string()],
                to: vec!["id".to_string()],
            },
            Operation::CreateIndex(IndexDef::new(
                "ix_claim_details_claim_id",
                "claim_details",
                &["claim_id"],
            )),
        ],
    )
}
