//! Claim categorization: claim types (Restrict lookup) and per-claim detail
//! lines. Details start life keyed by the (claim, claim type) pair; the
//! composite key is replaced by a surrogate in
//! `20231215143000_claim_details_surrogate_key`.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    integer, money, text, varchar, DefaultValue, ForeignKeyDef, IndexDef, OnDelete, TableDef,
};

pub fn migration() -> Migration {
    Migration::new(
        "20230915083000_claim_types_and_details",
        vec![
            Operation::CreateTable(claim_types()),
            Operation::CreateIndex(
                IndexDef::new("ux_claim_types_name", "claim_types", &["name"]).unique(),
            ),
            Operation::CreateTable(claim_details_v1()),
            Operation::CreateIndex(IndexDef::new(
                "ix_claim_details_claim_type_id",
                "claim_details",
                &["claim_type_id"],
            )),
        ],
    )
}

fn claim_types() -> TableDef {
    TableDef::new("claim_types")
        .columns(vec![
            integer("id"),
            varchar("name", 100),
            text("description").nullable(),
        ])
        .primary_key(&["id"])
}

/// First-generation shape: composite primary key on (claim_id, claim_type_id).
/// The pk prefix covers the claim_id foreign key; claim_type_id gets its own
/// index.
fn claim_details_v1() -> TableDef {
    TableDef::new("claim_details")
        .columns(vec![
            integer("claim_id"),
            integer("claim_type_id"),
            text("description").nullable(),
            money("amount").default_value(DefaultValue::Integer(0)),
            varchar("document_path", 260).nullable(),
        ])
        .primary_key(&["claim_id", "claim_type_id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_claim_details_claims_claim_id",
            &["claim_id"],
            "claims",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_claim_details_claim_types_claim_type_id",
            &["claim_type_id"],
            "claim_types",
            &["id"],
            OnDelete::Restrict,
        ))
}
