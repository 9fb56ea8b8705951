// src/migrations/mod.rs
//
// The ordered FinserveNew migration history. One module per revision; the
// registry is the single source of truth the model snapshot is folded from.

pub mod m20230901100000_initial_schema;
pub mod m20230915083000_claim_types_and_details;
pub mod m20231002141500_leave_management;
pub mod m20231012160000_employee_confirmation_status;
pub mod m20231020163000_employee_documents;
pub mod m20231105093000_payroll;
pub mod m20231118120000_payroll_centric_approvals;
pub mod m20231201100000_claim_soft_delete;
pub mod m20231215143000_claim_details_surrogate_key;
pub mod m20240110091500_fractional_leave_days;
pub mod m20240125110000_unpaid_leave_requests;
pub mod m20240207150000_passport_as_alternate_identifier;
pub mod m20240220103000_invoices;
pub mod m20240305133000_invoice_line_items;
pub mod m20240402091000_ocr_submissions;
pub mod m20240415140000_ocr_payload_rollback;

use crate::migrate::Migration;

pub fn registry() -> Vec<Migration> {
    vec![
        m20230901100000_initial_schema::migration(),
        m20230915083000_claim_types_and_details::migration(),
        m20231002141500_leave_management::migration(),
        m20231012160000_employee_confirmation_status::migration(),
        m20231020163000_employee_documents::migration(),
        m20231105093000_payroll::migration(),
        m20231118120000_payroll_centric_approvals::migration(),
        m20231201100000_claim_soft_delete::migration(),
        m20231215143000_claim_details_surrogate_key::migration(),
        m20240110091500_fractional_leave_days::migration(),
        m20240125110000_unpaid_leave_requests::migration(),
        m20240207150000_passport_as_alternate_identifier::migration(),
        m20240220103000_invoices::migration(),
        m20240305133000_invoice_line_items::migration(),
        m20240402091000_ocr_submissions::migration(),
        m20240415140000_ocr_payload_rollback::migration(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrate::Migrator;
    use crate::schema::OnDelete;

    #[test]
    fn registry_loads_and_folds() {
        // Migrator::new validates every revision and folds the full history;
        // a broken registry entry fails here without touching a database.
        let migrator = Migrator::new(registry()).unwrap();
        assert_eq!(migrator.registry().len(), 16);

        let snap = migrator.final_snapshot();
        for table in [
            "auth_users",
            "auth_roles",
            "auth_user_roles",
            "auth_user_claims",
            "bank_information",
            "emergency_contacts",
            "job_roles",
            "employees",
            "claims",
            "claim_types",
            "claim_details",
            "leave_types",
            "leaves",
            "leave_details",
            "unpaid_leave_requests",
            "employee_documents",
            "payrolls",
            "approvals",
            "invoices",
            "invoice_items",
            "process_ocr_submissions",
        ] {
            assert!(snap.tables.contains_key(table), "missing table {table}");
        }

        // First-generation tables are gone from the final snapshot.
        assert!(!snap.tables.contains_key("salaries"));
    }

    #[test]
    fn final_delete_policies_match_the_contract() {
        let migrator = Migrator::new(registry()).unwrap();
        let snap = migrator.final_snapshot();

        let policy = |table: &str, column: &str| -> OnDelete {
            snap.tables[table]
                .foreign_keys
                .iter()
                .find(|fk| fk.columns == [column.to_string()])
                .unwrap_or_else(|| panic!("no fk on {table}.{column}"))
                .on_delete
        };

        // Employee -> dependents: Cascade
        for table in [
            "claims",
            "leaves",
            "payrolls",
            "employee_documents",
            "unpaid_leave_requests",
        ] {
            assert_eq!(policy(table, "employee_id"), OnDelete::Cascade, "{table}");
        }
        // Employee as approval action-taker: NoAction
        assert_eq!(policy("approvals", "employee_id"), OnDelete::NoAction);
        // Lookups -> Employee: Restrict
        for column in ["bank_information_id", "emergency_contact_id", "job_role_id"] {
            assert_eq!(policy("employees", column), OnDelete::Restrict, "{column}");
        }
        // Identity link: nullable, NoAction
        assert_eq!(policy("employees", "auth_user_id"), OnDelete::NoAction);
        assert!(snap.tables["employees"].column("auth_user_id").unwrap().nullable);
        // Claim hierarchy
        assert_eq!(policy("claim_details", "claim_id"), OnDelete::Cascade);
        assert_eq!(policy("claim_details", "claim_type_id"), OnDelete::Restrict);
        // Leave hierarchy
        assert_eq!(policy("leaves", "leave_type_id"), OnDelete::Restrict);
        assert_eq!(policy("leave_details", "leave_id"), OnDelete::Cascade);
        assert_eq!(policy("leave_details", "leave_type_id"), OnDelete::Cascade);
        assert_eq!(policy("unpaid_leave_requests", "leave_type_id"), OnDelete::Restrict);
        // Payroll and invoicing
        assert_eq!(policy("approvals", "payroll_id"), OnDelete::Cascade);
        assert_eq!(policy("invoice_items", "invoice_id"), OnDelete::Cascade);
    }

    #[test]
    fn status_columns_default_to_storage_sentinels() {
        let migrator = Migrator::new(registry()).unwrap();
        let snap = migrator.final_snapshot();

        let default = |table: &str, column: &str| -> String {
            snap.tables[table]
                .column(column)
                .unwrap_or_else(|| panic!("no column {table}.{column}"))
                .default_literal()
                .unwrap_or_else(|| panic!("no default on {table}.{column}"))
        };

        assert_eq!(default("claims", "status"), "'Pending'");
        assert_eq!(default("leaves", "status"), "'Pending'");
        assert_eq!(default("unpaid_leave_requests", "status"), "'Pending'");
        assert_eq!(default("approvals", "status"), "'Pending'");
        assert_eq!(default("payrolls", "payment_status"), "'Pending'");
        assert_eq!(default("invoices", "status"), "'Draft'");
        assert_eq!(default("process_ocr_submissions", "ocr_status"), "'Pending'");
        assert_eq!(default("employees", "confirmation_status"), "'Pending'");
    }

    #[test]
    fn every_revision_reverts_to_the_previous_fold_point() {
        let migrator = Migrator::new(registry()).unwrap();
        for (i, migration) in migrator.registry().iter().enumerate() {
            let mut snap = migrator.snapshot_at(i + 1).clone();
            for op in migration.down().unwrap() {
                snap.apply(&op).unwrap_or_else(|e| {
                    panic!("down of {} fails to fold: {e}", migration.id)
                });
            }
            let diff = snap.diff(migrator.snapshot_at(i));
            assert!(
                diff.is_empty(),
                "down of {} does not restore the prior snapshot: {diff:?}",
                migration.id
            );
        }
    }
}
