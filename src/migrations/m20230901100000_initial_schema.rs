//! Initial schema.
//!
//! Identity tables, the employee aggregate with its Restrict lookups, and the
//! first-generation claims/salaries/approvals workflow (approvals reference
//! an approver, a subject employee, and either a claim or a salary; this
//! shape is replaced wholesale in `20231118120000_payroll_centric_approvals`).

use crate::migrate::{Migration, Operation};
use crate::schema::{
    boolean, date, datetime, integer, money, text, varchar, DefaultValue, ForeignKeyDef, IndexDef,
    OnDelete, TableDef,
};

pub fn migration() -> Migration {
    let mut ops = vec![
        Operation::CreateTable(auth_users()),
        Operation::CreateIndex(
            IndexDef::new("ux_auth_users_normalized_user_name", "auth_users", &["normalized_user_name"]).unique(),
        ),
        Operation::CreateIndex(
            IndexDef::new("ux_auth_users_normalized_email", "auth_users", &["normalized_email"]).unique(),
        ),
        Operation::CreateTable(auth_roles()),
        Operation::CreateIndex(
            IndexDef::new("ux_auth_roles_normalized_name", "auth_roles", &["normalized_name"]).unique(),
        ),
        Operation::CreateTable(auth_user_roles()),
        Operation::CreateIndex(IndexDef::new(
            "ix_auth_user_roles_role_id",
            "auth_user_roles",
            &["role_id"],
        )),
        Operation::CreateTable(auth_user_claims()),
        Operation::CreateIndex(IndexDef::new(
            "ix_auth_user_claims_user_id",
            "auth_user_claims",
            &["user_id"],
        )),
        Operation::CreateTable(bank_information()),
        Operation::CreateTable(emergency_contacts()),
        Operation::CreateTable(job_roles()),
        Operation::CreateTable(employees()),
        Operation::CreateIndex(
            IndexDef::new("ux_employees_email", "employees", &["email"]).unique(),
        ),
        Operation::CreateIndex(
            IndexDef::new("ux_employees_auth_user_id", "employees", &["auth_user_id"]).unique(),
        ),
        Operation::CreateIndex(IndexDef::new(
            "ix_employees_bank_information_id",
            "employees",
            &["bank_information_id"],
        )),
        Operation::CreateIndex(IndexDef::new(
            "ix_employees_emergency_contact_id",
            "employees",
            &["emergency_contact_id"],
        )),
        Operation::CreateIndex(IndexDef::new(
            "ix_employees_job_role_id",
            "employees",
            &["job_role_id"],
        )),
        Operation::CreateTable(claims()),
        Operation::CreateIndex(IndexDef::new("ix_claims_employee_id", "claims", &["employee_id"])),
        Operation::CreateTable(salaries()),
        Operation::CreateIndex(IndexDef::new(
            "ix_salaries_employee_id",
            "salaries",
            &["employee_id"],
        )),
        Operation::CreateTable(approvals_v1()),
    ];
    ops.extend(
        approvals_v1_indexes()
            .into_iter()
            .map(Operation::CreateIndex),
    );
    Migration::new("20230901100000_initial_schema", ops)
}

fn auth_users() -> TableDef {
    TableDef::new("auth_users")
        .columns(vec![
            varchar("id", 36),
            varchar("user_name", 256),
            varchar("normalized_user_name", 256),
            varchar("email", 256),
            varchar("normalized_email", 256),
            text("password_hash"),
            datetime("created_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
}

fn auth_roles() -> TableDef {
    TableDef::new("auth_roles")
        .columns(vec![
            varchar("id", 36),
            varchar("name", 256),
            varchar("normalized_name", 256),
        ])
        .primary_key(&["id"])
}

fn auth_user_roles() -> TableDef {
    TableDef::new("auth_user_roles")
        .columns(vec![varchar("user_id", 36), varchar("role_id", 36)])
        .primary_key(&["user_id", "role_id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_auth_user_roles_auth_users_user_id",
            &["user_id"],
            "auth_users",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_auth_user_roles_auth_roles_role_id",
            &["role_id"],
            "auth_roles",
            &["id"],
            OnDelete::Cascade,
        ))
}

fn auth_user_claims() -> TableDef {
    TableDef::new("auth_user_claims")
        .columns(vec![
            integer("id"),
            varchar("user_id", 36),
            text("claim_type").nullable(),
            text("claim_value").nullable(),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_auth_user_claims_auth_users_user_id",
            &["user_id"],
            "auth_users",
            &["id"],
            OnDelete::Cascade,
        ))
}

fn bank_information() -> TableDef {
    TableDef::new("bank_information")
        .columns(vec![
            integer("id"),
            varchar("bank_name", 100),
            varchar("account_number", 34),
            varchar("account_holder", 100),
        ])
        .primary_key(&["id"])
}

fn emergency_contacts() -> TableDef {
    TableDef::new("emergency_contacts")
        .columns(vec![
            integer("id"),
            varchar("name", 100),
            varchar("relationship", 50),
            varchar("phone", 20),
        ])
        .primary_key(&["id"])
}

fn job_roles() -> TableDef {
    TableDef::new("job_roles")
        .columns(vec![
            integer("id"),
            varchar("title", 100),
            varchar("department", 100).nullable(),
        ])
        .primary_key(&["id"])
}

fn employees() -> TableDef {
    TableDef::new("employees")
        .columns(vec![
            varchar("id", 36),
            varchar("full_name", 100),
            varchar("email", 255),
            varchar("phone", 20).nullable(),
            text("password_hash"),
            // National IC. Relaxed to nullable in
            // 20240207150000_passport_as_alternate_identifier.
            varchar("ic", 14),
            date("date_joined"),
            varchar("epf_no", 20).nullable(),
            varchar("income_tax_no", 20).nullable(),
            integer("bank_information_id"),
            integer("emergency_contact_id"),
            integer("job_role_id"),
            varchar("auth_user_id", 36).nullable(),
            datetime("created_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_employees_bank_information_bank_information_id",
            &["bank_information_id"],
            "bank_information",
            &["id"],
            OnDelete::Restrict,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_employees_emergency_contacts_emergency_contact_id",
            &["emergency_contact_id"],
            "emergency_contacts",
            &["id"],
            OnDelete::Restrict,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_employees_job_roles_job_role_id",
            &["job_role_id"],
            "job_roles",
            &["id"],
            OnDelete::Restrict,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_employees_auth_users_auth_user_id",
            &["auth_user_id"],
            "auth_users",
            &["id"],
            OnDelete::NoAction,
        ))
}

fn claims() -> TableDef {
    TableDef::new("claims")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            varchar("title", 200),
            text("description").nullable(),
            money("amount").default_value(DefaultValue::Integer(0)),
            varchar("currency", 3).default_value(DefaultValue::text("MYR")),
            varchar("receipt_path", 260).nullable(),
            varchar("status", 20).default_value(DefaultValue::text("Pending")),
            datetime("submitted_at").default_value(DefaultValue::Now),
            datetime("approval_date").nullable(),
            varchar("approved_by", 36).nullable(),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_claims_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
}

pub(super) fn salaries() -> TableDef {
    TableDef::new("salaries")
        .columns(vec![
            integer("id"),
            varchar("employee_id", 36),
            integer("month"),
            integer("year"),
            money("basic_salary").default_value(DefaultValue::Integer(0)),
            money("allowance").default_value(DefaultValue::Integer(0)),
            boolean("paid").default_value(DefaultValue::Bool(false)),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_salaries_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::Cascade,
        ))
}

pub(super) fn salaries_index() -> IndexDef {
    IndexDef::new("ix_salaries_employee_id", "salaries", &["employee_id"])
}

pub(super) fn approvals_v1() -> TableDef {
    TableDef::new("approvals")
        .columns(vec![
            integer("id"),
            varchar("approver_id", 36),
            varchar("employee_id", 36),
            integer("claim_id").nullable(),
            integer("salary_id").nullable(),
            varchar("status", 20).default_value(DefaultValue::text("Pending")),
            text("remarks").nullable(),
            datetime("created_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"])
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_employees_approver_id",
            &["approver_id"],
            "employees",
            &["id"],
            OnDelete::NoAction,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_employees_employee_id",
            &["employee_id"],
            "employees",
            &["id"],
            OnDelete::NoAction,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_claims_claim_id",
            &["claim_id"],
            "claims",
            &["id"],
            OnDelete::Cascade,
        ))
        .foreign_key(ForeignKeyDef::new(
            "fk_approvals_salaries_salary_id",
            &["salary_id"],
            "salaries",
            &["id"],
            OnDelete::Cascade,
        ))
}

pub(super) fn approvals_v1_indexes() -> Vec<IndexDef> {
    vec![
        IndexDef::new("ix_approvals_approver_id", "approvals", &["approver_id"]),
        IndexDef::new("ix_approvals_employee_id", "approvals", &["employee_id"]),
        IndexDef::new("ix_approvals_claim_id", "approvals", &["claim_id"]),
        IndexDef::new("ix_approvals_salary_id", "approvals", &["salary_id"]),
    ]
}

// Referenced by later revisions that alter this column and must capture the
// old shape exactly.
pub(super) fn employees_ic_v1() -> crate::schema::ColumnDef {
    varchar("ic", 14)
}
