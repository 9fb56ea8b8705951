// tests/integrity.rs
//
// The service layer leaning on the schema's referential guarantees: Restrict
// lookups, employee cascades, unique links, soft deletes, and the approval
// action-taker rule.

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use finserve_data::migrate::Migrator;
use finserve_data::migrations;
use finserve_data::models::{
    Employee, NewClaim, NewEmployee, NewInvoice, NewInvoiceItem, NewLeave, PaymentStatus,
    WorkflowStatus,
};
use finserve_data::services::{
    ClaimService, EmployeeService, InvoiceService, LeaveService, OcrService, PayrollService,
    StatutoryRates,
};
use finserve_data::{AppError, Store};

async fn migrated_store() -> Store {
    let store = Store::connect_memory().await.unwrap();
    let migrator = Migrator::new(migrations::registry()).unwrap();
    migrator.up(store.pool(), None).await.unwrap();
    store
}

async fn seed_employee(store: &Store, name: &str, email: &str) -> Employee {
    let svc = EmployeeService::new(store);
    let bank = svc
        .create_bank_information("Maybank", "514012345678", name)
        .await
        .unwrap();
    let contact = svc
        .create_emergency_contact("Next of Kin", "Spouse", "012-3456789")
        .await
        .unwrap();
    let role = svc
        .create_job_role("Software Engineer", Some("Engineering"))
        .await
        .unwrap();
    svc.create(NewEmployee {
        full_name: name.to_string(),
        email: email.to_string(),
        phone: None,
        password_hash: "hash".to_string(),
        ic: Some("901212-10-5678".to_string()),
        passport_no: None,
        date_joined: NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
        epf_no: None,
        income_tax_no: None,
        bank_information_id: bank.id,
        emergency_contact_id: contact.id,
        job_role_id: role.id,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn lookup_delete_is_blocked_until_the_employee_goes() {
    let store = migrated_store().await;
    let svc = EmployeeService::new(&store);
    let employee = seed_employee(&store, "Aisyah Binti Rahman", "aisyah@finserve.test").await;

    // A job role in use cannot be removed.
    let err = svc.delete_job_role(employee.job_role_id).await.unwrap_err();
    assert!(err.is_referential(), "{err}");

    // Same for the other two lookups.
    assert!(svc
        .delete_bank_information(employee.bank_information_id)
        .await
        .unwrap_err()
        .is_referential());
    assert!(svc
        .delete_emergency_contact(employee.emergency_contact_id)
        .await
        .unwrap_err()
        .is_referential());

    // Once the employee is gone the lookups are free.
    svc.delete(&employee.id).await.unwrap();
    svc.delete_job_role(employee.job_role_id).await.unwrap();
    svc.delete_bank_information(employee.bank_information_id)
        .await
        .unwrap();
    svc.delete_emergency_contact(employee.emergency_contact_id)
        .await
        .unwrap();
}

#[tokio::test]
async fn employee_delete_cascades_through_the_whole_aggregate() {
    let store = migrated_store().await;
    let employees = EmployeeService::new(&store);
    let claims = ClaimService::new(&store);
    let leaves = LeaveService::new(&store);
    let payrolls = PayrollService::new(&store);

    let employee = seed_employee(&store, "Tan Wei Ming", "weiming@finserve.test").await;

    let medical = claims.create_claim_type("Medical", None).await.unwrap();
    let claim = claims
        .submit(NewClaim {
            employee_id: employee.id.clone(),
            title: "Clinic visit".to_string(),
            description: None,
            amount: dec!(120.00),
            receipt_path: None,
        })
        .await
        .unwrap();
    claims
        .add_detail(claim.id, medical.id, Some("Consultation"), dec!(120.00), None)
        .await
        .unwrap();

    let annual = leaves.create_leave_type("Annual", true, 14).await.unwrap();
    let leave = leaves
        .request(NewLeave {
            employee_id: employee.id.clone(),
            leave_type_id: annual.id,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            total_days: 1.5,
            reason: None,
        })
        .await
        .unwrap();
    leaves
        .add_detail(leave.id, annual.id, "leave/mc.pdf")
        .await
        .unwrap();
    leaves
        .request_unpaid(NewLeave {
            employee_id: employee.id.clone(),
            leave_type_id: annual.id,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            total_days: 1.0,
            reason: None,
        })
        .await
        .unwrap();

    payrolls
        .generate(&employee.id, 3, 2024, dec!(5000), dec!(500), &StatutoryRates::default())
        .await
        .unwrap();
    employees
        .add_document(&employee.id, "contract.pdf", "docs/contract.pdf", Some(1024))
        .await
        .unwrap();

    employees.delete(&employee.id).await.unwrap();

    // Everything owned by the employee went with them, details included.
    for table in [
        "claims",
        "claim_details",
        "leaves",
        "leave_details",
        "unpaid_leave_requests",
        "payrolls",
        "employee_documents",
    ] {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM \"{table}\""))
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(count, 0, "{table} not emptied");
    }

    // The lookup tables are untouched by the cascade.
    let types: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM claim_types")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(types, 1);
}

#[tokio::test]
async fn a_claim_is_born_pending() {
    let store = migrated_store().await;
    let claims = ClaimService::new(&store);
    let employee = seed_employee(&store, "Nurul Huda", "nurul@finserve.test").await;

    let claim = claims
        .submit(NewClaim {
            employee_id: employee.id.clone(),
            title: "Parking".to_string(),
            description: None,
            amount: dec!(15.50),
            receipt_path: None,
        })
        .await
        .unwrap();
    assert_eq!(claim.status, WorkflowStatus::Pending);
    assert_eq!(claim.amount, dec!(15.50));
    assert_eq!(claim.currency, "MYR");
    assert!(!claim.is_deleted);

    let approved = claims.approve(claim.id, &employee.id).await.unwrap();
    assert_eq!(approved.status, WorkflowStatus::Approved);
    assert!(approved.approval_date.is_some());

    // A decided claim cannot be decided again, and the losing decision
    // leaves no trace on the row.
    let err = claims.reject(claim.id, &employee.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    let kept = claims.get(claim.id).await.unwrap();
    assert_eq!(kept.status, WorkflowStatus::Approved);
}

#[tokio::test]
async fn whole_ringgit_amounts_decode_from_both_storage_classes() {
    let store = migrated_store().await;
    let claims = ClaimService::new(&store);
    let employee = seed_employee(&store, "Faridah Hassan", "faridah@finserve.test").await;

    // An integral amount lands in SQLite's INTEGER storage class under the
    // column's NUMERIC affinity; a fractional one stays REAL. Both must come
    // back as the same two-decimal value.
    let whole = claims
        .submit(NewClaim {
            employee_id: employee.id.clone(),
            title: "Team lunch".to_string(),
            description: None,
            amount: dec!(150.00),
            receipt_path: None,
        })
        .await
        .unwrap();
    assert_eq!(whole.amount, dec!(150.00));
    assert_eq!(claims.get(whole.id).await.unwrap().amount, dec!(150.00));

    let fractional = claims
        .submit(NewClaim {
            employee_id: employee.id.clone(),
            title: "Toll".to_string(),
            description: None,
            amount: dec!(7.40),
            receipt_path: None,
        })
        .await
        .unwrap();
    assert_eq!(claims.get(fractional.id).await.unwrap().amount, dec!(7.40));

    // Payroll binds several whole amounts at once, including zero allowances
    // and deductions.
    let payrolls = PayrollService::new(&store);
    let payroll = payrolls
        .generate(
            &employee.id,
            3,
            2024,
            dec!(5000),
            dec!(0),
            &StatutoryRates::default(),
        )
        .await
        .unwrap();
    let fetched = payrolls.get(payroll.id).await.unwrap();
    assert_eq!(fetched.basic_salary, dec!(5000.00));
    assert_eq!(fetched.allowances, dec!(0.00));
    assert_eq!(fetched.pcb_tax, dec!(0.00));
}

#[tokio::test]
async fn soft_deleted_claims_leave_the_working_set_but_not_the_table() {
    let store = migrated_store().await;
    let claims = ClaimService::new(&store);
    let employee = seed_employee(&store, "Raj Kumar", "raj@finserve.test").await;

    let claim = claims
        .submit(NewClaim {
            employee_id: employee.id.clone(),
            title: "Mileage".to_string(),
            description: None,
            amount: dec!(40),
            receipt_path: None,
        })
        .await
        .unwrap();

    claims.soft_delete(claim.id).await.unwrap();
    assert!(claims.list_active(&employee.id).await.unwrap().is_empty());

    // Still fetchable by id, flagged deleted.
    let kept = claims.get(claim.id).await.unwrap();
    assert!(kept.is_deleted);
    assert!(kept.deleted_date.is_some());

    // A second soft delete is a no-op surfaced as NotFound.
    assert!(matches!(
        claims.soft_delete(claim.id).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn one_identity_account_links_at_most_one_employee() {
    let store = migrated_store().await;
    let employees = EmployeeService::new(&store);
    let first = seed_employee(&store, "Lim Mei Ling", "meiling@finserve.test").await;
    let second = seed_employee(&store, "Ahmad Faiz", "faiz@finserve.test").await;

    sqlx::query(
        "INSERT INTO auth_users (id, user_name, normalized_user_name, email, normalized_email, password_hash)
         VALUES ('u1', 'meiling', 'MEILING', 'meiling@finserve.test', 'MEILING@FINSERVE.TEST', 'hash')",
    )
    .execute(store.pool())
    .await
    .unwrap();

    employees.link_auth_user(&first.id, "u1").await.unwrap();
    let err = employees.link_auth_user(&second.id, "u1").await.unwrap_err();
    assert!(err.is_unique(), "{err}");
}

#[tokio::test]
async fn unpaid_leave_records_only_the_excess_days() {
    let store = migrated_store().await;
    let leaves = LeaveService::new(&store);
    let employee = seed_employee(&store, "Siti Aminah", "siti@finserve.test").await;

    let annual = leaves.create_leave_type("Annual", true, 2).await.unwrap();
    let taken = leaves
        .request(NewLeave {
            employee_id: employee.id.clone(),
            leave_type_id: annual.id,
            start_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 2).unwrap(),
            total_days: 1.5,
            reason: None,
        })
        .await
        .unwrap();
    leaves.approve(taken.id, &employee.id).await.unwrap();
    assert!(matches!(
        leaves.reject(taken.id, &employee.id).await.unwrap_err(),
        AppError::Validation(_)
    ));

    // 1.5 of 2 days used; a further 1.0-day request overflows by 0.5.
    let request = leaves
        .request_unpaid(NewLeave {
            employee_id: employee.id.clone(),
            leave_type_id: annual.id,
            start_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            total_days: 1.0,
            reason: None,
        })
        .await
        .unwrap();
    assert_eq!(request.status, WorkflowStatus::Pending);
    assert!((request.excess_days - 0.5).abs() < 1e-9);

    let reviewed = leaves
        .review_unpaid(request.id, WorkflowStatus::Approved, &employee.id)
        .await
        .unwrap();
    assert_eq!(reviewed.status, WorkflowStatus::Approved);
    assert!(reviewed.reviewed_at.is_some());
}

#[tokio::test]
async fn one_payroll_record_per_employee_per_period() {
    let store = migrated_store().await;
    let payrolls = PayrollService::new(&store);
    let employee = seed_employee(&store, "Chong Kar Wai", "karwai@finserve.test").await;

    let rates = StatutoryRates::default();
    let payroll = payrolls
        .generate(&employee.id, 6, 2024, dec!(4000), dec!(0), &rates)
        .await
        .unwrap();
    assert_eq!(payroll.payment_status, PaymentStatus::Pending);
    assert_eq!(payroll.employee_epf, dec!(440.00));
    assert_eq!(
        payroll.net_pay,
        payroll.gross_pay - payroll.employee_epf - payroll.employee_socso - payroll.employee_eis
            - payroll.pcb_tax
    );

    let err = payrolls
        .generate(&employee.id, 6, 2024, dec!(4000), dec!(0), &rates)
        .await
        .unwrap_err();
    assert!(err.is_unique(), "{err}");

    let paid = payrolls.mark_paid(payroll.id).await.unwrap();
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn approvals_follow_their_payroll_but_pin_their_actor() {
    let store = migrated_store().await;
    let employees = EmployeeService::new(&store);
    let payrolls = PayrollService::new(&store);

    let subject = seed_employee(&store, "Ooi Boon Keat", "boonkeat@finserve.test").await;
    let approver = seed_employee(&store, "Farah Diyana", "farah@finserve.test").await;

    let payroll = payrolls
        .generate(&subject.id, 7, 2024, dec!(6000), dec!(0), &StatutoryRates::default())
        .await
        .unwrap();
    payrolls
        .record_approval(
            payroll.id,
            &approver.id,
            "Approve",
            "Farah Diyana",
            WorkflowStatus::Approved,
            None,
        )
        .await
        .unwrap();

    // The action-taker link blocks deleting the approver while the approval
    // row exists.
    let err = employees.delete(&approver.id).await.unwrap_err();
    assert!(err.is_referential(), "{err}");

    // Deleting the subject cascades the payroll and its approvals, after
    // which the approver can go.
    employees.delete(&subject.id).await.unwrap();
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM approvals")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(remaining, 0);
    employees.delete(&approver.id).await.unwrap();
}

#[tokio::test]
async fn invoice_totals_are_derived_from_the_lines() {
    let store = migrated_store().await;
    let invoices = InvoiceService::new(&store);

    let invoice = invoices
        .create(NewInvoice {
            invoice_number: "INV-2024-0001".to_string(),
            client_name: "Apex Holdings".to_string(),
            client_email: None,
            tax_amount: dec!(21.00),
            issued_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            items: vec![
                NewInvoiceItem {
                    description: "Consulting".to_string(),
                    quantity: 3,
                    unit_price: dec!(100.00),
                },
                NewInvoiceItem {
                    description: "Support retainer".to_string(),
                    quantity: 1,
                    unit_price: dec!(50.00),
                },
            ],
        })
        .await
        .unwrap();
    assert_eq!(invoice.subtotal, dec!(350.00));
    assert_eq!(invoice.total_amount, dec!(371.00));

    let items = invoices.items(invoice.id).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].line_total, dec!(300.00));

    // Duplicate invoice numbers are rejected by the unique index.
    let err = invoices
        .create(NewInvoice {
            invoice_number: "INV-2024-0001".to_string(),
            client_name: "Apex Holdings".to_string(),
            client_email: None,
            tax_amount: dec!(0),
            issued_date: None,
            items: vec![NewInvoiceItem {
                description: "Anything".to_string(),
                quantity: 1,
                unit_price: dec!(1.00),
            }],
        })
        .await
        .unwrap_err();
    assert!(err.is_unique(), "{err}");

    // And the failed transaction left no orphaned lines behind.
    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_items")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(lines, 2);

    invoices.soft_delete(invoice.id).await.unwrap();
    assert!(invoices.list_active().await.unwrap().is_empty());
}

#[tokio::test]
async fn ocr_submissions_stage_and_complete_without_links() {
    let store = migrated_store().await;
    let ocr = OcrService::new(&store);

    let staged = ocr.stage("receipts/0001.jpg", None).await.unwrap();
    assert_eq!(ocr.list_pending().await.unwrap().len(), 1);

    let done = ocr
        .complete(staged.id, dec!(88.40), NaiveDate::from_ymd_opt(2024, 4, 2))
        .await
        .unwrap();
    assert_eq!(done.extracted_amount, Some(dec!(88.40)));
    assert!(ocr.list_pending().await.unwrap().is_empty());

    // Completing twice fails: the submission is no longer pending.
    assert!(matches!(
        ocr.complete(staged.id, dec!(1), None).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}
