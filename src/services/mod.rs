// src/services/mod.rs

pub mod claim;
pub mod employee;
pub mod invoice;
pub mod leave;
pub mod ocr;
pub mod payroll;

pub use claim::ClaimService;
pub use employee::EmployeeService;
pub use invoice::InvoiceService;
pub use leave::LeaveService;
pub use ocr::OcrService;
pub use payroll::{PayrollService, StatutoryRates};
