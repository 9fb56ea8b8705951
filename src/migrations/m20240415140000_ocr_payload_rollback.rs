//! Raw OCR payloads turned out to hold full receipt images in base64 and
//! bloated the database file; the merchant name was never read after
//! promotion. Both columns go.

use crate::migrate::{Migration, Operation};
use crate::schema::{text, varchar};

pub fn migration() -> Migration {
    Migration::new(
        "20240415140000_ocr_payload_rollback",
        vec![
            Operation::DropColumn {
                table: "process_ocr_submissions".to_string(),
                column: text("raw_payload").nullable(),
            },
            Operation::DropColumn {
                table: "process_ocr_submissions".to_string(),
                column: varchar("merchant_name", 200).nullable(),
            },
        ],
    )
    .lossy("raw OCR payloads are discarded; Down restores the columns empty")
}
