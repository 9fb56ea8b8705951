//! Receipt OCR staging. Rows land here before a person promotes them into a
//! claim, so the table deliberately has no foreign keys: a submission must
//! survive whatever happens to employees and claims around it.

use crate::migrate::{Migration, Operation};
use crate::schema::{
    date, datetime, integer, money, text, varchar, DefaultValue, TableDef,
};

pub fn migration() -> Migration {
    let table = TableDef::new("process_ocr_submissions")
        .columns(vec![
            integer("id"),
            varchar("file_path", 260),
            varchar("merchant_name", 200).nullable(),
            money("extracted_amount").nullable(),
            date("extracted_date").nullable(),
            text("raw_payload").nullable(),
            varchar("ocr_status", 20).default_value(DefaultValue::text("Pending")),
            varchar("submitted_by", 36).nullable(),
            datetime("created_at").default_value(DefaultValue::Now),
        ])
        .primary_key(&["id"]);
    Migration::new(
        "20240402091000_ocr_submissions",
        vec![Operation::CreateTable(table)],
    )
}
