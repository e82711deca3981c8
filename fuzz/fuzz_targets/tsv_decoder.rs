#![no_main]

use logdrop_ingest::parser::{decode_row, decode_rows, raw_line, EXPECTED_COLUMNS};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(rows) = decode_rows(data) else {
        return;
    };
    for row in &rows {
        let _ = raw_line(row);
        if decode_row(row).is_ok() {
            assert!(row.len() >= EXPECTED_COLUMNS);
        }
    }
});
