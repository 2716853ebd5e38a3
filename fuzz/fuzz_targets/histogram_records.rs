#![no_main]

use libfuzzer_sys::fuzz_target;
use selector::histogram::{parse_records, HistogramSet};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Parsing and validation must reject bad input without panicking
        if let Ok(records) = parse_records(input) {
            let _ = HistogramSet::from_records(&records);
        }
    }
});
