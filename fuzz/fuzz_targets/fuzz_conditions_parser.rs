#![no_main]
use libfuzzer_sys::fuzz_target;
use nexusdoc::{CollectionConfig, query};

fuzz_target!(|data: &[u8]| {
    if data.len() > 8192 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data)
        && let Ok(clauses) = query::parse_conditions_json(s)
    {
        // Whatever parses must compile or fail cleanly.
        let _ = query::compile("fuzz", &clauses, &CollectionConfig::default());
    }
});
