#![no_main]

use libfuzzer_sys::fuzz_target;
use problemkit::{CodeSettings, parse_code};

fuzz_target!(|data: &[u8]| {
    if data.len() > 256 {
        return;
    }
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(parsed) = parse_code(s, None) {
            // A parsed code always rebuilds from its own parts
            let settings = CodeSettings::default();
            let rebuilt = settings
                .coder(Some(&parsed.namespace))
                .build(parsed.value);
            assert!(rebuilt.is_ok(), "cannot rebuild {s:?}");
        }
        let _ = CodeSettings::default().with_value_len(4).coder(None).parse(s);
    }
});
