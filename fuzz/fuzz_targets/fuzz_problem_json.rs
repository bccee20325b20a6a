#![no_main]

use libfuzzer_sys::fuzz_target;
use problemkit::Problem;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    // Whatever deserializes must serialize again: reserved keys never reach extensions
    if let Ok(problem) = serde_json::from_slice::<Problem>(data) {
        let json = serde_json::to_string(&problem);
        assert!(json.is_ok(), "cannot serialize {problem:?}");
        let _ = problem.to_string();
    }
});
