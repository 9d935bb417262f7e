#![no_main]

use libfuzzer_sys::fuzz_target;
use rich_readme::Document;

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let (document, _) = Document::<String>::load_json(&input);
    if let Ok(json) = document.to_json() {
        let (reloaded, err) = Document::<String>::load_json(&json);
        assert!(err.is_none());
        assert_eq!(reloaded.rich_text(), document.rich_text());
    }
});
