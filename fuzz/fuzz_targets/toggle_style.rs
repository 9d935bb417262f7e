#![no_main]

use libfuzzer_sys::fuzz_target;
use rich_readme::{Document, StyleTag, check_balance};

fuzz_target!(|data: &[u8]| {
    if data.len() < 3 {
        return;
    }
    let tag = if data[0] % 2 == 0 {
        StyleTag::Bold
    } else {
        StyleTag::Italic
    };
    let start = usize::from(data[1]);
    let len = usize::from(data[2]);
    let input = String::from_utf8_lossy(&data[3..]);

    let mut document: Document<String> = Document::from_rich_text(input.into_owned());
    let poor_text = document.poor_text().to_string();
    if document.toggle_style(tag, start, len).is_ok() {
        assert_eq!(document.poor_text(), poor_text);
        assert!(check_balance(document.rich_text()).is_ok());
    }
});
