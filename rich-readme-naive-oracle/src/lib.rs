//! Brute-force reference model of rich-text markup.
//!
//! Everything here works on `Vec<char>` with linear scans and no regex, so it
//! can serve as an independent check on the real tag map, index translation
//! and style maps.

const LITERALS: [&str; 6] = ["<b>", "</b>", "<i>", "</i>", "</color>", "</size>"];

fn starts_with(chars: &[char], at: usize, literal: &str) -> bool {
    let mut index = at;
    for expected in literal.chars() {
        if chars.get(index) != Some(&expected) {
            return false;
        }
        index += 1;
    }
    true
}

/// Length of an attribute tag such as `<color=red>` starting at `at`.
fn attribute_tag_len(chars: &[char], at: usize, prefix: &str) -> Option<usize> {
    if !starts_with(chars, at, prefix) {
        return None;
    }
    let mut index = at + prefix.chars().count();
    while let Some(&ch) = chars.get(index) {
        match ch {
            '>' => return Some(index + 1 - at),
            '<' => return None,
            _ => index += 1,
        }
    }
    None
}

/// Length of an `<o="123"></o>` placeholder starting at `at`.
fn placeholder_len(chars: &[char], at: usize) -> Option<usize> {
    if !starts_with(chars, at, "<o=\"") {
        return None;
    }
    let mut index = at + 4;
    if chars.get(index) == Some(&'-') {
        index += 1;
    }
    let digits_start = index;
    while chars.get(index).is_some_and(|ch| ch.is_ascii_digit()) {
        index += 1;
    }
    if index == digits_start || !starts_with(chars, index, "\"></o>") {
        return None;
    }
    Some(index + 6 - at)
}

/// Length of the recognized tag starting at `at`, if any.
pub fn tag_len_at(chars: &[char], at: usize) -> Option<usize> {
    LITERALS
        .iter()
        .find(|literal| starts_with(chars, at, literal))
        .map(|literal| literal.len())
        .or_else(|| attribute_tag_len(chars, at, "<color="))
        .or_else(|| attribute_tag_len(chars, at, "<size="))
        .or_else(|| placeholder_len(chars, at))
}

/// Every recognized tag as `(start, end)` character offsets, left to right.
pub fn tag_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        match tag_len_at(&chars, index) {
            Some(len) => {
                spans.push((index, index + len));
                index += len;
            }
            None => index += 1,
        }
    }
    spans
}

pub fn tag_mask(text: &str) -> Vec<bool> {
    let mut mask = vec![false; text.chars().count()];
    for (start, end) in tag_spans(text) {
        for slot in &mut mask[start..end] {
            *slot = true;
        }
    }
    mask
}

pub fn poor_text(text: &str) -> String {
    text.chars()
        .zip(tag_mask(text))
        .filter(|(_, is_tag)| !is_tag)
        .map(|(ch, _)| ch)
        .collect()
}

/// Counts content characters strictly before `rich_index`.
pub fn to_poor_index(text: &str, rich_index: usize) -> usize {
    tag_mask(text)
        .into_iter()
        .take(rich_index)
        .filter(|is_tag| !is_tag)
        .count()
}

/// Walks the mask until the `poor_index`-th content character.
pub fn to_rich_index(text: &str, poor_index: usize) -> usize {
    let mask = tag_mask(text);
    let mut seen = 0;
    for (rich_index, is_tag) in mask.iter().enumerate() {
        if !is_tag {
            if seen == poor_index {
                return rich_index;
            }
            seen += 1;
        }
    }
    mask.len()
}

/// Per content character, whether it sits inside at least one open/close
/// pair of the given literals.
pub fn style_flags(text: &str, open: &str, close: &str) -> Vec<bool> {
    let chars: Vec<char> = text.chars().collect();
    let mut flags = Vec::new();
    let mut depth = 0usize;
    let mut index = 0;
    while index < chars.len() {
        if let Some(len) = tag_len_at(&chars, index) {
            if starts_with(&chars, index, open) {
                depth += 1;
            } else if starts_with(&chars, index, close) {
                depth = depth.saturating_sub(1);
            }
            index += len;
        } else {
            flags.push(depth > 0);
            index += 1;
        }
    }
    flags
}

/// Whether every opening tag is closed by its own kind in LIFO order.
pub fn is_balanced(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let mut stack: Vec<&str> = Vec::new();
    let mut index = 0;
    while index < chars.len() {
        let Some(len) = tag_len_at(&chars, index) else {
            index += 1;
            continue;
        };
        let tag: String = chars[index..index + len].iter().collect();
        index += len;
        let name = if tag.starts_with("<o=") {
            continue;
        } else if tag.starts_with("</") {
            let name = tag.trim_start_matches("</").trim_end_matches('>');
            match stack.pop() {
                Some(open) if open == name => continue,
                _ => return false,
            }
        } else if tag.starts_with("<color=") {
            "color"
        } else if tag.starts_with("<size=") {
            "size"
        } else if tag == "<b>" {
            "b"
        } else {
            "i"
        };
        stack.push(name);
    }
    stack.is_empty()
}
