#![no_main]

use libfuzzer_sys::fuzz_target;
use rich_readme::{Direction, TagMap};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let map = TagMap::build(&input);
    assert_eq!(map.len(), input.chars().count());
    for rich_index in 0..=map.len() {
        let poor_index = map.to_poor_index(rich_index);
        assert!(map.is_content_position(map.to_rich_index(poor_index)));
        let repaired = map
            .nearest_content_index(rich_index, Direction::Nearest)
            .unwrap();
        assert!(map.is_content_position(repaired));
    }
});
