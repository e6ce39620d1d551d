use super::{FileName, Location, SourceMap};
use std::path::PathBuf;

fn location(line: u32, column: u32, length: u32) -> Location {
    Location::Source { file: FileName::Anon, line, column, length }
}

#[test]
fn empty_stack_sentinel_is_system() {
    assert!(Location::default().is_system());
    assert_eq!(Location::default().file(), None);
}

#[test]
fn location_on_first_line() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "alpha = 1\nbeta = 2\n");

    assert_eq!(map[file].location(0..5), location(1, 1, 5));
}

#[test]
fn location_on_later_line() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "alpha = 1\nbeta = 2\n");

    assert_eq!(map[file].location(17..18), location(2, 8, 1));
}

#[test]
fn location_across_line_break_is_cut_off() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "ab\ncd");

    assert_eq!(map[file].location(1..5), location(1, 2, 1));
}

#[test]
fn location_counts_characters_not_bytes() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "äö = x");

    assert_eq!(map[file].location(5..6), location(1, 4, 1));
}

#[test]
fn location_past_end_is_clamped() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "ab");

    assert_eq!(map[file].location(7..9), location(1, 3, 0));
}

#[test]
fn lines_without_line_breaks() {
    let mut map = SourceMap::default();
    let file = map.add_str(FileName::Anon, "one\r\ntwo\nthree");

    assert_eq!(map[file].line(1), Some("one"));
    assert_eq!(map[file].line(3), Some("three"));
    assert_eq!(map[file].line(0), None);
    assert_eq!(map[file].line(4), None);
}

#[test]
fn latest_file_by_path_wins() {
    let mut map = SourceMap::default();
    let path = PathBuf::from("/modules/a/types/t.toml");
    map.add_str(path.clone(), "old");
    map.add_str(path.clone(), "new");

    assert_eq!(map.file_by_path(&path).unwrap().content().as_str(), "new");
}

#[test]
fn display_source_location() {
    assert_eq!(
        Location::new(PathBuf::from("types/t.toml"), 3, 7).to_string(),
        "types/t.toml:3:7"
    );
}
