use crate::{
    error::{Health, Result, Stain},
    reporter::{error_summary, Buffer},
    Diag, ErrorCode, Reporter, UnboxedUntaggedDiagnostic,
};
use span::{FileName::Anon, Location, SourceMap};
use std::{collections::BTreeSet, path::PathBuf, str::FromStr, sync::Arc};
use utility::{
    default,
    paint::{paint_to_string, ColorChoice},
};

#[track_caller]
fn assert_format(diag: &UnboxedUntaggedDiagnostic, map: Option<&SourceMap>, expected: &str) {
    let actual = paint_to_string(
        |painter| diag.render(map, painter),
        // We are not interested in checking the coloring.
        ColorChoice::Never,
    )
    .unwrap();

    assert_eq!(actual, expected, "the output differs");
}

#[test]
fn format_no_location() {
    let diag = Diag::error().code(ErrorCode::E000).message("summary");

    assert_format(&diag, None, "error[E000]: summary");
}

#[test]
fn format_system_location_is_omitted() {
    let diag = Diag::error().message("summary").location(Location::System);

    assert_format(&diag, None, "error: summary");
}

#[test]
fn format_location_with_source() {
    let mut map = SourceMap::default();
    map.add_str(Anon, "alpha\nbeta\ngamma\n");

    let diag = Diag::error()
        .message("message")
        .location(Location::Source { file: Anon, line: 2, column: 2, length: 3 });

    assert_format(
        &diag,
        Some(&map),
        "\
error: message
  ┌─ ⟨anonymous⟩:2:2
  │
2 │ beta
  │  ═══",
    );
}

#[test]
fn format_zero_length_location_at_line_start() {
    let mut map = SourceMap::default();
    map.add_str(Anon, "x = 1\n");

    let diag = Diag::error()
        .message("message")
        .location(Location::Source { file: Anon, line: 1, column: 1, length: 0 });

    assert_format(
        &diag,
        Some(&map),
        "\
error: message
  ┌─ ⟨anonymous⟩:1:1
  │
1 │  x = 1
  │ ⟫⟪",
    );
}

#[test]
fn format_location_without_source() {
    let diag = Diag::error()
        .code(ErrorCode::E004)
        .message("wrong definition")
        .location(Location::new(PathBuf::from("types/t.toml"), 3, 1))
        .argument("expected", "Shop::Address")
        .note("clarification");

    assert_format(
        &diag,
        None,
        "\
error[E004]: wrong definition
  ┌─ types/t.toml:3:1
  │
 = expected: Shop::Address
 note: clarification",
    );
}

#[test]
fn format_path_no_location() {
    let diag = Diag::error()
        .message("there is something wrong with this file")
        .path("path/to/file.toml".into());

    assert_format(
        &diag,
        None,
        "\
error: there is something wrong with this file
  ── path/to/file.toml",
    );
}

#[test]
fn format_path_together_with_subdiagnostic() {
    let diag = Diag::warning()
        .message("this file looks spooky")
        .path("scary.toml".into())
        .help("better delete it");

    assert_format(
        &diag,
        None,
        "\
warning: this file looks spooky
  ┌─ scary.toml
  │
 help: better delete it",
    );
}

#[test]
fn format_multi_line_subdiagnostics() {
    let diag = Diag::error()
        .message("it")
        .help("helpful\ntip\n")
        .note("plain");

    assert_format(
        &diag,
        None,
        "\
error: it
 help: helpful
       tip
 note: plain",
    );
}

#[test]
fn arguments_are_replaced_by_key() {
    let diag = Diag::error()
        .argument("name", "A")
        .argument("other", 2)
        .argument("name", "B");

    assert_eq!(diag.argument_value("name"), Some("B"));
    assert_eq!(diag.argument_value("other"), Some("2"));
    assert_eq!(diag.arguments.len(), 2);
}

#[test]
fn buffer_reporter_collects_in_order() {
    let buffer: Buffer = default();
    let rep = Reporter::buffer(Arc::clone(&buffer));

    let _ = Diag::error()
        .code(ErrorCode::E001)
        .location(Location::new(PathBuf::from("b.toml"), 1, 1))
        .report(&rep);
    let _ = Diag::error()
        .code(ErrorCode::E002)
        .location(Location::new(PathBuf::from("a.toml"), 1, 1))
        .report(&rep);
    Diag::warning().message("careful").emit(&rep);

    let codes: Vec<_> = buffer
        .lock()
        .unwrap()
        .iter()
        .map(|diagnostic| diagnostic.error_code())
        .collect();

    assert_eq!(codes, [None, Some(ErrorCode::E002), Some(ErrorCode::E001)]);
}

#[test]
fn silent_reporter_still_yields_witness() {
    let result: Result = Err(Diag::error().report(&Reporter::silent()));

    assert!(result.is_err());
}

#[test]
fn error_summary_mentions_explained_codes() {
    let errors: BTreeSet<_> = [
        Diag::error().code(ErrorCode::E000).into_untagged(),
        Diag::error().code(ErrorCode::E001).message("x").into_untagged(),
    ]
    .into_iter()
    .collect();

    assert_format(
        &error_summary(&errors),
        None,
        "\
error: aborting due to 2 previous errors
 note: the error E001 has a detailed explanation
 help: run ‘strata explain E001’ to view it",
    );
}

#[test]
fn health_keeps_first_error() {
    let rep = Reporter::silent();
    let mut health = Health::default();

    let value: Option<u8> = Ok(3).stain(&mut health);
    assert_eq!(value, Some(3));
    assert!(!health.is_tainted());

    let value: Option<u8> = Err(Diag::error().report(&rep)).stain(&mut health);
    assert_eq!(value, None);
    assert!(health.is_tainted());
    assert!(Result::<()>::from(health).is_err());
}

#[test]
fn error_codes_parse_and_explain() {
    assert_eq!(ErrorCode::from_str("E006"), Ok(ErrorCode::E006));
    assert!(ErrorCode::from_str("E999").is_err());
    assert!(ErrorCode::E006.explanation().is_some());
    assert!(ErrorCode::E000.explanation().is_none());
}
