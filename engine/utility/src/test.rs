use super::{
    case::{camel_case, capitalize, capitalize_segments},
    paint::{paint_to_string, AnsiColor, ColorChoice, Effects, Highlight, IntoStyle},
    Conjunction, FormatError, ListingExt, QuoteExt,
};
use std::io::{self, Write};

#[test]
fn listing_no_elements() {
    assert_eq!(std::iter::empty::<u8>().list(Conjunction::And), "");
}

#[test]
fn listing_one_element() {
    assert_eq!(std::iter::once(1).list(Conjunction::Or), "1");
}

#[test]
fn listing_three_elements() {
    assert_eq!([1, 2, 3].into_iter().list(Conjunction::Or), "1, 2 or 3");
}

#[test]
fn listing_quoted_names() {
    assert_eq!(
        ["Foo", "Bar"].iter().map(QuoteExt::quote).list(Conjunction::And),
        "‘Foo’ and ‘Bar’"
    );
}

#[test]
fn camel_case_of_snake_case_stem() {
    assert_eq!(camel_case("my_type"), "MyType");
    assert_eq!(camel_case("a__b_"), "AB");
    assert_eq!(camel_case("single"), "Single");
}

#[test]
fn capitalize_keeps_tail() {
    assert_eq!(capitalize("fooBar"), "FooBar");
    assert_eq!(capitalize(""), "");
}

#[test]
fn capitalize_every_segment() {
    assert_eq!(capitalize_segments("mymod::address"), "Mymod::Address");
}

#[test]
fn painting_without_color_is_plain() {
    let output = paint_to_string(
        |painter| {
            painter.set(AnsiColor::Red)?;
            write!(painter, "plain")?;
            painter.unset()
        },
        ColorChoice::Never,
    )
    .unwrap();

    assert_eq!(output, "plain");
}

#[test]
fn color_choice_from_str() {
    assert_eq!("never".parse::<ColorChoice>().unwrap(), ColorChoice::Never);
    assert!("sometimes".parse::<ColorChoice>().is_err());
}

#[test]
fn unsetting_a_nested_style_restores_the_outer_one() {
    let output = paint_to_string(
        |painter| {
            painter.set(AnsiColor::Red)?;
            painter.set(Effects::BOLD)?;
            write!(painter, "inner")?;
            painter.unset()?;
            write!(painter, "outer")?;
            painter.unset()
        },
        ColorChoice::Always,
    )
    .unwrap();

    let red = AnsiColor::Red.on_default().render().to_string();
    let (inner, outer) = output.split_once("inner").unwrap();
    assert!(inner.contains(&red));
    assert!(outer.split_once("outer").unwrap().0.contains(&red));
}

#[test]
fn emphasis_is_bold_without_color() {
    let style = Highlight::Emphasis.into_style();
    assert_eq!(style.get_fg_color(), None);
    assert_eq!(style.get_effects(), Effects::BOLD);
    assert_eq!(Highlight::Kind.strong().get_effects(), Effects::BOLD);
}

#[test]
fn io_errors_are_formatted_as_clauses() {
    let error = io::Error::from(io::ErrorKind::NotFound);
    assert_eq!(error.format(), "it does not exist");

    let error = io::Error::new(io::ErrorKind::Other, "the disk is on fire");
    assert_eq!(error.format(), "the disk is on fire");
}
