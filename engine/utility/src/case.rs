//! Conversions between the naming conventions of files and definitions.

/// Uppercase the first character of the given segment leaving the rest untouched.
pub fn capitalize(segment: &str) -> String {
    let mut characters = segment.chars();

    match characters.next() {
        Some(first) => first.to_uppercase().chain(characters).collect(),
        None => String::new(),
    }
}

/// Turn a snake case file stem into a camel case type name segment.
///
/// # Examples
///
/// ```
/// # use utility::case::camel_case;
/// assert_eq!(camel_case("my_type"), "MyType");
/// assert_eq!(camel_case("address"), "Address");
/// ```
pub fn camel_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|piece| !piece.is_empty())
        .map(capitalize)
        .collect()
}

/// Capitalize every segment of a `::`-separated name.
pub fn capitalize_segments(name: &str) -> String {
    name.split("::")
        .map(capitalize)
        .collect::<Vec<_>>()
        .join("::")
}
