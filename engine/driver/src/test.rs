use crate::{describe, discover, explain, parse_error_code, resolve, similarly_named};
use diagnostics::{reporter::Buffer, Code, ErrorCode, LintCode, Reporter, Severity, Subseverity};
use entity::{Namespace, TypedName};
use loader::{Environment, Settings};
use std::{fs, path::Path, sync::Arc};
use tempfile::TempDir;
use utility::{
    default,
    paint::{paint_to_string, ColorChoice},
};

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn environment(module_path: &Path) -> (Environment, Buffer) {
    let buffer: Buffer = default();
    let settings = Settings { module_path: Some(module_path.to_owned()), ..default() };
    let environment =
        Environment::new(settings, Arc::new(Reporter::buffer(buffer.clone())), default()).unwrap();

    (environment, buffer)
}

fn shop() -> TempDir {
    let root = TempDir::new().unwrap();
    write(
        root.path(),
        "shop/types/address.toml",
        "[object]\nconstructible = true\nattributes = { street = \"String\", \
         zip = { type = \"Integer\", optional = true } }\n\n\
         [annotations]\ndeprecated = \"use Location\"\n",
    );
    write(root.path(), "shop/types/location.toml", "alias = \"String\"\n");
    write(
        root.path(),
        "shop/tasks/ship.toml",
        "parameters = [{ name = \"to\", type = \"Shop::Location\" }]\n",
    );
    write(root.path(), "billing/functions/total.toml", "returns = \"Integer\"\n");
    root
}

fn type_names(names: &[&str]) -> Vec<TypedName> {
    names.iter().map(|name| TypedName::new(Namespace::Type, name)).collect()
}

#[test]
fn similarly_named_picks_the_closest_candidate() {
    let candidates = type_names(&["Shop::Adres", "Shop::Addresses", "Shop::Adress"]);
    let name = TypedName::new(Namespace::Type, "shop::address");

    let similar = similarly_named(&name, &candidates).unwrap();
    assert_eq!(similar.name(), "Shop::Adress");
}

#[test]
fn similarly_named_ignores_distant_and_equal_names() {
    let candidates = type_names(&["Shop::Address", "Billing::Amount"]);

    let name = TypedName::new(Namespace::Type, "Shop::Address");
    assert!(similarly_named(&name, &candidates).is_none());

    let name = TypedName::new(Namespace::Type, "Ledger");
    assert!(similarly_named(&name, &candidates).is_none());
}

#[test]
fn error_codes_are_parsed_ignoring_the_case() {
    assert_eq!(parse_error_code("E003"), Some(ErrorCode::E003));
    assert_eq!(parse_error_code(" e012 "), Some(ErrorCode::E012));
    assert_eq!(parse_error_code("E999"), None);
    assert_eq!(parse_error_code("3"), None);
}

#[test]
fn explain_reports_invalid_and_unexplained_codes() {
    let buffer: Buffer = default();
    let rep = Reporter::buffer(buffer.clone());

    let codes = ["E004".to_owned(), "E999".to_owned(), "E000".to_owned()];
    assert!(explain(&codes, ColorChoice::Never, &rep).is_err());

    let buffer = buffer.lock().unwrap();
    assert_eq!(buffer.len(), 2);
    assert!(buffer.iter().all(|diagnostic| diagnostic.severity == Severity::Error));
}

#[test]
fn explain_accepts_explained_codes() {
    let buffer: Buffer = default();
    let rep = Reporter::buffer(buffer.clone());

    assert!(explain(&["e001".to_owned()], ColorChoice::Never, &rep).is_ok());
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn resolve_reports_malformed_names() {
    let root = shop();
    let (environment, buffer) = environment(root.path());

    let result = environment.try_with(|cx| resolve(cx, Namespace::Type, "Shop::::Address"));
    assert!(result.is_err());

    let buffer = buffer.lock().unwrap();
    let diagnostic = buffer.iter().next().unwrap();
    assert_eq!(diagnostic.error_code(), Some(ErrorCode::E010));
    assert_eq!(diagnostic.argument_value("name"), Some("Shop::::Address"));
}

#[test]
fn resolve_suggests_a_similar_name_on_a_miss() {
    let root = shop();
    let (environment, buffer) = environment(root.path());

    let result = environment.try_with(|cx| resolve(cx, Namespace::Type, "Shop::Adress"));
    assert!(result.is_err());

    let buffer = buffer.lock().unwrap();
    let diagnostic = buffer.iter().next().unwrap();
    assert_eq!(diagnostic.severity, Severity::Error);
    assert!(diagnostic.subdiagnostics.iter().any(|subdiagnostic| {
        subdiagnostic.severity == Subseverity::Help
            && subdiagnostic.message.contains("Shop::Address")
    }));
}

#[test]
fn resolve_warns_about_deprecated_types() {
    let root = shop();
    let (environment, buffer) = environment(root.path());

    let entity = environment
        .try_with(|cx| resolve(cx, Namespace::Type, "shop::address"))
        .unwrap();
    assert_eq!(entity.name().name(), "Shop::Address");

    let buffer = buffer.lock().unwrap();
    let warning = buffer.iter().next().unwrap();
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.code, Some(Code::Lint(LintCode::Deprecated)));
    assert!(warning
        .subdiagnostics
        .iter()
        .any(|subdiagnostic| subdiagnostic.message == "use Location"));
}

#[test]
fn describe_lists_the_attributes_of_an_object_type() {
    let root = shop();
    let (environment, _) = environment(root.path());

    let entity = environment
        .try_with(|cx| resolve(cx, Namespace::Type, "Shop::Address"))
        .unwrap();
    let description =
        paint_to_string(|painter| describe(&entity, painter), ColorChoice::Never).unwrap();

    assert!(description.starts_with("type Shop::Address\n"));
    assert!(description.contains("  constructible\n"));
    assert!(description.contains("  attribute street: String\n"));
    assert!(description.contains("  attribute zip?: Integer\n"));
    assert!(description.contains("  deprecated: use Location\n"));
}

#[test]
fn describe_builtin_type() {
    let root = TempDir::new().unwrap();
    let (environment, _) = environment(root.path());

    let entity = environment
        .try_with(|cx| resolve(cx, Namespace::Type, "String"))
        .unwrap();
    let description =
        paint_to_string(|painter| describe(&entity, painter), ColorChoice::Never).unwrap();

    assert_eq!(description, "type String\n  built in\n");
}

#[test]
fn discover_filters_by_module_and_namespace() {
    let root = shop();
    let (environment, buffer) = environment(root.path());

    let names = environment
        .try_with(|cx| discover(cx, &environment, Some(Namespace::Type), Some("SHOP")))
        .unwrap();
    let names: Vec<_> = names.iter().map(TypedName::name).collect();
    assert!(names.contains(&"Shop::Address"));
    assert!(names.contains(&"Shop::Location"));
    assert!(!names.contains(&"Billing::Total"));
    assert!(!names.contains(&"shop::ship"));

    let tasks = environment
        .try_with(|cx| discover(cx, &environment, Some(Namespace::Task), None))
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].name(), "shop::ship");

    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn discover_reports_unknown_modules() {
    let root = shop();
    let (environment, buffer) = environment(root.path());

    let result = environment.try_with(|cx| discover(cx, &environment, None, Some("ledger")));
    assert!(result.is_err());

    let buffer = buffer.lock().unwrap();
    let diagnostic = buffer.iter().next().unwrap();
    assert!(diagnostic.subdiagnostics.iter().any(|subdiagnostic| {
        subdiagnostic.message == "the available modules are ‘billing’ and ‘shop’"
    }));
}
