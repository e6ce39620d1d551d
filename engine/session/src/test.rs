use crate::{
    ambient,
    resolve::{add_types, resolve_type_set},
    Context, Entries, Entry, Loader, ParentedLoader, StaticLoader,
};
use diagnostics::{reporter::Buffer, ErrorCode, Reporter};
use entity::{
    Annotation, Attribute, Entity, Namespace, ObjectType, Origin, Type, TypeExpression, TypeKind,
    TypeSet, TypedName, Version,
};
use span::Location;
use std::{
    cell::RefCell,
    panic::{catch_unwind, AssertUnwindSafe},
    path::PathBuf,
    rc::Rc,
    sync::Arc,
};
use utility::default;

fn context() -> (Context, Buffer) {
    let buffer: Buffer = default();
    let loader = Arc::new(ParentedLoader::new(Arc::new(StaticLoader::new())));
    let cx = Context::new(loader, Arc::new(Reporter::buffer(buffer.clone())), default());

    (cx, buffer)
}

fn codes(buffer: &Buffer) -> Vec<ErrorCode> {
    buffer
        .lock()
        .unwrap()
        .iter()
        .filter_map(|diagnostic| diagnostic.error_code())
        .collect()
}

fn type_name(name: &str) -> TypedName {
    TypedName::new(Namespace::Type, name)
}

fn object_type(name: &str, parent: Option<&str>, attributes: &[&str]) -> Type {
    Type {
        name: type_name(name),
        kind: TypeKind::Object(ObjectType {
            parent: parent.map(ToOwned::to_owned),
            attributes: attributes
                .iter()
                .map(|&attribute| {
                    let attribute_type = Attribute {
                        ty: TypeExpression::new("String"),
                        optional: false,
                    };
                    (attribute.to_owned(), attribute_type)
                })
                .collect(),
            constructible: false,
        }),
        annotations: Vec::new(),
        origin: Origin::default(),
    }
}

fn object(name: &str, parent: Option<&str>) -> Entity {
    Entity::Type(Arc::new(object_type(name, parent, &[])))
}

fn alias(name: &str, expression: &str) -> Entity {
    Entity::Type(Arc::new(Type {
        name: type_name(name),
        kind: TypeKind::Alias(TypeExpression::new(expression)),
        annotations: Vec::new(),
        origin: Origin::default(),
    }))
}

fn type_set(name: &str, members: Vec<Entity>) -> Entity {
    let name = type_name(name);
    let types = members
        .into_iter()
        .map(|member| {
            let relative = member
                .name()
                .relative_to(&name)
                .map_or_else(|| member.name().to_string(), |relative| relative.to_string());
            (relative, member)
        })
        .collect();

    Entity::TypeSet(Arc::new(TypeSet {
        name,
        version: Version { major: 1, minor: 0, patch: 0 },
        authority: entity::runtime_authority(),
        types,
        origin: Origin::default(),
    }))
}

#[test]
fn builtins_are_found_unknown_names_are_missed() {
    let (mut cx, buffer) = context();

    assert!(cx.resolve_type("Integer").unwrap().is_some());
    assert!(cx.resolve_type("Shop::Address").unwrap().is_none());
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn static_loader_does_not_cache_misses() {
    let (mut cx, _) = context();
    let loader = StaticLoader::empty();
    let name = type_name("Late");

    assert!(matches!(loader.load_entry(&mut cx, &name), Entry::Missing));
    assert!(loader.get_entry(&name).is_none());
}

#[test]
fn resolving_twice_yields_the_same_entity() {
    let (mut cx, _) = context();
    cx.define(alias("Port", "Integer[0, 65535]")).unwrap();

    let first = cx.resolve_type("Port").unwrap().unwrap();
    let second = cx.resolve_type("port").unwrap().unwrap();

    assert!(first.is_same(&second));
}

#[test]
fn cached_miss_is_stable() {
    let (mut cx, _) = context();
    let base = Arc::new(StaticLoader::empty());
    let layer = ParentedLoader::new(base.clone());
    let name = type_name("Late");

    assert!(layer.resolve(&mut cx, &name).unwrap().is_none());

    base.set_entry(&cx, &name, alias("Late", "String")).unwrap();

    assert!(layer.resolve(&mut cx, &name).unwrap().is_none());
    assert!(base.resolve(&mut cx, &name).unwrap().is_some());
}

#[test]
fn explicit_definition_overrides_cached_miss() {
    let (mut cx, _) = context();
    let name = type_name("Late");

    assert!(cx.resolve(&name).unwrap().is_none());
    cx.define(alias("Late", "String")).unwrap();

    assert!(cx.resolve(&name).unwrap().is_some());
}

#[test]
fn equal_redefinition_keeps_first_entity() {
    let (mut cx, buffer) = context();

    let first = cx.define(alias("Port", "Integer")).unwrap();
    let second = cx.define(alias("Port", "Integer")).unwrap();

    assert!(first.is_same(&second));
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn conflicting_redefinition_is_reported_with_both_origins() {
    let (mut cx, buffer) = context();

    let mut first = object_type("Address", None, &[]);
    first.origin = Origin(Location::new(PathBuf::from("a.toml"), 1, 1));
    let mut second = object_type("Address", None, &["street"]);
    second.origin = Origin(Location::new(PathBuf::from("b.toml"), 2, 1));

    cx.define(Entity::Type(Arc::new(first))).unwrap();
    assert!(cx.define(Entity::Type(Arc::new(second))).is_err());

    let buffer = buffer.lock().unwrap();
    let diagnostic = buffer.first().unwrap();
    assert_eq!(diagnostic.error_code(), Some(ErrorCode::E006));
    assert_eq!(diagnostic.argument_value("first_origin"), Some("a.toml:1:1"));
    assert_eq!(diagnostic.argument_value("second_origin"), Some("b.toml:2:1"));
}

#[test]
fn with_loader_restores_previous_loader() {
    let (mut cx, _) = context();
    let original = cx.loader().clone();
    let scratch: Arc<dyn Loader> = Arc::new(ParentedLoader::new(original.clone()));

    cx.with_loader(scratch.clone(), |cx| {
        assert!(Arc::ptr_eq(cx.loader(), &scratch));
        cx.define(alias("Scratch", "String")).unwrap();
    });

    assert!(Arc::ptr_eq(cx.loader(), &original));
    assert!(cx.resolve_type("Scratch").unwrap().is_none());
}

#[test]
fn with_loader_restores_previous_loader_on_unwind() {
    let (mut cx, _) = context();
    let original = cx.loader().clone();
    let scratch: Arc<dyn Loader> = Arc::new(StaticLoader::empty());

    let result = catch_unwind(AssertUnwindSafe(|| {
        cx.with_loader(scratch, |_| panic!("failure inside of the body"));
    }));

    assert!(result.is_err());
    assert!(Arc::ptr_eq(cx.loader(), &original));
}

#[test]
fn fork_isolates_both_ways() {
    let (mut cx, _) = context();
    let before = cx.define(alias("Before", "String")).unwrap();

    let mut fork = cx.fork();
    fork.define(alias("Child", "String")).unwrap();
    cx.define(alias("Parent", "String")).unwrap();

    assert!(cx.resolve_type("Child").unwrap().is_none());
    assert!(fork.resolve_type("Parent").unwrap().is_none());

    let through_parent = cx.resolve_type("Before").unwrap().unwrap();
    let through_fork = fork.resolve_type("Before").unwrap().unwrap();
    assert!(through_parent.is_same(&before));
    assert!(through_fork.is_same(&before));
}

#[test]
fn forking_leaves_the_loader_alone_until_the_next_registration() {
    let (mut cx, _) = context();
    let original = cx.loader().clone();

    for _ in 0..100 {
        let _ = cx.fork();
    }
    assert!(Arc::ptr_eq(cx.loader(), &original));

    cx.define(alias("Late", "String")).unwrap();
    let layered = cx.loader().clone();
    assert!(!Arc::ptr_eq(&layered, &original));
    assert!(original.get_entry(&type_name("Late")).is_none());

    cx.define(alias("Later", "String")).unwrap();
    for _ in 0..100 {
        let _ = cx.fork();
    }
    assert!(Arc::ptr_eq(cx.loader(), &layered));
}

#[test]
fn forking_inside_with_loader_keeps_registrations_in_the_installed_loader() {
    let (mut cx, _) = context();
    let scratch: Arc<dyn Loader> = Arc::new(ParentedLoader::new(cx.loader().clone()));

    cx.with_loader(scratch.clone(), |cx| {
        let _fork = cx.fork();
        cx.define(alias("Scoped", "String")).unwrap();
        assert!(Arc::ptr_eq(cx.loader(), &scratch));
    });

    let entry = scratch.get_entry(&type_name("Scoped"));
    assert!(entry.is_some_and(|entry| entry.is_found()));
}

#[test]
fn fork_can_move_to_another_thread() {
    let (mut cx, _) = context();
    cx.define(alias("Shared", "String")).unwrap();
    let mut fork = cx.fork();

    let found = std::thread::spawn(move || fork.resolve_type("Shared").unwrap().is_some())
        .join()
        .unwrap();

    assert!(found);
}

#[test]
fn fork_copies_stack_and_variables() {
    let (mut cx, _) = context();
    cx.push_location(Location::new(PathBuf::from("plan.toml"), 4, 2));
    cx.set("answer", 42_u32);

    let mut fork = cx.fork();
    fork.push_location(Location::System);
    fork.set("other", "value");

    assert_eq!(fork.stack().len(), 2);
    assert_eq!(cx.stack().len(), 1);
    assert!(Arc::ptr_eq(cx.get("answer").unwrap(), fork.get("answer").unwrap()));
    assert_eq!(fork.get_as::<u32>("answer"), Some(&42));
    assert!(cx.get("other").is_none());
}

#[test]
fn fork_isolates_implementation_registries() {
    struct Address;
    struct Street;

    let (mut cx, buffer) = context();
    cx.register_implementation::<Address>(&type_name("Address")).unwrap();

    let mut fork = cx.fork();
    fork.register_implementation::<Street>(&type_name("Street")).unwrap();

    assert_eq!(
        fork.registry().name_for(std::any::TypeId::of::<Address>()),
        Some(type_name("Address"))
    );
    assert_eq!(cx.registry().name_for(std::any::TypeId::of::<Street>()), None);

    assert!(cx.register_implementation::<Street>(&type_name("Address")).is_err());
    assert_eq!(codes(&buffer), [ErrorCode::E011]);
}

#[test]
fn location_stack() {
    let (mut cx, _) = context();
    assert!(cx.top_location().is_system());

    let location = Location::new(PathBuf::from("types/address.toml"), 3, 1);
    let inner = cx.with_location(location.clone(), |cx| cx.top_location());

    assert_eq!(inner, location);
    assert!(cx.top_location().is_system());
    assert_eq!(cx.pop_location(), None);
}

#[test]
fn errors_default_to_top_location() {
    let (mut cx, _) = context();
    let location = Location::new(PathBuf::from("tasks/init.toml"), 1, 1);
    cx.push_location(location.clone());

    let diagnostic = cx.error(ErrorCode::E000, None);
    assert_eq!(diagnostic.location, Some(location));

    let diagnostic = cx.error(ErrorCode::E000, Some(Location::System));
    assert_eq!(diagnostic.location, Some(Location::System));
}

#[test]
fn variables() {
    let (mut cx, _) = context();
    assert!(cx.get("missing").is_none());

    cx.set("name", String::from("shop"));
    assert_eq!(cx.get_as::<String>("name").map(String::as_str), Some("shop"));
    assert_eq!(cx.get_as::<u32>("name"), None);

    assert!(cx.delete("name").is_some());
    assert!(cx.get("name").is_none());
}

#[test]
fn no_current_context_outside_of_scope() {
    ambient::reset();

    let error = ambient::current().err().unwrap();
    assert_eq!(error.error_code(), Some(ErrorCode::E007));
}

#[test]
fn nested_current_contexts_are_restored() {
    ambient::reset();
    let (outer, _) = context();
    let (inner, _) = context();
    let outer = Rc::new(RefCell::new(outer));
    let inner = Rc::new(RefCell::new(inner));

    ambient::run_with_current(outer.clone(), || {
        ambient::run_with_current(inner.clone(), || {
            assert!(Rc::ptr_eq(&ambient::current().unwrap(), &inner));
        });
        assert!(Rc::ptr_eq(&ambient::current().unwrap(), &outer));

        let unwound = catch_unwind(AssertUnwindSafe(|| {
            ambient::run_with_current(inner.clone(), || panic!("failure"));
        }));
        assert!(unwound.is_err());
        assert!(Rc::ptr_eq(&ambient::current().unwrap(), &outer));
    });

    assert!(!ambient::is_set());
}

#[test]
fn with_current_gives_access_to_context() {
    ambient::reset();
    let (cx, _) = context();

    let found = ambient::run_with_current(Rc::new(RefCell::new(cx)), || {
        ambient::with_current(|cx| cx.resolve_type("String").unwrap().is_some())
    });

    assert_eq!(found.ok(), Some(true));
}

#[test]
fn forward_references_within_batch() {
    let (mut cx, buffer) = context();

    let result = add_types(
        &mut cx,
        vec![object("Car", Some("Vehicle")), object("Vehicle", Some("Object"))],
    );

    assert!(result.is_ok());
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn type_sets_are_flattened() {
    let (mut cx, _) = context();

    let set = type_set(
        "Shop",
        vec![
            object("Shop::Address", None),
            type_set("Shop::Billing", vec![alias("Shop::Billing::Amount", "Float")]),
        ],
    );
    let registered = add_types(&mut cx, vec![set]).unwrap();

    let names: Vec<_> = registered.iter().map(|entity| entity.name().to_string()).collect();
    assert_eq!(
        names,
        ["Shop", "Shop::Address", "Shop::Billing", "Shop::Billing::Amount"]
    );
    assert!(cx.resolve_type("Shop::Billing::Amount").unwrap().is_some());
}

#[test]
fn flattening_keeps_present_registrations() {
    let (mut cx, buffer) = context();

    let direct = cx.define(alias("Shop::Money", "Float")).unwrap();
    let set = type_set("Shop", vec![alias("Shop::Money", "Integer")]);
    add_types(&mut cx, vec![set]).unwrap();

    assert!(cx.resolve_type("Shop::Money").unwrap().unwrap().is_same(&direct));
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn resolving_type_set_twice_registers_members_once() {
    let (mut cx, _) = context();

    let set = type_set("Shop", vec![object("Shop::Address", None)]);
    let Entity::TypeSet(set) = cx.define(set).unwrap() else {
        unreachable!();
    };

    let first = resolve_type_set(&mut cx, &set).unwrap();
    let second = resolve_type_set(&mut cx, &set).unwrap();

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn parents_are_resolved_relative_to_type_set_first() {
    let (mut cx, buffer) = context();

    let set = type_set(
        "Shop",
        vec![object("Shop::Base", None), object("Shop::Derived", Some("Base"))],
    );

    assert!(add_types(&mut cx, vec![set]).is_ok());
    assert!(buffer.lock().unwrap().is_empty());
}

#[test]
fn undefined_parent() {
    let (mut cx, buffer) = context();

    assert!(add_types(&mut cx, vec![object("Car", Some("Vehicle"))]).is_err());
    assert_eq!(codes(&buffer), [ErrorCode::E008]);
}

#[test]
fn parent_must_be_object_type() {
    let (mut cx, buffer) = context();

    let result = add_types(&mut cx, vec![alias("Name", "String"), object("Car", Some("Name"))]);

    assert!(result.is_err());
    assert_eq!(codes(&buffer), [ErrorCode::E015]);
}

#[test]
fn all_invalid_annotations_are_reported() {
    let (mut cx, buffer) = context();

    let mut address = object_type("Address", None, &["street"]);
    address.annotations = vec![
        Annotation::Tags { attribute: "city".into(), tags: vec!["indexed".into()] },
        Annotation::Tags { attribute: "street".into(), tags: vec!["indexed".into()] },
        Annotation::Tags { attribute: "zip".into(), tags: vec!["indexed".into()] },
    ];
    let mut other = object_type("Other", None, &[]);
    other.annotations = vec![Annotation::Deprecated { message: None }];

    let result = add_types(
        &mut cx,
        vec![Entity::Type(Arc::new(address)), Entity::Type(Arc::new(other))],
    );

    assert!(result.is_err());
    // Both diagnostics share their location and code and differ in their notes.
    assert_eq!(codes(&buffer), [ErrorCode::E009, ErrorCode::E009]);
}

#[test]
fn constructors_are_registered() {
    let (mut cx, _) = context();

    let mut address = object_type("Address", None, &["street"]);
    if let TypeKind::Object(object) = &mut address.kind {
        object.constructible = true;
    }
    add_types(&mut cx, vec![Entity::Type(Arc::new(address))]).unwrap();

    let constructor = cx
        .resolve(&TypedName::new(Namespace::Constructor, "Address"))
        .unwrap();
    assert!(matches!(constructor, Some(Entity::Function(_))));
}

#[test]
fn concurrent_slot_writes_agree() {
    let entries = Entries::default();
    let name = type_name("Contested");

    let winners: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|index| {
                let entries = &entries;
                let name = &name;
                scope.spawn(move || {
                    let candidate = alias("Contested", &format!("Integer[{index}]"));
                    entries.settle(name, Entry::Found(candidate))
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let first = winners[0].entity().unwrap();
    assert!(winners.iter().all(|winner| winner.entity().unwrap().is_same(first)));
}

#[test]
fn discover_lists_known_names_sorted() {
    let (mut cx, _) = context();
    cx.define(alias("Shop::Zip", "String")).unwrap();
    cx.define(alias("Shop::Amount", "Float")).unwrap();

    let loader = cx.loader().clone();
    let names = loader
        .discover(&mut cx, &|name: &TypedName| name.module_part() == Some("Shop"))
        .unwrap();

    assert_eq!(names, [type_name("Shop::Amount"), type_name("Shop::Zip")]);
}
