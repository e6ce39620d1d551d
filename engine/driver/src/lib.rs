use cli::{Command, GlobalOptions};
use diagnostics::{
    error::{Health, Result},
    reporter::ErasedReportedError,
    Diag, Diagnostic, ErrorCode, LintCode, Reporter,
};
use entity::{Annotation, Entity, FunctionKind, Namespace, Parameter, TypeKind, TypedName};
use loader::Environment;
use session::{Context, Loader};
use span::SourceMap;
use std::{
    borrow::Cow,
    cmp::max,
    io::{self, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, RwLock,
    },
};
use utility::{
    default,
    paint::{paint, ColorChoice, Highlight, Painter},
    Conjunction, ListingExt, QuoteExt,
};

mod cli;
#[cfg(test)]
mod test;

pub fn main() -> Result {
    set_panic_hook();

    let (command, opts) = cli::arguments()?;

    let map: Arc<RwLock<SourceMap>> = default();
    let reported_any_errors: Arc<AtomicBool> = default();
    let rep =
        Reporter::buffered_stderr(opts.color, reported_any_errors.clone()).with_map(map.clone());

    let result = execute_command(command, &opts, map, rep);

    let reported_any_errors = reported_any_errors.load(Ordering::SeqCst);

    if let Err(error) = result {
        assert!(reported_any_errors, "an error occurred but nothing was reported");
        return Err(error);
    }

    // an error may be reported without failing the command, e.g. inside a discarded fork
    if reported_any_errors {
        return Err(ErasedReportedError::new_unchecked());
    }

    Ok(())
}

fn execute_command(
    command: Command,
    opts: &GlobalOptions,
    map: Arc<RwLock<SourceMap>>,
    rep: Reporter,
) -> Result {
    let rep = Arc::new(rep);

    match command {
        Command::Resolve { namespace, name } => {
            let environment = Environment::new(opts.settings(), rep, map)?;
            let entity = environment.try_with(|cx| resolve(cx, namespace, &name))?;

            paint(|painter| describe(&entity, painter), opts.color).unwrap();
            Ok(())
        }
        Command::Discover { namespace, module } => {
            let environment = Environment::new(opts.settings(), rep, map)?;
            let names = environment
                .try_with(|cx| discover(cx, &environment, namespace, module.as_deref()))?;

            paint(
                |painter| {
                    for name in &names {
                        painter.set(Highlight::Namespace)?;
                        write!(painter, "{:<11}", name.namespace())?;
                        painter.unset()?;
                        writeln!(painter, " {name}")?;
                    }
                    Ok(())
                },
                opts.color,
            )
            .unwrap();
            Ok(())
        }
        Command::Explain { codes } => explain(&codes, opts.color, &rep),
    }
}

/// Resolve the given name reporting a miss as an error.
fn resolve(cx: &mut Context, namespace: Namespace, name: &str) -> Result<Entity> {
    let Some(name) = TypedName::parse(namespace, name) else {
        return Err(Diagnostic::error()
            .code(ErrorCode::E010)
            .message(format!("the name {} is malformed", name.quote()))
            .argument("name", name)
            .note("names consist of identifiers separated by ‘::’")
            .report(cx.rep()));
    };

    if let Some(entity) = cx.resolve(&name)? {
        warn_if_deprecated(cx, &entity);
        return Ok(entity);
    }

    let loader = cx.loader().clone();
    let candidates = loader.discover(cx, &|candidate| candidate.namespace() == namespace)?;

    Err(Diagnostic::error()
        .message(format!("the {namespace} {} is not defined", (&name).quote()))
        .with(|it| match similarly_named(&name, &candidates) {
            Some(similar) => it.help(format!(
                "a {namespace} with a similar name exists: {}",
                similar.quote(),
            )),
            None => it,
        })
        .report(cx.rep()))
}

fn warn_if_deprecated(cx: &Context, entity: &Entity) {
    for annotation in entity.annotations() {
        let Annotation::Deprecated { message } = annotation else {
            continue;
        };

        Diagnostic::warning()
            .code(LintCode::Deprecated)
            .message(format!("the {entity} is deprecated"))
            .location(entity.origin().clone())
            .with(|it| match message {
                Some(message) => it.note(message.clone()),
                None => it,
            })
            .emit(cx.rep());
    }
}

/// The candidate closest to the given name if it is close enough.
fn similarly_named<'c>(name: &TypedName, candidates: &'c [TypedName]) -> Option<&'c TypedName> {
    let name = name.name().to_lowercase();

    candidates
        .iter()
        .map(|candidate| {
            let distance = strsim::levenshtein(&candidate.name().to_lowercase(), &name);
            (candidate, distance)
        })
        .filter(|&(_, distance)| distance > 0 && distance <= max(name.len(), 3) / 3)
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate)
}

fn discover(
    cx: &mut Context,
    environment: &Environment,
    namespace: Option<Namespace>,
    module: Option<&str>,
) -> Result<Vec<TypedName>> {
    let loader: Arc<dyn Loader> = match module {
        Some(module) => match environment.loader_for(module) {
            Some(loader) => loader.clone(),
            None => {
                return Err(Diagnostic::error()
                    .message(format!("the module {} does not exist", module.quote()))
                    .note(match environment.modules() {
                        [] => Cow::from("the module path does not contain any modules"),
                        modules => format!(
                            "the available modules are {}",
                            modules
                                .iter()
                                .filter_map(|loader| loader.module_name())
                                .map(QuoteExt::quote)
                                .list(Conjunction::And),
                        )
                        .into(),
                    })
                    .report(cx.rep()));
            }
        },
        None => cx.loader().clone(),
    };

    let names = loader.discover(cx, &|name| {
        namespace.map_or(true, |namespace| name.namespace() == namespace)
    })?;

    tracing::debug!(count = names.len(), module, "discovered names");
    Ok(names)
}

fn explain(codes: &[String], color: ColorChoice, rep: &Reporter) -> Result {
    let mut health = Health::default();

    for code in codes {
        let Some(code) = parse_error_code(code) else {
            health.taint(
                Diagnostic::error()
                    .message(format!("{} is not a valid error code", code.quote()))
                    .help("error codes have the form ‘E’ followed by three digits")
                    .report(rep),
            );
            continue;
        };

        let Some(explanation) = code.explanation() else {
            health.taint(
                Diagnostic::error()
                    .message(format!("the error code {} has no explanation", code.quote()))
                    .report(rep),
            );
            continue;
        };

        paint(
            |painter| {
                painter.set(Highlight::Emphasis)?;
                writeln!(painter, "{code}")?;
                painter.unset()?;
                writeln!(painter, "\n{explanation}\n")
            },
            color,
        )
        .unwrap();
    }

    health.into()
}

fn parse_error_code(code: &str) -> Option<ErrorCode> {
    code.trim().to_uppercase().parse().ok()
}

fn describe(entity: &Entity, painter: &mut Painter) -> io::Result<()> {
    painter.set(Highlight::Kind.strong())?;
    write!(painter, "{}", entity.kind())?;
    painter.unset()?;
    writeln!(painter, " {}", entity.name())?;

    let origin = entity.origin();
    if origin.is_system() {
        writeln!(painter, "  built in")?;
    } else {
        writeln!(painter, "  defined at {origin}")?;
    }

    match entity {
        Entity::Type(type_) => {
            match &type_.kind {
                TypeKind::Builtin => {}
                TypeKind::Alias(expression) => writeln!(painter, "  alias of {expression}")?,
                TypeKind::Object(object) => {
                    if let Some(parent) = &object.parent {
                        writeln!(painter, "  parent {parent}")?;
                    }
                    if object.constructible {
                        writeln!(painter, "  constructible")?;
                    }
                    for (name, attribute) in &object.attributes {
                        let marker = if attribute.optional { "?" } else { "" };
                        writeln!(painter, "  attribute {name}{marker}: {}", attribute.ty)?;
                    }
                }
            }

            for annotation in &type_.annotations {
                match annotation {
                    Annotation::Tags { attribute, tags } => writeln!(
                        painter,
                        "  tags of {attribute}: {}",
                        tags.iter().list(Conjunction::And)
                    )?,
                    Annotation::Deprecated { message: Some(message) } => {
                        writeln!(painter, "  deprecated: {message}")?;
                    }
                    Annotation::Deprecated { message: None } => writeln!(painter, "  deprecated")?,
                }
            }
        }
        Entity::TypeSet(set) => {
            writeln!(painter, "  version {}", set.version)?;
            writeln!(painter, "  authority {}", set.authority)?;
            for member in set.types.keys() {
                writeln!(painter, "  member {member}")?;
            }
        }
        Entity::Function(function) => {
            if let FunctionKind::Constructor { of } = &function.kind {
                writeln!(painter, "  constructs {}", of.quote())?;
            }
            describe_signature(&function.parameters, function.returns.as_ref(), painter)?;
        }
        Entity::Task(task) => {
            describe_signature(&task.parameters, task.returns.as_ref(), painter)?;
        }
        Entity::Plan(plan) => {
            describe_signature(&plan.parameters, None, painter)?;
            for step in &plan.steps {
                writeln!(painter, "  step {step}")?;
            }
        }
    }

    Ok(())
}

fn describe_signature(
    parameters: &[Parameter],
    returns: Option<&entity::TypeExpression>,
    painter: &mut Painter,
) -> io::Result<()> {
    for parameter in parameters {
        let marker = if parameter.optional { "?" } else { "" };
        writeln!(painter, "  parameter {}{marker}: {}", parameter.name, parameter.ty)?;
    }

    if let Some(returns) = returns {
        writeln!(painter, "  returns {returns}")?;
    }

    Ok(())
}

fn set_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let payload = info.payload();

        let message = payload
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
            .unwrap_or("unknown cause")
            .to_owned();

        let backtrace = std::env::var("STRATA_BACKTRACE")
            .is_ok_and(|variable| variable != "0")
            .then(std::backtrace::Backtrace::force_capture);

        Diag::bug()
            .message(message)
            .with(|it| match info.location() {
                Some(location) => it.note(format!("at ‘{location}’")),
                None => it,
            })
            .note(std::thread::current().name().map_or_else(
                || Cow::from("in an unnamed thread"),
                |name| format!("in thread ‘{name}’").into(),
            ))
            .note("the engine unexpectedly panicked. this is a bug. we would appreciate a bug report")
            .note(format!("strata {}", env!("CARGO_PKG_VERSION")))
            .with(|it| match backtrace {
                Some(backtrace) => it.note(format!("with the following backtrace:\n{backtrace}")),
                None => it.help(
                    "rerun with the environment variable ‘STRATA_BACKTRACE=1’ to display a backtrace",
                ),
            })
            .report(&Reporter::stderr(ColorChoice::Auto));
    }));
}
