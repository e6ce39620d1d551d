use clap::{
    builder::{PossibleValue, TypedValueParser, ValueParser},
    error::ErrorKind,
    Arg, ArgAction, ArgMatches,
};
use diagnostics::error::Result;
use entity::Namespace;
use loader::Settings;
use std::{ffi::OsStr, marker::PhantomData, path::PathBuf, str::FromStr};
use strum::VariantNames;
use utility::paint::ColorChoice;

pub(crate) fn arguments() -> Result<(Command, GlobalOptions)> {
    let namespace_arg = Arg::new(argument::NAMESPACE)
        .value_parser(VariantParser::<Namespace>::new("namespace"))
        .help("The namespace of the name");

    let matches = clap::Command::new("strata")
        .bin_name("strata")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Resolve and inspect the definitions of a module path")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args([
            Arg::new(option::MODULE_PATH)
                .long("module-path")
                .short('m')
                .global(true)
                .value_name("PATH")
                .env(loader::MODULE_PATH_VARIABLE)
                .value_parser(ValueParser::path_buf())
                .help("The folder containing one subfolder per module"),
            Arg::new(option::ENVIRONMENT)
                .long("environment")
                .short('e')
                .global(true)
                .value_name("NAME")
                .default_value(DEFAULT_ENVIRONMENT)
                .help("The name of the environment"),
            Arg::new(option::COLOR)
                .long("color")
                .global(true)
                .value_name("WHEN")
                .value_parser(VariantParser::<ColorChoice>::new("color choice"))
                .help("Control when to use color"),
        ])
        .subcommands([
            clap::Command::new(subcommand::RESOLVE)
                .visible_alias("r")
                .about("Resolve a name and print what it refers to")
                .args([
                    namespace_arg.clone().required(true),
                    Arg::new(argument::NAME)
                        .required(true)
                        .help("The name to resolve, parts separated by ‘::’"),
                ]),
            clap::Command::new(subcommand::DISCOVER)
                .visible_alias("d")
                .about("List the names that can be resolved")
                .args([
                    namespace_arg
                        .long("namespace")
                        .short('n')
                        .value_name("NAMESPACE")
                        .help("List only names of the given namespace"),
                    Arg::new(option::MODULE)
                        .long("module")
                        .value_name("NAME")
                        .help("List only names of the given module"),
                ]),
            clap::Command::new(subcommand::EXPLAIN)
                .about("Explain given error codes")
                .arg(
                    Arg::new(argument::CODES)
                        .action(ArgAction::Append)
                        .required(true)
                        .help("The error codes that need explanation"),
                ),
        ])
        .get_matches();

    let command = match matches.subcommand().unwrap() {
        (subcommand::RESOLVE, matches) => Command::Resolve {
            namespace: matches.get_one(argument::NAMESPACE).copied().unwrap(),
            name: matches.get_one::<String>(argument::NAME).cloned().unwrap(),
        },
        (subcommand::DISCOVER, matches) => Command::Discover {
            namespace: matches.get_one(argument::NAMESPACE).copied(),
            module: matches.get_one(option::MODULE).cloned(),
        },
        (subcommand::EXPLAIN, matches) => Command::Explain {
            codes: matches
                .get_many::<String>(argument::CODES)
                .unwrap()
                .cloned()
                .collect(),
        },
        _ => unreachable!(),
    };

    Ok((command, GlobalOptions::deserialize(&matches)))
}

mod subcommand {
    pub(super) const DISCOVER: &str = "discover";
    pub(super) const EXPLAIN: &str = "explain";
    pub(super) const RESOLVE: &str = "resolve";
}

mod argument {
    pub(super) const CODES: &str = "CODES";
    pub(super) const NAME: &str = "NAME";
    pub(super) const NAMESPACE: &str = "NAMESPACE";
}

mod option {
    pub(super) const COLOR: &str = "color";
    pub(super) const ENVIRONMENT: &str = "environment";
    pub(super) const MODULE: &str = "module";
    pub(super) const MODULE_PATH: &str = "module_path";
}

const DEFAULT_ENVIRONMENT: &str = "production";

pub(crate) enum Command {
    Resolve {
        namespace: Namespace,
        name: String,
    },
    Discover {
        namespace: Option<Namespace>,
        module: Option<String>,
    },
    Explain {
        codes: Vec<String>,
    },
}

pub(crate) struct GlobalOptions {
    pub(crate) module_path: Option<PathBuf>,
    pub(crate) environment: String,
    pub(crate) color: ColorChoice,
}

impl GlobalOptions {
    fn deserialize(matches: &ArgMatches) -> GlobalOptions {
        Self {
            module_path: matches.get_one(option::MODULE_PATH).cloned(),
            environment: matches
                .get_one::<String>(option::ENVIRONMENT)
                .cloned()
                .unwrap_or_else(|| DEFAULT_ENVIRONMENT.into()),
            color: matches.get_one(option::COLOR).copied().unwrap_or_default(),
        }
    }

    /// The settings of the environment.
    ///
    /// The module path was already taken from the environment variable by the parser.
    pub(crate) fn settings(&self) -> Settings {
        Settings {
            module_path: self.module_path.clone(),
            environment: self.environment.clone(),
            ..Settings::default()
        }
    }
}

/// Parses one of the variants of a field-less enum ignoring the case.
#[derive(Clone)]
struct VariantParser<T> {
    /// What the variants are, for error messages.
    noun: &'static str,
    marker: PhantomData<fn() -> T>,
}

impl<T> VariantParser<T> {
    const fn new(noun: &'static str) -> Self {
        Self { noun, marker: PhantomData }
    }
}

impl<T> TypedValueParser for VariantParser<T>
where
    T: FromStr + VariantNames + Clone + Send + Sync + 'static,
{
    type Value = T;

    fn parse_ref(
        &self,
        _: &clap::Command,
        _: Option<&Arg>,
        source: &OsStr,
    ) -> Result<T, clap::Error> {
        let invalid = |kind, message: String| clap::Error::raw(kind, message + "\n");

        let Some(source) = source.to_str() else {
            return Err(invalid(
                ErrorKind::InvalidUtf8,
                format!("‘{}’ is not valid UTF-8", source.to_string_lossy()),
            ));
        };

        source.to_lowercase().parse().map_err(|_| {
            invalid(ErrorKind::InvalidValue, format!("‘{source}’ is not a valid {}", self.noun))
        })
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue>>> {
        Some(Box::new(T::VARIANTS.iter().copied().map(PossibleValue::new)))
    }
}
