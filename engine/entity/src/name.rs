use joinery::JoinableIterator;
use std::{cmp::Ordering, fmt, hash, sync::LazyLock};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};
use url::Url;
use utility::SmallVec;

/// The name authority of everything not defined with an explicit one.
pub const RUNTIME_AUTHORITY: &str = "http://strata.dev/2024/runtime";

static RUNTIME: LazyLock<Url> =
    LazyLock::new(|| Url::parse(RUNTIME_AUTHORITY).expect("the runtime authority is a valid URL"));

pub fn runtime_authority() -> Url {
    RUNTIME.clone()
}

/// A partition of the lookup space.
///
/// The same textual name may denote unrelated entities in different namespaces.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
#[derive(Display, EnumString, IntoStaticStr, EnumIter, VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Type,
    Function,
    Task,
    Plan,
    Constructor,
    Allocator,
    Handler,
    Service,
    Definition,
}

impl Namespace {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// A resolvable name.
///
/// Two names are equal if their namespaces, their authorities and their parts are
/// equal. Lookups in indices and caches use the [map key](Self::map_key) instead which
/// ignores the case.
#[derive(Clone, Debug)]
pub struct TypedName {
    namespace: Namespace,
    authority: Url,
    parts: SmallVec<String, 2>,
    name: String,
    map_key: String,
}

impl TypedName {
    /// Create a name in the runtime authority splitting the given text at `::`.
    ///
    /// A leading `::` is ignored as are empty parts. Use [`Self::parse`] for names
    /// coming from users.
    pub fn new(namespace: Namespace, name: &str) -> Self {
        Self::from_parts(
            namespace,
            runtime_authority(),
            name.split("::").filter(|part| !part.is_empty()),
        )
    }

    /// Create a name if the given text is well-formed.
    ///
    /// Each part has to be a non-empty identifier. A leading `::` is allowed.
    pub fn parse(namespace: Namespace, name: &str) -> Option<Self> {
        let name = name.strip_prefix("::").unwrap_or(name);

        if !name.split("::").all(is_identifier) {
            return None;
        }

        Some(Self::new(namespace, name))
    }

    pub fn from_parts<P: Into<String>>(
        namespace: Namespace,
        authority: Url,
        parts: impl IntoIterator<Item = P>,
    ) -> Self {
        let parts: SmallVec<String, 2> = parts.into_iter().map(Into::into).collect();
        let name = parts.iter().join_with("::").to_string();
        let map_key = format!("{authority}/{namespace}/{name}").to_lowercase();

        Self { namespace, authority, parts, name, map_key }
    }

    #[must_use]
    pub fn with_authority(self, authority: Url) -> Self {
        Self::from_parts(self.namespace, authority, self.parts)
    }

    #[must_use]
    pub fn with_namespace(&self, namespace: Namespace) -> Self {
        Self::from_parts(namespace, self.authority.clone(), self.parts.iter().cloned())
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn authority(&self) -> &Url {
        &self.authority
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// The parts joined by `::`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The case-insensitive key used by indices and caches.
    pub fn map_key(&self) -> &str {
        &self.map_key
    }

    pub fn is_qualified(&self) -> bool {
        self.parts.len() > 1
    }

    /// The first part of a qualified name.
    pub fn module_part(&self) -> Option<&str> {
        match self.is_qualified() {
            true => self.parts.first().map(String::as_str),
            false => None,
        }
    }

    pub fn last_part(&self) -> &str {
        self.parts.last().map_or("", String::as_str)
    }

    /// Strip the last part.
    pub fn parent(&self) -> Option<Self> {
        if !self.is_qualified() {
            return None;
        }

        let parts = &self.parts[..self.parts.len() - 1];
        Some(Self::from_parts(
            self.namespace,
            self.authority.clone(),
            parts.iter().cloned(),
        ))
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let parts = self
            .parts
            .iter()
            .map(String::as_str)
            .chain(name.split("::").filter(|part| !part.is_empty()));

        Self::from_parts(self.namespace, self.authority.clone(), parts)
    }

    /// The name relative to the given enclosing name if it is a strict prefix.
    ///
    /// The parts are compared case-insensitively.
    pub fn relative_to(&self, parent: &Self) -> Option<Self> {
        if self.parts.len() <= parent.parts.len()
            || !self
                .parts
                .iter()
                .zip(&parent.parts)
                .all(|(part, prefix)| part.eq_ignore_ascii_case(prefix))
        {
            return None;
        }

        let parts = self.parts[parent.parts.len()..].iter().cloned();
        Some(Self::from_parts(self.namespace, self.authority.clone(), parts))
    }

    /// Whether the given text names this name ignoring the case.
    ///
    /// The text may either be the full name or the last part of it.
    pub fn is_named(&self, text: &str) -> bool {
        let text = text.strip_prefix("::").unwrap_or(text);
        self.name.eq_ignore_ascii_case(text) || self.last_part().eq_ignore_ascii_case(text)
    }
}

fn is_identifier(part: &str) -> bool {
    let mut characters = part.chars();

    characters
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && characters.all(|character| character.is_ascii_alphanumeric() || character == '_')
}

impl PartialEq for TypedName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.authority == other.authority
            && self.parts == other.parts
    }
}

impl Eq for TypedName {}

impl hash::Hash for TypedName {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.authority.hash(state);
        self.parts.hash(state);
    }
}

impl PartialOrd for TypedName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Names are ordered by their map keys first.
impl Ord for TypedName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.map_key
            .cmp(&other.map_key)
            .then_with(|| self.authority.cmp(&other.authority))
            .then_with(|| self.parts.cmp(&other.parts))
    }
}

impl fmt::Display for TypedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

