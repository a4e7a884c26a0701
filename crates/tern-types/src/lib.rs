//! Semantic type representations for Tern.
//!
//! This crate defines the type lattice used by the checker: a tagged
//! variant covering primitives, nullable wrappers, compound types, and
//! inference-time type parameters. These are distinct from the flattened
//! type form stamped onto checked ASTs (which lives in `tern-ast`).

use std::fmt;
use std::sync::LazyLock;

/// Opaque-type name reserved for the optional type.
pub const OPTIONAL_TYPE_NAME: &str = "optional_type";

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// Discriminant of a [`Type`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeKind {
    Dyn,
    Error,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    Any,
    BoolWrapper,
    IntWrapper,
    UintWrapper,
    DoubleWrapper,
    StringWrapper,
    BytesWrapper,
    List,
    Map,
    Struct,
    Opaque,
    TypeValue,
    TypeParam,
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A semantic type.
///
/// Equality is structural; struct types compare by name. `dyn` is the
/// unknown type and participates in assignability as both top and bottom.
/// Wrapper kinds are first-class, not modifiers: `int_wrapper` is a
/// distinct kind that accepts `int` and `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    // -- Primitives --
    Dyn,
    Error,
    Null,
    Bool,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    Duration,
    Timestamp,
    Any,

    // -- Nullable primitive wrappers --
    BoolWrapper,
    IntWrapper,
    UintWrapper,
    DoubleWrapper,
    StringWrapper,
    BytesWrapper,

    // -- Compound types --
    List(Box<Type>),
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    Struct {
        name: String,
    },
    /// Externally named compound type with parameter positions.
    /// The optional type is encoded here under [`OPTIONAL_TYPE_NAME`].
    Opaque {
        name: String,
        params: Vec<Type>,
    },

    /// A reified type value, optionally carrying the type it denotes.
    TypeValue(Option<Box<Type>>),
    /// A free type variable. Never appears in finalized output types.
    TypeParam(String),
}

impl Type {
    pub fn list(elem: Type) -> Type {
        Type::List(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn struct_type(name: impl Into<String>) -> Type {
        Type::Struct { name: name.into() }
    }

    pub fn opaque(name: impl Into<String>, params: Vec<Type>) -> Type {
        Type::Opaque {
            name: name.into(),
            params,
        }
    }

    pub fn optional(param: Type) -> Type {
        Type::opaque(OPTIONAL_TYPE_NAME, vec![param])
    }

    pub fn type_param(name: impl Into<String>) -> Type {
        Type::TypeParam(name.into())
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            Type::Dyn => TypeKind::Dyn,
            Type::Error => TypeKind::Error,
            Type::Null => TypeKind::Null,
            Type::Bool => TypeKind::Bool,
            Type::Int => TypeKind::Int,
            Type::Uint => TypeKind::Uint,
            Type::Double => TypeKind::Double,
            Type::String => TypeKind::String,
            Type::Bytes => TypeKind::Bytes,
            Type::Duration => TypeKind::Duration,
            Type::Timestamp => TypeKind::Timestamp,
            Type::Any => TypeKind::Any,
            Type::BoolWrapper => TypeKind::BoolWrapper,
            Type::IntWrapper => TypeKind::IntWrapper,
            Type::UintWrapper => TypeKind::UintWrapper,
            Type::DoubleWrapper => TypeKind::DoubleWrapper,
            Type::StringWrapper => TypeKind::StringWrapper,
            Type::BytesWrapper => TypeKind::BytesWrapper,
            Type::List(_) => TypeKind::List,
            Type::Map { .. } => TypeKind::Map,
            Type::Struct { .. } => TypeKind::Struct,
            Type::Opaque { .. } => TypeKind::Opaque,
            Type::TypeValue(_) => TypeKind::TypeValue,
            Type::TypeParam(_) => TypeKind::TypeParam,
        }
    }

    /// The name of a struct, opaque, or type-param type.
    pub fn name(&self) -> Option<&str> {
        match self {
            Type::Struct { name } | Type::Opaque { name, .. } => Some(name),
            Type::TypeParam(name) => Some(name),
            _ => None,
        }
    }

    /// The parameter types of a compound type, in declaration order.
    pub fn parameters(&self) -> Vec<&Type> {
        match self {
            Type::List(elem) => vec![elem],
            Type::Map { key, value } => vec![key, value],
            Type::Opaque { params, .. } => params.iter().collect(),
            Type::TypeValue(Some(param)) => vec![param],
            _ => Vec::new(),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Opaque { name, params } if name == OPTIONAL_TYPE_NAME && params.len() == 1)
    }

    /// The held type of an optional, if this is one.
    pub fn optional_parameter(&self) -> Option<&Type> {
        match self {
            Type::Opaque { name, params } if name == OPTIONAL_TYPE_NAME && params.len() == 1 => {
                Some(&params[0])
            }
            _ => None,
        }
    }

    /// The primitive a wrapper kind holds, if this is a wrapper.
    pub fn wrapped(&self) -> Option<Type> {
        match self {
            Type::BoolWrapper => Some(Type::Bool),
            Type::IntWrapper => Some(Type::Int),
            Type::UintWrapper => Some(Type::Uint),
            Type::DoubleWrapper => Some(Type::Double),
            Type::StringWrapper => Some(Type::String),
            Type::BytesWrapper => Some(Type::Bytes),
            _ => None,
        }
    }

    /// Whether any [`Type::TypeParam`] occurs in this type.
    pub fn has_type_params(&self) -> bool {
        match self {
            Type::TypeParam(_) => true,
            Type::List(elem) => elem.has_type_params(),
            Type::Map { key, value } => key.has_type_params() || value.has_type_params(),
            Type::Opaque { params, .. } => params.iter().any(Type::has_type_params),
            Type::TypeValue(Some(param)) => param.has_type_params(),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Dyn => write!(f, "dyn"),
            Type::Error => write!(f, "error"),
            Type::Null => write!(f, "null"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Uint => write!(f, "uint"),
            Type::Double => write!(f, "double"),
            Type::String => write!(f, "string"),
            Type::Bytes => write!(f, "bytes"),
            Type::Duration => write!(f, "duration"),
            Type::Timestamp => write!(f, "timestamp"),
            Type::Any => write!(f, "any"),
            Type::BoolWrapper => write!(f, "wrapper(bool)"),
            Type::IntWrapper => write!(f, "wrapper(int)"),
            Type::UintWrapper => write!(f, "wrapper(uint)"),
            Type::DoubleWrapper => write!(f, "wrapper(double)"),
            Type::StringWrapper => write!(f, "wrapper(string)"),
            Type::BytesWrapper => write!(f, "wrapper(bytes)"),
            Type::List(elem) => write!(f, "list({elem})"),
            Type::Map { key, value } => write!(f, "map({key}, {value})"),
            Type::Struct { name } => write!(f, "{name}"),
            Type::Opaque { name, params } => {
                if params.is_empty() {
                    return write!(f, "{name}");
                }
                write!(f, "{name}(")?;
                for (idx, param) in params.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")
            }
            Type::TypeValue(None) => write!(f, "type"),
            Type::TypeValue(Some(param)) => write!(f, "type({param})"),
            Type::TypeParam(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical compound types
// ---------------------------------------------------------------------------

static DYN_LIST: LazyLock<Type> = LazyLock::new(|| Type::list(Type::Dyn));
static DYN_MAP: LazyLock<Type> = LazyLock::new(|| Type::map(Type::Dyn, Type::Dyn));
static STRING_DYN_MAP: LazyLock<Type> = LazyLock::new(|| Type::map(Type::String, Type::Dyn));
static DYN_OPTIONAL: LazyLock<Type> = LazyLock::new(|| Type::optional(Type::Dyn));

impl Type {
    /// Canonical `list(dyn)`. Shared process-wide; types are value-equal.
    pub fn dyn_list() -> &'static Type {
        &DYN_LIST
    }

    /// Canonical `map(dyn, dyn)`.
    pub fn dyn_map() -> &'static Type {
        &DYN_MAP
    }

    /// Canonical `map(string, dyn)`.
    pub fn string_dyn_map() -> &'static Type {
        &STRING_DYN_MAP
    }

    /// Canonical `optional_type(dyn)`.
    pub fn dyn_optional() -> &'static Type {
        &DYN_OPTIONAL
    }
}

// ---------------------------------------------------------------------------
// Well-known wrapper messages
// ---------------------------------------------------------------------------

/// Message-style names under which the wrapper types can be constructed.
///
/// Struct-creation expressions may name these even though their kind is not
/// `struct`; each exposes a single `value` field holding the wrapped
/// primitive.
pub const WRAPPER_MESSAGE_NAMES: [&str; 6] = [
    "types.BoolValue",
    "types.IntValue",
    "types.UintValue",
    "types.DoubleValue",
    "types.StringValue",
    "types.BytesValue",
];

/// Resolve a well-known wrapper message name to its wrapper type.
pub fn wrapper_message_type(name: &str) -> Option<Type> {
    match name {
        "types.BoolValue" => Some(Type::BoolWrapper),
        "types.IntValue" => Some(Type::IntWrapper),
        "types.UintValue" => Some(Type::UintWrapper),
        "types.DoubleValue" => Some(Type::DoubleWrapper),
        "types.StringValue" => Some(Type::StringWrapper),
        "types.BytesValue" => Some(Type::BytesWrapper),
        _ => None,
    }
}

pub fn is_wrapper_message_name(name: &str) -> bool {
    wrapper_message_type(name).is_some()
}
