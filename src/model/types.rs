use crate::syntax::{first_named, named_children, simple_name, slice};
use std::fmt;
use tree_sitter::Node;

/// A syntactic type reference, reduced to what ownership analysis needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    /// `Stream`, `System.IO.Stream`, `Task<int>`: namespace dropped.
    Named { name: String, args: Vec<TypeRef> },
    Tuple(Vec<TypeRef>),
    Array(Box<TypeRef>),
    /// `var`
    Inferred,
    Unknown,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    /// `Stream`, `byte[]`: the spellings used in the framework tables.
    pub fn from_name(text: &str) -> Self {
        match text.strip_suffix("[]") {
            Some(inner) => Self::Array(Box::new(Self::from_name(inner))),
            None => Self::named(text),
        }
    }

    pub fn from_syntax(source: &str, node: Node) -> Self {
        match node.kind() {
            "implicit_type" => Self::Inferred,
            "identifier" | "predefined_type" => {
                let text = slice(source, node).trim();
                if text == "var" {
                    Self::Inferred
                } else {
                    Self::named(text)
                }
            }
            "generic_name" => {
                let Some(id) = simple_name(node) else {
                    return Self::Unknown;
                };
                let args = named_children(node)
                    .into_iter()
                    .find(|c| c.kind() == "type_argument_list")
                    .map(|list| {
                        named_children(list)
                            .into_iter()
                            .map(|t| Self::from_syntax(source, t))
                            .collect()
                    })
                    .unwrap_or_default();
                Self::generic(slice(source, id), args)
            }
            "qualified_name" | "alias_qualified_name" => named_children(node)
                .into_iter()
                .last()
                .map_or(Self::Unknown, |n| Self::from_syntax(source, n)),
            "nullable_type" | "ref_type" | "scoped_type" => {
                first_named(node).map_or(Self::Unknown, |n| Self::from_syntax(source, n))
            }
            "array_type" => Self::Array(Box::new(
                first_named(node).map_or(Self::Unknown, |n| Self::from_syntax(source, n)),
            )),
            "tuple_type" => Self::Tuple(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "tuple_element")
                    .map(|e| first_named(e).map_or(Self::Unknown, |t| Self::from_syntax(source, t)))
                    .collect(),
            ),
            _ => Self::Unknown,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn args(&self) -> &[TypeRef] {
        match self {
            Self::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown | Self::Inferred)
    }

    /// Element types of `(A, B)`, `Tuple<A, B>` and `ValueTuple<A, B>`.
    pub fn slot_types(&self) -> Option<&[TypeRef]> {
        match self {
            Self::Tuple(items) => Some(items),
            Self::Named { name, args } if (name == "Tuple" || name == "ValueTuple") && !args.is_empty() => {
                Some(args)
            }
            _ => None,
        }
    }

    /// `T` for `Task<T>` / `ValueTask<T>`.
    pub fn awaited(&self) -> Option<TypeRef> {
        match self {
            Self::Named { name, args }
                if matches!(name.as_str(), "Task" | "ValueTask" | "ConfiguredTaskAwaitable" | "ConfiguredValueTaskAwaitable")
                    && args.len() == 1 =>
            {
                Some(args[0].clone())
            }
            _ => None,
        }
    }

    /// Element type of arrays and the common generic collections.
    pub fn element_type(&self) -> Option<TypeRef> {
        match self {
            Self::Array(inner) => Some((**inner).clone()),
            Self::Named { name, args } if args.len() == 1 && super::known::is_sequence_type(name) => {
                Some(args[0].clone())
            }
            Self::Named { name, args } if args.len() == 2 && super::known::is_dictionary_type(name) => {
                Some(args[1].clone())
            }
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, args } if args.is_empty() => f.write_str(name),
            Self::Named { name, args } => {
                write!(f, "{name}<")?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(">")
            }
            Self::Tuple(items) => {
                f.write_str("(")?;
                for (i, a) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{a}")?;
                }
                f.write_str(")")
            }
            Self::Array(inner) => write!(f, "{inner}[]"),
            Self::Inferred => f.write_str("var"),
            Self::Unknown => f.write_str("?"),
        }
    }
}
