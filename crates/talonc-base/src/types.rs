//! The type system shared by the AST's `resolvedType` slots, the type
//! checker, the NIR, and the C emitter. Lives in the base crate (rather than
//! alongside the checker that produces it) because the AST itself needs to
//! name this type for its mutable `resolvedType` fields, and the AST must
//! not depend on the checker.

use std::fmt;
use std::rc::Rc;

use crate::intern::Symbol;

/// A type. Primitive variants are plain; aggregate variants are `Rc`-shared
/// so cloning a `Type` is cheap and equality can special-case nominal
/// identity instead of deep structural comparison.
#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Int8,
    Int32,
    Bool,
    Void,
    /// Sink for anything that failed to resolve; never equal to itself in a
    /// way that should suppress further diagnostics beyond what falls out
    /// naturally from the structural typing rules.
    Unknown,
    Pointer(Rc<Type>),
    /// Matches any value passed in a variadic parameter slot.
    CVarArgs,
    Struct(Rc<StructType>),
    Function(Rc<FunctionType>),
}

#[derive(Debug)]
pub struct StructType {
    pub name: Symbol,
    pub fields: Vec<(Symbol, Type)>,
    pub methods: Vec<(Symbol, Rc<FunctionType>)>,
}

#[derive(Debug)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub labels: Vec<Option<Symbol>>,
    pub return_type: Type,
    pub is_variadic: bool,
}

impl Type {
    pub fn pointer(pointee: Type) -> Type {
        Type::Pointer(Rc::new(pointee))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int | Type::Int8 | Type::Int32)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Int | Type::Int8 | Type::Int32 | Type::Bool | Type::Void)
    }

    pub fn as_struct(&self) -> Option<&Rc<StructType>> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<&Type> {
        match self {
            Type::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Structural equality by type identifier: nominal for struct (by name, not
/// by field list), by variant for primitives, by pointee for pointers, by
/// signature (params + return + variadic) for functions.
impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Int, Type::Int)
            | (Type::Int8, Type::Int8)
            | (Type::Int32, Type::Int32)
            | (Type::Bool, Type::Bool)
            | (Type::Void, Type::Void)
            | (Type::Unknown, Type::Unknown)
            | (Type::CVarArgs, Type::CVarArgs) => true,
            (Type::Pointer(a), Type::Pointer(b)) => a == b,
            (Type::Struct(a), Type::Struct(b)) => a.name == b.name,
            (Type::Function(a), Type::Function(b)) => {
                a.params == b.params && a.return_type == b.return_type && a.is_variadic == b.is_variadic
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "Int"),
            Type::Int8 => write!(f, "Int8"),
            Type::Int32 => write!(f, "Int32"),
            Type::Bool => write!(f, "Bool"),
            Type::Void => write!(f, "Void"),
            Type::Unknown => write!(f, "Unknown"),
            Type::CVarArgs => write!(f, "..."),
            Type::Pointer(inner) => write!(f, "*{inner}"),
            Type::Struct(s) => write!(f, "Struct(#{})", s.name.index()),
            Type::Function(fun) => {
                write!(f, "(")?;
                for (i, p) in fun.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {}", fun.return_type)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_equal_by_variant() {
        assert_eq!(Type::Int, Type::Int);
        assert_ne!(Type::Int, Type::Int8);
    }

    #[test]
    fn pointers_are_equal_by_pointee() {
        assert_eq!(Type::pointer(Type::Int8), Type::pointer(Type::Int8));
        assert_ne!(Type::pointer(Type::Int8), Type::pointer(Type::Int));
    }

    #[test]
    fn structs_are_equal_by_name_not_fields() {
        let a = Type::Struct(Rc::new(StructType {
            name: Symbol::EMPTY,
            fields: vec![],
            methods: vec![],
        }));
        let b = Type::Struct(Rc::new(StructType {
            name: Symbol::EMPTY,
            fields: vec![(Symbol::EMPTY, Type::Int)],
            methods: vec![],
        }));
        assert_eq!(a, b);
    }

    #[test]
    fn functions_are_equal_by_signature_ignoring_labels() {
        let a = Type::Function(Rc::new(FunctionType {
            params: vec![Type::Int],
            labels: vec![None],
            return_type: Type::Bool,
            is_variadic: false,
        }));
        let b = Type::Function(Rc::new(FunctionType {
            params: vec![Type::Int],
            labels: vec![Some(Symbol::EMPTY)],
            return_type: Type::Bool,
            is_variadic: false,
        }));
        assert_eq!(a, b);
    }

    #[test]
    fn display_renders_pointer_chain() {
        assert_eq!(Type::pointer(Type::Int8).to_string(), "*Int8");
    }
}
