//! Top-level declarations: functions, externs, structs.

use std::cell::RefCell;

use talonc_base::{SourceRange, Symbol, Type};

use super::stmt::{Block, Stmt};
use super::ty::TypeNode;

/// One function parameter. `external_label` is `None` when the parameter has
/// no external label (written `_ name: T`); it equals `name` when the
/// parameter was written as a single identifier before the colon (the
/// "label equals name" reading pinned in DESIGN.md). The sole variadic
/// marker parameter (`...`) has `is_variadic = true` and no type node.
#[derive(Debug)]
pub struct Parameter {
    pub external_label: Option<Symbol>,
    pub name: Symbol,
    pub type_node: Option<Box<TypeNode>>,
    pub is_variadic: bool,
    pub range: SourceRange,
}

#[derive(Debug)]
pub struct FunctionDeclaration {
    pub name: Symbol,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<Box<TypeNode>>,
    pub body: Option<Block>,
    pub is_extern: bool,
    pub range: SourceRange,
    /// `Void` when `return_type` is absent; filled by the checker's pass 1.
    resolved_return_type: RefCell<Option<Type>>,
}

impl FunctionDeclaration {
    pub fn new(
        name: Symbol,
        parameters: Vec<Parameter>,
        return_type: Option<Box<TypeNode>>,
        body: Option<Block>,
        is_extern: bool,
        range: SourceRange,
    ) -> Self {
        Self { name, parameters, return_type, body, is_extern, range, resolved_return_type: RefCell::new(None) }
    }

    pub fn resolved_return_type(&self) -> Option<Type> {
        self.resolved_return_type.borrow().clone()
    }

    pub fn set_resolved_return_type(&self, ty: Type) {
        *self.resolved_return_type.borrow_mut() = Some(ty);
    }

    pub fn is_variadic(&self) -> bool {
        self.parameters.last().is_some_and(|p| p.is_variadic)
    }
}

#[derive(Debug)]
pub struct ExternDeclaration {
    pub calling_convention: Symbol,
    pub function: FunctionDeclaration,
    pub range: SourceRange,
}

#[derive(Debug)]
pub struct StructDeclaration {
    pub name: Symbol,
    /// Each entry is a `StmtKind::VarBinding` with a required type.
    pub fields: Vec<Stmt>,
    pub methods: Vec<FunctionDeclaration>,
    pub range: SourceRange,
}

#[derive(Debug)]
pub enum Decl {
    Function(FunctionDeclaration),
    Extern(ExternDeclaration),
    Struct(StructDeclaration),
}

impl Decl {
    pub fn range(&self) -> SourceRange {
        match self {
            Decl::Function(f) => f.range,
            Decl::Extern(e) => e.range,
            Decl::Struct(s) => s.range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_return_type_defaults_to_none_until_set() {
        let func = FunctionDeclaration::new(Symbol::EMPTY, vec![], None, None, false, SourceRange::new(0, 1));
        assert!(func.resolved_return_type().is_none());
        func.set_resolved_return_type(Type::Void);
        assert_eq!(func.resolved_return_type(), Some(Type::Void));
    }

    #[test]
    fn is_variadic_checks_last_parameter() {
        let variadic_param = Parameter {
            external_label: None,
            name: Symbol::EMPTY,
            type_node: None,
            is_variadic: true,
            range: SourceRange::new(0, 1),
        };
        let func = FunctionDeclaration::new(
            Symbol::EMPTY,
            vec![variadic_param],
            None,
            None,
            true,
            SourceRange::new(0, 1),
        );
        assert!(func.is_variadic());
    }
}
