//! The typed expression tree produced by analysis.
//!
//! Every node pairs a type with its structure. The type is a [`TypeThunk`]:
//! literals and most expressions resolve it immediately, while declaration
//! and call-result types stay lazy so that forward and mutual references
//! work. Function bodies are themselves thunks, forced by the resolution
//! pass after all top-level declarations are registered.

use crate::analyzer::error::TypeError;
use crate::parser::{BinaryOp, UnaryOp};
use crate::thunk::Thunk;
use crate::types::{Type, TypeThunk};

#[derive(Debug)]
pub struct TypedProgram<'a> {
    pub items: &'a [&'a Expr<'a>],
}

impl<'a> TypedProgram<'a> {
    /// The type of the program's final item, `void` for an empty program.
    pub fn result_type(&self) -> Result<Option<&'a Type<'a>>, TypeError> {
        match self.items.last() {
            Some(item) => Ok(Some(item.ty()?)),
            None => Ok(None),
        }
    }
}

/// A typed expression: `(type, structure)`.
#[derive(Debug)]
pub struct Expr<'a>(pub &'a TypeThunk<'a>, pub ExprInner<'a>);

impl<'a> Expr<'a> {
    pub fn ty(&self) -> Result<&'a Type<'a>, TypeError> {
        self.0.get()
    }

    pub fn inner(&self) -> &ExprInner<'a> {
        &self.1
    }
}

/// A lazily analyzed expression (declaration bodies, methods).
pub type ExprThunk<'a> = Thunk<'a, &'a Expr<'a>>;

/// A lazily analyzed expression sequence (function bodies).
pub type BodyThunk<'a> = Thunk<'a, &'a [&'a Expr<'a>]>;

#[derive(Debug)]
pub enum ExprInner<'a> {
    Number(f64),
    Str(&'a str),
    Bool(bool),
    /// A read of a local binding.
    Ident(&'a str),
    This,
    Declare {
        mutable: bool,
        name: &'a str,
        value: &'a Expr<'a>,
    },
    Assign {
        name: &'a str,
        value: &'a Expr<'a>,
    },
    /// `object.name = value`; bare identifiers that resolved through the
    /// implicit receiver are rewritten to this form with `object` = `this`.
    AssignMember {
        object: &'a Expr<'a>,
        name: &'a str,
        value: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        /// Runtime primitive the operator resolved to.
        native: &'a str,
        expr: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        native: &'a str,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Call {
        callee: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    New {
        callee: &'a Expr<'a>,
        args: &'a [&'a Expr<'a>],
    },
    Member {
        object: &'a Expr<'a>,
        name: &'a str,
    },
    Function {
        name: Option<&'a str>,
        params: &'a [(&'a str, &'a Type<'a>)],
        body: &'a BodyThunk<'a>,
    },
    If {
        cond: &'a Expr<'a>,
        then_body: &'a [&'a Expr<'a>],
        else_body: Option<&'a [&'a Expr<'a>]>,
        /// Synthetic binding holding the branch result.
        temp: &'a str,
    },
    ClassDecl {
        name: &'a str,
        /// The instance type (the template, for generic classes).
        ty: &'a Type<'a>,
        methods: &'a [(&'a str, &'a ExprThunk<'a>)],
    },
    InterfaceDecl {
        name: &'a str,
        ty: &'a Type<'a>,
    },
    TypeAlias {
        name: &'a str,
    },
    /// A generic instantiation in expression position; the node's type is
    /// the meta type of `ty`.
    Instantiate {
        name: &'a str,
        ty: &'a Type<'a>,
    },
}
