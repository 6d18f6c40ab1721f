//! Parsed expression tree.
//!
//! Every node lives in the arena; children are `&'a` references or arena
//! slices. Spans live in the [`AnnotatedSource`] side table rather than in
//! the nodes themselves.
//!
//! [`AnnotatedSource`]: super::syntax::AnnotatedSource

use super::syntax::{AnnotatedSource, BinaryOp, Span, UnaryOp};

#[derive(Debug)]
pub struct ParsedProgram<'a> {
    pub items: &'a [&'a Expr<'a>],
    pub source: &'a str,
    pub ann: &'a AnnotatedSource<'a, Expr<'a>>,
}

#[derive(Debug)]
pub enum Expr<'a> {
    Number(f64),
    Str(&'a str),
    Bool(bool),
    Ident(&'a str),
    This,
    /// `let` / `var` declaration. `mutable` distinguishes the two.
    Let {
        mutable: bool,
        name: &'a str,
        ann: Option<&'a TypeExpr<'a>>,
        value: &'a Expr<'a>,
    },
    /// `target = value` where target is an identifier or member access.
    Assign {
        target: &'a Expr<'a>,
        value: &'a Expr<'a>,
    },
    Unary {
        op: UnaryOp,
        expr: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
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
    /// Generic instantiation in expression position, e.g. `Box<number>`.
    Instantiate {
        target: &'a Expr<'a>,
        args: &'a [&'a TypeExpr<'a>],
    },
    Function(&'a FunctionLit<'a>),
    If {
        cond: &'a Expr<'a>,
        then_body: &'a [&'a Expr<'a>],
        else_body: Option<&'a [&'a Expr<'a>]>,
    },
    Class(&'a TypeDecl<'a>),
    Interface(&'a TypeDecl<'a>),
    TypeAlias {
        name: &'a str,
        ty: &'a TypeExpr<'a>,
    },
}

/// A function literal: named `fn` declarations, lambdas, and methods all
/// share this shape.
#[derive(Debug)]
pub struct FunctionLit<'a> {
    pub name: Option<&'a str>,
    pub params: &'a [Param<'a>],
    pub ret: Option<&'a TypeExpr<'a>>,
    pub body: &'a [&'a Expr<'a>],
}

#[derive(Debug)]
pub struct Param<'a> {
    pub name: &'a str,
    pub ann: Option<&'a TypeExpr<'a>>,
    pub optional: bool,
    pub span: Span,
}

/// Shared body of `class` and `interface` declarations.
#[derive(Debug)]
pub struct TypeDecl<'a> {
    pub name: &'a str,
    pub type_params: &'a [TypeParam<'a>],
    pub extends: Option<&'a TypeExpr<'a>>,
    pub fields: &'a [Field<'a>],
    pub methods: &'a [Method<'a>],
    pub span: Span,
}

#[derive(Debug)]
pub struct TypeParam<'a> {
    pub name: &'a str,
    pub constraint: Option<&'a TypeExpr<'a>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Field<'a> {
    pub name: &'a str,
    pub ty: &'a TypeExpr<'a>,
    pub span: Span,
}

#[derive(Debug)]
pub struct Method<'a> {
    pub name: &'a str,
    pub params: &'a [Param<'a>],
    pub ret: Option<&'a TypeExpr<'a>>,
    /// `None` for interface method signatures.
    pub body: Option<&'a [&'a Expr<'a>]>,
    pub span: Span,
}

/// Type expressions as written in source. Evaluated against the scope by the
/// analyzer; unions and intersections are left binary here and flattened
/// during type construction.
#[derive(Debug)]
pub enum TypeExpr<'a> {
    Name(&'a str, Span),
    Union(&'a TypeExpr<'a>, &'a TypeExpr<'a>),
    Intersection(&'a TypeExpr<'a>, &'a TypeExpr<'a>),
    Function {
        params: &'a [(&'a TypeExpr<'a>, bool)],
        ret: &'a TypeExpr<'a>,
    },
    Record(&'a [(&'a str, &'a TypeExpr<'a>)]),
    Instantiate {
        name: &'a str,
        args: &'a [&'a TypeExpr<'a>],
        span: Span,
    },
}

impl<'a> TypeExpr<'a> {
    /// Best-effort span for diagnostics; composite forms fall back to their
    /// leftmost named component.
    pub fn span(&self) -> Option<Span> {
        match self {
            TypeExpr::Name(_, span) => Some(span.clone()),
            TypeExpr::Union(a, _) | TypeExpr::Intersection(a, _) => a.span(),
            TypeExpr::Function { ret, .. } => ret.span(),
            TypeExpr::Record(fields) => fields.first().and_then(|(_, t)| t.span()),
            TypeExpr::Instantiate { span, .. } => Some(span.clone()),
        }
    }
}
