//! The analyzer: walks the parsed tree and produces the typed tree.
//!
//! Analysis is demand driven. A first pass registers every declaration in
//! the current scope as a thunk; the second pass analyzes each item, forcing
//! whatever it references. A final resolution pass forces everything that is
//! still pending (function bodies, member types) and runs the checks that
//! had to wait for the whole scope to exist, so that only definitions whose
//! types irreducibly depend on themselves fail with a recursion error.
//!
//! At the top level every item is analyzed independently and all errors are
//! collected; inside expressions analysis stops at the first error.

use bumpalo::Bump;
use tracing::debug;

use crate::diagnostics::context::Context;
use crate::parser::ast::{self, Method, Param, ParsedProgram, TypeDecl, TypeExpr};
use crate::parser::{AnnotatedSource, Span};
use crate::scope::{Resolution, Scope};
use crate::thunk::Thunk;
use crate::types::{
    Constness, Member, Type, TypeKind, TypeManager, TypeThunk, instantiate, is_assignable,
};

use super::error::{TypeError, TypeErrorKind};
use super::typed_expr::{BodyThunk, Expr, ExprInner, ExprThunk, TypedProgram};

/// Analyze a whole program against the given global scope.
///
/// Top-level items are registered first, then analyzed and resolved one by
/// one; every independent failure is reported.
pub fn analyze<'a>(
    tm: &'a TypeManager<'a>,
    globals: &'a Scope<'a>,
    program: &ParsedProgram<'a>,
) -> Result<TypedProgram<'a>, Vec<TypeError>> {
    let arena = tm.arena();
    let scope = globals.child(arena);
    let az = Analyzer {
        tm,
        arena,
        scope,
        ann: program.ann,
        span: Span::default(),
    };

    let mut errors = Vec::new();
    let decls = az.declare_items(program.items, &mut errors);

    let mut typed = Vec::new();
    for (item, decl) in program.items.iter().zip(&decls) {
        match az.analyze_item(item, *decl) {
            Ok(e) => typed.push(e),
            Err(err) => errors.push(err),
        }
    }

    for e in &typed {
        if let Err(err) = az.force_expr(e) {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        debug!(items = typed.len(), "analysis complete");
        Ok(TypedProgram {
            items: arena.alloc_slice_copy(&typed),
        })
    } else {
        debug!(errors = errors.len(), "analysis failed");
        Err(errors)
    }
}

#[derive(Clone)]
struct Analyzer<'a> {
    tm: &'a TypeManager<'a>,
    arena: &'a Bump,
    scope: &'a Scope<'a>,
    ann: &'a AnnotatedSource<'a, ast::Expr<'a>>,
    /// Source location blamed by errors when a node has no span of its own.
    span: Span,
}

impl<'a> Analyzer<'a> {
    fn at(&self, span: Span) -> Self {
        let mut az = self.clone();
        az.span = span;
        az
    }

    fn at_node(&self, e: &'a ast::Expr<'a>) -> Self {
        self.at(self.span_of(e))
    }

    fn in_scope(&self, scope: &'a Scope<'a>) -> Self {
        let mut az = self.clone();
        az.scope = scope;
        az
    }

    fn span_of(&self, e: &'a ast::Expr<'a>) -> Span {
        self.ann.span_of(e).unwrap_or_else(|| self.span.clone())
    }

    fn expr(&self, ty: &'a TypeThunk<'a>, inner: ExprInner<'a>) -> &'a Expr<'a> {
        &*self.arena.alloc(Expr(ty, inner))
    }

    fn this_expr(&self, receiver: &'a Type<'a>) -> &'a Expr<'a> {
        self.expr(self.tm.resolved_thunk(receiver), ExprInner::This)
    }

    fn error(&self, kind: TypeErrorKind) -> TypeError {
        TypeError::new(kind)
    }

    // ------------------------------------------------------------------
    // Declaration registration (first pass)
    // ------------------------------------------------------------------

    fn declare_items(
        &self,
        items: &'a [&'a ast::Expr<'a>],
        errors: &mut Vec<TypeError>,
    ) -> Vec<Option<&'a ExprThunk<'a>>> {
        items
            .iter()
            .map(|item| match self.declare_item(item) {
                Ok(decl) => decl,
                Err(err) => {
                    errors.push(err);
                    None
                }
            })
            .collect()
    }

    /// Register a declaring item's name in the current scope, backed by a
    /// thunk that analyzes the item on first use. Non-declaring items are
    /// left for the second pass.
    fn declare_item(
        &self,
        item: &'a ast::Expr<'a>,
    ) -> Result<Option<&'a ExprThunk<'a>>, TypeError> {
        let span = self.span_of(item);
        let (name, constness) = match item {
            ast::Expr::Let { mutable, name, .. } => (
                *name,
                if *mutable {
                    Constness::Variable
                } else {
                    Constness::Constant
                },
            ),
            ast::Expr::Function(lit) => match lit.name {
                Some(name) => (name, Constness::Constant),
                None => return Ok(None),
            },
            ast::Expr::Class(decl) | ast::Expr::Interface(decl) => {
                (decl.name, Constness::Constant)
            }
            ast::Expr::TypeAlias { name, .. } => (*name, Constness::Constant),
            _ => return Ok(None),
        };

        let az = self.at(span.clone());
        let decl_az = az.clone();
        let decl: &'a ExprThunk<'a> =
            Thunk::new(self.arena, span.clone(), move || decl_az.analyze(item));

        // An annotated `let` binds its annotation; everything else binds the
        // type the analyzed item turns out to have.
        let ty: &'a TypeThunk<'a> = match item {
            ast::Expr::Let { ann: Some(t), .. } => {
                let ann_az = az.clone();
                Thunk::new(self.arena, span.clone(), move || ann_az.eval_type(t))
            }
            _ => Thunk::new(self.arena, span.clone(), move || decl.get()?.ty()),
        };

        self.scope.declare(name, constness, ty, span)?;
        Ok(Some(decl))
    }

    fn analyze_item(
        &self,
        item: &'a ast::Expr<'a>,
        decl: Option<&'a ExprThunk<'a>>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        match decl {
            Some(decl) => decl.get(),
            None => self.analyze(item),
        }
    }

    /// Two-pass analysis of a block's items. Unlike the top level, the first
    /// error aborts the sequence.
    fn analyze_sequence(
        &self,
        items: &'a [&'a ast::Expr<'a>],
    ) -> Result<&'a [&'a Expr<'a>], TypeError> {
        let mut errors = Vec::new();
        let decls = self.declare_items(items, &mut errors);
        if let Some(err) = errors.into_iter().next() {
            return Err(err);
        }
        let mut out = Vec::with_capacity(items.len());
        for (item, decl) in items.iter().zip(&decls) {
            out.push(self.analyze_item(item, *decl)?);
        }
        Ok(self.arena.alloc_slice_copy(&out))
    }

    // ------------------------------------------------------------------
    // Expression analysis
    // ------------------------------------------------------------------

    fn analyze(&self, e: &'a ast::Expr<'a>) -> Result<&'a Expr<'a>, TypeError> {
        let az = self.at_node(e);
        match e {
            ast::Expr::Number(n) => Ok(az.expr(
                az.tm.resolved_thunk(az.tm.number()),
                ExprInner::Number(*n),
            )),
            ast::Expr::Str(s) => {
                Ok(az.expr(az.tm.resolved_thunk(az.tm.string()), ExprInner::Str(s)))
            }
            ast::Expr::Bool(b) => Ok(az.expr(
                az.tm.resolved_thunk(az.tm.bool_literal(*b)),
                ExprInner::Bool(*b),
            )),
            ast::Expr::Ident(name) => az.analyze_ident(name),
            ast::Expr::This => match az.scope.receiver_type() {
                Some(receiver) => Ok(az.this_expr(receiver)),
                None => Err(az.error(TypeErrorKind::UnboundVariable {
                    name: "this".to_string(),
                    span: az.span.clone(),
                })),
            },
            ast::Expr::Let {
                mutable,
                name,
                ann,
                value,
            } => az.analyze_let(*mutable, name, *ann, value),
            ast::Expr::Assign { target, value } => az.analyze_assign(target, value),
            ast::Expr::Unary { op, expr } => az.analyze_unary(*op, expr),
            ast::Expr::Binary { op, left, right } => az.analyze_binary(*op, left, right),
            ast::Expr::Call { callee, args } => az.analyze_call(callee, args),
            ast::Expr::New { callee, args } => az.analyze_new(callee, args),
            ast::Expr::Member { object, name } => az.analyze_member(object, name),
            ast::Expr::Instantiate { target, args } => az.analyze_instantiate(target, args),
            ast::Expr::Function(lit) => az.analyze_function(
                lit.name,
                lit.params,
                lit.ret,
                lit.body,
                None,
            ),
            ast::Expr::If {
                cond,
                then_body,
                else_body,
            } => az.analyze_if(cond, then_body, *else_body),
            ast::Expr::Class(decl) => az.analyze_class(decl),
            ast::Expr::Interface(decl) => az.analyze_interface(decl),
            ast::Expr::TypeAlias { name, ty } => az.analyze_alias(name, ty),
        }
    }

    fn analyze_ident(&self, name: &'a str) -> Result<&'a Expr<'a>, TypeError> {
        match self.scope.resolve(name) {
            Some(Resolution::Local(binding)) => {
                Ok(self.expr(binding.ty, ExprInner::Ident(name)))
            }
            // A bare member name inside a method body reads through `this`.
            Some(Resolution::Receiver { owner, member }) => Ok(self.expr(
                member.ty,
                ExprInner::Member {
                    object: self.this_expr(owner),
                    name: member.name,
                },
            )),
            None => Err(self.error(TypeErrorKind::UnboundVariable {
                name: name.to_string(),
                span: self.span.clone(),
            })),
        }
    }

    fn analyze_let(
        &self,
        mutable: bool,
        name: &'a str,
        ann: Option<&'a TypeExpr<'a>>,
        value: &'a ast::Expr<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let value_e = self.analyze(value)?;
        let ty = match ann {
            Some(t) => {
                let declared = self.eval_type(t)?;
                let found = value_e.ty()?;
                if !is_assignable(self.tm, found, declared)? {
                    return Err(self.at_node(value).error(TypeErrorKind::TypeMismatch {
                        expected: declared.to_string(),
                        found: found.to_string(),
                        span: self.span_of(value),
                    }));
                }
                self.tm.resolved_thunk(declared)
            }
            None => value_e.0,
        };
        Ok(self.expr(
            ty,
            ExprInner::Declare {
                mutable,
                name,
                value: value_e,
            },
        ))
    }

    fn analyze_assign(
        &self,
        target: &'a ast::Expr<'a>,
        value: &'a ast::Expr<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let value_e = self.analyze(value)?;
        let value_ty = value_e.ty()?;
        match target {
            ast::Expr::Ident(name) => {
                match self
                    .scope
                    .assign(self.tm, name, value_ty, self.span.clone())?
                {
                    Resolution::Local(_) => Ok(self.expr(
                        value_e.0,
                        ExprInner::Assign {
                            name,
                            value: value_e,
                        },
                    )),
                    Resolution::Receiver { owner, member } => Ok(self.expr(
                        value_e.0,
                        ExprInner::AssignMember {
                            object: self.this_expr(owner),
                            name: member.name,
                            value: value_e,
                        },
                    )),
                }
            }
            ast::Expr::Member { object, name } => {
                let object_e = self.analyze(object)?;
                let object_ty = object_e.ty()?;
                let member = object_ty.member(name).ok_or_else(|| {
                    self.error(TypeErrorKind::UnknownMember {
                        ty: object_ty.to_string(),
                        member: name.to_string(),
                        span: self.span.clone(),
                    })
                })?;
                if member.constness != Constness::Variable {
                    return Err(self.error(TypeErrorKind::AssignToConstant {
                        name: name.to_string(),
                        span: self.span.clone(),
                    }));
                }
                let declared = member.ty.get()?;
                if !is_assignable(self.tm, value_ty, declared)? {
                    return Err(self.error(TypeErrorKind::TypeMismatch {
                        expected: declared.to_string(),
                        found: value_ty.to_string(),
                        span: self.span_of(value),
                    }));
                }
                Ok(self.expr(
                    value_e.0,
                    ExprInner::AssignMember {
                        object: object_e,
                        name,
                        value: value_e,
                    },
                ))
            }
            _ => unreachable!("parser validates assignment targets"),
        }
    }

    fn analyze_unary(
        &self,
        op: crate::parser::UnaryOp,
        expr: &'a ast::Expr<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let operand = self.analyze(expr)?;
        let operand_ty = operand.ty()?;
        let operator = operand_ty.operator(op.symbol(), 0).ok_or_else(|| {
            self.error(TypeErrorKind::UnknownOperator {
                ty: operand_ty.to_string(),
                operator: op.symbol().to_string(),
                span: self.span.clone(),
            })
        })?;
        Ok(self.expr(
            operator.sig.ret,
            ExprInner::Unary {
                op,
                native: operator.native,
                expr: operand,
            },
        ))
    }

    fn analyze_binary(
        &self,
        op: crate::parser::BinaryOp,
        left: &'a ast::Expr<'a>,
        right: &'a ast::Expr<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let left_e = self.analyze(left)?;
        let left_ty = left_e.ty()?;
        // Operators are resolved on the left operand's type.
        let operator = left_ty.operator(op.symbol(), 1).ok_or_else(|| {
            self.error(TypeErrorKind::UnknownOperator {
                ty: left_ty.to_string(),
                operator: op.symbol().to_string(),
                span: self.span.clone(),
            })
        })?;
        let right_e = self.analyze(right)?;
        let right_ty = right_e.ty()?;
        let expected = match operator.sig.param(0) {
            Some(p) => p,
            None => unreachable!("binary operators always take one parameter"),
        };
        if !is_assignable(self.tm, right_ty, expected)? {
            return Err(self.error(TypeErrorKind::TypeMismatch {
                expected: expected.to_string(),
                found: right_ty.to_string(),
                span: self.span_of(right),
            }));
        }
        Ok(self.expr(
            operator.sig.ret,
            ExprInner::Binary {
                op,
                native: operator.native,
                left: left_e,
                right: right_e,
            },
        ))
    }

    fn analyze_call(
        &self,
        callee: &'a ast::Expr<'a>,
        args: &'a [&'a ast::Expr<'a>],
    ) -> Result<&'a Expr<'a>, TypeError> {
        let callee_e = self.analyze(callee)?;
        let callee_ty = callee_e.ty()?;
        let callee_name = match callee {
            ast::Expr::Ident(name) => name.to_string(),
            ast::Expr::Member { name, .. } => name.to_string(),
            _ => callee_ty.to_string(),
        };

        let mut args_e = Vec::with_capacity(args.len());
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            let e = self.analyze(arg)?;
            arg_tys.push(e.ty()?);
            args_e.push(e);
        }

        let sigs = callee_ty.call_signatures();
        if sigs.is_empty() {
            return Err(self.error(TypeErrorKind::NotCallable {
                ty: callee_ty.to_string(),
                span: self.span.clone(),
            }));
        }
        let sig = self.select_signature(&sigs, &arg_tys)?.ok_or_else(|| {
            self.error(TypeErrorKind::NoMatchingSignature {
                callee: callee_name.clone(),
                found: arg_tys.iter().map(|t| t.to_string()).collect(),
                expected: describe_signatures(&sigs),
                span: self.span.clone(),
            })
            .with_context(Context::InCall {
                name: Some(callee_name),
                span: self.span_of(callee),
            })
        })?;

        // The result type is the signature's return thunk, unforced, so
        // calls in statement position never demand the callee's inference.
        Ok(self.expr(
            sig.ret,
            ExprInner::Call {
                callee: callee_e,
                args: self.arena.alloc_slice_copy(&args_e),
            },
        ))
    }

    fn analyze_new(
        &self,
        callee: &'a ast::Expr<'a>,
        args: &'a [&'a ast::Expr<'a>],
    ) -> Result<&'a Expr<'a>, TypeError> {
        let callee_e = self.analyze(callee)?;
        let callee_ty = callee_e.ty()?;
        let TypeKind::Meta(instance) = callee_ty.kind else {
            return Err(self.error(TypeErrorKind::NotConstructible {
                ty: callee_ty.to_string(),
                span: self.span.clone(),
            }));
        };

        let mut args_e = Vec::with_capacity(args.len());
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            let e = self.analyze(arg)?;
            arg_tys.push(e.ty()?);
            args_e.push(e);
        }

        let sigs = instance.construct_signatures(self.tm)?;
        if sigs.is_empty() {
            return Err(self.error(TypeErrorKind::NotConstructible {
                ty: instance.to_string(),
                span: self.span.clone(),
            }));
        }
        if self.select_signature(&sigs, &arg_tys)?.is_none() {
            return Err(self
                .error(TypeErrorKind::NoMatchingSignature {
                    callee: instance.to_string(),
                    found: arg_tys.iter().map(|t| t.to_string()).collect(),
                    expected: describe_signatures(&sigs),
                    span: self.span.clone(),
                })
                .with_context(Context::InCall {
                    name: Some(instance.to_string()),
                    span: self.span_of(callee),
                }));
        }

        Ok(self.expr(
            self.tm.resolved_thunk(instance),
            ExprInner::New {
                callee: callee_e,
                args: self.arena.alloc_slice_copy(&args_e),
            },
        ))
    }

    /// First signature the arguments fit. The declared receiver plays no
    /// part in matching.
    fn select_signature(
        &self,
        sigs: &[crate::types::CallSignature<'a>],
        arg_tys: &[&'a Type<'a>],
    ) -> Result<Option<crate::types::CallSignature<'a>>, TypeError> {
        'sigs: for sig in sigs {
            if arg_tys.len() < sig.required.len() || arg_tys.len() > sig.max_arity() {
                continue;
            }
            for (i, arg_ty) in arg_tys.iter().enumerate() {
                let param = match sig.param(i) {
                    Some(p) => p,
                    None => continue 'sigs,
                };
                if !is_assignable(self.tm, arg_ty, param)? {
                    continue 'sigs;
                }
            }
            return Ok(Some(*sig));
        }
        Ok(None)
    }

    fn analyze_member(
        &self,
        object: &'a ast::Expr<'a>,
        name: &'a str,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let object_e = self.analyze(object)?;
        let object_ty = object_e.ty()?;
        let member = object_ty.member(name).ok_or_else(|| {
            self.error(TypeErrorKind::UnknownMember {
                ty: object_ty.to_string(),
                member: name.to_string(),
                span: self.span.clone(),
            })
        })?;
        Ok(self.expr(
            member.ty,
            ExprInner::Member {
                object: object_e,
                name,
            },
        ))
    }

    fn analyze_instantiate(
        &self,
        target: &'a ast::Expr<'a>,
        args: &'a [&'a TypeExpr<'a>],
    ) -> Result<&'a Expr<'a>, TypeError> {
        let target_e = self.analyze(target)?;
        let target_ty = target_e.ty()?;
        let TypeKind::Meta(generic) = target_ty.kind else {
            return Err(self.error(TypeErrorKind::NotGeneric {
                ty: target_ty.to_string(),
                span: self.span.clone(),
            }));
        };
        let mut arg_tys = Vec::with_capacity(args.len());
        for arg in args {
            arg_tys.push(self.eval_type(arg)?);
        }
        let instance = instantiate(self.tm, generic, &arg_tys, self.span.clone())?;
        let name = match target {
            ast::Expr::Ident(name) => name,
            _ => instance.name().unwrap_or("<generic>"),
        };
        Ok(self.expr(
            self.tm.resolved_thunk(self.tm.meta(instance)),
            ExprInner::Instantiate {
                name,
                ty: instance,
            },
        ))
    }

    /// Shared by `fn` declarations, lambdas and methods. Parameter types
    /// are evaluated now; the body and the return type stay lazy.
    fn analyze_function(
        &self,
        name: Option<&'a str>,
        params: &'a [Param<'a>],
        ret: Option<&'a TypeExpr<'a>>,
        body: &'a [&'a ast::Expr<'a>],
        receiver: Option<&'a Type<'a>>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let fn_scope = match receiver {
            Some(r) => self.scope.child_with_receiver(self.arena, r),
            None => self.scope.child(self.arena),
        };

        let mut required = Vec::new();
        let mut optional = Vec::new();
        let mut params_typed = Vec::with_capacity(params.len());
        for p in params {
            let ty = match p.ann {
                Some(t) => self.eval_type(t)?,
                None => self.tm.any(),
            };
            fn_scope.declare(
                p.name,
                Constness::Variable,
                self.tm.resolved_thunk(ty),
                p.span.clone(),
            )?;
            if p.optional {
                optional.push(ty);
            } else {
                required.push(ty);
            }
            params_typed.push((p.name, ty));
        }

        let body_az = self.in_scope(fn_scope);
        let body_thunk: &'a BodyThunk<'a> = {
            let az = body_az.clone();
            Thunk::new(self.arena, self.span.clone(), move || {
                let items = az.analyze_sequence(body)?;
                if let Some(t) = ret {
                    let declared = az.eval_type(t)?;
                    let found = match items.last() {
                        Some(e) => e.ty()?,
                        None => az.tm.void(),
                    };
                    if !is_assignable(az.tm, found, declared)? {
                        return Err(az.error(TypeErrorKind::TypeMismatch {
                            expected: declared.to_string(),
                            found: found.to_string(),
                            span: az.span.clone(),
                        }));
                    }
                }
                Ok(items)
            })
        };

        let ret_thunk: &'a TypeThunk<'a> = match ret {
            Some(t) => {
                let az = body_az.clone();
                Thunk::new(self.arena, self.span.clone(), move || az.eval_type(t))
            }
            None => {
                let az = body_az.clone();
                Thunk::new(self.arena, self.span.clone(), move || {
                    let items = body_thunk.get()?;
                    match items.last() {
                        Some(e) => e.ty(),
                        None => Ok(az.tm.void()),
                    }
                })
            }
        };

        let fn_ty = self.tm.function(receiver, &required, &optional, ret_thunk);
        Ok(self.expr(
            self.tm.resolved_thunk(fn_ty),
            ExprInner::Function {
                name,
                params: self.arena.alloc_slice_copy(&params_typed),
                body: body_thunk,
            },
        ))
    }

    fn analyze_if(
        &self,
        cond: &'a ast::Expr<'a>,
        then_body: &'a [&'a ast::Expr<'a>],
        else_body: Option<&'a [&'a ast::Expr<'a>]>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let cond_e = self.in_scope(self.scope.child(self.arena)).analyze(cond)?;
        let cond_ty = cond_e.ty()?;
        if !is_assignable(self.tm, cond_ty, self.tm.boolean())? {
            return Err(self
                .error(TypeErrorKind::TypeMismatch {
                    expected: self.tm.boolean().to_string(),
                    found: cond_ty.to_string(),
                    span: self.span_of(cond),
                })
                .with_context(Context::InExpression {
                    kind: "if condition".to_string(),
                    span: self.span.clone(),
                }));
        }

        let then_items = self
            .in_scope(self.scope.child(self.arena))
            .analyze_sequence(then_body)?;
        let else_items = match else_body {
            Some(items) => Some(
                self.in_scope(self.scope.child(self.arena))
                    .analyze_sequence(items)?,
            ),
            None => None,
        };

        // The if-expression's type is the union of what the branches leave
        // behind; a missing branch contributes `any`.
        let ty = {
            let az = self.clone();
            Thunk::new(self.arena, self.span.clone(), move || {
                let mut types = Vec::with_capacity(2);
                types.push(match then_items.last() {
                    Some(e) => e.ty()?,
                    None => az.tm.void(),
                });
                types.push(match else_items {
                    Some(items) => match items.last() {
                        Some(e) => e.ty()?,
                        None => az.tm.void(),
                    },
                    None => az.tm.any(),
                });
                Ok(az.tm.union(&types, az.span.clone()))
            })
        };

        // The surface construct compiles to a temporary assigned in both
        // branches; mint its name now so nothing else takes it.
        let temp = self.scope.fresh_name(self.arena, "tmp");
        self.scope
            .declare(temp, Constness::Variable, ty, self.span.clone())?;

        Ok(self.expr(
            ty,
            ExprInner::If {
                cond: cond_e,
                then_body: then_items,
                else_body: else_items,
                temp,
            },
        ))
    }

    // ------------------------------------------------------------------
    // Declarations of types
    // ------------------------------------------------------------------

    /// Shared front half of class and interface analysis: generic
    /// parameters, the supertype, and the declaration's scope.
    fn type_decl_scope(
        &self,
        decl: &'a TypeDecl<'a>,
    ) -> Result<(Analyzer<'a>, Vec<&'a Type<'a>>, &'a Type<'a>), TypeError> {
        let (scope_az, param_tys) = if decl.type_params.is_empty() {
            (self.clone(), Vec::new())
        } else {
            let scope = self.scope.child(self.arena);
            let scope_az = self.in_scope(scope);
            let mut param_tys = Vec::with_capacity(decl.type_params.len());
            for tp in decl.type_params {
                let constraint = match tp.constraint {
                    Some(t) => self.eval_type(t)?,
                    None => self.tm.any(),
                };
                let param = self.tm.generics_param(tp.name, constraint);
                scope.declare(
                    tp.name,
                    Constness::Constant,
                    self.tm.resolved_thunk(self.tm.meta(param)),
                    tp.span.clone(),
                )?;
                param_tys.push(param);
            }
            (scope_az, param_tys)
        };
        let sup = match decl.extends {
            Some(t) => scope_az.eval_type(t)?,
            None => self.tm.any(),
        };
        Ok((scope_az, param_tys, sup))
    }

    fn check_duplicate_members(&self, decl: &'a TypeDecl<'a>) -> Result<(), TypeError> {
        let mut seen: Vec<(&str, Span)> = Vec::new();
        for (name, span) in decl
            .fields
            .iter()
            .map(|f| (f.name, f.span.clone()))
            .chain(decl.methods.iter().map(|m| (m.name, m.span.clone())))
        {
            if seen.iter().any(|(n, _)| *n == name) {
                return Err(self.error(TypeErrorKind::DuplicateMember {
                    name: name.to_string(),
                    ty: decl.name.to_string(),
                    span,
                }));
            }
            seen.push((name, span));
        }
        Ok(())
    }

    fn analyze_class(&self, decl: &'a TypeDecl<'a>) -> Result<&'a Expr<'a>, TypeError> {
        debug!(name = decl.name, "analyzing class declaration");
        self.check_duplicate_members(decl)?;
        let (scope_az, param_tys, sup) = self.type_decl_scope(decl)?;
        let ty = self.tm.interface(Some(decl.name), true, &[sup]);

        // Field types stay lazy so fields may name the class itself.
        for f in decl.fields {
            let az = scope_az.clone();
            let field_ty = f.ty;
            ty.add_member(Member {
                name: f.name,
                constness: Constness::Variable,
                ty: Thunk::new(self.arena, f.span.clone(), move || az.eval_type(field_ty)),
            });
        }

        // Methods analyze lazily too; their bodies run in a scope whose
        // receiver is the class instance type.
        let mut method_thunks = Vec::with_capacity(decl.methods.len());
        for m in decl.methods {
            let az = scope_az.at(m.span.clone());
            let method: &'a ExprThunk<'a> =
                Thunk::new(self.arena, m.span.clone(), move || {
                    az.analyze_method(m, ty)
                });
            ty.add_member(Member {
                name: m.name,
                constness: Constness::Constant,
                ty: Thunk::new(self.arena, m.span.clone(), move || method.get()?.ty()),
            });
            method_thunks.push((m.name, method));
        }

        let named = if param_tys.is_empty() {
            ty
        } else {
            self.tm.generics(&param_tys, ty)
        };
        Ok(self.expr(
            self.tm.resolved_thunk(self.tm.meta(named)),
            ExprInner::ClassDecl {
                name: decl.name,
                ty,
                methods: self.arena.alloc_slice_copy(&method_thunks),
            },
        ))
    }

    fn analyze_method(
        &self,
        m: &'a Method<'a>,
        receiver: &'a Type<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let body = match m.body {
            Some(body) => body,
            None => &[],
        };
        self.analyze_function(Some(m.name), m.params, m.ret, body, Some(receiver))
    }

    fn analyze_interface(&self, decl: &'a TypeDecl<'a>) -> Result<&'a Expr<'a>, TypeError> {
        debug!(name = decl.name, "analyzing interface declaration");
        self.check_duplicate_members(decl)?;
        let (scope_az, param_tys, sup) = self.type_decl_scope(decl)?;
        let ty = self.tm.interface(Some(decl.name), false, &[sup]);

        for f in decl.fields {
            let az = scope_az.clone();
            let field_ty = f.ty;
            ty.add_member(Member {
                name: f.name,
                constness: Constness::Variable,
                ty: Thunk::new(self.arena, f.span.clone(), move || az.eval_type(field_ty)),
            });
        }

        // Interface methods are signatures without bodies or receivers.
        for m in decl.methods {
            let az = scope_az.at(m.span.clone());
            ty.add_member(Member {
                name: m.name,
                constness: Constness::Constant,
                ty: Thunk::new(self.arena, m.span.clone(), move || {
                    let mut required = Vec::new();
                    let mut optional = Vec::new();
                    for p in m.params {
                        let pt = match p.ann {
                            Some(t) => az.eval_type(t)?,
                            None => az.tm.any(),
                        };
                        if p.optional {
                            optional.push(pt);
                        } else {
                            required.push(pt);
                        }
                    }
                    let ret = match m.ret {
                        Some(t) => az.eval_type(t)?,
                        None => az.tm.void(),
                    };
                    Ok(az
                        .tm
                        .function(None, &required, &optional, az.tm.resolved_thunk(ret)))
                }),
            });
        }

        let named = if param_tys.is_empty() {
            ty
        } else {
            self.tm.generics(&param_tys, ty)
        };
        Ok(self.expr(
            self.tm.resolved_thunk(self.tm.meta(named)),
            ExprInner::InterfaceDecl {
                name: decl.name,
                ty,
            },
        ))
    }

    fn analyze_alias(
        &self,
        name: &'a str,
        ty: &'a TypeExpr<'a>,
    ) -> Result<&'a Expr<'a>, TypeError> {
        let aliased = self.eval_type(ty)?;
        if aliased.name().is_none() {
            aliased.set_name(name);
        }
        Ok(self.expr(
            self.tm.resolved_thunk(self.tm.meta(aliased)),
            ExprInner::TypeAlias { name },
        ))
    }

    // ------------------------------------------------------------------
    // Type expressions
    // ------------------------------------------------------------------

    /// Evaluate a written type against the current scope. Only bindings of
    /// meta type name types.
    fn eval_type(&self, t: &'a TypeExpr<'a>) -> Result<&'a Type<'a>, TypeError> {
        match t {
            TypeExpr::Name(name, span) => self.resolve_type_name(name, span.clone()),
            TypeExpr::Union(a, b) => {
                let left = self.eval_type(a)?;
                let right = self.eval_type(b)?;
                Ok(self.tm.union(&[left, right], self.span.clone()))
            }
            TypeExpr::Intersection(a, b) => {
                let left = self.eval_type(a)?;
                let right = self.eval_type(b)?;
                Ok(self.tm.intersection(&[left, right], self.span.clone()))
            }
            TypeExpr::Function { params, ret } => {
                let mut required = Vec::new();
                let mut optional = Vec::new();
                for (p, opt) in *params {
                    let pt = self.eval_type(p)?;
                    if *opt {
                        optional.push(pt);
                    } else {
                        required.push(pt);
                    }
                }
                let ret = self.eval_type(ret)?;
                Ok(self
                    .tm
                    .function(None, &required, &optional, self.tm.resolved_thunk(ret)))
            }
            TypeExpr::Record(fields) => {
                let ty = self.tm.interface(None, false, &[]);
                for (name, ft) in *fields {
                    let field = self.eval_type(ft)?;
                    ty.add_member(Member {
                        name,
                        constness: Constness::Variable,
                        ty: self.tm.resolved_thunk(field),
                    });
                }
                Ok(ty)
            }
            TypeExpr::Instantiate { name, args, span } => {
                let generic = self.resolve_type_name(name, span.clone())?;
                let mut arg_tys = Vec::with_capacity(args.len());
                for arg in *args {
                    arg_tys.push(self.eval_type(arg)?);
                }
                instantiate(self.tm, generic, &arg_tys, span.clone())
            }
        }
    }

    fn resolve_type_name(&self, name: &'a str, span: Span) -> Result<&'a Type<'a>, TypeError> {
        match self.scope.resolve(name) {
            Some(Resolution::Local(binding)) => {
                let bound = binding.ty.get()?;
                match bound.kind {
                    TypeKind::Meta(instance) => Ok(instance),
                    _ => Err(self.error(TypeErrorKind::NotAType {
                        name: name.to_string(),
                        span,
                    })),
                }
            }
            Some(Resolution::Receiver { .. }) => Err(self.error(TypeErrorKind::NotAType {
                name: name.to_string(),
                span,
            })),
            None => Err(self.error(TypeErrorKind::UnboundVariable {
                name: name.to_string(),
                span,
            })),
        }
    }

    // ------------------------------------------------------------------
    // Resolution pass
    // ------------------------------------------------------------------

    /// Force everything the typed node left lazy, and run the checks that
    /// needed the whole scope: function bodies, member types, overrides.
    fn force_expr(&self, e: &'a Expr<'a>) -> Result<(), TypeError> {
        e.0.get()?;
        match &e.1 {
            ExprInner::Number(_)
            | ExprInner::Str(_)
            | ExprInner::Bool(_)
            | ExprInner::Ident(_)
            | ExprInner::This
            | ExprInner::TypeAlias { .. }
            | ExprInner::Instantiate { .. } => Ok(()),
            ExprInner::Declare { value, .. } | ExprInner::Assign { value, .. } => {
                self.force_expr(value)
            }
            ExprInner::AssignMember { object, value, .. } => {
                self.force_expr(object)?;
                self.force_expr(value)
            }
            ExprInner::Unary { expr, .. } => self.force_expr(expr),
            ExprInner::Binary { left, right, .. } => {
                self.force_expr(left)?;
                self.force_expr(right)
            }
            ExprInner::Call { callee, args } | ExprInner::New { callee, args } => {
                self.force_expr(callee)?;
                for arg in *args {
                    self.force_expr(arg)?;
                }
                Ok(())
            }
            ExprInner::Member { object, .. } => self.force_expr(object),
            ExprInner::Function { body, .. } => {
                let items = body.get()?;
                for item in items {
                    self.force_expr(item)?;
                }
                Ok(())
            }
            ExprInner::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                self.force_expr(cond)?;
                for item in *then_body {
                    self.force_expr(item)?;
                }
                if let Some(items) = else_body {
                    for item in *items {
                        self.force_expr(item)?;
                    }
                }
                Ok(())
            }
            ExprInner::ClassDecl { ty, methods, .. } => {
                for (_, method) in *methods {
                    let m = method.get()?;
                    self.force_expr(m)?;
                }
                self.check_type_decl(ty)
            }
            ExprInner::InterfaceDecl { ty, .. } => self.check_type_decl(ty),
        }
    }

    /// Force a declaration's member types and check overrides against the
    /// supertype walk.
    fn check_type_decl(&self, ty: &'a Type<'a>) -> Result<(), TypeError> {
        for m in ty.own_members() {
            m.ty.get()?;
        }
        for m in ty.own_members() {
            // Constructors are per-class, never overrides.
            if m.name == "constructor" {
                continue;
            }
            for sup in ty.supers() {
                if let Some(inherited) = sup.member(m.name) {
                    let own_ty = m.ty.get()?;
                    let inherited_ty = inherited.ty.get()?;
                    if !is_assignable(self.tm, own_ty, inherited_ty)? {
                        return Err(self.error(TypeErrorKind::IncompatibleOverride {
                            name: m.name.to_string(),
                            own: own_ty.to_string(),
                            inherited: inherited_ty.to_string(),
                            span: m.ty.span(),
                        }));
                    }
                }
            }
        }
        Ok(())
    }
}

fn describe_signatures(sigs: &[crate::types::CallSignature<'_>]) -> String {
    let mut out = String::new();
    for (i, sig) in sigs.iter().enumerate() {
        if i > 0 {
            out.push_str(" or ");
        }
        out.push('(');
        let mut first = true;
        for p in sig.required {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&p.to_string());
        }
        for p in sig.optional {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(&p.to_string());
            out.push('?');
        }
        out.push(')');
    }
    out
}
