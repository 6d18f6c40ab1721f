//! Recursive-descent parser with precedence climbing.
//!
//! Ambiguities are resolved by token-index backtracking: a `(` in expression
//! position is tried as a lambda head before falling back to grouping, and a
//! `<` after an identifier is tried as a generic argument list (committed
//! only if a call follows) before falling back to comparison.

use bumpalo::Bump;

use super::ast::{
    Expr, Field, FunctionLit, Method, Param, ParsedProgram, TypeDecl, TypeExpr, TypeParam,
};
use super::error::{ParseError, ParseErrorKind};
use super::lexer::{Token, TokenKind, lex};
use super::syntax::{AnnotatedSource, BinaryOp, Span, UnaryOp};

pub fn parse<'a>(arena: &'a Bump, source: &'a str) -> Result<ParsedProgram<'a>, ParseError> {
    let tokens = lex(arena, source)?;
    let ann = &*arena.alloc(AnnotatedSource::new(arena, source));
    let mut parser = Parser {
        arena,
        tokens,
        pos: 0,
        ann,
    };
    let items = parser.items_until(TokenKind::Eof)?;
    parser.expect(TokenKind::Eof, "end of input")?;
    Ok(ParsedProgram {
        items,
        source,
        ann,
    })
}

struct Parser<'a> {
    arena: &'a Bump,
    tokens: Vec<Token<'a>>,
    pos: usize,
    ann: &'a AnnotatedSource<'a, Expr<'a>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Token<'a> {
        self.tokens[self.pos]
    }

    fn kind(&self) -> TokenKind<'a> {
        self.peek().kind
    }

    fn advance(&mut self) -> Token<'a> {
        let t = self.tokens[self.pos];
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn check(&self, kind: TokenKind<'a>) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind<'a>) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind<'a>, what: &str) -> Result<Token<'a>, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<(&'a str, Span), ParseError> {
        match self.kind() {
            TokenKind::Ident(name) => {
                let t = self.advance();
                Ok((name, t.span.to_span()))
            }
            _ => Err(self.unexpected(what)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let t = self.peek();
        ParseError::new(ParseErrorKind::UnexpectedToken {
            expected: expected.to_string(),
            found: describe(&t.kind),
            span: t.span.to_span(),
        })
    }

    fn start(&self) -> usize {
        self.peek().span.start
    }

    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn node(&self, expr: Expr<'a>, start: usize) -> &'a Expr<'a> {
        let e = &*self.arena.alloc(expr);
        self.ann.add_span(e, Span::new(start, self.prev_end()));
        e
    }

    fn exprs(&self, items: Vec<&'a Expr<'a>>) -> &'a [&'a Expr<'a>] {
        self.arena.alloc_slice_copy(&items)
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn items_until(&mut self, end: TokenKind<'a>) -> Result<&'a [&'a Expr<'a>], ParseError> {
        let mut items = Vec::new();
        while !self.check(end) && !self.check(TokenKind::Eof) {
            items.push(self.item()?);
        }
        Ok(self.exprs(items))
    }

    fn item(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        match self.kind() {
            TokenKind::Let => self.let_item(false),
            TokenKind::Var => self.let_item(true),
            TokenKind::Fn => self.fn_item(),
            TokenKind::Class => self.type_decl_item(true),
            TokenKind::Interface => self.type_decl_item(false),
            TokenKind::Type => self.alias_item(),
            _ => self.expr(),
        }
    }

    fn let_item(&mut self, mutable: bool) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.advance();
        let (name, _) = self.expect_ident("a variable name")?;
        let ann = if self.check(TokenKind::Assign) {
            None
        } else {
            Some(self.parse_type()?)
        };
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.expr()?;
        Ok(self.node(
            Expr::Let {
                mutable,
                name,
                ann,
                value,
            },
            start,
        ))
    }

    fn fn_item(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.advance();
        let (name, _) = self.expect_ident("a function name")?;
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.params()?;
        let ret = if self.check(TokenKind::LBrace) {
            None
        } else {
            Some(self.parse_type()?)
        };
        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.items_until(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}'")?;
        let lit = &*self.arena.alloc(FunctionLit {
            name: Some(name),
            params,
            ret,
            body,
        });
        Ok(self.node(Expr::Function(lit), start))
    }

    fn alias_item(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.advance();
        let (name, _) = self.expect_ident("a type name")?;
        self.expect(TokenKind::Assign, "'='")?;
        let ty = self.parse_type()?;
        Ok(self.node(Expr::TypeAlias { name, ty }, start))
    }

    fn type_decl_item(&mut self, is_class: bool) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.advance();
        let (name, _) = self.expect_ident("a type name")?;

        let mut type_params = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                let pstart = self.start();
                let (pname, _) = self.expect_ident("a type parameter name")?;
                let constraint = if self.check(TokenKind::Comma) || self.check(TokenKind::Gt) {
                    None
                } else {
                    Some(self.parse_type()?)
                };
                type_params.push(TypeParam {
                    name: pname,
                    constraint,
                    span: Span::new(pstart, self.prev_end()),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt, "'>'")?;
        }

        let extends = if self.eat(TokenKind::Extends) {
            Some(self.parse_type()?)
        } else {
            None
        };

        self.expect(TokenKind::LBrace, "'{'")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(TokenKind::RBrace) {
            let istart = self.start();
            let (iname, _) = self.expect_ident("a member name")?;
            if self.eat(TokenKind::LParen) {
                let params = self.params()?;
                let (ret, body) = if is_class {
                    let ret = if self.check(TokenKind::LBrace) {
                        None
                    } else {
                        Some(self.parse_type()?)
                    };
                    self.expect(TokenKind::LBrace, "'{'")?;
                    let body = self.items_until(TokenKind::RBrace)?;
                    self.expect(TokenKind::RBrace, "'}'")?;
                    (ret, Some(body))
                } else {
                    // Interface method signatures always state their return
                    // type, which keeps them unambiguous against the next
                    // member declaration.
                    (Some(self.parse_type()?), None)
                };
                methods.push(Method {
                    name: iname,
                    params,
                    ret,
                    body,
                    span: Span::new(istart, self.prev_end()),
                });
            } else {
                let ty = self.parse_type()?;
                fields.push(Field {
                    name: iname,
                    ty,
                    span: Span::new(istart, self.prev_end()),
                });
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;

        let decl = &*self.arena.alloc(TypeDecl {
            name,
            type_params: self.arena.alloc_slice_fill_iter(type_params),
            extends,
            fields: self.arena.alloc_slice_fill_iter(fields),
            methods: self.arena.alloc_slice_fill_iter(methods),
            span: Span::new(start, self.prev_end()),
        });
        let expr = if is_class {
            Expr::Class(decl)
        } else {
            Expr::Interface(decl)
        };
        Ok(self.node(expr, start))
    }

    /// Parameter list; the opening `(` must already be consumed, the closing
    /// `)` is consumed here.
    fn params(&mut self) -> Result<&'a [Param<'a>], ParseError> {
        let mut params = Vec::new();
        let mut seen_optional = false;
        if !self.check(TokenKind::RParen) {
            loop {
                let pstart = self.start();
                let (name, _) = self.expect_ident("a parameter name")?;
                let ann = if type_start(self.kind()) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let optional = self.eat(TokenKind::Question);
                if seen_optional && !optional {
                    return Err(ParseError::new(ParseErrorKind::OptionalBeforeRequired {
                        name: name.to_string(),
                        span: Span::new(pstart, self.prev_end()),
                    }));
                }
                seen_optional |= optional;
                params.push(Param {
                    name,
                    ann,
                    optional,
                    span: Span::new(pstart, self.prev_end()),
                });
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(self.arena.alloc_slice_fill_iter(params))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        let lhs = self.binary(1)?;
        if self.check(TokenKind::Assign) {
            if !matches!(lhs, Expr::Ident(_) | Expr::Member { .. }) {
                return Err(ParseError::new(ParseErrorKind::InvalidAssignmentTarget {
                    span: self
                        .ann
                        .span_of(lhs)
                        .unwrap_or_else(|| Span::new(start, self.prev_end())),
                }));
            }
            self.advance();
            let value = self.expr()?;
            return Ok(self.node(Expr::Assign { target: lhs, value }, start));
        }
        Ok(lhs)
    }

    fn binary(&mut self, min_prec: u8) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        let mut left = self.unary()?;
        while let Some((op, prec)) = binary_op(self.kind()) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let right = self.binary(prec + 1)?;
            left = self.node(Expr::Binary { op, left, right }, start);
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        let op = match self.kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let expr = self.unary()?;
            return Ok(self.node(Expr::Unary { op, expr }, start));
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        let mut e = self.primary()?;
        loop {
            match self.kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.args()?;
                    e = self.node(Expr::Call { callee: e, args }, start);
                }
                TokenKind::Dot => {
                    self.advance();
                    let (name, _) = self.expect_ident("a member name")?;
                    e = self.node(Expr::Member { object: e, name }, start);
                }
                TokenKind::Lt if matches!(e, Expr::Ident(_)) => {
                    // Generic instantiation only if a well-formed argument
                    // list closes and a call follows; otherwise `<` is the
                    // comparison operator.
                    let save = self.pos;
                    match self.type_args() {
                        Ok(args) if self.check(TokenKind::LParen) => {
                            e = self.node(Expr::Instantiate { target: e, args }, start);
                        }
                        _ => {
                            self.pos = save;
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(e)
    }

    /// `<` type ("," type)* `>`, with the leading `<` still pending.
    fn type_args(&mut self) -> Result<&'a [&'a TypeExpr<'a>], ParseError> {
        self.expect(TokenKind::Lt, "'<'")?;
        let mut args = vec![self.parse_type()?];
        while self.eat(TokenKind::Comma) {
            args.push(self.parse_type()?);
        }
        self.expect(TokenKind::Gt, "'>'")?;
        Ok(self.arena.alloc_slice_copy(&args))
    }

    /// Argument list with the opening `(` already consumed.
    fn args(&mut self) -> Result<&'a [&'a Expr<'a>], ParseError> {
        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.expr()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        Ok(self.exprs(args))
    }

    fn primary(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        match self.kind() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(self.node(Expr::Number(value), start))
            }
            TokenKind::Str(value) => {
                self.advance();
                Ok(self.node(Expr::Str(value), start))
            }
            TokenKind::True => {
                self.advance();
                Ok(self.node(Expr::Bool(true), start))
            }
            TokenKind::False => {
                self.advance();
                Ok(self.node(Expr::Bool(false), start))
            }
            TokenKind::This => {
                self.advance();
                Ok(self.node(Expr::This, start))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(self.node(Expr::Ident(name), start))
            }
            TokenKind::New => self.new_expr(),
            TokenKind::If => self.if_expr(),
            TokenKind::LParen => {
                if let Some(lambda) = self.try_lambda()? {
                    return Ok(lambda);
                }
                self.advance();
                let inner = self.expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn new_expr(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.advance();
        let (name, nspan) = self.expect_ident("a class name")?;
        let mut callee = &*self.arena.alloc(Expr::Ident(name));
        self.ann.add_span(callee, nspan);
        if self.check(TokenKind::Lt) {
            let args = self.type_args()?;
            callee = self.node(
                Expr::Instantiate {
                    target: callee,
                    args,
                },
                start,
            );
        }
        self.expect(TokenKind::LParen, "'('")?;
        let args = self.args()?;
        Ok(self.node(Expr::New { callee, args }, start))
    }

    fn if_expr(&mut self) -> Result<&'a Expr<'a>, ParseError> {
        let start = self.start();
        self.expect(TokenKind::If, "'if'")?;
        let cond = self.expr()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let then_body = self.items_until(TokenKind::RBrace)?;
        self.expect(TokenKind::RBrace, "'}'")?;
        let else_body = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                let nested = self.if_expr()?;
                Some(self.exprs(vec![nested]))
            } else {
                self.expect(TokenKind::LBrace, "'{'")?;
                let body = self.items_until(TokenKind::RBrace)?;
                self.expect(TokenKind::RBrace, "'}'")?;
                Some(body)
            }
        } else {
            None
        };
        Ok(self.node(
            Expr::If {
                cond,
                then_body,
                else_body,
            },
            start,
        ))
    }

    /// Try to parse a lambda at a `(`. The head (parameters, optional return
    /// type, `=>`) is parsed speculatively; once the arrow is seen the body
    /// is committed and its errors propagate.
    fn try_lambda(&mut self) -> Result<Option<&'a Expr<'a>>, ParseError> {
        let start = self.start();
        let save = self.pos;
        let head = self.lambda_head();
        let (params, ret) = match head {
            Ok(head) => head,
            Err(_) => {
                self.pos = save;
                return Ok(None);
            }
        };
        let body = if self.check(TokenKind::LBrace) {
            self.advance();
            let body = self.items_until(TokenKind::RBrace)?;
            self.expect(TokenKind::RBrace, "'}'")?;
            body
        } else {
            let e = self.expr()?;
            self.exprs(vec![e])
        };
        let lit = &*self.arena.alloc(FunctionLit {
            name: None,
            params,
            ret,
            body,
        });
        Ok(Some(self.node(Expr::Function(lit), start)))
    }

    fn lambda_head(
        &mut self,
    ) -> Result<(&'a [Param<'a>], Option<&'a TypeExpr<'a>>), ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let params = self.params()?;
        let ret = if self.check(TokenKind::FatArrow) {
            None
        } else {
            Some(self.parse_type()?)
        };
        self.expect(TokenKind::FatArrow, "'=>'")?;
        Ok((params, ret))
    }

    // ------------------------------------------------------------------
    // Types
    // ------------------------------------------------------------------

    fn parse_type(&mut self) -> Result<&'a TypeExpr<'a>, ParseError> {
        let mut t = self.type_inter()?;
        while self.eat(TokenKind::Pipe) {
            let rhs = self.type_inter()?;
            t = &*self.arena.alloc(TypeExpr::Union(t, rhs));
        }
        Ok(t)
    }

    fn type_inter(&mut self) -> Result<&'a TypeExpr<'a>, ParseError> {
        let mut t = self.type_atom()?;
        while self.eat(TokenKind::Amp) {
            let rhs = self.type_atom()?;
            t = &*self.arena.alloc(TypeExpr::Intersection(t, rhs));
        }
        Ok(t)
    }

    fn type_atom(&mut self) -> Result<&'a TypeExpr<'a>, ParseError> {
        let start = self.start();
        match self.kind() {
            TokenKind::Ident(name) => {
                self.advance();
                if self.check(TokenKind::Lt) {
                    let args = self.type_args()?;
                    Ok(&*self.arena.alloc(TypeExpr::Instantiate {
                        name,
                        args,
                        span: Span::new(start, self.prev_end()),
                    }))
                } else {
                    Ok(&*self
                        .arena
                        .alloc(TypeExpr::Name(name, Span::new(start, self.prev_end()))))
                }
            }
            TokenKind::LParen => {
                // Function type or parenthesized type; decided by whether a
                // `=>` follows the closing paren.
                let save = self.pos;
                match self.function_type() {
                    Ok(t) => Ok(t),
                    Err(_) => {
                        self.pos = save;
                        self.advance();
                        let inner = self.parse_type()?;
                        self.expect(TokenKind::RParen, "')'")?;
                        Ok(inner)
                    }
                }
            }
            TokenKind::LBrace => {
                self.advance();
                let mut fields = Vec::new();
                while !self.check(TokenKind::RBrace) {
                    let (name, _) = self.expect_ident("a field name")?;
                    let ty = self.parse_type()?;
                    fields.push((name, ty));
                }
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(&*self
                    .arena
                    .alloc(TypeExpr::Record(self.arena.alloc_slice_copy(&fields))))
            }
            _ => Err(self.unexpected("a type")),
        }
    }

    fn function_type(&mut self) -> Result<&'a TypeExpr<'a>, ParseError> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                let ty = self.parse_type()?;
                let optional = self.eat(TokenKind::Question);
                params.push((ty, optional));
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::FatArrow, "'=>'")?;
        let ret = self.parse_type()?;
        Ok(&*self.arena.alloc(TypeExpr::Function {
            params: self.arena.alloc_slice_copy(&params),
            ret,
        }))
    }
}

fn binary_op(kind: TokenKind<'_>) -> Option<(BinaryOp, u8)> {
    match kind {
        TokenKind::EqEq => Some((BinaryOp::Eq, 1)),
        TokenKind::NotEq => Some((BinaryOp::Ne, 1)),
        TokenKind::Lt => Some((BinaryOp::Lt, 2)),
        TokenKind::Le => Some((BinaryOp::Le, 2)),
        TokenKind::Gt => Some((BinaryOp::Gt, 2)),
        TokenKind::Ge => Some((BinaryOp::Ge, 2)),
        TokenKind::Plus => Some((BinaryOp::Add, 3)),
        TokenKind::Minus => Some((BinaryOp::Sub, 3)),
        TokenKind::Star => Some((BinaryOp::Mul, 4)),
        TokenKind::Slash => Some((BinaryOp::Div, 4)),
        _ => None,
    }
}

fn type_start(kind: TokenKind<'_>) -> bool {
    matches!(
        kind,
        TokenKind::Ident(_) | TokenKind::LParen | TokenKind::LBrace
    )
}

fn describe(kind: &TokenKind<'_>) -> String {
    match kind {
        TokenKind::Number(_) => "a number".to_string(),
        TokenKind::Str(_) => "a string".to_string(),
        TokenKind::Ident(name) => format!("'{}'", name),
        TokenKind::Let => "'let'".to_string(),
        TokenKind::Var => "'var'".to_string(),
        TokenKind::Fn => "'fn'".to_string(),
        TokenKind::Class => "'class'".to_string(),
        TokenKind::Interface => "'interface'".to_string(),
        TokenKind::Type => "'type'".to_string(),
        TokenKind::Extends => "'extends'".to_string(),
        TokenKind::New => "'new'".to_string(),
        TokenKind::This => "'this'".to_string(),
        TokenKind::If => "'if'".to_string(),
        TokenKind::Else => "'else'".to_string(),
        TokenKind::True => "'true'".to_string(),
        TokenKind::False => "'false'".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Dot => "'.'".to_string(),
        TokenKind::Question => "'?'".to_string(),
        TokenKind::Bang => "'!'".to_string(),
        TokenKind::Assign => "'='".to_string(),
        TokenKind::EqEq => "'=='".to_string(),
        TokenKind::NotEq => "'!='".to_string(),
        TokenKind::Lt => "'<'".to_string(),
        TokenKind::Le => "'<='".to_string(),
        TokenKind::Gt => "'>'".to_string(),
        TokenKind::Ge => "'>='".to_string(),
        TokenKind::Plus => "'+'".to_string(),
        TokenKind::Minus => "'-'".to_string(),
        TokenKind::Star => "'*'".to_string(),
        TokenKind::Slash => "'/'".to_string(),
        TokenKind::Pipe => "'|'".to_string(),
        TokenKind::Amp => "'&'".to_string(),
        TokenKind::FatArrow => "'=>'".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_one<'a>(arena: &'a Bump, source: &'a str) -> &'a Expr<'a> {
        let program = parse(arena, source).unwrap();
        assert_eq!(program.items.len(), 1, "source: {source}");
        program.items[0]
    }

    #[test]
    fn precedence_builds_left_spine() {
        let arena = Bump::new();
        // 1 + 2 * 1 * f(1, 2) parses as 1 + ((2 * 1) * f(1, 2)).
        let e = parse_one(&arena, "1 + 2 * 1 * f(1, 2)");
        let Expr::Binary {
            op: BinaryOp::Add,
            left,
            right,
        } = e
        else {
            panic!("expected Add at the root, got {e:?}");
        };
        assert!(matches!(left, Expr::Number(_)));
        let Expr::Binary {
            op: BinaryOp::Mul,
            left: ml,
            right: mr,
        } = right
        else {
            panic!("expected Mul under Add, got {right:?}");
        };
        assert!(matches!(ml, Expr::Binary { op: BinaryOp::Mul, .. }));
        assert!(matches!(mr, Expr::Call { .. }));
    }

    #[test]
    fn let_with_type_ascription() {
        let arena = Bump::new();
        let e = parse_one(&arena, "let a number = 1");
        let Expr::Let {
            mutable: false,
            name: "a",
            ann: Some(TypeExpr::Name("number", _)),
            ..
        } = e
        else {
            panic!("unexpected parse: {e:?}");
        };
    }

    #[test]
    fn lambda_vs_grouping() {
        let arena = Bump::new();
        let e = parse_one(&arena, "(a number, b number?) => a");
        let Expr::Function(lit) = e else {
            panic!("expected a lambda, got {e:?}");
        };
        assert_eq!(lit.params.len(), 2);
        assert!(!lit.params[0].optional);
        assert!(lit.params[1].optional);

        let e = parse_one(&arena, "(1 + 2) * 3");
        assert!(matches!(e, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn generic_call_vs_comparison() {
        let arena = Bump::new();
        let e = parse_one(&arena, "id<number>(1)");
        let Expr::Call { callee, .. } = e else {
            panic!("expected a call, got {e:?}");
        };
        assert!(matches!(callee, Expr::Instantiate { .. }));

        // Without a following call, `<` and `>` are comparisons.
        let e = parse_one(&arena, "a < b");
        assert!(matches!(e, Expr::Binary { op: BinaryOp::Lt, .. }));
    }

    #[test]
    fn new_with_type_arguments() {
        let arena = Bump::new();
        let e = parse_one(&arena, "new Box<number>(1)");
        let Expr::New { callee, args } = e else {
            panic!("expected new, got {e:?}");
        };
        assert!(matches!(callee, Expr::Instantiate { .. }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn class_with_fields_and_methods() {
        let arena = Bump::new();
        let e = parse_one(
            &arena,
            "class Point { x number y number norm() number { this.x } }",
        );
        let Expr::Class(decl) = e else {
            panic!("expected class, got {e:?}");
        };
        assert_eq!(decl.fields.len(), 2);
        assert_eq!(decl.methods.len(), 1);
        assert_eq!(decl.methods[0].name, "norm");
    }

    #[test]
    fn union_type_in_alias() {
        let arena = Bump::new();
        let e = parse_one(&arena, "type N = number | string | boolean");
        let Expr::TypeAlias { name: "N", ty } = e else {
            panic!("expected alias, got {e:?}");
        };
        assert!(matches!(ty, TypeExpr::Union(..)));
    }

    #[test]
    fn assignment_target_validation() {
        let arena = Bump::new();
        assert!(parse(&arena, "1 + 2 = 3").is_err());
        assert!(matches!(parse_one(&arena, "a.b = 3"), Expr::Assign { .. }));
    }

    #[test]
    fn optional_param_ordering_enforced() {
        let arena = Bump::new();
        assert!(parse(&arena, "fn f(a number?, b number) { a }").is_err());
    }

    #[test]
    fn if_else_chains() {
        let arena = Bump::new();
        let e = parse_one(&arena, "if a { 1 } else if b { 2 } else { 3 }");
        let Expr::If {
            else_body: Some(else_body),
            ..
        } = e
        else {
            panic!("expected if, got {e:?}");
        };
        assert_eq!(else_body.len(), 1);
        assert!(matches!(else_body[0], Expr::If { .. }));
    }

    #[test]
    fn spans_are_recorded() {
        let arena = Bump::new();
        let program = parse(&arena, "let a = 1").unwrap();
        let span = program.ann.span_of(program.items[0]).unwrap();
        assert_eq!(span, Span::new(0, 9));
    }
}
