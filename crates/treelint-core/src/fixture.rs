//! Deterministic fixture front end for a small script grammar.
//!
//! The engine consumes already-built trees from an external parser; this
//! module is the reference construction path used by the test suites (and
//! by the testable properties that re-parse rewritten source). It covers
//! exactly the statement and expression shapes the built-in rules and
//! engine tests exercise: variable declarations, functions and arrow
//! functions, try/catch, calls, member access, `await`/`void`, string and
//! template literals, and `+` concatenation.

use thiserror::Error;

use crate::tree::{NodeId, NodeKind, Role, Span, SourceTree, TreeBuilder};

/// Error produced when fixture source does not fit the supported grammar.
#[derive(Debug, Error)]
#[error("fixture parse error at byte {offset}: {message}")]
pub struct FixtureError {
    /// Byte offset where parsing stopped.
    pub offset: usize,
    /// What was expected or found.
    pub message: String,
}

impl FixtureError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Parses fixture source into a validated [`SourceTree`].
///
/// # Errors
///
/// Returns [`FixtureError`] when the source falls outside the supported
/// grammar subset or the resulting tree fails validation.
pub fn parse(source: &str) -> Result<SourceTree, FixtureError> {
    let tokens = Lexer::new(source).lex(Terminator::Eof)?;
    let mut builder = TreeBuilder::new(source);
    let mut statements = Vec::new();
    {
        let mut parser = Parser {
            tokens,
            pos: 0,
            builder: &mut builder,
        };
        while parser.peek().is_some() {
            statements.push(parser.parse_stmt()?);
        }
    }
    let program = builder.node(NodeKind::Program, Span::new(0, source.len()));
    for stmt in statements {
        builder.attach(program, Role::Body, stmt);
    }
    builder
        .finish(program)
        .map_err(|e| FixtureError::new(0, e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Dot,
    Plus,
    Arrow,
    Eq,
}

#[derive(Debug, Clone)]
enum TokKind {
    Ident(String),
    Number(String),
    Str(String),
    Template(Vec<TplPart>),
    Punct(Punct),
}

#[derive(Debug, Clone)]
struct Tok {
    kind: TokKind,
    span: Span,
}

#[derive(Debug, Clone)]
enum TplPart {
    Chunk { text: String, span: Span },
    Expr(Vec<Tok>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Eof,
    /// Stop at the `}` closing a template `${` hole.
    TemplateBrace,
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn byte(&self, at: usize) -> Option<u8> {
        self.src.as_bytes().get(at).copied()
    }

    fn lex(&mut self, until: Terminator) -> Result<Vec<Tok>, FixtureError> {
        let mut tokens = Vec::new();
        let mut brace_depth = 0usize;

        while let Some(b) = self.byte(self.pos) {
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.pos += 1;
                }
                b'/' if self.byte(self.pos + 1) == Some(b'/') => {
                    while self.byte(self.pos).is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'$' => {
                    let start = self.pos;
                    while self
                        .byte(self.pos)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'$')
                    {
                        self.pos += 1;
                    }
                    tokens.push(Tok {
                        kind: TokKind::Ident(self.src[start..self.pos].to_string()),
                        span: Span::new(start, self.pos),
                    });
                }
                b'0'..=b'9' => {
                    let start = self.pos;
                    while self
                        .byte(self.pos)
                        .is_some_and(|c| c.is_ascii_digit() || c == b'.')
                    {
                        self.pos += 1;
                    }
                    tokens.push(Tok {
                        kind: TokKind::Number(self.src[start..self.pos].to_string()),
                        span: Span::new(start, self.pos),
                    });
                }
                b'\'' | b'"' => {
                    let start = self.pos;
                    self.pos += 1;
                    while let Some(c) = self.byte(self.pos) {
                        if c == b {
                            break;
                        }
                        self.pos += if c == b'\\' { 2 } else { 1 };
                    }
                    if self.byte(self.pos) != Some(b) {
                        return Err(FixtureError::new(start, "unterminated string literal"));
                    }
                    self.pos += 1;
                    tokens.push(Tok {
                        kind: TokKind::Str(self.src[start + 1..self.pos - 1].to_string()),
                        span: Span::new(start, self.pos),
                    });
                }
                b'`' => tokens.push(self.lex_template()?),
                b'}' if until == Terminator::TemplateBrace && brace_depth == 0 => {
                    self.pos += 1;
                    return Ok(tokens);
                }
                _ => {
                    let start = self.pos;
                    let punct = match b {
                        b'(' => Punct::LParen,
                        b')' => Punct::RParen,
                        b'{' => {
                            brace_depth += 1;
                            Punct::LBrace
                        }
                        b'}' => {
                            brace_depth = brace_depth.saturating_sub(1);
                            Punct::RBrace
                        }
                        b',' => Punct::Comma,
                        b';' => Punct::Semi,
                        b'.' => Punct::Dot,
                        b'+' => Punct::Plus,
                        b'=' if self.byte(self.pos + 1) == Some(b'>') => {
                            self.pos += 1;
                            Punct::Arrow
                        }
                        b'=' => Punct::Eq,
                        other => {
                            return Err(FixtureError::new(
                                start,
                                format!("unsupported character `{}`", other as char),
                            ));
                        }
                    };
                    self.pos += 1;
                    tokens.push(Tok {
                        kind: TokKind::Punct(punct),
                        span: Span::new(start, self.pos),
                    });
                }
            }
        }

        if until == Terminator::TemplateBrace {
            return Err(FixtureError::new(self.pos, "unterminated `${` expression"));
        }
        Ok(tokens)
    }

    fn lex_template(&mut self) -> Result<Tok, FixtureError> {
        let start = self.pos;
        self.pos += 1;
        let mut parts = Vec::new();
        let mut chunk_start = self.pos;

        loop {
            match self.byte(self.pos) {
                None => return Err(FixtureError::new(start, "unterminated template literal")),
                Some(b'`') => {
                    if self.pos > chunk_start {
                        parts.push(TplPart::Chunk {
                            text: self.src[chunk_start..self.pos].to_string(),
                            span: Span::new(chunk_start, self.pos),
                        });
                    }
                    self.pos += 1;
                    return Ok(Tok {
                        kind: TokKind::Template(parts),
                        span: Span::new(start, self.pos),
                    });
                }
                Some(b'$') if self.byte(self.pos + 1) == Some(b'{') => {
                    if self.pos > chunk_start {
                        parts.push(TplPart::Chunk {
                            text: self.src[chunk_start..self.pos].to_string(),
                            span: Span::new(chunk_start, self.pos),
                        });
                    }
                    self.pos += 2;
                    let tokens = self.lex(Terminator::TemplateBrace)?;
                    parts.push(TplPart::Expr(tokens));
                    chunk_start = self.pos;
                }
                Some(b'\\') => self.pos += 2,
                Some(_) => self.pos += 1,
            }
        }
    }
}

struct Parser<'b> {
    tokens: Vec<Tok>,
    pos: usize,
    builder: &'b mut TreeBuilder,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + ahead)
    }

    fn peek_punct(&self, punct: Punct) -> bool {
        matches!(self.peek(), Some(Tok { kind: TokKind::Punct(p), .. }) if *p == punct)
    }

    fn peek_ident(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Tok { kind: TokKind::Ident(s), .. }) if s == name)
    }

    fn ident_at(&self, ahead: usize, name: &str) -> bool {
        matches!(self.peek_at(ahead), Some(Tok { kind: TokKind::Ident(s), .. }) if s == name)
    }

    fn punct_at(&self, ahead: usize, punct: Punct) -> bool {
        matches!(self.peek_at(ahead), Some(Tok { kind: TokKind::Punct(p), .. }) if *p == punct)
    }

    fn advance(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat_punct(&mut self, punct: Punct) -> Option<Tok> {
        if self.peek_punct(punct) {
            self.advance()
        } else {
            None
        }
    }

    fn expect_punct(&mut self, punct: Punct) -> Result<Tok, FixtureError> {
        self.eat_punct(punct).ok_or_else(|| {
            FixtureError::new(self.offset(), format!("expected `{punct:?}`"))
        })
    }

    fn expect_ident(&mut self) -> Result<(String, Span), FixtureError> {
        match self.advance() {
            Some(Tok {
                kind: TokKind::Ident(name),
                span,
            }) => Ok((name, span)),
            _ => Err(FixtureError::new(self.offset(), "expected identifier")),
        }
    }

    fn offset(&self) -> usize {
        self.peek().map_or(usize::MAX, |t| t.span.start)
    }

    fn span_of(&self, id: NodeId) -> Span {
        self.builder.span_of(id)
    }

    // ── statements ──

    fn parse_stmt(&mut self) -> Result<NodeId, FixtureError> {
        if self.peek_ident("var") || self.peek_ident("let") || self.peek_ident("const") {
            return self.parse_var_decl();
        }
        if self.peek_ident("return") {
            return self.parse_return();
        }
        if self.peek_ident("try") {
            return self.parse_try();
        }
        if self.peek_ident("function")
            || (self.peek_ident("async") && self.ident_at(1, "function"))
        {
            return self.parse_function_stmt();
        }
        if self.peek_punct(Punct::LBrace) {
            return self.parse_block();
        }
        self.parse_expr_stmt()
    }

    fn parse_var_decl(&mut self) -> Result<NodeId, FixtureError> {
        let (keyword, kw_span) = self.expect_ident()?;
        let mut declarators = Vec::new();
        let mut end = kw_span.end;

        loop {
            let (name, name_span) = self.expect_ident()?;
            let name_node = self.builder.token(NodeKind::Identifier, name_span, name);
            let mut decl_end = name_span.end;
            let init = if self.eat_punct(Punct::Eq).is_some() {
                let expr = self.parse_expr()?;
                decl_end = self.span_of(expr).end;
                Some(expr)
            } else {
                None
            };
            let declarator = self
                .builder
                .node(NodeKind::Declarator, Span::new(name_span.start, decl_end));
            self.builder.attach(declarator, Role::Name, name_node);
            if let Some(expr) = init {
                self.builder.attach(declarator, Role::Init, expr);
            }
            end = decl_end;
            declarators.push(declarator);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }

        let node = self
            .builder
            .token(NodeKind::VarDecl, Span::new(kw_span.start, end), keyword);
        for declarator in declarators {
            self.builder.attach(node, Role::Declarations, declarator);
        }
        self.eat_punct(Punct::Semi);
        Ok(node)
    }

    fn parse_return(&mut self) -> Result<NodeId, FixtureError> {
        let (_, kw_span) = self.expect_ident()?;
        let mut end = kw_span.end;
        let expr = if self.peek().is_some()
            && !self.peek_punct(Punct::Semi)
            && !self.peek_punct(Punct::RBrace)
        {
            let expr = self.parse_expr()?;
            end = self.span_of(expr).end;
            Some(expr)
        } else {
            None
        };
        let node = self
            .builder
            .node(NodeKind::ReturnStmt, Span::new(kw_span.start, end));
        if let Some(expr) = expr {
            self.builder.attach(node, Role::Expr, expr);
        }
        self.eat_punct(Punct::Semi);
        Ok(node)
    }

    fn parse_try(&mut self) -> Result<NodeId, FixtureError> {
        let (_, kw_span) = self.expect_ident()?;
        let block = self.parse_block()?;

        if !self.peek_ident("catch") {
            return Err(FixtureError::new(self.offset(), "expected `catch`"));
        }
        let (_, catch_span) = self.expect_ident()?;
        self.expect_punct(Punct::LParen)?;
        let (param, param_span) = self.expect_ident()?;
        let param_node = self.builder.token(NodeKind::Identifier, param_span, param);
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_block()?;
        let body_end = self.span_of(body).end;

        let handler = self
            .builder
            .node(NodeKind::CatchClause, Span::new(catch_span.start, body_end));
        self.builder.attach(handler, Role::Param, param_node);
        self.builder.attach(handler, Role::Body, body);

        let node = self
            .builder
            .node(NodeKind::TryStmt, Span::new(kw_span.start, body_end));
        self.builder.attach(node, Role::TryBlock, block);
        self.builder.attach(node, Role::Handler, handler);
        Ok(node)
    }

    fn parse_block(&mut self) -> Result<NodeId, FixtureError> {
        let open = self.expect_punct(Punct::LBrace)?;
        let mut statements = Vec::new();
        while !self.peek_punct(Punct::RBrace) {
            if self.peek().is_none() {
                return Err(FixtureError::new(self.offset(), "unterminated block"));
            }
            statements.push(self.parse_stmt()?);
        }
        let close = self.expect_punct(Punct::RBrace)?;
        let node = self
            .builder
            .node(NodeKind::Block, Span::new(open.span.start, close.span.end));
        for stmt in statements {
            self.builder.attach(node, Role::Body, stmt);
        }
        Ok(node)
    }

    fn parse_function_stmt(&mut self) -> Result<NodeId, FixtureError> {
        let start = self.offset();
        let is_async = self.peek_ident("async");
        if is_async {
            self.advance();
        }
        self.advance(); // `function`
        self.parse_function_tail(NodeKind::FunctionDecl, is_async, start)
    }

    fn parse_function_tail(
        &mut self,
        kind: NodeKind,
        is_async: bool,
        start: usize,
    ) -> Result<NodeId, FixtureError> {
        let name = if matches!(self.peek(), Some(Tok { kind: TokKind::Ident(_), .. })) {
            let (name, span) = self.expect_ident()?;
            Some(self.builder.token(NodeKind::Identifier, span, name))
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let span = Span::new(start, self.span_of(body).end);

        let node = if is_async {
            self.builder.token(kind, span, "async")
        } else {
            self.builder.node(kind, span)
        };
        if let Some(name) = name {
            self.builder.attach(node, Role::Name, name);
        }
        for param in params {
            self.builder.attach(node, Role::Params, param);
        }
        self.builder.attach(node, Role::Body, body);
        Ok(node)
    }

    fn parse_params(&mut self) -> Result<Vec<NodeId>, FixtureError> {
        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();
        if !self.peek_punct(Punct::RParen) {
            loop {
                let (name, span) = self.expect_ident()?;
                params.push(self.builder.token(NodeKind::Identifier, span, name));
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(params)
    }

    fn parse_expr_stmt(&mut self) -> Result<NodeId, FixtureError> {
        let expr = self.parse_expr()?;
        let mut end = self.span_of(expr).end;
        if let Some(semi) = self.eat_punct(Punct::Semi) {
            end = semi.span.end;
        }
        let start = self.span_of(expr).start;
        let node = self
            .builder
            .node(NodeKind::ExprStmt, Span::new(start, end));
        self.builder.attach(node, Role::Expr, expr);
        Ok(node)
    }

    // ── expressions ──

    fn parse_expr(&mut self) -> Result<NodeId, FixtureError> {
        let mut left = self.parse_unary()?;
        while self.eat_punct(Punct::Plus).is_some() {
            let right = self.parse_unary()?;
            let span = Span::new(self.span_of(left).start, self.span_of(right).end);
            let node = self.builder.token(NodeKind::BinaryExpr, span, "+");
            self.builder.attach(node, Role::Left, left);
            self.builder.attach(node, Role::Right, right);
            left = node;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<NodeId, FixtureError> {
        for (keyword, kind) in [("await", NodeKind::AwaitExpr), ("void", NodeKind::VoidExpr)] {
            if self.peek_ident(keyword) {
                let (_, kw_span) = self.expect_ident()?;
                let operand = self.parse_unary()?;
                let span = Span::new(kw_span.start, self.span_of(operand).end);
                let node = self.builder.node(kind, span);
                self.builder.attach(node, Role::Expr, operand);
                return Ok(node);
            }
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<NodeId, FixtureError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct(Punct::Dot).is_some() {
                let (name, span) = self.expect_ident()?;
                let property = self.builder.token(NodeKind::Identifier, span, name);
                let node_span = Span::new(self.span_of(expr).start, span.end);
                let node = self.builder.node(NodeKind::MemberExpr, node_span);
                self.builder.attach(node, Role::Object, expr);
                self.builder.attach(node, Role::Property, property);
                expr = node;
            } else if self.peek_punct(Punct::LParen) {
                self.advance();
                let mut args = Vec::new();
                if !self.peek_punct(Punct::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat_punct(Punct::Comma).is_none() {
                            break;
                        }
                    }
                }
                let close = self.expect_punct(Punct::RParen)?;
                let node_span = Span::new(self.span_of(expr).start, close.span.end);
                let node = self.builder.node(NodeKind::CallExpr, node_span);
                self.builder.attach(node, Role::Callee, expr);
                for arg in args {
                    self.builder.attach(node, Role::Args, arg);
                }
                expr = node;
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<NodeId, FixtureError> {
        if self.peek_punct(Punct::LParen) {
            if self.paren_starts_arrow(0) {
                let start = self.offset();
                return self.parse_arrow(false, start);
            }
            self.advance();
            let expr = self.parse_expr()?;
            self.expect_punct(Punct::RParen)?;
            return Ok(expr);
        }

        if self.peek_ident("async") {
            if self.ident_at(1, "function") {
                let start = self.offset();
                self.advance();
                self.advance();
                return self.parse_function_tail(NodeKind::FunctionExpr, true, start);
            }
            if self.punct_at(1, Punct::LParen) && self.paren_starts_arrow(1) {
                let start = self.offset();
                self.advance();
                return self.parse_arrow(true, start);
            }
        }

        if self.peek_ident("function") {
            let start = self.offset();
            self.advance();
            return self.parse_function_tail(NodeKind::FunctionExpr, false, start);
        }

        match self.advance() {
            Some(Tok {
                kind: TokKind::Ident(name),
                span,
            }) => {
                if self.peek_punct(Punct::Arrow) {
                    // Single-parameter arrow: `x => body`.
                    let param = self.builder.token(NodeKind::Identifier, span, name);
                    self.advance();
                    return self.finish_arrow(false, span.start, vec![param]);
                }
                Ok(self.builder.token(NodeKind::Identifier, span, name))
            }
            Some(Tok {
                kind: TokKind::Number(raw),
                span,
            }) => Ok(self.builder.token(NodeKind::NumberLit, span, raw)),
            Some(Tok {
                kind: TokKind::Str(value),
                span,
            }) => Ok(self.builder.token(NodeKind::StringLit, span, value)),
            Some(Tok {
                kind: TokKind::Template(parts),
                span,
            }) => {
                let node = self.builder.node(NodeKind::TemplateLit, span);
                for part in parts {
                    match part {
                        TplPart::Chunk { text, span } => {
                            let chunk =
                                self.builder.token(NodeKind::TemplateChunk, span, text);
                            self.builder.attach(node, Role::Parts, chunk);
                        }
                        TplPart::Expr(tokens) => {
                            let expr = self.parse_embedded(tokens)?;
                            self.builder.attach(node, Role::Parts, expr);
                        }
                    }
                }
                Ok(node)
            }
            other => Err(FixtureError::new(
                other.map_or(usize::MAX, |t| t.span.start),
                "expected expression",
            )),
        }
    }

    /// Parses the token stream of one `${..}` hole.
    fn parse_embedded(&mut self, tokens: Vec<Tok>) -> Result<NodeId, FixtureError> {
        let mut sub = Parser {
            tokens,
            pos: 0,
            builder: &mut *self.builder,
        };
        let expr = sub.parse_expr()?;
        if sub.peek().is_some() {
            return Err(FixtureError::new(
                sub.offset(),
                "trailing tokens in template expression",
            ));
        }
        Ok(expr)
    }

    /// Lookahead: does the `(` at `ahead` open an arrow parameter list?
    fn paren_starts_arrow(&self, ahead: usize) -> bool {
        let mut depth = 0usize;
        let mut index = self.pos + ahead;
        while let Some(tok) = self.tokens.get(index) {
            match tok.kind {
                TokKind::Punct(Punct::LParen) => depth += 1,
                TokKind::Punct(Punct::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(index + 1),
                            Some(Tok {
                                kind: TokKind::Punct(Punct::Arrow),
                                ..
                            })
                        );
                    }
                }
                _ => {}
            }
            index += 1;
        }
        false
    }

    fn parse_arrow(&mut self, is_async: bool, start: usize) -> Result<NodeId, FixtureError> {
        let params = self.parse_params()?;
        self.expect_punct(Punct::Arrow)?;
        self.finish_arrow(is_async, start, params)
    }

    fn finish_arrow(
        &mut self,
        is_async: bool,
        start: usize,
        params: Vec<NodeId>,
    ) -> Result<NodeId, FixtureError> {
        let body = if self.peek_punct(Punct::LBrace) {
            self.parse_block()?
        } else {
            self.parse_expr()?
        };
        let span = Span::new(start, self.span_of(body).end);
        let node = if is_async {
            self.builder.token(NodeKind::ArrowFunction, span, "async")
        } else {
            self.builder.node(NodeKind::ArrowFunction, span)
        };
        for param in params {
            self.builder.attach(node, Role::Params, param);
        }
        self.builder.attach(node, Role::Body, body);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_under(tree: &SourceTree, node: NodeId) -> Vec<NodeKind> {
        let mut out = vec![tree.kind(node)];
        for child in tree.children_in_order(node) {
            out.extend(kinds_under(tree, *child));
        }
        out
    }

    #[test]
    fn parses_call_statement() {
        let tree = parse("fetchUserData(userId);").expect("parses");
        let stmt = tree.child(tree.root(), Role::Body).expect("stmt");
        assert_eq!(tree.kind(stmt), NodeKind::ExprStmt);
        let call = tree.child(stmt, Role::Expr).expect("call");
        assert_eq!(tree.kind(call), NodeKind::CallExpr);
        let callee = tree.child(call, Role::Callee).expect("callee");
        assert_eq!(tree.text(callee), Some("fetchUserData"));
        assert_eq!(tree.children(call, Role::Args).len(), 1);
    }

    #[test]
    fn parses_member_chain() {
        let tree = parse("fetchUserData(id).catch(onErr);").expect("parses");
        let kinds = kinds_under(&tree, tree.root());
        assert!(kinds.contains(&NodeKind::MemberExpr));
        // Outermost call wraps the member expression.
        let stmt = tree.child(tree.root(), Role::Body).expect("stmt");
        let outer = tree.child(stmt, Role::Expr).expect("outer call");
        assert_eq!(tree.kind(outer), NodeKind::CallExpr);
        let member = tree.child(outer, Role::Callee).expect("member");
        assert_eq!(tree.kind(member), NodeKind::MemberExpr);
        let prop = tree.child(member, Role::Property).expect("prop");
        assert_eq!(tree.text(prop), Some("catch"));
    }

    #[test]
    fn parses_arrow_argument() {
        let tree =
            parse("app.post('/api/users', (req, res) => { res.send('ok'); });").expect("parses");
        let kinds = kinds_under(&tree, tree.root());
        assert!(kinds.contains(&NodeKind::ArrowFunction));
        assert!(kinds.contains(&NodeKind::StringLit));
    }

    #[test]
    fn parses_template_with_holes() {
        let source = "db.query(`SELECT * FROM t WHERE id = ${userId}`);";
        let tree = parse(source).expect("parses");
        let kinds = kinds_under(&tree, tree.root());
        assert!(kinds.contains(&NodeKind::TemplateLit));
        assert!(kinds.contains(&NodeKind::TemplateChunk));

        // The hole parses to an identifier whose snippet matches the source.
        fn find(tree: &SourceTree, node: NodeId, kind: NodeKind, out: &mut Vec<NodeId>) {
            if tree.kind(node) == kind {
                out.push(node);
            }
            for child in tree.children_in_order(node) {
                find(tree, *child, kind, out);
            }
        }
        let mut templates = Vec::new();
        find(&tree, tree.root(), NodeKind::TemplateLit, &mut templates);
        let parts = tree.children(templates[0], Role::Parts);
        assert_eq!(parts.len(), 2);
        let hole = parts
            .iter()
            .find(|p| tree.kind(**p) == NodeKind::Identifier)
            .expect("hole expression");
        assert_eq!(tree.snippet(tree.span(*hole)), "userId");
    }

    #[test]
    fn parses_async_function_with_await_and_try() {
        let source = "async function load() { try { await fetchUser(1); } catch (e) { log(e); } }";
        let tree = parse(source).expect("parses");
        let kinds = kinds_under(&tree, tree.root());
        assert!(kinds.contains(&NodeKind::AwaitExpr));
        assert!(kinds.contains(&NodeKind::TryStmt));
        assert!(kinds.contains(&NodeKind::CatchClause));
        let decl = tree.child(tree.root(), Role::Body).expect("fn");
        assert!(tree.is_async_fn(decl));
    }

    #[test]
    fn parses_var_declarations() {
        let tree = parse("var a = 1, b; let c = 'x';").expect("parses");
        let stmts = tree.children(tree.root(), Role::Body);
        assert_eq!(stmts.len(), 2);
        assert_eq!(tree.text(stmts[0]), Some("var"));
        assert_eq!(tree.children(stmts[0], Role::Declarations).len(), 2);
        assert_eq!(tree.text(stmts[1]), Some("let"));
        // Keyword occupies the start of the declaration span.
        let span = tree.span(stmts[0]);
        assert_eq!(&tree.source()[span.start..span.start + 3], "var");
    }

    #[test]
    fn parses_concatenation_and_void() {
        let tree = parse("run('a' + name + 'b'); void ping();").expect("parses");
        let kinds = kinds_under(&tree, tree.root());
        assert!(kinds.contains(&NodeKind::BinaryExpr));
        assert!(kinds.contains(&NodeKind::VoidExpr));
    }

    #[test]
    fn rejects_unsupported_syntax() {
        assert!(parse("a ?? b").is_err());
        assert!(parse("`unterminated").is_err());
        assert!(parse("'unterminated").is_err());
        assert!(parse("run(`${broken`);").is_err());
    }
}
