//! Recursive descent parser implementation
//!
//! Errors inside a statement are recorded and the parser resynchronizes at
//! the next statement boundary, so callers always get a full `Chunk` back.
//! Missing closers (`end`, `)`, `then`, ...) are reported without consuming
//! anything, which keeps half-typed code usable for autocomplete.

use luau_ast::*;
use luau_lexer::{Token, TokenKind};

use crate::ParseError;

/// Nesting allowed across statements, expressions and types
pub const MAX_RECURSION_DEPTH: usize = 100;

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<ParseError>,
    next_id: u32,
    /// Visible locals, innermost scope last
    scopes: Vec<Vec<(String, NodeId)>>,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        let mut parser = Self {
            source,
            tokens: Vec::with_capacity(tokens.len()),
            pos: 0,
            errors: Vec::new(),
            next_id: 0,
            scopes: vec![Vec::new()],
            depth: 0,
        };
        // Malformed strings stay in the stream and are reported where they
        // are used; every other bad token is reported here and dropped.
        for token in tokens {
            if token.kind == TokenKind::Error && !parser.is_string_like(&token) {
                let text = token.text(source);
                parser.errors.push(if text.starts_with("--") {
                    ParseError::UnfinishedComment { span: token.span }
                } else {
                    ParseError::UnexpectedSymbol {
                        text: text.to_string(),
                        span: token.span,
                    }
                });
                continue;
            }
            parser.tokens.push(token);
        }
        if parser.tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let end = source.len();
            parser.tokens.push(Token {
                kind: TokenKind::Eof,
                span: Span::new(end, end),
            });
        }
        parser
    }

    /// Errors collected so far
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    // === Utilities ===

    fn current(&self) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[self.pos.min(last)]
    }

    fn peek(&self) -> TokenKind {
        self.current().kind
    }

    fn peek_ahead(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = *self.current();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek() == kind
    }

    fn at_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.peek())
    }

    fn at_name(&self, name: &str) -> bool {
        self.at(TokenKind::Name) && self.current().text(self.source) == name
    }

    fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the last consumed token
    fn prev_span(&self) -> Span {
        match self.pos {
            0 => Span::at(self.current().span.start),
            pos => self.tokens[pos - 1].span,
        }
    }

    fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }

    fn found(&self) -> String {
        let token = self.current();
        match token.kind {
            TokenKind::Name | TokenKind::Number => format!("'{}'", token.text(self.source)),
            kind => kind.describe().to_string(),
        }
    }

    fn line_of(&self, offset: usize) -> usize {
        self.source[..offset.min(self.source.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }

    /// Whether the current token is the first on its line
    fn starts_line(&self) -> bool {
        let start = self.span().start;
        let prev_end = match self.pos {
            0 => 0,
            pos => self.tokens[pos - 1].span.end,
        };
        self.source[prev_end..start].contains('\n')
    }

    fn is_string_like(&self, token: &Token) -> bool {
        matches!(
            token.text(self.source).as_bytes().first(),
            Some(b'"' | b'\'' | b'`' | b'[')
        )
    }

    fn consume(&mut self, kind: TokenKind, context: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(
                kind.describe(),
                context,
                self.found(),
                self.span(),
            ))
        }
    }

    /// Consume `kind` or record an error without moving
    fn expect_soft(&mut self, kind: TokenKind, context: &'static str) {
        if self.at(kind) {
            self.advance();
        } else {
            let err = ParseError::expected(kind.describe(), context, self.found(), self.span());
            self.errors.push(err);
        }
    }

    /// Consume the closer of a construct opened at `opener_span`
    fn expect_match(&mut self, kind: TokenKind, opener: TokenKind, opener_span: Span) {
        if self.at(kind) {
            self.advance();
        } else {
            let err = ParseError::Unclosed {
                expected: kind.describe().to_string(),
                opener: opener.describe().to_string(),
                line: self.line_of(opener_span.start),
                found: self.found(),
                span: self.span(),
            };
            self.errors.push(err);
        }
    }

    fn expect_name(&mut self, context: &'static str) -> Result<(String, Span), ParseError> {
        let token = self.consume(TokenKind::Name, context).map_err(|err| match err {
            ParseError::Expected { context, found, span, .. } => ParseError::Expected {
                expected: "identifier".to_string(),
                context,
                found,
                span,
            },
            other => other,
        })?;
        Ok((self.text(&token).to_string(), token.span))
    }

    /// Run a recursive production one level deeper, failing past the limit
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T, ParseError>) -> Result<T, ParseError> {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(ParseError::RecursionLimit { span: self.span() });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Left-nested chains (`a.b.c`, `a + b + c`) deepen the tree without
    /// recursing here; `links` counts the wrapped levels
    fn check_chain(&self, links: usize) -> Result<(), ParseError> {
        if self.depth + links > MAX_RECURSION_DEPTH {
            return Err(ParseError::RecursionLimit { span: self.span() });
        }
        Ok(())
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.next_id(),
            kind,
            span,
        }
    }

    fn error_expr(&mut self, span: Span) -> Expr {
        self.mk_expr(ExprKind::Error, span)
    }

    // === Scopes ===

    fn enter_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    fn binding(&mut self, name: String, annotation: Option<TypeExpr>, span: Span) -> Binding {
        Binding {
            id: self.next_id(),
            name,
            annotation,
            span,
        }
    }

    fn declare(&mut self, binding: &Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((binding.name.clone(), binding.id));
        }
    }

    fn lookup(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|(local, _)| local == name)
            .map(|(_, id)| *id)
    }

    fn name_expr(&mut self, name: String, span: Span) -> Expr {
        let kind = match self.lookup(&name) {
            Some(binding) => ExprKind::Local { name, binding },
            None => ExprKind::Global(name),
        };
        self.mk_expr(kind, span)
    }

    // === Chunk ===

    pub fn parse_chunk(&mut self) -> Chunk {
        let start = self.span();
        let mut stats = Vec::new();

        loop {
            let block = self.parse_block_no_scope();
            stats.extend(block.stats);
            if self.at(TokenKind::Eof) {
                break;
            }
            let err = ParseError::unexpected("<eof>", self.found(), self.span());
            self.errors.push(err);
            self.advance();
        }

        let span = Span::new(start.start.min(self.source.len()), self.source.len());
        Chunk {
            block: Block { stats, span },
            hot_comments: Vec::new(),
            node_count: self.next_id,
            span,
        }
    }

    // === Blocks ===

    fn parse_block(&mut self) -> Block {
        self.enter_scope();
        let block = self.parse_block_no_scope();
        self.exit_scope();
        block
    }

    fn parse_block_no_scope(&mut self) -> Block {
        let start = self.span();
        let mut stats = Vec::new();

        while !self.peek().is_block_end() {
            if self.at(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let before = self.pos;
            match self.parse_statement() {
                Ok(stat) => stats.push(stat),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize(before);
                }
            }
        }

        let end = if stats.is_empty() { start } else { self.prev_span() };
        Block {
            stats,
            span: Span::new(start.start, end.end.max(start.start)),
        }
    }

    /// Skip to something that can start a statement or end the block
    fn synchronize(&mut self, start_pos: usize) {
        if self.pos == start_pos {
            self.advance();
        }
        while !self.peek().is_block_end() {
            match self.peek() {
                TokenKind::Local
                | TokenKind::Function
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Repeat
                | TokenKind::Return
                | TokenKind::Do
                | TokenKind::Break
                | TokenKind::Semicolon => return,
                TokenKind::Name if self.starts_line() => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // === Statements ===

    fn parse_statement(&mut self) -> Result<Stat, ParseError> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> Result<Stat, ParseError> {
        let start = self.span();

        let kind = match self.peek() {
            TokenKind::If => self.parse_if()?,
            TokenKind::While => self.parse_while()?,
            TokenKind::Do => {
                self.advance();
                let body = self.parse_block();
                self.expect_match(TokenKind::End, TokenKind::Do, start);
                StatKind::Do(body)
            }
            TokenKind::For => self.parse_for()?,
            TokenKind::Repeat => self.parse_repeat()?,
            TokenKind::Function => self.parse_function_stat()?,
            TokenKind::Local => self.parse_local()?,
            TokenKind::Return => self.parse_return()?,
            TokenKind::Break => {
                self.advance();
                StatKind::Break
            }
            TokenKind::Name if self.at_name("continue") && self.is_keyword_use() => {
                self.advance();
                StatKind::Continue
            }
            TokenKind::Name
                if self.at_name("type") && self.peek_ahead(1) == TokenKind::Name =>
            {
                self.advance();
                self.parse_type_alias(false)?
            }
            TokenKind::Name
                if self.at_name("export")
                    && self.peek_ahead(1) == TokenKind::Name
                    && self.tokens[self.pos + 1].text(self.source) == "type" =>
            {
                self.advance();
                self.advance();
                self.parse_type_alias(true)?
            }
            _ => self.parse_expr_stat()?,
        };

        Ok(Stat {
            kind,
            span: start.merge(self.prev_span()),
        })
    }

    /// A contextual keyword is a keyword unless the name is used as a value
    fn is_keyword_use(&self) -> bool {
        !matches!(
            self.peek_ahead(1),
            TokenKind::Dot
                | TokenKind::Colon
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::String
                | TokenKind::Eq
                | TokenKind::Comma
                | TokenKind::PlusEq
                | TokenKind::MinusEq
                | TokenKind::StarEq
                | TokenKind::SlashEq
                | TokenKind::SlashSlashEq
                | TokenKind::PercentEq
                | TokenKind::CaretEq
                | TokenKind::DotDotEq
        )
    }

    fn parse_if(&mut self) -> Result<StatKind, ParseError> {
        let start = self.advance().span;
        let mut clauses = Vec::new();

        let condition = self.parse_expr()?;
        self.expect_soft(TokenKind::Then, "if statement");
        let body = self.parse_block();
        clauses.push((condition, body));

        while self.at(TokenKind::ElseIf) {
            self.advance();
            let condition = self.parse_expr()?;
            self.expect_soft(TokenKind::Then, "if statement");
            let body = self.parse_block();
            clauses.push((condition, body));
        }

        let else_block = if self.at(TokenKind::Else) {
            self.advance();
            Some(self.parse_block())
        } else {
            None
        };

        self.expect_match(TokenKind::End, TokenKind::If, start);
        Ok(StatKind::If { clauses, else_block })
    }

    fn parse_while(&mut self) -> Result<StatKind, ParseError> {
        let start = self.advance().span;
        let condition = self.parse_expr()?;
        self.expect_soft(TokenKind::Do, "while loop");
        let body = self.parse_block();
        self.expect_match(TokenKind::End, TokenKind::While, start);
        Ok(StatKind::While { condition, body })
    }

    fn parse_repeat(&mut self) -> Result<StatKind, ParseError> {
        let start = self.advance().span;
        // the condition can see locals declared in the body
        self.enter_scope();
        let body = self.parse_block_no_scope();
        self.expect_match(TokenKind::Until, TokenKind::Repeat, start);
        let condition = self.parse_expr();
        self.exit_scope();
        Ok(StatKind::Repeat {
            body,
            condition: condition?,
        })
    }

    fn parse_for(&mut self) -> Result<StatKind, ParseError> {
        let start = self.advance().span;
        let (name, name_span) = self.expect_name("for loop")?;
        let annotation = self.parse_optional_annotation()?;

        if self.at(TokenKind::Eq) {
            self.advance();
            let from = self.parse_expr()?;
            self.consume(TokenKind::Comma, "numeric for loop")?;
            let to = self.parse_expr()?;
            let step = if self.at(TokenKind::Comma) {
                self.advance();
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect_soft(TokenKind::Do, "for loop");

            self.enter_scope();
            let var = self.binding(name, annotation, name_span);
            self.declare(&var);
            let body = self.parse_block_no_scope();
            self.exit_scope();
            self.expect_match(TokenKind::End, TokenKind::For, start);

            return Ok(StatKind::NumericFor {
                var,
                start: from,
                end: to,
                step,
                body,
            });
        }

        let mut vars = vec![self.binding(name, annotation, name_span)];
        while self.at(TokenKind::Comma) {
            self.advance();
            let (name, span) = self.expect_name("for loop")?;
            let annotation = self.parse_optional_annotation()?;
            vars.push(self.binding(name, annotation, span));
        }
        self.consume(TokenKind::In, "for loop")?;
        let values = self.parse_expr_list()?;
        self.expect_soft(TokenKind::Do, "for loop");

        self.enter_scope();
        for var in &vars {
            self.declare(var);
        }
        let body = self.parse_block_no_scope();
        self.exit_scope();
        self.expect_match(TokenKind::End, TokenKind::For, start);

        Ok(StatKind::GenericFor { vars, values, body })
    }

    fn parse_function_stat(&mut self) -> Result<StatKind, ParseError> {
        let start = self.advance().span;
        let (name, name_span) = self.expect_name("function name")?;
        let mut debug_name = name.clone();
        let mut target = self.name_expr(name, name_span);
        let mut is_method = false;

        while self.at_any(&[TokenKind::Dot, TokenKind::Colon]) {
            is_method = self.advance().kind == TokenKind::Colon;
            let (field, field_span) = self.expect_name("function name")?;
            debug_name.push(if is_method { ':' } else { '.' });
            debug_name.push_str(&field);
            let span = target.span.merge(field_span);
            target = self.mk_expr(
                ExprKind::IndexName {
                    object: Box::new(target),
                    name: field,
                    name_span: field_span,
                    is_method,
                },
                span,
            );
            if is_method {
                break;
            }
        }

        let func = self.parse_function_body(start, Some(debug_name), is_method)?;
        Ok(StatKind::Function { target, func })
    }

    fn parse_local(&mut self) -> Result<StatKind, ParseError> {
        self.advance();

        if self.at(TokenKind::Function) {
            let start = self.advance().span;
            let (name, span) = self.expect_name("variable name")?;
            let binding = self.binding(name.clone(), None, span);
            self.declare(&binding);
            let func = self.parse_function_body(start, Some(name), false)?;
            return Ok(StatKind::LocalFunction { binding, func });
        }

        let mut bindings = Vec::new();
        loop {
            let (name, span) = self.expect_name("variable name")?;
            let annotation = self.parse_optional_annotation()?;
            bindings.push(self.binding(name, annotation, span));
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        let values = if self.at(TokenKind::Eq) {
            self.advance();
            self.parse_expr_list()?
        } else {
            Vec::new()
        };

        for binding in &bindings {
            self.declare(binding);
        }
        Ok(StatKind::Local { bindings, values })
    }

    fn parse_return(&mut self) -> Result<StatKind, ParseError> {
        self.advance();
        let values = if self.peek().is_block_end() || self.at(TokenKind::Semicolon) {
            Vec::new()
        } else {
            self.parse_expr_list()?
        };
        Ok(StatKind::Return(values))
    }

    fn parse_type_alias(&mut self, exported: bool) -> Result<StatKind, ParseError> {
        let (name, name_span) = self.expect_name("type alias")?;
        let generics = if self.at(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };
        self.consume(TokenKind::Eq, "type alias")?;
        let ty = self.parse_type()?;
        Ok(StatKind::TypeAlias {
            name,
            name_span,
            generics,
            ty,
            exported,
        })
    }

    fn parse_expr_stat(&mut self) -> Result<StatKind, ParseError> {
        let errors_before = self.errors.len();
        let expr = self.parse_suffixed_expr()?;

        if self.at_any(&[TokenKind::Eq, TokenKind::Comma]) {
            let mut targets = vec![expr];
            while self.at(TokenKind::Comma) {
                self.advance();
                targets.push(self.parse_suffixed_expr()?);
            }
            self.consume(TokenKind::Eq, "assignment")?;
            let values = self.parse_expr_list()?;
            for target in &targets {
                self.check_assignable(target);
            }
            return Ok(StatKind::Assign { targets, values });
        }

        if let Some(op) = compound_op(self.peek()) {
            self.advance();
            let value = self.parse_expr()?;
            self.check_assignable(&expr);
            return Ok(StatKind::CompoundAssign {
                op,
                target: expr,
                value,
            });
        }

        if matches!(expr.kind, ExprKind::Call { .. }) {
            return Ok(StatKind::Call(expr));
        }

        if self.errors.len() == errors_before {
            self.errors
                .push(ParseError::IncompleteStatement { span: expr.span });
        }
        Ok(StatKind::Error { exprs: vec![expr] })
    }

    fn check_assignable(&mut self, target: &Expr) {
        if !matches!(
            target.kind,
            ExprKind::Local { .. }
                | ExprKind::Global(_)
                | ExprKind::IndexName { .. }
                | ExprKind::IndexExpr { .. }
                | ExprKind::Error
        ) {
            self.errors
                .push(ParseError::NotAssignable { span: target.span });
        }
    }

    // === Functions ===

    fn parse_function_body(
        &mut self,
        start: Span,
        debug_name: Option<String>,
        is_method: bool,
    ) -> Result<FunctionBody, ParseError> {
        let generics = if self.at(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        let open = self.consume(TokenKind::LParen, "function")?.span;
        self.enter_scope();

        let self_binding = if is_method {
            let binding = self.binding("self".to_string(), None, Span::at(open.start));
            self.declare(&binding);
            Some(binding)
        } else {
            None
        };

        let mut params = Vec::new();
        let mut vararg = None;
        let signature = self.parse_param_list(&mut params, &mut vararg);
        if let Err(err) = signature {
            self.exit_scope();
            return Err(err);
        }
        self.expect_match(TokenKind::RParen, TokenKind::LParen, open);

        let return_annotation = if self.at(TokenKind::Colon) {
            self.advance();
            match self.parse_return_pack() {
                Ok(pack) => Some(pack),
                Err(err) => {
                    self.exit_scope();
                    return Err(err);
                }
            }
        } else {
            None
        };

        for param in &params {
            self.declare(param);
        }
        let body = self.parse_block_no_scope();
        self.exit_scope();
        self.expect_match(TokenKind::End, TokenKind::Function, start);

        Ok(FunctionBody {
            debug_name,
            generics,
            self_binding,
            params,
            vararg,
            return_annotation,
            body,
            span: start.merge(self.prev_span()),
        })
    }

    fn parse_param_list(
        &mut self,
        params: &mut Vec<Binding>,
        vararg: &mut Option<VarargParam>,
    ) -> Result<(), ParseError> {
        if self.at(TokenKind::RParen) {
            return Ok(());
        }
        loop {
            if self.at(TokenKind::Ellipsis) {
                let span = self.advance().span;
                let annotation = self.parse_optional_annotation()?;
                *vararg = Some(VarargParam { annotation, span });
                return Ok(());
            }
            let (name, span) = self.expect_name("function parameter")?;
            let annotation = self.parse_optional_annotation()?;
            params.push(self.binding(name, annotation, span));
            if !self.at(TokenKind::Comma) {
                return Ok(());
            }
            self.advance();
        }
    }

    fn parse_generic_params(&mut self) -> Result<Vec<GenericParam>, ParseError> {
        let open = self.consume(TokenKind::Lt, "generic type list")?.span;
        let mut generics = Vec::new();
        while !self.at_any(&[TokenKind::Gt, TokenKind::Eof]) {
            let (name, span) = self.expect_name("generic type list")?;
            let is_pack = if self.at(TokenKind::Ellipsis) {
                self.advance();
                true
            } else {
                false
            };
            // defaults are accepted and ignored
            if self.at(TokenKind::Eq) {
                self.advance();
                self.parse_type()?;
            }
            generics.push(GenericParam {
                name,
                is_pack,
                span,
            });
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }
        self.expect_match(TokenKind::Gt, TokenKind::Lt, open);
        Ok(generics)
    }

    fn parse_optional_annotation(&mut self) -> Result<Option<TypeExpr>, ParseError> {
        if self.at(TokenKind::Colon) {
            self.advance();
            Ok(Some(self.parse_type()?))
        } else {
            Ok(None)
        }
    }

    // === Expressions ===

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_subexpr(0)
    }

    fn parse_expr_list(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut exprs = vec![self.parse_expr()?];
        while self.at(TokenKind::Comma) {
            self.advance();
            exprs.push(self.parse_expr()?);
        }
        Ok(exprs)
    }

    fn parse_subexpr(&mut self, limit: u8) -> Result<Expr, ParseError> {
        self.nested(|p| p.parse_subexpr_inner(limit))
    }

    fn parse_subexpr_inner(&mut self, limit: u8) -> Result<Expr, ParseError> {
        let start = self.span();

        let mut left = if let Some(op) = unary_op(self.peek()) {
            self.advance();
            let operand = self.parse_subexpr(UnaryOp::PRIORITY)?;
            let span = start.merge(operand.span);
            self.mk_expr(
                ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            )
        } else {
            self.parse_simple_expr()?
        };

        let mut links = 0;
        while let Some(op) = binary_op(self.peek()) {
            let (left_priority, right_priority) = op.priority();
            if left_priority <= limit {
                break;
            }
            links += 1;
            self.check_chain(links)?;
            self.advance();
            let right = self.parse_subexpr(right_priority)?;
            let span = left.span.merge(right.span);
            left = self.mk_expr(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_simple_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();

        let expr = match self.peek() {
            TokenKind::Nil => {
                self.advance();
                self.mk_expr(ExprKind::Nil, start)
            }
            TokenKind::True | TokenKind::False => {
                let value = self.advance().kind == TokenKind::True;
                self.mk_expr(ExprKind::Bool(value), start)
            }
            TokenKind::Number => {
                let token = self.advance();
                let value = match parse_number(self.text(&token)) {
                    Some(value) => value,
                    None => {
                        self.errors.push(ParseError::MalformedNumber { span: token.span });
                        0.0
                    }
                };
                self.mk_expr(ExprKind::Number(value), start)
            }
            TokenKind::String => {
                let token = self.advance();
                let value = decode_string(self.text(&token));
                self.mk_expr(ExprKind::String(value), start)
            }
            TokenKind::Error => {
                let token = self.advance();
                self.errors.push(ParseError::MalformedString { span: token.span });
                self.error_expr(token.span)
            }
            TokenKind::Ellipsis => {
                self.advance();
                self.mk_expr(ExprKind::Varargs, start)
            }
            TokenKind::LBrace => self.parse_table()?,
            TokenKind::Function => {
                let token = self.advance();
                let func = self.parse_function_body(token.span, None, false)?;
                let span = func.span;
                self.mk_expr(ExprKind::Function(Box::new(func)), span)
            }
            TokenKind::If => self.parse_if_expr()?,
            _ => self.parse_suffixed_expr()?,
        };

        if self.at(TokenKind::ColonColon) {
            self.advance();
            let ty = self.parse_type()?;
            let span = expr.span.merge(ty.span);
            return Ok(self.mk_expr(
                ExprKind::TypeAssertion {
                    expr: Box::new(expr),
                    ty,
                },
                span,
            ));
        }

        Ok(expr)
    }

    fn parse_if_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.advance().span;
        let condition = self.parse_expr()?;
        self.consume(TokenKind::Then, "if-then-else expression")?;
        let then_expr = self.parse_expr()?;

        let else_expr = if self.at(TokenKind::ElseIf) {
            self.parse_if_expr()?
        } else {
            self.consume(TokenKind::Else, "if-then-else expression")?;
            self.parse_expr()?
        };

        let span = start.merge(else_expr.span);
        Ok(self.mk_expr(
            ExprKind::IfElse {
                condition: Box::new(condition),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
            },
            span,
        ))
    }

    fn parse_primary_expr(&mut self) -> Result<Expr, ParseError> {
        match self.peek() {
            TokenKind::Name => {
                let token = self.advance();
                let name = self.text(&token).to_string();
                Ok(self.name_expr(name, token.span))
            }
            TokenKind::LParen => {
                let open = self.advance().span;
                let inner = self.parse_expr()?;
                self.expect_match(TokenKind::RParen, TokenKind::LParen, open);
                let span = open.merge(self.prev_span());
                Ok(self.mk_expr(ExprKind::Group(Box::new(inner)), span))
            }
            _ => Err(ParseError::expected(
                "identifier",
                "expression",
                self.found(),
                self.span(),
            )),
        }
    }

    fn parse_suffixed_expr(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary_expr()?;

        let mut links = 0;
        loop {
            if matches!(
                self.peek(),
                TokenKind::Dot
                    | TokenKind::Colon
                    | TokenKind::LBracket
                    | TokenKind::LParen
                    | TokenKind::String
                    | TokenKind::LBrace
            ) {
                links += 1;
                self.check_chain(links)?;
            }
            match self.peek() {
                TokenKind::Dot | TokenKind::Colon => {
                    let is_method = self.peek() == TokenKind::Colon;
                    let punct = self.advance().span;
                    let (name, name_span, complete) = if self.at(TokenKind::Name) {
                        let token = self.advance();
                        (self.text(&token).to_string(), token.span, true)
                    } else {
                        let err = ParseError::expected(
                            "identifier",
                            if is_method { "method name" } else { "member access" },
                            self.found(),
                            self.span(),
                        );
                        self.errors.push(err);
                        (String::new(), Span::at(punct.end), false)
                    };
                    let span = expr.span.merge(punct).merge(name_span);
                    expr = self.mk_expr(
                        ExprKind::IndexName {
                            object: Box::new(expr),
                            name,
                            name_span,
                            is_method,
                        },
                        span,
                    );
                    if !complete {
                        return Ok(expr);
                    }
                    if is_method {
                        if !self.at_any(&[TokenKind::LParen, TokenKind::String, TokenKind::LBrace]) {
                            let err = ParseError::expected(
                                "'(', '{' or <string>",
                                "method call",
                                self.found(),
                                self.span(),
                            );
                            self.errors.push(err);
                            return Ok(expr);
                        }
                        expr = self.parse_call(expr)?;
                    }
                }
                TokenKind::LBracket => {
                    let open = self.advance().span;
                    let index = self.parse_expr()?;
                    self.expect_match(TokenKind::RBracket, TokenKind::LBracket, open);
                    let span = expr.span.merge(self.prev_span());
                    expr = self.mk_expr(
                        ExprKind::IndexExpr {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    );
                }
                TokenKind::LParen | TokenKind::String | TokenKind::LBrace => {
                    expr = self.parse_call(expr)?;
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_call(&mut self, func: Expr) -> Result<Expr, ParseError> {
        let start = self.span();
        let args = match self.peek() {
            TokenKind::LParen => {
                let open = self.advance().span;
                let args = if self.at(TokenKind::RParen) {
                    Vec::new()
                } else {
                    self.parse_expr_list()?
                };
                self.expect_match(TokenKind::RParen, TokenKind::LParen, open);
                args
            }
            TokenKind::String => {
                let token = self.advance();
                let value = decode_string(self.text(&token));
                vec![self.mk_expr(ExprKind::String(value), token.span)]
            }
            _ => vec![self.parse_table()?],
        };
        let args_span = start.merge(self.prev_span());
        let span = func.span.merge(args_span);
        Ok(self.mk_expr(
            ExprKind::Call {
                func: Box::new(func),
                args,
                args_span,
            },
            span,
        ))
    }

    fn parse_table(&mut self) -> Result<Expr, ParseError> {
        let open = self.consume(TokenKind::LBrace, "table constructor")?.span;
        let mut items = Vec::new();

        while !self.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
            if self.at(TokenKind::LBracket) {
                let bracket = self.advance().span;
                let key = self.parse_expr()?;
                self.expect_match(TokenKind::RBracket, TokenKind::LBracket, bracket);
                self.consume(TokenKind::Eq, "table field")?;
                let value = self.parse_expr()?;
                items.push(TableItem::Keyed { key, value });
            } else if self.at(TokenKind::Name) && self.peek_ahead(1) == TokenKind::Eq {
                let token = self.advance();
                self.advance();
                let value = self.parse_expr()?;
                items.push(TableItem::Named {
                    name: self.text(&token).to_string(),
                    name_span: token.span,
                    value,
                });
            } else {
                items.push(TableItem::Positional(self.parse_expr()?));
            }

            if self.at_any(&[TokenKind::Comma, TokenKind::Semicolon]) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_match(TokenKind::RBrace, TokenKind::LBrace, open);
        let span = open.merge(self.prev_span());
        Ok(self.mk_expr(ExprKind::Table(items), span))
    }

    // === Types ===

    pub fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        // leading separators are allowed: `type T = | A | B`
        if self.at_any(&[TokenKind::Pipe, TokenKind::Amp]) {
            self.advance();
        }
        let first = self.parse_simple_type()?;
        self.parse_type_suffix(first)
    }

    fn parse_type_suffix(&mut self, first: TypeExpr) -> Result<TypeExpr, ParseError> {
        let first = self.parse_optional_suffix(first);
        let start = first.span;

        match self.peek() {
            TokenKind::Pipe => {
                let mut parts = vec![first];
                while self.at(TokenKind::Pipe) {
                    self.advance();
                    let part = self.parse_simple_type()?;
                    parts.push(self.parse_optional_suffix(part));
                }
                let span = start.merge(self.prev_span());
                Ok(TypeExpr::new(TypeExprKind::Union(parts), span))
            }
            TokenKind::Amp => {
                let mut parts = vec![first];
                while self.at(TokenKind::Amp) {
                    self.advance();
                    let part = self.parse_simple_type()?;
                    parts.push(self.parse_optional_suffix(part));
                }
                let span = start.merge(self.prev_span());
                Ok(TypeExpr::new(TypeExprKind::Intersection(parts), span))
            }
            _ => Ok(first),
        }
    }

    fn parse_optional_suffix(&mut self, mut ty: TypeExpr) -> TypeExpr {
        while self.at(TokenKind::Question) {
            let span = ty.span.merge(self.advance().span);
            // `T??` is `T?`
            if matches!(ty.kind, TypeExprKind::Optional(_)) {
                ty.span = span;
            } else {
                ty = TypeExpr::new(TypeExprKind::Optional(Box::new(ty)), span);
            }
        }
        ty
    }

    fn parse_simple_type(&mut self) -> Result<TypeExpr, ParseError> {
        self.nested(Self::parse_simple_type_inner)
    }

    fn parse_simple_type_inner(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.span();

        match self.peek() {
            TokenKind::Nil => {
                self.advance();
                Ok(TypeExpr::new(TypeExprKind::Nil, start))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.advance().kind == TokenKind::True;
                Ok(TypeExpr::new(TypeExprKind::BoolSingleton(value), start))
            }
            TokenKind::String => {
                let token = self.advance();
                let value = decode_string(self.text(&token));
                Ok(TypeExpr::new(TypeExprKind::StringSingleton(value), start))
            }
            TokenKind::Name if self.at_name("typeof") && self.peek_ahead(1) == TokenKind::LParen => {
                self.advance();
                let open = self.advance().span;
                let expr = self.parse_expr()?;
                self.expect_match(TokenKind::RParen, TokenKind::LParen, open);
                Ok(TypeExpr::new(
                    TypeExprKind::Typeof(Box::new(expr)),
                    start.merge(self.prev_span()),
                ))
            }
            TokenKind::Name => self.parse_type_reference(),
            TokenKind::LBrace => self.parse_table_type(),
            TokenKind::LParen | TokenKind::Lt => self.parse_function_or_group_type(),
            _ => Err(ParseError::expected(
                "type",
                "type annotation",
                self.found(),
                self.span(),
            )),
        }
    }

    fn parse_type_reference(&mut self) -> Result<TypeExpr, ParseError> {
        let (first, start) = self.expect_name("type reference")?;
        let (prefix, name) = if self.at(TokenKind::Dot) {
            self.advance();
            let (name, _) = self.expect_name("type reference")?;
            (Some(first), name)
        } else {
            (None, first)
        };

        let mut params = Vec::new();
        if self.at(TokenKind::Lt) {
            let open = self.advance().span;
            while !self.at_any(&[TokenKind::Gt, TokenKind::Eof]) {
                if self.at(TokenKind::Ellipsis) {
                    self.advance();
                }
                params.push(self.parse_type()?);
                if !self.at(TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
            self.expect_match(TokenKind::Gt, TokenKind::Lt, open);
        }

        Ok(TypeExpr::new(
            TypeExprKind::Reference { prefix, name, params },
            start.merge(self.prev_span()),
        ))
    }

    fn parse_table_type(&mut self) -> Result<TypeExpr, ParseError> {
        let open = self.advance().span;
        let mut props = Vec::new();
        let mut indexer = None;

        while !self.at_any(&[TokenKind::RBrace, TokenKind::Eof]) {
            // access modifiers are accepted and ignored
            if (self.at_name("read") || self.at_name("write"))
                && self.peek_ahead(1) == TokenKind::Name
            {
                self.advance();
            }

            if self.at(TokenKind::LBracket) {
                let bracket = self.advance().span;
                let key = self.parse_type()?;
                self.expect_match(TokenKind::RBracket, TokenKind::LBracket, bracket);
                self.consume(TokenKind::Colon, "table type")?;
                let value = self.parse_type()?;
                indexer = Some(Box::new((key, value)));
            } else if self.at(TokenKind::Name) && self.peek_ahead(1) == TokenKind::Colon {
                let (name, span) = self.expect_name("table type")?;
                self.advance();
                let ty = self.parse_type()?;
                props.push(TableTypeProp { name, ty, span });
            } else if props.is_empty() && indexer.is_none() {
                // array shorthand `{ T }`
                let element = self.parse_type()?;
                let key = TypeExpr::new(
                    TypeExprKind::Reference {
                        prefix: None,
                        name: "number".to_string(),
                        params: Vec::new(),
                    },
                    element.span,
                );
                indexer = Some(Box::new((key, element)));
            } else {
                return Err(ParseError::expected(
                    "identifier",
                    "table type",
                    self.found(),
                    self.span(),
                ));
            }

            if self.at_any(&[TokenKind::Comma, TokenKind::Semicolon]) {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_match(TokenKind::RBrace, TokenKind::LBrace, open);
        Ok(TypeExpr::new(
            TypeExprKind::Table { props, indexer },
            open.merge(self.prev_span()),
        ))
    }

    /// `(A, B) -> R`, `<T>(T) -> T` or a parenthesized type
    fn parse_function_or_group_type(&mut self) -> Result<TypeExpr, ParseError> {
        let start = self.span();
        let generics = if self.at(TokenKind::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        let (params, variadic) = self.parse_type_params()?;

        if self.at(TokenKind::Arrow) {
            self.advance();
            let returns = self.parse_return_pack()?;
            return Ok(TypeExpr::new(
                TypeExprKind::Function {
                    generics,
                    params,
                    variadic: variadic.map(Box::new),
                    returns,
                },
                start.merge(self.prev_span()),
            ));
        }

        if generics.is_empty() && variadic.is_none() && params.len() == 1 && params[0].name.is_none() {
            let inner = params.into_iter().next().map(|p| p.ty);
            if let Some(inner) = inner {
                return Ok(TypeExpr::new(
                    TypeExprKind::Group(Box::new(inner)),
                    start.merge(self.prev_span()),
                ));
            }
        }

        Err(ParseError::expected(
            "'->'",
            "function type",
            self.found(),
            self.span(),
        ))
    }

    /// Parenthesized parameter list of a function type
    fn parse_type_params(
        &mut self,
    ) -> Result<(Vec<FunctionTypeParam>, Option<TypeExpr>), ParseError> {
        let open = self.consume(TokenKind::LParen, "function type")?.span;
        let mut params = Vec::new();
        let mut variadic = None;

        while !self.at_any(&[TokenKind::RParen, TokenKind::Eof]) {
            if self.at(TokenKind::Ellipsis) {
                self.advance();
                variadic = Some(self.parse_type()?);
                break;
            }
            let name = if self.at(TokenKind::Name) && self.peek_ahead(1) == TokenKind::Colon {
                let token = self.advance();
                self.advance();
                Some(self.text(&token).to_string())
            } else {
                None
            };
            let ty = self.parse_type()?;
            params.push(FunctionTypeParam { name, ty });
            if !self.at(TokenKind::Comma) {
                break;
            }
            self.advance();
        }

        self.expect_match(TokenKind::RParen, TokenKind::LParen, open);
        Ok((params, variadic))
    }

    /// Return annotation: a single type, `(A, B)`, `()` or `...T`
    pub fn parse_return_pack(&mut self) -> Result<TypePack, ParseError> {
        self.nested(Self::parse_return_pack_inner)
    }

    fn parse_return_pack_inner(&mut self) -> Result<TypePack, ParseError> {
        let start = self.span();

        if self.at(TokenKind::Ellipsis) {
            self.advance();
            let tail = self.parse_type()?;
            return Ok(TypePack {
                types: Vec::new(),
                variadic: Some(Box::new(tail)),
                span: start.merge(self.prev_span()),
            });
        }

        if !self.at(TokenKind::LParen) {
            let ty = self.parse_type()?;
            let span = ty.span;
            return Ok(TypePack {
                types: vec![ty],
                variadic: None,
                span,
            });
        }

        let (mut params, variadic) = self.parse_type_params()?;

        if self.at(TokenKind::Arrow) {
            self.advance();
            let returns = self.parse_return_pack()?;
            let ty = TypeExpr::new(
                TypeExprKind::Function {
                    generics: Vec::new(),
                    params,
                    variadic: variadic.map(Box::new),
                    returns,
                },
                start.merge(self.prev_span()),
            );
            return Ok(TypePack {
                span: ty.span,
                types: vec![ty],
                variadic: None,
            });
        }

        if self.at_any(&[TokenKind::Pipe, TokenKind::Amp, TokenKind::Question])
            && params.len() == 1
            && variadic.is_none()
        {
            if let Some(inner) = params.pop().map(|p| p.ty) {
                let group = TypeExpr::new(
                    TypeExprKind::Group(Box::new(inner)),
                    start.merge(self.prev_span()),
                );
                let ty = self.parse_type_suffix(group)?;
                return Ok(TypePack {
                    span: ty.span,
                    types: vec![ty],
                    variadic: None,
                });
            }
        }

        Ok(TypePack {
            types: params.into_iter().map(|p| p.ty).collect(),
            variadic: variadic.map(Box::new),
            span: start.merge(self.prev_span()),
        })
    }
}

fn unary_op(kind: TokenKind) -> Option<UnaryOp> {
    match kind {
        TokenKind::Minus => Some(UnaryOp::Neg),
        TokenKind::Not => Some(UnaryOp::Not),
        TokenKind::Hash => Some(UnaryOp::Len),
        _ => None,
    }
}

fn binary_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::SlashSlash => BinaryOp::FloorDiv,
        TokenKind::Percent => BinaryOp::Mod,
        TokenKind::Caret => BinaryOp::Pow,
        TokenKind::DotDot => BinaryOp::Concat,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::TildeEq => BinaryOp::Ne,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::Le => BinaryOp::Le,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::Ge => BinaryOp::Ge,
        TokenKind::And => BinaryOp::And,
        TokenKind::Or => BinaryOp::Or,
        _ => return None,
    })
}

fn compound_op(kind: TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::PlusEq => BinaryOp::Add,
        TokenKind::MinusEq => BinaryOp::Sub,
        TokenKind::StarEq => BinaryOp::Mul,
        TokenKind::SlashEq => BinaryOp::Div,
        TokenKind::SlashSlashEq => BinaryOp::FloorDiv,
        TokenKind::PercentEq => BinaryOp::Mod,
        TokenKind::CaretEq => BinaryOp::Pow,
        TokenKind::DotDotEq => BinaryOp::Concat,
        _ => return None,
    })
}

/// Numeric value of a number literal
pub fn parse_number(text: &str) -> Option<f64> {
    let digits: String = text.chars().filter(|&c| c != '_').collect();
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok().map(|v| v as f64)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok().map(|v| v as f64)
    } else {
        digits.parse::<f64>().ok()
    }
}

/// Decode a string literal token, including its delimiters
pub fn decode_string(text: &str) -> String {
    if let Some(level) = luau_lexer::long_bracket_level(text) {
        let delimiter = level + 2;
        if text.len() < delimiter * 2 {
            return String::new();
        }
        let body = &text[delimiter..text.len() - delimiter];
        let body = body.strip_prefix("\r\n").or_else(|| body.strip_prefix('\n')).unwrap_or(body);
        return body.to_string();
    }

    let inner = if text.len() >= 2 { &text[1..text.len() - 1] } else { "" };
    if text.starts_with('`') {
        return inner.to_string();
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\u{7}'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('z') => {
                while chars.peek().is_some_and(|c| c.is_whitespace()) {
                    chars.next();
                }
            }
            Some('x') => {
                let hex: String = (0..2).filter_map(|_| chars.next()).collect();
                if let Some(c) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(c);
                }
            }
            Some('u') => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    let hex: String = chars.by_ref().take_while(|&c| c != '}').collect();
                    if let Some(c) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        out.push(c);
                    }
                }
            }
            Some(d) if d.is_ascii_digit() => {
                let mut value = d.to_digit(10).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(10)) {
                        Some(digit) => {
                            value = value * 10 + digit;
                            chars.next();
                        }
                        None => break,
                    }
                }
                if let Some(c) = char::from_u32(value) {
                    out.push(c);
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
