use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::tokenizer::{tokenize, SpannedToken, Token};

/// Deepest block or expression nesting accepted unless configured otherwise
pub const DEFAULT_MAX_NESTING: usize = 1000;

/// Recursive-descent parser for `.kry` sources
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    /// Absolute offset of `source`; non-zero for interpolation sub-parsers
    base: usize,
    /// Open blocks
    depth: usize,
    /// Open sub-expressions, counted apart from blocks
    expr_depth: usize,
    max_depth: usize,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> ParseResult<Self> {
        Self::with_offset(source, 0)
    }

    fn with_offset(source: &'src str, base: usize) -> ParseResult<Self> {
        let tokens = tokenize(source)
            .map_err(|range| ParseError::lexer_error(Span::new(range.start + base, range.end + base)))?
            .into_iter()
            .map(|(token, range)| (token, range.start + base..range.end + base))
            .collect();
        Ok(Self {
            source,
            tokens,
            pos: 0,
            base,
            depth: 0,
            expr_depth: 0,
            max_depth: DEFAULT_MAX_NESTING,
        })
    }

    /// Cap on nested blocks and sub-expressions. Deeper input fails with
    /// [`ParseError::NestingTooDeep`] instead of exhausting the stack.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn check_nesting(&self, depth: usize) -> ParseResult<()> {
        if depth > self.max_depth {
            return Err(ParseError::nesting_too_deep(self.peek_span(), depth, self.max_depth));
        }
        Ok(())
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();

        while !self.is_at_end() {
            match self.peek() {
                Some((Token::Const, _)) => doc.consts.push(self.parse_const()?),
                Some((Token::Component, _)) => doc.components.push(self.parse_component()?),
                Some((Token::Ident(_), _)) => doc.roots.push(self.parse_element()?),
                Some((Token::Semicolon, _)) => {
                    self.advance();
                }
                _ => {
                    return Err(ParseError::invalid_syntax(
                        self.peek_span(),
                        format!(
                            "Expected 'const', 'component' or an element, found {}",
                            Self::format_token(self.peek())
                        ),
                    ));
                }
            }
        }

        Ok(doc)
    }

    fn parse_const(&mut self) -> ParseResult<ConstDecl> {
        let start = self.peek_span().start;
        self.expect(Token::Const)?;
        let name = self.expect_ident()?;
        self.expect(Token::Equals)?;
        let value = self.parse_expression()?;
        Ok(ConstDecl {
            name,
            value,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_component(&mut self) -> ParseResult<ComponentDef> {
        let start = self.peek_span().start;
        self.expect(Token::Component)?;
        let name = self.expect_ident()?;

        let mut params = Vec::new();
        if self.match_token(Token::LParen) {
            while !self.check(Token::RParen) {
                let param_start = self.peek_span().start;
                let param_name = self.expect_ident()?;
                let default = if self.match_token(Token::Equals) {
                    Some(self.parse_expression()?)
                } else {
                    None
                };
                params.push(Param {
                    name: param_name,
                    default,
                    span: Span::new(param_start, self.current_end()),
                });
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }

        let extends = if self.match_token(Token::Extends) {
            Some(self.expect_ident()?)
        } else {
            None
        };

        let body = self.parse_block()?;
        Ok(ComponentDef {
            name,
            params,
            extends,
            body,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.check_nesting(self.depth + 1)?;
        self.depth += 1;
        let block = self.parse_block_items();
        self.depth -= 1;
        block
    }

    fn parse_block_items(&mut self) -> ParseResult<Block> {
        let start = self.peek_span().start;
        self.expect(Token::LBrace)?;
        let mut items = Vec::new();

        loop {
            match self.peek() {
                None => return Err(ParseError::unexpected_eof(self.peek_span(), "'}'")),
                Some((Token::RBrace, _)) => break,
                Some((Token::Semicolon, _)) => {
                    self.advance();
                }
                Some(_) => items.push(self.parse_item()?),
            }
        }

        self.expect(Token::RBrace)?;
        Ok(Block {
            items,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_item(&mut self) -> ParseResult<Item> {
        match self.peek() {
            Some((Token::State, _)) => Ok(Item::State(self.parse_state()?)),
            Some((Token::Static, _)) => {
                let start = self.peek_span().start;
                self.advance();
                match self.peek() {
                    Some((Token::If, _)) => Ok(Item::If(self.parse_if(true, start)?)),
                    Some((Token::For, _)) => Ok(Item::For(self.parse_for(true, start)?)),
                    _ => Err(ParseError::unexpected_token(
                        self.peek_span(),
                        "'if' or 'for' after 'static'",
                        Self::format_token(self.peek()),
                    )),
                }
            }
            Some((Token::If, span)) => {
                let start = span.start;
                Ok(Item::If(self.parse_if(false, start)?))
            }
            Some((Token::For, span)) => {
                let start = span.start;
                Ok(Item::For(self.parse_for(false, start)?))
            }
            Some((Token::Slot, _)) => Ok(Item::Slot(self.parse_slot()?)),
            Some((Token::Insert, _)) => Ok(Item::Insert(self.parse_insert()?)),
            Some((Token::At("breakpoint"), _)) => Ok(Item::Breakpoint(self.parse_breakpoint()?)),
            Some((Token::At(_), _)) => Ok(Item::Pseudo(self.parse_pseudo()?)),
            Some((Token::Ident(_), _)) => {
                if matches!(self.peek_ahead(1), Some((Token::Equals, _))) {
                    Ok(Item::Property(self.parse_property()?))
                } else {
                    Ok(Item::Element(self.parse_element()?))
                }
            }
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "property, element or directive",
                Self::format_token(self.peek()),
            )),
        }
    }

    fn parse_property(&mut self) -> ParseResult<Property> {
        let start = self.peek_span().start;
        let name = self.expect_ident()?;
        self.expect(Token::Equals)?;
        let value = self.parse_expression()?;
        Ok(Property {
            name,
            value,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_state(&mut self) -> ParseResult<StateDecl> {
        let start = self.peek_span().start;
        self.expect(Token::State)?;
        let name = self.expect_ident()?;
        let type_name = if self.match_token(Token::Colon) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        self.expect(Token::Equals)?;
        let value = self.parse_expression()?;
        Ok(StateDecl {
            name,
            type_name,
            value,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_element(&mut self) -> ParseResult<Element> {
        let start = self.peek_span().start;
        let name = self.expect_ident()?;

        let mut args = Vec::new();
        if self.match_token(Token::LParen) {
            while !self.check(Token::RParen) {
                args.push(self.parse_property()?);
                if !self.match_token(Token::Comma) {
                    break;
                }
            }
            self.expect(Token::RParen)?;
        }

        let body = if self.check(Token::LBrace) {
            self.parse_block()?
        } else {
            Block {
                items: Vec::new(),
                span: Span::new(self.current_end(), self.current_end()),
            }
        };

        Ok(Element {
            name,
            args,
            body,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_if(&mut self, is_static: bool, start: usize) -> ParseResult<IfBlock> {
        self.expect(Token::If)?;
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;
        let then_template = self.block_source(&then_block);

        let else_block = if self.match_token(Token::Else) {
            if self.check(Token::If) {
                let nested_start = self.peek_span().start;
                let nested = self.parse_if(is_static, nested_start)?;
                let span = nested.span;
                Some(Block {
                    items: vec![Item::If(nested)],
                    span,
                })
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };

        let else_template = else_block.as_ref().map(|block| self.block_source(block));
        Ok(IfBlock {
            is_static,
            condition,
            then_block,
            else_block,
            then_template,
            else_template,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_for(&mut self, is_static: bool, start: usize) -> ParseResult<ForBlock> {
        self.expect(Token::For)?;
        let item = self.expect_ident()?;
        self.expect(Token::In)?;
        let collection = self.parse_expression()?;
        let body = self.parse_block()?;
        let template = self.block_source(&body);

        Ok(ForBlock {
            is_static,
            item,
            collection,
            body,
            template,
            span: Span::new(start, self.current_end()),
        })
    }

    /// `slot`, `slot { fallback }`, `slot name` or `slot name { fallback }`.
    /// Slot names start lowercase so a following element is never taken as a name.
    fn parse_slot(&mut self) -> ParseResult<SlotDecl> {
        let start = self.peek_span().start;
        self.expect(Token::Slot)?;

        let name = match self.peek() {
            Some((Token::Ident(name), _)) if name.starts_with(|c: char| c.is_ascii_lowercase()) => {
                let name = name.to_string();
                self.advance();
                Some(name)
            }
            _ => None,
        };

        let fallback = if self.check(Token::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(SlotDecl {
            name,
            fallback,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_insert(&mut self) -> ParseResult<Insert> {
        let start = self.peek_span().start;
        self.expect(Token::Insert)?;
        let slot = self.expect_ident()?;
        let body = self.parse_block()?;
        Ok(Insert {
            slot,
            body,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_pseudo(&mut self) -> ParseResult<PseudoBlock> {
        let start = self.peek_span().start;
        let state = match self.advance() {
            Some((Token::At(state), _)) => state.to_string(),
            _ => return Err(ParseError::invalid_syntax(Span::new(start, start), "Expected '@state'")),
        };
        let properties = self.parse_property_block()?;
        Ok(PseudoBlock {
            state,
            properties,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_breakpoint(&mut self) -> ParseResult<BreakpointBlock> {
        let start = self.peek_span().start;
        self.advance(); // consume '@breakpoint'
        self.expect(Token::LParen)?;
        let min = self.parse_expression()?;
        self.expect(Token::Comma)?;
        let max = self.parse_expression()?;
        self.expect(Token::RParen)?;
        let properties = self.parse_property_block()?;
        Ok(BreakpointBlock {
            min,
            max,
            properties,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_property_block(&mut self) -> ParseResult<Vec<Property>> {
        self.expect(Token::LBrace)?;
        let mut properties = Vec::new();
        while !self.check(Token::RBrace) {
            if self.is_at_end() {
                return Err(ParseError::unexpected_eof(self.peek_span(), "'}'"));
            }
            if self.match_token(Token::Semicolon) {
                continue;
            }
            properties.push(self.parse_property()?);
        }
        self.expect(Token::RBrace)?;
        Ok(properties)
    }

    // Expressions, lowest precedence first

    pub fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.check_nesting(self.expr_depth + 1)?;
        self.expr_depth += 1;
        let expr = self.parse_or_expression();
        self.expr_depth -= 1;
        expr
    }

    fn parse_or_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_and_expression()?;
        while self.match_token(Token::Or) {
            let right = self.parse_and_expression()?;
            left = Self::binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_equality_expression()?;
        while self.match_token(Token::And) {
            let right = self.parse_equality_expression()?;
            left = Self::binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_comparison_expression()?;
        while let Some(op) = self.match_equality_op() {
            let right = self.parse_comparison_expression()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_additive_expression()?;
        while let Some(op) = self.match_comparison_op() {
            let right = self.parse_additive_expression()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_multiplicative_expression()?;
        while let Some(op) = self.match_additive_op() {
            let right = self.parse_multiplicative_expression()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative_expression(&mut self) -> ParseResult<Expression> {
        let mut left = self.parse_unary_expression()?;
        while let Some(op) = self.match_multiplicative_op() {
            let right = self.parse_unary_expression()?;
            left = Self::binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> ParseResult<Expression> {
        let start = self.peek_span().start;
        let operator = if self.match_token(Token::Bang) {
            UnaryOp::Not
        } else if self.match_token(Token::Minus) {
            UnaryOp::Negate
        } else {
            return self.parse_postfix_expression();
        };
        self.check_nesting(self.expr_depth + 1)?;
        self.expr_depth += 1;
        let operand = self.parse_unary_expression();
        self.expr_depth -= 1;
        let operand = operand?;
        Ok(Expression::Unary {
            operator,
            span: Span::new(start, operand.span().end),
            operand: Box::new(operand),
        })
    }

    fn parse_postfix_expression(&mut self) -> ParseResult<Expression> {
        let mut expr = self.parse_primary_expression()?;
        while self.match_token(Token::Dot) {
            let property = self.expect_ident()?;
            let span = Span::new(expr.span().start, self.current_end());
            expr = Expression::Member {
                object: Box::new(expr),
                property,
                span,
            };
        }
        Ok(expr)
    }

    fn parse_primary_expression(&mut self) -> ParseResult<Expression> {
        let (token, range) = match self.advance() {
            Some((token, range)) => (token.clone(), range.clone()),
            None => return Err(ParseError::unexpected_eof(self.peek_span(), "expression")),
        };
        let span = Span::new(range.start, range.end);

        match token {
            Token::Number(raw) => raw
                .parse::<f64>()
                .map(|value| Expression::Number { value, span })
                .map_err(|_| ParseError::invalid_syntax(span, format!("Invalid number '{}'", raw))),
            Token::Dimension(raw) => Self::parse_dimension(raw, span),
            Token::Color(hex) => Ok(Expression::Color {
                hex: hex.to_string(),
                span,
            }),
            Token::String(raw) => self.parse_template_string(raw, span),
            Token::True => Ok(Expression::Boolean { value: true, span }),
            Token::False => Ok(Expression::Boolean { value: false, span }),
            Token::Null => Ok(Expression::Null { span }),
            Token::LBracket => {
                let mut items = Vec::new();
                while !self.check(Token::RBracket) {
                    items.push(self.parse_expression()?);
                    if !self.match_token(Token::Comma) {
                        break;
                    }
                }
                self.expect(Token::RBracket)?;
                Ok(Expression::Array {
                    items,
                    span: Span::new(span.start, self.current_end()),
                })
            }
            Token::LParen => {
                let inner = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if self.check(Token::LParen) {
                    self.parse_function_call(name.to_string(), span.start)
                } else {
                    Ok(Expression::Variable {
                        name: name.to_string(),
                        span,
                    })
                }
            }
            other => Err(ParseError::unexpected_token(
                span,
                "expression",
                Self::format_token(Some(&(other, range))),
            )),
        }
    }

    fn parse_function_call(&mut self, function: String, start: usize) -> ParseResult<Expression> {
        self.expect(Token::LParen)?;
        let mut arguments = Vec::new();
        while !self.check(Token::RParen) {
            arguments.push(self.parse_expression()?);
            if !self.match_token(Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen)?;
        Ok(Expression::Call {
            function,
            arguments,
            span: Span::new(start, self.current_end()),
        })
    }

    fn parse_dimension(raw: &str, span: Span) -> ParseResult<Expression> {
        let (number, unit) = if let Some(n) = raw.strip_suffix("px") {
            (n, Unit::Px)
        } else if let Some(n) = raw.strip_suffix('%') {
            (n, Unit::Percent)
        } else if let Some(n) = raw.strip_suffix("fr") {
            (n, Unit::Fr)
        } else {
            return Err(ParseError::invalid_syntax(span, format!("Unknown unit in '{}'", raw)));
        };
        number
            .parse::<f64>()
            .map(|value| Expression::Dimension { value, unit, span })
            .map_err(|_| ParseError::invalid_syntax(span, format!("Invalid dimension '{}'", raw)))
    }

    /// Parse string contents, splitting `{expr}` interpolations into template parts
    fn parse_template_string(&mut self, raw: &'src str, span: Span) -> ParseResult<Expression> {
        let content_start = span.start + 1;
        let mut parts = Vec::new();
        let mut current = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((index, ch)) = chars.next() {
            match ch {
                '\\' => match chars.next() {
                    Some((_, 'n')) => current.push('\n'),
                    Some((_, 't')) => current.push('\t'),
                    Some((_, 'r')) => current.push('\r'),
                    Some((_, escaped)) => current.push(escaped),
                    None => current.push('\\'),
                },
                '{' => {
                    let mut depth = 1;
                    let mut close = None;
                    for (inner_index, inner) in chars.by_ref() {
                        match inner {
                            '{' => depth += 1,
                            '}' => {
                                depth -= 1;
                                if depth == 0 {
                                    close = Some(inner_index);
                                    break;
                                }
                            }
                            _ => {}
                        }
                    }
                    let close = close.ok_or_else(|| {
                        ParseError::invalid_syntax(
                            Span::new(content_start + index, span.end),
                            "Unclosed '{' in string interpolation",
                        )
                    })?;

                    if !current.is_empty() {
                        parts.push(TemplatePart::Literal(std::mem::take(&mut current)));
                    }
                    let inner = &raw[index + 1..close];
                    let mut sub_parser = Parser::with_offset(inner, content_start + index + 1)?
                        .with_max_depth(self.max_depth);
                    sub_parser.expr_depth = self.expr_depth;
                    let expr = sub_parser.parse_expression()?;
                    if !sub_parser.is_at_end() {
                        return Err(ParseError::unexpected_token(
                            sub_parser.peek_span(),
                            "'}'",
                            Self::format_token(sub_parser.peek()),
                        ));
                    }
                    parts.push(TemplatePart::Expression(expr));
                }
                other => current.push(other),
            }
        }

        if parts.is_empty() {
            return Ok(Expression::Literal { value: current, span });
        }
        if !current.is_empty() {
            parts.push(TemplatePart::Literal(current));
        }
        Ok(Expression::Template { parts, span })
    }

    fn binary(left: Expression, operator: BinaryOp, right: Expression) -> Expression {
        let span = left.span().to(right.span());
        Expression::Binary {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            span,
        }
    }

    // Helper methods for matching operators

    fn match_equality_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::EqualsEquals) {
            Some(BinaryOp::Equals)
        } else if self.match_token(Token::NotEquals) {
            Some(BinaryOp::NotEquals)
        } else {
            None
        }
    }

    fn match_comparison_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::LessThanOrEqual) {
            Some(BinaryOp::LessThanOrEqual)
        } else if self.match_token(Token::GreaterThanOrEqual) {
            Some(BinaryOp::GreaterThanOrEqual)
        } else if self.match_token(Token::LessThan) {
            Some(BinaryOp::LessThan)
        } else if self.match_token(Token::GreaterThan) {
            Some(BinaryOp::GreaterThan)
        } else {
            None
        }
    }

    fn match_additive_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Plus) {
            Some(BinaryOp::Add)
        } else if self.match_token(Token::Minus) {
            Some(BinaryOp::Subtract)
        } else {
            None
        }
    }

    fn match_multiplicative_op(&mut self) -> Option<BinaryOp> {
        if self.match_token(Token::Star) {
            Some(BinaryOp::Multiply)
        } else if self.match_token(Token::Slash) {
            Some(BinaryOp::Divide)
        } else {
            None
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&SpannedToken<'src>> {
        self.tokens.get(self.pos)
    }

    fn peek_ahead(&self, offset: usize) -> Option<&SpannedToken<'src>> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&SpannedToken<'src>> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn check(&self, token: Token) -> bool {
        if let Some((t, _)) = self.peek() {
            std::mem::discriminant(t) == std::mem::discriminant(&token)
        } else {
            false
        }
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        if self.check(token.clone()) {
            self.advance();
            Ok(())
        } else if self.is_at_end() {
            Err(ParseError::unexpected_eof(
                self.peek_span(),
                Self::format_expected_token(&token),
            ))
        } else {
            Err(ParseError::unexpected_token(
                self.peek_span(),
                Self::format_expected_token(&token),
                Self::format_token(self.peek()),
            ))
        }
    }

    fn expect_ident(&mut self) -> ParseResult<String> {
        match self.peek() {
            Some((Token::Ident(s), _)) => {
                let val = s.to_string();
                self.advance();
                Ok(val)
            }
            None => Err(ParseError::unexpected_eof(self.peek_span(), "identifier")),
            _ => Err(ParseError::unexpected_token(
                self.peek_span(),
                "identifier",
                Self::format_token(self.peek()),
            )),
        }
    }

    /// End of the token we just consumed
    fn current_end(&self) -> usize {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|(_, span)| span.end)
            .unwrap_or(self.base)
    }

    /// Span of the next token (the one we're about to consume)
    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| Span::new(span.start, span.end))
            .unwrap_or_else(|| {
                // If we're at EOF, use the end of the last token
                let end = self.tokens.last().map(|(_, span)| span.end).unwrap_or(self.base);
                Span::new(end, end)
            })
    }

    /// Trimmed source between a block's braces. An `else if` block has no braces of its own.
    fn block_source(&self, block: &Block) -> String {
        let text = self.slice(block.span.start, block.span.end);
        let inner = text
            .strip_prefix('{')
            .and_then(|t| t.strip_suffix('}'))
            .unwrap_or(text);
        inner.trim().to_string()
    }

    /// Source text between two absolute offsets
    fn slice(&self, start: usize, end: usize) -> &'src str {
        let start = start.saturating_sub(self.base).min(self.source.len());
        let end = end.saturating_sub(self.base).clamp(start, self.source.len());
        self.source.get(start..end).unwrap_or("")
    }

    /// Format a token for display in error messages
    fn format_token(token: Option<&SpannedToken>) -> String {
        match token {
            None => "end of file".to_string(),
            Some((Token::Ident(s), _)) => format!("identifier '{}'", s),
            Some((Token::String(s), _)) => format!("string \"{}\"", s),
            Some((Token::Number(n), _)) => format!("number {}", n),
            Some((Token::Dimension(d), _)) => format!("dimension {}", d),
            Some((Token::Color(c), _)) => format!("color #{}", c),
            Some((Token::At(a), _)) => format!("'@{}'", a),
            Some((token, _)) => Self::format_expected_token(token),
        }
    }

    fn format_expected_token(token: &Token) -> String {
        match token {
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Semicolon => "';'".to_string(),
            Token::Dot => "'.'".to_string(),
            Token::Component => "keyword 'component'".to_string(),
            Token::Extends => "keyword 'extends'".to_string(),
            Token::Const => "keyword 'const'".to_string(),
            Token::State => "keyword 'state'".to_string(),
            Token::Static => "keyword 'static'".to_string(),
            Token::If => "keyword 'if'".to_string(),
            Token::Else => "keyword 'else'".to_string(),
            Token::For => "keyword 'for'".to_string(),
            Token::In => "keyword 'in'".to_string(),
            Token::Slot => "keyword 'slot'".to_string(),
            Token::Insert => "keyword 'insert'".to_string(),
            token => format!("{:?}", token),
        }
    }
}

/// Parse a complete source file
pub fn parse(source: &str) -> ParseResult<Document> {
    let mut parser = Parser::new(source)?;
    parser.parse_document()
}

/// Parse a standalone expression, e.g. a `--define` value
pub fn parse_expression(source: &str) -> ParseResult<Expression> {
    let mut parser = Parser::new(source)?;
    let expr = parser.parse_expression()?;
    if !parser.is_at_end() {
        return Err(ParseError::unexpected_token(
            parser.peek_span(),
            "end of expression",
            Parser::format_token(parser.peek()),
        ));
    }
    Ok(expr)
}
