//! Recursive-descent parser for the source language's statement and
//! expression grammar (§3a), building an [`rtlc_tree::Tree`] directly rather
//! than an intermediate AST. Exposes a single entry point, [`parse_source`].
//!
//! Grammar ambiguities that a single token of lookahead cannot resolve are
//! handled by scanning forward without consuming (see [`Parser::clause_has_semicolon`]),
//! never by backtracking: a production, once entered, always completes.

use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use rtlc_common::{CompileError, CompileResult, Position, Span};
use rtlc_tree::rules::*;
use rtlc_tree::{NodeId, Tree};

/// Binary operator precedence levels, lowest first. Each level is left
/// associative; `parse_binary` recurses into the next level for operands.
const PRECEDENCE: &[&[TokenKind]] = &[
    &[TokenKind::OrOr],
    &[TokenKind::AndAnd],
    &[TokenKind::Eq, TokenKind::Ne, TokenKind::Lt, TokenKind::Le, TokenKind::Gt, TokenKind::Ge],
    &[TokenKind::Plus, TokenKind::Minus, TokenKind::Pipe, TokenKind::Caret],
    &[TokenKind::Star, TokenKind::Slash, TokenKind::Percent, TokenKind::Shl, TokenKind::Shr, TokenKind::Amp],
];

pub fn parse_source(text: &str) -> CompileResult<Tree> {
    let tokens = Lexer::tokenize(text)?;
    Parser::new(text, tokens).parse_program()
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    tree: Tree,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self { source, tokens, pos: 0, tree: Tree::new() }
    }

    // -- token cursor -----------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn lookahead_kind(&self, n: usize) -> TokenKind {
        self.tokens.get(self.pos + n).map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> CompileResult<Token> {
        if self.peek_kind() == kind {
            Ok(self.advance())
        } else {
            let found = self.peek().clone();
            Err(CompileError::syntax(format!("expected `{kind}`, found `{}`", found.text), found.span))
        }
    }

    fn slice(&self, span: Span) -> String {
        self.source[span.start.offset as usize..span.end.offset as usize].to_string()
    }

    /// Scans forward from the current position (without consuming) looking
    /// for a top-level `;` before the `{` that opens the next block. Used to
    /// tell `if cond {` from `if init; cond {`, and the three-clause `for`
    /// from the single-expression and empty shapes.
    fn clause_has_semicolon(&self) -> bool {
        let mut depth: i32 = 0;
        let mut i = self.pos;
        loop {
            match self.tokens[i].kind {
                TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBracket => depth -= 1,
                TokenKind::LBrace if depth == 0 => return false,
                TokenKind::Semicolon if depth == 0 => return true,
                TokenKind::Eof => return false,
                _ => {}
            }
            i += 1;
        }
    }

    // -- top level ----------------------------------------------------------

    fn parse_program(&mut self) -> CompileResult<Tree> {
        let root = self.tree.root();
        while self.peek_kind() != TokenKind::Eof {
            self.parse_function_decl(root)?;
        }
        Ok(std::mem::take(&mut self.tree))
    }

    fn parse_function_decl(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let func = self.tree.alloc(FUNCTION_DECL, parent, Span::single(start), "");

        let kw = self.expect(TokenKind::Func)?;
        self.tree.alloc("func", func, kw.span, kw.text);

        let name = self.expect(TokenKind::Identifier)?;
        self.tree.alloc(IDENTIFIER, func, name.span, name.text);

        self.expect(TokenKind::LParen)?;
        if self.peek_kind() != TokenKind::RParen {
            self.parse_parameter_list(func)?;
        }
        self.expect(TokenKind::RParen)?;

        if self.peek_kind() != TokenKind::LBrace {
            self.parse_result(func)?;
        }

        let block = self.parse_block(func)?;
        let span = Span::new(start, self.tree.span(block).end);
        self.tree.finish(func, span, self.slice(span));
        Ok(func)
    }

    fn parse_parameter_list(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let list = self.tree.alloc(PARAMETER_LIST, parent, Span::single(start), "");
        loop {
            self.parse_parameter_decl(list)?;
            if self.peek_kind() == TokenKind::Comma {
                self.advance();
                continue;
            }
            break;
        }
        let end = self.tree.span(*self.tree.children(list).last().unwrap()).end;
        let span = Span::new(start, end);
        self.tree.finish(list, span, self.slice(span));
        Ok(list)
    }

    fn parse_parameter_decl(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let decl = self.tree.alloc(PARAMETER_DECL, parent, Span::single(start), "");
        self.parse_identifier_list(decl)?;
        let ty = self.parse_var_type(decl)?;
        let span = Span::new(start, self.tree.span(ty).end);
        self.tree.finish(decl, span, self.slice(span));
        Ok(decl)
    }

    /// `result := r_type | '(' r_type (',' r_type)* ')'`. A single result
    /// type, parenthesized or not, attaches directly under `result` with no
    /// intervening `parameterList`; only two or more results wrap one.
    fn parse_result(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let result = self.tree.alloc(RESULT, parent, Span::single(start), "");

        if self.peek_kind() == TokenKind::LParen {
            self.advance();
            let mut types = Vec::new();
            if self.peek_kind() != TokenKind::RParen {
                loop {
                    types.push(self.parse_r_type(result)?);
                    if self.peek_kind() == TokenKind::Comma {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            if types.len() > 1 {
                // Re-home the individually parsed r_types under one parameterList.
                let list = self.tree.alloc(PARAMETER_LIST, result, Span::single(start), "");
                for t in &types {
                    self.tree.reparent(*t, list);
                }
                let span = Span::new(self.tree.span(types[0]).start, self.tree.span(*types.last().unwrap()).end);
                self.tree.finish(list, span, self.slice(span));
            }
        } else {
            self.parse_r_type(result)?;
        }

        let span = Span::new(start, self.tokens[self.pos.saturating_sub(1)].span.end);
        self.tree.finish(result, span, self.slice(span));
        Ok(result)
    }

    fn parse_r_type(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let name = self.expect(TokenKind::Identifier)?;
        Ok(self.tree.alloc(R_TYPE, parent, name.span, name.text))
    }

    fn parse_identifier_list(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let list = self.tree.alloc(IDENTIFIER_LIST, parent, Span::single(start), "");
        loop {
            let ident = self.expect(TokenKind::Identifier)?;
            self.tree.alloc(IDENTIFIER, list, ident.span, ident.text);
            if self.peek_kind() == TokenKind::Comma {
                self.advance();
                continue;
            }
            break;
        }
        let end = self.tree.span(*self.tree.children(list).last().unwrap()).end;
        let span = Span::new(start, end);
        self.tree.finish(list, span, self.slice(span));
        Ok(list)
    }

    /// `arrayType | channelType | mapType | r_type`, decided by one token of
    /// lookahead.
    fn parse_var_type(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        match self.peek_kind() {
            TokenKind::LBracket => self.parse_array_type(parent),
            TokenKind::Chan => self.parse_channel_type(parent),
            TokenKind::Map => self.parse_map_type(parent),
            _ => self.parse_r_type(parent),
        }
    }

    fn parse_array_type(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let array = self.tree.alloc(ARRAY_TYPE, parent, Span::single(start), "");
        self.expect(TokenKind::LBracket)?;
        let len_start = self.peek().span.start;
        let length = self.tree.alloc(ARRAY_LENGTH, array, Span::single(len_start), "");
        let lit = self.expect(TokenKind::IntLiteral)?;
        self.tree.alloc(BASIC_LIT, length, lit.span, lit.text.clone());
        self.tree.finish(length, lit.span, lit.text);
        self.expect(TokenKind::RBracket)?;
        let elem = self.parse_var_type(array)?;
        let span = Span::new(start, self.tree.span(elem).end);
        self.tree.finish(array, span, self.slice(span));
        Ok(array)
    }

    fn parse_channel_type(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let chan = self.tree.alloc(CHANNEL_TYPE, parent, Span::single(start), "");
        self.expect(TokenKind::Chan)?;
        if self.peek_kind() == TokenKind::LBracket {
            self.advance();
            let lit = self.expect(TokenKind::IntLiteral)?;
            self.tree.alloc(BASIC_LIT, chan, lit.span, lit.text);
            self.expect(TokenKind::RBracket)?;
        }
        let elem = self.parse_r_type(chan)?;
        let span = Span::new(start, self.tree.span(elem).end);
        self.tree.finish(chan, span, self.slice(span));
        Ok(chan)
    }

    fn parse_map_type(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let map = self.tree.alloc(MAP_TYPE, parent, Span::single(start), "");
        self.expect(TokenKind::Map)?;
        self.expect(TokenKind::LBracket)?;
        self.parse_r_type(map)?;
        self.expect(TokenKind::RBracket)?;
        let value = self.parse_r_type(map)?;
        let span = Span::new(start, self.tree.span(value).end);
        self.tree.finish(map, span, self.slice(span));
        Ok(map)
    }

    // -- statements -----------------------------------------------------

    fn parse_block(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let open = self.expect(TokenKind::LBrace)?;
        let block = self.tree.alloc(BLOCK, parent, Span::single(open.span.start), "");
        let list_start = self.peek().span.start;
        let list = self.tree.alloc(STATEMENT_LIST, block, Span::single(list_start), "");
        while self.peek_kind() != TokenKind::RBrace && self.peek_kind() != TokenKind::Eof {
            self.parse_statement(list)?;
        }
        let close = self.expect(TokenKind::RBrace)?;
        let list_span = Span::new(list_start, close.span.start);
        self.tree.finish(list, list_span, self.slice(list_span));
        let span = Span::new(open.span.start, close.span.end);
        self.tree.finish(block, span, self.slice(span));
        Ok(block)
    }

    fn parse_statement(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        match self.peek_kind() {
            TokenKind::Var => {
                let id = self.parse_var_decl(parent)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
            TokenKind::If => self.parse_if_stmt(parent),
            TokenKind::For => self.parse_for_stmt(parent),
            TokenKind::Break => {
                let tok = self.advance();
                let id = self.tree.alloc(BREAK_STMT, parent, tok.span, tok.text);
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
            TokenKind::Continue => {
                let tok = self.advance();
                let id = self.tree.alloc(CONTINUE_STMT, parent, tok.span, tok.text);
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
            TokenKind::Return => {
                let id = self.parse_return_stmt(parent)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
            TokenKind::Go => {
                let id = self.parse_go_stmt(parent)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
            TokenKind::LBrace => self.parse_block(parent),
            _ => {
                let id = self.parse_simple_core(parent)?;
                self.expect(TokenKind::Semicolon)?;
                Ok(id)
            }
        }
    }

    fn parse_var_decl(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let decl = self.tree.alloc(VAR_DECL, parent, Span::single(start), "");
        self.expect(TokenKind::Var)?;
        self.parse_identifier_list(decl)?;
        let ty = self.parse_var_type(decl)?;
        let span = Span::new(start, self.tree.span(ty).end);
        self.tree.finish(decl, span, self.slice(span));
        Ok(decl)
    }

    fn parse_return_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let kw = self.expect(TokenKind::Return)?;
        let ret = self.tree.alloc(RETURN_STMT, parent, kw.span, kw.text.clone());
        let mut end = kw.span.end;
        if self.peek_kind() != TokenKind::Semicolon {
            loop {
                let expr = self.parse_binary(ret, 0)?;
                end = self.tree.span(expr).end;
                if self.peek_kind() == TokenKind::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let span = Span::new(kw.span.start, end);
        self.tree.finish(ret, span, self.slice(span));
        Ok(ret)
    }

    fn parse_go_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let kw = self.expect(TokenKind::Go)?;
        let go = self.tree.alloc(GO_STMT, parent, kw.span, kw.text);
        let call = self.parse_binary(go, 0)?;
        let span = Span::new(kw.span.start, self.tree.span(call).end);
        self.tree.finish(go, span, self.slice(span));
        Ok(go)
    }

    /// Wraps one of the simple-statement kinds for positions (`if` init,
    /// `for` init/post) where the CFG treats the wrapper as the addressable
    /// cell and the wrapped production as its `sub_node`.
    fn parse_simple_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let wrapper = self.tree.alloc(SIMPLE_STMT, parent, Span::single(start), "");
        let inner = self.parse_simple_core(wrapper)?;
        let span = self.tree.span(inner);
        self.tree.finish(wrapper, span, self.slice(span));
        Ok(wrapper)
    }

    /// `assignment | shortVarDecl | incDecStmt | sendStmt | expressionStmt`,
    /// dispatched on the token following a leading identifier. None of these
    /// support a comma-separated left-hand side.
    fn parse_simple_core(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        if self.peek_kind() == TokenKind::Identifier {
            match self.lookahead_kind(1) {
                TokenKind::Define => return self.parse_short_var_decl(parent),
                TokenKind::Assign => return self.parse_assignment(parent),
                TokenKind::PlusPlus | TokenKind::MinusMinus => return self.parse_inc_dec(parent),
                TokenKind::Arrow => return self.parse_send_stmt(parent),
                _ => {}
            }
        }
        self.parse_expression_stmt(parent)
    }

    fn parse_assignment(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let lhs = self.expect(TokenKind::Identifier)?;
        let node = self.tree.alloc(ASSIGNMENT, parent, lhs.span, "");
        self.tree.alloc(IDENTIFIER, node, lhs.span, lhs.text.clone());
        self.expect(TokenKind::Assign)?;
        let rhs = self.parse_binary(node, 0)?;
        let span = Span::new(lhs.span.start, self.tree.span(rhs).end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    fn parse_short_var_decl(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let node = self.tree.alloc(SHORT_VAR_DECL, parent, Span::single(start), "");
        self.parse_identifier_list(node)?;
        self.expect(TokenKind::Define)?;
        let rhs = self.parse_binary(node, 0)?;
        let span = Span::new(start, self.tree.span(rhs).end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    fn parse_inc_dec(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let ident = self.expect(TokenKind::Identifier)?;
        let node = self.tree.alloc(INC_DEC_STMT, parent, ident.span, "");
        self.tree.alloc(IDENTIFIER, node, ident.span, ident.text);
        let op = self.advance();
        let span = Span::new(ident.span.start, op.span.end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    fn parse_send_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let ident = self.expect(TokenKind::Identifier)?;
        let node = self.tree.alloc(SEND_STMT, parent, ident.span, "");
        self.tree.alloc(IDENTIFIER, node, ident.span, ident.text.clone());
        self.expect(TokenKind::Arrow)?;
        let rhs = self.parse_binary(node, 0)?;
        let span = Span::new(ident.span.start, self.tree.span(rhs).end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    fn parse_expression_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let node = self.tree.alloc(EXPRESSION_STMT, parent, Span::single(start), "");
        let inner = self.parse_binary(node, 0)?;
        let span = self.tree.span(inner);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    /// `ifStmt := 'if' (simpleStmt ';')? expression block ('else' (block | ifStmt))?`
    fn parse_if_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let kw = self.expect(TokenKind::If)?;
        let node = self.tree.alloc(IF_STMT, parent, kw.span, "");

        if self.clause_has_semicolon() {
            self.parse_simple_stmt(node)?;
            self.expect(TokenKind::Semicolon)?;
        }
        self.parse_binary(node, 0)?;
        self.parse_block(node)?;

        if self.peek_kind() == TokenKind::Else {
            self.advance();
            if self.peek_kind() == TokenKind::If {
                self.parse_if_stmt(node)?;
            } else {
                self.parse_block(node)?;
            }
        }

        let end = self.tree.span(*self.tree.children(node).last().unwrap()).end;
        let span = Span::new(kw.span.start, end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    /// The three shapes of `forStmt` (§3/§4.4): empty, single-expression
    /// (condition only), and three-clause.
    fn parse_for_stmt(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let kw = self.expect(TokenKind::For)?;
        let node = self.tree.alloc(FOR_STMT, parent, kw.span, "");

        if self.peek_kind() != TokenKind::LBrace {
            if self.clause_has_semicolon() {
                self.parse_for_clause(node)?;
            } else {
                self.parse_binary(node, 0)?;
            }
        }
        self.parse_block(node)?;

        let end = self.tree.span(*self.tree.children(node).last().unwrap()).end;
        let span = Span::new(kw.span.start, end);
        self.tree.finish(node, span, self.slice(span));
        Ok(node)
    }

    /// Always produces exactly three children, in order — init, cond, post —
    /// using an [`EMPTY`] placeholder for whichever clauses the source
    /// omits, so the CFG builder can address each slot positionally instead
    /// of disambiguating two optional `simpleStmt`s by rule name alone.
    fn parse_for_clause(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let start = self.peek().span.start;
        let clause = self.tree.alloc(FOR_CLAUSE, parent, Span::single(start), "");

        if self.peek_kind() != TokenKind::Semicolon {
            self.parse_simple_stmt(clause)?;
        } else {
            self.alloc_empty(clause);
        }
        self.expect(TokenKind::Semicolon)?;

        if self.peek_kind() != TokenKind::Semicolon {
            self.parse_binary(clause, 0)?;
        } else {
            self.alloc_empty(clause);
        }
        self.expect(TokenKind::Semicolon)?;

        if self.peek_kind() != TokenKind::LBrace {
            self.parse_simple_stmt(clause)?;
        } else {
            self.alloc_empty(clause);
        }

        let end = self.tree.span(*self.tree.children(clause).last().unwrap()).end;
        let span = Span::new(start, end);
        self.tree.finish(clause, span, self.slice(span));
        Ok(clause)
    }

    fn alloc_empty(&mut self, parent: NodeId) -> NodeId {
        let pos = self.peek().span.start;
        self.tree.alloc(EMPTY, parent, Span::single(pos), "")
    }

    // -- expressions -----------------------------------------------------

    fn parse_binary(&mut self, parent: NodeId, level: usize) -> CompileResult<NodeId> {
        if level == PRECEDENCE.len() {
            return self.parse_unary(parent);
        }
        let mut lhs = self.parse_binary(parent, level + 1)?;
        while PRECEDENCE[level].contains(&self.peek_kind()) {
            self.advance();
            let start = self.tree.span(lhs).start;
            let node = self.tree.alloc(EXPRESSION, parent, Span::single(start), "");
            self.tree.reparent(lhs, node);
            let rhs = self.parse_binary(node, level + 1)?;
            let span = Span::new(start, self.tree.span(rhs).end);
            self.tree.finish(node, span, self.slice(span));
            lhs = node;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        if matches!(self.peek_kind(), TokenKind::Minus | TokenKind::Not | TokenKind::Arrow) {
            let op = self.advance();
            let node = self.tree.alloc(EXPRESSION, parent, op.span, "");
            let operand = self.parse_unary(node)?;
            let span = Span::new(op.span.start, self.tree.span(operand).end);
            self.tree.finish(node, span, self.slice(span));
            return Ok(node);
        }
        self.parse_primary(parent)
    }

    fn parse_primary(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        match self.peek_kind() {
            TokenKind::LParen => {
                let open = self.advance();
                let node = self.tree.alloc(EXPRESSION, parent, open.span, "");
                self.parse_binary(node, 0)?;
                let close = self.expect(TokenKind::RParen)?;
                let span = Span::new(open.span.start, close.span.end);
                self.tree.finish(node, span, self.slice(span));
                Ok(node)
            }
            TokenKind::IntLiteral
            | TokenKind::HexLiteral
            | TokenKind::FloatLiteral
            | TokenKind::StringLiteral
            | TokenKind::True
            | TokenKind::False => {
                let tok = self.advance();
                let node = self.tree.alloc(EXPRESSION, parent, tok.span, tok.text.clone());
                self.tree.alloc(BASIC_LIT, node, tok.span, tok.text);
                Ok(node)
            }
            TokenKind::Identifier => self.parse_identifier_primary(parent),
            other => {
                let tok = self.peek().clone();
                Err(CompileError::syntax(format!("expected expression, found `{other}`"), tok.span))
            }
        }
    }

    fn parse_identifier_primary(&mut self, parent: NodeId) -> CompileResult<NodeId> {
        let first = self.expect(TokenKind::Identifier)?;
        let mut end = first.span.end;
        let mut name = first.text.clone();
        while self.peek_kind() == TokenKind::Dot {
            self.advance();
            let part = self.expect(TokenKind::Identifier)?;
            name.push('.');
            name.push_str(&part.text);
            end = part.span.end;
        }
        let name_span = Span::new(first.span.start, end);

        if self.peek_kind() == TokenKind::LParen {
            let node = self.tree.alloc(EXPRESSION, parent, name_span, "");
            let call = self.tree.alloc(CALL_EXPR, node, name_span, name);
            self.advance();
            if self.peek_kind() != TokenKind::RParen {
                loop {
                    self.parse_binary(call, 0)?;
                    if self.peek_kind() == TokenKind::Comma {
                        self.advance();
                        continue;
                    }
                    break;
                }
            }
            let close = self.expect(TokenKind::RParen)?;
            let call_span = Span::new(name_span.start, close.span.end);
            self.tree.finish(call, call_span, self.slice(call_span));
            self.tree.finish(node, call_span, self.slice(call_span));
            return Ok(node);
        }

        let node = self.tree.alloc(EXPRESSION, parent, name_span, self.slice(name_span));
        self.tree.alloc(IDENTIFIER, node, name_span, name);
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtlc_tree::walk_down_to;

    fn parse(src: &str) -> Tree {
        parse_source(src).unwrap_or_else(|e| panic!("parse error: {e:?}"))
    }

    #[test]
    fn parses_a_minimal_function() {
        let tree = parse("func plusOne(i int) int {\n  return i + 1;\n}\n");
        let func = *tree.children(tree.root()).first().unwrap();
        assert_eq!(tree.rule(func), FUNCTION_DECL);
        let name = tree.children(func)[1];
        assert_eq!(tree.text(name), "plusOne");
    }

    #[test]
    fn no_parameters_omits_the_parameter_list_node() {
        let tree = parse("func main() {\n  var i int;\n}\n");
        let func = *tree.children(tree.root()).first().unwrap();
        assert!(tree.children(func).iter().all(|&c| tree.rule(c) != PARAMETER_LIST));
    }

    #[test]
    fn short_var_decl_nests_a_basic_lit() {
        let tree = parse("func main() {\n  y := 0xFFAB;\n}\n");
        let decl = walk_down_to(&tree, tree.root(), SHORT_VAR_DECL).unwrap();
        let lit = walk_down_to(&tree, decl, BASIC_LIT).unwrap();
        assert_eq!(tree.text(lit), "0xFFAB");
    }

    #[test]
    fn parenthesized_condition_keeps_its_parens_in_the_span() {
        let tree = parse("func main() {\n  var i int;\n  var j int;\n  if (i < j) {\n    i = 4;\n  }\n}\n");
        let if_stmt = walk_down_to(&tree, tree.root(), IF_STMT).unwrap();
        let test = tree.children(if_stmt)[0];
        assert_eq!(tree.rule(test), EXPRESSION);
        assert_eq!(tree.text(test), "(i < j)");
    }

    #[test]
    fn if_with_init_clause_wraps_it_in_simple_stmt() {
        let tree = parse("func main() {\n  if x := 1; x > 0 {\n    x = 2;\n  }\n}\n");
        let if_stmt = walk_down_to(&tree, tree.root(), IF_STMT).unwrap();
        let children = tree.children(if_stmt);
        assert_eq!(tree.rule(children[0]), SIMPLE_STMT);
        assert_eq!(tree.rule(children[1]), EXPRESSION);
    }

    #[test]
    fn three_clause_for_always_has_three_slots() {
        let tree = parse("func main() {\n  for i := 0; i < 10; i++ {\n  }\n}\n");
        let clause = walk_down_to(&tree, tree.root(), FOR_CLAUSE).unwrap();
        let children = tree.children(clause);
        assert_eq!(children.len(), 3);
        assert_eq!(tree.rule(children[0]), SIMPLE_STMT);
        assert_eq!(tree.rule(children[1]), EXPRESSION);
        assert_eq!(tree.rule(children[2]), SIMPLE_STMT);
    }

    #[test]
    fn for_with_missing_init_still_places_post_in_the_third_slot() {
        let tree = parse("func main() {\n  for ; i < 10; i++ {\n  }\n}\n");
        let clause = walk_down_to(&tree, tree.root(), FOR_CLAUSE).unwrap();
        let children = tree.children(clause);
        assert_eq!(tree.rule(children[0]), EMPTY);
        assert_eq!(tree.rule(children[1]), EXPRESSION);
        assert_eq!(tree.rule(children[2]), SIMPLE_STMT);
    }

    #[test]
    fn empty_for_has_no_clause_at_all() {
        let tree = parse("func main() {\n  for {\n    break;\n  }\n}\n");
        let for_stmt = walk_down_to(&tree, tree.root(), FOR_STMT).unwrap();
        assert!(tree.children(for_stmt).iter().all(|&c| tree.rule(c) != FOR_CLAUSE && tree.rule(c) != EXPRESSION));
    }

    #[test]
    fn single_expression_for_has_a_bare_condition_child() {
        let tree = parse("func main() {\n  for i < 10 {\n    i++;\n  }\n}\n");
        let for_stmt = walk_down_to(&tree, tree.root(), FOR_STMT).unwrap();
        assert_eq!(tree.rule(tree.children(for_stmt)[0]), EXPRESSION);
    }

    #[test]
    fn recognizes_a_qualified_call_expression() {
        let tree = parse("func main() {\n  fmt.Printf(\"hi %d\", 1);\n}\n");
        let call = walk_down_to(&tree, tree.root(), CALL_EXPR).unwrap();
        assert_eq!(tree.text(call), "fmt.Printf(\"hi %d\", 1)");
    }

    #[test]
    fn rejects_a_dangling_operator() {
        assert!(parse_source("func main() {\n  var i int;\n  i = 1 +;\n}\n").is_err());
    }
}
