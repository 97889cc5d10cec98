//! Recursive-descent parser with precedence climbing for binary expressions.
//! Consumes the full token stream produced by [`crate::lexer::Lexer`] and
//! builds the owned [`crate::ast`].

mod error;

pub use error::ParseError;

use talonc_base::{SourceRange, Symbol};

use crate::ast::{
    BinaryOp, Block, CallArgument, Clause, Decl, Expr, ExprKind, ExternDeclaration,
    FunctionDeclaration, Parameter, Program, Stmt, StmtKind, StructDeclaration, TypeNode,
    TypeNodeKind, UnaryOp,
};
use crate::token::{Token, TokenKind};

/// Parses a full token stream into a [`Program`]. Holds no reference to the
/// interner used to produce the tokens; identifiers already carry resolved
/// [`Symbol`]s.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn same_kind(a: &TokenKind, b: &TokenKind) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut declarations = Vec::new();
        while !self.at_eof() {
            declarations.push(self.parse_declaration()?);
        }
        Ok(Program { declarations })
    }

    // --- token-stream primitives ---------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = *self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        same_kind(self.peek_kind(), kind)
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token, ParseError> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::ExpectedToken {
                expected: kind.describe(),
                found: self.peek_kind().describe(),
                message: message.to_string(),
                range: self.peek().range,
            })
        }
    }

    fn expect_identifier(&mut self) -> Result<Symbol, ParseError> {
        match *self.peek_kind() {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(sym)
            }
            _ => Err(ParseError::ExpectedIdentifier { range: self.peek().range }),
        }
    }

    // --- declarations -----------------------------------------------------

    fn parse_declaration(&mut self) -> Result<Decl, ParseError> {
        match self.peek_kind() {
            TokenKind::At => self.parse_extern_declaration().map(Decl::Extern),
            TokenKind::Struct => self.parse_struct_declaration().map(Decl::Struct),
            TokenKind::Func => self.parse_function_declaration(false).map(Decl::Function),
            _ => Err(ParseError::UnexpectedToken { found: self.peek_kind().describe(), range: self.peek().range }),
        }
    }

    fn parse_extern_declaration(&mut self) -> Result<ExternDeclaration, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::At, "extern declarations start with '@'")?;
        self.expect(TokenKind::LParen, "expected '(' after '@'")?;
        let calling_convention = self.expect_identifier()?;
        self.expect(TokenKind::RParen, "expected ')' after the calling convention")?;
        let function = self.parse_function_declaration(true)?;
        let range = start.merge(&function.range);
        Ok(ExternDeclaration { calling_convention, function, range })
    }

    fn parse_function_declaration(&mut self, is_extern: bool) -> Result<FunctionDeclaration, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::Func, "expected 'func'")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "expected '(' after the function name")?;
        let parameters = self.parse_parameter_list()?;
        self.expect(TokenKind::RParen, "expected ')' after the parameter list")?;
        let return_type = if self.check(&TokenKind::Arrow) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = if self.check(&TokenKind::LBrace) { Some(self.parse_block()?) } else { None };
        let end = body.as_ref().map(|_| self.tokens[self.pos - 1].range).unwrap_or(
            return_type.as_ref().map(|t| t.range).unwrap_or(start),
        );
        let range = start.merge(&end);
        Ok(FunctionDeclaration::new(name, parameters, return_type, body, is_extern, range))
    }

    fn parse_parameter_list(&mut self) -> Result<Vec<Parameter>, ParseError> {
        let mut parameters = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(parameters);
        }
        loop {
            parameters.push(self.parse_parameter()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(parameters)
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseError> {
        let start = self.peek().range;

        if self.check(&TokenKind::DotDotDot) {
            self.advance();
            return Ok(Parameter {
                external_label: None,
                name: Symbol::EMPTY,
                type_node: None,
                is_variadic: true,
                range: start,
            });
        }

        let (external_label, name) = if self.check(&TokenKind::Underscore) {
            self.advance();
            (None, self.expect_identifier()?)
        } else {
            let first = self.expect_identifier()?;
            if matches!(self.peek_kind(), TokenKind::Identifier(_)) {
                let name = self.expect_identifier()?;
                (Some(first), name)
            } else {
                // A single identifier before the colon: the label equals the name.
                (Some(first), first)
            }
        };

        self.expect(TokenKind::Colon, "expected ':' before the parameter type")?;
        let type_node = self.parse_type()?;
        let range = start.merge(&type_node.range);
        Ok(Parameter { external_label, name, type_node: Some(type_node), is_variadic: false, range })
    }

    fn parse_type(&mut self) -> Result<Box<TypeNode>, ParseError> {
        let start = self.peek().range;
        if self.check(&TokenKind::Star) {
            self.advance();
            let inner = self.parse_type()?;
            let range = start.merge(&inner.range);
            return Ok(Box::new(TypeNode::new(TypeNodeKind::Pointer(inner), range)));
        }
        match *self.peek_kind() {
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(Box::new(TypeNode::new(TypeNodeKind::Named(sym), start)))
            }
            _ => Err(ParseError::ExpectedType { range: start }),
        }
    }

    fn parse_struct_declaration(&mut self) -> Result<StructDeclaration, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::Struct, "expected 'struct'")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace, "expected '{' to open the struct body")?;
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            match self.peek_kind() {
                TokenKind::Var => fields.push(self.parse_field()?),
                TokenKind::Func => methods.push(self.parse_function_declaration(false)?),
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: self.peek_kind().describe(),
                        range: self.peek().range,
                    })
                }
            }
        }
        let end = self.expect(TokenKind::RBrace, "expected '}' to close the struct body")?;
        Ok(StructDeclaration { name, fields, methods, range: start.merge(&end.range) })
    }

    fn parse_field(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::Var, "expected 'var'")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::Colon, "a struct field requires an explicit type")?;
        let declared_type = self.parse_type()?;
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = initializer.as_ref().map(|e| e.range).unwrap_or(declared_type.range);
        Ok(Stmt::new(
            StmtKind::VarBinding { name, declared_type: Some(declared_type), initializer },
            start.merge(&end),
        ))
    }

    // --- statements ---------------------------------------------------

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.expect(TokenKind::LBrace, "expected '{'")?;
        let mut statements = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_eof() {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::RBrace, "expected '}'")?;
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.peek_kind() {
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            _ => self.parse_assignment_or_expression_statement(),
        }
    }

    fn parse_var_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::Var, "expected 'var'")?;
        let name = self.expect_identifier()?;
        let declared_type = if self.check(&TokenKind::Colon) {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        let initializer = if self.check(&TokenKind::Equal) {
            self.advance();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        let end = initializer
            .as_ref()
            .map(|e| e.range)
            .or(declared_type.as_ref().map(|t| t.range))
            .unwrap_or(start);
        Ok(Stmt::new(StmtKind::VarBinding { name, declared_type, initializer }, start.merge(&end)))
    }

    fn parse_return_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::Return, "expected 'return'")?;
        let value = if self.check(&TokenKind::RBrace) { None } else { Some(Box::new(self.parse_expr()?)) };
        let end = value.as_ref().map(|v| v.range).unwrap_or(start);
        Ok(Stmt::new(StmtKind::ReturnStatement { value }, start.merge(&end)))
    }

    fn parse_if_statement(&mut self) -> Result<Stmt, ParseError> {
        let start = self.peek().range;
        self.expect(TokenKind::If, "expected 'if'")?;
        let condition = Box::new(self.parse_expr()?);
        let body = self.parse_block()?;
        let mut clauses = vec![Clause { condition, body }];
        let mut else_block = None;
        let mut end = start;
        loop {
            if !self.check(&TokenKind::Else) {
                break;
            }
            self.advance();
            if self.check(&TokenKind::If) {
                self.advance();
                let condition = Box::new(self.parse_expr()?);
                let body = self.parse_block()?;
                end = body.last().map(|s| s.range).unwrap_or(end);
                clauses.push(Clause { condition, body });
            } else {
                let block = self.parse_block()?;
                end = block.last().map(|s| s.range).unwrap_or(end);
                else_block = Some(block);
                break;
            }
        }
        Ok(Stmt::new(StmtKind::IfStatement { clauses, else_block }, start.merge(&end)))
    }

    fn parse_assignment_or_expression_statement(&mut self) -> Result<Stmt, ParseError> {
        let expr = self.parse_expr()?;
        if self.check(&TokenKind::Equal) {
            self.advance();
            let value = Box::new(self.parse_expr()?);
            let range = expr.range.merge(&value.range);
            let kind = match expr.as_identifier() {
                Some(target) => StmtKind::AssignStatement { target, value },
                None => StmtKind::LValueAssignStatement { target: Box::new(expr), value },
            };
            Ok(Stmt::new(kind, range))
        } else {
            let range = expr.range;
            Ok(Stmt::new(StmtKind::ExpressionStatement { expr: Box::new(expr) }, range))
        }
    }

    // --- expressions ----------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary(1)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek_kind() {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            TokenKind::AmpAmp => Some(BinaryOp::And),
            TokenKind::PipePipe => Some(BinaryOp::Or),
            TokenKind::EqualEqual => Some(BinaryOp::Eq),
            TokenKind::BangEqual => Some(BinaryOp::NotEq),
            TokenKind::Less => Some(BinaryOp::Lt),
            TokenKind::LessEqual => Some(BinaryOp::Le),
            TokenKind::Greater => Some(BinaryOp::Gt),
            TokenKind::GreaterEqual => Some(BinaryOp::Ge),
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let Some(op) = self.peek_binary_op() else { break };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.advance();
            // Left-associative: the next operand only absorbs strictly higher precedence.
            let right = self.parse_binary(precedence + 1)?;
            let range = left.range.merge(&right.range);
            left = Expr::new(ExprKind::Binary { op, left: Box::new(left), right: Box::new(right) }, range);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.peek().range;
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Star => Some(UnaryOp::Deref),
            TokenKind::Amp => Some(UnaryOp::AddressOf),
            _ => None,
        };
        let Some(op) = op else { return self.parse_postfix() };
        self.advance();
        let operand = Box::new(self.parse_unary()?);
        let range = start.merge(&operand.range);
        Ok(Expr::new(ExprKind::Unary { op, operand }, range))
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let member_range = self.peek().range;
                    let member = self.expect_identifier()?;
                    let range = expr.range.merge(&member_range);
                    expr = Expr::new(ExprKind::MemberAccess { base: Box::new(expr), member }, range);
                }
                TokenKind::Arrow => {
                    // `ptr->f` is sugar for `(*ptr).f`.
                    self.advance();
                    let member_range = self.peek().range;
                    let member = self.expect_identifier()?;
                    let base_range = expr.range;
                    let range = base_range.merge(&member_range);
                    let deref = Expr::new(ExprKind::Unary { op: UnaryOp::Deref, operand: Box::new(expr) }, base_range);
                    expr = Expr::new(ExprKind::MemberAccess { base: Box::new(deref), member }, range);
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_arguments()?;
                    let end = self.expect(TokenKind::RParen, "expected ')' to close the argument list")?;
                    let range = expr.range.merge(&end.range);
                    expr = Expr::new(ExprKind::Call { callee: Box::new(expr), args }, range);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_arguments(&mut self) -> Result<Vec<CallArgument>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_call_argument()?);
            if self.check(&TokenKind::Comma) {
                self.advance();
                continue;
            }
            break;
        }
        Ok(args)
    }

    fn parse_call_argument(&mut self) -> Result<CallArgument, ParseError> {
        if self.check(&TokenKind::Underscore) && same_kind(self.peek_at(1), &TokenKind::Colon) {
            return Err(ParseError::UnderscoreArgumentLabelNotAllowed { range: self.peek().range });
        }
        if let TokenKind::Identifier(sym) = *self.peek_kind() {
            if same_kind(self.peek_at(1), &TokenKind::Colon) {
                self.advance();
                self.advance();
                let value = Box::new(self.parse_expr()?);
                return Ok(CallArgument { label: Some(sym), value });
            }
        }
        let value = Box::new(self.parse_expr()?);
        Ok(CallArgument { label: None, value })
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = *self.peek();
        match token.kind {
            TokenKind::IntegerLiteral(sym) => {
                self.advance();
                Ok(Expr::new(ExprKind::IntegerLiteral(sym), token.range))
            }
            TokenKind::StringLiteral(sym) => {
                self.advance();
                Ok(Expr::new(ExprKind::StringLiteral(sym), token.range))
            }
            TokenKind::BooleanLiteral(b) => {
                self.advance();
                Ok(Expr::new(ExprKind::BooleanLiteral(b), token.range))
            }
            TokenKind::Identifier(sym) => {
                self.advance();
                Ok(Expr::new(ExprKind::Identifier(sym), token.range))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                let end = self.expect(TokenKind::RParen, "expected ')' to close the parenthesized expression")?;
                let range = token.range.merge(&end.range);
                Ok(Expr::new(inner.kind, range))
            }
            _ => Err(ParseError::UnexpectedToken { found: token.kind.describe(), range: token.range }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use talonc_base::Interner;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> (Program, Interner) {
        let mut interner = Interner::new();
        let tokens = Lexer::new(source).tokenize(&mut interner).expect("lex ok");
        let program = Parser::new(tokens).parse_program().expect("parse ok");
        (program, interner)
    }

    #[test]
    fn parses_a_simple_function() {
        let (program, _) = parse("func main() -> Int { return 0 }");
        assert_eq!(program.declarations.len(), 1);
        match &program.declarations[0] {
            Decl::Function(f) => {
                assert!(f.body.is_some());
                assert_eq!(f.body.as_ref().unwrap().len(), 1);
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn extern_declaration_wraps_a_bodyless_function() {
        let (program, interner) = parse("@(c) func puts(_ s: *Int8) -> Int");
        match &program.declarations[0] {
            Decl::Extern(e) => {
                assert_eq!(interner.resolve(e.calling_convention), "c");
                assert!(e.function.is_extern);
                assert!(e.function.body.is_none());
            }
            other => panic!("expected an extern declaration, got {other:?}"),
        }
    }

    #[test]
    fn single_identifier_parameter_label_equals_name() {
        let (program, interner) = parse("func f(x: Int) {}");
        match &program.declarations[0] {
            Decl::Function(f) => {
                let p = &f.parameters[0];
                assert_eq!(interner.resolve(p.external_label.unwrap()), "x");
                assert_eq!(interner.resolve(p.name), "x");
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn underscore_parameter_has_no_external_label() {
        let (program, _) = parse("func f(_ x: Int) {}");
        match &program.declarations[0] {
            Decl::Function(f) => assert!(f.parameters[0].external_label.is_none()),
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn two_identifier_parameter_uses_distinct_label_and_name() {
        let (program, interner) = parse("func f(with x: Int) {}");
        match &program.declarations[0] {
            Decl::Function(f) => {
                let p = &f.parameters[0];
                assert_eq!(interner.resolve(p.external_label.unwrap()), "with");
                assert_eq!(interner.resolve(p.name), "x");
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn binary_precedence_groups_multiplication_tighter_than_addition() {
        let (program, _) = parse("func f() { return 1 + 2 * 3 }");
        match &program.declarations[0] {
            Decl::Function(f) => {
                let stmt = &f.body.as_ref().unwrap()[0];
                match &stmt.kind {
                    StmtKind::ReturnStatement { value: Some(expr) } => match &expr.kind {
                        ExprKind::Binary { op: BinaryOp::Add, right, .. } => {
                            assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
                        }
                        other => panic!("expected a top-level addition, got {other:?}"),
                    },
                    other => panic!("expected a return statement, got {other:?}"),
                }
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn assignment_to_bare_identifier_is_assign_statement() {
        let (program, _) = parse("func f() { x = 1 }");
        match &program.declarations[0] {
            Decl::Function(f) => {
                assert!(matches!(f.body.as_ref().unwrap()[0].kind, StmtKind::AssignStatement { .. }));
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn assignment_to_member_chain_is_lvalue_assign_statement() {
        let (program, _) = parse("func f() { p.x = 1 }");
        match &program.declarations[0] {
            Decl::Function(f) => {
                assert!(matches!(f.body.as_ref().unwrap()[0].kind, StmtKind::LValueAssignStatement { .. }));
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn arrow_member_access_desugars_to_deref_then_dot() {
        let (program, _) = parse("func f() { return p->x }");
        match &program.declarations[0] {
            Decl::Function(f) => match &f.body.as_ref().unwrap()[0].kind {
                StmtKind::ReturnStatement { value: Some(expr) } => match &expr.kind {
                    ExprKind::MemberAccess { base, .. } => {
                        assert!(matches!(base.kind, ExprKind::Unary { op: UnaryOp::Deref, .. }));
                    }
                    other => panic!("expected member access, got {other:?}"),
                },
                other => panic!("expected a return statement, got {other:?}"),
            },
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn labeled_call_argument_is_recognized() {
        let (program, interner) = parse("func f() { return g(x: 1) }");
        match &program.declarations[0] {
            Decl::Function(f) => match &f.body.as_ref().unwrap()[0].kind {
                StmtKind::ReturnStatement { value: Some(expr) } => match &expr.kind {
                    ExprKind::Call { args, .. } => {
                        assert_eq!(interner.resolve(args[0].label.unwrap()), "x");
                    }
                    other => panic!("expected a call, got {other:?}"),
                },
                other => panic!("expected a return statement, got {other:?}"),
            },
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn underscore_argument_label_is_a_parse_error() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("func f() { return g(_: 1) }").tokenize(&mut interner).unwrap();
        let err = Parser::new(tokens).parse_program().unwrap_err();
        assert!(matches!(err, ParseError::UnderscoreArgumentLabelNotAllowed { .. }));
    }

    #[test]
    fn trailing_comma_in_call_arguments_is_a_parse_error() {
        let mut interner = Interner::new();
        let tokens = Lexer::new("func f() { return g(1,) }").tokenize(&mut interner).unwrap();
        assert!(Parser::new(tokens).parse_program().is_err());
    }

    #[test]
    fn if_else_if_else_chain_parses_all_clauses() {
        let (program, _) = parse("func f() { if true { } else if false { } else { } }");
        match &program.declarations[0] {
            Decl::Function(f) => match &f.body.as_ref().unwrap()[0].kind {
                StmtKind::IfStatement { clauses, else_block } => {
                    assert_eq!(clauses.len(), 2);
                    assert!(else_block.is_some());
                }
                other => panic!("expected an if statement, got {other:?}"),
            },
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }

    #[test]
    fn struct_body_interleaves_fields_and_methods() {
        let (program, _) = parse("struct Counter { var value: Int func get() -> Int { return 0 } }");
        match &program.declarations[0] {
            Decl::Struct(s) => {
                assert_eq!(s.fields.len(), 1);
                assert_eq!(s.methods.len(), 1);
            }
            other => panic!("expected a struct declaration, got {other:?}"),
        }
    }

    #[test]
    fn lone_variadic_marker_parameter_is_synthesized() {
        let (program, _) = parse("@(c) func printf(_ fmt: *Int8, ...) -> Int");
        match &program.declarations[0] {
            Decl::Extern(e) => assert!(e.function.is_variadic()),
            other => panic!("expected an extern declaration, got {other:?}"),
        }
    }

    #[test]
    fn pointer_type_nests_left_to_right() {
        let (program, _) = parse("func f(_ p: **Int8) {}");
        match &program.declarations[0] {
            Decl::Function(f) => {
                let type_node = f.parameters[0].type_node.as_ref().unwrap();
                match &type_node.kind {
                    TypeNodeKind::Pointer(inner) => assert!(matches!(inner.kind, TypeNodeKind::Pointer(_))),
                    other => panic!("expected a pointer type, got {other:?}"),
                }
            }
            other => panic!("expected a function declaration, got {other:?}"),
        }
    }
}
