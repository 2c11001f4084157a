// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursive-descent parser over the lexer's token stream, producing an
//! [`Ast`] for a single file (§6 "Source language at the boundary"). Include
//! resolution happens one layer up, in [`crate::include`].

use crate::lexer::{lex, Spanned, Tok};
use mro_core::{
    Ast, Binding, CallStmt, Callable, Expr, FileTypeDecl, Include, Interner, Literal, ParamDecl,
    PipelineDecl, Primitive, Ref, RefKind, ResourceHints, ReturnBinding, SourceDecl, SourceLang,
    SourceLocation, StageDecl, Symbol, TopCall, TypeDecl, TypeRef, UserTypeDecl,
};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{file}:{line}: {message}")]
pub struct ParseError {
    pub file: String,
    pub line: u32,
    pub message: String,
}

struct Parser<'a> {
    toks: Vec<Spanned>,
    pos: usize,
    file: String,
    abs_path: std::path::PathBuf,
    interner: &'a mut Interner,
}

type PResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    fn err(&self, line: u32, message: impl Into<String>) -> ParseError {
        ParseError {
            file: self.file.clone(),
            line,
            message: message.into(),
        }
    }

    fn loc(&self, line: u32) -> SourceLocation {
        SourceLocation::new(self.file.clone(), self.abs_path.clone(), line)
    }

    fn peek(&self) -> &Tok {
        &self.toks[self.pos].tok
    }

    fn peek_line(&self) -> u32 {
        self.toks[self.pos].line
    }

    fn advance(&mut self) -> Spanned {
        let t = self.toks[self.pos].clone();
        if self.pos + 1 < self.toks.len() {
            self.pos += 1;
        }
        t
    }

    fn expect_ident(&mut self) -> PResult<(String, u32)> {
        let line = self.peek_line();
        match self.advance().tok {
            Tok::Ident(s) => Ok((s, line)),
            other => Err(self.err(line, format!("expected identifier, found {:?}", other))),
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> PResult<u32> {
        let line = self.peek_line();
        match self.advance().tok {
            Tok::Ident(s) if s == kw => Ok(line),
            other => Err(self.err(line, format!("expected '{}', found {:?}", kw, other))),
        }
    }

    fn expect_str(&mut self) -> PResult<String> {
        let line = self.peek_line();
        match self.advance().tok {
            Tok::Str(s) => Ok(s),
            other => Err(self.err(line, format!("expected string literal, found {:?}", other))),
        }
    }

    fn expect(&mut self, tok: &Tok) -> PResult<()> {
        let line = self.peek_line();
        let got = self.advance().tok;
        if &got == tok {
            Ok(())
        } else {
            Err(self.err(line, format!("expected {:?}, found {:?}", tok, got)))
        }
    }

    fn at_ident(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(s) if s == word)
    }

    fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    fn parse_file(&mut self) -> PResult<Ast> {
        let mut ast = Ast::new();
        loop {
            match self.peek().clone() {
                Tok::Eof => break,
                Tok::Include => {
                    let line = self.peek_line();
                    self.advance();
                    let name = self.expect_str()?;
                    ast.includes.push(Include { name, loc: self.loc(line) });
                }
                Tok::Ident(kw) if kw == "filetype" => {
                    ast.types.push(TypeDecl::File(self.parse_filetype()?));
                }
                Tok::Ident(kw) if kw == "stage" => {
                    ast.callables.push(Callable::Stage(self.parse_stage()?));
                }
                Tok::Ident(kw) if kw == "pipeline" => {
                    ast.callables.push(Callable::Pipeline(self.parse_pipeline()?));
                }
                Tok::Ident(kw) if kw == "call" => {
                    ast.top_call = Some(self.parse_top_call()?);
                }
                Tok::Ident(_) => {
                    ast.types.push(TypeDecl::User(self.parse_user_type()?));
                }
                other => {
                    return Err(self.err(self.peek_line(), format!("unexpected token {:?}", other)));
                }
            }
        }
        Ok(ast)
    }

    fn parse_filetype(&mut self) -> PResult<FileTypeDecl> {
        let line = self.expect_keyword("filetype")?;
        let (name, _) = self.expect_ident()?;
        let extension = self.expect_str()?;
        let sym = self.intern(&name);
        Ok(FileTypeDecl { name: sym, extension, loc: self.loc(line) })
    }

    fn parse_user_type(&mut self) -> PResult<UserTypeDecl> {
        let (name, line) = self.expect_ident()?;
        self.expect(&Tok::Equals)?;
        let target = self.parse_typeref()?;
        let sym = self.intern(&name);
        Ok(UserTypeDecl { name: sym, target, loc: self.loc(line) })
    }

    fn parse_typeref(&mut self) -> PResult<TypeRef> {
        let (name, line) = self.expect_ident()?;
        let mut ty = if let Some(p) = Primitive::from_name(&name) {
            TypeRef::Primitive(p)
        } else {
            let sym = self.intern(&name);
            TypeRef::Named(sym)
        };
        while matches!(self.peek(), Tok::LBracket) {
            self.advance();
            self.expect(&Tok::RBracket).map_err(|_| {
                self.err(line, "expected closing ']' in array type")
            })?;
            ty = ty.array_of();
        }
        Ok(ty)
    }

    fn parse_param_list(&mut self) -> PResult<(Vec<ParamDecl>, Vec<ParamDecl>)> {
        self.expect(&Tok::LParen)?;
        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        if !matches!(self.peek(), Tok::RParen) {
            loop {
                let line = self.peek_line();
                let is_in = self.at_ident("in");
                let is_out = self.at_ident("out");
                if !is_in && !is_out {
                    return Err(self.err(line, "expected 'in' or 'out'"));
                }
                self.advance();
                let ty = self.parse_typeref()?;
                let (name, _) = self.expect_ident()?;
                let sym = self.intern(&name);
                let decl = ParamDecl { name: sym, ty, loc: self.loc(line) };
                if is_in {
                    inputs.push(decl);
                } else {
                    outputs.push(decl);
                }
                if matches!(self.peek(), Tok::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        Ok((inputs, outputs))
    }

    fn parse_stage(&mut self) -> PResult<StageDecl> {
        let line = self.expect_keyword("stage")?;
        let (name, _) = self.expect_ident()?;
        let id = self.intern(&name);
        let (inputs, outputs) = self.parse_param_list()?;
        self.expect(&Tok::LBrace)?;

        let mut src = None;
        let mut split = false;
        let mut retain = Vec::new();
        let mut resources = None;

        while !matches!(self.peek(), Tok::RBrace) {
            if self.at_ident("src") {
                self.advance();
                let (lang_tag, lang_line) = self.expect_ident()?;
                let lang = SourceLang::from_tag(&lang_tag)
                    .ok_or_else(|| self.err(lang_line, format!("unknown source language '{}'", lang_tag)))?;
                let path = self.expect_str()?;
                let mut args = Vec::new();
                while matches!(self.peek(), Tok::Comma) {
                    self.advance();
                    args.push(self.expect_str()?);
                }
                src = Some(SourceDecl { lang, path, args });
            } else if self.at_ident("split") {
                self.advance();
                split = true;
            } else if self.at_ident("retain") {
                self.advance();
                self.expect(&Tok::LParen)?;
                if !matches!(self.peek(), Tok::RParen) {
                    loop {
                        let (n, _) = self.expect_ident()?;
                        retain.push(self.intern(&n));
                        if matches!(self.peek(), Tok::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RParen)?;
            } else if self.at_ident("resources") {
                self.advance();
                resources = Some(self.parse_resources()?);
            } else {
                return Err(self.err(self.peek_line(), format!("unexpected stage clause {:?}", self.peek())));
            }
        }
        self.expect(&Tok::RBrace)?;

        let src = src.ok_or_else(|| self.err(line, "stage missing 'src' clause"))?;
        Ok(StageDecl { id, inputs, outputs, src, resources, retain, split, loc: self.loc(line) })
    }

    fn parse_resources(&mut self) -> PResult<ResourceHints> {
        self.expect(&Tok::LBrace)?;
        let mut hints = ResourceHints::default();
        while !matches!(self.peek(), Tok::RBrace) {
            let (key, line) = self.expect_ident()?;
            self.expect(&Tok::Equals)?;
            match key.as_str() {
                "threads" => {
                    hints.threads = Some(self.expect_int(line)? as u32);
                }
                "mem_gb" => {
                    hints.mem_gb = Some(self.expect_int(line)? as u32);
                }
                "special" => {
                    hints.special = Some(self.expect_str()?);
                }
                "strict_volatile" => {
                    hints.strict_volatile = self.expect_bool(line)?;
                }
                other => return Err(self.err(line, format!("unknown resource key '{}'", other))),
            }
            if matches!(self.peek(), Tok::Comma) {
                self.advance();
            }
        }
        self.expect(&Tok::RBrace)?;
        Ok(hints)
    }

    fn expect_int(&mut self, line: u32) -> PResult<i64> {
        match self.advance().tok {
            Tok::Int(v) => Ok(v),
            other => Err(self.err(line, format!("expected integer, found {:?}", other))),
        }
    }

    fn expect_bool(&mut self, line: u32) -> PResult<bool> {
        match self.advance().tok {
            Tok::Ident(s) if s == "true" => Ok(true),
            Tok::Ident(s) if s == "false" => Ok(false),
            other => Err(self.err(line, format!("expected boolean, found {:?}", other))),
        }
    }

    fn parse_pipeline(&mut self) -> PResult<PipelineDecl> {
        let line = self.expect_keyword("pipeline")?;
        let (name, _) = self.expect_ident()?;
        let id = self.intern(&name);
        let (inputs, outputs) = self.parse_param_list()?;
        self.expect(&Tok::LBrace)?;

        let mut calls = Vec::new();
        let mut ret = Vec::new();
        let mut retain = Vec::new();

        while !matches!(self.peek(), Tok::RBrace) {
            if self.at_ident("return") {
                self.advance();
                self.expect(&Tok::LParen)?;
                if !matches!(self.peek(), Tok::RParen) {
                    loop {
                        let (out_name, bline) = self.expect_ident()?;
                        self.expect(&Tok::Equals)?;
                        let expr = self.parse_expr()?;
                        ret.push(ReturnBinding {
                            output: self.intern(&out_name),
                            expr,
                            loc: self.loc(bline),
                        });
                        if matches!(self.peek(), Tok::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RParen)?;
            } else if self.at_ident("retain") {
                self.advance();
                self.expect(&Tok::LParen)?;
                if !matches!(self.peek(), Tok::RParen) {
                    loop {
                        retain.push(self.parse_expr()?);
                        if matches!(self.peek(), Tok::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RParen)?;
            } else {
                calls.push(self.parse_call_stmt()?);
            }
        }
        self.expect(&Tok::RBrace)?;
        Ok(PipelineDecl { id, inputs, outputs, calls, ret, retain, loc: self.loc(line) })
    }

    fn parse_call_stmt(&mut self) -> PResult<CallStmt> {
        let mut modifiers = mro_core::Modifiers::default();
        loop {
            if self.at_ident("volatile") {
                modifiers.volatile = true;
                self.advance();
            } else if self.at_ident("local") {
                modifiers.local = true;
                self.advance();
            } else if self.at_ident("preflight") {
                modifiers.preflight = true;
                self.advance();
            } else if self.at_ident("disabled") {
                modifiers.disabled = true;
                self.advance();
            } else {
                break;
            }
        }
        let line = self.expect_keyword("call")?;
        let (callee_name, _) = self.expect_ident()?;
        let (instance_name, _) = self.expect_ident()?;
        let callee = self.intern(&callee_name);
        let instance_id = self.intern(&instance_name);
        self.expect(&Tok::LParen)?;
        let mut bindings = Vec::new();
        if !matches!(self.peek(), Tok::RParen) {
            loop {
                let (param_name, bline) = self.expect_ident()?;
                self.expect(&Tok::Equals)?;
                let expr = self.parse_expr()?;
                bindings.push(Binding { param: self.intern(&param_name), expr, loc: self.loc(bline) });
                if matches!(self.peek(), Tok::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        Ok(CallStmt { callee, instance_id, modifiers, bindings, loc: self.loc(line) })
    }

    fn parse_top_call(&mut self) -> PResult<TopCall> {
        let line = self.expect_keyword("call")?;
        let (callee_name, _) = self.expect_ident()?;
        let callee = self.intern(&callee_name);
        self.expect(&Tok::LParen)?;
        let mut bindings = Vec::new();
        if !matches!(self.peek(), Tok::RParen) {
            loop {
                let (param_name, bline) = self.expect_ident()?;
                self.expect(&Tok::Equals)?;
                let expr = self.parse_expr()?;
                bindings.push(Binding { param: self.intern(&param_name), expr, loc: self.loc(bline) });
                if matches!(self.peek(), Tok::Comma) {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&Tok::RParen)?;
        Ok(TopCall { callee, bindings, loc: self.loc(line) })
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        if self.at_ident("sweep") {
            self.advance();
            self.expect(&Tok::LParen)?;
            let inner = self.parse_expr()?;
            self.expect(&Tok::RParen)?;
            return Ok(Expr::Sweep(Box::new(inner)));
        }
        if self.at_ident("self") {
            self.advance();
            self.expect(&Tok::Dot)?;
            let (out, _) = self.expect_ident()?;
            return Ok(Expr::Ref(Ref {
                kind: RefKind::SelfParam,
                call_id: None,
                output_id: self.intern(&out),
            }));
        }
        if let Tok::Ident(name) = self.peek().clone() {
            if matches!(self.toks.get(self.pos + 1).map(|s| &s.tok), Some(Tok::Dot)) {
                self.advance();
                self.advance();
                let (out, _) = self.expect_ident()?;
                return Ok(Expr::Ref(Ref {
                    kind: RefKind::Call,
                    call_id: Some(self.intern(&name)),
                    output_id: self.intern(&out),
                }));
            }
        }
        self.parse_literal().map(Expr::Literal)
    }

    fn parse_literal(&mut self) -> PResult<Literal> {
        let line = self.peek_line();
        match self.peek().clone() {
            Tok::Int(v) => {
                self.advance();
                Ok(Literal::Int(v))
            }
            Tok::Float(v) => {
                self.advance();
                Ok(Literal::Float(v))
            }
            Tok::Str(s) => {
                self.advance();
                Ok(Literal::Str(s))
            }
            Tok::Ident(s) if s == "true" => {
                self.advance();
                Ok(Literal::Bool(true))
            }
            Tok::Ident(s) if s == "false" => {
                self.advance();
                Ok(Literal::Bool(false))
            }
            Tok::Ident(s) if s == "null" => {
                self.advance();
                Ok(Literal::Null)
            }
            Tok::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if !matches!(self.peek(), Tok::RBracket) {
                    loop {
                        items.push(self.parse_literal()?);
                        if matches!(self.peek(), Tok::Comma) {
                            self.advance();
                        } else {
                            break;
                        }
                    }
                }
                self.expect(&Tok::RBracket)?;
                Ok(Literal::Array(items))
            }
            other => Err(self.err(line, format!("expected literal, found {:?}", other))),
        }
    }
}

/// Parse a single file's source text into an [`Ast`], interning identifiers
/// as they're encountered.
pub fn parse_file(
    source: &str,
    file_name: &str,
    abs_path: &Path,
    interner: &mut Interner,
) -> PResult<Ast> {
    let toks = lex(source).map_err(|(message, line)| ParseError {
        file: file_name.to_string(),
        line,
        message,
    })?;
    let mut parser = Parser {
        toks,
        pos: 0,
        file: file_name.to_string(),
        abs_path: abs_path.to_path_buf(),
        interner,
    };
    parser.parse_file()
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
