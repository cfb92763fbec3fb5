#![forbid(unsafe_code)]

//! Reference [`ScriptEngine`]: a small tree-walking expression interpreter.
//!
//! The language covers what binding expressions typically use: number,
//! string, boolean, `null` and `undefined` literals; array literals; `this`;
//! free identifiers (resolved through [`CallContext::lookup`]); member
//! access and indexing; calls; arrow functions `(a, b) => expr`; unary,
//! arithmetic, comparison, equality, logical and conditional operators; and
//! the `binding(fn)` helper that marks a function as a binding expression.
//!
//! Every property read goes through the graph, so evaluating an expression
//! while a collector is active records exactly the properties it touched.
//!
//! # Failure Modes
//!
//! - **Syntax error**: [`CompileError`] with the 1-based line and column of
//!   the offending token, offset by the starting line passed to `compile`.
//! - **Unknown identifier**: `ReferenceError` thrown at evaluation time.
//! - **Member access on null/undefined, call of a non-function**: `TypeError`.

use std::rc::Rc;

use crate::coerce::{self, number_to_string};
use crate::script::{CallContext, CompileError, CompiledFunction, ScriptEngine, ScriptException, SourceLocation};
use crate::value::{DynValue, FunctionValue};

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Number(f64),
    Str(Rc<str>),
    Ident(Rc<str>),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone)]
struct Token {
    tok: Tok,
    line: u32,
    column: u32,
}

const PUNCTUATION: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "=>", "+", "-", "*", "/", "%", "<", ">", "!", "?", ":", ".",
    ",", "(", ")", "[", "]",
];

struct SyntaxError {
    message: String,
    line: u32,
    column: u32,
}

fn tokenize(source: &str) -> Result<Vec<Token>, SyntaxError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let (mut i, mut line, mut column) = (0usize, 1u32, 1u32);

    while i < chars.len() {
        let c = chars[i];
        if c == '\n' {
            i += 1;
            line += 1;
            column = 1;
            continue;
        }
        if c.is_whitespace() {
            i += 1;
            column += 1;
            continue;
        }
        let (start_line, start_column) = (line, column);
        let start = i;

        let tok = if c.is_ascii_digit() || (c == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit)) {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            if i < chars.len() && matches!(chars[i], 'e' | 'E') {
                i += 1;
                if i < chars.len() && matches!(chars[i], '+' | '-') {
                    i += 1;
                }
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
            }
            let text: String = chars[start..i].iter().collect();
            let value = text.parse::<f64>().map_err(|_| SyntaxError {
                message: format!("Invalid number literal `{text}`"),
                line: start_line,
                column: start_column,
            })?;
            Tok::Number(value)
        } else if c == '"' || c == '\'' {
            i += 1;
            let mut text = String::new();
            loop {
                let Some(&ch) = chars.get(i) else {
                    return Err(SyntaxError {
                        message: "Unterminated string literal".into(),
                        line: start_line,
                        column: start_column,
                    });
                };
                i += 1;
                match ch {
                    '\\' => {
                        let escaped = chars.get(i).copied().unwrap_or('\\');
                        i += 1;
                        text.push(match escaped {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            other => other,
                        });
                    }
                    '\n' => {
                        return Err(SyntaxError {
                            message: "Unterminated string literal".into(),
                            line: start_line,
                            column: start_column,
                        });
                    }
                    ch if ch == c => break,
                    ch => text.push(ch),
                }
            }
            Tok::Str(Rc::from(text))
        } else if c.is_alphabetic() || c == '_' || c == '$' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            Tok::Ident(Rc::from(text))
        } else {
            let rest: String = chars[i..chars.len().min(i + 3)].iter().collect();
            let Some(p) = PUNCTUATION.iter().copied().find(|p| rest.starts_with(*p)) else {
                return Err(SyntaxError {
                    message: format!("Unexpected character `{c}`"),
                    line: start_line,
                    column: start_column,
                });
            };
            i += p.chars().count();
            Tok::Punct(p)
        };

        column += (i - start) as u32;
        tokens.push(Token {
            tok,
            line: start_line,
            column: start_column,
        });
    }

    tokens.push(Token { tok: Tok::Eof, line, column });
    Ok(tokens)
}

// ============================================================================
// Syntax tree
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug)]
enum Expr {
    Literal(DynValue),
    Array(Vec<Expr>),
    This,
    Ident(Rc<str>),
    Member(Box<Expr>, Rc<str>),
    Index(Box<Expr>, Box<Expr>),
    Call(Box<Expr>, Vec<Expr>),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
    Arrow {
        params: Rc<[Rc<str>]>,
        body: Rc<Expr>,
        location: SourceLocation,
    },
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'s> {
    tokens: Vec<Token>,
    pos: usize,
    url: &'s str,
    base_line: u32,
}

impl Parser<'_> {
    fn peek(&self) -> &Tok {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].tok
    }

    fn peek_at(&self, offset: usize) -> &Tok {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].tok
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Tok::Punct(p) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn location(&self) -> SourceLocation {
        let token = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        SourceLocation::new(self.url, self.base_line + token.line - 1, token.column)
    }

    fn error(&self, message: impl Into<String>) -> CompileError {
        let location = self.location();
        CompileError {
            message: message.into(),
            url: location.url,
            line: location.line,
            column: location.column,
        }
    }

    fn unexpected(&self) -> CompileError {
        match self.peek() {
            Tok::Eof => self.error("Unexpected end of input"),
            Tok::Number(n) => self.error(format!("Unexpected number `{}`", number_to_string(*n))),
            Tok::Str(_) => self.error("Unexpected string"),
            Tok::Ident(name) => self.error(format!("Unexpected identifier `{name}`")),
            Tok::Punct(p) => self.error(format!("Unexpected token `{p}`")),
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), CompileError> {
        if self.eat(punct) { Ok(()) } else { Err(self.unexpected()) }
    }

    fn parse_program(&mut self) -> Result<Expr, CompileError> {
        let expr = self.expression()?;
        if *self.peek() != Tok::Eof {
            return Err(self.unexpected());
        }
        Ok(expr)
    }

    fn expression(&mut self) -> Result<Expr, CompileError> {
        if let Some(params) = self.arrow_params() {
            let location = self.location();
            self.pos += params.1;
            let body = self.expression()?;
            return Ok(Expr::Arrow {
                params: params.0.into(),
                body: Rc::new(body),
                location,
            });
        }
        self.conditional()
    }

    /// Recognise an arrow-function head without consuming it. Returns the
    /// parameter names and the number of tokens up to and including `=>`.
    fn arrow_params(&self) -> Option<(Vec<Rc<str>>, usize)> {
        if let Tok::Ident(name) = self.peek() {
            return matches!(self.peek_at(1), Tok::Punct("=>")).then(|| (vec![Rc::clone(name)], 2));
        }
        if !matches!(self.peek(), Tok::Punct("(")) {
            return None;
        }
        let mut params = Vec::new();
        let mut offset = 1;
        loop {
            match self.peek_at(offset) {
                Tok::Punct(")") if params.is_empty() || !matches!(self.peek_at(offset - 1), Tok::Punct(",")) => break,
                Tok::Ident(name) => {
                    params.push(Rc::clone(name));
                    offset += 1;
                    match self.peek_at(offset) {
                        Tok::Punct(",") => offset += 1,
                        Tok::Punct(")") => break,
                        _ => return None,
                    }
                }
                _ => return None,
            }
        }
        matches!(self.peek_at(offset + 1), Tok::Punct("=>")).then_some((params, offset + 2))
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        let test = self.or()?;
        if self.eat("?") {
            let then = self.expression()?;
            self.expect(":")?;
            let otherwise = self.expression()?;
            return Ok(Expr::Conditional(Box::new(test), Box::new(then), Box::new(otherwise)));
        }
        Ok(test)
    }

    fn or(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.and()?;
        while self.eat("||") {
            lhs = Expr::Or(Box::new(lhs), Box::new(self.and()?));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, CompileError> {
        let mut lhs = self.equality()?;
        while self.eat("&&") {
            lhs = Expr::And(Box::new(lhs), Box::new(self.equality()?));
        }
        Ok(lhs)
    }

    fn binary_level(
        &mut self,
        ops: &[(&str, BinOp)],
        next: fn(&mut Self) -> Result<Expr, CompileError>,
    ) -> Result<Expr, CompileError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (punct, op) in ops {
                if self.eat(punct) {
                    lhs = Expr::Binary(*op, Box::new(lhs), Box::new(next(self)?));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[
                ("===", BinOp::StrictEq),
                ("!==", BinOp::StrictNe),
                ("==", BinOp::Eq),
                ("!=", BinOp::Ne),
            ],
            Self::comparison,
        )
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            &[("<=", BinOp::Le), (">=", BinOp::Ge), ("<", BinOp::Lt), (">", BinOp::Gt)],
            Self::additive,
        )
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[("+", BinOp::Add), ("-", BinOp::Sub)], Self::multiplicative)
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(&[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)], Self::unary)
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        let op = if self.eat("!") {
            UnOp::Not
        } else if self.eat("-") {
            UnOp::Neg
        } else if self.eat("+") {
            UnOp::Plus
        } else {
            return self.postfix();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(".") {
                let Tok::Ident(name) = self.peek().clone() else {
                    return Err(self.unexpected());
                };
                self.pos += 1;
                expr = Expr::Member(Box::new(expr), name);
            } else if self.eat("[") {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.eat("(") {
                let args = self.list(")")?;
                expr = Expr::Call(Box::new(expr), args);
            } else {
                return Ok(expr);
            }
        }
    }

    fn list(&mut self, close: &str) -> Result<Vec<Expr>, CompileError> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(",")?;
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let token = self.advance();
        let at_eof = token.tok == Tok::Eof;
        match token.tok {
            Tok::Number(n) => Ok(Expr::Literal(number_value(n))),
            Tok::Str(s) => Ok(Expr::Literal(DynValue::String(s))),
            Tok::Ident(name) => Ok(match &*name {
                "true" => Expr::Literal(DynValue::Bool(true)),
                "false" => Expr::Literal(DynValue::Bool(false)),
                "null" => Expr::Literal(DynValue::Null),
                "undefined" => Expr::Literal(DynValue::Undefined),
                "this" => Expr::This,
                _ => Expr::Ident(name),
            }),
            Tok::Punct("(") => {
                let inner = self.expression()?;
                self.expect(")")?;
                Ok(inner)
            }
            Tok::Punct("[") => Ok(Expr::Array(self.list("]")?)),
            _ => {
                if !at_eof {
                    self.pos -= 1;
                }
                Err(self.unexpected())
            }
        }
    }
}

/// Integral numbers in `i32` range are ints, everything else a double.
fn number_value(n: f64) -> DynValue {
    if n.fract() == 0.0 && n >= f64::from(i32::MIN) && n <= f64::from(i32::MAX) && !(n == 0.0 && n.is_sign_negative()) {
        DynValue::Int(n as i32)
    } else {
        DynValue::Double(n)
    }
}

// ============================================================================
// Evaluation
// ============================================================================

type Locals = Vec<(Rc<str>, DynValue)>;

fn to_number(value: &DynValue) -> f64 {
    match value {
        DynValue::Int(i) => f64::from(*i),
        DynValue::Double(d) => *d,
        DynValue::Bool(b) => f64::from(u8::from(*b)),
        DynValue::Null => 0.0,
        DynValue::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() { 0.0 } else { trimmed.parse().unwrap_or(f64::NAN) }
        }
        DynValue::Variant(v) => to_number(&coerce::variant_to_dyn(v)),
        _ => f64::NAN,
    }
}

fn to_display(value: &DynValue, cx: &CallContext<'_>) -> String {
    match value {
        DynValue::Undefined => "undefined".into(),
        DynValue::Null => "null".into(),
        DynValue::Bool(b) => b.to_string(),
        DynValue::Int(i) => i.to_string(),
        DynValue::Double(d) => number_to_string(*d),
        DynValue::String(s) => s.to_string(),
        DynValue::Object(_) => format!("[object {}]", coerce::dyn_type_name(value, cx.graph)),
        DynValue::Variant(v) => to_display(&coerce::variant_to_dyn(v), cx),
        DynValue::Value(_) => coerce::dyn_type_name(value, cx.graph),
        DynValue::Array(items) => items.iter().map(|v| to_display(v, cx)).collect::<Vec<_>>().join(","),
        DynValue::Function(f) => format!("function {}() {{ [code] }}", f.function.name()),
    }
}

fn unwrap(value: DynValue) -> DynValue {
    match value {
        DynValue::Variant(v) => coerce::variant_to_dyn(&v),
        other => other,
    }
}

fn strict_equals(a: &DynValue, b: &DynValue) -> bool {
    match (a, b) {
        (DynValue::Int(_) | DynValue::Double(_), DynValue::Int(_) | DynValue::Double(_)) => to_number(a) == to_number(b),
        (DynValue::Array(x), DynValue::Array(y)) => Rc::ptr_eq(x, y),
        _ => a == b,
    }
}

fn loose_equals(a: &DynValue, b: &DynValue) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() && y.is_nullish() => true,
        (x, y) if x.is_nullish() || y.is_nullish() => false,
        (DynValue::String(_) | DynValue::Bool(_), DynValue::Int(_) | DynValue::Double(_))
        | (DynValue::Int(_) | DynValue::Double(_), DynValue::String(_) | DynValue::Bool(_))
        | (DynValue::Bool(_), DynValue::String(_))
        | (DynValue::String(_), DynValue::Bool(_)) => to_number(a) == to_number(b),
        _ => strict_equals(a, b),
    }
}

fn arithmetic(op: BinOp, a: &DynValue, b: &DynValue) -> DynValue {
    if let (DynValue::Int(x), DynValue::Int(y)) = (a, b) {
        let exact = match op {
            BinOp::Add => x.checked_add(*y),
            BinOp::Sub => x.checked_sub(*y),
            BinOp::Mul => x.checked_mul(*y).filter(|r| *r != 0 || (*x >= 0 && *y >= 0)),
            BinOp::Div => x.checked_rem(*y).filter(|r| *r == 0).and_then(|_| x.checked_div(*y)),
            BinOp::Rem => (*x >= 0).then(|| x.checked_rem(*y)).flatten(),
            _ => None,
        };
        if let Some(r) = exact {
            return DynValue::Int(r);
        }
    }
    let (x, y) = (to_number(a), to_number(b));
    let r = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => x / y,
        _ => x % y,
    };
    number_value(r)
}

fn compare(op: BinOp, a: &DynValue, b: &DynValue) -> bool {
    if let (DynValue::String(x), DynValue::String(y)) = (a, b) {
        return match op {
            BinOp::Lt => x < y,
            BinOp::Le => x <= y,
            BinOp::Gt => x > y,
            _ => x >= y,
        };
    }
    let (x, y) = (to_number(a), to_number(b));
    match op {
        BinOp::Lt => x < y,
        BinOp::Le => x <= y,
        BinOp::Gt => x > y,
        _ => x >= y,
    }
}

fn binding_helper() -> DynValue {
    let function = CompiledFunction::native("binding", SourceLocation::default(), |cx| match cx.arg(0) {
        DynValue::Function(f) => Ok(DynValue::Function(FunctionValue {
            function: f.function,
            binding_helper: true,
        })),
        _ => Err(ScriptException::type_error(
            "binding(): argument (binding expression) must be a function",
        )),
    });
    DynValue::Function(FunctionValue {
        function,
        binding_helper: false,
    })
}

fn member(object: DynValue, name: &str, cx: &CallContext<'_>) -> Result<DynValue, ScriptException> {
    match unwrap(object) {
        DynValue::Object(id) => cx.get(id, name),
        DynValue::Value(v) => Ok(cx
            .graph
            .registry()
            .value_type(v.ty)
            .and_then(|info| info.field_index(name))
            .and_then(|i| v.field(i))
            .map_or(DynValue::Undefined, number_value)),
        DynValue::String(s) if name == "length" => Ok(DynValue::Int(s.chars().count() as i32)),
        DynValue::Array(items) if name == "length" => Ok(DynValue::Int(items.len() as i32)),
        v if v.is_nullish() => Err(ScriptException::type_error(format!(
            "Cannot read property '{name}' of {}",
            to_display(&v, cx)
        ))),
        _ => Ok(DynValue::Undefined),
    }
}

fn eval(expr: &Expr, cx: &CallContext<'_>, locals: &Rc<Locals>) -> Result<DynValue, ScriptException> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Array(items) => {
            let values = items.iter().map(|e| eval(e, cx, locals)).collect::<Result<Vec<_>, _>>()?;
            Ok(DynValue::array(values))
        }
        Expr::This => Ok(cx.this.map_or(DynValue::Undefined, DynValue::Object)),
        Expr::Ident(name) => {
            if let Some((_, v)) = locals.iter().rev().find(|(n, _)| n == name) {
                return Ok(v.clone());
            }
            match cx.lookup(name) {
                Err(_) if &**name == "binding" => Ok(binding_helper()),
                other => other,
            }
        }
        Expr::Member(object, name) => member(eval(object, cx, locals)?, name, cx),
        Expr::Index(object, index) => {
            let object = unwrap(eval(object, cx, locals)?);
            let index = eval(index, cx, locals)?;
            match (&object, &index) {
                (DynValue::Array(items), _) => {
                    let n = to_number(&index);
                    Ok(if n.fract() == 0.0 && n >= 0.0 {
                        items.get(n as usize).cloned().unwrap_or_default()
                    } else {
                        DynValue::Undefined
                    })
                }
                (_, DynValue::String(key)) => member(object.clone(), key, cx),
                _ => member(object.clone(), &to_display(&index, cx), cx),
            }
        }
        Expr::Call(callee, args) => {
            let (this, function) = match &**callee {
                Expr::Member(object, name) => {
                    let receiver = unwrap(eval(object, cx, locals)?);
                    let this = match &receiver {
                        DynValue::Object(id) => Some(*id),
                        _ => cx.this,
                    };
                    (this, member(receiver, name, cx)?)
                }
                other => (cx.this, eval(other, cx, locals)?),
            };
            let DynValue::Function(function) = unwrap(function) else {
                return Err(ScriptException::type_error("value is not a function"));
            };
            let args = args.iter().map(|e| eval(e, cx, locals)).collect::<Result<Vec<_>, _>>()?;
            cx.call(&function, this, &args)
        }
        Expr::Unary(op, operand) => {
            let v = unwrap(eval(operand, cx, locals)?);
            Ok(match op {
                UnOp::Not => DynValue::Bool(!v.truthy()),
                UnOp::Plus => match v {
                    DynValue::Int(_) => v,
                    other => number_value(to_number(&other)),
                },
                UnOp::Neg => match v {
                    DynValue::Int(i) if i != 0 => i.checked_neg().map_or(DynValue::Double(-f64::from(i)), DynValue::Int),
                    other => number_value(-to_number(&other)),
                },
            })
        }
        Expr::Binary(op, lhs, rhs) => {
            let a = unwrap(eval(lhs, cx, locals)?);
            let b = unwrap(eval(rhs, cx, locals)?);
            Ok(match op {
                BinOp::Add if matches!(a, DynValue::String(_)) || matches!(b, DynValue::String(_)) => {
                    DynValue::string(format!("{}{}", to_display(&a, cx), to_display(&b, cx)))
                }
                BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => arithmetic(*op, &a, &b),
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => DynValue::Bool(compare(*op, &a, &b)),
                BinOp::Eq => DynValue::Bool(loose_equals(&a, &b)),
                BinOp::Ne => DynValue::Bool(!loose_equals(&a, &b)),
                BinOp::StrictEq => DynValue::Bool(strict_equals(&a, &b)),
                BinOp::StrictNe => DynValue::Bool(!strict_equals(&a, &b)),
            })
        }
        Expr::And(lhs, rhs) => {
            let a = eval(lhs, cx, locals)?;
            if a.truthy() { eval(rhs, cx, locals) } else { Ok(a) }
        }
        Expr::Or(lhs, rhs) => {
            let a = eval(lhs, cx, locals)?;
            if a.truthy() { Ok(a) } else { eval(rhs, cx, locals) }
        }
        Expr::Conditional(test, then, otherwise) => {
            if eval(test, cx, locals)?.truthy() {
                eval(then, cx, locals)
            } else {
                eval(otherwise, cx, locals)
            }
        }
        Expr::Arrow { params, body, location } => {
            let captured = Rc::clone(locals);
            let params = Rc::clone(params);
            let body = Rc::clone(body);
            let function = CompiledFunction::native("<arrow>", location.clone(), move |cx| {
                let mut frame: Locals = (*captured).clone();
                frame.extend(params.iter().enumerate().map(|(i, p)| (Rc::clone(p), cx.arg(i))));
                eval(&body, cx, &Rc::new(frame))
            });
            Ok(DynValue::Function(FunctionValue {
                function,
                binding_helper: false,
            }))
        }
    }
}

/// Tree-walking interpreter for binding expressions.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ScriptEngine for Interpreter {
    fn compile(&self, source: &str, url: &str, line: u32) -> Result<CompiledFunction, CompileError> {
        let base_line = line.max(1);
        let tokens = tokenize(source).map_err(|e| CompileError {
            message: e.message,
            url: url.to_string(),
            line: base_line + e.line - 1,
            column: e.column,
        })?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            url,
            base_line,
        };
        let location = parser.location();
        let expr = Rc::new(parser.parse_program()?);
        let name = source.trim().to_string();
        Ok(CompiledFunction::native(name, location, move |cx| {
            eval(&expr, cx, &Rc::new(Locals::new()))
        }))
    }
}
