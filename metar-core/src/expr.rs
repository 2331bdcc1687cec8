//! Small expression language for flight-category rules.
//!
//! Rule thresholds live in configuration, not code, so each category carries
//! boolean expressions over exactly two bound features: `ceiling` (feet AGL)
//! and `visibility` (statute miles). The grammar is limited to numeric
//! literals, those two identifiers, arithmetic, comparisons and `and`/`or`.
//! That is enough for any flight-rule table, with no side effects and no
//! access to anything else.

use thiserror::Error;

use crate::classify::Features;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unknown identifier '{0}': only 'ceiling' and 'visibility' are bound")]
    UnknownIdentifier(String),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// The two numeric inputs every rule expression is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Ceiling,
    Visibility,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

/// Tagged expression tree. Built once at configuration load, evaluated on
/// every classification pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Feature(Feature),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ty {
    Num,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    Num(f64),
    Bool(bool),
}

impl Expr {
    /// Parse and type-check a rule clause. The result is guaranteed to
    /// evaluate to a boolean.
    pub fn parse(src: &str) -> Result<Self, ExprError> {
        let tokens = tokenize(src)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.or_expr()?;

        if let Some(tok) = parser.peek() {
            return Err(ExprError::UnexpectedToken(tok.display()));
        }

        match expr.check()? {
            Ty::Bool => Ok(expr),
            Ty::Num => Err(ExprError::TypeMismatch(
                "expression yields a number, expected a condition".to_string(),
            )),
        }
    }

    /// Evaluate against a feature set. `parse` already type-checked the
    /// tree, so evaluation cannot fail.
    pub fn matches(&self, features: &Features) -> bool {
        matches!(self.eval(features), Value::Bool(true))
    }

    fn eval(&self, features: &Features) -> Value {
        match self {
            Expr::Num(n) => Value::Num(*n),
            Expr::Feature(Feature::Ceiling) => Value::Num(features.ceiling_ft),
            Expr::Feature(Feature::Visibility) => Value::Num(features.visibility_mi),
            Expr::Neg(inner) => match inner.eval(features) {
                Value::Num(n) => Value::Num(-n),
                v @ Value::Bool(_) => v,
            },
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.eval(features);
                let r = rhs.eval(features);
                match (op, l, r) {
                    (BinOp::Add, Value::Num(a), Value::Num(b)) => Value::Num(a + b),
                    (BinOp::Sub, Value::Num(a), Value::Num(b)) => Value::Num(a - b),
                    (BinOp::Mul, Value::Num(a), Value::Num(b)) => Value::Num(a * b),
                    (BinOp::Div, Value::Num(a), Value::Num(b)) => Value::Num(a / b),
                    (BinOp::Lt, Value::Num(a), Value::Num(b)) => Value::Bool(a < b),
                    (BinOp::Le, Value::Num(a), Value::Num(b)) => Value::Bool(a <= b),
                    (BinOp::Gt, Value::Num(a), Value::Num(b)) => Value::Bool(a > b),
                    (BinOp::Ge, Value::Num(a), Value::Num(b)) => Value::Bool(a >= b),
                    (BinOp::Eq, Value::Num(a), Value::Num(b)) => Value::Bool(a == b),
                    (BinOp::Ne, Value::Num(a), Value::Num(b)) => Value::Bool(a != b),
                    (BinOp::And, Value::Bool(a), Value::Bool(b)) => Value::Bool(a && b),
                    (BinOp::Or, Value::Bool(a), Value::Bool(b)) => Value::Bool(a || b),
                    // Unreachable after check(); a false match is the safe
                    // outcome if it ever happens.
                    _ => Value::Bool(false),
                }
            }
        }
    }

    fn check(&self) -> Result<Ty, ExprError> {
        match self {
            Expr::Num(_) | Expr::Feature(_) => Ok(Ty::Num),
            Expr::Neg(inner) => match inner.check()? {
                Ty::Num => Ok(Ty::Num),
                Ty::Bool => Err(ExprError::TypeMismatch(
                    "cannot negate a condition".to_string(),
                )),
            },
            Expr::Binary { op, lhs, rhs } => {
                let l = lhs.check()?;
                let r = rhs.check()?;
                match op {
                    BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div => {
                        if l == Ty::Num && r == Ty::Num {
                            Ok(Ty::Num)
                        } else {
                            Err(ExprError::TypeMismatch(format!(
                                "'{}' needs numeric operands",
                                op.symbol()
                            )))
                        }
                    }
                    BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
                        if l == Ty::Num && r == Ty::Num {
                            Ok(Ty::Bool)
                        } else {
                            Err(ExprError::TypeMismatch(format!(
                                "'{}' compares numbers, not conditions",
                                op.symbol()
                            )))
                        }
                    }
                    BinOp::And | BinOp::Or => {
                        if l == Ty::Bool && r == Ty::Bool {
                            Ok(Ty::Bool)
                        } else {
                            Err(ExprError::TypeMismatch(format!(
                                "'{}' combines conditions, not numbers",
                                op.symbol()
                            )))
                        }
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Op(BinOp),
    LParen,
    RParen,
    Minus,
}

impl Token {
    fn display(&self) -> String {
        match self {
            Token::Num(n) => n.to_string(),
            Token::Ident(s) => s.clone(),
            Token::Op(op) => op.symbol().to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Minus => "-".to_string(),
        }
    }
}

fn tokenize(src: &str) -> Result<Vec<Token>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = src.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let n: f64 = text
                    .parse()
                    .map_err(|_| ExprError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut text = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        text.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match text.as_str() {
                    "and" => tokens.push(Token::Op(BinOp::And)),
                    "or" => tokens.push(Token::Op(BinOp::Or)),
                    "ceiling" => tokens.push(Token::Ident(text)),
                    "visibility" => tokens.push(Token::Ident(text)),
                    _ => return Err(ExprError::UnknownIdentifier(text)),
                }
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Add));
            }
            '-' => {
                chars.next();
                tokens.push(Token::Minus);
            }
            '*' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Mul));
            }
            '/' => {
                chars.next();
                tokens.push(Token::Op(BinOp::Div));
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Le));
                } else {
                    tokens.push(Token::Op(BinOp::Lt));
                }
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Ge));
                } else {
                    tokens.push(Token::Op(BinOp::Gt));
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Eq));
                } else {
                    return Err(ExprError::UnexpectedChar('='));
                }
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Ne));
                } else {
                    return Err(ExprError::UnexpectedChar('!'));
                }
            }
            '&' => {
                chars.next();
                if chars.peek() == Some(&'&') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::And));
                } else {
                    return Err(ExprError::UnexpectedChar('&'));
                }
            }
            '|' => {
                chars.next();
                if chars.peek() == Some(&'|') {
                    chars.next();
                    tokens.push(Token::Op(BinOp::Or));
                } else {
                    return Err(ExprError::UnexpectedChar('|'));
                }
            }
            other => return Err(ExprError::UnexpectedChar(other)),
        }
    }

    if tokens.is_empty() {
        return Err(ExprError::Empty);
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn or_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.and_expr()?;
        while self.peek() == Some(&Token::Op(BinOp::Or)) {
            self.next();
            let rhs = self.and_expr()?;
            lhs = Expr::Binary {
                op: BinOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.comparison()?;
        while self.peek() == Some(&Token::Op(BinOp::And)) {
            self.next();
            let rhs = self.comparison()?;
            lhs = Expr::Binary {
                op: BinOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let lhs = self.additive()?;
        let op = match self.peek() {
            Some(Token::Op(
                op @ (BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne),
            )) => *op,
            _ => return Ok(lhs),
        };
        self.next();
        let rhs = self.additive()?;
        Ok(Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(BinOp::Add)) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => break,
            };
            self.next();
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Op(BinOp::Mul)) => BinOp::Mul,
                Some(Token::Op(BinOp::Div)) => BinOp::Div,
                _ => break,
            };
            self.next();
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek() == Some(&Token::Minus) {
            self.next();
            let inner = self.unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(Expr::Num(n)),
            Some(Token::Ident(name)) => match name.as_str() {
                "ceiling" => Ok(Expr::Feature(Feature::Ceiling)),
                "visibility" => Ok(Expr::Feature(Feature::Visibility)),
                other => Err(ExprError::UnknownIdentifier(other.to_string())),
            },
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken(tok.display())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(ExprError::UnexpectedToken(tok.display())),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}
