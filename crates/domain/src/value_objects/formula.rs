//! Roll formula parsing and deterministic evaluation
//!
//! Supports the formulas a game master types into a summoning configuration:
//! "10 + @abilities.wis.mod", "@attributes.prof * 5", "max(1, @prof)".
//! Dice terms ("1d20", "2d6kh1") are recognised so a formula can be reported
//! as non-deterministic, but they are never rolled here.

use serde_json::Value;
use std::fmt;
use thiserror::Error;

use super::RollData;

/// Substituted text references may themselves be formulas ("1d4" proficiency
/// dice); nesting deeper than this is treated as a cycle.
const MAX_REFERENCE_DEPTH: usize = 8;

/// Longest formula accepted, in tokens. Bounds how deep the expression tree
/// (and every recursive walk over it) can get.
const MAX_TOKENS: usize = 256;

/// Error when parsing or evaluating a formula
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    /// The formula string is empty
    #[error("Empty formula")]
    Empty,
    /// A character that cannot start any token
    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },
    /// A token in a position the grammar does not allow
    #[error("Unexpected '{found}' at position {position}")]
    UnexpectedToken { found: String, position: usize },
    /// Input ended in the middle of an expression
    #[error("Unexpected end of formula")]
    UnexpectedEnd,
    /// Malformed numeric literal
    #[error("Invalid number: '{0}'")]
    InvalidNumber(String),
    /// Malformed dice term
    #[error("Invalid dice term: '{0}'")]
    InvalidDice(String),
    /// `@` without a path after it
    #[error("Empty reference at position {0}")]
    EmptyReference(usize),
    /// Flavor annotation opened with '[' but never closed
    #[error("Unclosed flavor annotation at position {0}")]
    UnclosedFlavor(usize),
    /// Function name not in the supported set
    #[error("Unknown function: '{0}'")]
    UnknownFunction(String),
    /// Wrong number of arguments for a function
    #[error("Function '{name}' expects {expected} argument(s), got {found}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        found: usize,
    },
    /// A reference resolved to something that is neither a number nor a formula
    #[error("Reference '@{0}' does not resolve to a number")]
    NonNumericReference(String),
    /// References kept expanding into further references
    #[error("Reference '@{0}' nests too deeply")]
    ReferenceDepth(String),
    /// The formula contains dice and cannot be reduced to a single number
    #[error("Formula contains dice and has no single deterministic value")]
    NonDeterministic,
    /// Division or remainder by zero
    #[error("Division by zero")]
    DivisionByZero,
    /// More tokens than any hand-written formula needs
    #[error("Formula is longer than {0} tokens")]
    TooLong(usize),
}

/// A dice term such as `2d6` or `1d20kh1`. Never rolled, only recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceTerm {
    /// Number of dice (X in XdY)
    pub count: u32,
    /// Size of each die (Y in XdY)
    pub faces: u32,
    /// Trailing modifiers such as `kh1` or `r1`, kept verbatim
    pub modifiers: String,
}

impl fmt::Display for DiceTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}{}", self.count, self.faces, self.modifiers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Remainder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Abs,
    Ceil,
    Floor,
    Round,
    Trunc,
    Min,
    Max,
}

impl Function {
    fn lookup(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "abs" => Some(Self::Abs),
            "ceil" => Some(Self::Ceil),
            "floor" => Some(Self::Floor),
            "round" => Some(Self::Round),
            "trunc" => Some(Self::Trunc),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Abs => "abs",
            Self::Ceil => "ceil",
            Self::Floor => "floor",
            Self::Round => "round",
            Self::Trunc => "trunc",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    fn check_arity(self, found: usize) -> Result<(), FormulaError> {
        let ok = match self {
            Self::Min | Self::Max => found >= 1,
            _ => found == 1,
        };
        if ok {
            return Ok(());
        }
        Err(FormulaError::Arity {
            name: self.name(),
            expected: match self {
                Self::Min | Self::Max => "at least 1",
                _ => "1",
            },
            found,
        })
    }

    fn apply(self, args: &[f64]) -> f64 {
        match self {
            Self::Abs => args[0].abs(),
            Self::Ceil => args[0].ceil(),
            Self::Floor => args[0].floor(),
            // Halves round toward positive infinity, so round(-2.5) is -2
            Self::Round => (args[0] + 0.5).floor(),
            Self::Trunc => args[0].trunc(),
            Self::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
            Self::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Reference(String),
    Dice(DiceTerm),
    Negate(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

impl Expr {
    fn has_dice(&self) -> bool {
        match self {
            Expr::Dice(_) => true,
            Expr::Number(_) | Expr::Reference(_) => false,
            Expr::Negate(inner) => inner.has_dice(),
            Expr::Binary { lhs, rhs, .. } => lhs.has_dice() || rhs.has_dice(),
            Expr::Call { args, .. } => args.iter().any(Expr::has_dice),
        }
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Reference(path) => out.push(path),
            Expr::Number(_) | Expr::Dice(_) => {}
            Expr::Negate(inner) => inner.collect_references(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
            Expr::Call { args, .. } => args.iter().for_each(|a| a.collect_references(out)),
        }
    }

    fn evaluate(&self, data: &RollData, depth: usize) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Dice(_) => Err(FormulaError::NonDeterministic),
            Expr::Reference(path) => resolve_reference(path, data, depth),
            Expr::Negate(inner) => Ok(-inner.evaluate(data, depth)?),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.evaluate(data, depth)?;
                let rhs = rhs.evaluate(data, depth)?;
                match op {
                    BinaryOp::Add => Ok(lhs + rhs),
                    BinaryOp::Subtract => Ok(lhs - rhs),
                    BinaryOp::Multiply => Ok(lhs * rhs),
                    BinaryOp::Divide | BinaryOp::Remainder if rhs == 0.0 => {
                        Err(FormulaError::DivisionByZero)
                    }
                    BinaryOp::Divide => Ok(lhs / rhs),
                    BinaryOp::Remainder => Ok(lhs % rhs),
                }
            }
            Expr::Call { function, args } => {
                let values = args
                    .iter()
                    .map(|arg| arg.evaluate(data, depth))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(function.apply(&values))
            }
        }
    }
}

/// Substitute a reference the way the host does: missing values count as zero,
/// text values are read as formulas in their own right.
fn resolve_reference(path: &str, data: &RollData, depth: usize) -> Result<f64, FormulaError> {
    match data.get(path) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| FormulaError::NonNumericReference(path.to_string())),
        Some(Value::String(text)) => {
            if depth >= MAX_REFERENCE_DEPTH {
                return Err(FormulaError::ReferenceDepth(path.to_string()));
            }
            let text = text.trim();
            if text.is_empty() {
                return Ok(0.0);
            }
            let nested = Formula::parse(text)
                .map_err(|_| FormulaError::NonNumericReference(path.to_string()))?;
            nested.expr.evaluate(data, depth + 1)
        }
        Some(_) => Err(FormulaError::NonNumericReference(path.to_string())),
    }
}

/// A parsed formula.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parse a formula string like "10 + @abilities.dex.mod"
    ///
    /// Supported syntax:
    /// - numbers ("12", "0.5")
    /// - references into roll data ("@attributes.prof")
    /// - `+ - * / %`, parentheses and unary signs
    /// - `abs ceil floor round trunc min max`
    /// - dice terms ("1d20", "d8", "4d6kh3")
    /// - flavor annotations after a term ("1d6[fire]"), which are ignored
    pub fn parse(input: &str) -> Result<Self, FormulaError> {
        let source = input.trim();
        if source.is_empty() {
            return Err(FormulaError::Empty);
        }

        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expression()?;
        if let Some(token) = parser.peek() {
            return Err(FormulaError::UnexpectedToken {
                found: token.kind.to_string(),
                position: token.position,
            });
        }

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The trimmed source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the formula has no dice terms of its own.
    ///
    /// References are not followed here; a text reference that expands into
    /// dice still makes [`Formula::evaluate`] fail with `NonDeterministic`.
    pub fn is_deterministic(&self) -> bool {
        !self.expr.has_dice()
    }

    /// Roll data paths referenced by this formula, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.expr.collect_references(&mut refs);
        refs
    }

    /// Substitute roll data and reduce to a single number.
    pub fn evaluate(&self, data: &RollData) -> Result<f64, FormulaError> {
        self.expr.evaluate(data, 0)
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Formula {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Reduce an optional bonus formula to a number.
///
/// Blank input is a zero bonus, anything else must parse and evaluate
/// deterministically.
pub fn simplify_bonus(input: &str, data: &RollData) -> Result<f64, FormulaError> {
    if input.trim().is_empty() {
        return Ok(0.0);
    }
    Formula::parse(input)?.evaluate(data)
}

// ──────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Reference(String),
    Dice(DiceTerm),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(n) => write!(f, "{}", n),
            TokenKind::Reference(path) => write!(f, "@{}", path),
            TokenKind::Dice(dice) => write!(f, "{}", dice),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Percent => f.write_str("%"),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::Comma => f.write_str(","),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    position: usize,
}

fn tokenize(input: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;

        let kind = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '[' => {
                // Flavor text such as "[fire]" carries no value
                let close = chars[i..].iter().position(|&ch| ch == ']');
                match close {
                    Some(offset) => {
                        i += offset + 1;
                        continue;
                    }
                    None => return Err(FormulaError::UnclosedFlavor(start)),
                }
            }
            '+' => single(&mut i, TokenKind::Plus),
            '-' => single(&mut i, TokenKind::Minus),
            '*' => single(&mut i, TokenKind::Star),
            '/' => single(&mut i, TokenKind::Slash),
            '%' => single(&mut i, TokenKind::Percent),
            '(' => single(&mut i, TokenKind::LParen),
            ')' => single(&mut i, TokenKind::RParen),
            ',' => single(&mut i, TokenKind::Comma),
            '@' => {
                i += 1;
                // '-' is left out so "@prof-1" reads as a subtraction
                let path = take_while(&chars, &mut i, |ch| {
                    ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
                });
                let path = path.trim_end_matches('.');
                if path.is_empty() {
                    return Err(FormulaError::EmptyReference(start));
                }
                TokenKind::Reference(path.to_string())
            }
            c if c.is_ascii_digit() || c == '.' => {
                let literal = take_while(&chars, &mut i, |ch| ch.is_ascii_digit() || ch == '.');
                if starts_dice(&chars, i) {
                    let count = literal
                        .parse::<u32>()
                        .map_err(|_| FormulaError::InvalidDice(literal.clone()))?;
                    dice_term(&chars, &mut i, count, &literal)?
                } else {
                    let value = literal
                        .parse::<f64>()
                        .map_err(|_| FormulaError::InvalidNumber(literal.clone()))?;
                    TokenKind::Number(value)
                }
            }
            c if starts_dice(&chars, i) && (c == 'd' || c == 'D') => {
                dice_term(&chars, &mut i, 1, "")?
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let name = take_while(&chars, &mut i, |ch| ch.is_ascii_alphanumeric() || ch == '_');
                TokenKind::Ident(name)
            }
            other => {
                return Err(FormulaError::UnexpectedCharacter {
                    ch: other,
                    position: start,
                })
            }
        };

        if tokens.len() == MAX_TOKENS {
            return Err(FormulaError::TooLong(MAX_TOKENS));
        }
        tokens.push(Token {
            kind,
            position: start,
        });
    }

    Ok(tokens)
}

fn single(i: &mut usize, kind: TokenKind) -> TokenKind {
    *i += 1;
    kind
}

fn take_while(chars: &[char], i: &mut usize, pred: impl Fn(char) -> bool) -> String {
    let start = *i;
    while *i < chars.len() && pred(chars[*i]) {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

/// Whether `chars[i]` is a 'd' immediately followed by a digit.
fn starts_dice(chars: &[char], i: usize) -> bool {
    matches!(chars.get(i), Some('d') | Some('D'))
        && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit())
}

fn dice_term(
    chars: &[char],
    i: &mut usize,
    count: u32,
    count_text: &str,
) -> Result<TokenKind, FormulaError> {
    // Skip the 'd'
    *i += 1;
    let faces_text = take_while(chars, i, |ch| ch.is_ascii_digit());
    let modifiers = take_while(chars, i, |ch| ch.is_ascii_alphanumeric());
    let raw = format!("{}d{}{}", count_text, faces_text, modifiers);

    let faces = faces_text
        .parse::<u32>()
        .map_err(|_| FormulaError::InvalidDice(raw.clone()))?;
    if count == 0 || faces == 0 {
        return Err(FormulaError::InvalidDice(raw));
    }

    Ok(TokenKind::Dice(DiceTerm {
        count,
        faces,
        modifiers,
    }))
}

// ──────────────────────────────────────────────────────────────────────────────
// Parser
// ──────────────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().map(|t| &t.kind) == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), FormulaError> {
        match self.next() {
            Some(token) if &token.kind == kind => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken {
                found: token.kind.to_string(),
                position: token.position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Subtract,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Star) => BinaryOp::Multiply,
                Some(TokenKind::Slash) => BinaryOp::Divide,
                Some(TokenKind::Percent) => BinaryOp::Remainder,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    /// unary := ('+' | '-') unary | primary
    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        if self.eat(&TokenKind::Minus) {
            return Ok(Expr::Negate(Box::new(self.unary()?)));
        }
        self.primary()
    }

    /// primary := number | reference | dice | '(' expression ')' | ident '(' args ')'
    fn primary(&mut self) -> Result<Expr, FormulaError> {
        let token = self.next().ok_or(FormulaError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Reference(path) => Ok(Expr::Reference(path)),
            TokenKind::Dice(dice) => Ok(Expr::Dice(dice)),
            TokenKind::LParen => {
                let inner = self.expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                let function =
                    Function::lookup(&name).ok_or(FormulaError::UnknownFunction(name))?;
                self.expect(&TokenKind::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&TokenKind::RParen) {
                    loop {
                        args.push(self.expression()?);
                        if self.eat(&TokenKind::Comma) {
                            continue;
                        }
                        self.expect(&TokenKind::RParen)?;
                        break;
                    }
                }
                function.check_arity(args.len())?;
                Ok(Expr::Call { function, args })
            }
            other => Err(FormulaError::UnexpectedToken {
                found: other.to_string(),
                position: token.position,
            }),
        }
    }
}
