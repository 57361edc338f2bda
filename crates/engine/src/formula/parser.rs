// Formula parser - converts formula text (without the leading '=') into an AST
// Supports: numbers, cell refs (A1), basic math (+, -, *, /), unary +/-, parentheses

use crate::position::{Limits, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    /// Reference to a cell inside the sheet limits
    CellRef(Position),
    /// Lexically valid reference that does not name a cell of the sheet
    /// (outside the limits, or row 0). Kept as written; evaluates to #REF!
    InvalidRef(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BinaryOp {
        op: Op,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(self) -> char {
        match self {
            Op::Add => '+',
            Op::Sub => '-',
            Op::Mul => '*',
            Op::Div => '/',
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Op::Add | Op::Sub => 1,
            Op::Mul | Op::Div => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

const UNARY_PRECEDENCE: u8 = 3;
const ATOM_PRECEDENCE: u8 = 4;

/// Parse formula text (the part after '=') into an AST.
///
/// Cell references are bound against `limits`: names outside them become
/// [`Expr::InvalidRef`] rather than a parse error.
pub fn parse(input: &str, limits: &Limits) -> Result<Expr, String> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err("Empty formula".to_string());
    }
    let (expr, pos) = parse_add_sub(&tokens, 0, limits)?;
    if pos < tokens.len() {
        return Err(format!("Unexpected token at position {}", pos));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    /// Cell name as written (e.g. "B12")
    Cell(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => { chars.next(); }
            '+' => { tokens.push(Token::Plus); chars.next(); }
            '-' => { tokens.push(Token::Minus); chars.next(); }
            '*' => { tokens.push(Token::Star); chars.next(); }
            '/' => { tokens.push(Token::Slash); chars.next(); }
            '(' => { tokens.push(Token::LParen); chars.next(); }
            ')' => { tokens.push(Token::RParen); chars.next(); }
            'A'..='Z' => {
                // Column letters then row digits, nothing else glued on
                let mut name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_uppercase() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let letters = name.len();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() {
                        name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.len() == letters {
                    return Err(format!("Invalid cell reference: {}", name));
                }
                if let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                        return Err(format!("Invalid cell reference: {}{}", name, ch));
                    }
                }
                tokens.push(Token::Cell(name));
            }
            '0'..='9' | '.' => {
                let mut num_str = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        num_str.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                // Exponent: e/E, optional sign, at least one digit
                if let Some(&e) = chars.peek() {
                    if e == 'e' || e == 'E' {
                        num_str.push(e);
                        chars.next();
                        if let Some(&sign) = chars.peek() {
                            if sign == '+' || sign == '-' {
                                num_str.push(sign);
                                chars.next();
                            }
                        }
                        while let Some(&d) = chars.peek() {
                            if d.is_ascii_digit() {
                                num_str.push(d);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                    }
                }
                let num: f64 = num_str.parse().map_err(|_| format!("Invalid number: {}", num_str))?;
                if !num.is_finite() {
                    return Err(format!("Number out of range: {}", num_str));
                }
                tokens.push(Token::Number(num));
            }
            _ => return Err(format!("Unexpected character: {}", c)),
        }
    }

    Ok(tokens)
}

fn parse_add_sub(tokens: &[Token], pos: usize, limits: &Limits) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_mul_div(tokens, pos, limits)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Plus => Op::Add,
            Token::Minus => Op::Sub,
            _ => break,
        };
        let (right, new_pos) = parse_mul_div(tokens, pos + 1, limits)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

fn parse_mul_div(tokens: &[Token], pos: usize, limits: &Limits) -> Result<(Expr, usize), String> {
    let (mut left, mut pos) = parse_unary(tokens, pos, limits)?;

    while pos < tokens.len() {
        let op = match &tokens[pos] {
            Token::Star => Op::Mul,
            Token::Slash => Op::Div,
            _ => break,
        };
        let (right, new_pos) = parse_unary(tokens, pos + 1, limits)?;
        left = Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        pos = new_pos;
    }

    Ok((left, pos))
}

// Prefix +/- bind tighter than any binary operator
fn parse_unary(tokens: &[Token], pos: usize, limits: &Limits) -> Result<(Expr, usize), String> {
    let op = match tokens.get(pos) {
        Some(Token::Plus) => UnaryOp::Plus,
        Some(Token::Minus) => UnaryOp::Minus,
        _ => return parse_primary(tokens, pos, limits),
    };
    let (operand, pos) = parse_unary(tokens, pos + 1, limits)?;
    Ok((
        Expr::Unary {
            op,
            operand: Box::new(operand),
        },
        pos,
    ))
}

fn parse_primary(tokens: &[Token], pos: usize, limits: &Limits) -> Result<(Expr, usize), String> {
    if pos >= tokens.len() {
        return Err("Unexpected end of expression".to_string());
    }

    match &tokens[pos] {
        Token::Number(n) => Ok((Expr::Number(*n), pos + 1)),
        Token::Cell(name) => {
            let expr = match Position::from_a1(name) {
                Some(cell) if limits.contains(cell) => Expr::CellRef(cell),
                _ => Expr::InvalidRef(name.clone()),
            };
            Ok((expr, pos + 1))
        }
        Token::LParen => {
            let (expr, pos) = parse_add_sub(tokens, pos + 1, limits)?;
            match tokens.get(pos) {
                Some(Token::RParen) => Ok((expr, pos + 1)),
                Some(_) => Err("Expected closing parenthesis".to_string()),
                None => Err("Missing closing parenthesis".to_string()),
            }
        }
        _ => Err(format!("Unexpected token at position {}", pos)),
    }
}

// =============================================================================
// Formula Printing - Convert Expr back to canonical text
// =============================================================================

/// Format an expression without the leading '='.
///
/// Parentheses are emitted only where the tree shape would otherwise be
/// lost; whitespace is never emitted.
pub fn format_expr(expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(expr, &mut out);
    out
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::BinaryOp { op, .. } => op.precedence(),
        Expr::Unary { .. } => UNARY_PRECEDENCE,
        Expr::Number(_) | Expr::CellRef(_) | Expr::InvalidRef(_) => ATOM_PRECEDENCE,
    }
}

fn write_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Number(n) => out.push_str(&format_number(*n)),
        Expr::CellRef(cell) => out.push_str(&cell.to_string()),
        Expr::InvalidRef(name) => out.push_str(name),
        Expr::Unary { op, operand } => {
            out.push(match op {
                UnaryOp::Plus => '+',
                UnaryOp::Minus => '-',
            });
            write_operand(operand, precedence(operand) < UNARY_PRECEDENCE, out);
        }
        Expr::BinaryOp { op, left, right } => {
            let prec = op.precedence();
            write_operand(left, precedence(left) < prec, out);
            out.push(op.symbol());
            // Left-associative: a right operand of equal precedence came
            // from explicit parentheses
            write_operand(right, precedence(right) <= prec, out);
        }
    }
}

fn write_operand(expr: &Expr, parens: bool, out: &mut String) {
    if parens {
        out.push('(');
        write_expr(expr, out);
        out.push(')');
    } else {
        write_expr(expr, out);
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
