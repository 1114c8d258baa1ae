//! Restricted arithmetic expression evaluator for CALCULATE rules.
//!
//! The grammar is deliberately tiny: numeric literals, binary `+ - * / ^`,
//! unary `+ -` and parentheses. There are no names, function calls,
//! comparisons or assignments, so a rules file can never smuggle anything
//! executable through a CALCULATE expression.
//!
//! Evaluation happens in two stages:
//!
//! ```text
//! "_a / (_b * 60)"
//!       │ substitute(fields)      boundary-aware textual replacement
//!       ▼
//! "120 / (2 * 60)"
//!       │ residual field check    any leftover _name token fails closed
//!       ▼
//! tokenize -> recursive descent -> 1.0
//! ```
//!
//! Field substitution is textual but boundary-aware: a field name only
//! matches when it is not embedded in a longer identifier (`_a` must not
//! match inside `_ab` or before a `.` continuation). Names are substituted
//! longest-first so dotted CIF2 names win over their category prefix.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ExprError {
    /// The expression references a field with no known numeric value. The
    /// evaluator never guesses or substitutes zero.
    #[error("unresolved field reference: {0}")]
    UnresolvedField(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("syntax error: {0}")]
    Syntax(String),
}

/// Evaluate `expression` with the given field values.
///
/// Fails closed: unresolved references, division by zero and malformed
/// syntax all return an error rather than a guessed value.
pub fn evaluate(expression: &str, fields: &HashMap<String, f64>) -> Result<f64, ExprError> {
    let substituted = substitute(expression, fields);

    if let Some(m) = regex!(r"_[A-Za-z][A-Za-z0-9_.\-]*").find(&substituted) {
        return Err(ExprError::UnresolvedField(m.as_str().to_string()));
    }

    let tokens = tokenize(&substituted)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.expression()?;
    if parser.pos != tokens.len() {
        return Err(ExprError::Syntax("trailing input after expression".to_string()));
    }
    Ok(value)
}

/// Replace every field name in `expression` with its numeric value.
fn substitute(expression: &str, fields: &HashMap<String, f64>) -> String {
    // Longest-first so "_refine_diff.potential_max" is consumed before a
    // shorter key like "_refine_diff" could clip it.
    let mut names: Vec<&String> = fields.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut text = expression.to_string();
    for name in names {
        text = replace_token(&text, name, &format_number(fields[name.as_str()]));
    }
    text
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Replace whole-token occurrences of `name`, leaving embedded matches
/// (followed or preceded by an identifier character or `.`) untouched.
fn replace_token(text: &str, name: &str, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        if text[i..].starts_with(name) {
            let prev_ok =
                text[..i].chars().next_back().is_none_or(|c| !is_ident_char(c) && c != '.');
            let end = i + name.len();
            let next_ok =
                text[end..].chars().next().is_none_or(|c| !is_ident_char(c) && c != '.');
            if prev_ok && next_ok {
                out.push_str(replacement);
                i = end;
                continue;
            }
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

/// Format a substituted value so it survives re-tokenization.
fn format_number(value: f64) -> String {
    format!("{value}")
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Tok {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Tok>, ExprError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(i, c)) = chars.peek() {
        match c {
            ' ' | '\t' => {
                chars.next();
            }
            '+' => {
                tokens.push(Tok::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Tok::Minus);
                chars.next();
            }
            '*' => {
                tokens.push(Tok::Star);
                chars.next();
            }
            '/' => {
                tokens.push(Tok::Slash);
                chars.next();
            }
            '^' => {
                tokens.push(Tok::Caret);
                chars.next();
            }
            '(' => {
                tokens.push(Tok::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Tok::RParen);
                chars.next();
            }
            _ if c.is_ascii_digit() || c == '.' => {
                let mut end = i;
                let mut saw_exp = false;
                while let Some(&(j, d)) = chars.peek() {
                    let continues = d.is_ascii_digit()
                        || d == '.'
                        || ((d == 'e' || d == 'E') && !saw_exp)
                        || ((d == '+' || d == '-')
                            && matches!(text[..j].chars().next_back(), Some('e' | 'E')));
                    if !continues {
                        break;
                    }
                    if d == 'e' || d == 'E' {
                        saw_exp = true;
                    }
                    end = j + d.len_utf8();
                    chars.next();
                }
                let lit = &text[i..end];
                let value: f64 = lit
                    .parse()
                    .map_err(|_| ExprError::Syntax(format!("invalid numeric literal '{lit}'")))?;
                tokens.push(Tok::Num(value));
            }
            _ => return Err(ExprError::Syntax(format!("unexpected character '{c}'"))),
        }
    }

    if tokens.is_empty() {
        return Err(ExprError::Syntax("empty expression".to_string()));
    }
    Ok(tokens)
}

/// Recursive-descent parser over the token stream.
///
/// ```text
/// expression := term (('+' | '-') term)*
/// term       := factor (('*' | '/') factor)*
/// factor     := unary ('^' factor)?          (right-associative)
/// unary      := ('+' | '-')* primary
/// primary    := number | '(' expression ')'
/// ```
struct Parser<'a> {
    tokens: &'a [Tok],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Tok> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expression(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        while let Some(op @ (Tok::Plus | Tok::Minus)) = self.peek() {
            self.bump();
            let rhs = self.term()?;
            value = match op {
                Tok::Plus => value + rhs,
                _ => value - rhs,
            };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.factor()?;
        while let Some(op @ (Tok::Star | Tok::Slash)) = self.peek() {
            self.bump();
            let rhs = self.factor()?;
            value = match op {
                Tok::Star => value * rhs,
                _ => {
                    if rhs == 0.0 {
                        return Err(ExprError::DivisionByZero);
                    }
                    value / rhs
                }
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, ExprError> {
        let base = self.unary()?;
        if self.peek() == Some(Tok::Caret) {
            self.bump();
            let exponent = self.factor()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<f64, ExprError> {
        match self.peek() {
            Some(Tok::Minus) => {
                self.bump();
                Ok(-self.unary()?)
            }
            Some(Tok::Plus) => {
                self.bump();
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<f64, ExprError> {
        match self.bump() {
            Some(Tok::Num(value)) => Ok(value),
            Some(Tok::LParen) => {
                let value = self.expression()?;
                if self.bump() != Some(Tok::RParen) {
                    return Err(ExprError::Syntax("unclosed parenthesis".to_string()));
                }
                Ok(value)
            }
            other => Err(ExprError::Syntax(format!("unexpected token {other:?}"))),
        }
    }
}
