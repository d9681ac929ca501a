/* Rewrites a raw pattern into the form the syntax tree builder expects: every concatenation
 * is explicit, every `X+` has been expanded into `X.X*` and the pattern ends with the
 * terminator symbol. */

use crate::error::ParseError;
use crate::fa::TERMINATOR;

pub const CONCAT: char = '.';
pub const ALTERNATE: char = '|';
pub const STAR: char = '*';
pub const PLUS: char = '+';
pub const LPAREN: char = '(';
pub const RPAREN: char = ')';

/// Operators, parentheses and the terminator. Anything else is a symbol of the alphabet.
pub fn is_metacharacter(ch: char) -> bool {
    matches!(
        ch,
        CONCAT | ALTERNATE | STAR | PLUS | LPAREN | RPAREN | TERMINATOR
    )
}

fn append_terminator(pattern: &str) -> String {
    let mut result: String = pattern.chars().filter(|&ch| ch != TERMINATOR).collect();
    result.push(TERMINATOR);
    result
}

// A concatenation goes between two tokens unless the left one opens a group or is a binary
// operator, or the right one closes a group or is an operator applied to what precedes it.
fn needs_concat(prev: char, next: char) -> bool {
    !matches!(prev, LPAREN | ALTERNATE | CONCAT)
        && !matches!(next, RPAREN | ALTERNATE | CONCAT | STAR | PLUS)
}

fn insert_concatenation(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut prev: Option<char> = None;

    for ch in pattern.chars() {
        if let Some(prev) = prev {
            if needs_concat(prev, ch) {
                result.push(CONCAT);
            }
        }
        result.push(ch);
        prev = Some(ch);
    }
    result
}

fn decompose_plus(pattern: &[char]) -> Result<String, ParseError> {
    let mut result = String::with_capacity(pattern.len());
    let mut operand: Option<String> = None; // The last complete symbol or group at this level
    let mut group_start = 0;
    let mut depth = 0usize;

    for (idx, &ch) in pattern.iter().enumerate() {
        match ch {
            LPAREN => {
                if depth == 0 {
                    group_start = idx;
                }
                depth += 1;
            }
            RPAREN => {
                if depth == 0 {
                    let pattern: String = pattern.iter().collect();
                    return Err(ParseError::UnbalancedParentheses(pattern));
                }
                depth -= 1;
                if depth == 0 {
                    let inner = decompose_plus(&pattern[group_start + 1..idx])?;
                    let group = format!("{}{}{}", LPAREN, inner, RPAREN);
                    result.push_str(&group);
                    operand = Some(group);
                }
            }
            _ if depth > 0 => {} // Handled when the enclosing group closes
            PLUS => {
                let repeated = match operand.take() {
                    Some(repeated) => repeated,
                    None => {
                        let pattern: String = pattern[..=idx].iter().collect();
                        return Err(ParseError::MissingOperand(pattern));
                    }
                };
                result.push(CONCAT);
                result.push_str(&repeated);
                result.push(STAR);
            }
            _ if is_metacharacter(ch) => {
                operand = None;
                result.push(ch);
            }
            _ => {
                operand = Some(ch.to_string());
                result.push(ch);
            }
        }
    }

    if depth != 0 {
        let pattern: String = pattern.iter().collect();
        return Err(ParseError::UnbalancedParentheses(pattern));
    }

    Ok(result)
}

/// Normalize a pattern: append the terminator, make concatenation explicit and expand `+`.
pub fn normalize(pattern: &str) -> Result<String, ParseError> {
    let terminated = append_terminator(pattern);
    let concatenated = insert_concatenation(&terminated);
    let chars: Vec<char> = concatenated.chars().collect();
    let normalized = decompose_plus(&chars)?;

    log::debug!("Normalized {:?} into {:?}", pattern, normalized);

    Ok(normalized)
}
