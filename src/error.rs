use std::fmt;

/// Reasons a pattern can be rejected while it is normalized or parsed into a syntax tree.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ParseError {
    UnbalancedParentheses(String),
    MissingOperand(String),
    InvalidLeafCharacter(char),
    NoGrammarRuleApplies(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnbalancedParentheses(pattern) => {
                write!(f, "Error: {} has unbalanced parenthesis!", pattern)
            }
            ParseError::MissingOperand(pattern) => {
                write!(f, "Error: Missing operand in \"{}\"", pattern)
            }
            ParseError::InvalidLeafCharacter(ch) => {
                write!(f, "Error: {} cannot be used as a symbol", ch)
            }
            ParseError::NoGrammarRuleApplies(pattern) => {
                write!(f, "Error: No grammar rule applies to \"{}\"", pattern)
            }
        }
    }
}

impl std::error::Error for ParseError {}
