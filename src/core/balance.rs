//! Tag balance checking.
//!
//! Rich text is only written back when every open tag has a matching close tag
//! in nesting order. Object placeholders are self-contained and never affect
//! the stack.

use super::{TagGrammar, TagKind, TagRole, TagToken};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("closing </{kind}> at {index} has no matching open tag")]
    UnexpectedClose { kind: TagKind, index: usize },
    #[error("closing </{found}> at {index} does not match open <{expected}>")]
    Mismatched {
        expected: TagKind,
        found: TagKind,
        index: usize,
    },
    #[error("<{kind}> opened at {index} is never closed")]
    Unclosed { kind: TagKind, index: usize },
}

pub fn check_balance(text: &str) -> Result<(), BalanceError> {
    check_tokens(&TagGrammar::get().tokenize(text))
}

pub fn has_balanced_tags(text: &str) -> bool {
    check_balance(text).is_ok()
}

/// Checks an already tokenized text. Tokens must be ordered by start offset.
pub fn check_tokens(tokens: &[TagToken]) -> Result<(), BalanceError> {
    let mut open: Vec<(TagKind, usize)> = Vec::new();
    for token in tokens {
        match token.role {
            TagRole::SelfClosing => {}
            TagRole::Open => open.push((token.kind, token.range.start)),
            TagRole::Close => match open.pop() {
                None => {
                    return Err(BalanceError::UnexpectedClose {
                        kind: token.kind,
                        index: token.range.start,
                    });
                }
                Some((expected, _)) if expected != token.kind => {
                    return Err(BalanceError::Mismatched {
                        expected,
                        found: token.kind,
                        index: token.range.start,
                    });
                }
                Some(_) => {}
            },
        }
    }
    match open.pop() {
        Some((kind, index)) => Err(BalanceError::Unclosed { kind, index }),
        None => Ok(()),
    }
}
