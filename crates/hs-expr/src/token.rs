//! Tokenizer for the expression language.

use crate::error::EvalError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Integer literal.
    Int(i64),
    /// Float literal.
    Float(f64),
    /// String literal (quotes and escapes already resolved).
    Str(String),
    /// Identifier.
    Ident(String),
    /// `true` keyword.
    True,
    /// `false` keyword.
    False,
    /// `null` keyword.
    Null,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `==`
    EqEq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `,`
    Comma,
}

/// A token together with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// Byte offset where the token starts.
    pub position: usize,
}

/// Splits source text into tokens.
///
/// # Errors
///
/// Returns [`EvalError::Syntax`] for unterminated strings, malformed
/// numbers, and characters outside the language.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, EvalError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let b = bytes[i];

        match b {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
            }
            b'0'..=b'9' => {
                let (token, next) = lex_number(source, i)?;
                tokens.push(Spanned {
                    token,
                    position: start,
                });
                i = next;
            }
            b'"' | b'\'' => {
                let (token, next) = lex_string(source, i)?;
                tokens.push(Spanned {
                    token,
                    position: start,
                });
                i = next;
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let mut end = i + 1;
                while end < bytes.len()
                    && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                let word = &source[i..end];
                let token = match word {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" => Token::Null,
                    _ => Token::Ident(word.to_owned()),
                };
                tokens.push(Spanned {
                    token,
                    position: start,
                });
                i = end;
            }
            b'+' => {
                tokens.push(Spanned {
                    token: Token::Plus,
                    position: start,
                });
                i += 1;
            }
            b'-' => {
                tokens.push(Spanned {
                    token: Token::Minus,
                    position: start,
                });
                i += 1;
            }
            b'*' => {
                tokens.push(Spanned {
                    token: Token::Star,
                    position: start,
                });
                i += 1;
            }
            b'/' => {
                tokens.push(Spanned {
                    token: Token::Slash,
                    position: start,
                });
                i += 1;
            }
            b'%' => {
                tokens.push(Spanned {
                    token: Token::Percent,
                    position: start,
                });
                i += 1;
            }
            b'(' => {
                tokens.push(Spanned {
                    token: Token::LParen,
                    position: start,
                });
                i += 1;
            }
            b')' => {
                tokens.push(Spanned {
                    token: Token::RParen,
                    position: start,
                });
                i += 1;
            }
            b'[' => {
                tokens.push(Spanned {
                    token: Token::LBracket,
                    position: start,
                });
                i += 1;
            }
            b']' => {
                tokens.push(Spanned {
                    token: Token::RBracket,
                    position: start,
                });
                i += 1;
            }
            b',' => {
                tokens.push(Spanned {
                    token: Token::Comma,
                    position: start,
                });
                i += 1;
            }
            b'=' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::EqEq,
                        position: start,
                    });
                    i += 2;
                } else {
                    return Err(EvalError::syntax(
                        start,
                        "'=' is not an expression operator (did you mean '=='?)",
                    ));
                }
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::NotEq,
                        position: start,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Bang,
                        position: start,
                    });
                    i += 1;
                }
            }
            b'<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Le,
                        position: start,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Lt,
                        position: start,
                    });
                    i += 1;
                }
            }
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Spanned {
                        token: Token::Ge,
                        position: start,
                    });
                    i += 2;
                } else {
                    tokens.push(Spanned {
                        token: Token::Gt,
                        position: start,
                    });
                    i += 1;
                }
            }
            b'&' => {
                if bytes.get(i + 1) == Some(&b'&') {
                    tokens.push(Spanned {
                        token: Token::AndAnd,
                        position: start,
                    });
                    i += 2;
                } else {
                    return Err(EvalError::syntax(start, "expected '&&'"));
                }
            }
            b'|' => {
                if bytes.get(i + 1) == Some(&b'|') {
                    tokens.push(Spanned {
                        token: Token::OrOr,
                        position: start,
                    });
                    i += 2;
                } else {
                    return Err(EvalError::syntax(start, "expected '||'"));
                }
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(EvalError::syntax(
                    start,
                    format!("unexpected character '{ch}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

/// Lexes an integer or float starting at `start`.
fn lex_number(source: &str, start: usize) -> Result<(Token, usize), EvalError> {
    let bytes = source.as_bytes();
    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }

    let is_float =
        end < bytes.len() && bytes[end] == b'.' && bytes.get(end + 1).is_some_and(u8::is_ascii_digit);

    if is_float {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
        let text = &source[start..end];
        let value: f64 = text
            .parse()
            .map_err(|_| EvalError::syntax(start, format!("invalid float literal '{text}'")))?;
        Ok((Token::Float(value), end))
    } else {
        let text = &source[start..end];
        let value: i64 = text
            .parse()
            .map_err(|_| EvalError::syntax(start, format!("invalid integer literal '{text}'")))?;
        Ok((Token::Int(value), end))
    }
}

/// Lexes a quoted string starting at `start` (the opening quote).
fn lex_string(source: &str, start: usize) -> Result<(Token, usize), EvalError> {
    let bytes = source.as_bytes();
    let quote = bytes[start];
    let mut out = String::new();
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                let escaped = bytes
                    .get(i + 1)
                    .ok_or_else(|| EvalError::syntax(start, "unterminated string literal"))?;
                match escaped {
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    b'\\' => out.push('\\'),
                    b'"' => out.push('"'),
                    b'\'' => out.push('\''),
                    other => {
                        return Err(EvalError::syntax(
                            i,
                            format!("unknown escape '\\{}'", *other as char),
                        ));
                    }
                }
                i += 2;
            }
            b if b == quote => return Ok((Token::Str(out), i + 1)),
            _ => {
                let ch = source[i..]
                    .chars()
                    .next()
                    .ok_or_else(|| EvalError::syntax(i, "invalid string contents"))?;
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }

    Err(EvalError::syntax(start, "unterminated string literal"))
}
