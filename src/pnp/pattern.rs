//! Friendly-name matching with WQL `LIKE` semantics
//!
//! `%` matches any run of characters, `_` exactly one, `[abc]` / `[a-z]` a set or
//! range and `[^...]` a negated set. Comparison is case-insensitive.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    AnyRun,
    AnyOne,
    Literal(char),
    Set { negated: bool, items: Vec<SetItem> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SetItem {
    Char(char),
    Range(char, char),
}

impl SetItem {
    fn contains(&self, c: char) -> bool {
        match *self {
            SetItem::Char(x) => x == c,
            SetItem::Range(lo, hi) => lo <= c && c <= hi,
        }
    }
}

/// A compiled friendly-name pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePattern {
    tokens: Vec<Token>,
}

impl NamePattern {
    /// Compile a pattern that must match the whole name
    pub fn exact(pattern: &str) -> Self {
        Self {
            tokens: tokenize(pattern),
        }
    }

    /// Compile a pattern that may match anywhere in the name (`%pattern%`)
    pub fn substring(pattern: &str) -> Self {
        let mut tokens = vec![Token::AnyRun];
        tokens.extend(tokenize(pattern));
        tokens.push(Token::AnyRun);
        Self { tokens }
    }

    pub fn matches(&self, name: &str) -> bool {
        let chars: Vec<char> = normalize(name).chars().collect();
        match_tokens(&self.tokens, &chars)
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars: Vec<char> = normalize(pattern).chars().collect();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => {
                // Collapse runs, they are equivalent to one
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
                i += 1;
            }
            '_' => {
                tokens.push(Token::AnyOne);
                i += 1;
            }
            '[' => match parse_set(&chars[i + 1..]) {
                Some((token, consumed)) => {
                    tokens.push(token);
                    i += consumed + 1;
                }
                // Unterminated bracket is taken literally
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }

    tokens
}

/// Parse the body of a `[...]` set. Returns the token and characters consumed
/// including the closing bracket.
fn parse_set(chars: &[char]) -> Option<(Token, usize)> {
    let close = chars.iter().position(|&c| c == ']')?;
    let mut body = &chars[..close];

    let negated = body.first() == Some(&'^');
    if negated {
        body = &body[1..];
    }

    let mut items = Vec::new();
    let mut j = 0;
    while j < body.len() {
        if j + 2 < body.len() && body[j + 1] == '-' {
            items.push(SetItem::Range(body[j], body[j + 2]));
            j += 3;
        } else {
            items.push(SetItem::Char(body[j]));
            j += 1;
        }
    }

    Some((Token::Set { negated, items }, close + 1))
}

fn match_tokens(tokens: &[Token], name: &[char]) -> bool {
    // Iterative wildcard matching with backtracking to the last `%`
    let (mut t, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match tokens.get(t) {
            Some(Token::AnyRun) => {
                backtrack = Some((t, n));
                t += 1;
                continue;
            }
            Some(token) if matches_one(token, name[n]) => {
                t += 1;
                n += 1;
                continue;
            }
            _ => {}
        }

        match backtrack {
            Some((bt, bn)) => {
                t = bt + 1;
                n = bn + 1;
                backtrack = Some((bt, bn + 1));
            }
            None => return false,
        }
    }

    tokens[t..].iter().all(|token| *token == Token::AnyRun)
}

fn matches_one(token: &Token, c: char) -> bool {
    match token {
        Token::AnyRun => false,
        Token::AnyOne => true,
        Token::Literal(x) => *x == c,
        Token::Set { negated, items } => items.iter().any(|item| item.contains(c)) != *negated,
    }
}
