//! Rewriting canonical `$n` placeholders into driver syntax

use serde_json::Value;

/// Parameter syntax understood by a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2` (canonical)
    Dollar,
    /// `?` in order of appearance
    Question,
    /// `:1`, `:2`
    Colon,
    /// `@P1`, `@P2`
    AtP,
}

impl PlaceholderStyle {
    /// Render the 1-based parameter `index`
    pub fn render(&self, index: usize) -> String {
        match self {
            Self::Dollar => format!("${index}"),
            Self::Question => "?".to_string(),
            Self::Colon => format!(":{index}"),
            Self::AtP => format!("@P{index}"),
        }
    }
}

/// SQL rewritten for a driver, plus the parameter index of each placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenSql {
    pub sql: String,
    pub style: PlaceholderStyle,
    /// 1-based parameter indexes in order of appearance
    pub order: Vec<usize>,
}

impl RewrittenSql {
    /// Values in the order the driver binds them.
    ///
    /// Anonymous `?` placeholders bind by position, so values follow `order`;
    /// numbered styles bind the slice as-is.
    pub fn bind<'v>(&self, params: &'v [Value]) -> Result<Vec<&'v Value>, usize> {
        match self.style {
            PlaceholderStyle::Question => self
                .order
                .iter()
                .map(|&index| {
                    index
                        .checked_sub(1)
                        .and_then(|i| params.get(i))
                        .ok_or(index)
                })
                .collect(),
            _ => {
                if let Some(&missing) = self.order.iter().find(|&&i| i == 0 || i > params.len()) {
                    return Err(missing);
                }
                Ok(params.iter().collect())
            }
        }
    }
}

/// Rewrite `$n` placeholders outside quoted text into `style`.
///
/// Single-quoted literals, double-quoted and backtick identifiers (and
/// bracketed identifiers for `@Pn` drivers) are copied untouched.
pub fn rewrite_placeholders(sql: &str, style: PlaceholderStyle) -> RewrittenSql {
    let mut out = String::with_capacity(sql.len());
    let mut order = Vec::new();
    let mut closing: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(close) = closing {
            out.push(c);
            if c == close {
                closing = None;
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                closing = Some(c);
                out.push(c);
            }
            '[' if style == PlaceholderStyle::AtP => {
                closing = Some(']');
                out.push(c);
            }
            '$' => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                match digits.parse::<usize>() {
                    Ok(index) => {
                        order.push(index);
                        out.push_str(&style.render(index));
                    }
                    Err(_) => {
                        out.push('$');
                        out.push_str(&digits);
                    }
                }
            }
            _ => out.push(c),
        }
    }

    RewrittenSql { sql: out, style, order }
}
