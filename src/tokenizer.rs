//! Quote-aware tokenizer for `VALUES` lists.
//!
//! A value list such as `(1,'a,b','c''d'),(2,'e','f')` is split in two
//! passes: [`split_groups`] finds the top-level parenthesized groups, and
//! [`split_fields`] walks one group character by character, splitting on
//! commas that sit outside quoted literals and nested parentheses.

use crate::model::Value;

/// One field of a value group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field text with surrounding whitespace trimmed and, for quoted
    /// literals, quote delimiters removed and escapes resolved.
    pub text: String,
    /// Whether any part of the field was a quoted literal.
    pub quoted: bool,
}

impl Field {
    pub fn into_value(self) -> Value {
        if self.quoted {
            return Value::Text(self.text);
        }
        if self.text.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        Value::infer(&self.text)
    }
}

/// Splits `values` into the bodies of its top-level parenthesized groups.
/// Commas and whitespace between groups are skipped. Any other top-level text
/// after a group ends the list, so trailing clauses such as
/// `ON CONFLICT (id) DO NOTHING` or `ON DUPLICATE KEY UPDATE a=VALUES(a)`
/// never become rows. Input without any top-level group is returned whole as
/// a single group.
pub fn split_groups(values: &str) -> Vec<&str> {
    let mut groups = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = values.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if let Some(active) = quote {
            match ch {
                '\\' => {
                    chars.next();
                }
                c if c == active => {
                    if chars.peek().map(|(_, next)| *next) == Some(active) {
                        chars.next();
                    } else {
                        quote = None;
                    }
                }
                _ => {}
            }
            continue;
        }
        if depth == 0 && !groups.is_empty() && !(ch == ',' || ch == '(' || ch.is_whitespace()) {
            break;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => {
                if depth == 0 {
                    start = idx + ch.len_utf8();
                }
                depth += 1;
            }
            ')' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    groups.push(&values[start..idx]);
                }
            }
            _ => {}
        }
    }

    // An unterminated final group still carries data.
    if depth > 0 {
        groups.push(&values[start..]);
    }
    if groups.is_empty() {
        let trimmed = values.trim().trim_end_matches(';').trim();
        if !trimmed.is_empty() {
            groups.push(trimmed);
        }
    }
    groups
}

/// Splits one group body into fields.
pub fn split_fields(group: &str) -> Vec<Field> {
    let mut fields = Vec::new();
    let mut current = FieldBuilder::default();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut chars = group.chars().peekable();

    while let Some(ch) = chars.next() {
        if let Some(active) = quote {
            // Literals nested in parentheses belong to an expression and are
            // kept verbatim.
            let raw = depth > 0;
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        if raw {
                            current.push_raw(ch);
                            current.push_raw(escaped);
                        } else {
                            current.push_literal(unescape(escaped));
                        }
                    }
                }
                c if c == active => {
                    if chars.peek() == Some(&active) {
                        chars.next();
                        if raw {
                            current.push_raw(active);
                            current.push_raw(active);
                        } else {
                            current.push_literal(active);
                        }
                    } else {
                        quote = None;
                        if raw {
                            current.push_raw(active);
                        }
                    }
                }
                other if raw => current.push_raw(other),
                other => current.push_literal(other),
            }
            continue;
        }
        match ch {
            '\'' | '"' if depth > 0 => {
                quote = Some(ch);
                current.push_raw(ch);
            }
            '\'' | '"' => {
                quote = Some(ch);
                current.open_literal();
            }
            '(' => {
                depth += 1;
                current.push_bare(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push_bare(ch);
            }
            ',' if depth == 0 => fields.push(std::mem::take(&mut current).finish()),
            other => current.push_bare(other),
        }
    }

    if !current.is_blank() || !fields.is_empty() {
        fields.push(current.finish());
    }
    fields
}

/// String view of the tokenizer: one `Vec<String>` per non-empty group.
pub fn tokenize(values: &str) -> Vec<Vec<String>> {
    tokenize_fields(values)
        .into_iter()
        .map(|fields| fields.into_iter().map(|field| field.text).collect())
        .collect()
}

/// Typed view used by the dump path. Groups with zero fields are dropped.
pub fn tokenize_fields(values: &str) -> Vec<Vec<Field>> {
    split_groups(values)
        .into_iter()
        .map(split_fields)
        .filter(|fields| !fields.is_empty())
        .collect()
}

fn unescape(ch: char) -> char {
    match ch {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        '0' => '\0',
        other => other,
    }
}

// Bare text is trimmed at both ends; literal text is kept verbatim. Trailing
// whitespace is only trimmed up to the end of the last literal.
#[derive(Default)]
struct FieldBuilder {
    text: String,
    quoted: bool,
    literal_end: usize,
}

impl FieldBuilder {
    fn open_literal(&mut self) {
        if !self.quoted {
            self.text.truncate(self.text.trim_end().len());
            // Charset introducers: N'..', _utf8mb4'..', _binary'..'
            if self.text.eq_ignore_ascii_case("n") || self.text.starts_with('_') {
                self.text.clear();
            }
        }
        self.quoted = true;
        self.literal_end = self.text.len();
    }

    fn push_literal(&mut self, ch: char) {
        self.text.push(ch);
        self.literal_end = self.text.len();
    }

    fn push_raw(&mut self, ch: char) {
        self.text.push(ch);
    }

    fn push_bare(&mut self, ch: char) {
        if self.text.is_empty() && ch.is_whitespace() && !self.quoted {
            return;
        }
        self.text.push(ch);
    }

    fn is_blank(&self) -> bool {
        !self.quoted && self.text.trim().is_empty()
    }

    fn finish(mut self) -> Field {
        let keep = self.text.trim_end().len().max(self.literal_end);
        self.text.truncate(keep);
        if !self.quoted {
            let trimmed = self.text.trim_start().len();
            let cut = self.text.len() - trimmed;
            self.text.drain(..cut);
        }
        Field {
            text: self.text,
            quoted: self.quoted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commas_inside_literals_and_doubled_quotes_do_not_split() {
        let groups = tokenize("(1,'a,b','c''d'),(2,'e','f')");
        assert_eq!(groups, vec![vec!["1", "a,b", "c'd"], vec!["2", "e", "f"]]);
    }

    #[test]
    fn group_boundary_inside_literal_is_not_a_split_point() {
        let groups = tokenize("(1,'x),(y'),(2,'z')");
        assert_eq!(groups, vec![vec!["1", "x),(y"], vec!["2", "z"]]);
    }

    #[test]
    fn backslash_escapes_are_resolved() {
        let groups = tokenize(r#"(1,'it\'s','a\nb',"q\"uote")"#);
        assert_eq!(groups, vec![vec!["1", "it's", "a\nb", "q\"uote"]]);
    }

    #[test]
    fn whitespace_around_fields_is_trimmed_but_literal_padding_kept() {
        let groups = tokenize("(  7 , ' padded ' ,NULL )");
        assert_eq!(groups, vec![vec!["7", " padded ", "NULL"]]);
    }

    #[test]
    fn nested_parentheses_stay_in_one_field() {
        let groups = tokenize("(1, CONCAT('a','b'), 3)");
        assert_eq!(groups, vec![vec!["1", "CONCAT('a','b')", "3"]]);
    }

    #[test]
    fn charset_introducers_are_dropped() {
        assert_eq!(tokenize("(N'泵站', _utf8mb4'ok')"), vec![vec!["泵站", "ok"]]);
    }

    #[test]
    fn empty_groups_are_discarded() {
        assert!(tokenize("()").is_empty());
        assert_eq!(tokenize("(),(1)"), vec![vec!["1"]]);
    }

    #[test]
    fn input_without_parentheses_is_one_group() {
        assert_eq!(tokenize("1, 'a';"), vec![vec!["1", "a"]]);
    }

    #[test]
    fn empty_literal_is_a_field() {
        let groups = tokenize("('',2,)");
        assert_eq!(groups, vec![vec!["", "2", ""]]);
    }

    #[test]
    fn quoted_null_stays_text() {
        let mut fields = split_fields("NULL,'NULL',3,'3'").into_iter();
        assert_eq!(fields.next().unwrap().into_value(), Value::Null);
        assert_eq!(
            fields.next().unwrap().into_value(),
            Value::Text("NULL".to_string())
        );
        assert_eq!(fields.next().unwrap().into_value(), Value::Integer(3));
        assert_eq!(
            fields.next().unwrap().into_value(),
            Value::Text("3".to_string())
        );
    }

    #[test]
    fn trailing_clauses_after_the_groups_are_ignored() {
        assert_eq!(
            tokenize("(1,'a') ON CONFLICT (id) DO NOTHING"),
            vec![vec!["1", "a"]]
        );
        assert_eq!(
            tokenize("(1,2),(3,4) ON DUPLICATE KEY UPDATE a=VALUES(a)"),
            vec![vec!["1", "2"], vec!["3", "4"]]
        );
        assert_eq!(tokenize("(5) RETURNING (id);"), vec![vec!["5"]]);
    }
}
