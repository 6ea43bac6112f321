//! Statement scanning for plain-text SQL dumps.
//!
//! The dump is split into whole statements first (on `;` outside quoted
//! literals and comments), so an `INSERT` whose value list wraps across lines,
//! or whose literals contain newlines, is always tokenized as one unit.
//! Statements are then classified as table definitions, data insertions, or
//! anything else, which is ignored.

use std::{borrow::Cow, sync::OnceLock};

use log::{debug, warn};
use regex::Regex;

use crate::{
    accumulator::{RowAccumulator, TableRows},
    model::{Row, TableData},
    tokenizer,
};

const CONSTRAINT_KEYWORDS: &[&str] = &[
    "PRIMARY",
    "KEY",
    "UNIQUE",
    "INDEX",
    "CONSTRAINT",
    "FOREIGN",
    "CHECK",
    "FULLTEXT",
    "SPATIAL",
];

// Identifier, optionally quoted and optionally schema-qualified. The last
// segment lands in one of the `bq`, `dq`, `br` or `bare` groups.
const IDENT: &str = r#"(?:(?:`[^`]+`|"[^"]+"|\[[^\]]+\]|[^\s`"\[(.;,]+)\s*\.\s*)?(?:`(?P<bq>[^`]+)`|"(?P<dq>[^"]+)"|\[(?P<br>[^\]]+)\]|(?P<bare>[^\s`"\[(.;,]+))"#;

fn create_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^CREATE\s+(?:TEMPORARY\s+)?TABLE\b").expect("valid create prefix")
    })
}

fn create_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)^CREATE\s+(?:TEMPORARY\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{IDENT}"
        ))
        .expect("valid create pattern")
    })
}

fn insert_prefix() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^INSERT\s+(?:IGNORE\s+)?INTO\b").expect("valid insert prefix")
    })
}

fn insert_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"(?is)^INSERT\s+(?:IGNORE\s+)?INTO\s+{IDENT}\s*(?:\((?P<columns>[^)]*)\)\s*)?VALUES\b\s*(?P<values>.*)$"
        ))
        .expect("valid insert pattern")
    })
}

/// A classified dump statement borrowing from the dump text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement<'a> {
    CreateTable { name: String, columns: Vec<String> },
    Insert {
        table: String,
        /// Explicit column list, when the statement names one.
        columns: Option<Vec<String>>,
        values: Cow<'a, str>,
    },
    Other,
}

/// A table declared by a schema-definition statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug)]
pub struct DumpScanner<'a> {
    statements: Vec<Statement<'a>>,
}

impl<'a> DumpScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        let statements = split_statements(text)
            .into_iter()
            .map(classify)
            .filter(|statement| !matches!(statement, Statement::Other))
            .collect::<Vec<_>>();
        debug!("Dump contains {} table or data statement(s)", statements.len());
        Self { statements }
    }

    /// Table definitions in declared order. A table defined more than once
    /// keeps its first definition; names compare ASCII case-insensitively,
    /// as they do when rows are collected.
    pub fn tables(&self) -> Vec<TableDefinition> {
        let mut tables: Vec<TableDefinition> = Vec::new();
        for statement in &self.statements {
            if let Statement::CreateTable { name, columns } = statement {
                if tables.iter().any(|table| table.name.eq_ignore_ascii_case(name)) {
                    debug!("Ignoring repeated definition of table '{name}'");
                    continue;
                }
                tables.push(TableDefinition {
                    name: name.clone(),
                    columns: columns.clone(),
                });
            }
        }
        tables
    }

    /// Value lists of every `INSERT` into `table`, in dump order.
    pub fn value_lists<'s>(&'s self, table: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.inserts(table).map(|(_, values)| values)
    }

    fn inserts<'s>(
        &'s self,
        table: &'s str,
    ) -> impl Iterator<Item = (Option<&'s [String]>, &'s str)> + 's {
        self.statements.iter().filter_map(move |statement| match statement {
            Statement::Insert {
                table: target,
                columns,
                values,
            } if target.eq_ignore_ascii_case(table) => {
                Some((columns.as_deref(), values.as_ref()))
            }
            _ => None,
        })
    }

    /// Collects rows for one table into `sink` until the dump or the cap runs
    /// out. Rows of an `INSERT` that names its columns are keyed by that list;
    /// the rest are keyed by the table's declared columns.
    pub fn collect_rows(&self, sink: &mut TableRows) {
        let declared = sink.columns().to_vec();
        let table = sink.name().to_string();
        for (named, values) in self.inserts(&table) {
            let columns = named.unwrap_or(declared.as_slice());
            for fields in tokenizer::tokenize_fields(values) {
                if sink.is_full() {
                    sink.mark_truncated();
                    return;
                }
                let values = fields.into_iter().map(tokenizer::Field::into_value).collect();
                sink.push(Row::bind(columns, values));
            }
        }
    }

    /// Reads one table with the given row cap. Tables the dump never defines
    /// are still read, positionally, if the dump inserts into them.
    pub fn read_table(&self, table: &str, limit: usize) -> TableData {
        let columns = self
            .tables()
            .into_iter()
            .find(|definition| definition.name.eq_ignore_ascii_case(table))
            .map(|definition| definition.columns)
            .unwrap_or_default();
        let mut accumulator = RowAccumulator::new(limit);
        let mut sink = accumulator.table(table, columns);
        self.collect_rows(&mut sink);
        accumulator.finish(sink)
    }
}

/// Splits dump text into trimmed statements. Comments are dropped; quoted
/// literals are kept intact, including any `;` or newline they contain.
/// Statements are borrowed from `text` unless a comment had to be cut out of
/// their middle.
pub fn split_statements(text: &str) -> Vec<Cow<'_, str>> {
    let bytes = text.as_bytes();
    let mut splitter = Splitter {
        text,
        start: None,
        pending: None,
        statements: Vec::new(),
    };
    let mut idx = 0usize;

    while idx < bytes.len() {
        match bytes[idx] {
            b'\'' | b'"' | b'`' => {
                let open = idx;
                splitter.start.get_or_insert(open);
                idx = skip_quoted(bytes, open).unwrap_or_else(|| {
                    let line = text[..open].matches('\n').count() + 1;
                    warn!(
                        "Unterminated quoted literal starting on line {line}; \
                         the rest of the dump is read as one statement"
                    );
                    bytes.len()
                });
                continue;
            }
            b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                splitter.suspend(idx);
                idx = skip_line(bytes, idx);
                continue;
            }
            b'#' if splitter.is_idle() => {
                idx = skip_line(bytes, idx);
                continue;
            }
            b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                splitter.suspend(idx);
                idx = skip_block_comment(bytes, idx);
                continue;
            }
            b';' => splitter.flush(idx),
            b if b.is_ascii_whitespace() => {}
            _ => {
                splitter.start.get_or_insert(idx);
            }
        }
        idx += 1;
    }
    splitter.flush(bytes.len());
    splitter.statements
}

struct Splitter<'a> {
    text: &'a str,
    start: Option<usize>,
    // Text of the current statement seen before a comment interrupted it.
    pending: Option<String>,
    statements: Vec<Cow<'a, str>>,
}

impl<'a> Splitter<'a> {
    fn is_idle(&self) -> bool {
        self.start.is_none() && self.pending.is_none()
    }

    fn suspend(&mut self, at: usize) {
        if let Some(begin) = self.start.take() {
            let pending = self.pending.get_or_insert_with(String::new);
            pending.push_str(&self.text[begin..at]);
            pending.push(' ');
        }
    }

    fn flush(&mut self, end: usize) {
        let tail = self.start.take().map_or("", |begin| &self.text[begin..end]);
        match self.pending.take() {
            Some(mut pending) => {
                pending.push_str(tail);
                let trimmed = pending.trim();
                if !trimmed.is_empty() {
                    self.statements.push(Cow::Owned(trimmed.to_string()));
                }
            }
            None => {
                let trimmed = tail.trim();
                if !trimmed.is_empty() {
                    self.statements.push(Cow::Borrowed(trimmed));
                }
            }
        }
    }
}

// Index just past the closing quote, or `None` if the input ends first.
fn skip_quoted(bytes: &[u8], open: usize) -> Option<usize> {
    let quote = bytes[open];
    let mut idx = open + 1;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' if quote != b'`' => idx += 2,
            b if b == quote => {
                if bytes.get(idx + 1) == Some(&quote) {
                    idx += 2;
                } else {
                    return Some(idx + 1);
                }
            }
            _ => idx += 1,
        }
    }
    None
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset + 1)
}

fn skip_block_comment(bytes: &[u8], from: usize) -> usize {
    bytes[from + 2..]
        .windows(2)
        .position(|pair| pair == b"*/")
        .map_or(bytes.len(), |offset| from + 2 + offset + 2)
}

/// Classifies one statement. A statement whose keyword prefix matches but
/// whose table name cannot be extracted is dropped as malformed.
pub fn classify(statement: Cow<'_, str>) -> Statement<'_> {
    let text = statement.as_ref();
    if create_prefix().is_match(text) {
        let Some(captures) = create_pattern().captures(text) else {
            debug!("Dropping malformed table definition: {}", excerpt(text));
            return Statement::Other;
        };
        let name = identifier(&captures);
        let body_start = captures.get(0).map_or(0, |m| m.end());
        let columns = column_names(&text[body_start..]);
        return Statement::CreateTable { name, columns };
    }
    if insert_prefix().is_match(text) {
        let (table, columns, range) = match insert_pattern().captures(text) {
            Some(captures) => (
                identifier(&captures),
                captures
                    .name("columns")
                    .map(|m| insert_columns(m.as_str())),
                captures.name("values").map_or(0..0, |m| m.range()),
            ),
            None => {
                debug!("Dropping malformed insert: {}", excerpt(text));
                return Statement::Other;
            }
        };
        let values = match statement {
            Cow::Borrowed(borrowed) => Cow::Borrowed(&borrowed[range]),
            Cow::Owned(owned) => Cow::Owned(owned[range].to_string()),
        };
        return Statement::Insert {
            table,
            columns,
            values,
        };
    }
    Statement::Other
}

fn identifier(captures: &regex::Captures<'_>) -> String {
    ["bq", "dq", "br", "bare"]
        .iter()
        .find_map(|group| captures.name(group))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Column names from the remainder of a `CREATE TABLE` statement, i.e. the
/// text following the table name.
fn column_names(rest: &str) -> Vec<String> {
    let rest = rest.trim_start();
    if !rest.starts_with('(') {
        return Vec::new();
    }
    let Some(body) = tokenizer::split_groups(rest).into_iter().next() else {
        return Vec::new();
    };
    split_definitions(body)
        .into_iter()
        .filter_map(|definition| {
            let name = leading_identifier(definition)?;
            let keyword = name.to_ascii_uppercase();
            if !definition.starts_with(['`', '"', '['])
                && CONSTRAINT_KEYWORDS.contains(&keyword.as_str())
            {
                return None;
            }
            Some(name)
        })
        .collect()
}

// `(a, `b`, "c")` after the table name of an INSERT. Quotes are stripped.
fn insert_columns(list: &str) -> Vec<String> {
    split_definitions(list)
        .into_iter()
        .filter_map(leading_identifier)
        .collect()
}

// Column definitions are separated by commas at parenthesis depth 0, e.g.
// `DECIMAL(10,2)` stays inside one definition.
fn split_definitions(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0usize;
    for (idx, ch) in body.char_indices() {
        if let Some(active) = quote {
            if ch == active {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts.retain(|part| !part.is_empty());
    parts
}

fn leading_identifier(definition: &str) -> Option<String> {
    let mut chars = definition.chars();
    let first = chars.next()?;
    let close = match first {
        '`' => Some('`'),
        '"' => Some('"'),
        '[' => Some(']'),
        _ => None,
    };
    let name = match close {
        Some(close) => chars.take_while(|&c| c != close).collect::<String>(),
        None => definition
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    (!name.is_empty()).then_some(name)
}

fn excerpt(statement: &str) -> String {
    statement.chars().take(60).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_semicolons_outside_literals_and_comments() {
        let text = "-- header; comment\nCREATE TABLE a (x INT);\n/* block; */\nINSERT INTO a VALUES ('x;y');\n# trailing\n";
        let statements = split_statements(text);
        assert_eq!(
            statements,
            vec!["CREATE TABLE a (x INT)", "INSERT INTO a VALUES ('x;y')"]
        );
        assert!(statements.iter().all(|s| matches!(s, Cow::Borrowed(_))));
    }

    #[test]
    fn comments_inside_a_statement_are_cut_out() {
        let text = "CREATE TABLE t (\n  id INT, -- primary id\n  name TEXT /* label */\n);";
        let statements = split_statements(text);
        assert_eq!(statements.len(), 1);
        match classify(statements.into_iter().next().unwrap()) {
            Statement::CreateTable { columns, .. } => assert_eq!(columns, vec!["id", "name"]),
            other => panic!("expected table definition, got {other:?}"),
        }
    }

    #[test]
    fn classifies_quoted_and_qualified_table_names() {
        for statement in [
            "CREATE TABLE `sensors` (id INT)",
            "create table if not exists \"sensors\" (id INT)",
            "CREATE TABLE [dbo].[sensors] (id INT)",
            "CREATE TEMPORARY TABLE main.sensors (id INT)",
        ] {
            match classify(Cow::Borrowed(statement)) {
                Statement::CreateTable { name, .. } => assert_eq!(name, "sensors", "{statement}"),
                other => panic!("expected table definition for {statement}, got {other:?}"),
            }
        }
    }

    #[test]
    fn extracts_columns_and_skips_constraints() {
        let statement = "CREATE TABLE `readings` (\n  `id` int(11) NOT NULL,\n  `value` decimal(10,2) DEFAULT NULL,\n  `note` varchar(20) DEFAULT 'a,b',\n  PRIMARY KEY (`id`),\n  KEY `idx_value` (`value`)\n) ENGINE=InnoDB";
        match classify(Cow::Borrowed(statement)) {
            Statement::CreateTable { columns, .. } => {
                assert_eq!(columns, vec!["id", "value", "note"]);
            }
            other => panic!("expected table definition, got {other:?}"),
        }
    }

    #[test]
    fn insert_with_column_list_exposes_value_list() {
        match classify(Cow::Borrowed("INSERT INTO `t` (`a`,`b`) VALUES (1,2),(3,4)")) {
            Statement::Insert {
                table,
                columns,
                values,
            } => {
                assert_eq!(table, "t");
                assert_eq!(columns, Some(vec!["a".to_string(), "b".to_string()]));
                assert_eq!(values, "(1,2),(3,4)");
            }
            other => panic!("expected insert, got {other:?}"),
        }
    }

    #[test]
    fn prefix_match_without_name_is_dropped() {
        assert_eq!(classify(Cow::Borrowed("CREATE TABLE")), Statement::Other);
        assert_eq!(
            classify(Cow::Borrowed("INSERT INTO t SELECT * FROM u")),
            Statement::Other
        );
    }

    #[test]
    fn value_lists_spanning_lines_are_read_whole() {
        let text = "CREATE TABLE t (a INT, b TEXT);\nINSERT INTO t VALUES\n(1,'line\none'),\n(2,\n'two');\n";
        let scanner = DumpScanner::new(text);
        let data = scanner.read_table("t", 100);
        assert_eq!(data.rows.len(), 2);
        assert_eq!(
            data.rows[0].get("b"),
            Some(&crate::model::Value::Text("line\none".to_string()))
        );
    }

    #[test]
    fn insert_column_list_keys_rows_by_name() {
        let text = "CREATE TABLE t (id INT, name TEXT, note TEXT);\nINSERT INTO t (name, note) VALUES ('pump','x');\nINSERT INTO t VALUES (2,'fan','y');\n";
        let data = DumpScanner::new(text).read_table("t", 10);
        assert_eq!(data.rows.len(), 2);
        let first = &data.rows[0];
        assert_eq!(first.keys().collect::<Vec<_>>(), vec!["name", "note"]);
        assert_eq!(
            first.get("name"),
            Some(&crate::model::Value::Text("pump".to_string()))
        );
        assert_eq!(first.get("id"), None);
        assert_eq!(data.rows[1].get("id"), Some(&crate::model::Value::Integer(2)));
    }

    #[test]
    fn table_names_differing_only_in_case_are_one_table() {
        let text = "CREATE TABLE \"Sensors\" (id INT);\nCREATE TABLE \"sensors\" (other INT);\nINSERT INTO sensors VALUES (1);\n";
        let tables = DumpScanner::new(text).tables();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "Sensors");
        assert_eq!(tables[0].columns, vec!["id"]);
    }

    #[test]
    fn unterminated_literal_keeps_earlier_statements() {
        let text = "CREATE TABLE a (x INT);\nINSERT INTO a VALUES ('oops);\nCREATE TABLE b (y INT);";
        let statements = split_statements(text);
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "CREATE TABLE a (x INT)");
        assert!(statements[1].starts_with("INSERT INTO a"));
        assert_eq!(skip_quoted(b"'open", 0), None);
        assert_eq!(skip_quoted(b"'a''b' rest", 0), Some(6));
    }
}
