use std::borrow::Cow;

use crate::params::Parameter;

/// Positional placeholder style expected by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `PostgreSQL`-style placeholders like `$1`.
    Postgres,
    /// SQL Server (tiberius) placeholders like `@P1`.
    Mssql,
}

impl PlaceholderStyle {
    #[must_use]
    pub fn placeholder(self, position: usize) -> String {
        match self {
            PlaceholderStyle::Postgres => format!("${position}"),
            PlaceholderStyle::Mssql => format!("@P{position}"),
        }
    }
}

/// Rewrite named parameter references (`@name` or `:name`) into the positional
/// placeholders of `target`.
///
/// A reference is replaced by the 1-based position of the first parameter whose
/// name matches ignoring ASCII case. Unknown names are left untouched, as are
/// string literals, quoted identifiers, comments, dollar-quoted bodies, `::`
/// casts and `@@` globals.
///
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn bind_named_placeholders<'a>(
    sql: &'a str,
    params: &[Parameter],
    target: PlaceholderStyle,
) -> Cow<'a, str> {
    if !params.iter().any(Parameter::is_named) {
        return Cow::Borrowed(sql);
    }

    let mut out: Option<String> = None;
    // Start of the slice of `sql` not yet copied into `out`.
    let mut copied = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' if target == PlaceholderStyle::Mssql => state = State::Bracketed,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' if target == PlaceholderStyle::Postgres => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b':' | b'@' if bytes.get(idx + 1) == Some(&b) => {
                    // `::type` casts and `@@GLOBAL` names
                    idx += 1;
                }
                b':' | b'@' if !follows_identifier(bytes, idx) => {
                    if let Some(end) = scan_identifier(bytes, idx + 1) {
                        let name = &sql[idx + 1..end];
                        if let Some(position) = find_parameter(params, name) {
                            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                            buf.push_str(&sql[copied..idx]);
                            buf.push_str(&target.placeholder(position));
                            copied = end;
                        }
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::Bracketed => {
                if b == b']' {
                    if bytes.get(idx + 1) == Some(&b']') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                    idx += 1;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let skip = tag.len() + 1;
                    state = State::Normal;
                    idx += skip;
                }
            }
        }

        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

#[derive(Clone)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn follows_identifier(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && is_identifier_byte(bytes[idx - 1])
}

/// End (exclusive) of an identifier starting at `start`, if one starts there.
fn scan_identifier(bytes: &[u8], start: usize) -> Option<usize> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut idx = start + 1;
    while idx < bytes.len() && is_identifier_byte(bytes[idx]) {
        idx += 1;
    }
    Some(idx)
}

fn find_parameter(params: &[Parameter], name: &str) -> Option<usize> {
    params
        .iter()
        .position(|p| p.is_named() && p.name().eq_ignore_ascii_case(name))
        .map(|i| i + 1)
}

fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !is_identifier_byte(b) || (idx == start + 1 && b.is_ascii_digit()) {
            return None;
        }
        idx += 1;
    }

    if idx < bytes.len() && bytes[idx] == b'$' {
        let tag = String::from_utf8(bytes[start + 1..idx].to_vec()).ok()?;
        Some((tag, idx))
    } else {
        None
    }
}

fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    end < bytes.len()
        && bytes[idx + 1..end] == *tag.as_bytes()
        && bytes.get(end) == Some(&b'$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, RowValues};

    fn named(names: &[&str]) -> Vec<Parameter> {
        names
            .iter()
            .map(|n| Parameter::new(n, Direction::Input, RowValues::Null))
            .collect()
    }

    #[test]
    fn rewrites_at_names_for_mssql() {
        let params = named(&["Name", "Sex"]);
        let sql = "insert into Student(Name, Sex) values(@Name, @Sex)";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Mssql);
        assert_eq!(res, "insert into Student(Name, Sex) values(@P1, @P2)");
    }

    #[test]
    fn rewrites_colon_names_for_postgres_by_position_in_list() {
        let params = named(&["sex", "name"]);
        let sql = "select * from student where name = :name and sex = :SEX or alias = :name";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Postgres);
        assert_eq!(
            res,
            "select * from student where name = $2 and sex = $1 or alias = $2"
        );
    }

    #[test]
    fn leaves_casts_globals_and_unknown_names() {
        let params = named(&["id"]);
        let sql = "select @id::text, @@ROWCOUNT, @local from t where x = :id";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Postgres);
        assert_eq!(res, "select $1::text, @@ROWCOUNT, @local from t where x = $1");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let params = named(&["a"]);
        let sql = "select '@a', \"@a\" -- @a\n/* :a /* @a */ */ from t where a = @a";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Postgres);
        assert_eq!(
            res,
            "select '@a', \"@a\" -- @a\n/* :a /* @a */ */ from t where a = $1"
        );
    }

    #[test]
    fn skips_brackets_on_mssql_and_dollar_quotes_on_postgres() {
        let params = named(&["a"]);
        let res = bind_named_placeholders(
            "select [@a] from t where a = @a",
            &params,
            PlaceholderStyle::Mssql,
        );
        assert_eq!(res, "select [@a] from t where a = @P1");

        let res = bind_named_placeholders(
            "$body$ select @a $body$ where a = @a",
            &params,
            PlaceholderStyle::Postgres,
        );
        assert_eq!(res, "$body$ select @a $body$ where a = $1");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let params = named(&["sex"]);
        let sql = "select '男' as label where sex = @sex -- 性别";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Mssql);
        assert_eq!(res, "select '男' as label where sex = @P1 -- 性别");
    }

    #[test]
    fn positional_parameters_borrow() {
        let params = vec![Parameter::positional(1_i64)];
        let sql = "select * from t where a = $1";
        let res = bind_named_placeholders(sql, &params, PlaceholderStyle::Postgres);
        assert!(matches!(res, Cow::Borrowed(_)));
    }
}
