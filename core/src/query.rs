//! Query tree and the query-string parser.
//!
//! ```text
//! query   := conj ( "OR" conj )*
//! conj    := clause+                      implicit AND
//! clause  := [ name ":" ] value [ "^" number ]
//! value   := word | '"' chars '"'
//! ```
//!
//! A leading `field=name` directive replaces the default field for the rest of the string.

use std::fmt;

use crate::document::FieldKind;
use crate::error::{Error, Result};
use crate::schema::Schema;

#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term { field: String, term: String },
    And(Vec<Query>),
    Or(Vec<Query>),
    Boost(Box<Query>, f32),
}

impl Query {
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        Query::Term { field: field.into(), term: term.into() }
    }

    pub fn boosted(self, factor: f32) -> Self {
        Query::Boost(Box::new(self), factor)
    }

    /// A query with no clauses. Matches nothing.
    pub fn nothing() -> Self {
        Query::Or(Vec::new())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, children: &[Query], op: &str| -> fmt::Result {
            write!(f, "(")?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{child}")?;
            }
            write!(f, ")")
        };
        match self {
            Query::Term { field, term } => write!(f, "{field}:{term}"),
            Query::And(children) => join(f, children, "AND"),
            Query::Or(children) => join(f, children, "OR"),
            Query::Boost(inner, factor) => write!(f, "{inner}^{factor}"),
        }
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Or,
    Clause(String),
}

#[derive(Debug)]
struct Clause<'a> {
    field: Option<&'a str>,
    value: &'a str,
    quoted: bool,
    boost: Option<f32>,
}

/// Parses query strings against a schema so each field is analyzed the way it was indexed.
pub struct QueryParser<'a> {
    schema: &'a Schema,
    default_field: String,
}

impl<'a> QueryParser<'a> {
    pub fn new(schema: &'a Schema, default_field: impl Into<String>) -> Self {
        Self { schema, default_field: default_field.into() }
    }

    pub fn parse(&self, input: &str) -> Result<Query> {
        let mut rest = input.trim();
        let mut default_field = self.default_field.as_str();
        if !is_field_name(default_field) {
            return Err(Error::syntax(input, default_field, "invalid default field"));
        }

        if let Some(directive) = rest.strip_prefix("field=") {
            let end = directive.find(char::is_whitespace).unwrap_or(directive.len());
            let name = &directive[..end];
            if !is_field_name(name) {
                return Err(Error::syntax(input, format!("field={name}"), "invalid field name"));
            }
            default_field = name;
            rest = directive[end..].trim_start();
        }
        if rest.is_empty() {
            return Err(Error::syntax(input, "", "empty query"));
        }

        let tokens = lex(input, rest)?;
        let mut groups: Vec<Vec<&str>> = vec![Vec::new()];
        for token in &tokens {
            match token {
                Token::Or => {
                    if groups.last().is_some_and(Vec::is_empty) {
                        return Err(Error::syntax(input, "OR", "operator without a left operand"));
                    }
                    groups.push(Vec::new());
                }
                Token::Clause(text) => {
                    if let Some(group) = groups.last_mut() {
                        group.push(text);
                    }
                }
            }
        }
        if groups.last().is_some_and(Vec::is_empty) {
            return Err(Error::syntax(input, "OR", "operator without a right operand"));
        }

        let mut alternatives = Vec::new();
        for group in groups {
            let mut conjuncts = Vec::new();
            for text in group {
                let clause = split_clause(input, text)?;
                if let Some(query) = self.clause_query(default_field, &clause)? {
                    conjuncts.push(query);
                }
            }
            if let Some(query) = collapse(conjuncts, Query::And) {
                alternatives.push(query);
            }
        }
        Ok(collapse(alternatives, Query::Or).unwrap_or_else(Query::nothing))
    }

    fn clause_query(&self, default_field: &str, clause: &Clause<'_>) -> Result<Option<Query>> {
        let field = clause.field.unwrap_or(default_field);
        let kind = self.schema.get(field).map(|e| e.kind);

        let terms = match kind {
            Some(FieldKind::IndexedUntokenized) => vec![clause.value.to_string()],
            Some(FieldKind::IndexedTokenized) if clause.quoted => {
                return Err(Error::Schema {
                    field: field.to_string(),
                    reason: format!("exact value \"{}\" used on a tokenized field", clause.value),
                });
            }
            _ if clause.quoted => vec![clause.value.to_string()],
            _ => self.schema.analyzer(field).analyze(clause.value),
        };

        let query = collapse(terms.into_iter().map(|t| Query::term(field, t)).collect(), Query::And);
        Ok(match (query, clause.boost) {
            (Some(q), Some(b)) => Some(q.boosted(b)),
            (q, _) => q,
        })
    }
}

fn collapse(mut queries: Vec<Query>, combine: fn(Vec<Query>) -> Query) -> Option<Query> {
    match queries.len() {
        0 => None,
        1 => queries.pop(),
        _ => Some(combine(queries)),
    }
}

fn is_field_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Split on whitespace, keeping quoted spans intact.
fn lex(input: &str, text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(to_token(std::mem::take(&mut current)));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(Error::syntax(input, current, "unterminated quote"));
    }
    if !current.is_empty() {
        tokens.push(to_token(current));
    }
    Ok(tokens)
}

fn to_token(text: String) -> Token {
    if text == "OR" {
        Token::Or
    } else {
        Token::Clause(text)
    }
}

fn split_clause<'t>(input: &str, text: &'t str) -> Result<Clause<'t>> {
    let (field, rest) = match text.find([':', '"']) {
        Some(i) if text.as_bytes()[i] == b':' => {
            let name = &text[..i];
            if !is_field_name(name) {
                return Err(Error::syntax(input, text, "invalid field qualifier"));
            }
            (Some(name), &text[i + 1..])
        }
        _ => (None, text),
    };

    let (value, quoted, tail) = if let Some(inner) = rest.strip_prefix('"') {
        match inner.find('"') {
            Some(end) => (&inner[..end], true, &inner[end + 1..]),
            None => return Err(Error::syntax(input, text, "unterminated quote")),
        }
    } else {
        match rest.rfind('^') {
            Some(i) => (&rest[..i], false, &rest[i..]),
            None => (rest, false, ""),
        }
    };

    if value.is_empty() {
        return Err(Error::syntax(input, text, "missing value"));
    }

    let boost = if tail.is_empty() {
        None
    } else {
        let number = tail
            .strip_prefix('^')
            .ok_or_else(|| Error::syntax(input, text, "unexpected characters after value"))?;
        match number.parse::<f32>() {
            Ok(b) if b.is_finite() && b >= 0.0 => Some(b),
            _ => return Err(Error::syntax(input, text, "boost must be a non-negative number")),
        }
    };

    Ok(Clause { field, value, quoted, boost })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, Language};

    fn schema() -> Schema {
        let mut schema = Schema::new(Analyzer::for_language(Language::English));
        schema.register("contents", FieldKind::IndexedTokenized).unwrap();
        schema.register("keywords", FieldKind::IndexedUntokenized).unwrap();
        schema
    }

    fn parse(input: &str) -> Result<Query> {
        let schema = schema();
        QueryParser::new(&schema, "contents").parse(input)
    }

    #[test]
    fn whitespace_means_and() {
        let q = parse("Running jumps").unwrap();
        assert_eq!(q, Query::And(vec![Query::term("contents", "run"), Query::term("contents", "jump")]));
    }

    #[test]
    fn single_term_is_not_wrapped() {
        assert_eq!(parse("rust").unwrap(), Query::term("contents", "rust"));
    }

    #[test]
    fn or_groups_conjunctions() {
        let q = parse("rust OR keywords:Go").unwrap();
        assert_eq!(q, Query::Or(vec![Query::term("contents", "rust"), Query::term("keywords", "Go")]));
    }

    #[test]
    fn keyword_values_are_not_analyzed() {
        let q = parse(r#"keywords:"Machine Learning"^2"#).unwrap();
        assert_eq!(q, Query::term("keywords", "Machine Learning").boosted(2.0));
    }

    #[test]
    fn field_directive_sets_default_field() {
        let q = parse("field=keywords Rust").unwrap();
        assert_eq!(q, Query::term("keywords", "Rust"));
    }

    #[test]
    fn unknown_field_is_not_an_error() {
        let q = parse("field=nonexistent rust").unwrap();
        assert_eq!(q, Query::term("nonexistent", "rust"));
    }

    #[test]
    fn stopword_only_query_matches_nothing() {
        assert_eq!(parse("the and").unwrap(), Query::nothing());
    }

    #[test]
    fn syntax_errors() {
        for bad in ["", "   ", "field= rust", "field=", "rust OR", "OR rust", "a OR OR b", "\"open", "title:", ":x", "rust^abc", "rust^-1"] {
            assert!(
                matches!(parse(bad), Err(Error::QuerySyntax { .. })),
                "expected syntax error for {bad:?}"
            );
        }
    }

    #[test]
    fn field_directive_without_query_is_empty() {
        assert!(matches!(parse("field=title"), Err(Error::QuerySyntax { .. })));
    }

    #[test]
    fn quoted_value_on_text_field_is_schema_error() {
        assert!(matches!(parse(r#"contents:"exact phrase""#), Err(Error::Schema { .. })));
    }

    #[test]
    fn display_renders_tree() {
        let q = Query::And(vec![Query::term("contents", "a"), Query::term("title", "b").boosted(3.0)]);
        assert_eq!(q.to_string(), "(contents:a AND title:b^3)");
    }
}
