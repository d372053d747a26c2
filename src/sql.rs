//! Minimal SQL AST for JOIN plans
//!
//! Plans are assembled as data (tables, aliases, equality conditions) and only
//! rendered to T-SQL text at the end. Identifiers come from catalog metadata
//! and are bracket-quoted whenever they are not plain words; string literals
//! are escaped.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref PLAIN_IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Quote an identifier unless it is a plain word
pub fn quote_ident(ident: &str) -> String {
    if PLAIN_IDENTIFIER.is_match(ident) {
        ident.to_string()
    } else {
        format!("[{}]", ident.replace(']', "]]"))
    }
}

/// Text safe to place after `--`: line breaks would end the comment
pub fn comment_text(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Render a string literal
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    pub fn as_sql(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        }
    }
}

/// `schema.table alias`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            alias: None,
        }
    }

    pub fn aliased(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.schema), quote_ident(&self.table))?;
        if let Some(alias) = &self.alias {
            write!(f, " {}", quote_ident(alias))?;
        }
        Ok(())
    }
}

/// `alias.column`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(qualifier: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.qualifier), quote_ident(&self.column))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `alias.*`
    AllFrom(String),
    /// `'text' AS alias`
    Literal { value: String, alias: String },
    /// Numeric literal with alias
    Number { value: f64, alias: String },
    /// `COUNT(*) AS alias`
    CountAll { alias: String },
}

impl fmt::Display for SelectItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectItem::AllFrom(alias) => write!(f, "{}.*", quote_ident(alias)),
            SelectItem::Literal { value, alias } => {
                write!(f, "{} AS {}", quote_literal(value), quote_ident(alias))
            }
            SelectItem::Number { value, alias } => write!(f, "{:.1} AS {}", value, quote_ident(alias)),
            SelectItem::CountAll { alias } => write!(f, "COUNT(*) AS {}", quote_ident(alias)),
        }
    }
}

/// `left = right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equality {
    pub left: ColumnRef,
    pub right: ColumnRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub kind: JoinKind,
    pub table: TableRef,
    pub conditions: Vec<Equality>,
    /// Comment line printed above the join
    pub comment: Option<String>,
}

/// Single `SELECT` statement
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    pub comments: Vec<String>,
    pub top: Option<u32>,
    pub items: Vec<SelectItem>,
    pub from: Option<TableRef>,
    pub joins: Vec<JoinClause>,
    pub order_by: Vec<ColumnRef>,
}

impl Select {
    pub fn new(from: TableRef) -> Self {
        Self {
            from: Some(from),
            ..Self::default()
        }
    }

    pub fn comment(mut self, text: impl Into<String>) -> Self {
        self.comments.push(text.into());
        self
    }

    pub fn top(mut self, rows: u32) -> Self {
        self.top = Some(rows);
        self
    }

    pub fn item(mut self, item: SelectItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn join(mut self, join: JoinClause) -> Self {
        self.joins.push(join);
        self
    }

    pub fn order_by(mut self, column: ColumnRef) -> Self {
        self.order_by.push(column);
        self
    }

    /// Render to SQL text without a trailing semicolon
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        for comment in &self.comments {
            lines.push(format!("-- {}", comment_text(comment)));
        }

        match self.top {
            Some(rows) => lines.push(format!("SELECT TOP {}", rows)),
            None => lines.push("SELECT".to_string()),
        }

        let items: Vec<String> = if self.items.is_empty() {
            vec!["*".to_string()]
        } else {
            self.items.iter().map(|i| i.to_string()).collect()
        };
        lines.push(format!("    {}", items.join(",\n    ")));

        if let Some(from) = &self.from {
            lines.push(format!("FROM {}", from));
        }

        for join in &self.joins {
            if let Some(comment) = &join.comment {
                lines.push(format!("-- {}", comment_text(comment)));
            }
            lines.push(format!("{} {}", join.kind.as_sql(), join.table));
            for (idx, condition) in join.conditions.iter().enumerate() {
                let keyword = if idx == 0 { "ON" } else { "AND" };
                lines.push(format!("    {} {} = {}", keyword, condition.left, condition.right));
            }
        }

        if !self.order_by.is_empty() {
            let columns: Vec<String> = self.order_by.iter().map(|c| c.to_string()).collect();
            lines.push(format!("ORDER BY {}", columns.join(", ")));
        }

        lines.join("\n")
    }
}

/// `SELECT ... UNION ALL SELECT ... ORDER BY col DESC`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnionAll {
    pub comments: Vec<String>,
    pub selects: Vec<Select>,
    /// Output column to sort the combined rows by, descending
    pub order_by_desc: Option<String>,
}

impl UnionAll {
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        for comment in &self.comments {
            parts.push(format!("-- {}", comment_text(comment)));
        }

        let body: Vec<String> = self.selects.iter().map(|s| s.render()).collect();
        parts.push(body.join("\nUNION ALL\n"));

        if let Some(column) = &self.order_by_desc {
            parts.push(format!("ORDER BY {} DESC", quote_ident(column)));
        }

        parts.join("\n")
    }
}
