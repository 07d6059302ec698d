//! Typed search queries for the storage and mail collaborators.
//!
//! Values interpolated into a query are escaped when the query is rendered,
//! so names containing quotes or backslashes cannot break out of a literal.

use crate::storage::FileEntry;

/// MIME type the storage API uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Alias the storage API accepts for the top of the user's drive.
pub const TOP_LEVEL_ALIAS: &str = "root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileClause {
    NameEquals(String),
    InParent(String),
    TopLevel,
    MimeTypeEquals(String),
    NotTrashed,
    PropertyEquals { key: String, value: String },
}

/// Conjunction of [`FileClause`]s, rendered to the storage API's `q` syntax.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileQuery {
    clauses: Vec<FileClause>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-trashed folders named `name` directly under `parent`, or at the
    /// top level when no parent is given.
    pub fn folder(name: &str, parent: Option<&str>) -> Self {
        let query = Self::new().mime_type(FOLDER_MIME_TYPE).not_trashed();
        let query = match parent {
            Some(parent) => query.in_parent(parent),
            None => query.top_level(),
        };
        query.name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.clauses.push(FileClause::NameEquals(name.into()));
        self
    }

    pub fn in_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.clauses.push(FileClause::InParent(parent_id.into()));
        self
    }

    pub fn top_level(mut self) -> Self {
        self.clauses.push(FileClause::TopLevel);
        self
    }

    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.clauses.push(FileClause::MimeTypeEquals(mime_type.into()));
        self
    }

    pub fn not_trashed(mut self) -> Self {
        self.clauses.push(FileClause::NotTrashed);
        self
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push(FileClause::PropertyEquals {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn clauses(&self) -> &[FileClause] {
        &self.clauses
    }

    pub fn render(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| match clause {
                FileClause::NameEquals(name) => format!("name = '{}'", escape_literal(name)),
                FileClause::InParent(parent) => format!("'{}' in parents", escape_literal(parent)),
                FileClause::TopLevel => format!("'{}' in parents", TOP_LEVEL_ALIAS),
                FileClause::MimeTypeEquals(mime) => {
                    format!("mimeType = '{}'", escape_literal(mime))
                }
                FileClause::NotTrashed => "trashed = false".to_string(),
                FileClause::PropertyEquals { key, value } => format!(
                    "appProperties has {{ key='{}' and value='{}' }}",
                    escape_literal(key),
                    escape_literal(value)
                ),
            })
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// Evaluates the query against an entry without going through `q` syntax.
    pub fn matches(&self, entry: &FileEntry) -> bool {
        self.clauses.iter().all(|clause| match clause {
            FileClause::NameEquals(name) => entry.name == *name,
            FileClause::InParent(parent) => entry.parents.iter().any(|p| p == parent),
            FileClause::TopLevel => {
                entry.parents.is_empty() || entry.parents.iter().any(|p| p == TOP_LEVEL_ALIAS)
            }
            FileClause::MimeTypeEquals(mime) => entry.mime_type == *mime,
            FileClause::NotTrashed => !entry.trashed,
            FileClause::PropertyEquals { key, value } => {
                entry.app_properties.get(key).is_some_and(|v| v == value)
            }
        })
    }
}

/// Escapes a value for use inside a single-quoted query literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Mail search: a subject phrase, free-text phrases and an unread filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailQuery {
    subject: Option<String>,
    phrases: Vec<String>,
    unread_only: bool,
}

impl MailQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, phrase: impl Into<String>) -> Self {
        self.subject = Some(phrase.into());
        self
    }

    pub fn phrase(mut self, phrase: impl Into<String>) -> Self {
        self.phrases.push(phrase.into());
        self
    }

    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }

    pub fn subject_phrase(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_unread_only(&self) -> bool {
        self.unread_only
    }

    /// Renders Gmail search syntax, e.g. `subject:"you sent a file" "from your kindle" is:unread`.
    pub fn render(&self) -> String {
        let mut terms = Vec::new();
        if let Some(subject) = self.subject.as_deref().map(quote_phrase) {
            if !subject.is_empty() {
                terms.push(format!("subject:{}", subject));
            }
        }
        for phrase in &self.phrases {
            let quoted = quote_phrase(phrase);
            if !quoted.is_empty() {
                terms.push(quoted);
            }
        }
        if self.unread_only {
            terms.push("is:unread".to_string());
        }
        terms.join(" ")
    }
}

/// Gmail has no escape inside quoted phrases, so embedded quotes are dropped.
fn quote_phrase(phrase: &str) -> String {
    let cleaned: String = phrase.chars().filter(|c| *c != '"').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        String::new()
    } else {
        format!("\"{}\"", cleaned)
    }
}
