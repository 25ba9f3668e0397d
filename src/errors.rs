use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// Direct read of a single document that does not exist.
    #[error("document not found: {0}")]
    NoSuchDocument(String),

    /// Store-level miss (reads, updates of absent documents).
    #[error("not found: {0}")]
    NotFound(String),

    /// Nothing matched, so there was nothing to write. Not an I/O failure.
    #[error("{0}")]
    NothingToOperate(&'static str),

    #[error("Invalid clause: {0}")]
    InvalidClause(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Bulk submission failed: {0}")]
    SubmissionFailed(String),

    #[error("{0}")]
    Joined(JoinedErrors),
}

impl DbError {
    /// True for the "nothing matched" condition, as opposed to a real failure.
    #[must_use]
    pub const fn is_nothing_to_operate(&self) -> bool {
        matches!(self, Self::NothingToOperate(_))
    }
}

/// Several independent failures reported together, one per line.
#[derive(Debug, Default)]
pub struct JoinedErrors(pub Vec<DbError>);

impl JoinedErrors {
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DbError> {
        self.0.iter()
    }
}

impl fmt::Display for JoinedErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_errors_one_per_line() {
        let j = JoinedErrors(vec![
            DbError::NotFound("users/a".into()),
            DbError::SubmissionFailed("group 2".into()),
        ]);
        assert_eq!(j.to_string(), "not found: users/a\nBulk submission failed: group 2");
        assert_eq!(DbError::Joined(j).to_string().lines().count(), 2);
    }

    #[test]
    fn direct_get_miss_message() {
        let e = DbError::NoSuchDocument("abc".into());
        assert_eq!(e.to_string(), "document not found: abc");
        assert!(DbError::NothingToOperate("no docs to batch").is_nothing_to_operate());
        assert!(!e.is_nothing_to_operate());
    }
}
