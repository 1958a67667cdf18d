use std::fmt;

/// Machine-readable error codes for operator-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InputReadError,
    SprintNotFound,
    SnapshotNotFound,
    NoReferenceSnapshot,
    SnapshotCountMismatch,
    ImportParseError,
    CountOverflow,
    StoreUnavailable,
    CorruptStore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InputReadError => "E1003",
            Self::SprintNotFound => "E2001",
            Self::SnapshotNotFound => "E2002",
            Self::NoReferenceSnapshot => "E2003",
            Self::SnapshotCountMismatch => "E2004",
            Self::ImportParseError => "E2005",
            Self::CountOverflow => "E2006",
            Self::StoreUnavailable => "E3001",
            Self::CorruptStore => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Store not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InputReadError => "Input file unreadable",
            Self::SprintNotFound => "Sprint not found",
            Self::SnapshotNotFound => "Snapshot not found",
            Self::NoReferenceSnapshot => "No snapshot with positive counts",
            Self::SnapshotCountMismatch => "Snapshot counts disagree with work items",
            Self::ImportParseError => "Import file parse error",
            Self::CountOverflow => "Snapshot counter overflow",
            Self::StoreUnavailable => "Snapshot store unavailable",
            Self::CorruptStore => "Corrupt SQLite store",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `sdash init` to create the store."),
            Self::ConfigParseError => Some("Fix syntax in .sprintdash/config.toml and retry."),
            Self::InputReadError => Some("Check that the file exists and is readable."),
            Self::SprintNotFound => Some("Check the sprint id; `sdash validate` lists known sprints."),
            Self::SnapshotNotFound | Self::NoReferenceSnapshot => None,
            Self::SnapshotCountMismatch => {
                Some("Run `sdash fix-counts` then `sdash rebuild` to repair the snapshots.")
            }
            Self::ImportParseError => Some("Check the import file against the export format."),
            Self::CountOverflow => Some("Inspect the reference snapshot; its counters look corrupt."),
            Self::StoreUnavailable => Some("Check the --db path and file permissions, then re-run."),
            Self::CorruptStore => Some("Restore the store from a backup and re-run the sync."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Find the first [`ErrorCode`] carried anywhere in an error chain.
#[must_use]
pub fn code_of(err: &anyhow::Error) -> Option<ErrorCode> {
    err.chain().find_map(|cause| {
        cause
            .downcast_ref::<crate::store::StoreError>()
            .map(crate::store::StoreError::code)
            .or_else(|| {
                cause
                    .downcast_ref::<crate::import::ImportError>()
                    .map(crate::import::ImportError::code)
            })
            .or_else(|| {
                cause
                    .downcast_ref::<crate::config::ConfigError>()
                    .map(crate::config::ConfigError::code)
            })
            .or_else(|| {
                cause
                    .downcast_ref::<crate::reconcile::MismatchError>()
                    .map(crate::reconcile::MismatchError::code)
            })
            .or_else(|| {
                cause
                    .downcast_ref::<crate::reconcile::SprintNotFoundError>()
                    .map(crate::reconcile::SprintNotFoundError::code)
            })
            .or_else(|| {
                cause
                    .downcast_ref::<crate::reconcile::CountOverflowError>()
                    .map(crate::reconcile::CountOverflowError::code)
            })
    })
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, code_of};
    use crate::store::StoreError;
    use anyhow::Context;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::NotInitialized,
            ErrorCode::ConfigParseError,
            ErrorCode::SprintNotFound,
            ErrorCode::SnapshotNotFound,
            ErrorCode::NoReferenceSnapshot,
            ErrorCode::SnapshotCountMismatch,
            ErrorCode::ImportParseError,
            ErrorCode::CountOverflow,
            ErrorCode::InputReadError,
            ErrorCode::StoreUnavailable,
            ErrorCode::CorruptStore,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::SnapshotCountMismatch.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn code_of_finds_store_error_behind_context() {
        let err = Err::<(), _>(StoreError::SnapshotNotFound { snapshot_id: 12 })
            .context("update snapshot counts")
            .unwrap_err();
        assert_eq!(code_of(&err), Some(ErrorCode::SnapshotNotFound));
    }

    #[test]
    fn code_of_finds_mismatch_error() {
        let err = anyhow::Error::new(crate::reconcile::MismatchError {
            mismatched: 2,
            checked: 9,
        });
        assert_eq!(code_of(&err), Some(ErrorCode::SnapshotCountMismatch));
    }

    #[test]
    fn code_of_plain_error_is_none() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(code_of(&err), None);
    }
}
