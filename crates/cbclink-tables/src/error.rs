/// Errors that can occur while loading signal tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// The table file could not be read.
    #[error("failed to load tables: {0}")]
    LoadFailed(String),

    /// The table document is not valid JSON for the expected shape.
    #[error("table document is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// An id appears twice in one table.
    #[error("duplicate {table} id {id:#06x}")]
    DuplicateId { table: &'static str, id: u16 },

    /// A table holds more entries than the configured limit.
    #[error("{table} table has {count} entries (max {max})")]
    TooManyEntries {
        table: &'static str,
        count: usize,
        max: usize,
    },
}

pub type Result<T> = std::result::Result<T, TableError>;
