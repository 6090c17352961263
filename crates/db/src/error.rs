use thiserror::Error;

/// Unique column a write collided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Name,
    Isbn,
}

impl std::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UniqueField::Name => f.write_str("name"),
            UniqueField::Isbn => f.write_str("isbn"),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("a book with this {field} already exists: {value}")]
    ConstraintViolation { field: UniqueField, value: String },

    #[error("database failure: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub fn duplicate(field: UniqueField, value: impl Into<String>) -> Self {
        Self::ConstraintViolation {
            field,
            value: value.into(),
        }
    }
}
