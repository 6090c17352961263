use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

pub type BookId = i64;

/// A persisted book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Book {
    pub id: BookId,
    pub name: String,
    pub isbn: String,
    pub authors: Vec<String>,
    pub country: String,
    pub number_of_pages: i32,
    pub publisher: String,
    pub release_date: NaiveDate,
}

/// The natural-key fields of a book, everything but the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub name: String,
    pub isbn: String,
    pub authors: Vec<String>,
    pub country: String,
    pub number_of_pages: i32,
    pub publisher: String,
    pub release_date: NaiveDate,
}

impl NewBook {
    pub(crate) fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            name: self.name,
            isbn: self.isbn,
            authors: self.authors,
            country: self.country,
            number_of_pages: self.number_of_pages,
            publisher: self.publisher,
            release_date: self.release_date,
        }
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookPatch {
    pub name: Option<String>,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub number_of_pages: Option<i32>,
    pub country: Option<String>,
    pub release_date: Option<NaiveDate>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns a copy of `book` with the patched fields applied.
    pub fn apply(&self, book: &Book) -> Book {
        let mut merged = book.clone();
        if let Some(name) = &self.name {
            merged.name = name.clone();
        }
        if let Some(isbn) = &self.isbn {
            merged.isbn = isbn.clone();
        }
        if let Some(publisher) = &self.publisher {
            merged.publisher = publisher.clone();
        }
        if let Some(pages) = self.number_of_pages {
            merged.number_of_pages = pages;
        }
        if let Some(country) = &self.country {
            merged.country = country.clone();
        }
        if let Some(release_date) = self.release_date {
            merged.release_date = release_date;
        }
        merged
    }
}

/// Four-way equality filter. All four keys are required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookFilter {
    pub name: String,
    pub country: String,
    pub publisher: String,
    pub release_year: i32,
}

impl BookFilter {
    pub fn matches(&self, book: &Book) -> bool {
        book.name == self.name
            && book.country == self.country
            && book.publisher == self.publisher
            && book.release_date.year() == self.release_year
    }
}

/// Outcome of an update: the record as it was and as it is now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub before: Book,
    pub after: Book,
}
