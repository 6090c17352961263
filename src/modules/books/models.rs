use std::collections::HashMap;

use bookshelf_db::{Book, BookFilter, BookPatch, NewBook};
use bookshelf_http::AppError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Natural-key fields a create request must carry.
pub const BOOK_FIELDS: [&str; 7] = [
    "name",
    "isbn",
    "authors",
    "number_of_pages",
    "publisher",
    "country",
    "release_date",
];

/// Query parameters of the four-way filter.
pub const FILTER_PARAMS: [&str; 4] = ["name", "country", "publisher", "release_date"];

const NAME_MAX: usize = 200;
const SHORT_TEXT_MAX: usize = 80;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// `data` entry of a successful create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedBook {
    pub book: Book,
}

/// Falsy values are null, false, zero, and empty strings, arrays or objects.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, AppError> {
    body.as_object()
        .ok_or_else(|| AppError::validation("request body must be a JSON object"))
}

fn text(value: &Value, field: &str, max: usize) -> Result<String, AppError> {
    let text = value
        .as_str()
        .ok_or_else(|| AppError::validation(format!("field '{field}' must be a string")))?;
    if text.chars().count() > max {
        return Err(AppError::validation(format!(
            "field '{field}' must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

fn authors(value: &Value) -> Result<Vec<String>, AppError> {
    let invalid = || AppError::validation("field 'authors' must be a list of strings");
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|author| author.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn pages(value: &Value) -> Result<i32, AppError> {
    value
        .as_i64()
        .and_then(|pages| i32::try_from(pages).ok())
        .ok_or_else(|| AppError::validation("field 'number_of_pages' must be an integer"))
}

fn release_date(value: &Value) -> Result<NaiveDate, AppError> {
    value
        .as_str()
        .and_then(|raw| NaiveDate::parse_from_str(raw, DATE_FORMAT).ok())
        .ok_or_else(|| AppError::validation("field 'release_date' must be a YYYY-MM-DD date"))
}

/// Validate a create body and extract the seven natural-key fields.
///
/// Every key present in the body must be truthy, extra keys included.
pub fn parse_new_book(body: &Value) -> Result<NewBook, AppError> {
    let fields = as_object(body)?;

    if let Some((key, _)) = fields.iter().find(|(_, value)| !is_truthy(value)) {
        return Err(AppError::validation(format!("field '{key}' must not be empty")));
    }
    if let Some(missing) = BOOK_FIELDS.iter().find(|field| !fields.contains_key(**field)) {
        return Err(AppError::validation(format!("field '{missing}' is required")));
    }

    Ok(NewBook {
        name: text(&fields["name"], "name", NAME_MAX)?,
        isbn: text(&fields["isbn"], "isbn", SHORT_TEXT_MAX)?,
        authors: authors(&fields["authors"])?,
        country: text(&fields["country"], "country", SHORT_TEXT_MAX)?,
        number_of_pages: pages(&fields["number_of_pages"])?,
        publisher: text(&fields["publisher"], "publisher", SHORT_TEXT_MAX)?,
        release_date: release_date(&fields["release_date"])?,
    })
}

/// Build a patch from the updatable keys present in `body`; others are ignored.
pub fn parse_patch(body: &Value) -> Result<BookPatch, AppError> {
    let fields = as_object(body)?;

    Ok(BookPatch {
        name: fields
            .get("name")
            .map(|v| text(v, "name", NAME_MAX))
            .transpose()?,
        isbn: fields
            .get("isbn")
            .map(|v| text(v, "isbn", SHORT_TEXT_MAX))
            .transpose()?,
        publisher: fields
            .get("publisher")
            .map(|v| text(v, "publisher", SHORT_TEXT_MAX))
            .transpose()?,
        number_of_pages: fields.get("number_of_pages").map(pages).transpose()?,
        country: fields
            .get("country")
            .map(|v| text(v, "country", SHORT_TEXT_MAX))
            .transpose()?,
        release_date: fields.get("release_date").map(release_date).transpose()?,
    })
}

/// No parameters means no filter; otherwise all four are required.
pub fn parse_filter(params: &HashMap<String, String>) -> Result<Option<BookFilter>, AppError> {
    if params.is_empty() {
        return Ok(None);
    }

    let missing: Vec<&str> = FILTER_PARAMS
        .iter()
        .copied()
        .filter(|param| !params.contains_key(*param))
        .collect();
    if !missing.is_empty() {
        return Err(AppError::validation(format!(
            "filtering requires name, country, publisher and release_date; missing {}",
            missing.join(", ")
        )));
    }

    let release_year = params["release_date"].trim().parse::<i32>().map_err(|_| {
        AppError::validation("query parameter 'release_date' must be a year, e.g. 2019")
    })?;

    Ok(Some(BookFilter {
        name: params["name"].clone(),
        country: params["country"].clone(),
        publisher: params["publisher"].clone(),
        release_year,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_body() -> Value {
        json!({
            "name": "book",
            "isbn": "1234",
            "country": "india",
            "publisher": "vishal",
            "authors": ["john doe"],
            "number_of_pages": 123,
            "release_date": "2019-01-01"
        })
    }

    #[test]
    fn truthiness_follows_empty_and_zero_rules() {
        for falsy in [json!(null), json!(""), json!(0), json!(0.0), json!([]), json!({}), json!(false)] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!("a"), json!(1), json!(-3), json!(["x"]), json!({"k": 1}), json!(true)] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn parses_complete_body() {
        let book = parse_new_book(&valid_body()).unwrap();
        assert_eq!(book.name, "book");
        assert_eq!(book.authors, vec!["john doe"]);
        assert_eq!(book.number_of_pages, 123);
        assert_eq!(book.release_date, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap());
    }

    #[test]
    fn extra_truthy_fields_are_ignored() {
        let mut body = valid_body();
        body["edition"] = json!("first");
        assert!(parse_new_book(&body).is_ok());
    }

    #[test]
    fn empty_or_missing_fields_are_rejected() {
        let mut empty_publisher = valid_body();
        empty_publisher["publisher"] = json!("");
        assert!(matches!(
            parse_new_book(&empty_publisher),
            Err(AppError::Validation { .. })
        ));

        let mut falsy_extra = valid_body();
        falsy_extra["edition"] = json!(null);
        assert!(parse_new_book(&falsy_extra).is_err());

        for field in BOOK_FIELDS {
            let mut body = valid_body();
            body.as_object_mut().unwrap().remove(field);
            let err = parse_new_book(&body).unwrap_err();
            assert!(err.to_string().contains(field), "{err}");
        }
    }

    #[test]
    fn wrong_types_are_rejected() {
        let cases = [
            ("authors", json!("john doe")),
            ("authors", json!(["john doe", 3])),
            ("number_of_pages", json!("123")),
            ("number_of_pages", json!(12.5)),
            ("release_date", json!("01/01/2019")),
            ("name", json!(42)),
        ];
        for (field, value) in cases {
            let mut body = valid_body();
            body[field] = value;
            assert!(parse_new_book(&body).is_err(), "{field} accepted");
        }
    }

    #[test]
    fn over_long_isbn_is_rejected() {
        let mut body = valid_body();
        body["isbn"] = json!("9".repeat(81));
        assert!(parse_new_book(&body).is_err());
    }

    #[test]
    fn patch_keeps_only_updatable_keys() {
        let patch = parse_patch(&json!({
            "publisher": "vishal kumar",
            "authors": ["someone else"],
            "id": 99
        }))
        .unwrap();

        assert_eq!(
            patch,
            BookPatch {
                publisher: Some("vishal kumar".to_string()),
                ..BookPatch::default()
            }
        );
    }

    #[test]
    fn patch_rejects_null_and_bad_types() {
        assert!(parse_patch(&json!({"name": null})).is_err());
        assert!(parse_patch(&json!({"number_of_pages": "many"})).is_err());
        assert!(parse_patch(&json!(["name"])).is_err());
    }

    #[test]
    fn filter_is_all_or_nothing() {
        assert_eq!(parse_filter(&HashMap::new()).unwrap(), None);

        let mut params: HashMap<String, String> = [
            ("name", "book"),
            ("country", "india"),
            ("publisher", "vishal"),
            ("release_date", "2019"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let filter = parse_filter(&params).unwrap().unwrap();
        assert_eq!(filter.release_year, 2019);

        params.remove("publisher");
        let err = parse_filter(&params).unwrap_err();
        assert!(err.to_string().contains("publisher"));

        params.insert("publisher".to_string(), "vishal".to_string());
        params.insert("release_date".to_string(), "last year".to_string());
        assert!(parse_filter(&params).is_err());
    }
}
