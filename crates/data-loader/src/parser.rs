//! Parsers for the CSV inputs.
//!
//! - ratings: `user_id,movie_id,label` (header line, extra columns ignored)
//! - movies:  `movie_id,title,genres` (title may be quoted, genres pipe-separated)

use crate::error::{DataLoadError, Result};
use crate::types::*;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One ratings row, by position. Ids go through `f64` because some exports
/// write them as floats ("12.0").
#[derive(Debug, Deserialize)]
struct RatingRecord {
    user_id: f64,
    movie_id: f64,
    label: f32,
}

#[derive(Debug, Deserialize)]
struct MovieRecord {
    movie_id: f64,
    title: String,
    genres: String,
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn csv_error(file: &str, err: csv::Error) -> DataLoadError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    let reason = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => DataLoadError::IoError(e),
        _ => DataLoadError::MalformedRecord {
            file: file.to_string(),
            line,
            reason,
        },
    }
}

/// Read every data row as `T`, paired with its 1-based line number.
///
/// The first row is the header. Rows need at least `required` fields; extras
/// past `columns` are dropped and missing optional ones read as empty.
fn read_records<R: Read, T: DeserializeOwned>(
    file: &str,
    reader: R,
    required: usize,
    columns: usize,
) -> Result<Vec<(usize, T)>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    loop {
        match csv_reader.read_record(&mut record) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => return Err(csv_error(file, e)),
        }
        let line = record.position().map_or(0, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }

        let malformed = |reason: String| DataLoadError::MalformedRecord {
            file: file.to_string(),
            line,
            reason,
        };
        if record.len() < required {
            return Err(malformed(format!(
                "Expected at least {} fields, found {}",
                required,
                record.len()
            )));
        }
        record.truncate(columns);
        while record.len() < columns {
            record.push_field("");
        }

        let row = record
            .deserialize::<T>(None)
            .map_err(|e| malformed(e.to_string()))?;
        rows.push((line, row));
    }
    Ok(rows)
}

/// Parse a ratings file
///
/// The first line is a header and is skipped unconditionally. Any row that
/// doesn't yield three numeric fields fails the whole file.
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_ratings_from_reader(&file_label(path), open(path)?)
}

/// Parse rating rows from any reader. The input includes the header.
pub fn parse_ratings_from_reader<R: Read>(file: &str, reader: R) -> Result<Vec<Rating>> {
    read_records::<_, RatingRecord>(file, reader, 3, 3)?
        .into_iter()
        .map(|(line, record)| {
            let malformed = |reason: String| DataLoadError::MalformedRecord {
                file: file.to_string(),
                line,
                reason,
            };
            if !record.label.is_finite() {
                return Err(DataLoadError::InvalidValue {
                    file: file.to_string(),
                    line,
                    field: "label",
                    value: record.label.to_string(),
                });
            }
            Ok(Rating {
                user_id: id_from_f64(record.user_id)
                    .map_err(|reason| malformed(format!("Invalid userId: {}", reason)))?,
                movie_id: id_from_f64(record.movie_id)
                    .map_err(|reason| malformed(format!("Invalid movieId: {}", reason)))?,
                label: record.label,
            })
        })
        .collect()
}

/// Check that an identifier column holds a non-negative integer.
fn id_from_f64(value: f64) -> std::result::Result<u32, String> {
    if !value.is_finite() || value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(format!("{} is not a non-negative integer", value));
    }
    Ok(value as u32)
}

/// Parse the movies catalog
///
/// Format: movieId,title,genres (genres may be absent)
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    parse_movies_from_reader(&file_label(path), open(path)?)
}

pub fn parse_movies_from_reader<R: Read>(file: &str, reader: R) -> Result<Vec<Movie>> {
    read_records::<_, MovieRecord>(file, reader, 2, 3)?
        .into_iter()
        .map(|(line, record)| {
            let id = id_from_f64(record.movie_id).map_err(|reason| DataLoadError::MalformedRecord {
                file: file.to_string(),
                line,
                reason: format!("Invalid movieId: {}", reason),
            })?;
            Ok(Movie {
                id,
                year: extract_year_from_title(&record.title),
                genres: parse_genres(&record.genres),
                title: record.title,
            })
        })
        .collect()
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        let year_str = &title[start + 1..end];
        if let Ok(year) = year_str.trim().parse::<u16>() {
            return Some(year);
        }
    }
    None
}

/// "Action|Adventure" -> ["Action", "Adventure"]; blank or the
/// "(no genres listed)" marker -> []
fn parse_genres(s: &str) -> Vec<String> {
    s.split('|')
        .map(str::trim)
        .filter(|g| !g.is_empty() && *g != "(no genres listed)")
        .map(str::to_string)
        .collect()
}
