//! Parser for the catalog and interaction data files.
//!
//! All files are `::`-separated, one record per line:
//! - items.dat: id::kind::tags::created::updated::views::likes::comments::avg_score::curated::enabled
//! - ratings.dat: userId::itemId::score
//! - browse.dat: userId::itemId::lastTime::count
//! - likes.dat: userId::itemId::time
//! - interests.dat: userId::tags
//!
//! Tags are pipe-separated (`3|17|42`), timestamps are unix seconds and
//! flags are `0`/`1`. Blank lines and lines starting with `#` are skipped.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const ITEMS_FILE: &str = "items.dat";
pub const RATINGS_FILE: &str = "ratings.dat";
pub const BROWSE_FILE: &str = "browse.dat";
pub const LIKES_FILE: &str = "likes.dat";
pub const INTERESTS_FILE: &str = "interests.dat";

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    Ok(fs::read_to_string(path)?)
}

/// One split record with enough context to report where parsing failed
struct Record<'a> {
    file: &'static str,
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> Record<'a> {
    fn split(file: &'static str, line: usize, raw: &'a str, expected: usize) -> Result<Self> {
        let fields: Vec<&str> = raw.split("::").map(str::trim).collect();
        if fields.len() != expected {
            return Err(DataLoadError::FieldCountMismatch {
                expected,
                found: fields.len(),
                line,
            });
        }
        Ok(Self { file, line, fields })
    }

    fn error(&self, reason: String) -> DataLoadError {
        DataLoadError::ParseError {
            file: self.file.to_string(),
            line: self.line,
            reason,
        }
    }

    fn parse<T>(&self, idx: usize, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.fields[idx]
            .parse()
            .map_err(|e| self.error(format!("Invalid {}: {}", name, e)))
    }

    fn timestamp(&self, idx: usize, name: &str) -> Result<DateTime<Utc>> {
        let secs: i64 = self.parse(idx, name)?;
        DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| self.error(format!("Invalid {}: {} out of range", name, secs)))
    }

    fn flag(&self, idx: usize, name: &str) -> Result<bool> {
        match self.fields[idx] {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(DataLoadError::InvalidValue {
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }

    fn tags(&self, idx: usize) -> Result<BTreeSet<TagId>> {
        parse_tags(self.fields[idx]).map_err(|e| self.error(format!("Invalid tags: {}", e)))
    }
}

/// Non-empty, non-comment lines with their 1-based line numbers
fn records(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Parse pipe-separated tag ids; an empty string is an empty set
///
/// Example: "3|17|42" -> {3, 17, 42}
fn parse_tags(s: &str) -> std::result::Result<BTreeSet<TagId>, std::num::ParseIntError> {
    s.split('|')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::parse)
        .collect()
}

fn parse_kind(s: &str) -> Result<ContentKind> {
    match s {
        "artwork" => Ok(ContentKind::Artwork),
        "post" => Ok(ContentKind::Post),
        _ => Err(DataLoadError::InvalidValue {
            field: "kind".to_string(),
            value: s.to_string(),
        }),
    }
}

pub fn parse_items_str(content: &str) -> Result<Vec<Item>> {
    let mut items = Vec::new();
    for (line_no, line) in records(content) {
        let r = Record::split(ITEMS_FILE, line_no, line, 11)?;
        items.push(Item {
            id: r.parse(0, "itemId")?,
            kind: parse_kind(r.fields[1])?,
            tags: r.tags(2)?,
            created_at: r.timestamp(3, "created")?,
            updated_at: r.timestamp(4, "updated")?,
            view_count: r.parse(5, "views")?,
            like_count: r.parse(6, "likes")?,
            comment_count: r.parse(7, "comments")?,
            average_score: r.parse(8, "avg_score")?,
            curated: r.flag(9, "curated")?,
            enabled: r.flag(10, "enabled")?,
        });
    }
    Ok(items)
}

pub fn parse_ratings_str(content: &str) -> Result<Vec<Rating>> {
    let mut ratings = Vec::new();
    for (line_no, line) in records(content) {
        let r = Record::split(RATINGS_FILE, line_no, line, 3)?;
        ratings.push(Rating::new(
            r.parse(0, "userId")?,
            r.parse(1, "itemId")?,
            r.parse(2, "score")?,
        )?);
    }
    Ok(ratings)
}

pub fn parse_browse_str(content: &str) -> Result<Vec<BrowseEvent>> {
    let mut events = Vec::new();
    for (line_no, line) in records(content) {
        let r = Record::split(BROWSE_FILE, line_no, line, 4)?;
        events.push(BrowseEvent {
            user_id: r.parse(0, "userId")?,
            item_id: r.parse(1, "itemId")?,
            last_time: r.timestamp(2, "lastTime")?,
            count: r.parse(3, "count")?,
        });
    }
    Ok(events)
}

pub fn parse_likes_str(content: &str) -> Result<Vec<LikeEvent>> {
    let mut likes = Vec::new();
    for (line_no, line) in records(content) {
        let r = Record::split(LIKES_FILE, line_no, line, 3)?;
        likes.push(LikeEvent {
            user_id: r.parse(0, "userId")?,
            item_id: r.parse(1, "itemId")?,
            created_at: r.timestamp(2, "time")?,
        });
    }
    Ok(likes)
}

pub fn parse_interests_str(content: &str) -> Result<Vec<UserInterestProfile>> {
    let mut profiles = Vec::new();
    for (line_no, line) in records(content) {
        let r = Record::split(INTERESTS_FILE, line_no, line, 2)?;
        profiles.push(UserInterestProfile {
            user_id: r.parse(0, "userId")?,
            tags: r.tags(1)?,
        });
    }
    Ok(profiles)
}

pub fn parse_items(path: &Path) -> Result<Vec<Item>> {
    parse_items_str(&read_file(path)?)
}

pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_ratings_str(&read_file(path)?)
}

pub fn parse_browse(path: &Path) -> Result<Vec<BrowseEvent>> {
    parse_browse_str(&read_file(path)?)
}

pub fn parse_likes(path: &Path) -> Result<Vec<LikeEvent>> {
    parse_likes_str(&read_file(path)?)
}

pub fn parse_interests(path: &Path) -> Result<Vec<UserInterestProfile>> {
    parse_interests_str(&read_file(path)?)
}
