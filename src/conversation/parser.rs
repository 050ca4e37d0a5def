//! Input parser: turns the raw text of each step into structured answers.
//!
//! Parsing is pure: it never touches the session.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::ParseFailure;
use crate::session::{AccommodationQuery, FoodPreferences, PlaceCategory, TripQuery};

static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{1,2}-\d{1,2})\s*[-–—]\s*(\d{4}-\d{1,2}-\d{1,2})$")
        .expect("date range regex is valid")
});

// Spaces inside a number only separate groups of three digits: "5 000".
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[ \x{A0}]\d{3})+|\d+").expect("number regex is valid")
});

/// Largest party a single trip line may book for.
pub const MAX_GUESTS: u32 = 50;

/// Structured answer for a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    Trip(TripQuery),
    Accommodation(AccommodationQuery),
    Food(FoodPreferences),
    Places(BTreeSet<PlaceCategory>),
}

/// Which question the text answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Trip,
    Accommodation,
    Food,
    Places,
}

/// Parse the raw answer to `step`.
pub fn parse(step: Step, raw: &str) -> Result<ParsedInput, ParseFailure> {
    match step {
        Step::Trip => parse_trip(raw).map(ParsedInput::Trip),
        Step::Accommodation => Ok(ParsedInput::Accommodation(parse_accommodation(raw))),
        Step::Food => Ok(ParsedInput::Food(parse_food(raw))),
        Step::Places => Ok(ParsedInput::Places(parse_places(raw))),
    }
}

/// `origin, destination, YYYY-MM-DD - YYYY-MM-DD, guests`
pub fn parse_trip(raw: &str) -> Result<TripQuery, ParseFailure> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [origin, destination, dates, guests] = fields.as_slice() else {
        return Err(ParseFailure::FieldCountMismatch {
            found: fields.len(),
        });
    };

    if origin.is_empty() {
        return Err(ParseFailure::MissingCity { field: "откуда" });
    }
    if destination.is_empty() {
        return Err(ParseFailure::MissingCity { field: "куда" });
    }

    let (start_date, end_date) = parse_date_range(dates)?;
    let adult_count = parse_guest_count(guests)?;

    Ok(TripQuery {
        origin_city: origin.to_string(),
        destination_city: destination.to_string(),
        start_date,
        end_date,
        adult_count,
    })
}

fn parse_date_range(raw: &str) -> Result<(NaiveDate, NaiveDate), ParseFailure> {
    let caps = DATE_RANGE
        .captures(raw)
        .ok_or_else(|| ParseFailure::InvalidDateRange {
            reason: format!("ожидается формат ГГГГ-ММ-ДД - ГГГГ-ММ-ДД, получено «{raw}»"),
        })?;

    let date = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ParseFailure::InvalidDateRange {
            reason: format!("несуществующая дата {s}"),
        })
    };
    let start = date(&caps[1])?;
    let end = date(&caps[2])?;

    if start > end {
        return Err(ParseFailure::InvalidDateRange {
            reason: format!("дата начала {start} позже даты окончания {end}"),
        });
    }
    Ok((start, end))
}

fn parse_guest_count(raw: &str) -> Result<u32, ParseFailure> {
    let invalid = || ParseFailure::InvalidGuestCount {
        value: raw.to_string(),
    };
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    // All digits: anything that does not fit is simply too large.
    match raw.parse::<u32>() {
        Ok(0) => Err(invalid()),
        Ok(n) if n <= MAX_GUESTS => Ok(n),
        _ => Err(ParseFailure::GuestCountOutOfRange {
            value: raw.to_string(),
            max: MAX_GUESTS,
        }),
    }
}

/// Free text; the first number is read as a budget. Stay dates are filled in
/// later from the trip.
pub fn parse_accommodation(raw: &str) -> AccommodationQuery {
    let text = raw.trim().to_string();
    let budget = NUMBER.find(&text).and_then(|m| {
        let digits: String = m.as_str().chars().filter(char::is_ascii_digit).collect();
        digits.parse::<u32>().ok()
    });
    AccommodationQuery {
        text,
        budget,
        check_in: None,
        check_out: None,
    }
}

/// Free text plus comma-separated tags.
pub fn parse_food(raw: &str) -> FoodPreferences {
    let text = raw.trim().to_string();
    let tags = text
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    FoodPreferences { text, tags }
}

/// Comma-separated categories. Empty input (or a lone dash) is a valid
/// empty set.
pub fn parse_places(raw: &str) -> BTreeSet<PlaceCategory> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty() && !matches!(*t, "-" | "–" | "—"))
        .map(normalize_category)
        .collect()
}

fn normalize_category(tag: &str) -> PlaceCategory {
    let lower = tag.to_lowercase();
    match lower.as_str() {
        "музеи" | "музей" | "museum" | "museums" | "галереи" | "galleries" => {
            PlaceCategory::Museums
        }
        "театр" | "театры" | "theater" | "theatre" | "theaters" | "theatres" => {
            PlaceCategory::Theater
        }
        "природа" | "парки" | "парк" | "outdoors" | "nature" | "parks" => PlaceCategory::Outdoors,
        "архитектура" | "architecture" | "достопримечательности" | "sights" => {
            PlaceCategory::Architecture
        }
        "шопинг" | "магазины" | "shopping" => PlaceCategory::Shopping,
        "ночная жизнь" | "бары" | "клубы" | "nightlife" | "bars" => PlaceCategory::Nightlife,
        _ => PlaceCategory::Other(lower),
    }
}
