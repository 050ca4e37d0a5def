//! Summary composer: renders the final trip report from a session.
//!
//! Read-only and deterministic. Every provider kind gets a section, so a
//! missing or failed search shows up as an explicit "unavailable" notice.

use std::fmt::Write;

use crate::providers::{ProviderKind, ProviderResult};
use crate::session::Session;

const NOT_GIVEN: &str = "не указано";
const NOT_SEARCHED: &str = "поиск не выполнялся";

/// Build the summary text for `session`.
pub fn compose(session: &Session) -> String {
    let mut out = String::from("🧳 Сводка поездки\n\n");

    let _ = writeln!(
        out,
        "Поездка: {}",
        session.trip_text.as_deref().unwrap_or(NOT_GIVEN)
    );
    if let Some(trip) = &session.trip_query {
        let _ = writeln!(
            out,
            "Маршрут: {} → {}",
            trip.origin_city, trip.destination_city
        );
        let _ = writeln!(
            out,
            "Даты: {} - {} (ночей: {})",
            trip.start_date.format("%d.%m.%Y"),
            trip.end_date.format("%d.%m.%Y"),
            trip.nights()
        );
        let _ = writeln!(out, "Гостей: {}", trip.adult_count);
    }

    match &session.accommodation_query {
        Some(acc) => {
            let _ = write!(out, "Жильё: {}", non_empty(&acc.text));
            if let Some(budget) = acc.budget {
                let _ = write!(out, " (бюджет до {budget} ₽)");
            }
            out.push('\n');
        }
        None => {
            let _ = writeln!(out, "Жильё: {NOT_GIVEN}");
        }
    }

    let food = session
        .food_preferences
        .as_ref()
        .map(|f| non_empty(&f.text))
        .unwrap_or(NOT_GIVEN);
    let _ = writeln!(out, "Еда: {food}");

    let places = match &session.place_categories {
        Some(categories) if !categories.is_empty() => categories
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Some(_) => "без предпочтений".to_string(),
        None => NOT_GIVEN.to_string(),
    };
    let _ = writeln!(out, "Места: {places}");

    for kind in ProviderKind::ALL {
        out.push('\n');
        render_section(&mut out, kind, session.provider_results.get(&kind));
    }

    out.trim_end().to_string()
}

fn render_section(out: &mut String, kind: ProviderKind, result: Option<&ProviderResult>) {
    let _ = writeln!(out, "{}", kind.title());
    match result {
        Some(ProviderResult::Found { payload }) if payload.items.is_empty() => {
            out.push_str("ничего не найдено\n");
        }
        Some(ProviderResult::Found { payload }) => {
            for item in &payload.items {
                let _ = writeln!(out, "• {item}");
            }
        }
        Some(ProviderResult::Failed { failure }) => {
            let _ = writeln!(out, "недоступно: {failure}");
        }
        None => {
            let _ = writeln!(out, "недоступно: {NOT_SEARCHED}");
        }
    }
}

fn non_empty(text: &str) -> &str {
    if text.trim().is_empty() { NOT_GIVEN } else { text }
}
