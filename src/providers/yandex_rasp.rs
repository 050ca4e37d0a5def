//! Train schedule from the Yandex Rasp search API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ResultPayload, SearchProvider, SearchQuery, cities, format_datetime};
use crate::error::ProviderFailure;
use crate::session::TripQuery;

const DEFAULT_BASE_URL: &str = "https://api.rasp.yandex.net";

pub struct YandexRaspProvider {
    api_key: SecretString,
    base_url: String,
    limit: usize,
    client: reqwest::Client,
}

impl YandexRaspProvider {
    pub fn new(api_key: SecretString, limit: usize) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            limit,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/v3.0/search/", self.base_url)
    }

    fn params(trip: &TripQuery) -> Result<Vec<(&'static str, String)>, ProviderFailure> {
        let from = city_code(&trip.origin_city)?;
        let to = city_code(&trip.destination_city)?;
        Ok(vec![
            ("format", "json".to_string()),
            ("from", from.to_string()),
            ("to", to.to_string()),
            ("date", trip.start_date.format("%Y-%m-%d").to_string()),
            ("lang", "ru_RU".to_string()),
            ("page", "1".to_string()),
            ("transport_types", "train".to_string()),
        ])
    }
}

fn city_code(name: &str) -> Result<&'static str, ProviderFailure> {
    cities::lookup(name)
        .map(|codes| codes.yandex)
        .ok_or_else(|| ProviderFailure::UnsupportedQuery(format!("unknown city {name:?}")))
}

#[async_trait]
impl SearchProvider for YandexRaspProvider {
    fn name(&self) -> &str {
        "yandex_rasp"
    }

    async fn search(&self, query: &SearchQuery) -> Result<ResultPayload, ProviderFailure> {
        let SearchQuery::Transport { trip } = query else {
            return Err(ProviderFailure::UnsupportedQuery(
                "yandex rasp only searches transport".to_string(),
            ));
        };

        let mut params = Self::params(trip)?;
        params.push(("apikey", self.api_key.expose_secret().to_string()));

        let response = self
            .client
            .get(self.endpoint())
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: ScheduleResponse = response.json().await?;
        Ok(parse_schedule(body, self.limit))
    }
}

#[derive(Debug, Deserialize)]
struct ScheduleResponse {
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    #[serde(default)]
    thread: Thread,
    #[serde(default)]
    departure: Option<String>,
    #[serde(default)]
    arrival: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    tickets_info: Option<TicketsInfo>,
}

#[derive(Debug, Default, Deserialize)]
struct Thread {
    #[serde(default)]
    number: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TicketsInfo {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
struct Place {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    price: Option<Price>,
}

#[derive(Debug, Deserialize)]
struct Price {
    whole: u64,
    #[serde(default)]
    cents: u64,
}

fn parse_schedule(body: ScheduleResponse, limit: usize) -> ResultPayload {
    let items = body
        .segments
        .iter()
        .take(limit)
        .map(render_segment)
        .collect();
    ResultPayload::new("yandex_rasp", items)
}

fn render_segment(segment: &Segment) -> String {
    let train = format!(
        "{} {}",
        segment.thread.number.as_deref().unwrap_or("—"),
        segment.thread.title.as_deref().unwrap_or("")
    );

    let mut parts = vec![train.trim().to_string()];
    if let (Some(dep), Some(arr)) = (&segment.departure, &segment.arrival) {
        parts.push(format!("{} → {}", format_datetime(dep), format_datetime(arr)));
    }
    if let Some(seconds) = segment.duration {
        parts.push(format_duration(seconds));
    }
    if let Some(cheapest) = cheapest_place(segment) {
        parts.push(cheapest);
    }
    parts.join(" · ")
}

fn cheapest_place(segment: &Segment) -> Option<String> {
    let place = segment
        .tickets_info
        .as_ref()?
        .places
        .iter()
        .filter(|p| p.price.is_some())
        .min_by_key(|p| p.price.as_ref().map(|pr| pr.whole * 100 + pr.cents))?;
    let price = place.price.as_ref()?;
    let amount = if price.cents > 0 {
        format!("{}.{:02}", price.whole, price.cents)
    } else {
        price.whole.to_string()
    };
    Some(format!(
        "от {amount} {}",
        place.currency.as_deref().unwrap_or("RUB")
    ))
}

/// Seconds as "X ч Y мин".
fn format_duration(seconds: f64) -> String {
    let total_minutes = (seconds / 60.0) as u64;
    format!("{} ч {} мин", total_minutes / 60, total_minutes % 60)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn params_use_yandex_codes() {
        let trip = TripQuery {
            origin_city: "Москва".into(),
            destination_city: "Санкт-Петербург".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            adult_count: 2,
        };
        let params = YandexRaspProvider::params(&trip).unwrap();
        assert!(params.contains(&("from", "c213".to_string())));
        assert!(params.contains(&("to", "c2".to_string())));
        assert!(params.contains(&("date", "2025-07-01".to_string())));
        assert!(params.contains(&("transport_types", "train".to_string())));
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_duration(29_700.0), "8 ч 15 мин");
        assert_eq!(format_duration(59.0), "0 ч 0 мин");
    }

    #[test]
    fn parses_segments() {
        let body: ScheduleResponse = serde_json::from_value(serde_json::json!({
            "search": {"date": "2025-07-01"},
            "segments": [
                {
                    "thread": {"number": "020У", "title": "Москва — Санкт-Петербург"},
                    "departure": "2025-07-01T00:35:00+03:00",
                    "arrival": "2025-07-01T08:50:00+03:00",
                    "duration": 29700.0,
                    "tickets_info": {"places": [
                        {"currency": "RUB", "price": {"whole": 4100, "cents": 0}, "name": "купе"},
                        {"currency": "RUB", "price": {"whole": 2500, "cents": 50}, "name": "плацкарт"}
                    ]}
                },
                {"thread": {}}
            ]
        }))
        .unwrap();

        let payload = parse_schedule(body, 5);
        assert_eq!(payload.items.len(), 2);
        assert_eq!(
            payload.items[0],
            "020У Москва — Санкт-Петербург · 01.07.2025 00:35 → 01.07.2025 08:50 · \
             8 ч 15 мин · от 2500.50 RUB"
        );
        assert_eq!(payload.items[1], "—");
    }

    #[test]
    fn empty_schedule_is_still_a_result() {
        let body: ScheduleResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parse_schedule(body, 5).items.is_empty());
    }
}
