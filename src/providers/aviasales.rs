//! Flight prices from the Aviasales (Travelpayouts) data API.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ResultPayload, SearchProvider, SearchQuery, cities, format_datetime};
use crate::error::ProviderFailure;
use crate::session::TripQuery;

const DEFAULT_BASE_URL: &str = "https://api.travelpayouts.com";
const LINK_BASE_URL: &str = "https://www.aviasales.ru";

/// Cheapest tickets for the trip dates.
pub struct AviasalesProvider {
    token: SecretString,
    base_url: String,
    limit: usize,
    client: reqwest::Client,
}

impl AviasalesProvider {
    pub fn new(token: SecretString, limit: usize) -> Self {
        Self {
            token,
            base_url: DEFAULT_BASE_URL.to_string(),
            limit,
            client: reqwest::Client::new(),
        }
    }

    /// Point the provider at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/aviasales/v3/prices_for_dates", self.base_url)
    }

    fn params(&self, trip: &TripQuery) -> Result<Vec<(&'static str, String)>, ProviderFailure> {
        let origin = city_code(&trip.origin_city)?;
        let destination = city_code(&trip.destination_city)?;
        Ok(vec![
            ("origin", origin.to_string()),
            ("destination", destination.to_string()),
            ("departure_at", trip.start_date.format("%Y-%m-%d").to_string()),
            ("return_at", trip.end_date.format("%Y-%m-%d").to_string()),
            ("direct", "false".to_string()),
            ("one_way", "false".to_string()),
            ("sorting", "price".to_string()),
            ("currency", "rub".to_string()),
            ("limit", self.limit.to_string()),
            ("page", "1".to_string()),
        ])
    }
}

fn city_code(name: &str) -> Result<&'static str, ProviderFailure> {
    cities::lookup(name)
        .map(|codes| codes.iata)
        .ok_or_else(|| ProviderFailure::UnsupportedQuery(format!("unknown city {name:?}")))
}

#[async_trait]
impl SearchProvider for AviasalesProvider {
    fn name(&self) -> &str {
        "aviasales"
    }

    async fn search(&self, query: &SearchQuery) -> Result<ResultPayload, ProviderFailure> {
        let SearchQuery::Transport { trip } = query else {
            return Err(ProviderFailure::UnsupportedQuery(
                "aviasales only searches transport".to_string(),
            ));
        };

        let mut params = self.params(trip)?;
        params.push(("token", self.token.expose_secret().to_string()));

        let response = self
            .client
            .get(self.endpoint())
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: PricesResponse = response.json().await?;
        parse_prices(body, self.limit)
    }
}

#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    data: Vec<Ticket>,
}

fn default_success() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct Ticket {
    #[serde(default)]
    airline: Option<String>,
    #[serde(default)]
    flight_number: Option<serde_json::Value>,
    #[serde(default)]
    departure_at: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    transfers: Option<u32>,
    #[serde(default)]
    link: Option<String>,
}

fn parse_prices(body: PricesResponse, limit: usize) -> Result<ResultPayload, ProviderFailure> {
    if !body.success {
        return Err(ProviderFailure::MalformedResponse(
            body.error.unwrap_or_else(|| "success=false".to_string()),
        ));
    }

    let currency = body.currency.unwrap_or_else(|| "rub".to_string()).to_uppercase();
    let items = body
        .data
        .iter()
        .take(limit)
        .map(|ticket| render_ticket(ticket, &currency))
        .collect();

    Ok(ResultPayload::new("aviasales", items))
}

fn render_ticket(ticket: &Ticket, currency: &str) -> String {
    let flight_number = match &ticket.flight_number {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let flight = format!(
        "{} {}",
        ticket.airline.as_deref().unwrap_or("??"),
        flight_number
    );

    let mut parts = vec![flight.trim().to_string()];
    if let Some(departure) = &ticket.departure_at {
        parts.push(format_datetime(departure));
    }
    if let Some(price) = ticket.price {
        parts.push(format!("{price:.0} {currency}"));
    }
    match ticket.transfers {
        Some(0) => parts.push("без пересадок".to_string()),
        Some(n) => parts.push(format!("пересадок: {n}")),
        None => {}
    }
    // Links that are not site-relative are dropped rather than guessed at.
    if let Some(link) = ticket.link.as_deref().filter(|l| l.starts_with('/')) {
        parts.push(format!("{LINK_BASE_URL}{link}"));
    }
    parts.join(" · ")
}
