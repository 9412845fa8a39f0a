//! Client and parser for the national weather observations feed.
//!
//! The feed is a single XML document with one `<station>` element per
//! observation site and the observation time as a `timestamp` attribute on
//! the `<observations>` root. Only stations that map to a known city are
//! kept. Unparseable numeric values degrade to absent; a malformed document
//! or transport failure fails the whole collection run and is retried on the
//! next tick.

use anyhow::{anyhow, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::info;

use crate::model::{City, WeatherSnapshot};
use crate::repository::WeatherDataRepository;

pub const DEFAULT_OBSERVATIONS_URL: &str =
    "https://www.ilmateenistus.ee/ilma_andmed/xml/observations.php";

#[derive(Debug, Clone)]
pub struct FeedClient {
    url: String,
    http: Client,
}

impl FeedClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), http: Client::new() }
    }

    /// Fetch and parse the current observations document.
    pub async fn fetch(&self) -> Result<Vec<WeatherSnapshot>> {
        let res = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("Failed to send request to the weather observations feed")?;

        let status = res.status();
        let body = res.text().await.context("Failed to read the observations response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Observations request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        parse_observations(&body)
    }
}

/// Run one collection pass: fetch the feed and store every snapshot for a
/// known city. Returns how many snapshots were stored.
pub async fn collect(client: &FeedClient, repo: &dyn WeatherDataRepository) -> Result<usize> {
    info!("collecting weather observations");
    let snapshots = client.fetch().await?;
    let count = snapshots.len();
    repo.store_all(snapshots).await.context("Failed to store weather snapshots")?;
    info!(count, "weather observations stored");
    Ok(count)
}

/// The station child elements the parser cares about.
enum Field {
    Name,
    AirTemperature,
    WindSpeed,
    Phenomenon,
}

#[derive(Default)]
struct StationRecord {
    name: String,
    air_temperature: Option<f64>,
    wind_speed: Option<f64>,
    phenomenon: Option<String>,
}

/// Parse the observations document into one snapshot per known station.
pub fn parse_observations(xml: &str) -> Result<Vec<WeatherSnapshot>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut timestamp: i64 = 0;
    let mut snapshots = Vec::new();
    let mut station: Option<StationRecord> = None;
    let mut field: Option<Field> = None;

    loop {
        match reader.read_event().context("Malformed observations XML")? {
            Event::Start(start) => match start.name().as_ref() {
                b"observations" => {
                    let attr = start
                        .try_get_attribute("timestamp")
                        .context("Malformed observations timestamp attribute")?
                        .ok_or_else(|| anyhow!("Observations document has no timestamp"))?;
                    timestamp = attr
                        .unescape_value()
                        .context("Malformed observations timestamp attribute")?
                        .parse()
                        .context("Observations timestamp is not an integer")?;
                }
                b"station" => station = Some(StationRecord::default()),
                b"name" => field = Some(Field::Name),
                b"airtemperature" => field = Some(Field::AirTemperature),
                b"windspeed" => field = Some(Field::WindSpeed),
                b"phenomenon" => field = Some(Field::Phenomenon),
                _ => field = None,
            },
            Event::Text(text) => {
                if let (Some(record), Some(tag)) = (station.as_mut(), field.as_ref()) {
                    let value = text.unescape().context("Malformed observations text")?;
                    match tag {
                        Field::Name => record.name = value.into_owned(),
                        Field::AirTemperature => record.air_temperature = value.trim().parse().ok(),
                        Field::WindSpeed => record.wind_speed = value.trim().parse().ok(),
                        Field::Phenomenon => {
                            let value = value.trim();
                            if !value.is_empty() {
                                record.phenomenon = Some(value.to_lowercase());
                            }
                        }
                    }
                }
            }
            Event::End(end) => {
                field = None;
                if end.name().as_ref() == b"station" {
                    if let Some(record) = station.take() {
                        if let Some(city) = City::from_station(&record.name) {
                            snapshots.push(WeatherSnapshot {
                                city,
                                timestamp,
                                air_temperature: record.air_temperature,
                                wind_speed: record.wind_speed,
                                phenomenon: record.phenomenon,
                            });
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(snapshots)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<observations timestamp="1679746140">
  <station>
    <name>Tallinn-Harku</name>
    <wmocode>26038</wmocode>
    <airtemperature>-2.1</airtemperature>
    <windspeed>4.2</windspeed>
    <phenomenon>Light snow shower</phenomenon>
  </station>
  <station>
    <name>Tartu-Tõravere</name>
    <wmocode>26242</wmocode>
    <airtemperature>-4.7</airtemperature>
    <windspeed>6.5</windspeed>
    <phenomenon></phenomenon>
  </station>
  <station>
    <name>Pärnu</name>
    <wmocode>41803</wmocode>
    <airtemperature></airtemperature>
    <windspeed></windspeed>
    <phenomenon>Overcast</phenomenon>
  </station>
  <station>
    <name>Viljandi</name>
    <wmocode>26231</wmocode>
    <airtemperature>1.0</airtemperature>
    <windspeed>2.0</windspeed>
    <phenomenon>Clear</phenomenon>
  </station>
</observations>"#;

    #[test]
    fn parses_one_snapshot_per_known_station() {
        let snapshots = parse_observations(SAMPLE).unwrap();
        assert_eq!(snapshots.len(), 3);

        let cities: Vec<City> = snapshots.iter().map(|s| s.city).collect();
        assert_eq!(cities, vec![City::Tallinn, City::Tartu, City::Parnu]);
    }

    #[test]
    fn timestamp_and_values_are_carried_over() {
        let snapshots = parse_observations(SAMPLE).unwrap();
        let tallinn = &snapshots[0];

        assert_eq!(tallinn.timestamp, 1_679_746_140);
        assert_eq!(tallinn.air_temperature, Some(-2.1));
        assert_eq!(tallinn.wind_speed, Some(4.2));
    }

    #[test]
    fn phenomenon_is_lowercased_and_empty_means_absent() {
        let snapshots = parse_observations(SAMPLE).unwrap();

        assert_eq!(snapshots[0].phenomenon.as_deref(), Some("light snow shower"));
        assert_eq!(snapshots[1].phenomenon, None);
    }

    #[test]
    fn empty_numeric_elements_become_absent_values() {
        let snapshots = parse_observations(SAMPLE).unwrap();
        let parnu = &snapshots[2];

        assert_eq!(parnu.air_temperature, None);
        assert_eq!(parnu.wind_speed, None);
        assert_eq!(parnu.phenomenon.as_deref(), Some("overcast"));
    }

    #[test]
    fn unparseable_numeric_value_degrades_to_absent() {
        let xml = r#"<observations timestamp="10">
            <station>
              <name>Tallinn-Harku</name>
              <airtemperature>n/a</airtemperature>
              <windspeed>3.0</windspeed>
            </station>
          </observations>"#;

        let snapshots = parse_observations(xml).unwrap();
        assert_eq!(snapshots[0].air_temperature, None);
        assert_eq!(snapshots[0].wind_speed, Some(3.0));
    }

    #[test]
    fn missing_timestamp_is_an_error() {
        let err = parse_observations("<observations></observations>").unwrap_err();
        assert!(err.to_string().contains("timestamp"));
    }

    #[test]
    fn malformed_document_is_an_error() {
        let xml = r#"<observations timestamp="1"><station></name></observations>"#;
        assert!(parse_observations(xml).is_err());
    }
}
