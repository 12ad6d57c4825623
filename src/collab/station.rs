use std::{collections::HashMap, time::Duration};

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::{StationPrice, StationSource};
use crate::app::Logger;
use crate::config::FuelType;
use crate::guard::{Fault, FaultKind};

const PRICES_URL: &str = "https://creativecommons.tankerkoenig.de/json/prices.php";

#[derive(Debug, Deserialize)]
struct PricesResponse {
    ok: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    prices: HashMap<String, HashMap<String, Value>>,
}

/// Tankerkönig price client for a fixed list of stations.
pub struct Tankerkoenig {
    station_ids: Vec<String>,
    fuel_type: FuelType,
    api_key: String,
    client: reqwest::blocking::Client,
    logger: Logger,
}

impl Tankerkoenig {
    pub fn new(
        station_ids: Vec<String>,
        fuel_type: FuelType,
        api_key: impl Into<String>,
        timeout: Duration,
        logger: Logger,
    ) -> crate::Result<Self> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            station_ids,
            fuel_type,
            api_key: api_key.into(),
            client,
            logger,
        })
    }

    fn request(&self) -> crate::Result<PricesResponse> {
        let ids = self.station_ids.join(",");
        let response = self
            .client
            .get(PRICES_URL)
            .query(&[("ids", ids.as_str()), ("apikey", self.api_key.as_str())])
            .send()?;
        let status = response.status();
        if is_rejection(status) {
            let body = response.text()?;
            return Ok(rejected_response(status, &body));
        }
        Ok(response.error_for_status()?.json()?)
    }
}

/// Key or station rejections the user has to fix in the configuration.
fn is_rejection(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

fn rejected_response(status: StatusCode, body: &str) -> PricesResponse {
    let message = serde_json::from_str::<PricesResponse>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    PricesResponse {
        ok: false,
        message: Some(message),
        prices: HashMap::new(),
    }
}

fn accepted(response: PricesResponse) -> Result<PricesResponse, Fault> {
    if response.ok {
        return Ok(response);
    }
    let message = response
        .message
        .unwrap_or_else(|| "request rejected".to_string());
    Err(Fault::new(
        FaultKind::StationRejected,
        [
            "The fuel price service rejected the request:".to_string(),
            message,
            "Please check the API key and station IDs.".to_string(),
        ],
    ))
}

/// Prices in configured station order. Stations missing from the response
/// read as closed.
fn prices_from(
    response: &PricesResponse,
    station_ids: &[String],
    fuel_type: FuelType,
) -> Vec<StationPrice> {
    station_ids
        .iter()
        .map(|id| {
            let entry = response.prices.get(id);
            let open = entry
                .and_then(|fields| fields.get("status"))
                .and_then(Value::as_str)
                == Some("open");
            let price = entry
                .and_then(|fields| fields.get(fuel_type.as_str()))
                .and_then(Value::as_f64);
            StationPrice {
                id: id.clone(),
                open,
                price: if open { price } else { None },
            }
        })
        .collect()
}

impl StationSource for Tankerkoenig {
    fn fetch(&mut self) -> Result<Vec<StationPrice>, Fault> {
        let response = self.request().map_err(|err| {
            self.logger.warn(format!("station fetch failed: {err}"));
            Fault::new(
                FaultKind::StationFetch,
                [
                    "Could not load the fuel prices.".to_string(),
                    format!("{err}"),
                ],
            )
        })?;
        let response = accepted(response).inspect_err(|fault| {
            self.logger
                .warn(format!("tankerkoenig rejected request: {fault}"));
        })?;
        Ok(prices_from(&response, &self.station_ids, self.fuel_type))
    }
}
