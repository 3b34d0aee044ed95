use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::RemoteProduct;
use crate::utils::{digits_only, pad_gtin};

/// A product database that can name a GTIN.
pub trait ProductSource {
    fn name(&self) -> &str;
    fn fetch(&self, gtin: &str) -> Result<Option<RemoteProduct>>;
}

fn clean_name(value: Option<&Value>) -> Option<String> {
    let name = value?.as_str()?.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn first_name(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| clean_name(object.get(*key)))
}

pub fn brocade_name(payload: &Value) -> Option<String> {
    first_name(payload, &["name", "description", "title", "product_name"])
}

pub fn open_food_facts_name(payload: &Value) -> Option<String> {
    if payload.get("status").and_then(Value::as_i64) != Some(1) {
        return None;
    }
    let product = payload.get("product")?;
    first_name(
        product,
        &["product_name", "product_name_en", "generic_name", "brands"],
    )
}

pub fn upc_item_db_name(payload: &Value) -> Option<String> {
    if payload.get("code").and_then(Value::as_str) != Some("OK") {
        return None;
    }
    let item = payload.get("items")?.as_array()?.first()?;
    first_name(item, &["title", "description", "brand"])
}

#[derive(Clone, Copy, Debug)]
enum Api {
    Brocade,
    OpenFoodFacts,
    UpcItemDb,
}

pub struct HttpSource {
    api: Api,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    fn new(api: Api, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("expiry-tracker/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { api, client })
    }

    pub fn brocade(timeout: Duration) -> Result<Self> {
        Self::new(Api::Brocade, timeout)
    }

    pub fn open_food_facts(timeout: Duration) -> Result<Self> {
        Self::new(Api::OpenFoodFacts, timeout)
    }

    pub fn upc_item_db(timeout: Duration) -> Result<Self> {
        Self::new(Api::UpcItemDb, timeout)
    }

    fn url(&self, gtin: &str) -> String {
        match self.api {
            Api::Brocade => format!("https://www.brocade.io/api/items/{}", gtin),
            Api::OpenFoodFacts => {
                format!("https://world.openfoodfacts.org/api/v2/product/{}.json", gtin)
            }
            Api::UpcItemDb => format!("https://api.upcitemdb.com/prod/trial/lookup?upc={}", gtin),
        }
    }
}

impl ProductSource for HttpSource {
    fn name(&self) -> &str {
        match self.api {
            Api::Brocade => "Brocade",
            Api::OpenFoodFacts => "OpenFoodFacts",
            Api::UpcItemDb => "UPCitemdb",
        }
    }

    fn fetch(&self, gtin: &str) -> Result<Option<RemoteProduct>> {
        let response = self.client.get(self.url(gtin)).send()?;
        if matches!(self.api, Api::Brocade) && !response.status().is_success() {
            return Ok(None);
        }
        let payload: Value = response.json()?;
        let name = match self.api {
            Api::Brocade => brocade_name(&payload),
            Api::OpenFoodFacts => open_food_facts_name(&payload),
            Api::UpcItemDb => upc_item_db_name(&payload),
        };
        Ok(name.map(|name| RemoteProduct {
            name,
            source: self.name().to_string(),
        }))
    }
}

/// Asks each source in turn and returns the first product name found.
pub struct LookupChain {
    enabled: bool,
    sources: Vec<Box<dyn ProductSource>>,
}

impl LookupChain {
    pub fn new(enabled: bool, sources: Vec<Box<dyn ProductSource>>) -> Self {
        Self { enabled, sources }
    }

    pub fn disabled() -> Self {
        Self::new(false, Vec::new())
    }

    /// Brocade (best coverage for medicines), then OpenFoodFacts, then UPCitemdb.
    pub fn http(enabled: bool, timeout: Duration) -> Result<Self> {
        let sources: Vec<Box<dyn ProductSource>> = vec![
            Box::new(HttpSource::brocade(timeout)?),
            Box::new(HttpSource::open_food_facts(timeout)?),
            Box::new(HttpSource::upc_item_db(timeout)?),
        ];
        Ok(Self::new(enabled, sources))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.sources.is_empty()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn lookup(&self, gtin: &str) -> Option<RemoteProduct> {
        if !self.is_enabled() {
            return None;
        }
        let clean = pad_gtin(&digits_only(gtin));
        for source in &self.sources {
            match source.fetch(&clean) {
                Ok(Some(product)) => {
                    debug!(gtin = %clean, source = source.name(), "remote lookup hit");
                    return Some(product);
                }
                Ok(None) => {}
                Err(e) => warn!(gtin = %clean, source = source.name(), error = %e, "remote lookup failed"),
            }
        }
        None
    }
}
