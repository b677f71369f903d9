//! Relayer configuration.
//!
//! The raw config is what `mixer_base::settings::load_settings_object`
//! deserializes; it is validated into [`RelayerSettings`] before anything is
//! started. The `config` crate may lowercase keys it reads from the
//! environment, so multi-word keys also accept their lowercased form.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use eyre::{ensure, eyre, Context, Result};
use mixer_base::settings::TracingConfig;
use mixer_core::{utils::parse_u256, Address, Currency, GasPrices, PriceSnapshot};
use serde::{Deserialize, Serialize};

/// Env var prefix for relayer settings
pub const ENV_PREFIX: &str = "MIXER_RELAYER";

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_MAX_PENDING_RESPONSES: usize = 1024;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_pending_responses() -> usize {
    DEFAULT_MAX_PENDING_RESPONSES
}

/// Settings as they appear in config files and the environment
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRelayerSettings {
    db: PathBuf,
    #[serde(alias = "rpcurl")]
    rpc_url: String,
    #[serde(alias = "netid")]
    net_id: u64,
    #[serde(alias = "privatekey")]
    private_key: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default, alias = "relayerservicefee")]
    relayer_service_fee: f64,
    #[serde(default)]
    mixers: BTreeMap<String, RawMixerConf>,
    #[serde(default, alias = "defaultprices")]
    default_prices: RawPrices,
    #[serde(
        default = "default_max_pending_responses",
        alias = "maxpendingresponses"
    )]
    max_pending_responses: usize,
    #[serde(default)]
    tracing: TracingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMixerConf {
    decimals: u32,
    #[serde(alias = "mixeraddress")]
    mixer_address: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPrices {
    #[serde(default, alias = "gasprices")]
    gas_prices: GasPrices,
    #[serde(default, alias = "ethprices")]
    eth_prices: BTreeMap<String, String>,
}

/// Validated relayer settings
#[derive(Debug, Clone)]
pub struct RelayerSettings {
    /// Directory of the rocksdb database
    pub db: PathBuf,
    /// Url of the JSON-RPC node
    pub rpc_url: String,
    /// Chain id of the network the mixers are deployed on
    pub net_id: u64,
    /// Hex encoded private key of the relayer account
    pub private_key: String,
    /// Port the HTTP server listens on
    pub port: u16,
    /// Service fee in percent of the withdrawn amount
    pub relayer_service_fee: f64,
    /// Supported mixer instances
    pub mixers: MixerRegistry,
    /// Price snapshot used until an updater publishes fresher quotes
    pub default_prices: PriceSnapshot,
    /// Upper bound of callers waiting for a job outcome at once
    pub max_pending_responses: usize,
    /// Logging configuration
    pub tracing: TracingConfig,
}

impl TryFrom<RawRelayerSettings> for RelayerSettings {
    type Error = eyre::Report;

    fn try_from(raw: RawRelayerSettings) -> Result<Self> {
        let key = raw.private_key.trim().trim_start_matches("0x");
        ensure!(
            key.len() == 64 && hex::decode(key).is_ok(),
            "privateKey must be a 32 byte hex string"
        );
        ensure!(
            raw.relayer_service_fee.is_finite() && raw.relayer_service_fee >= 0.0,
            "relayerServiceFee must be a non-negative number, got {}",
            raw.relayer_service_fee
        );
        ensure!(
            raw.max_pending_responses > 0,
            "maxPendingResponses must be at least 1"
        );

        let mixers = MixerRegistry::try_from_raw(raw.mixers)?;

        let eth_prices = raw
            .default_prices
            .eth_prices
            .into_iter()
            .map(|(currency, price)| {
                parse_u256(&price)
                    .map(|price| (Currency::new(&currency), price))
                    .ok_or_else(|| eyre!("Invalid eth price for {currency}: {price}"))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;

        Ok(Self {
            db: raw.db,
            rpc_url: raw.rpc_url,
            net_id: raw.net_id,
            private_key: raw.private_key,
            port: raw.port,
            relayer_service_fee: raw.relayer_service_fee,
            mixers,
            default_prices: PriceSnapshot {
                gas_prices: raw.default_prices.gas_prices,
                eth_prices,
            },
            max_pending_responses: raw.max_pending_responses,
            tracing: raw.tracing,
        })
    }
}

impl RelayerSettings {
    /// Load and validate the settings from the config files and environment
    pub fn load() -> Result<Self> {
        let raw: RawRelayerSettings = mixer_base::settings::load_settings_object(ENV_PREFIX)?;
        raw.try_into().context("Invalid relayer settings")
    }
}

/// A single deployed mixer contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerInstance {
    /// Asset the contract holds
    pub currency: Currency,
    /// Denomination, e.g. `"0.1"`
    pub amount: String,
    /// Decimals of `currency`
    pub decimals: u32,
}

/// Per-currency listing of the supported mixers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixerListing {
    /// Decimals of the currency
    pub decimals: u32,
    /// Mixer contract by denomination
    pub mixer_address: BTreeMap<String, Address>,
}

/// The mixer contracts this relayer accepts withdrawals for
#[derive(Debug, Clone, Default)]
pub struct MixerRegistry {
    by_address: HashMap<Address, MixerInstance>,
    listing: BTreeMap<Currency, MixerListing>,
}

impl MixerRegistry {
    fn try_from_raw(raw: BTreeMap<String, RawMixerConf>) -> Result<Self> {
        let mut registry = Self::default();
        for (currency, conf) in raw {
            let currency = Currency::new(&currency);
            let mut mixer_address = BTreeMap::new();
            for (amount, address) in conf.mixer_address {
                let address: Address = address
                    .trim()
                    .parse()
                    .map_err(|e| eyre!("Invalid mixer address for {currency} {amount}: {e}"))?;
                registry.insert(
                    address,
                    MixerInstance {
                        currency: currency.clone(),
                        amount: amount.clone(),
                        decimals: conf.decimals,
                    },
                )?;
                mixer_address.insert(amount, address);
            }
            registry.listing.insert(
                currency,
                MixerListing {
                    decimals: conf.decimals,
                    mixer_address,
                },
            );
        }
        Ok(registry)
    }

    fn insert(&mut self, address: Address, instance: MixerInstance) -> Result<()> {
        if let Some(existing) = self.by_address.get(&address) {
            return Err(eyre!(
                "Mixer {address:?} configured twice ({} {} and {} {})",
                existing.currency,
                existing.amount,
                instance.currency,
                instance.amount
            ));
        }
        self.by_address.insert(address, instance);
        Ok(())
    }

    /// Build a registry from `(contract, instance)` pairs
    pub fn from_instances(instances: impl IntoIterator<Item = (Address, MixerInstance)>) -> Self {
        let mut registry = Self::default();
        for (address, instance) in instances {
            registry
                .listing
                .entry(instance.currency.clone())
                .or_insert_with(|| MixerListing {
                    decimals: instance.decimals,
                    mixer_address: BTreeMap::new(),
                })
                .mixer_address
                .insert(instance.amount.clone(), address);
            registry.by_address.insert(address, instance);
        }
        registry
    }

    /// The mixer deployed at `contract`, if supported
    pub fn lookup(&self, contract: &Address) -> Option<&MixerInstance> {
        self.by_address.get(contract)
    }

    /// Supported mixers grouped by currency
    pub fn listing(&self) -> &BTreeMap<Currency, MixerListing> {
        &self.listing
    }

    /// Number of supported contracts
    pub fn len(&self) -> usize {
        self.by_address.len()
    }

    /// Whether no contract is supported
    pub fn is_empty(&self) -> bool {
        self.by_address.is_empty()
    }
}
