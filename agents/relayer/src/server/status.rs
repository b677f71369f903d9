use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use derive_new::new;
use mixer_core::{Address, Currency, GasPrices, PriceFeed, U256};
use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::nonce::NonceCoordinator;
use crate::settings::{MixerListing, MixerRegistry};

const STATUS_API_BASE: &str = "/status";

/// Public description of the relayer for wallets choosing a relayer
#[derive(new, Clone)]
pub struct ServerState {
    net_id: u64,
    mixers: Arc<MixerRegistry>,
    prices: Arc<dyn PriceFeed>,
    service_fee_percent: f64,
    nonces: Arc<NonceCoordinator>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse<'a> {
    relayer_address: Address,
    net_id: u64,
    mixers: &'a BTreeMap<Currency, MixerListing>,
    gas_prices: GasPrices,
    eth_prices: BTreeMap<Currency, U256>,
    relayer_service_fee: f64,
    nonce: U256,
}

impl ServerState {
    /// `GET /status`
    pub fn router(self) -> Router {
        Router::new()
            .route(STATUS_API_BASE, get(status))
            .with_state(self)
    }
}

async fn status(State(state): State<ServerState>) -> Response {
    let nonce = match state.nonces.next_nonce().await {
        Ok(nonce) => nonce,
        Err(err) => {
            error!(?err, "Failed to read the nonce counter");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to read relayer status" })),
            )
                .into_response();
        }
    };
    let prices = state.prices.snapshot();
    let status = StatusResponse {
        relayer_address: state.nonces.address(),
        net_id: state.net_id,
        mixers: state.mixers.listing(),
        gas_prices: prices.gas_prices,
        eth_prices: prices.eth_prices,
        relayer_service_fee: state.service_fee_percent,
        nonce,
    };
    Json(status).into_response()
}
