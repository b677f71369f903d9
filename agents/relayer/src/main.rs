//! The relayer accepts withdrawal proofs, checks their fee and relays them to
//! the mixer contracts from its own account.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use eyre::Result;
use mixer_base::CoreMetrics;
use prometheus::Registry;
use relayer::{settings::RelayerSettings, Relayer};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = RelayerSettings::load()?;
    settings.tracing.start_tracing()?;

    let core_metrics = Arc::new(CoreMetrics::new("relayer", Registry::new())?);
    let relayer = Relayer::from_settings(settings, core_metrics).await?;
    relayer.run().await
}
