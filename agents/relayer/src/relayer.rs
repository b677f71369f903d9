use std::sync::Arc;

use axum::Router;
use eyre::{eyre, Context, Result};
use mixer_base::{
    db::{RelayerRocksDB, DB},
    CoreMetrics,
};
use mixer_core::MixerChain;
use mixer_ethereum::{ConnectionConf, EthereumMixerClient};
use tracing::{info, info_span, Instrument};

use crate::{
    dispatcher::ResponseDispatcher,
    metrics::RelayerMetrics,
    nonce::NonceCoordinator,
    prices::SharedPriceFeed,
    queue::{JobDb, SubmissionQueue, SubmissionWorker},
    server::{relay, status, Server},
    settings::RelayerSettings,
    submitter::TransactionSubmitter,
    validator::RequestValidator,
};

/// A relayer agent: an HTTP front accepting withdrawals and a single
/// submission worker broadcasting them.
pub struct Relayer {
    port: u16,
    router: Router,
    worker: SubmissionWorker,
    metrics: RelayerMetrics,
}

impl std::fmt::Debug for Relayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Relayer {{ port: {} }}", self.port)
    }
}

impl Relayer {
    /// Open the database and connect to the node named in `settings`
    pub async fn from_settings(
        settings: RelayerSettings,
        core_metrics: Arc<CoreMetrics>,
    ) -> Result<Self> {
        let db = DB::from_path(&settings.db)
            .with_context(|| format!("Failed to open db at {}", settings.db.display()))?;
        let db = RelayerRocksDB::new(settings.net_id, db);

        let conf = ConnectionConf::new(settings.rpc_url.clone(), settings.net_id);
        let chain = EthereumMixerClient::new(&conf, &settings.private_key)
            .context("Failed to build chain client")?;

        Self::new(&settings, Arc::new(chain), db, core_metrics).await
    }

    /// Assemble the agent around `chain` and `db`. Synchronises the nonce
    /// counter with the chain and reloads jobs left over by a previous run.
    pub async fn new(
        settings: &RelayerSettings,
        chain: Arc<dyn MixerChain>,
        db: RelayerRocksDB,
        core_metrics: Arc<CoreMetrics>,
    ) -> Result<Self> {
        let metrics = RelayerMetrics::new(core_metrics)?;
        let relayer_address = chain.relayer_address();
        info!(?relayer_address, net_id = settings.net_id, "Starting relayer");

        let nonces = Arc::new(NonceCoordinator::new(
            Arc::new(db.clone()),
            relayer_address,
        ));
        let chain_count = chain
            .pending_transaction_count()
            .await
            .context("Failed to read the relayer account's transaction count")?;
        let next_nonce = nonces.sync_with_chain(chain_count).await?;
        metrics.set_next_nonce(next_nonce);

        let prices = SharedPriceFeed::new(settings.default_prices.clone());
        let mixers = Arc::new(settings.mixers.clone());
        let dispatcher = Arc::new(ResponseDispatcher::new(
            settings.max_pending_responses,
            metrics.clone(),
        ));

        let job_db: Arc<dyn JobDb> = Arc::new(db);
        let recovered = job_db.retrieve_pending_jobs().await?;
        let (queue, receiver) =
            SubmissionQueue::new(job_db.clone(), dispatcher.clone(), metrics.clone());

        let submitter = TransactionSubmitter::new(
            chain,
            Arc::new(prices.clone()),
            nonces.clone(),
            settings.net_id,
            settings.relayer_service_fee,
            metrics.clone(),
        );
        let worker = SubmissionWorker::new(
            receiver,
            recovered,
            job_db,
            submitter,
            dispatcher,
            metrics.clone(),
        );

        let validator = RequestValidator::new(mixers.clone(), relayer_address);
        let routes = Router::new()
            .merge(relay::ServerState::new(validator, queue, metrics.clone()).router())
            .merge(
                status::ServerState::new(
                    settings.net_id,
                    mixers,
                    Arc::new(prices),
                    settings.relayer_service_fee,
                    nonces,
                )
                .router(),
            );
        let router = Server::new(settings.port, metrics.clone()).router(routes);

        Ok(Self {
            port: settings.port,
            router,
            worker,
            metrics,
        })
    }

    /// The HTTP routes and the worker, to be driven separately
    pub fn into_parts(self) -> (Router, SubmissionWorker) {
        (self.router, self.worker)
    }

    /// Run the worker and serve HTTP until either stops
    pub async fn run(self) -> Result<()> {
        let worker = tokio::spawn(
            self.worker
                .run()
                .instrument(info_span!("SubmissionWorker")),
        );
        let server = Server::new(self.port, self.metrics).run(self.router);

        tokio::select! {
            res = server => res,
            res = worker => {
                res.context("Submission worker panicked")?;
                Err(eyre!("Submission worker stopped"))
            }
        }
    }
}
