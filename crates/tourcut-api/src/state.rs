//! Application state.

use std::sync::Arc;

use tourcut_pipeline::{
    render_channel, ClipExtractor, CommandRenderTool, Delivery, DeliveryNotifier,
    PipelineConfig, RenderOrchestrator, RenderTool, RenderWorker,
};
use tourcut_storage::DeliveryClient;
use tourcut_store::Store;
use tourcut_timeline::TimelinePositioner;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    pub positioner: Arc<TimelinePositioner>,
    pub extractor: Arc<ClipExtractor>,
    pub orchestrator: Arc<RenderOrchestrator>,
    pub notifier: Arc<DeliveryNotifier>,
}

impl AppState {
    /// Create application state plus the render worker the binary
    /// spawns alongside the server.
    pub async fn new(
        config: ApiConfig,
    ) -> Result<(Self, RenderWorker), Box<dyn std::error::Error>> {
        let store = Store::open(&config.database_path).await?;
        let pipeline_config = PipelineConfig::from_env();

        let delivery = DeliveryClient::from_env_opt()?
            .map(|client| Arc::new(client) as Arc<dyn Delivery>);
        let notifier = Arc::new(DeliveryNotifier::new(store.clone(), delivery));

        let (render_tx, render_rx) = render_channel(pipeline_config.render_queue_capacity);
        let tool: Option<Arc<dyn RenderTool>> = pipeline_config
            .render_command
            .as_deref()
            .map(|cmd| {
                Arc::new(CommandRenderTool::new(cmd, &pipeline_config.renders_dir))
                    as Arc<dyn RenderTool>
            });
        let worker = RenderWorker::new(
            store.clone(),
            Arc::clone(&notifier),
            tool,
            render_rx,
        );

        let extractor = Arc::new(ClipExtractor::new(store.clone(), pipeline_config.clone()));
        let orchestrator = Arc::new(RenderOrchestrator::new(
            store.clone(),
            pipeline_config,
            render_tx,
        ));

        let state = Self {
            config,
            store,
            positioner: Arc::new(TimelinePositioner::default()),
            extractor,
            orchestrator,
            notifier,
        };
        Ok((state, worker))
    }
}
