//! Application state: generative service handle, tunables, and the store of
//! recent generations kept around for export.
//!
//! The store is bounded: once `store_capacity` generations are held, the
//! oldest one is dropped on insert.

use std::{
    collections::{HashMap, VecDeque},
    path::PathBuf,
    sync::Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{
    export_dir_from_env, load_file_config_from_env, mask_key, FileConfig, GeminiSettings, GenerationSettings,
    Prompts, ScoringPolicy,
};
use crate::domain::{Generation, RequestLimits};
use crate::error::ConfigError;
use crate::gemini::{GeminiClient, GenerativeService};

#[derive(Default)]
struct GenerationStore {
    by_id: HashMap<Uuid, Generation>,
    order: VecDeque<Uuid>,
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn GenerativeService>,
    pub prompts: Prompts,
    pub scoring: ScoringPolicy,
    pub generation: GenerationSettings,
    pub export_dir: Option<PathBuf>,
    store: Arc<RwLock<GenerationStore>>,
}

impl AppState {
    /// Build state from env: load optional TOML config, require the API key,
    /// build the Gemini client.
    #[instrument(level = "info", skip_all)]
    pub fn from_env() -> Result<Self, ConfigError> {
        let cfg = load_file_config_from_env().unwrap_or_default();
        let client = GeminiClient::new(GeminiSettings::from_env()?)?;
        let settings = client.settings();
        info!(
            target: "questgen_backend",
            base_url = %settings.base_url,
            models = ?settings.models,
            timeout = ?settings.timeout,
            api_key = %mask_key(&settings.api_key),
            "Gemini enabled."
        );
        let export_dir = export_dir_from_env();
        if let Some(dir) = &export_dir {
            info!(target: "questgen_backend", dir = %dir.display(), "Exports will also be written to disk");
        }
        Ok(Self::new(cfg, Arc::new(client), export_dir))
    }

    pub fn new(cfg: FileConfig, service: Arc<dyn GenerativeService>, export_dir: Option<PathBuf>) -> Self {
        info!(
            target: "questgen_backend",
            service = service.name(),
            mixed_strategy = ?cfg.generation.mixed_strategy,
            store_capacity = cfg.generation.store_capacity,
            pass_threshold = cfg.scoring.pass_threshold,
            "Application state ready"
        );
        Self {
            service,
            prompts: cfg.prompts,
            scoring: cfg.scoring,
            generation: cfg.generation,
            export_dir,
            store: Arc::new(RwLock::new(GenerationStore::default())),
        }
    }

    pub fn limits(&self) -> &RequestLimits {
        &self.generation.limits
    }

    /// Store a generation, evicting the oldest ones beyond capacity.
    #[instrument(level = "debug", skip(self, g), fields(id = %g.id))]
    pub async fn insert_generation(&self, g: Generation) {
        let capacity = self.generation.store_capacity.max(1);
        let mut store = self.store.write().await;
        let id = g.id;
        if store.by_id.insert(id, g).is_none() {
            store.order.push_back(id);
        }
        while store.order.len() > capacity {
            if let Some(old) = store.order.pop_front() {
                store.by_id.remove(&old);
                debug!(target: "generation", evicted = %old, "Evicted generation from store");
            }
        }
    }

    #[instrument(level = "debug", skip(self, id), fields(%id))]
    pub async fn get_generation(&self, id: &Uuid) -> Option<Generation> {
        let store = self.store.read().await;
        store.by_id.get(id).cloned()
    }
}
