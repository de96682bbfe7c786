// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the session, the page renderer and the persisted
// settings, and gives the Dioxus UI snapshot-returning methods to call.
//
// The session is wrapped in `Arc<Mutex<>>` so a merge can run on a blocking
// worker while the UI keeps polling progress. A poisoned lock is recovered
// rather than propagated: the session state stays usable after a panic in a
// worker.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heftwerk_core::AppConfig;
use heftwerk_core::error::{HeftwerkError, Result};
use heftwerk_core::types::{ManagedDocument, MergedArtifact, UploadedFile};
use heftwerk_document::ThumbnailRenderer;
use heftwerk_document::render::encode_png;
use heftwerk_session::{Action, CycleReport, Notice, Session};
use image::RgbImage;
use tracing::{info, instrument, warn};

use super::data_dir;
use super::viewer::{PngViewer, png_data_url};

/// One tile of the preview strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Thumbnail {
    /// PNG data URL of the page.
    Ready(String),
    /// Shown where the page could not be rendered.
    Failed(Notice),
}

/// Shared application services accessible from all Dioxus components via
/// `use_context::<AppServices>()`.
#[derive(Clone)]
pub struct AppServices {
    session: Arc<Mutex<Session>>,
    renderer: Arc<ThumbnailRenderer>,
    data_dir: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl AppServices {
    /// Initialise all services. Call once at app startup.
    pub fn init() -> Result<Self> {
        let dir = data_dir::data_dir();
        info!(path = %dir.display(), "initialising app services");

        let config = load_config(&dir).unwrap_or_default();
        let session = Session::new(config.clone())?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            renderer: Arc::new(ThumbnailRenderer::new()),
            data_dir: dir,
            config: Arc::new(Mutex::new(config)),
        })
    }

    // -- Session cycle -------------------------------------------------------

    /// Run one interaction on the calling thread.
    pub fn run_cycle(
        &self,
        uploads: &[UploadedFile],
        action: Option<Action>,
        progress: &mut dyn FnMut(f32),
    ) -> CycleReport {
        self.session().run_cycle(uploads, action, progress)
    }

    /// Run a merge cycle on a blocking worker. `progress` is called from that
    /// worker after each input.
    pub fn spawn_merge(
        &self,
        uploads: Vec<UploadedFile>,
        mut progress: impl FnMut(f32) + Send + 'static,
    ) -> tokio::task::JoinHandle<CycleReport> {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            lock(&session).run_cycle(&uploads, Some(Action::Merge), &mut progress)
        })
    }

    /// Snapshot of the document list in merge order.
    pub fn documents(&self) -> Vec<ManagedDocument> {
        self.session().documents().to_vec()
    }

    pub fn merged(&self) -> Option<MergedArtifact> {
        self.session().merged().cloned()
    }

    pub fn advisory(&self, name: &str) -> Option<String> {
        self.session().advisory(name)
    }

    // -- Rendering -----------------------------------------------------------

    /// Current page of `name` as a PNG data URL at the configured width.
    #[instrument(skip(self))]
    pub fn render_current_page(&self, name: &str) -> Result<String> {
        let mut viewer = PngViewer::new(&self.renderer);
        self.session().render_current_page(name, &mut viewer)?;
        viewer
            .into_data_url()
            .ok_or_else(|| HeftwerkError::Render("viewer produced no image".into()))
    }

    /// Thumbnail tiles for the first `limit` pages of `name`.
    pub fn thumbnails(&self, name: &str, limit: usize) -> Vec<Thumbnail> {
        let strip = self.session().thumbnail_strip(name, limit, &self.renderer);
        tiles(strip)
    }

    pub fn previews_available(&self) -> bool {
        self.renderer.is_available()
    }

    // -- Download ------------------------------------------------------------

    /// Write the merged PDF to `path`.
    pub fn save_merged(&self, path: &Path) -> Result<()> {
        let merged = self
            .merged()
            .ok_or_else(|| HeftwerkError::UnknownDocument("merged PDF".into()))?;
        std::fs::write(path, &merged.bytes)?;
        info!(path = %path.display(), bytes = merged.bytes.len(), "merged PDF saved");
        Ok(())
    }

    // -- Config Persistence --------------------------------------------------

    /// Get a clone of the current config.
    pub fn config(&self) -> AppConfig {
        lock(&self.config).clone()
    }

    /// Update and persist the config, and apply it to the running session.
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        *lock(&self.config) = config.clone();
        self.session().set_config(config.clone());
        persist_config(&self.data_dir, config)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        lock(&self.session)
    }
}

/// Turn rendered pages into tiles; position `i` is page `i + 1`.
fn tiles(strip: Vec<Option<RgbImage>>) -> Vec<Thumbnail> {
    strip
        .into_iter()
        .enumerate()
        .map(|(index, image)| match image.map(|image| encode_png(&image)) {
            Some(Ok(png)) => Thumbnail::Ready(png_data_url(&png)),
            Some(Err(err)) => {
                warn!(page = index + 1, %err, "thumbnail could not be encoded");
                Thumbnail::Failed(Notice::preview_failed(index + 1))
            }
            None => Thumbnail::Failed(Notice::preview_failed(index + 1)),
        })
        .collect()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
        warn!("recovering poisoned lock");
        poisoned.into_inner()
    })
}

// -- Config file persistence -------------------------------------------------

const CONFIG_FILE: &str = "config.json";

fn load_config(data_dir: &Path) -> Option<AppConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let data = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&data) {
        Ok(config) => Some(config),
        Err(err) => {
            warn!(path = %path.display(), %err, "ignoring unreadable config");
            None
        }
    }
}

fn persist_config(data_dir: &Path, config: &AppConfig) -> Result<()> {
    let path = data_dir.join(CONFIG_FILE);
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json)?;
    Ok(())
}
