//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds an in-memory media tree, a resolved
//! engine configuration and a shared [`SessionRegistry`], and hands out
//! navigation controllers over them.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use slidequeue::config::{Config, EngineConfig, ProviderMode};
use slidequeue::navigation::NavigationController;
use slidequeue::registry::SessionRegistry;
use slidequeue::source::MemorySource;
use slidequeue_common::{MediaItem, MediaKind};

/// Root folder every harness tree lives under.
pub const ROOT: &str = "media";

/// Test harness wrapping an in-memory source and a session registry.
pub struct TestHarness {
    pub source: Arc<MemorySource>,
    pub registry: SessionRegistry,
    pub config: Config,
}

impl TestHarness {
    /// Random mode over an empty `media` folder, with a fixed seed.
    pub fn new() -> Self {
        Self::with_mode(ProviderMode::Random)
    }

    pub fn with_mode(mode: ProviderMode) -> Self {
        let source = MemorySource::new();
        source.add_folder(ROOT);
        let mut config = Config::for_root(ROOT, mode);
        config.engine.seed = Some(42);
        Self {
            source: Arc::new(source),
            registry: SessionRegistry::new(),
            config,
        }
    }

    /// `folders` sub-folders of `media`, each holding `per_folder` images.
    pub fn with_tree(mut self, folders: usize, per_folder: usize) -> Self {
        for f in 0..folders {
            let folder = format!("{ROOT}/album{f:03}");
            self.source.add_images(&folder, "img", per_folder);
        }
        self
    }

    /// `count` images directly under `media`, dated one minute apart.
    pub fn with_dated(self, count: u32) -> Self {
        for n in 1..=count {
            self.source.add_item(dated(n));
        }
        self
    }

    pub fn engine(&self) -> EngineConfig {
        self.config.resolve().expect("harness config resolves")
    }

    pub fn controller(&self) -> NavigationController {
        NavigationController::new(self.engine(), self.source.clone(), self.registry.clone())
            .expect("controller builds")
    }

    pub fn reattach(&self) -> NavigationController {
        NavigationController::reattach(self.engine(), self.source.clone(), self.registry.clone())
            .expect("controller reattaches")
    }

    /// A controller that has already been initialized.
    pub async fn ready_controller(&self) -> NavigationController {
        let mut nav = self.controller();
        assert!(nav.initialize().await.expect("initialize"), "controller not ready");
        nav
    }
}

/// Image `n` directly under the root, captured `n` minutes after a fixed epoch.
pub fn dated(n: u32) -> MediaItem {
    let title = format!("img{n:04}.jpg");
    MediaItem::new(format!("{ROOT}/{title}"), title, MediaKind::Image)
        .in_folder(ROOT)
        .with_captured_at(
            Utc.timestamp_opt(1_600_000_000 + i64::from(n) * 60, 0)
                .single()
                .expect("valid timestamp"),
        )
}
