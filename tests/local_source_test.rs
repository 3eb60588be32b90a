//! End-to-end sessions over a real directory tree.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use slidequeue::config::{Config, ProviderMode};
use slidequeue::navigation::NavigationController;
use slidequeue::registry::SessionRegistry;
use slidequeue::source::LocalSource;
use slidequeue_common::{MediaKind, MutationAction};
use tempfile::tempdir;

fn populate(root: &Path) {
    for album in ["2019", "2020", "2021"] {
        let dir = root.join(album);
        fs::create_dir_all(&dir).unwrap();
        for n in 0..4 {
            fs::write(dir.join(format!("photo{n}.jpg")), b"jpg").unwrap();
        }
    }
    fs::write(root.join("clip.mp4"), b"mp4").unwrap();
    fs::write(root.join("notes.txt"), b"txt").unwrap();
    fs::create_dir_all(root.join(".thumbs")).unwrap();
    fs::write(root.join(".thumbs/hidden.jpg"), b"jpg").unwrap();
}

fn controller(root: &Path, mode: ProviderMode) -> NavigationController {
    let mut config = Config::for_root(root.to_string_lossy(), mode);
    config.engine.seed = Some(5);
    NavigationController::new(
        config.resolve().unwrap(),
        Arc::new(LocalSource::new()),
        SessionRegistry::new(),
    )
    .unwrap()
}

#[tokio::test]
async fn random_session_shows_every_media_file_once() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let mut nav = controller(dir.path(), ProviderMode::Random);
    assert!(nav.initialize().await.unwrap());

    let mut seen = HashSet::new();
    for _ in 0..13 {
        let item = nav.next().await.unwrap();
        assert!(!item.id.ends_with(".txt"));
        assert!(!item.id.contains(".thumbs"));
        seen.insert(item.id);
    }
    assert_eq!(seen.len(), 13);
}

#[tokio::test]
async fn sequential_session_lists_whole_tree() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let mut nav = controller(dir.path(), ProviderMode::Sequential);
    assert!(nav.initialize().await.unwrap());

    let mut ids = HashSet::new();
    let mut videos = 0;
    for _ in 0..13 {
        let item = nav.next().await.unwrap();
        if item.kind == MediaKind::Video {
            videos += 1;
        }
        ids.insert(item.id);
    }
    assert_eq!(ids.len(), 13);
    assert_eq!(videos, 1);
    assert_eq!(nav.current_position().total, 13);
}

#[tokio::test]
async fn delete_removes_file_from_disk() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let mut nav = controller(dir.path(), ProviderMode::Random);
    assert!(nav.initialize().await.unwrap());

    let item = nav.next().await.unwrap();
    nav.mutate_current(MutationAction::Delete).await.unwrap();
    assert!(!Path::new(&item.id).exists());
    assert!(!nav.window().contains(&item.id));
}

#[tokio::test]
async fn resolve_yields_file_url() {
    let dir = tempdir().unwrap();
    populate(dir.path());
    let mut nav = controller(dir.path(), ProviderMode::Random);
    assert!(nav.initialize().await.unwrap());
    let item = nav.next().await.unwrap();
    let url = nav
        .resolve_current(std::time::Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(url, format!("file://{}", item.id));
}

#[tokio::test]
async fn missing_directory_is_not_ready() {
    let dir = tempdir().unwrap();
    let mut nav = controller(&dir.path().join("absent"), ProviderMode::Random);
    assert!(!nav.initialize().await.unwrap());
    assert!(nav.next().await.is_none());
}
