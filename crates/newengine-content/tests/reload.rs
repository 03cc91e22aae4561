mod common;

use anyhow::Result;
use common::{Document, Fixture, Label};
use newengine_content::{AssetWatcher, LoadOptions, ScreenDensityBucket, WatchedAsset};
use parking_lot::Mutex;
use std::sync::atomic::Ordering;
use std::sync::Arc;

struct Recorder {
    id: usize,
    accept: bool,
    log: Arc<Mutex<Vec<(usize, String, bool)>>>,
}

impl AssetWatcher<Label> for Recorder {
    fn on_validating(&self, _asset: &str, _candidate: &Arc<Label>) -> bool {
        self.accept
    }

    fn on_validation_complete(&self, _asset: &str, instance: &Arc<Label>, validated: bool) {
        self.log.lock().push((self.id, instance.0.clone(), validated));
    }
}

fn recorders(accepts: &[bool]) -> (Vec<Arc<dyn AssetWatcher<Label>>>, Arc<Mutex<Vec<(usize, String, bool)>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let watchers = accepts
        .iter()
        .enumerate()
        .map(|(id, &accept)| {
            Arc::new(Recorder {
                id,
                accept,
                log: log.clone(),
            }) as Arc<dyn AssetWatcher<Label>>
        })
        .collect();
    (watchers, log)
}

#[test]
fn accepted_reload_replaces_cached_instance() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("greeting.txt", "hello")?;

    let watched = WatchedAsset::<Label>::new(&fx.manager, "greeting", ScreenDensityBucket::Desktop)?;
    let before = fx.manager.load::<Label>("greeting")?;
    assert!(Arc::ptr_eq(&before, &watched.value()));

    fx.touch("greeting.txt", "hello again")?;
    assert_eq!(fx.drain(), 1);

    let after = fx.manager.load::<Label>("greeting")?;
    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(after.0, "hello again");
    assert!(Arc::ptr_eq(&after, &watched.value()));
    Ok(())
}

#[test]
fn rejected_reload_rolls_back_and_notifies_prefix() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("greeting.txt", "hello")?;
    let original = fx.manager.load::<Label>("greeting")?;

    let (watchers, log) = recorders(&[true, false, true]);
    for w in &watchers {
        assert!(fx
            .manager
            .add_watcher("greeting", ScreenDensityBucket::Desktop, w.clone())?);
    }

    fx.touch("greeting.txt", "rejected text")?;
    fx.drain();

    assert!(Arc::ptr_eq(&original, &fx.manager.load::<Label>("greeting")?));
    assert_eq!(
        *log.lock(),
        vec![(0, "hello".to_owned(), false), (1, "hello".to_owned(), false)]
    );

    // Once the rejecting watcher is gone the same change goes through.
    assert!(fx
        .manager
        .remove_watcher("greeting", ScreenDensityBucket::Desktop, &watchers[1])?);
    fx.touch("greeting.txt", "accepted text")?;
    fx.drain();

    assert_eq!(fx.manager.load::<Label>("greeting")?.0, "accepted text");
    let log = log.lock();
    assert_eq!(log.len(), 4);
    assert_eq!(log[2], (0, "accepted text".to_owned(), true));
    assert_eq!(log[3], (2, "accepted text".to_owned(), true));
    Ok(())
}

#[test]
fn failed_reload_keeps_last_known_good() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("greeting.txt", "hello")?;
    fx.write("plain.txt", "plain")?;

    let watched = WatchedAsset::<Label>::new(&fx.manager, "greeting", ScreenDensityBucket::Desktop)?;
    let original = watched.value();
    let plain = fx.manager.load::<Label>("plain")?;

    fx.touch("greeting.txt", "oops #broken")?;
    fx.drain();
    assert!(Arc::ptr_eq(&original, &watched.value()));
    assert!(Arc::ptr_eq(&original, &fx.manager.load::<Label>("greeting")?));

    // Nothing watches or depends on this file.
    fx.touch("plain.txt", "changed #broken")?;
    assert_eq!(fx.drain(), 0);
    assert!(Arc::ptr_eq(&plain, &fx.manager.load::<Label>("plain")?));

    fx.touch("greeting.txt", "fixed")?;
    fx.drain();
    assert_eq!(watched.value().0, "fixed");
    Ok(())
}

#[test]
fn shared_watched_asset_is_reused() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("title.txt", "Title")?;

    let a = fx
        .manager
        .get_shared_watched_asset::<Label>("title", ScreenDensityBucket::Desktop)?;
    let b = fx
        .manager
        .get_shared_watched_asset::<Label>("title", ScreenDensityBucket::Desktop)?;
    assert!(Arc::ptr_eq(&a, &b));

    fx.touch("title.txt", "New Title")?;
    fx.drain();
    assert_eq!(a.value().0, "New Title");
    Ok(())
}

#[test]
fn change_events_are_coalesced_and_deduplicated() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("greeting.txt", "hello")?;
    let _watched = WatchedAsset::<Label>::new(&fx.manager, "greeting", ScreenDensityBucket::Desktop)?;

    fx.touch("greeting.txt", "one")?;
    fx.touch("greeting.txt", "two")?;
    assert_eq!(fx.manager.work_queue().len(), 1);
    assert_eq!(fx.drain(), 1);
    assert_eq!(fx.manager.load::<Label>("greeting")?.0, "two");

    // Same bytes again: nothing to do.
    fx.manager.on_file_changed(&fx.path("greeting.txt"));
    assert_eq!(fx.drain(), 0);
    Ok(())
}

#[test]
fn watching_disabled_registers_nothing() -> Result<()> {
    let fx = Fixture::with_config(|c| c.with_watch_content(false))?;
    fx.write("greeting.txt", "hello")?;

    let (watchers, _log) = recorders(&[true]);
    assert!(!fx
        .manager
        .add_watcher("greeting", ScreenDensityBucket::Desktop, watchers[0].clone())?);
    Ok(())
}

#[test]
fn shared_dependent_reloads_once() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("docs/f.txt", "F1")?;
    fx.write("docs/b.txt", "@include docs/f")?;
    fx.write("docs/c.txt", "@include docs/f")?;
    fx.write("docs/d.txt", "@include docs/b\n@include docs/c")?;

    fx.manager.load::<Document>("docs/d")?;
    fx.manager.load::<Document>("docs/b")?;
    fx.manager.load::<Document>("docs/c")?;
    assert!(fx.manager.is_asset_dependency("docs/d", "docs/b", None)?);
    assert!(fx.manager.is_asset_dependency_path("docs/b", &fx.path("docs/f.txt"))?);

    let runs = fx.document_runs.load(Ordering::SeqCst);
    fx.touch("docs/f.txt", "F2")?;
    fx.drain();

    assert_eq!(fx.document_runs.load(Ordering::SeqCst) - runs, 3);
    assert_eq!(fx.manager.load::<Document>("docs/b")?.0, "F2");
    assert_eq!(fx.manager.load::<Document>("docs/c")?.0, "F2");
    Ok(())
}

#[test]
fn dependency_cycle_terminates() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("x.txt", "@include y")?;
    fx.write("y.txt", "@include x")?;

    fx.manager.load::<Document>("x")?;
    fx.manager.load::<Document>("y")?;
    let runs = fx.document_runs.load(Ordering::SeqCst);

    fx.touch("x.txt", "@include y\nmore")?;
    fx.drain();

    assert_eq!(fx.document_runs.load(Ordering::SeqCst) - runs, 2);
    assert_eq!(fx.manager.load::<Document>("x")?.0, "@include x\nmore");
    Ok(())
}

#[test]
fn suppressed_tracking_records_nothing() -> Result<()> {
    let fx = Fixture::with_config(|c| c.with_suppressed_dependency_tracking(true))?;
    fx.write("a.txt", "@include b")?;
    fx.write("b.txt", "b")?;

    fx.manager.load::<Document>("a")?;
    assert!(!fx.manager.is_asset_dependency("a", "b", None)?);
    assert!(!fx.manager.add_asset_dependency("a", "b", None)?);

    fx.manager.set_suppress_dependency_tracking(false);
    assert!(fx.manager.add_asset_dependency("a", "b", None)?);
    assert!(fx.manager.is_asset_dependency("a", "b", None)?);
    assert!(fx.manager.remove_asset_dependency("a", "b", None)?);
    assert!(!fx.manager.is_asset_dependency("a", "b", None)?);

    fx.manager.add_asset_dependency("a", "b", None)?;
    fx.manager.clear_asset_dependencies("a")?;
    assert!(!fx.manager.is_asset_dependency("a", "b", None)?);

    fx.manager.add_asset_dependency("a", "b", None)?;
    fx.manager.clear_all_asset_dependencies()?;
    assert!(!fx.manager.is_asset_dependency("a", "b", None)?);
    Ok(())
}

#[test]
fn each_density_keeps_its_dependency_edges_across_reloads() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("doc.txt", "@include dep")?;
    fx.write("dep.txt", "D1")?;
    fx.write("dep-hdpi.txt", "H1")?;

    let high = LoadOptions::default().with_density(ScreenDensityBucket::High);
    assert_eq!(fx.manager.load::<Document>("doc")?.0, "D1");
    assert_eq!(fx.manager.load_with::<Document>("doc", high)?.0, "H1");

    fx.touch("dep.txt", "D2")?;
    fx.drain();
    assert_eq!(fx.manager.load::<Document>("doc")?.0, "D2");
    assert!(fx.manager.is_asset_dependency("doc", "dep", None)?);
    assert!(fx
        .manager
        .is_asset_dependency("doc", "dep", Some(ScreenDensityBucket::High))?);

    fx.touch("dep.txt", "D3")?;
    fx.drain();
    assert_eq!(fx.manager.load::<Document>("doc")?.0, "D3");

    fx.touch("dep-hdpi.txt", "H2")?;
    fx.drain();
    assert_eq!(fx.manager.load_with::<Document>("doc", high)?.0, "H2");
    assert_eq!(fx.manager.load::<Document>("doc")?.0, "D3");
    Ok(())
}

#[test]
fn only_the_changed_density_variant_reloads() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("icon.txt", "base")?;
    fx.write("icon-hdpi.txt", "high")?;

    let desktop = fx.manager.load::<Label>("icon")?;
    let watched = WatchedAsset::<Label>::new(&fx.manager, "icon", ScreenDensityBucket::High)?;
    assert_eq!(watched.value().0, "high");

    fx.touch("icon-hdpi.txt", "sharper")?;
    assert_eq!(fx.drain(), 1);

    assert_eq!(watched.value().0, "sharper");
    assert!(Arc::ptr_eq(&desktop, &fx.manager.load::<Label>("icon")?));
    Ok(())
}
