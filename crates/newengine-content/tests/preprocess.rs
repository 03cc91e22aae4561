mod common;

use anyhow::Result;
use common::{Fixture, Label, Text};
use newengine_content::{AssetError, ContentManifest, PreprocessedWriter};
use std::fs;

fn manifest(assets: &[&str]) -> Result<ContentManifest> {
    let assets: Vec<String> = assets
        .iter()
        .map(|a| format!(r#"{{ "name": "{a}", "path": "{a}" }}"#))
        .collect();
    let json = format!(
        r#"{{ "name": "strings", "groups": [
            {{ "name": "labels", "type": "label", "directory": "strings", "assets": [{}] }} ] }}"#,
        assets.join(", ")
    );
    Ok(ContentManifest::from_json_str(&json)?)
}

#[test]
fn preprocessed_file_is_preferred_on_load() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("title.txt", "  Main Menu  ")?;

    assert!(fx.manager.preprocess::<Label>("title", false)?);
    assert!(fx.path("title.uvc").is_file());
    assert!(fx.path("title.txt").is_file());

    // Change the source: the container still wins.
    fx.write("title.txt", "edited")?;
    assert_eq!(fx.manager.load::<Label>("title")?.0, "Main Menu");
    assert!(fx
        .manager
        .resolve_asset_file_path("title", None, false)?
        .ends_with("title.uvc"));
    Ok(())
}

#[test]
fn density_variants_are_preprocessed_too() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("ui/caption.txt", "base")?;
    fx.write("ui/caption-hdpi.txt", "high")?;

    assert!(fx.manager.preprocess::<Label>("ui/caption", true)?);
    assert!(fx.path("ui/caption.uvc").is_file());
    assert!(fx.path("ui/caption-hdpi.uvc").is_file());
    assert!(!fx.path("ui/caption.txt").exists());
    assert!(!fx.path("ui/caption-hdpi.txt").exists());

    // Nothing raw left, but the asset is already done.
    assert!(fx.manager.preprocess::<Label>("ui/caption", true)?);
    assert_eq!(fx.manager.load::<Label>("ui/caption")?.0, "base");
    Ok(())
}

#[test]
fn passthrough_assets_cannot_be_preprocessed() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("raw.txt", "raw")?;

    assert!(!fx.manager.preprocess::<Text>("raw", true)?);
    assert!(!fx.path("raw.uvc").exists());
    assert!(fx.path("raw.txt").is_file());
    Ok(())
}

#[test]
fn container_type_and_processor_are_checked() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("title.txt", "title")?;
    fx.manager.preprocess::<Label>("title", false)?;

    assert!(matches!(
        fx.manager.load::<Text>("title"),
        Err(AssetError::PreprocessedTypeMismatch { .. })
    ));

    let path = fx.path("orphan.uvc");
    {
        let mut file = fs::File::create(&path)?;
        let mut writer = PreprocessedWriter::new(&mut file, &path);
        writer.write_header("gone.processor")?;
        writer.write_string("payload")?;
        writer.flush()?;
    }
    assert!(matches!(
        fx.manager.load::<Label>("orphan"),
        Err(AssetError::UnknownProcessor { id, .. }) if id == "gone.processor"
    ));
    Ok(())
}

#[test]
fn batched_deletes_wait_for_flush() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("a.txt", "a")?;
    fx.write("b.txt", "b")?;

    assert!(matches!(
        fx.manager.flush_deleted_files(),
        Err(AssetError::NotBatchingDeletes)
    ));

    fx.manager.set_batch_deleted_files(true)?;
    assert!(fx.manager.batch_deleted_files());
    fx.manager.preprocess::<Label>("a", true)?;
    fx.manager.preprocess::<Label>("b", true)?;
    assert!(fx.path("a.txt").is_file());
    assert!(fx.path("b.txt").is_file());

    assert_eq!(fx.manager.flush_deleted_files()?, 2);
    assert!(!fx.path("a.txt").exists());
    assert!(!fx.path("b.txt").exists());

    // Turning batching off deletes whatever is still pending.
    fx.write("c.txt", "c")?;
    fx.manager.preprocess::<Label>("c", true)?;
    assert!(fx.path("c.txt").is_file());
    fx.manager.set_batch_deleted_files(false)?;
    assert!(!fx.path("c.txt").exists());
    Ok(())
}

#[test]
fn manifest_run_deletes_sources_on_success() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("strings/hello.txt", " hello ")?;
    fx.write("strings/bye.txt", " bye ")?;
    let m = manifest(&["hello", "bye"])?;
    assert_eq!(m.asset_count(), 2);

    fx.manager.preprocess_manifests(std::slice::from_ref(&m), true)?;
    assert!(!fx.manager.batch_deleted_files());
    assert!(!fx.path("strings/hello.txt").exists());
    assert!(fx.path("strings/bye.uvc").is_file());

    assert_eq!(fx.manager.load_manifest(&m)?, 2);
    assert_eq!(fx.manager.cached_asset_count(), 2);
    assert_eq!(fx.manager.load::<Label>("strings/bye")?.0, "bye");
    Ok(())
}

#[test]
fn failed_manifest_run_keeps_sources() -> Result<()> {
    let fx = Fixture::new()?;
    fx.write("strings/hello.txt", "hello")?;
    let m = manifest(&["hello", "missing"])?;

    let err = fx.manager.preprocess_manifests(&[m], true).unwrap_err();
    assert!(matches!(err, AssetError::FileNotFound { .. }));
    assert!(fx.path("strings/hello.uvc").is_file());
    assert!(fx.path("strings/hello.txt").is_file());
    assert!(!fx.manager.batch_deleted_files());
    Ok(())
}

#[test]
fn manifest_with_unregistered_type_is_rejected() -> Result<()> {
    let fx = Fixture::new()?;
    let m = ContentManifest::from_json_str(
        r#"{ "name": "x", "groups": [ { "type": "mesh", "assets": [ { "path": "a" } ] } ] }"#,
    )?;
    assert!(matches!(
        fx.manager.load_manifest(&m),
        Err(AssetError::UnknownAssetType(name)) if name == "mesh"
    ));
    assert!(matches!(
        ContentManifest::from_json_str("{ not json"),
        Err(AssetError::InvalidManifest { .. })
    ));
    Ok(())
}
