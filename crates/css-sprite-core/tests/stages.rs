mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use css_sprite_core::descriptor::ImageDescriptor;
use css_sprite_core::prelude::*;
use css_sprite_core::stage::Stages;
use tempfile::tempdir;

use common::{config, descriptors, write_png};

struct FailingFilter;

#[async_trait]
impl ImageFilter for FailingFilter {
    async fn keep(&self, _image: &ImageDescriptor) -> std::result::Result<bool, StageError> {
        Err("filter exploded".into())
    }
}

struct FailingGrouper;

#[async_trait]
impl ImageGrouper for FailingGrouper {
    async fn group(
        &self,
        _image: &ImageDescriptor,
    ) -> std::result::Result<Option<String>, StageError> {
        Err("grouper exploded".into())
    }
}

#[tokio::test]
async fn missing_files_are_dropped() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a.png"), 2, 2, [255, 0, 0, 255]);
    let css = "background: url(a.png) no-repeat;\nbackground: url(missing.png) no-repeat;";
    let cfg = config();
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let kept = Stages::new(&cfg, vec![], vec![]).run(images).await.expect("run");
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].url, "a.png");
}

#[tokio::test]
async fn meta_skip_drops_before_user_filters() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a.png"), 2, 2, [255, 0, 0, 255]);
    let css = "background: url(a.png) no-repeat; /* @meta {\"sprite\": {\"skip\": true}} */";
    let cfg = config();
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let seen = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&seen);
    let user: Arc<dyn ImageFilter> = Arc::new(filter_fn(move |_| {
        *counter.lock().expect("lock") += 1;
        true
    }));
    let kept = Stages::new(&cfg, vec![user], vec![]).run(images).await.expect("run");
    assert!(kept.is_empty());
    assert_eq!(*seen.lock().expect("lock"), 0);
}

#[tokio::test]
async fn user_filters_see_images_before_the_existence_check() {
    let dir = tempdir().expect("tempdir");
    let css = "background: url(missing.png) no-repeat;";
    let cfg = config();
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let user: Arc<dyn ImageFilter> = Arc::new(filter_fn(move |image| {
        log.lock().expect("lock").push(image.url.clone());
        true
    }));
    let stages = Stages::new(&cfg, vec![user], vec![]);
    assert_eq!(stages.filter_count(), 3);

    let kept = stages.run(images).await.expect("run");
    assert!(kept.is_empty());
    assert_eq!(*seen.lock().expect("lock"), vec!["missing.png".to_owned()]);
}

#[tokio::test]
async fn group_labels_follow_stage_order() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a@2x.png"), 4, 4, [0, 255, 0, 255]);
    write_png(&dir.path().join("b.png"), 2, 2, [0, 0, 255, 255]);
    let css = "background: url(a@2x.png) no-repeat;\nbackground: url(b.png) no-repeat;";
    let cfg = config();
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let icons: Arc<dyn ImageGrouper> = Arc::new(group_fn(|_| Some("icons".to_owned())));
    let blank: Arc<dyn ImageGrouper> = Arc::new(group_fn(|_| Some(String::new())));
    let grouped = Stages::new(&cfg, vec![], vec![icons, blank])
        .run(images)
        .await
        .expect("run");

    assert_eq!(grouped[0].group, vec!["@2x".to_owned(), "icons".to_owned()]);
    assert_eq!(grouped[1].group, vec!["icons".to_owned()]);
}

#[tokio::test]
async fn retina_label_is_absent_when_retina_is_disabled() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a@2x.png"), 4, 4, [0, 255, 0, 255]);
    let cfg = SpriteConfig::builder()
        .sprite_sheet_name("sprite.png")
        .retina(false)
        .build();
    let css = "background: url(a@2x.png) no-repeat;";
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let stages = Stages::new(&cfg, vec![], vec![]);
    assert_eq!(stages.grouper_count(), 0);
    let grouped = stages.run(images).await.expect("run");
    assert!(grouped[0].group.is_empty());
}

#[tokio::test]
async fn failing_filter_reports_its_stage() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a.png"), 2, 2, [255, 0, 0, 255]);
    let cfg = config();
    let css = "background: url(a.png) no-repeat;";
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let failing: Arc<dyn ImageFilter> = Arc::new(FailingFilter);
    let err = Stages::new(&cfg, vec![failing], vec![])
        .run(images)
        .await
        .expect_err("filter should fail");
    match err {
        SpriteError::Filter { stage, source } => {
            assert_eq!(stage, 1);
            assert_eq!(source.to_string(), "filter exploded");
        }
        other => panic!("Expected Filter error, got {other:?}"),
    }
}

#[tokio::test]
async fn failing_grouper_reports_its_stage() {
    let dir = tempdir().expect("tempdir");
    write_png(&dir.path().join("a.png"), 2, 2, [255, 0, 0, 255]);
    let cfg = config();
    let css = "background: url(a.png) no-repeat;";
    let images = descriptors(css, &dir.path().join("main.css"), &cfg);

    let failing: Arc<dyn ImageGrouper> = Arc::new(FailingGrouper);
    let err = Stages::new(&cfg, vec![], vec![failing])
        .run(images)
        .await
        .expect_err("grouper should fail");
    assert!(matches!(err, SpriteError::Grouper { stage: 1, .. }));
}
