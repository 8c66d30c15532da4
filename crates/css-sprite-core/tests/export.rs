mod common;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use css_sprite_core::export::{sheet_artifacts, sheet_url, sprite_sheet_path, stylesheet_artifact};
use css_sprite_core::mapper::map_coordinates;
use css_sprite_core::prelude::*;

use common::{config, descriptors};

fn key(labels: &[&str]) -> GroupKey {
    GroupKey::new(labels.iter().map(|s| s.to_string()).collect())
}

fn sheet(entries: &[(&str, u32, u32)]) -> PackedSheet {
    let coordinates: BTreeMap<PathBuf, Placement> = entries
        .iter()
        .map(|(path, x, y)| {
            (
                PathBuf::from(path),
                Placement {
                    x: *x,
                    y: *y,
                    width: 8,
                    height: 8,
                },
            )
        })
        .collect();
    PackedSheet {
        image: vec![1, 2, 3],
        coordinates,
        properties: SheetSize {
            width: 16,
            height: 32,
        },
    }
}

#[test]
fn sheet_path_splices_labels_before_extension() {
    assert_eq!(sprite_sheet_path("sprite.png", &key(&[])), "sprite.png");
    assert_eq!(sprite_sheet_path("sprite.png", &key(&["@2x"])), "sprite.@2x.png");
    assert_eq!(
        sprite_sheet_path("img/sprite.v1.png", &key(&["@2x", "icons"])),
        "img/sprite.v1.@2x.icons.png"
    );
    assert_eq!(sprite_sheet_path("sprite", &key(&["@2x"])), "sprite.@2x");
}

#[test]
fn sheet_path_leaves_dotted_directories_alone() {
    assert_eq!(
        sprite_sheet_path("assets.v2/sprite", &key(&["@2x"])),
        "assets.v2/sprite.@2x"
    );
    assert_eq!(
        sprite_sheet_path("assets.v2/img/sprite.png", &key(&["icons"])),
        "assets.v2/img/sprite.icons.png"
    );
}

#[test]
fn sheet_url_joins_prefix_with_slash() {
    assert_eq!(sheet_url(None, "sprite.png"), "sprite.png");
    assert_eq!(sheet_url(Some(""), "sprite.png"), "sprite.png");
    assert_eq!(sheet_url(Some("../img"), "sprite.png"), "../img/sprite.png");
    assert_eq!(sheet_url(Some("/static/"), "sprite.png"), "/static/sprite.png");
}

#[test]
fn artifacts_carry_paths_and_bytes() {
    let results = vec![PackingResult {
        group: key(&["@2x"]),
        output_path: "sprite.@2x.png".into(),
        sheet: sheet(&[]),
    }];
    let sheets = sheet_artifacts(&results);
    assert_eq!(sheets.len(), 1);
    assert_eq!(sheets[0].path, PathBuf::from("sprite.@2x.png"));
    assert_eq!(sheets[0].contents, vec![1, 2, 3]);

    let css = stylesheet_artifact("main.css", "a{}".into());
    assert_eq!(css.path, PathBuf::from("main.css"));
    assert_eq!(css.contents, b"a{}".to_vec());
}

#[test]
fn mapper_attaches_placement_by_path_and_group() {
    let css = concat!(
        "background: url(a.png) no-repeat;\n",
        "background: url(a.png) 0 -4px no-repeat;\n",
        "background: url(b.png) no-repeat;\n",
    );
    let images = descriptors(css, Path::new("/site/main.css"), &config());
    let results = vec![PackingResult {
        group: key(&[]),
        output_path: "sprite.png".into(),
        sheet: sheet(&[("/site/a.png", 0, 0), ("/site/b.png", 0, 8)]),
    }];

    let placed = map_coordinates(images, &results, Some("../img/"));
    assert_eq!(placed.len(), 3);
    let a0 = placed[0].placement.as_ref().expect("placed");
    let a1 = placed[1].placement.as_ref().expect("placed");
    let b = placed[2].placement.as_ref().expect("placed");
    assert_eq!(a0, a1);
    assert_eq!(a0.sprite_sheet_path, "../img/sprite.png");
    assert_eq!(b.coordinates.y, 8);
    assert_eq!(b.properties, SheetSize { width: 16, height: 32 });
}

#[test]
fn mapper_drops_unreported_descriptors() {
    let css = "background: url(a.png) no-repeat;\nbackground: url(b.png) no-repeat;";
    let mut images = descriptors(css, Path::new("/site/main.css"), &config());
    // same path, but packed under another group
    let b = images.pop().expect("b").with_group("icons");
    images.push(b);
    let results = vec![PackingResult {
        group: key(&[]),
        output_path: "sprite.png".into(),
        sheet: sheet(&[("/site/a.png", 0, 0), ("/site/b.png", 0, 8)]),
    }];

    let placed = map_coordinates(images, &results, None);
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].url, "a.png");
    assert_eq!(
        placed[0].placement.as_ref().map(|p| p.sprite_sheet_path.as_str()),
        Some("sprite.png")
    );
}
