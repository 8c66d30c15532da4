mod common;

use std::path::Path;

use css_sprite_core::descriptor::ImageDescriptor;
use css_sprite_core::prelude::*;
use css_sprite_core::rewrite::{Rewriter, css_number};

use common::{config, descriptors};

fn placed(css: &str, x: u32, y: u32, sheet: (u32, u32)) -> ImageDescriptor {
    let image = descriptors(css, Path::new("/site/main.css"), &config()).remove(0);
    image.with_placement(SpritePlacement {
        coordinates: Placement {
            x,
            y,
            width: 10,
            height: 10,
        },
        properties: SheetSize {
            width: sheet.0,
            height: sheet.1,
        },
        sprite_sheet_path: "sprite.png".into(),
    })
}

#[test]
fn css_number_formatting() {
    assert_eq!(css_number(0.0), "0");
    assert_eq!(css_number(-0.0), "0");
    assert_eq!(css_number(12.0), "12");
    assert_eq!(css_number(-7.0), "-7");
    assert_eq!(css_number(-2.5), "-2.5");
}

#[test]
fn offsets_are_negated_placement() {
    let image = placed("background: url(a.png) no-repeat;", 5, 10, (20, 30));
    let rewriter = Rewriter::new(None).expect("template");
    assert_eq!(
        rewriter.declaration(&image).expect("render"),
        concat!(
            "background: url(\"sprite.png\") no-repeat;\n",
            "    background-position: -5px -10px;\n",
            "    background-size: 20px 30px !important;",
        )
    );
}

#[test]
fn origin_placement_renders_zero() {
    let image = placed("background: url(a.png) no-repeat;", 0, 0, (10, 10));
    let out = Rewriter::new(None).expect("template").declaration(&image).expect("render");
    assert!(out.contains("background-position: 0px 0px;"));
}

#[test]
fn initial_offsets_are_added() {
    let image = placed("background: url(a.png) 10px -3px no-repeat;", 4, 20, (10, 40));
    let out = Rewriter::new(None).expect("template").declaration(&image).expect("render");
    assert!(out.contains("background-position: 6px -23px;"));
}

#[test]
fn retina_images_are_scaled_by_ratio() {
    let image = placed("background: url(a@2x.png) no-repeat;", 20, 5, (100, 60));
    let out = Rewriter::new(None).expect("template").declaration(&image).expect("render");
    assert!(out.contains("background-position: -10px -2.5px;"));
    assert!(out.contains("background-size: 50px 30px !important;"));
}

#[test]
fn unsupported_tokens_are_kept_after_repeat() {
    let image = placed("background: url(a.png) no-repeat #fff;", 0, 0, (10, 10));
    let out = Rewriter::new(None).expect("template").declaration(&image).expect("render");
    assert!(out.starts_with("background: url(\"sprite.png\") no-repeat #fff;\n"));
}

#[test]
fn rewrite_replaces_declaration_and_keeps_rest_of_line() {
    let css = concat!(
        ".a { background: url(a.png) no-repeat; /* @meta {\"sprite\": {}} */ }\n",
        ".b { color: red; }\n",
    );
    let image = placed(css, 0, 12, (10, 22));
    let out = Rewriter::new(None)
        .expect("template")
        .rewrite(css, &[image])
        .expect("rewrite");
    assert_eq!(
        out,
        concat!(
            ".a { background: url(\"sprite.png\") no-repeat;\n",
            "    background-position: 0px -12px;\n",
            "    background-size: 10px 22px !important; }\n",
            ".b { color: red; }\n",
        )
    );
}

#[test]
fn minified_rules_are_rewritten_in_place() {
    let css = ".a{background:url(a.png) no-repeat;}.b{color:red;}";
    let image = placed(css, 0, 12, (10, 22));
    let out = Rewriter::new(None)
        .expect("template")
        .rewrite(css, &[image])
        .expect("rewrite");
    assert_eq!(
        out,
        concat!(
            ".a{background: url(\"sprite.png\") no-repeat;\n",
            "    background-position: 0px -12px;\n",
            "    background-size: 10px 22px !important;}.b{color:red;}",
        )
    );

    // an unterminated declaration is never stretched into the next rule
    let css = ".a{background:url(a.png) no-repeat}.b{color:red;}";
    assert!(descriptors(css, Path::new("/site/main.css"), &config()).is_empty());
}

#[test]
fn rewrite_replaces_every_identical_occurrence() {
    let css = concat!(
        ".a { background: url(a.png) no-repeat; }\n",
        ".b { background: url(a.png) no-repeat; }\n",
    );
    let image = placed(css, 0, 0, (10, 10));
    let out = Rewriter::new(None)
        .expect("template")
        .rewrite(css, &[image])
        .expect("rewrite");
    assert_eq!(out.matches("url(\"sprite.png\")").count(), 2);
    assert!(!out.contains("url(a.png)"));
}

#[test]
fn replacement_text_is_not_expanded() {
    let css = "background: url(a.png) no-repeat;";
    let mut image = placed(css, 0, 0, (10, 10));
    if let Some(p) = image.placement.as_mut() {
        p.sprite_sheet_path = "$1/sprite.png".into();
    }
    let out = Rewriter::new(None)
        .expect("template")
        .rewrite(css, &[image])
        .expect("rewrite");
    assert!(out.starts_with("background: url(\"$1/sprite.png\")"));
}

#[test]
fn unplaced_descriptor_is_an_error() {
    let css = "background: url(a.png) no-repeat;";
    let image = descriptors(css, Path::new("/site/main.css"), &config()).remove(0);
    let err = Rewriter::new(None)
        .expect("template")
        .declaration(&image)
        .expect_err("no placement");
    assert!(matches!(err, SpriteError::Unplaced { .. }));
}

#[test]
fn custom_template_is_used() {
    let image = placed("background: url(a.png) no-repeat;", 3, 4, (10, 10));
    let rewriter =
        Rewriter::new(Some("background: url({{sprite_sheet_path}}) {{x}}px {{y}}px {{repeat}};"))
            .expect("template");
    assert_eq!(
        rewriter.declaration(&image).expect("render"),
        "background: url(sprite.png) -3px -4px no-repeat;"
    );
}

#[test]
fn bad_templates_are_rejected() {
    assert!(matches!(
        Rewriter::new(Some("{{#if x}}unterminated")),
        Err(SpriteError::TemplateSyntax(_))
    ));

    let image = placed("background: url(a.png) no-repeat;", 0, 0, (10, 10));
    let err = Rewriter::new(Some("{{nope}}"))
        .expect("template")
        .declaration(&image)
        .expect_err("strict mode");
    assert!(matches!(err, SpriteError::Template(_)));
}
