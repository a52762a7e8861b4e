//! End-to-end tests for sitewright.
//!
//! These tests build small sites on disk with a zipped skin and verify the
//! rendered output tree.

use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use chrono::{DateTime, Utc};
use sitewright_core::{Decoration, ModuleRegistry, SiteRenderingContext};
use sitewright_render::{
    CasePolicy, DocumentLocator, LocatorError, SiteBuilder, SkinError, SkinResolver,
    copy_resources,
};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

const SKIN_TEMPLATE: &str = "<html><head><title>{{ title }}</title>{{ head_content? }}</head>\
<body data-created=\"{{ date_creation? }}\" data-published=\"{{ publish_date }}\">\
<a href=\"{{ relative_path }}/index.html\">home</a>{{ body_content }}</body></html>";

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn make_skin(dir: &Path, prerequisite: Option<&str>) -> PathBuf {
    let path = dir.join("skin.zip");
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    let options = SimpleFileOptions::default();

    let mut entries = vec![
        ("META-INF/skin/site.html".to_string(), SKIN_TEMPLATE.to_string()),
        ("css/skin.css".to_string(), "body { margin: 0; }".to_string()),
    ];
    if let Some(range) = prerequisite {
        entries.push((
            "META-INF/skin/skin.xml".to_string(),
            format!("<skin><prerequisites><renderer>{range}</renderer></prerequisites></skin>"),
        ));
    }
    for (name, content) in entries {
        writer.start_file(name, options).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
    path
}

fn publish_date() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-03-05T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// A site with one root, a skin and three documents.
fn sample_site(temp: &TempDir) -> SiteRenderingContext {
    let root = temp.path().join("src/site");
    write(
        &root.join("markdown/intro.md"),
        "---\ntitle: Intro\ndate: 2024-03-05\n---\nSome *text*.\n",
    );
    write(&root.join("markdown/guide/usage.md.vm"), "Back to [top]({{ relative_path }}/intro.html)\n");
    write(
        &root.join("xdoc/index.xml"),
        "<document><properties><title>Home</title><author>Ann</author></properties>\
         <body><p>Welcome</p></body></document>",
    );
    write(&root.join("resources/images/logo.svg"), "<svg/>");

    let archive = make_skin(temp.path(), None);
    SkinResolver::new()
        .resolve_skin(&archive, BTreeMap::new(), Decoration::named("MyProj"), None, "en")
        .unwrap()
        .with_site_root(root)
        .with_publish_date(publish_date())
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_full_site_build() {
    let temp = TempDir::new().unwrap();
    let site = sample_site(&temp);
    let out = temp.path().join("target/site");

    let stats = SiteBuilder::default().build(&site, &out).unwrap();
    assert_eq!(stats.documents, 3);
    assert_eq!(stats.rendered, 3);
    assert!(stats.is_success(), "failures: {:?}", stats.failures);

    let intro = read(&out.join("intro.html"));
    assert!(intro.contains("<title>MyProj &#x2013; Intro</title>"));
    assert!(intro.contains("data-created=\"20240305\""));
    assert!(intro.contains("data-published=\"Mar 5, 2024\""));
    assert!(intro.contains("<em>text</em>"));
    assert!(intro.contains("href=\"./index.html\""));

    let usage = read(&out.join("guide/usage.html"));
    assert!(usage.contains("href=\"../intro.html\""));
    assert!(usage.contains("href=\"../index.html\""));

    let index = read(&out.join("index.html"));
    assert!(index.contains("<title>MyProj &#x2013; Home</title>"));
    assert!(index.contains("<p>Welcome</p>"));
    assert!(index.contains("data-created=\"\""));

    assert_eq!(read(&out.join("css/skin.css")), "body { margin: 0; }");
    assert!(out.join("images/logo.svg").is_file());
    assert!(out.join("css/site.css").is_file());
    assert!(!out.join("META-INF").exists());
    assert!(!out.join("css/base.css").exists());
}

#[test]
fn test_bare_title_without_site_name() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    write(&root.join("markdown/intro.md"), "# Intro\n");
    let out = temp.path().join("out");

    let site = SiteRenderingContext::default().with_site_root(&root);
    SiteBuilder::default().build(&site, &out).unwrap();

    let intro = read(&out.join("intro.html"));
    assert!(intro.contains("<title>Intro</title>"));
    assert!(out.join("css/base.css").is_file());
}

#[test]
fn test_builds_are_deterministic() {
    let temp = TempDir::new().unwrap();
    let site = sample_site(&temp);
    let first = temp.path().join("first");
    let second = temp.path().join("second");

    let builder = SiteBuilder::default().with_case_policy(CasePolicy::Sensitive);
    builder.build(&site, &first).unwrap();
    builder.build(&site, &second).unwrap();

    for name in ["intro.html", "index.html", "guide/usage.html"] {
        assert_eq!(read(&first.join(name)), read(&second.join(name)), "{name}");
    }

    let locator = DocumentLocator::new(builder.modules());
    let a: Vec<String> = locator.locate(&site).unwrap().keys().map(String::from).collect();
    let b: Vec<String> = locator.locate(&site).unwrap().keys().map(String::from).collect();
    assert_eq!(a, b);
    assert_eq!(a, vec!["intro.html", "guide/usage.html", "index.html"]);
}

#[test]
fn test_resources_never_overwrite() {
    let temp = TempDir::new().unwrap();
    let site = sample_site(&temp);
    let out = temp.path().join("out");
    write(&out.join("css/skin.css"), "customised");
    write(&out.join("css/site.css"), "mine");

    let first = copy_resources(&site, &out).unwrap();
    let second = copy_resources(&site, &out).unwrap();

    assert_eq!(read(&out.join("css/skin.css")), "customised");
    assert_eq!(read(&out.join("css/site.css")), "mine");
    assert!(first.copied > 0);
    assert_eq!(second.copied, 0);
    assert_eq!(second.skipped, first.copied + first.skipped);
}

#[test]
fn test_decoration_touch_forces_rebuild() {
    let temp = TempDir::new().unwrap();
    let mut site = sample_site(&temp);
    let out = temp.path().join("out");
    let builder = SiteBuilder::default();

    builder.build(&site, &out).unwrap();
    let unchanged = builder.build(&site, &out).unwrap();
    assert_eq!(unchanged.rendered, 0);

    site.decoration.last_modified = Some(SystemTime::now() + Duration::from_secs(3600));
    let touched = builder.build(&site, &out).unwrap();
    assert_eq!(touched.rendered, 3);
}

#[test]
fn test_collisions_under_both_policies() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    write(&root.join("markdown/Guide.md"), "upper");
    write(&root.join("xdoc/guide.xml"), "<document/>");
    let site = SiteRenderingContext::default().with_site_root(&root);
    let modules = ModuleRegistry::with_defaults();

    let sensitive = DocumentLocator::new(&modules)
        .with_case_policy(CasePolicy::Sensitive)
        .locate(&site)
        .unwrap();
    assert_eq!(sensitive.len(), 2);

    let insensitive = DocumentLocator::new(&modules)
        .with_case_policy(CasePolicy::Insensitive)
        .locate(&site);
    assert!(matches!(insensitive, Err(LocatorError::Conflict { .. })));

    let message = insensitive.unwrap_err().to_string();
    assert!(message.contains("Guide.md"));
    assert!(message.contains("guide.xml"));

    write(&root.join("markdown/guide.md"), "lower");
    let exact = DocumentLocator::new(&modules)
        .with_case_policy(CasePolicy::Sensitive)
        .locate(&site)
        .unwrap_err();
    let message = exact.to_string();
    assert!(message.contains("guide.md"));
    assert!(message.contains("guide.xml"));
}

#[test]
fn test_version_gate() {
    let temp = TempDir::new().unwrap();
    let archive = make_skin(temp.path(), Some("[1.0,2.0)"));
    let resolve = |version: &str| {
        SkinResolver::new().with_current_version(Some(version)).resolve_skin(
            &archive,
            BTreeMap::new(),
            Decoration::default(),
            None,
            "en",
        )
    };

    assert!(resolve("1.5").is_ok());

    let err = resolve("2.0").unwrap_err();
    assert!(matches!(err, SkinError::Incompatible { .. }));
    let message = err.to_string();
    assert!(message.contains("[1.0,2.0)"));
    assert!(message.contains("2.0"));
}

#[test]
fn test_pre_pass_fallback_renders_raw_text() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("site");
    write(&root.join("markdown/broken.md.vm"), "Price: {{ not_defined }}\n");
    let out = temp.path().join("out");

    let site = SiteRenderingContext::default().with_site_root(&root);
    let stats = SiteBuilder::default().build(&site, &out).unwrap();

    assert_eq!(stats.rendered, 1);
    assert!(read(&out.join("broken.html")).contains("Price: {{ not_defined }}"));
}

#[test]
fn test_site_stylesheet_overrides_skin_stylesheet() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("styled-skin.zip");
    let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
    for (name, content) in [
        ("META-INF/skin/site.html", SKIN_TEMPLATE),
        ("css/site.css", "/* skin */"),
    ] {
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap();

    let root = temp.path().join("site");
    write(&root.join("markdown/index.md"), "# Home\n");
    write(&root.join("resources/css/site.css"), "/* user */");
    let site = SkinResolver::new()
        .resolve_skin(&archive, BTreeMap::new(), Decoration::default(), None, "en")
        .unwrap()
        .with_site_root(&root);

    let out = temp.path().join("out");
    let stats = SiteBuilder::default().build(&site, &out).unwrap();

    assert!(stats.is_success());
    assert_eq!(read(&out.join("css/site.css")), "/* user */");
}
