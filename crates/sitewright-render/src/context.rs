//! Template context construction.
//!
//! Contexts are layered: site facts are computed once per build, document
//! facts are added per source file, and page facts per parsed document.
//! Each layer clones the one below it and never mutates its inputs.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Value, json};
use sitewright_core::{RenderingContext, SiteRenderingContext};
use sitewright_parser::Sink;
use tracing::warn;

use crate::template::TemplateContext;

/// Separator between the site name and the document title.
pub const TITLE_SEPARATOR: &str = " &#x2013; ";

const FALLBACK_DATE_FORMAT: &str = "%Y-%m-%d";

/// Default `strftime` date pattern for a locale such as `en` or `de_DE`.
pub fn locale_date_format(locale: &str) -> &'static str {
    let language = locale
        .split(['_', '-'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match language.as_str() {
        "en" => "%b %-d, %Y",
        "de" | "da" | "fi" | "nb" | "no" | "ru" | "pl" | "cs" => "%d.%m.%Y",
        "fr" | "es" | "it" | "pt" => "%d/%m/%Y",
        "nl" => "%d-%m-%Y",
        "ja" | "zh" | "ko" => "%Y/%m/%d",
        _ => FALLBACK_DATE_FORMAT,
    }
}

/// Format `date` with a user-supplied pattern, falling back on invalid ones.
fn format_date(date: &DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(pattern)).is_ok() {
        return out;
    }
    warn!(pattern, "invalid date format, using {FALLBACK_DATE_FORMAT}");
    date.format(FALLBACK_DATE_FORMAT).to_string()
}

/// Convert a `yyyy-MM-dd` creation date to `yyyyMMdd`.
pub fn creation_stamp(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y%m%d").to_string())
}

/// Link to `link` from a page `relative_path` away from the site root.
///
/// Links into the site (`/site/...`) and absolute links (`/absolute/...`)
/// lose their marker prefix; links with a scheme pass through.
pub fn calculate_link(link: &str, relative_path: &str) -> String {
    if let Some(rest) = link.strip_prefix("/site/") {
        return rest.to_string();
    }
    if let Some(rest) = link.strip_prefix("/absolute/") {
        return rest.to_string();
    }
    if link.contains(':') {
        return link.to_string();
    }
    if relative_path == "." {
        return link.trim_start_matches('/').to_string();
    }

    match (relative_path.ends_with('/'), link.starts_with('/')) {
        (true, true) => format!("{relative_path}{}", &link[1..]),
        (false, false) => format!("{relative_path}/{link}"),
        _ => format!("{relative_path}{link}"),
    }
}

/// Compose a page title from an optional site name and the document title.
pub fn compose_title(site_name: Option<&str>, document_title: &str) -> String {
    match site_name.filter(|n| !n.is_empty()) {
        Some(name) => format!("{name}{TITLE_SEPARATOR}{document_title}"),
        None => document_title.to_string(),
    }
}

/// Builds template contexts for one site.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    site: TemplateContext,
    title_prefix: Option<String>,
    decoration: Value,
}

impl ContextBuilder {
    /// Builder for `site` at the current time.
    pub fn new(site: &SiteRenderingContext) -> Self {
        Self::at(site, Utc::now(), Some(env!("CARGO_PKG_VERSION")))
    }

    /// Builder for `site` at a fixed instant and renderer version.
    pub fn at(site: &SiteRenderingContext, now: DateTime<Utc>, renderer_version: Option<&str>) -> Self {
        let title_prefix = site
            .decoration
            .name
            .clone()
            .or_else(|| site.default_window_title.clone());

        let decoration = serde_json::to_value(&site.decoration).unwrap_or_else(|e| {
            warn!(error = %e, "decoration cannot be exposed to templates");
            Value::Null
        });

        Self {
            site: site_context(site, now, renderer_version),
            title_prefix,
            decoration,
        }
    }

    /// Site-wide facts.
    pub fn site_context(&self) -> &TemplateContext {
        &self.site
    }

    /// Site facts plus the facts of one source document.
    pub fn document_context(&self, rendering: &RenderingContext) -> TemplateContext {
        let current_file_name = rendering.output_name().replace('\\', "/");
        let aligned_file_name = calculate_link(&current_file_name, rendering.relative_path());

        let mut context = self.site.clone();
        context.insert("relative_path", rendering.relative_path());
        context.insert("current_file_name", current_file_name);
        context.insert("aligned_file_name", aligned_file_name);
        context.insert("decoration", self.decoration.clone());
        context
    }

    /// Document facts plus what the parser found in it.
    pub fn page_context(&self, sink: &Sink, rendering: &RenderingContext) -> TemplateContext {
        let mut context = self.document_context(rendering);

        context.insert("authors", json!(sink.authors));
        context.insert("short_title", sink.title.as_str());
        context.insert(
            "title",
            compose_title(self.title_prefix.as_deref(), &sink.title),
        );
        context.insert("head_content", sink.head.as_str());
        context.insert("body_content", sink.body.as_str());

        if let Some(date) = sink.date() {
            match creation_stamp(date) {
                Some(stamp) => context.insert("date_creation", stamp),
                None => warn!(
                    document = rendering.input_name(),
                    date, "could not parse creation date, expected yyyy-MM-dd"
                ),
            }
        }
        context
    }
}

fn site_context(
    site: &SiteRenderingContext,
    now: DateTime<Utc>,
    renderer_version: Option<&str>,
) -> TemplateContext {
    let date_format = site
        .decoration
        .date_format()
        .unwrap_or_else(|| locale_date_format(&site.locale))
        .to_string();
    let publish_date = site.publish_date.unwrap_or(now);

    let mut context = TemplateContext::new();
    context.insert("current_date", now.to_rfc3339());
    context.insert("date_revision", now.format("%Y%m%d").to_string());
    context.insert("locale", site.locale.as_str());
    context.insert("supported_locales", json!(site.supported_locales()));
    context.insert("publish_date", format_date(&publish_date, &date_format));
    context.insert(
        "publish_date_position",
        site.decoration.publish_date.position.as_str(),
    );
    context.insert("version_position", site.decoration.version.position.as_str());
    context.insert("date_format", date_format);
    if let Some(version) = renderer_version {
        context.insert("renderer_version", version);
    }
    if let Some(skin) = &site.skin {
        match serde_json::to_value(skin) {
            Ok(value) => context.insert("skin", value),
            Err(e) => warn!(error = %e, "skin descriptor cannot be exposed to templates"),
        }
    }

    for (key, value) in &site.template_properties {
        context.insert(key.as_str(), value.clone());
    }
    context
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sitewright_core::{Decoration, SkinDescriptor};

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
    }

    fn builder(site: &SiteRenderingContext) -> ContextBuilder {
        ContextBuilder::at(site, fixed_now(), Some("1.2.0"))
    }

    fn sink(title: &str) -> Sink {
        Sink {
            title: title.to_string(),
            authors: vec!["Ann".to_string()],
            date: None,
            head: "<meta/>".to_string(),
            body: "<p>Body</p>".to_string(),
        }
    }

    fn page(ctx: &TemplateContext, key: &str) -> Option<String> {
        ctx.get(key).map(crate::template::display_value)
    }

    #[test]
    fn test_site_facts() {
        let site = SiteRenderingContext::default();
        let ctx = builder(&site);
        let facts = ctx.site_context();

        assert_eq!(page(facts, "date_revision").as_deref(), Some("20240305"));
        assert_eq!(page(facts, "locale").as_deref(), Some("en"));
        assert_eq!(page(facts, "supported_locales").as_deref(), Some("en"));
        assert_eq!(page(facts, "publish_date").as_deref(), Some("Mar 5, 2024"));
        assert_eq!(page(facts, "publish_date_position").as_deref(), Some("left"));
        assert_eq!(page(facts, "renderer_version").as_deref(), Some("1.2.0"));
        assert!(page(facts, "current_date").unwrap().starts_with("2024-03-05T12:00:00"));
    }

    #[test]
    fn test_skin_descriptor_exposed() {
        let site = SiteRenderingContext {
            skin: Some(SkinDescriptor::parse(
                "<skin><prerequisites><renderer>[1.0,)</renderer></prerequisites></skin>",
            )
            .unwrap()),
            ..SiteRenderingContext::default()
        };
        let ctx = builder(&site);
        assert_eq!(
            ctx.site_context().lookup("skin.prerequisites.renderer"),
            Some(&json!("[1.0,)"))
        );

        let plain = SiteRenderingContext::default();
        assert!(builder(&plain).site_context().get("skin").is_none());
    }

    #[test]
    fn test_custom_date_format_and_publish_date() {
        let mut decoration = Decoration::default();
        decoration.publish_date.format = Some("%d.%m.%Y".to_string());
        let site = SiteRenderingContext::new(Default::default(), decoration, None, "en")
            .with_publish_date(Utc.with_ymd_and_hms(2023, 12, 24, 0, 0, 0).unwrap());

        let ctx = builder(&site);
        assert_eq!(page(ctx.site_context(), "publish_date").as_deref(), Some("24.12.2023"));
        assert_eq!(page(ctx.site_context(), "date_format").as_deref(), Some("%d.%m.%Y"));
    }

    #[test]
    fn test_invalid_date_format_falls_back() {
        let mut decoration = Decoration::default();
        decoration.publish_date.format = Some("%Q%".to_string());
        let site = SiteRenderingContext::new(Default::default(), decoration, None, "en");

        let ctx = builder(&site);
        assert_eq!(page(ctx.site_context(), "publish_date").as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn test_unknown_renderer_version_omitted() {
        let site = SiteRenderingContext::default();
        let ctx = ContextBuilder::at(&site, fixed_now(), None);
        assert!(!ctx.site_context().contains("renderer_version"));
    }

    #[test]
    fn test_user_properties_shadow_builtins() {
        let mut props = std::collections::BTreeMap::new();
        props.insert("locale".to_string(), json!("fr"));
        props.insert("project".to_string(), json!({ "version": "3.1" }));
        let site = SiteRenderingContext::new(props, Decoration::default(), None, "en");

        let ctx = builder(&site);
        assert_eq!(page(ctx.site_context(), "locale").as_deref(), Some("fr"));
        assert_eq!(
            ctx.site_context().lookup("project.version"),
            Some(&json!("3.1"))
        );
    }

    #[test]
    fn test_document_facts() {
        let site = SiteRenderingContext::new(Default::default(), Decoration::named("MyProj"), None, "en");
        let rendering = RenderingContext::new("/s/markdown", "guide/intro.md", "markdown", "md");
        let ctx = builder(&site).document_context(&rendering);

        assert_eq!(page(&ctx, "relative_path").as_deref(), Some(".."));
        assert_eq!(page(&ctx, "current_file_name").as_deref(), Some("guide/intro.html"));
        assert_eq!(page(&ctx, "aligned_file_name").as_deref(), Some("../guide/intro.html"));
        assert_eq!(ctx.lookup("decoration.name"), Some(&json!("MyProj")));
    }

    #[test]
    fn test_title_with_site_name() {
        let site = SiteRenderingContext::new(Default::default(), Decoration::named("MyProj"), None, "en");
        let rendering = RenderingContext::new("/s/markdown", "intro.md", "markdown", "md");
        let ctx = builder(&site).page_context(&sink("Intro"), &rendering);

        assert_eq!(page(&ctx, "title").as_deref(), Some("MyProj &#x2013; Intro"));
        assert_eq!(page(&ctx, "short_title").as_deref(), Some("Intro"));
        assert_eq!(page(&ctx, "authors").as_deref(), Some("Ann"));
        assert_eq!(page(&ctx, "head_content").as_deref(), Some("<meta/>"));
        assert_eq!(page(&ctx, "body_content").as_deref(), Some("<p>Body</p>"));
    }

    #[test]
    fn test_title_falls_back_to_window_title_then_bare() {
        let rendering = RenderingContext::new("/s/markdown", "intro.md", "markdown", "md");

        let windowed = SiteRenderingContext::new(
            Default::default(),
            Decoration::default(),
            Some("Docs".to_string()),
            "en",
        );
        let ctx = builder(&windowed).page_context(&sink("Intro"), &rendering);
        assert_eq!(page(&ctx, "title").as_deref(), Some("Docs &#x2013; Intro"));

        let bare = SiteRenderingContext::default();
        let ctx = builder(&bare).page_context(&sink("Intro"), &rendering);
        assert_eq!(page(&ctx, "title").as_deref(), Some("Intro"));
    }

    #[test]
    fn test_empty_site_name_suppresses_window_title() {
        let rendering = RenderingContext::new("/s/markdown", "intro.md", "markdown", "md");
        let decoration = Decoration {
            name: Some(String::new()),
            ..Decoration::default()
        };
        let site = SiteRenderingContext::new(
            Default::default(),
            decoration,
            Some("Docs".to_string()),
            "en",
        );

        let ctx = builder(&site).page_context(&sink("Intro"), &rendering);
        assert_eq!(page(&ctx, "title").as_deref(), Some("Intro"));
    }

    #[test]
    fn test_date_creation_stamp() {
        let site = SiteRenderingContext::default();
        let rendering = RenderingContext::new("/s/markdown", "intro.md", "markdown", "md");
        let b = builder(&site);

        let mut dated = sink("Intro");
        dated.date = Some("2024-03-05".to_string());
        let ctx = b.page_context(&dated, &rendering);
        assert_eq!(page(&ctx, "date_creation").as_deref(), Some("20240305"));

        dated.date = Some("05/03/2024".to_string());
        let ctx = b.page_context(&dated, &rendering);
        assert!(!ctx.contains("date_creation"));
    }

    #[test]
    fn test_calculate_link() {
        assert_eq!(calculate_link("index.html", "."), "index.html");
        assert_eq!(calculate_link("/index.html", "."), "index.html");
        assert_eq!(calculate_link("a/b.html", "../.."), "../../a/b.html");
        assert_eq!(calculate_link("/a/b.html", ".."), "../a/b.html");
        assert_eq!(calculate_link("a.html", "../"), "../a.html");
        assert_eq!(calculate_link("/site/x.html", ".."), "x.html");
        assert_eq!(calculate_link("/absolute/x.html", ".."), "x.html");
        assert_eq!(calculate_link("https://example.com", ".."), "https://example.com");
    }

    #[test]
    fn test_locale_date_formats() {
        assert_eq!(locale_date_format("en_US"), "%b %-d, %Y");
        assert_eq!(locale_date_format("de-AT"), "%d.%m.%Y");
        assert_eq!(locale_date_format("xx"), "%Y-%m-%d");
    }
}
