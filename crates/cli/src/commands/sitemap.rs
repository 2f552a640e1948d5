//! Sitemap rendering.
//!
//! Lists the static pages of the public site followed by one page per stored
//! news document, all under `SITE_BASE_URL`.

use std::io::Write;
use std::path::Path;

use askama::Template;
use chrono::DateTime;
use corretora_core::collections;
use corretora_functions::stores::{DocumentStore, StoreError, StoredDocument};
use thiserror::Error;

use super::{ConnectError, connect};

/// Public pages that are always listed: path, change frequency, priority.
const STATIC_PAGES: [(&str, &str, &str); 6] = [
    ("/", "weekly", "1.0"),
    ("/seguros", "monthly", "0.9"),
    ("/simulacao", "monthly", "0.8"),
    ("/noticias", "daily", "0.8"),
    ("/sobre", "yearly", "0.5"),
    ("/contactos", "yearly", "0.5"),
];

/// Errors that can occur while rendering the sitemap.
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Failed to list news: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to render sitemap: {0}")]
    Template(#[from] askama::Error),

    #[error("Failed to write sitemap: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, PartialEq, Eq)]
struct SitemapEntry {
    loc: String,
    /// `YYYY-MM-DD`, or empty when unknown
    lastmod: String,
    changefreq: &'static str,
    priority: &'static str,
}

#[derive(Template)]
#[template(path = "sitemap.xml")]
struct SitemapTemplate<'a> {
    entries: &'a [SitemapEntry],
}

/// Render the sitemap to `out`, or stdout.
pub async fn render(out: Option<&Path>) -> Result<(), SitemapError> {
    let (config, backends) = connect()?;
    let news = backends.documents.list(collections::NEWS).await?;

    let entries = sitemap_entries(&config.email.site_base_url, &news);
    let xml = SitemapTemplate { entries: &entries }.render()?;

    match out {
        Some(path) => {
            std::fs::write(path, &xml)?;
            tracing::info!(path = %path.display(), urls = entries.len(), "Sitemap written");
        }
        None => std::io::stdout().lock().write_all(xml.as_bytes())?,
    }
    Ok(())
}

fn sitemap_entries(base_url: &str, news: &[StoredDocument]) -> Vec<SitemapEntry> {
    let base_url = base_url.trim_end_matches('/');

    let pages = STATIC_PAGES
        .iter()
        .map(|&(path, changefreq, priority)| SitemapEntry {
            loc: format!("{base_url}{path}"),
            lastmod: String::new(),
            changefreq,
            priority,
        });

    let articles = news.iter().map(|doc| SitemapEntry {
        loc: format!("{base_url}/noticias/{}", doc.path.id()),
        lastmod: lastmod(doc),
        changefreq: "monthly",
        priority: "0.6",
    });

    pages.chain(articles).collect()
}

/// Date of the last change: `updatedAt`, else `publishedAt`.
fn lastmod(doc: &StoredDocument) -> String {
    ["updatedAt", "publishedAt"]
        .iter()
        .filter_map(|key| doc.fields.get(*key).and_then(|v| v.as_str()))
        .find_map(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use corretora_core::DocPath;
    use serde_json::json;

    use super::*;

    fn news(id: &str, fields: serde_json::Value) -> StoredDocument {
        StoredDocument {
            path: DocPath::child(collections::NEWS, id).unwrap(),
            fields: fields.as_object().cloned().unwrap(),
        }
    }

    #[test]
    fn test_static_pages_come_first() {
        let entries = sitemap_entries("https://corretora.pt/", &[]);
        assert_eq!(entries.len(), STATIC_PAGES.len());
        assert_eq!(entries[0].loc, "https://corretora.pt/");
        assert_eq!(entries[1].loc, "https://corretora.pt/seguros");
    }

    #[test]
    fn test_news_lastmod() {
        let docs = [
            news("a1", json!({"publishedAt": "2024-05-01T09:00:00Z"})),
            news(
                "b2",
                json!({"publishedAt": "2024-05-01T09:00:00Z", "updatedAt": "2024-06-02T10:30:00+01:00"}),
            ),
            news("c3", json!({"publishedAt": "ontem"})),
        ];
        let entries = sitemap_entries("https://corretora.pt", &docs);
        let articles = &entries[STATIC_PAGES.len()..];

        assert_eq!(articles[0].loc, "https://corretora.pt/noticias/a1");
        assert_eq!(articles[0].lastmod, "2024-05-01");
        assert_eq!(articles[1].lastmod, "2024-06-02");
        assert_eq!(articles[2].lastmod, "");
    }

    #[test]
    fn test_render_escapes_and_omits_unknown_lastmod() {
        let entries = [
            SitemapEntry {
                loc: "https://corretora.pt/?a=1&b=2".to_string(),
                lastmod: String::new(),
                changefreq: "weekly",
                priority: "1.0",
            },
            SitemapEntry {
                loc: "https://corretora.pt/noticias/x".to_string(),
                lastmod: "2024-05-01".to_string(),
                changefreq: "monthly",
                priority: "0.6",
            },
        ];
        let xml = SitemapTemplate { entries: &entries }.render().unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<loc>https://corretora.pt/?a=1&amp;b=2</loc>"));
        assert_eq!(xml.matches("<lastmod>").count(), 1);
        assert!(xml.contains("<lastmod>2024-05-01</lastmod>"));
        assert!(xml.trim_end().ends_with("</urlset>"));
    }
}
