//! Markdown implementation of [`ArticleSink`].
//!
//! One file per article, `<posts_dir>/<slug>.md`, with YAML front matter
//! consumed by the site renderer. The set of existing slugs is the set of file
//! stems in the directory.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use pipeline::{Article, ArticleSink, Draft, PipelineError, Slug};

use crate::error::LedgerError;
use crate::table::write_new;

#[derive(Debug, Serialize)]
struct FrontMatter<'a> {
    layout: &'static str,
    title: &'a str,
    date: String,
    slug: &'a str,
    permalink: String,
    autogen_post: bool,
    keyword: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<&'a str>,
    tools: Vec<&'a str>,
    cta_urls: &'a [String],
}

/// Renders the full article document.
pub fn render_article(article: &Article) -> Result<String, serde_yaml::Error> {
    let draft = &article.draft;
    let front = FrontMatter {
        layout: "post",
        title: &draft.title,
        date: article.published_at.format("%Y-%m-%dT%H:%M:%S%:z").to_string(),
        slug: draft.slug.as_str(),
        permalink: format!("/posts/{}/", draft.slug),
        autogen_post: true,
        keyword: &draft.keyword,
        intent: draft.intent.as_deref(),
        tools: draft.recommendations.iter().map(|r| r.tool_id.as_str()).collect(),
        cta_urls: &draft.cta_urls,
    };
    let yaml = serde_yaml::to_string(&front)?;
    Ok(format!("---\n{yaml}---\n\n{}\n", draft.body.trim()))
}

/// Front matter fields needed to re-check a written article.
#[derive(Debug, Deserialize)]
struct StoredFrontMatter {
    #[serde(default)]
    title: String,
    slug: Option<String>,
    #[serde(default)]
    keyword: String,
    intent: Option<String>,
    #[serde(default)]
    cta_urls: Vec<String>,
}

/// Reads an article written by [`MarkdownPostSink`] back into a [`Draft`].
///
/// The slug falls back to the file stem. Recommendations are not stored, so
/// the draft carries none and every sponsored anchor in the body counts.
pub fn read_article(path: &Path) -> Result<Draft, LedgerError> {
    let text = fs::read_to_string(path).map_err(|e| LedgerError::io(path, e))?;
    let missing = || LedgerError::MissingFrontMatter {
        path: path.to_path_buf(),
    };
    let rest = text
        .trim_start_matches('\u{feff}')
        .strip_prefix("---\n")
        .ok_or_else(missing)?;
    let (yaml, body) = rest.split_once("\n---\n").ok_or_else(missing)?;
    let front: StoredFrontMatter = serde_yaml::from_str(yaml).map_err(|source| LedgerError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let slug = front
        .slug
        .as_deref()
        .and_then(|s| Slug::new(s))
        .or_else(|| Slug::new(stem))
        .ok_or_else(missing)?;
    Ok(Draft {
        keyword: front.keyword,
        intent: front.intent,
        title: front.title,
        slug,
        body: body.trim().to_string(),
        cta_urls: front.cta_urls,
        recommendations: Vec::new(),
        used_model: false,
    })
}

#[derive(Debug, Clone)]
pub struct MarkdownPostSink {
    posts_dir: PathBuf,
}

impl MarkdownPostSink {
    pub fn new(posts_dir: impl Into<PathBuf>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
        }
    }

    fn path_for(&self, slug: &Slug) -> PathBuf {
        self.posts_dir.join(format!("{slug}.md"))
    }
}

fn is_markdown(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "md")
}

impl ArticleSink for MarkdownPostSink {
    fn existing_slugs(&self) -> Result<HashSet<Slug>, PipelineError> {
        let entries = match fs::read_dir(&self.posts_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
            Err(e) => return Err(LedgerError::io(&self.posts_dir, e).into()),
        };
        let mut slugs = HashSet::new();
        for entry in entries {
            let path = entry.map_err(|e| LedgerError::io(&self.posts_dir, e))?.path();
            if !is_markdown(&path) {
                continue;
            }
            if let Some(slug) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Slug::new(s))
            {
                slugs.insert(slug);
            }
        }
        debug!(count = slugs.len(), dir = %self.posts_dir.display(), "Existing slugs read");
        Ok(slugs)
    }

    fn persist(&self, article: &Article) -> Result<String, PipelineError> {
        let path = self.path_for(article.slug());
        let document = render_article(article).map_err(|source| LedgerError::Yaml {
            path: path.clone(),
            source,
        })?;
        write_new(&path, &document)?;
        info!(path = %path.display(), "Article written");
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use pipeline::{Draft, Recommendation, ToolId};

    fn article(slug: &str) -> Article {
        Article {
            draft: Draft {
                keyword: "notion setup guide".to_string(),
                intent: Some("wants a rollout plan".to_string()),
                title: "[2024] notion setup guide: a rollout checklist | Notion".to_string(),
                slug: Slug::new(slug).unwrap(),
                body: "Disclosure.\n\nBody text.\n".to_string(),
                cta_urls: vec!["https://aff.partner.io/notion".to_string()],
                recommendations: vec![Recommendation {
                    tool_id: ToolId::new("notion").unwrap(),
                    name: "Notion".to_string(),
                    url: "https://aff.partner.io/notion".to_string(),
                }],
                used_model: false,
            },
            published_at: FixedOffset::east_opt(9 * 3600)
                .unwrap()
                .with_ymd_and_hms(2024, 5, 16, 7, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn persisted_article_has_front_matter_and_body() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownPostSink::new(dir.path().join("posts"));
        let location = sink.persist(&article("2024-05-16-notion-setup-guide")).unwrap();
        assert!(location.ends_with("2024-05-16-notion-setup-guide.md"));

        let text = fs::read_to_string(&location).unwrap();
        assert!(text.starts_with("---\n"));
        let (front, body) = text[4..].split_once("---\n").unwrap();
        let front: serde_yaml::Value = serde_yaml::from_str(front).unwrap();
        assert_eq!(front["layout"].as_str(), Some("post"));
        assert_eq!(front["autogen_post"].as_bool(), Some(true));
        assert_eq!(
            front["permalink"].as_str(),
            Some("/posts/2024-05-16-notion-setup-guide/")
        );
        assert_eq!(front["tools"][0].as_str(), Some("notion"));
        assert_eq!(front["date"].as_str(), Some("2024-05-16T07:00:00+09:00"));
        assert_eq!(body, "\nDisclosure.\n\nBody text.\n");
    }

    #[test]
    fn written_article_reads_back_as_draft() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownPostSink::new(dir.path());
        let location = sink.persist(&article("2024-05-16-notion-setup-guide")).unwrap();

        let draft = read_article(Path::new(&location)).unwrap();
        assert_eq!(draft.slug.as_str(), "2024-05-16-notion-setup-guide");
        assert_eq!(draft.keyword, "notion setup guide");
        assert_eq!(draft.intent.as_deref(), Some("wants a rollout plan"));
        assert_eq!(draft.body, "Disclosure.\n\nBody text.");
        assert_eq!(draft.cta_urls, vec!["https://aff.partner.io/notion".to_string()]);
        assert!(draft.recommendations.is_empty());
    }

    #[test]
    fn article_without_front_matter_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loose.md");
        fs::write(&path, "Just a body.\n").unwrap();
        let err = read_article(&path).unwrap_err();
        assert!(matches!(err, LedgerError::MissingFrontMatter { .. }));
    }

    #[test]
    fn existing_slugs_are_markdown_stems() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownPostSink::new(dir.path());
        sink.persist(&article("2024-05-16-notion-setup-guide")).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let slugs = sink.existing_slugs().unwrap();
        assert_eq!(slugs.len(), 1);
        assert!(slugs.contains(&Slug::new("2024-05-16-notion-setup-guide").unwrap()));
    }

    #[test]
    fn missing_directory_has_no_slugs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownPostSink::new(dir.path().join("absent"));
        assert!(sink.existing_slugs().unwrap().is_empty());
    }

    #[test]
    fn an_existing_article_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MarkdownPostSink::new(dir.path());
        sink.persist(&article("2024-05-16-notion-setup-guide")).unwrap();
        let err = sink.persist(&article("2024-05-16-notion-setup-guide")).unwrap_err();
        assert!(matches!(err, PipelineError::Ledger { .. }));
    }
}
