//! `vctx query` command: discover notes and print a result list.

use anyhow::Result;

use vault_context_core::models::ResponseFormat;
use vault_context_core::query::{QueryRequest, QueryResult, VaultQuery};

use crate::config::Config;
use crate::vault::FsNoteStore;

pub async fn run_query(
    config: &Config,
    request: &QueryRequest,
    limit: Option<usize>,
    format: ResponseFormat,
    json: bool,
) -> Result<()> {
    let limit = limit.unwrap_or(config.query.default_limit);
    if limit == 0 || limit > config.query.max_limit {
        anyhow::bail!("--limit must be between 1 and {}", config.query.max_limit);
    }

    let store = FsNoteStore::open(&config.vault)?;
    let result = VaultQuery::new(&store).run(request, limit, format).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_query(&result));
    }
    Ok(())
}

pub fn render_query(result: &QueryResult) -> String {
    let mut out = String::new();

    if result.results.is_empty() {
        out.push_str("No results.\n");
    }
    for (i, info) in result.results.iter().enumerate() {
        out.push_str(&format!(
            "{}. [{:.2}] {}  ({})\n",
            i + 1,
            info.relevance,
            info.title,
            info.path
        ));
        if let Some(tags) = info.tags.as_ref().filter(|t| !t.is_empty()) {
            out.push_str(&format!("    tags: {}\n", tags.join(", ")));
        }
        if let Some(modified) = &info.modified {
            out.push_str(&format!("    modified: {}\n", modified));
        }
        if let Some(excerpt) = &info.excerpt {
            out.push_str(&format!("    > {}\n", excerpt.replace('\n', " ")));
        }
    }

    if result.truncated {
        out.push_str(&format!(
            "\n{} shown (truncated, {} found)\n",
            result.results.len(),
            result.total_found
        ));
    }
    if let Some(suggestion) = &result.suggestion {
        out.push_str(&format!("hint: {}\n", suggestion));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_context_core::query::NoteInfo;

    fn info(path: &str, relevance: f64) -> NoteInfo {
        NoteInfo {
            path: path.to_string(),
            title: path.trim_end_matches(".md").to_string(),
            relevance,
            excerpt: None,
            tags: None,
            created: None,
            modified: None,
        }
    }

    #[test]
    fn test_render_lists_results() {
        let mut first = info("a.md", 1.0);
        first.tags = Some(vec!["x".into(), "y".into()]);
        let result = QueryResult {
            results: vec![first, info("b.md", 0.5)],
            total_found: 2,
            truncated: false,
            suggestion: None,
        };
        let text = render_query(&result);
        assert!(text.contains("1. [1.00] a  (a.md)\n    tags: x, y\n"));
        assert!(text.contains("2. [0.50] b  (b.md)"));
        assert!(!text.contains("hint:"));
    }

    #[test]
    fn test_render_empty_with_hint() {
        let result = QueryResult {
            results: vec![],
            total_found: 0,
            truncated: false,
            suggestion: Some("Try broader terms".into()),
        };
        assert_eq!(render_query(&result), "No results.\nhint: Try broader terms\n");
    }
}
