//! `vctx context` command: assemble context and print it.

use anyhow::Result;

use vault_context_core::context::{ContextAssembler, ContextRequest};
use vault_context_core::models::{BacklinkInfo, ContextResult, NoteContent, ResponseFormat};

use crate::config::Config;
use crate::vault::FsNoteStore;

/// Run one context request against the configured vault.
///
/// Prints pretty JSON with `json`, a readable text layout otherwise.
pub async fn run_context(
    config: &Config,
    request: &ContextRequest,
    format: Option<ResponseFormat>,
    json: bool,
) -> Result<()> {
    let store = FsNoteStore::open(&config.vault)?;
    let format = format.unwrap_or(config.context.default_format);

    let result = ContextAssembler::new(&store)
        .with_daily_templates(config.context.daily_note_templates.clone())
        .run(request, format)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_context(&result));
    }
    Ok(())
}

pub fn render_context(result: &ContextResult) -> String {
    let mut out = String::new();

    out.push_str("--- Note ---\n");
    push_note(&mut out, &result.primary_note);

    if let Some(related) = &result.related_notes {
        out.push_str(&format!("--- Related ({}) ---\n", related.len()));
        for note in related {
            push_note(&mut out, note);
        }
    }

    if let Some(backlinks) = &result.backlinks {
        out.push_str(&format!("--- Backlinks ({}) ---\n", backlinks.len()));
        for backlink in backlinks {
            push_backlink(&mut out, backlink);
        }
    }

    out.push_str(&format!("~{} tokens\n", result.token_estimate));
    out
}

fn push_note(out: &mut String, note: &NoteContent) {
    out.push_str(&format!("path:   {}\n", note.path));
    out.push_str(&format!("title:  {}\n", note.title));
    out.push_str(&format!("words:  {}\n", note.word_count));
    if let Some(metadata) = &note.metadata {
        let rendered = serde_json::to_string(metadata).unwrap_or_default();
        out.push_str(&format!("meta:   {}\n", rendered));
    }
    out.push('\n');
    out.push_str(&note.content);
    if !note.content.ends_with('\n') {
        out.push('\n');
    }
    out.push('\n');
}

fn push_backlink(out: &mut String, backlink: &BacklinkInfo) {
    out.push_str(&format!("[{}] {}\n", backlink.note_path, backlink.note_title));
    out.push_str(&format!("    {}\n\n", backlink.context.replace('\n', " ")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use vault_context_core::models::Note;

    #[test]
    fn test_render_sections() {
        let primary = NoteContent::from_note(
            &Note::parse("Topic.md", "---\ntags: [a]\n---\nBody text"),
            ResponseFormat::Detailed,
        );
        let related = NoteContent::from_note(
            &Note::parse("a.md", "see [[Topic]]"),
            ResponseFormat::Detailed,
        );
        let backlink = BacklinkInfo {
            note_path: "a.md".into(),
            note_title: "a".into(),
            context: "see [[Topic]]".into(),
        };
        let result = ContextResult::assemble(primary, vec![related], vec![backlink]);
        let text = render_context(&result);
        assert!(text.starts_with("--- Note ---\npath:   Topic.md\n"));
        assert!(text.contains("meta:   {\"tags\":[\"a\"]}"));
        assert!(text.contains("--- Related (1) ---"));
        assert!(text.contains("--- Backlinks (1) ---\n[a.md] a\n    see [[Topic]]"));
        assert!(text.ends_with(&format!("~{} tokens\n", result.token_estimate)));
    }

    #[test]
    fn test_render_single_omits_sections() {
        let primary = NoteContent::from_note(&Note::parse("x.md", "x"), ResponseFormat::Concise);
        let text = render_context(&ContextResult::single(primary));
        assert!(!text.contains("Related"));
        assert!(!text.contains("Backlinks"));
        assert!(!text.contains("meta:"));
    }
}
