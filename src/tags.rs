use crate::highlight::Highlighter;
use anyhow::{Context, Result};
use regex::Regex;
use std::ops::Range;

/// A code sample embedded in a rendered document.
///
/// Embedded samples are written as
///
/// ```text
/// <metis>
/// let x = 1 + 1
/// </metis>
/// ```
///
/// and may span any number of lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedBlock<'t> {
    /// Byte range of the whole tag, markers included.
    pub span: Range<usize>,
    /// The literal code between the markers.
    pub code: &'t str,
}

/// Matcher for one open/close marker pair.
#[derive(Debug, Clone)]
pub struct TagPattern {
    regex: Regex,
}

impl TagPattern {
    /// Builds a non-greedy, multi-line matcher for `open … close`.
    ///
    /// Markers are matched literally.
    pub fn new(open: &str, close: &str) -> Result<Self> {
        let pattern = format!("(?s){}(.*?){}", regex::escape(open), regex::escape(close));
        let regex = Regex::new(&pattern)
            .with_context(|| format!("Invalid tag markers: {:?} / {:?}", open, close))?;
        Ok(Self { regex })
    }

    /// Lazily yields every embedded block in `text`, left to right.
    ///
    /// The blocks borrow only `text`, not the pattern.
    pub fn find_blocks<'p, 't>(&'p self, text: &'t str) -> Blocks<'p, 't> {
        Blocks {
            captures: self.regex.captures_iter(text),
        }
    }
}

/// Iterator over the embedded blocks of a text, see [`TagPattern::find_blocks`].
#[derive(Debug)]
pub struct Blocks<'p, 't> {
    captures: regex::CaptureMatches<'p, 't>,
}

impl<'p, 't> Iterator for Blocks<'p, 't> {
    type Item = EmbeddedBlock<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.captures.next()?;
        let whole = caps.get(0)?;
        let code = caps.get(1)?;
        Some(EmbeddedBlock {
            span: whole.range(),
            code: code.as_str(),
        })
    }
}

/// Replaces each block's span in `text` with the matching entry of
/// `replacements`.
///
/// `blocks` must be in order and non-overlapping, as produced by
/// [`TagPattern::find_blocks`].
pub fn assemble(text: &str, blocks: &[EmbeddedBlock<'_>], replacements: &[String]) -> String {
    debug_assert_eq!(blocks.len(), replacements.len());

    let extra: usize = replacements.iter().map(String::len).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut cursor = 0;

    for (block, replacement) in blocks.iter().zip(replacements) {
        out.push_str(&text[cursor..block.span.start]);
        out.push_str(replacement);
        cursor = block.span.end;
    }
    out.push_str(&text[cursor..]);

    out
}

/// Result of substituting a document's embedded blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substituted {
    pub text: String,
    pub blocks: usize,
}

/// Replaces every embedded block in `text` with its highlighted markup.
///
/// Blocks are highlighted one at a time in document order. Text without
/// any blocks is returned unchanged.
pub async fn substitute(
    text: &str,
    pattern: &TagPattern,
    highlighter: &Highlighter,
) -> Result<Substituted> {
    let blocks: Vec<_> = pattern.find_blocks(text).collect();
    if blocks.is_empty() {
        return Ok(Substituted {
            text: text.to_string(),
            blocks: 0,
        });
    }

    let mut replacements = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        let markup = highlighter
            .highlight(block.code)
            .await
            .with_context(|| format!("Failed to highlight code block #{}", i))?;
        replacements.push(markup);
    }

    Ok(Substituted {
        text: assemble(text, &blocks, &replacements),
        blocks: blocks.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> TagPattern {
        TagPattern::new("<metis>", "</metis>").unwrap()
    }

    #[test]
    fn test_find_single_block() {
        let text = "before <metis>1+1</metis> after";
        let blocks: Vec<_> = pattern().find_blocks(text).collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "1+1");
        assert_eq!(&text[blocks[0].span.clone()], "<metis>1+1</metis>");
    }

    #[test]
    fn test_find_is_non_greedy_and_multiline() {
        let text = "<metis>let a = 1\nlet b = 2\n</metis> mid <metis>a + b</metis>";
        let blocks: Vec<_> = pattern().find_blocks(text).collect();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].code, "let a = 1\nlet b = 2\n");
        assert_eq!(blocks[1].code, "a + b");
    }

    #[test]
    fn test_find_empty_and_unterminated() {
        let blocks: Vec<_> = pattern().find_blocks("<metis></metis> <metis>open").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "");
    }

    #[test]
    fn test_blocks_outlive_the_pattern() {
        let text = String::from("a <metis>x</metis> b");
        let blocks: Vec<EmbeddedBlock<'_>>;
        {
            let scoped = TagPattern::new("<metis>", "</metis>").unwrap();
            blocks = scoped.find_blocks(&text).collect();
        }

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "x");
    }

    #[test]
    fn test_markers_are_literal() {
        let pattern = TagPattern::new("[[code]]", "[[/code]]").unwrap();
        let blocks: Vec<_> = pattern.find_blocks("x [[code]]a.b[[/code]] y").collect();

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].code, "a.b");
    }

    #[test]
    fn test_assemble_replaces_spans() {
        let text = "before <metis>1+1</metis> after <metis>x</metis>";
        let pattern = pattern();
        let blocks: Vec<_> = pattern.find_blocks(text).collect();
        let replacements = vec!["<span>1+1</span>".to_string(), "<span>x</span>".to_string()];

        assert_eq!(
            assemble(text, &blocks, &replacements),
            "before <span>1+1</span> after <span>x</span>"
        );
    }

    #[test]
    fn test_assemble_without_blocks_is_identity() {
        let text = "<p>no samples here</p>";
        assert_eq!(assemble(text, &[], &[]), text);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_substitute_calls_highlighter_per_block() {
        let highlighter = Highlighter::new(
            "sh",
            vec![
                "-c".to_string(),
                r#"printf '<span>%s</span>' "$1""#.to_string(),
                "highlight".to_string(),
            ],
            std::time::Duration::from_secs(10),
        );

        let result = substitute("before <metis>1+1</metis> after", &pattern(), &highlighter)
            .await
            .unwrap();

        assert_eq!(result.text, "before <span>1+1</span> after");
        assert_eq!(result.blocks, 1);
    }

    #[tokio::test]
    async fn test_substitute_without_tags_never_runs_highlighter() {
        let highlighter = Highlighter::new(
            "definitely-not-a-real-tool-4711",
            Vec::new(),
            std::time::Duration::from_secs(10),
        );

        let result = substitute("plain text", &pattern(), &highlighter)
            .await
            .unwrap();

        assert_eq!(result.text, "plain text");
        assert_eq!(result.blocks, 0);
    }
}
