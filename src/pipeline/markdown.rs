//! HTML → Markdown serialization.
//!
//! The serializer is built once per process. Its skip list is the
//! sanitizer's dangerous-tag list plus `head`, so nothing the sanitizer
//! would have removed is rendered even if it reaches this stage.

use crate::error::Html2MdError;
use crate::pipeline::postprocess::clean_markdown;
use crate::pipeline::sanitize::DANGEROUS_TAGS;
use htmd::options::{
    BrStyle, BulletListMarker, CodeBlockFence, CodeBlockStyle, HeadingStyle, Options,
};
use htmd::HtmlToMarkdown;
use std::sync::OnceLock;

fn converter() -> &'static HtmlToMarkdown {
    static CONVERTER: OnceLock<HtmlToMarkdown> = OnceLock::new();
    CONVERTER.get_or_init(|| {
        let mut skip: Vec<&str> = DANGEROUS_TAGS.to_vec();
        skip.push("head");
        HtmlToMarkdown::builder()
            .skip_tags(skip)
            .options(Options {
                heading_style: HeadingStyle::Atx,
                bullet_list_marker: BulletListMarker::Dash,
                ul_bullet_spacing: 1,
                ol_number_spacing: 1,
                code_block_style: CodeBlockStyle::Fenced,
                code_block_fence: CodeBlockFence::Backticks,
                br_style: BrStyle::Backslash,
                ..Default::default()
            })
            .build()
    })
}

/// Convert (already sanitized) HTML to cleaned-up Markdown.
pub fn html_to_markdown(html: &str) -> Result<String, Html2MdError> {
    let raw = converter()
        .convert(html)
        .map_err(|e| Html2MdError::Markdown(e.to_string()))?;
    Ok(clean_markdown(&raw))
}
