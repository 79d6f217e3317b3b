//! WordPress WXR export.
//!
//! Builds WXR 1.2 feeds by string assembly with explicit escaping, the same
//! way the public feeds are generated. Large result sets split across
//! multiple files; a failure mid-export never corrupts files already written.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::extract::ExtractedContent;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,
    #[error("failed to create output directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Attachment items get ids far above any post id in the same file.
const ATTACHMENT_ID_BASE: usize = 10_000;

static CONTROL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid pattern"));

static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid pattern"));

/// WXR feed writer.
pub struct WxrExporter {
    domain: String,
}

impl WxrExporter {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Export contents as one or more WXR files next to `base_path`.
    ///
    /// `parts` of zero picks an automatic split from the total count. The
    /// first file keeps the base name; later files get `_2`, `_3`, …
    /// suffixes. Returns the written paths in order.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when there is nothing to export or a file
    /// cannot be written. Files written before the failure stay on disk.
    pub async fn export(
        &self,
        contents: &[ExtractedContent],
        base_path: &Path,
        parts: usize,
    ) -> Result<Vec<PathBuf>, ExportError> {
        if contents.is_empty() {
            return Err(ExportError::Empty);
        }

        if let Some(dir) = base_path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .map_err(|source| ExportError::CreateDir {
                        path: dir.to_path_buf(),
                        source,
                    })?;
            }
        }

        let part_count = if parts == 0 {
            auto_part_count(contents.len())
        } else {
            parts.max(1)
        };
        let part_size = contents.len().div_ceil(part_count);

        let mut written = Vec::new();
        for (index, chunk) in contents.chunks(part_size).enumerate() {
            let path = part_path(base_path, index);
            let xml = self.render_feed(chunk);
            tokio::fs::write(&path, xml)
                .await
                .map_err(|source| ExportError::Write {
                    path: path.clone(),
                    source,
                })?;
            info!(path = %path.display(), items = chunk.len(), "Wrote WXR file");
            written.push(path);
        }

        Ok(written)
    }

    /// Render one WXR document for a slice of contents.
    #[must_use]
    pub fn render_feed(&self, contents: &[ExtractedContent]) -> String {
        let mut xml = String::with_capacity(contents.len() * 2048);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" ?>"#);
        xml.push('\n');
        xml.push_str(
            r#"<rss version="2.0" xmlns:excerpt="http://wordpress.org/export/1.2/excerpt/" xmlns:content="http://purl.org/rss/1.0/modules/content/" xmlns:wfw="http://wellformedweb.org/CommentAPI/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:wp="http://wordpress.org/export/1.2/">"#,
        );
        xml.push('\n');
        xml.push_str("  <channel>\n");
        xml.push_str("    <wp:wxr_version>1.2</wp:wxr_version>\n");
        xml.push_str("    <generator>wayback-press</generator>\n");
        xml.push_str("    <wp:author>\n");
        xml.push_str("      <wp:author_id>1</wp:author_id>\n");
        xml.push_str("      <wp:author_login>wayback-press</wp:author_login>\n");
        xml.push_str("      <wp:author_email>export@example.com</wp:author_email>\n");
        xml.push_str("      <wp:author_display_name>wayback-press</wp:author_display_name>\n");
        xml.push_str("      <wp:author_first_name></wp:author_first_name>\n");
        xml.push_str("      <wp:author_last_name></wp:author_last_name>\n");
        xml.push_str("    </wp:author>\n");
        xml.push_str(&format!(
            "    <title>Archive Export - {}</title>\n",
            xml_escape(&self.domain)
        ));
        xml.push_str(&format!(
            "    <link>https://{}</link>\n",
            xml_escape(&self.domain)
        ));
        xml.push_str(&format!(
            "    <description>Content recovered from the Wayback Machine - {}</description>\n",
            xml_escape(&self.domain)
        ));

        // Category and tag vocabulary for this file.
        for category in collect_unique(contents, |c| &c.categories) {
            xml.push_str("    <wp:category>\n");
            xml.push_str(&format!(
                "      <wp:cat_name>{}</wp:cat_name>\n",
                xml_escape(&category)
            ));
            xml.push_str(&format!(
                "      <wp:category_nicename>{}</wp:category_nicename>\n",
                slugify(&category)
            ));
            xml.push_str("    </wp:category>\n");
        }
        for tag in collect_unique(contents, |c| &c.tags) {
            xml.push_str("    <wp:tag>\n");
            xml.push_str(&format!("      <wp:tag_name>{}</wp:tag_name>\n", xml_escape(&tag)));
            xml.push_str(&format!("      <wp:tag_slug>{}</wp:tag_slug>\n", slugify(&tag)));
            xml.push_str("    </wp:tag>\n");
        }

        for (i, content) in contents.iter().enumerate() {
            render_post_item(&mut xml, content, i + 1);
        }
        // Featured images ride along as attachment items parented to their
        // posts.
        for (i, content) in contents.iter().enumerate() {
            if !content.featured_image.is_empty() {
                render_attachment_item(&mut xml, content, i + 1);
            }
        }

        xml.push_str("  </channel>\n");
        xml.push_str("</rss>");
        xml
    }
}

fn render_post_item(xml: &mut String, content: &ExtractedContent, post_id: usize) {
    let title = clean_text(&content.title);
    let body = clean_html(&content.content);
    let description = clean_text(&content.meta_description);
    let pub_date = normalize_date(&content.publication_date);
    let guid = stable_guid("archive", post_id, &content.url);

    xml.push_str("    <item>\n");
    xml.push_str(&format!("      <title>{title}</title>\n"));
    xml.push_str(&format!("      <link>{}</link>\n", xml_escape(&content.url)));
    xml.push_str(&format!("      <pubDate>{pub_date}</pubDate>\n"));
    xml.push_str(&format!(
        "      <guid isPermaLink=\"false\">{guid}</guid>\n"
    ));
    let summary = if description.is_empty() {
        let plain: String = body.chars().take(200).collect();
        xml_escape(&plain)
    } else {
        description
    };
    xml.push_str(&format!("      <description>{summary}</description>\n"));
    xml.push_str(&format!(
        "      <content:encoded><![CDATA[{}]]></content:encoded>\n",
        cdata_guard(&body)
    ));
    xml.push_str(&format!("      <wp:post_id>{post_id}</wp:post_id>\n"));
    xml.push_str(&format!("      <wp:post_date>{pub_date}</wp:post_date>\n"));
    xml.push_str(&format!(
        "      <wp:post_date_gmt>{pub_date}</wp:post_date_gmt>\n"
    ));
    xml.push_str("      <wp:comment_status>open</wp:comment_status>\n");
    xml.push_str("      <wp:ping_status>open</wp:ping_status>\n");
    xml.push_str(&format!(
        "      <wp:post_name>archive-post-{post_id}</wp:post_name>\n"
    ));
    xml.push_str("      <wp:status>publish</wp:status>\n");
    xml.push_str("      <wp:post_parent>0</wp:post_parent>\n");
    xml.push_str("      <wp:menu_order>0</wp:menu_order>\n");
    xml.push_str("      <wp:post_type>post</wp:post_type>\n");
    xml.push_str("      <wp:post_password></wp:post_password>\n");
    xml.push_str("      <wp:is_sticky>0</wp:is_sticky>\n");
    xml.push_str(&format!(
        "      <dc:creator>{}</dc:creator>\n",
        xml_escape(&content.author)
    ));

    for category in &content.categories {
        if !category.trim().is_empty() {
            xml.push_str(&format!(
                "      <category domain=\"category\" nicename=\"{}\"><![CDATA[{}]]></category>\n",
                slugify(category),
                cdata_guard(category)
            ));
        }
    }
    for tag in &content.tags {
        if !tag.trim().is_empty() {
            xml.push_str(&format!(
                "      <category domain=\"post_tag\" nicename=\"{}\"><![CDATA[{}]]></category>\n",
                slugify(tag),
                cdata_guard(tag)
            ));
        }
    }

    if !content.featured_image.is_empty() {
        let attachment_id = ATTACHMENT_ID_BASE + post_id;
        xml.push_str("      <wp:postmeta>\n");
        xml.push_str("        <wp:meta_key>_thumbnail_id</wp:meta_key>\n");
        xml.push_str(&format!(
            "        <wp:meta_value><![CDATA[{attachment_id}]]></wp:meta_value>\n"
        ));
        xml.push_str("      </wp:postmeta>\n");
        xml.push_str("      <wp:postmeta>\n");
        xml.push_str("        <wp:meta_key>_featured_image_url</wp:meta_key>\n");
        xml.push_str(&format!(
            "        <wp:meta_value><![CDATA[{}]]></wp:meta_value>\n",
            cdata_guard(&content.featured_image)
        ));
        xml.push_str("      </wp:postmeta>\n");
    }
    xml.push_str("    </item>\n");
}

fn render_attachment_item(xml: &mut String, content: &ExtractedContent, parent_id: usize) {
    let attachment_id = ATTACHMENT_ID_BASE + parent_id;
    let pub_date = normalize_date(&content.publication_date);
    let image = xml_escape(&content.featured_image);
    let guid = stable_guid("featured", parent_id, &content.featured_image);

    xml.push_str("    <item>\n");
    xml.push_str(&format!(
        "      <title>Featured Image - Post {parent_id}</title>\n"
    ));
    xml.push_str(&format!("      <link>{image}</link>\n"));
    xml.push_str(&format!("      <pubDate>{pub_date}</pubDate>\n"));
    xml.push_str(&format!(
        "      <guid isPermaLink=\"false\">{guid}</guid>\n"
    ));
    xml.push_str(&format!(
        "      <description>Featured image for post {parent_id}</description>\n"
    ));
    xml.push_str(&format!(
        "      <content:encoded><![CDATA[<img src=\"{}\" alt=\"Featured Image\" />]]></content:encoded>\n",
        cdata_guard(&content.featured_image)
    ));
    xml.push_str(&format!("      <wp:post_id>{attachment_id}</wp:post_id>\n"));
    xml.push_str(&format!("      <wp:post_date>{pub_date}</wp:post_date>\n"));
    xml.push_str(&format!(
        "      <wp:post_date_gmt>{pub_date}</wp:post_date_gmt>\n"
    ));
    xml.push_str("      <wp:comment_status>closed</wp:comment_status>\n");
    xml.push_str("      <wp:ping_status>closed</wp:ping_status>\n");
    xml.push_str(&format!(
        "      <wp:post_name>featured-image-{parent_id}</wp:post_name>\n"
    ));
    xml.push_str("      <wp:status>inherit</wp:status>\n");
    xml.push_str(&format!(
        "      <wp:post_parent>{parent_id}</wp:post_parent>\n"
    ));
    xml.push_str("      <wp:menu_order>0</wp:menu_order>\n");
    xml.push_str("      <wp:post_type>attachment</wp:post_type>\n");
    xml.push_str("      <wp:post_password></wp:post_password>\n");
    xml.push_str("      <wp:is_sticky>0</wp:is_sticky>\n");
    xml.push_str("      <dc:creator>wayback-press</dc:creator>\n");
    xml.push_str(&format!(
        "      <wp:attachment_url>{image}</wp:attachment_url>\n"
    ));
    xml.push_str("    </item>\n");
}

/// Pick a part count for a total item count.
#[must_use]
pub fn auto_part_count(total: usize) -> usize {
    match total {
        0..=10 => 1,
        11..=50 => 2,
        51..=100 => 3,
        101..=200 => 4,
        201..=500 => 8,
        _ => 12,
    }
}

fn part_path(base: &Path, index: usize) -> PathBuf {
    if index == 0 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    let ext = base
        .extension()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "xml".to_string());
    base.with_file_name(format!("{stem}_{}.{ext}", index + 1))
}

fn collect_unique<'a, F>(contents: &'a [ExtractedContent], field: F) -> Vec<String>
where
    F: Fn(&'a ExtractedContent) -> &'a Vec<String>,
{
    let mut seen = Vec::new();
    for content in contents {
        for term in field(content) {
            let term = term.trim();
            if !term.is_empty() && !seen.iter().any(|s: &String| s == term) {
                seen.push(term.to_string());
            }
        }
    }
    seen
}

/// Escape text for XML element content.
#[must_use]
pub fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Clean plain text for XML: control characters out, whitespace collapsed,
/// entities escaped.
fn clean_text(text: &str) -> String {
    let text = CONTROL_CHARS.replace_all(text, "");
    let text = MULTI_SPACE.replace_all(&text, " ");
    xml_escape(text.trim())
}

/// Clean HTML destined for a CDATA block: control characters only, markup
/// preserved.
fn clean_html(html: &str) -> String {
    let html = CONTROL_CHARS.replace_all(html, "");
    MULTI_SPACE.replace_all(&html, " ").trim().to_string()
}

/// Close-guard text embedded in CDATA sections.
fn cdata_guard(text: &str) -> String {
    text.replace("]]>", "]]&gt;")
}

fn slugify(term: &str) -> String {
    term.to_lowercase().replace(' ', "-")
}

/// Coerce assorted date shapes into `YYYY-MM-DD HH:MM:SS`.
fn normalize_date(date: &str) -> String {
    if date.len() == 10 {
        format!("{date} 12:00:00")
    } else {
        date.replace('T', " ")
    }
}

/// Deterministic GUID from the item's identity.
fn stable_guid(kind: &str, id: usize, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("{kind}-{id}-{}", &digest[..12])
}
