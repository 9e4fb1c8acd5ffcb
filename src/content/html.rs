//! Regex-based HTML clean-up for post bodies
//!
//! Exports carry HTML fragments, not documents, so this works on tags as
//! text rather than building a DOM.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Elements removed together with everything inside them
pub const UNSAFE_ELEMENTS: [&str; 7] = ["script", "style", "iframe", "object", "embed", "form", "input"];

/// Elements that never have content
pub const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

static CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("CDATA pattern is valid"));

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));

/// One pattern per unsafe element; the regex crate has no backreferences to
/// pair an opening tag with its own closing tag
static UNSAFE_BLOCKS: Lazy<Vec<Regex>> = Lazy::new(|| {
    UNSAFE_ELEMENTS
        .iter()
        .map(|tag| {
            Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</\s*{tag}\s*>", tag = tag))
                .expect("unsafe element pattern is valid")
        })
        .collect()
});

static UNSAFE_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)</?\s*(?:{})\b[^>]*>", UNSAFE_ELEMENTS.join("|")))
        .expect("unsafe tag pattern is valid")
});

static START_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("start tag pattern is valid"));

static EVENT_HANDLER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\s+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("event handler pattern is valid")
});

static SCRIPT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\s+(?:href|src|action|formaction|xlink:href)\s*=\s*(?:"\s*(?:javascript|vbscript):[^"]*"|'\s*(?:javascript|vbscript):[^']*'|(?:javascript|vbscript):[^\s>]*)"#,
    )
    .expect("script url pattern is valid")
});

static VOID_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)<({})\b([^<>]*?)\s*/?\s*>",
        VOID_ELEMENTS.join("|")
    ))
    .expect("void tag pattern is valid")
});

static VOID_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)</\s*(?:{})\s*>", VOID_ELEMENTS.join("|")))
        .expect("void close pattern is valid")
});

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?\s*(?:p|div|br|hr|li|ul|ol|h[1-6]|blockquote|pre|tr|td|th|table|section|article|header|footer|figure|figcaption)\b[^>]*>",
    )
    .expect("block tag pattern is valid")
});

static ANY_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</?[A-Za-z!?][^<>]*>").expect("tag pattern is valid"));

static IMG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<img\b[^<>]*>").expect("img tag pattern is valid"));

static ANCHOR_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<a\b[^<>]*>").expect("anchor tag pattern is valid"));

static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .expect("attribute pattern is valid")
});

/// Text placed in `alt` when an image has none
pub const DEFAULT_ALT: &str = "Image";

/// Replace literal `<![CDATA[...]]>` wrappers with their contents
pub fn unwrap_cdata(text: &str) -> Cow<'_, str> {
    CDATA.replace_all(text, "$1")
}

/// Remove unsafe elements with their content, event-handler attributes and
/// script URLs
pub fn sanitize(html: &str) -> String {
    let mut out = COMMENT.replace_all(html, "").into_owned();
    for pattern in UNSAFE_BLOCKS.iter() {
        out = pattern.replace_all(&out, "").into_owned();
    }
    out = UNSAFE_TAGS.replace_all(&out, "").into_owned();

    START_TAG
        .replace_all(&out, |caps: &Captures<'_>| {
            let tag = EVENT_HANDLER.replace_all(&caps[0], "");
            SCRIPT_URL.replace_all(&tag, "").into_owned()
        })
        .into_owned()
}

/// A start tag taken apart so single attributes can be rewritten
struct StartTag {
    name: String,
    attributes: Vec<(String, Option<String>)>,
    self_closing: bool,
}

impl StartTag {
    fn parse(tag: &str) -> Option<Self> {
        let inner = tag.strip_prefix('<')?.strip_suffix('>')?;
        let (inner, self_closing) = match inner.trim_end().strip_suffix('/') {
            Some(rest) => (rest, true),
            None => (inner, false),
        };
        let name_end = inner
            .find(|c: char| c.is_whitespace())
            .unwrap_or(inner.len());
        let (name, rest) = inner.split_at(name_end);

        let attributes = ATTRIBUTE
            .captures_iter(rest)
            .map(|caps| {
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| m.as_str().to_string());
                (caps[1].to_string(), value)
            })
            .collect();

        Some(Self {
            name: name.to_string(),
            attributes,
            self_closing,
        })
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    fn set(&mut self, name: &str, value: String) {
        match self
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, existing)) => *existing = Some(value),
            None => self.attributes.push((name.to_string(), Some(value))),
        }
    }

    fn render(&self) -> String {
        let mut out = format!("<{}", self.name);
        for (key, value) in &self.attributes {
            match value {
                Some(value) if value.contains('"') => out.push_str(&format!(" {}='{}'", key, value)),
                Some(value) => out.push_str(&format!(" {}=\"{}\"", key, value)),
                None => out.push_str(&format!(" {}", key)),
            }
        }
        out.push_str(if self.self_closing { " />" } else { ">" });
        out
    }
}

/// `https:` for protocol-relative URLs
fn with_scheme(url: &str) -> Option<String> {
    url.starts_with("//").then(|| format!("https:{}", url))
}

fn is_external(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !lower.starts_with("http://localhost")
        && !lower.starts_with("https://localhost")
}

/// Drop images without a source, give the rest an `alt` text and an
/// explicit scheme
pub fn rewrite_images(html: &str) -> Cow<'_, str> {
    IMG_TAG.replace_all(html, |caps: &Captures<'_>| {
        let Some(mut tag) = StartTag::parse(&caps[0]) else {
            return caps[0].to_string();
        };
        let src = match tag.get("src").map(str::trim) {
            Some(src) if !src.is_empty() => src.to_string(),
            _ => return String::new(),
        };

        if let Some(absolute) = with_scheme(&src) {
            tag.set("src", absolute);
        }
        if tag.get("alt").map_or(true, |alt| alt.trim().is_empty()) {
            tag.set("alt", DEFAULT_ALT.to_string());
        }
        tag.render()
    })
}

/// Give protocol-relative links a scheme and open external links in a new
/// tab with `rel="noopener"`
pub fn rewrite_links(html: &str) -> Cow<'_, str> {
    ANCHOR_TAG.replace_all(html, |caps: &Captures<'_>| {
        let Some(mut tag) = StartTag::parse(&caps[0]) else {
            return caps[0].to_string();
        };
        let Some(href) = tag.get("href").map(|href| href.trim().to_string()) else {
            return caps[0].to_string();
        };

        let href = match with_scheme(&href) {
            Some(absolute) => {
                tag.set("href", absolute.clone());
                absolute
            }
            None => href,
        };
        if !is_external(&href) {
            return tag.render();
        }

        let rel = match tag.get("rel").map(str::trim) {
            Some(rel) if rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("noopener")) => {
                rel.to_string()
            }
            Some(rel) if !rel.is_empty() => format!("{} noopener", rel),
            _ => "noopener".to_string(),
        };
        tag.set("rel", rel);
        tag.set("target", "_blank".to_string());
        tag.render()
    })
}

/// Build a pattern matching opening and closing tags of the named elements
pub fn tag_pattern(names: &[String]) -> Option<Regex> {
    let names: Vec<String> = names
        .iter()
        .map(|name| name.trim().to_lowercase())
        .filter(|name| !name.is_empty())
        .map(|name| regex::escape(&name))
        .collect();
    if names.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)</?\s*(?:{})\b[^>]*>", names.join("|"))).ok()
}

/// Remove the tags a pattern matches, keeping their inner text
pub fn remove_tags<'a>(html: &'a str, pattern: &Regex) -> Cow<'a, str> {
    pattern.replace_all(html, "")
}

/// Rewrite void elements as `<tag ... />` and drop their stray closing tags
pub fn normalize_void_tags(html: &str) -> String {
    let out = VOID_TAG.replace_all(html, |caps: &Captures<'_>| {
        let attributes = caps[2].trim_end();
        if attributes.is_empty() {
            format!("<{} />", &caps[1])
        } else {
            format!("<{}{} />", &caps[1], attributes)
        }
    });
    VOID_CLOSE.replace_all(&out, "").into_owned()
}

/// Drop every tag, decode entities and collapse whitespace
pub fn to_plain_text(html: &str) -> String {
    let text = COMMENT.replace_all(html, "");
    let text = BLOCK_TAG.replace_all(&text, " ");
    let text = ANY_TAG.replace_all(&text, "");
    let decoded = html_escape::decode_html_entities(&text);
    collapse_whitespace(&decoded)
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut `text` to at most `max_chars` characters at a word boundary that lies
/// outside any tag or entity. Returns `None` when the text already fits.
///
/// When no boundary after the start of the text falls within the limit, the
/// cut lands inside the first word instead, at the last position outside a
/// tag or entity: `Supercalifragilistic` at 5 gives `Super`.
pub fn truncate_at_word(text: &str, max_chars: usize) -> Option<String> {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte, _)) => byte,
        None => return None,
    };

    let mut in_tag = false;
    let mut in_entity = false;
    let mut last_boundary = None;
    let mut last_safe = 0;

    for (byte, ch) in text.char_indices() {
        if byte > cut {
            break;
        }
        let outside = !in_tag && !in_entity;
        if outside {
            last_safe = byte;
            if ch.is_whitespace() || ch == '<' {
                last_boundary = Some(byte);
            }
        }
        if byte == cut {
            break;
        }

        match ch {
            '<' => {
                in_tag = true;
                in_entity = false;
            }
            '>' if in_tag => in_tag = false,
            '&' if !in_tag => in_entity = true,
            ';' if in_entity => in_entity = false,
            c if in_entity && !(c.is_ascii_alphanumeric() || c == '#') => in_entity = false,
            _ => {}
        }
    }

    // A boundary at the very start would leave nothing
    let end = last_boundary.filter(|&byte| byte > 0).unwrap_or(last_safe);
    Some(text[..end].trim_end().to_string())
}

/// Clip plain text for an excerpt: whole sentences while they fit, otherwise
/// a word-boundary cut ending in `...`
pub fn clip_excerpt(text: &str, max_chars: usize, prefer_sentences: bool) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    if prefer_sentences {
        let mut best = None;
        let mut count = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((byte, ch)) = chars.next() {
            count += 1;
            if count > max_chars {
                break;
            }
            if matches!(ch, '.' | '!' | '?') {
                let at_end = chars.peek().map_or(true, |(_, next)| next.is_whitespace());
                if at_end {
                    best = Some(byte + ch.len_utf8());
                }
            }
        }
        if let Some(end) = best {
            return text[..end].to_string();
        }
    }

    let budget = max_chars.saturating_sub(3);
    let clipped = truncate_at_word(text, budget).unwrap_or_else(|| text.to_string());
    let clipped = clipped.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == ';');
    format!("{}...", clipped)
}
