//! URL slug generation

/// Fold common Latin letters with diacritics to ASCII
fn fold(ch: char) -> Option<&'static str> {
    let folded = match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ć' | 'č' | 'ĉ' | 'ċ' => "c",
        'ď' | 'đ' | 'ð' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ĝ' | 'ġ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ķ' => "k",
        'ł' | 'ľ' | 'ĺ' | 'ļ' => "l",
        'ñ' | 'ń' | 'ň' | 'ņ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ŕ' | 'ř' => "r",
        'ß' => "ss",
        'ś' | 'š' | 'ş' | 'ș' => "s",
        'ť' | 'ţ' | 'ț' => "t",
        'þ' => "th",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Lower-case, fold diacritics, turn every run of other characters into a
/// single hyphen and clip to `max_len` characters at a hyphen boundary.
/// Returns `None` when nothing usable is left.
pub fn slugify(text: &str, max_len: usize) -> Option<String> {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        let piece: Option<std::borrow::Cow<'static, str>> = if let Some(folded) = fold(ch) {
            Some(folded.into())
        } else if ch.is_alphanumeric() {
            Some(ch.to_string().into())
        } else {
            None
        };

        match piece {
            Some(piece) => {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push_str(&piece);
            }
            None => pending_hyphen = true,
        }
    }

    let slug = clip(&slug, max_len);
    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

/// Clip a slug to `max_len` characters, at a hyphen boundary when there is one
pub fn clip(slug: &str, max_len: usize) -> String {
    let cut = match slug.char_indices().nth(max_len) {
        Some((byte, _)) => byte,
        None => return slug.to_string(),
    };

    let head = &slug[..cut];
    // A cut right before a hyphen already ends on a word
    if slug[cut..].starts_with('-') {
        return head.trim_matches('-').to_string();
    }
    match head.rfind('-') {
        Some(hyphen) if hyphen > 0 => head[..hyphen].trim_matches('-').to_string(),
        _ => head.trim_matches('-').to_string(),
    }
}

/// Placeholder slug for items whose title yields nothing
pub fn fallback_slug(index: usize) -> String {
    format!("post-{}", index)
}
