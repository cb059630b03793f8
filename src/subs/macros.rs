//! Inline macros: links, images, icons, anchors and cross references.
//!
//! Detection is procedural. Each recognized macro is shielded as a single
//! element, and a macro preceded by a backslash is emitted as written
//! without the backslash.

use std::collections::BTreeMap;

use crate::asg::{InlineElement, InlineImage, InlineLink};
use crate::grammar::parse_attribute_list;

use super::Shielded;
use super::shield::element_index;

/// Schemes recognized in bare URLs.
const SCHEMES: &[&str] = &["https://", "http://", "ftp://", "irc://"];

/// Trailing characters that end a sentence rather than a bare URL.
const URL_TRAILERS: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\'', '"'];

/// A detected macro and the index just past it.
struct MacroMatch {
    element: InlineElement,
    end: usize,
}

pub(super) fn apply(line: &mut Shielded) {
    let chars: Vec<char> = line.text.chars().collect();
    let mut out = String::with_capacity(line.text.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\\' {
            if let Some(m) = find_macro(line, &chars, i + 1) {
                out.extend(&chars[i + 1..m.end]);
                i = m.end;
                continue;
            }
        }
        if let Some(m) = find_macro(line, &chars, i) {
            out.push(line.shield(vec![m.element]));
            i = m.end;
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    line.text = out;
}

fn find_macro(line: &Shielded, chars: &[char], i: usize) -> Option<MacroMatch> {
    if i >= chars.len() {
        return None;
    }
    try_anchor(line, chars, i)
        .or_else(|| try_xref_shorthand(line, chars, i))
        .or_else(|| try_named_macro(line, chars, i))
        .or_else(|| try_bare_url(line, chars, i))
}

fn starts_with(chars: &[char], start: usize, prefix: &str) -> bool {
    let mut index = start;
    for p in prefix.chars() {
        if chars.get(index) != Some(&p) {
            return false;
        }
        index += 1;
    }
    true
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn is_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.'))
}

/// Content of a `[...]` group opening at `open`, with `\]` unescaped, and
/// the index just past the closing bracket.
fn bracketed(chars: &[char], open: usize) -> Option<(String, usize)> {
    if chars.get(open) != Some(&'[') {
        return None;
    }
    let mut content = String::new();
    let mut i = open + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if chars.get(i + 1) == Some(&']') => {
                content.push(']');
                i += 2;
            }
            ']' => return Some((content, i + 1)),
            c => {
                content.push(c);
                i += 1;
            }
        }
    }
    None
}

/// `[[id]]` or `[[id,reftext]]`.
fn try_anchor(line: &Shielded, chars: &[char], i: usize) -> Option<MacroMatch> {
    if !starts_with(chars, i, "[[") || chars.get(i + 2) == Some(&'[') {
        return None;
    }
    let close = (i + 2..chars.len().saturating_sub(1))
        .find(|&j| chars[j] == ']' && chars[j + 1] == ']')?;
    let content = line.plain(&collect(&chars[i + 2..close]));
    let (id, reftext) = match content.split_once(',') {
        Some((id, reftext)) => (id.trim(), Some(reftext.trim().to_string())),
        None => (content.trim(), None),
    };
    if !is_id(id) {
        return None;
    }
    Some(MacroMatch {
        element: InlineElement::Anchor {
            id: id.to_string(),
            reftext: reftext.filter(|r| !r.is_empty()),
        },
        end: close + 2,
    })
}

/// `<<id>>` or `<<id,label>>`, reading the angle brackets through
/// special character placeholders.
fn try_xref_shorthand(line: &Shielded, chars: &[char], i: usize) -> Option<MacroMatch> {
    let lt = |j: usize| chars.get(j).is_some_and(|c| line.is_char(*c, '<'));
    let gt = |j: usize| chars.get(j).is_some_and(|c| line.is_char(*c, '>'));
    if !lt(i) || !lt(i + 1) {
        return None;
    }
    let close = (i + 2..chars.len()).find(|&j| gt(j) && gt(j + 1))?;
    let content = collect(&chars[i + 2..close]);
    let (id, label) = match content.split_once(',') {
        Some((id, label)) => (line.plain(id), line.elements(label.trim_start())),
        None => (line.plain(&content), Vec::new()),
    };
    let id = id.trim();
    if !is_id(id) && !id.contains('#') {
        return None;
    }
    Some(MacroMatch {
        element: InlineElement::CrossReference {
            id: id.to_string(),
            label,
        },
        end: close + 2,
    })
}

/// `name:target[content]` for the inline macro names.
fn try_named_macro(line: &Shielded, chars: &[char], i: usize) -> Option<MacroMatch> {
    if i > 0 && chars[i - 1].is_alphanumeric() {
        return None;
    }
    let name = ["link", "mailto", "xref", "image", "icon", "anchor"]
        .into_iter()
        .find(|name| starts_with(chars, i, name) && chars.get(i + name.len()) == Some(&':'))?;

    let target_start = i + name.len() + 1;
    let open = (target_start..chars.len())
        .take_while(|&j| !chars[j].is_whitespace())
        .find(|&j| chars[j] == '[')?;
    if open == target_start || chars[target_start] == ':' {
        return None;
    }
    let target = line.plain(&collect(&chars[target_start..open]));
    let (content, end) = bracketed(chars, open)?;

    let element = match name {
        "link" => link(line, target, &content),
        "mailto" => link(line, format!("mailto:{target}"), &content),
        "xref" => InlineElement::CrossReference {
            id: target,
            label: line.elements(&content),
        },
        "anchor" if is_id(&target) => InlineElement::Anchor {
            id: target,
            reftext: Some(line.plain(&content)).filter(|r| !r.is_empty()),
        },
        "image" => image(line, target, &content),
        "icon" => icon(line, target, &content),
        _ => return None,
    };
    Some(MacroMatch { element, end })
}

fn try_bare_url(line: &Shielded, chars: &[char], i: usize) -> Option<MacroMatch> {
    if i > 0 {
        let prev = chars[i - 1];
        if prev.is_alphanumeric() || matches!(prev, '/' | '.' | '_' | '-' | ':' | '=' | '+') {
            return None;
        }
    }
    let scheme = SCHEMES.iter().find(|scheme| starts_with(chars, i, scheme))?;

    let mut end = i;
    while end < chars.len()
        && !chars[end].is_whitespace()
        && chars[end] != '['
        && element_index(chars[end]).is_none()
    {
        end += 1;
    }

    if chars.get(end) == Some(&'[') {
        if let Some((content, after)) = bracketed(chars, end) {
            if end - i > scheme.len() {
                let location = line.plain(&collect(&chars[i..end]));
                return Some(MacroMatch {
                    element: link(line, location, &content),
                    end: after,
                });
            }
        }
    }

    while end > i && URL_TRAILERS.contains(&chars[end - 1]) {
        end -= 1;
    }
    if end - i <= scheme.len() {
        return None;
    }
    Some(MacroMatch {
        element: InlineElement::Link(InlineLink {
            location: collect(&chars[i..end]),
            text: Vec::new(),
            attributes: BTreeMap::new(),
        }),
        end,
    })
}

/// Link text, or named attributes with the text as the first positional
/// entry. A trailing `^` asks for a new window.
fn link(line: &Shielded, location: String, content: &str) -> InlineElement {
    let plain = line.plain(content);
    let (mut text, mut attributes) = if plain.contains('=') {
        let list = parse_attribute_list(&plain);
        let text = list
            .first()
            .map(|first| vec![InlineElement::text(first)])
            .unwrap_or_default();
        (text, list.named)
    } else {
        (line.elements(content), BTreeMap::new())
    };

    if let Some(InlineElement::Text(last)) = text.last_mut() {
        if let Some(stripped) = last.strip_suffix('^') {
            *last = stripped.to_string();
            attributes.insert("window".to_string(), "_blank".to_string());
            if last.is_empty() {
                text.pop();
            }
        }
    }
    InlineElement::Link(InlineLink {
        location,
        text,
        attributes,
    })
}

fn image(line: &Shielded, target: String, content: &str) -> InlineElement {
    let list = parse_attribute_list(&line.plain(content));
    let mut attributes = list.named.clone();
    for (slot, name) in ["alt", "width", "height"].into_iter().enumerate() {
        if let Some(value) = list.positional(slot) {
            attributes.entry(name.to_string()).or_insert_with(|| value.to_string());
        }
    }
    if !attributes.contains_key("alt") {
        attributes.insert("alt".to_string(), default_alt(&target));
    }
    InlineElement::Image(InlineImage { target, attributes })
}

/// `images/tiger-lily_2.png` reads as `tiger lily 2`.
pub(crate) fn default_alt(target: &str) -> String {
    let file = target.rsplit('/').next().unwrap_or(target);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    stem.replace(['-', '_'], " ")
}

fn icon(line: &Shielded, name: String, content: &str) -> InlineElement {
    let list = parse_attribute_list(&line.plain(content));
    let mut attributes = list.named.clone();
    if let Some(size) = list.positional(0) {
        attributes.entry("size".to_string()).or_insert_with(|| size.to_string());
    }
    InlineElement::Icon { name, attributes }
}
