//! Attribute lists: `[style#id.role%option,positional,name=value]`.

use chumsky::{extra, prelude::*};

use crate::asg::BlockAttributes;
use crate::fragment::AttributeList;

type Extra = extra::Default;

/// Admonition labels recognized as block styles.
pub(crate) const ADMONITIONS: [&str; 5] = ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"];

#[derive(Debug, Clone)]
enum Entry {
    Positional(String),
    Named(String, String),
}

/// Parse the content between the brackets of an attribute list.
///
/// Malformed quoting falls back to splitting on commas, so this never
/// fails.
#[must_use]
pub fn parse_attribute_list(content: &str) -> AttributeList {
    if content.trim().is_empty() {
        return AttributeList::default();
    }
    let entries = entries()
        .parse(content)
        .into_output()
        .unwrap_or_else(|| {
            content
                .split(',')
                .map(|value| Entry::Positional(value.trim().to_string()))
                .collect()
        });

    let mut list = AttributeList::default();
    for entry in entries {
        match entry {
            Entry::Positional(value) => list.positional.push(value),
            Entry::Named(name, value) => {
                list.named.insert(name, value);
            }
        }
    }
    list
}

fn quoted<'src>(quote: char) -> impl Parser<'src, &'src str, String, Extra> + Clone {
    let escaped = just('\\').ignore_then(just(quote));
    just(quote)
        .ignore_then(choice((escaped, none_of([quote]))).repeated().collect::<String>())
        .then_ignore(just(quote))
}

fn entries<'src>() -> impl Parser<'src, &'src str, Vec<Entry>, Extra> {
    let ws = one_of(" \t").repeated();
    let entry_end = choice((just(',').ignored(), end())).rewind();

    let quoted_value = choice((quoted('"'), quoted('\'')))
        .then_ignore(ws.clone())
        .then_ignore(entry_end);
    let bare_value = none_of(",")
        .repeated()
        .to_slice()
        .map(|value: &str| value.trim().to_string());
    let value = choice((quoted_value, bare_value));

    let name = any()
        .filter(|c: &char| c.is_alphanumeric() || *c == '_' || *c == '-')
        .repeated()
        .at_least(1)
        .to_slice();

    let named = name
        .then_ignore(ws.clone())
        .then_ignore(just('='))
        .then_ignore(ws.clone())
        .then(value.clone())
        .map(|(name, value): (&str, String)| Entry::Named(name.to_string(), value));

    ws.ignore_then(choice((named, value.map(Entry::Positional))))
        .separated_by(just(','))
        .collect::<Vec<_>>()
        .then_ignore(end())
}

/// Resolve a merged attribute list into block attributes.
///
/// The first positional entry carries the style plus `#id`, `.role` and
/// `%option` shorthands. Some styles give meaning to later positional
/// slots: `source` takes a language, `quote` and `verse` take an
/// attribution and a cited title.
#[must_use]
pub fn resolve(list: &AttributeList) -> BlockAttributes {
    let mut attrs = BlockAttributes::default();

    if let Some(first) = list.positional.first() {
        apply_shorthand(first, &mut attrs);
    }
    attrs.positional = list.positional.iter().skip(1).cloned().collect();

    if let Some(style) = attrs.style.take() {
        let style = if ADMONITIONS.contains(&style.as_str()) {
            style.to_lowercase()
        } else {
            style
        };
        let slots: &[&str] = match style.as_str() {
            "source" => &["language", "linenums"],
            "quote" | "verse" => &["attribution", "citetitle"],
            _ => &[],
        };
        for (slot, value) in slots.iter().zip(&attrs.positional) {
            if !value.is_empty() {
                attrs.named.insert((*slot).to_string(), value.clone());
            }
        }
        attrs.style = Some(style);
    }

    for (name, value) in &list.named {
        match name.as_str() {
            "id" => attrs.id = Some(value.clone()),
            "reftext" => attrs.reftext = Some(value.clone()),
            "role" => attrs.roles.extend(value.split_whitespace().map(str::to_string)),
            "options" | "opts" => attrs.options.extend(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string),
            ),
            _ => {
                attrs.named.insert(name.clone(), value.clone());
            }
        }
    }
    attrs
}

fn apply_shorthand(first: &str, attrs: &mut BlockAttributes) {
    let mut segments = Vec::new();
    let mut start = 0;
    for (index, ch) in first.char_indices() {
        if matches!(ch, '#' | '.' | '%') {
            segments.push(&first[start..index]);
            start = index;
        }
    }
    segments.push(&first[start..]);

    let mut segments = segments.into_iter();
    if let Some(style) = segments.next().map(str::trim).filter(|s| !s.is_empty()) {
        attrs.style = Some(style.to_string());
    }
    for segment in segments {
        let (marker, value) = segment.split_at(1);
        if value.is_empty() {
            continue;
        }
        match marker {
            "#" => attrs.id = Some(value.to_string()),
            "." => attrs.roles.push(value.to_string()),
            _ => attrs.options.push(value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn empty_content_is_empty_list() {
        assert_eq!(parse_attribute_list(""), AttributeList::default());
        assert_eq!(parse_attribute_list("  "), AttributeList::default());
    }

    #[test]
    fn positional_and_named() {
        let list = parse_attribute_list("source, ruby, subs=\"quotes,macros\"");
        assert_eq!(list.positional, vec!["source", "ruby"]);
        assert_eq!(list.named("subs"), Some("quotes,macros"));
    }

    #[test]
    fn empty_positional_is_kept() {
        let list = parse_attribute_list(",ruby");
        assert_eq!(list.positional, vec!["", "ruby"]);
    }

    #[test]
    fn escaped_quote_inside_value() {
        let list = parse_attribute_list(r#"title="say \"hi\"""#);
        assert_eq!(list.named("title"), Some(r#"say "hi""#));
    }

    #[test]
    fn unbalanced_quote_falls_back_to_split() {
        let list = parse_attribute_list("\"open, closed");
        assert_eq!(list.positional, vec!["\"open", "closed"]);
    }

    #[rstest]
    #[case("source,ruby", Some("source"), Some("ruby"))]
    #[case("source", Some("source"), None)]
    #[case("listing", Some("listing"), None)]
    fn source_language_slot(
        #[case] content: &str,
        #[case] style: Option<&str>,
        #[case] language: Option<&str>,
    ) {
        let attrs = resolve(&parse_attribute_list(content));
        assert_eq!(attrs.style.as_deref(), style);
        assert_eq!(attrs.language(), language);
    }

    #[test]
    fn verse_slots() {
        let attrs = resolve(&parse_attribute_list("verse, Carl Sandburg, Fog"));
        assert_eq!(attrs.style.as_deref(), Some("verse"));
        assert_eq!(attrs.attribution(), Some("Carl Sandburg"));
        assert_eq!(attrs.citetitle(), Some("Fog"));
    }

    #[test]
    fn shorthand_segments() {
        let attrs = resolve(&parse_attribute_list("sidebar#intro.lead.wide%collapsible"));
        assert_eq!(attrs.style.as_deref(), Some("sidebar"));
        assert_eq!(attrs.id.as_deref(), Some("intro"));
        assert_eq!(attrs.roles, vec!["lead", "wide"]);
        assert_eq!(attrs.options, vec!["collapsible"]);
    }

    #[test]
    fn shorthand_without_style() {
        let attrs = resolve(&parse_attribute_list("%hardbreaks"));
        assert_eq!(attrs.style, None);
        assert!(attrs.has_option("hardbreaks"));
    }

    #[test]
    fn admonition_style_is_lowercased() {
        let attrs = resolve(&parse_attribute_list("WARNING"));
        assert_eq!(attrs.style.as_deref(), Some("warning"));
    }

    #[test]
    fn named_role_and_options() {
        let attrs = resolve(&parse_attribute_list("role=\"a b\", options=\"x,y\", id=top"));
        assert_eq!(attrs.roles, vec!["a", "b"]);
        assert_eq!(attrs.options, vec!["x", "y"]);
        assert_eq!(attrs.id.as_deref(), Some("top"));
    }
}
