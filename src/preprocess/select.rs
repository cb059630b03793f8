//! `lines=` and `tags=` selection for include directives.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::error::IncludeError;
use crate::fragment::AttributeList;

/// Pick the lines of an included file that the directive asks for.
///
/// `lines` wins over `tags`. Without either, every line is kept except
/// tag markers. `line` is the directive's own line, used for warnings.
pub(super) fn select(
    lines: Vec<String>,
    attributes: &AttributeList,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<String>, IncludeError> {
    if let Some(spec) = attributes.named("lines").filter(|s| !s.trim().is_empty()) {
        let ranges = parse_ranges(spec)?;
        return Ok(lines
            .into_iter()
            .enumerate()
            .filter(|(index, _)| ranges.iter().any(|r| r.contains(index + 1)))
            .map(|(_, text)| text)
            .collect());
    }
    match attributes.named("tags").or_else(|| attributes.named("tag")) {
        Some(spec) => by_tags(lines, spec, line, diagnostics),
        None => Ok(lines
            .into_iter()
            .filter(|text| tag_marker(text).is_none())
            .collect()),
    }
}

// ── Line ranges ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LineRange {
    start: usize,
    end: Option<usize>,
}

impl LineRange {
    fn contains(self, line: usize) -> bool {
        line >= self.start && self.end.is_none_or(|end| line <= end)
    }
}

fn parse_ranges(spec: &str) -> Result<Vec<LineRange>, IncludeError> {
    let ranges = spec
        .split([';', ','])
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| parse_range(entry).ok_or_else(|| IncludeError::InvalidLineRange(entry.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    if ranges.is_empty() {
        return Err(IncludeError::InvalidLineRange(spec.to_string()));
    }
    Ok(ranges)
}

fn parse_range(entry: &str) -> Option<LineRange> {
    match entry.split_once("..") {
        Some((from, to)) => {
            let start = from.trim().parse().ok()?;
            let end = match to.trim() {
                "" | "-1" => None,
                to => Some(to.parse().ok()?),
            };
            if end.is_some_and(|end| end < start) {
                return None;
            }
            Some(LineRange { start, end })
        }
        None => {
            let line = entry.parse().ok()?;
            Some(LineRange {
                start: line,
                end: Some(line),
            })
        }
    }
}

// ── Tags ─────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Eq)]
struct TagMarker<'a> {
    end: bool,
    name: &'a str,
}

/// Find a `tag::name[]` or `end::name[]` marker anywhere in `line`.
fn tag_marker(line: &str) -> Option<TagMarker<'_>> {
    for (index, _) in line.match_indices("::") {
        let head = &line[..index];
        let end = if head.ends_with("tag") {
            false
        } else if head.ends_with("end") {
            true
        } else {
            continue;
        };
        let preceded_by_word = head[..index - 3]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if preceded_by_word {
            continue;
        }
        let rest = &line[index + 2..];
        let Some(close) = rest.find("[]") else {
            continue;
        };
        let name = &rest[..close];
        let after = &rest[close + 2..];
        if !name.is_empty()
            && !name.contains(char::is_whitespace)
            && (after.is_empty() || after.starts_with(' '))
        {
            return Some(TagMarker { end, name });
        }
    }
    None
}

fn by_tags(
    lines: Vec<String>,
    spec: &str,
    line: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<String>, IncludeError> {
    let mut tags: Vec<(String, bool)> = Vec::new();
    for entry in spec.split([';', ',']).map(str::trim).filter(|e| !e.is_empty()) {
        let (name, include) = match entry.strip_prefix('!') {
            Some(name) => (name, false),
            None => (entry, true),
        };
        match tags.iter_mut().find(|(n, _)| n == name) {
            Some(existing) => existing.1 = include,
            None => tags.push((name.to_string(), include)),
        }
    }

    let take = |tags: &mut Vec<(String, bool)>, name: &str| {
        let index = tags.iter().position(|(n, _)| n == name)?;
        Some(tags.remove(index).1)
    };
    let (base, wildcard) = match take(&mut tags, "**") {
        Some(double) => match take(&mut tags, "*") {
            Some(single) => (double, Some(single)),
            None => (double, Some(double)),
        },
        None => {
            let base = !tags.iter().any(|(_, include)| *include);
            (base, take(&mut tags, "*"))
        }
    };
    let lookup = |name: &str| tags.iter().find(|(n, _)| n == name).map(|(_, v)| *v);

    let mut out = Vec::new();
    let mut open: Vec<(String, bool, usize)> = Vec::new();
    let mut found: Vec<String> = Vec::new();
    let mut select = base;

    for (index, text) in lines.into_iter().enumerate() {
        let Some(marker) = tag_marker(&text) else {
            if select {
                out.push(text);
            }
            continue;
        };
        let name = marker.name.to_string();
        if marker.end {
            if open.last().is_some_and(|(n, ..)| *n == name) {
                open.pop();
                select = open.last().map_or(base, |(_, s, _)| *s);
            } else if lookup(&name).is_some() {
                Diagnostic::warning(
                    DiagnosticKind::InvalidDirective,
                    Some(line),
                    format!("mismatched end tag `{name}` on line {} of include file", index + 1),
                )
                .emit(diagnostics);
            }
        } else if let Some(include) = lookup(&name) {
            select = include;
            if include {
                found.push(name.clone());
            }
            open.push((name, select, index + 1));
        } else if let Some(wildcard) = wildcard {
            select = if !open.is_empty() && !select {
                false
            } else {
                wildcard
            };
            open.push((name, select, index + 1));
        }
    }

    for (name, _, start) in open {
        Diagnostic::warning(
            DiagnosticKind::UnclosedTag,
            Some(line),
            format!("detected unclosed tag `{name}` starting on line {start} of include file"),
        )
        .emit(diagnostics);
    }
    if let Some((missing, _)) = tags
        .iter()
        .find(|(name, include)| *include && !found.contains(name))
    {
        return Err(IncludeError::MissingTag(missing.clone()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    const TAGGED: &str = "\
intro
// tag::a[]
alpha
// tag::b[]
beta
// end::b[]
// end::a[]
middle
# tag::c[]
gamma
# end::c[]
outro";

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    fn attrs(name: &str, value: &str) -> AttributeList {
        let mut list = AttributeList::default();
        list.named.insert(name.to_string(), value.to_string());
        list
    }

    fn pick(name: &str, value: &str) -> Result<Vec<String>, IncludeError> {
        select(lines(TAGGED), &attrs(name, value), 1, &mut Vec::new())
    }

    // ── Line ranges ──────────────────────────────────────────────────

    #[rstest]
    #[case("1..2", &["intro", "// tag::a[]"])]
    #[case("1;3", &["intro", "alpha"])]
    #[case("11..", &["# end::c[]", "outro"])]
    #[case("11..-1", &["# end::c[]", "outro"])]
    #[case("1, 12", &["intro", "outro"])]
    fn line_ranges(#[case] spec: &str, #[case] expected: &[&str]) {
        assert_eq!(pick("lines", spec).expect("selection"), expected);
    }

    #[rstest]
    #[case("a..b")]
    #[case("1..2;x")]
    #[case(";")]
    #[case("3..2")]
    #[case("1;5..4")]
    fn invalid_line_ranges(#[case] spec: &str) {
        assert!(matches!(pick("lines", spec), Err(IncludeError::InvalidLineRange(_))));
    }

    #[test]
    fn lines_win_over_tags() {
        let mut list = attrs("lines", "1");
        list.named.insert("tags".into(), "a".into());
        let out = select(lines(TAGGED), &list, 1, &mut Vec::new()).expect("selection");
        assert_eq!(out, vec!["intro"]);
    }

    // ── Tags ─────────────────────────────────────────────────────────

    #[test]
    fn no_selection_drops_markers() {
        let out = select(lines(TAGGED), &AttributeList::default(), 1, &mut Vec::new())
            .expect("selection");
        assert_eq!(out, vec!["intro", "alpha", "beta", "middle", "gamma", "outro"]);
    }

    #[rstest]
    #[case("tag", "a", &["alpha", "beta"])]
    #[case("tags", "b;c", &["beta", "gamma"])]
    #[case("tags", "a;!b", &["alpha"])]
    #[case("tags", "*", &["alpha", "beta", "gamma"])]
    #[case("tags", "**", &["intro", "alpha", "beta", "middle", "gamma", "outro"])]
    #[case("tags", "!c", &["intro", "alpha", "beta", "middle", "outro"])]
    #[case("tags", "!*", &["intro", "middle", "outro"])]
    #[case("tags", "**;!b", &["intro", "alpha", "middle", "gamma", "outro"])]
    fn tag_selection(#[case] name: &str, #[case] spec: &str, #[case] expected: &[&str]) {
        assert_eq!(pick(name, spec).expect("selection"), expected);
    }

    #[test]
    fn missing_tag_fails() {
        assert!(matches!(pick("tag", "nope"), Err(IncludeError::MissingTag(name)) if name == "nope"));
    }

    #[test]
    fn unclosed_tag_warns() {
        let mut diagnostics = Vec::new();
        let out = select(
            lines("tag::x[]\nkept\n"),
            &attrs("tag", "x"),
            4,
            &mut diagnostics,
        )
        .expect("selection");
        assert_eq!(out, vec!["kept"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::UnclosedTag);
        assert_eq!(diagnostics[0].line, Some(4));
    }

    #[rstest]
    #[case("// tag::x[]", Some(TagMarker { end: false, name: "x" }))]
    #[case("end::x[] trailing", Some(TagMarker { end: true, name: "x" }))]
    #[case("atag::x[]", None)]
    #[case("tag::x[]y", None)]
    #[case("tag::[]", None)]
    fn markers(#[case] line: &str, #[case] expected: Option<TagMarker<'static>>) {
        assert_eq!(tag_marker(line), expected);
    }
}
