//! Author and revision lines of the document header.

use crate::asg::{Author, Revision};

/// Parse a single author entry such as `Doc Writer <doc@example.org>`.
pub(crate) fn parse_author(text: &str) -> Option<Author> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (name, email) = match text.find('<') {
        Some(open) => match text[open..].find('>') {
            Some(close) => (
                text[..open].trim(),
                Some(text[open + 1..open + close].trim().to_string()),
            ),
            None => (text, None),
        },
        None => (text, None),
    };

    // Underscores join multi-word name parts
    let parts: Vec<String> = name.split_whitespace().map(|p| p.replace('_', " ")).collect();
    let (firstname, middlename, lastname) = match parts.as_slice() {
        [] => return None,
        [first] => (first.clone(), None, None),
        [first, last] => (first.clone(), None, Some(last.clone())),
        [first, middle, .., last] => (first.clone(), Some(middle.clone()), Some(last.clone())),
    };

    let initials = [Some(&firstname), middlename.as_ref(), lastname.as_ref()]
        .into_iter()
        .flatten()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect();

    Some(Author {
        fullname: parts.join(" "),
        initials,
        firstname,
        middlename,
        lastname,
        email,
    })
}

/// Parse an author line; multiple authors are separated by `;`.
pub(crate) fn parse_authors(line: &str) -> Vec<Author> {
    line.split(';').filter_map(parse_author).collect()
}

/// Whether `line` looks like a revision line: a `v`-prefixed version or a
/// date-like first character.
pub(crate) fn is_revision_line(line: &str) -> bool {
    let mut chars = line.trim().chars();
    match chars.next() {
        Some('v') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        Some(c) => c.is_ascii_digit(),
        None => false,
    }
}

/// Parse `v1.0, 2024-01-01: Remark`.
pub(crate) fn parse_revision(line: &str) -> Revision {
    let line = line.trim();
    let (main, remark) = match line.split_once(':') {
        Some((main, remark)) => (main.trim(), non_empty(remark)),
        None => (line, None),
    };

    let (number, date) = match main.split_once(',') {
        Some((number, date)) => (non_empty(number), non_empty(date)),
        None if main.starts_with('v') => (non_empty(main), None),
        None => (None, non_empty(main)),
    };

    Revision {
        number: number.map(|n| n.strip_prefix('v').unwrap_or(&n).to_string()),
        date,
        remark,
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn author_with_email() {
        let author = parse_author("Doc Writer <doc@example.org>").expect("author");
        assert_eq!(author.fullname, "Doc Writer");
        assert_eq!(author.firstname, "Doc");
        assert_eq!(author.lastname.as_deref(), Some("Writer"));
        assert_eq!(author.email.as_deref(), Some("doc@example.org"));
        assert_eq!(author.initials, "DW");
    }

    #[test]
    fn author_with_middle_name() {
        let author = parse_author("Stuart Rackham Junior").expect("author");
        assert_eq!(author.middlename.as_deref(), Some("Rackham"));
        assert_eq!(author.lastname.as_deref(), Some("Junior"));
        assert_eq!(author.initials, "SRJ");
    }

    #[test]
    fn underscores_join_name_parts() {
        let author = parse_author("Mary_Ann Smith").expect("author");
        assert_eq!(author.firstname, "Mary Ann");
        assert_eq!(author.fullname, "Mary Ann Smith");
    }

    #[test]
    fn multiple_authors() {
        let authors = parse_authors("Ann Lee; Bob Roe <bob@example.org>");
        assert_eq!(authors.len(), 2);
        assert_eq!(authors[1].email.as_deref(), Some("bob@example.org"));
    }

    #[test]
    fn blank_author_is_none() {
        assert!(parse_author("   ").is_none());
    }

    #[test]
    fn revision_detection() {
        assert!(is_revision_line("v1.0, 2024-01-01"));
        assert!(is_revision_line("2024-01-01"));
        assert!(!is_revision_line("Doc Writer"));
        assert!(!is_revision_line("version"));
    }

    #[test]
    fn full_revision_line() {
        let rev = parse_revision("v1.2, 2024-03-01: Second draft");
        assert_eq!(rev.number.as_deref(), Some("1.2"));
        assert_eq!(rev.date.as_deref(), Some("2024-03-01"));
        assert_eq!(rev.remark.as_deref(), Some("Second draft"));
    }

    #[test]
    fn date_only_revision() {
        let rev = parse_revision("2024-03-01");
        assert_eq!(rev.number, None);
        assert_eq!(rev.date.as_deref(), Some("2024-03-01"));
    }
}
