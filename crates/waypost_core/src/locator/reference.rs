//! Reference syntax: identifier, inventory path or plain name.

use uuid::Uuid;

/// Path separator.
const SEPARATOR: char = '/';
/// Escapes the next character.
const ESCAPE: char = '\\';

/// A parsed entity reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reference {
    /// Identifier literal
    Id(Uuid),
    /// Inventory path, root first
    Path(Vec<String>),
    /// Name, escapes removed
    Name(String),
}

impl Reference {
    /// Classifies a raw reference.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(id) = trimmed.parse::<Uuid>() {
            return Self::Id(id);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut separated = false;
        let mut chars = trimmed.chars();
        while let Some(c) = chars.next() {
            match c {
                // Only the separator and the escape itself are escapable;
                // anything else keeps its backslash for the pattern stage.
                ESCAPE => match chars.next() {
                    Some(next @ (SEPARATOR | ESCAPE)) => current.push(next),
                    Some(next) => {
                        current.push(ESCAPE);
                        current.push(next);
                    }
                    None => current.push(ESCAPE),
                },
                SEPARATOR => {
                    separated = true;
                    if !current.is_empty() {
                        segments.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(c),
            }
        }

        if separated {
            if !current.is_empty() {
                segments.push(current);
            }
            Self::Path(segments)
        } else {
            Self::Name(current)
        }
    }
}

/// Escapes a folder or item name for use as one path segment.
#[must_use]
pub fn escape_segment(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier() {
        let id = Uuid::new_v4();
        assert_eq!(Reference::parse(&id.to_string()), Reference::Id(id));
    }

    #[test]
    fn test_paths() {
        assert_eq!(
            Reference::parse("/Objects/Furniture/Chair"),
            Reference::Path(vec!["Objects".into(), "Furniture".into(), "Chair".into()])
        );
        assert_eq!(
            Reference::parse("Objects/Chair"),
            Reference::Path(vec!["Objects".into(), "Chair".into()])
        );
        assert_eq!(
            Reference::parse(r"Objects/AC\/DC"),
            Reference::Path(vec!["Objects".into(), "AC/DC".into()])
        );
    }

    #[test]
    fn test_escaped_separator_is_a_name() {
        assert_eq!(Reference::parse(r"AC\/DC"), Reference::Name("AC/DC".into()));
        assert_eq!(Reference::parse("Chair"), Reference::Name("Chair".into()));
        assert_eq!(Reference::parse(r"Chair \d+"), Reference::Name(r"Chair \d+".into()));
    }

    #[test]
    fn test_escape_segment() {
        assert_eq!(escape_segment(r"a/b\c"), r"a\/b\\c");
        let path = format!("Objects/{}", escape_segment("AC/DC"));
        assert_eq!(
            Reference::parse(&path),
            Reference::Path(vec!["Objects".into(), "AC/DC".into()])
        );
    }
}
