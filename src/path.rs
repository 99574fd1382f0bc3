use std::fmt;

/// A reference into a document, expressed as segments. Parsed from dotted
/// notation with optional bracket indexes, e.g. `homeAirport.id` or
/// `routes[0].iata`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    fn parse_segmented(input: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut buffer = String::new();
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if !buffer.is_empty() {
                        segments.push(std::mem::take(&mut buffer));
                    }
                }
                '[' => {
                    if !buffer.is_empty() {
                        segments.push(std::mem::take(&mut buffer));
                    }
                    let mut index = String::new();
                    for next in chars.by_ref() {
                        if next == ']' {
                            break;
                        }
                        index.push(next);
                    }
                    if !index.is_empty() {
                        segments.push(index);
                    }
                }
                _ => buffer.push(ch),
            }
        }

        if !buffer.is_empty() {
            segments.push(buffer);
        }

        segments
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The trailing segment, used as the key field of a join projection.
    pub fn leaf(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Renders the path in N1QL notation: dot-joined segments, with
    /// all-numeric segments rendered as array indexes.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            if segment.chars().all(|c| c.is_ascii_digit()) && !out.is_empty() {
                out.push('[');
                out.push_str(segment);
                out.push(']');
            } else {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(segment);
            }
        }
        out
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for FieldPath {
    fn from(value: &str) -> Self {
        Self(Self::parse_segmented(value))
    }
}

impl From<String> for FieldPath {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Vec<String>> for FieldPath {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl<'a> From<&'a [&'a str]> for FieldPath {
    fn from(value: &'a [&'a str]) -> Self {
        Self(value.iter().map(|segment| segment.to_string()).collect())
    }
}
