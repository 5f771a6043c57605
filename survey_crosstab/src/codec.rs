// The cell format of grid questions (matrix and forced rank):
//   "Statement A: Value | Statement B: Value"
// Items are separated by " | ". The statement ends at the first ':'.

pub const ITEM_SEPARATOR: &str = " | ";
pub const KEY_SEPARATOR: char = ':';

/// The content of one grid cell.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct GridCell {
    /// (statement, value) pairs, trimmed, in cell order.
    pub entries: Vec<(String, String)>,
    /// The items that could not be read.
    pub malformed: Vec<String>,
}

impl GridCell {
    pub fn is_clean(&self) -> bool {
        self.malformed.is_empty()
    }
}

/// Splits a grid cell into its items.
///
/// An item without separator, or with an empty statement or value, is malformed.
/// Blank items (for example a trailing separator) are ignored.
pub fn decode(cell: &str) -> GridCell {
    let mut res = GridCell::default();
    for item in cell.split(ITEM_SEPARATOR) {
        if item.trim().is_empty() {
            continue;
        }
        match item.split_once(KEY_SEPARATOR) {
            Some((statement, value)) => {
                let (statement, value) = (statement.trim(), value.trim());
                if statement.is_empty() || value.is_empty() {
                    res.malformed.push(item.to_string());
                } else {
                    res.entries.push((statement.to_string(), value.to_string()));
                }
            }
            None => res.malformed.push(item.to_string()),
        }
    }
    res
}

/// The inverse of [`decode`] for well-formed entries.
pub fn encode<S: AsRef<str>, V: AsRef<str>>(entries: &[(S, V)]) -> String {
    entries
        .iter()
        .map(|(s, v)| format!("{}{} {}", s.as_ref(), KEY_SEPARATOR, v.as_ref()))
        .collect::<Vec<String>>()
        .join(ITEM_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(l: &[(&str, &str)]) -> Vec<(String, String)> {
        l.iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn decode_simple() {
        let c = decode("Price: Agree | Quality:  Strongly agree ");
        assert!(c.is_clean());
        assert_eq!(
            c.entries,
            pairs(&[("Price", "Agree"), ("Quality", "Strongly agree")])
        );
    }

    #[test]
    fn statement_ends_at_first_colon() {
        let c = decode("Time: 9:00 | Place: here");
        assert_eq!(c.entries, pairs(&[("Time", "9:00"), ("Place", "here")]));
    }

    #[test]
    fn malformed_items() {
        let c = decode("Price: 1 | no separator | : 2 | Speed: | ");
        assert_eq!(c.entries, pairs(&[("Price", "1")]));
        assert_eq!(
            c.malformed,
            vec![
                "no separator".to_string(),
                ": 2".to_string(),
                "Speed:".to_string()
            ]
        );
        assert!(!c.is_clean());
    }

    #[test]
    fn encode_then_decode() {
        let entries = pairs(&[("Price", "2"), ("Quality", "1")]);
        let s = encode(&entries);
        assert_eq!(s, "Price: 2 | Quality: 1");
        assert_eq!(decode(&s).entries, entries);
    }
}
