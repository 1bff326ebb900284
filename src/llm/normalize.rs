//! normalize.rs
//!
//! Shapes raw model output into the forms the pipeline stores:
//! a list of summaries, or a single block of test code.

use regex::Regex;

/// Model output resolved to an explicit shape, so downstream code never
/// re-inspects the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    Single(String),
    Multiple(Vec<String>),
}

impl Normalized {
    pub fn into_entries(self) -> Vec<String> {
        match self {
            Normalized::Single(s) => vec![s],
            Normalized::Multiple(v) => v,
        }
    }
}

/// Split a raw summary response into discrete entries.
///
/// List markers and blank lines start new entries; code-fence marker lines
/// are dropped. When nothing splits, the whole trimmed text becomes one
/// entry — malformed input degrades instead of failing.
pub fn normalize_summaries(raw: &str) -> Normalized {
    let marker = Regex::new(r"^\s*(?:[-*+•]|\d+[.)])\s+").unwrap();

    let mut entries: Vec<String> = Vec::new();
    let mut current = String::new();

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            continue;
        }

        if trimmed.is_empty() {
            flush(&mut entries, &mut current);
            continue;
        }

        match marker.find(trimmed) {
            Some(m) => {
                flush(&mut entries, &mut current);
                current.push_str(&trimmed[m.end()..]);
            }
            None => {
                if !current.is_empty() {
                    current.push(' ');
                }
                current.push_str(trimmed);
            }
        }
    }
    flush(&mut entries, &mut current);

    if entries.is_empty() {
        Normalized::Single(raw.trim().to_string())
    } else {
        Normalized::Multiple(entries)
    }
}

fn flush(entries: &mut Vec<String>, current: &mut String) {
    let text = current.trim();
    if !text.is_empty() {
        entries.push(text.to_string());
    }
    current.clear();
}

/// Strip one enclosing Markdown code fence (language tag included) plus
/// surrounding whitespace. Anything else passes through trimmed.
pub fn normalize_test_code(raw: &str) -> String {
    let text = raw.trim();

    let Some(rest) = text.strip_prefix("```") else {
        return text.to_string();
    };
    let Some(tag_end) = rest.find('\n') else {
        return text.to_string();
    };
    let body = &rest[tag_end + 1..];

    match body.strip_suffix("```") {
        Some(inner) => inner.trim().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbered_list_splits_into_entries() {
        let raw = "1. Test add() with positive numbers\n2. Test sub() with negative numbers";
        assert_eq!(
            normalize_summaries(raw),
            Normalized::Multiple(vec![
                "Test add() with positive numbers".to_string(),
                "Test sub() with negative numbers".to_string(),
            ])
        );
    }

    #[test]
    fn bulleted_list_with_fences_and_blank_lines() {
        let raw = "```\n- first case\n\n- second case\n* third case\n```";
        assert_eq!(
            normalize_summaries(raw),
            Normalized::Multiple(vec![
                "first case".to_string(),
                "second case".to_string(),
                "third case".to_string(),
            ])
        );
    }

    #[test]
    fn continuation_lines_join_their_entry() {
        let raw = "1. Test login flow\nwith an expired token\n2. Test logout";
        assert_eq!(
            normalize_summaries(raw),
            Normalized::Multiple(vec![
                "Test login flow with an expired token".to_string(),
                "Test logout".to_string(),
            ])
        );
    }

    #[test]
    fn normalization_is_idempotent_on_clean_entries() {
        let raw = "1. Test add() with positive numbers\n2. Test sub() with negative numbers";
        for entry in normalize_summaries(raw).into_entries() {
            assert_eq!(
                normalize_summaries(&entry).into_entries(),
                vec![entry.clone()]
            );
        }
    }

    #[test]
    fn empty_input_degrades_to_single_empty_entry() {
        assert_eq!(normalize_summaries(""), Normalized::Single(String::new()));
        assert_eq!(normalize_summaries("").into_entries(), vec![String::new()]);
    }

    #[test]
    fn unstructured_text_survives_as_one_entry() {
        let raw = "  Test that the parser accepts trailing commas  ";
        assert_eq!(
            normalize_summaries(raw).into_entries(),
            vec!["Test that the parser accepts trailing commas".to_string()]
        );
    }

    #[test]
    fn test_code_fence_is_stripped() {
        let raw = "```javascript\ntest('adds', ()=>{expect(add(1,2)).toBe(3)})\n```";
        assert_eq!(
            normalize_test_code(raw),
            "test('adds', ()=>{expect(add(1,2)).toBe(3)})"
        );
    }

    #[test]
    fn test_code_without_fence_is_trimmed_only() {
        let raw = "\n\nassert add(1, 2) == 3\n";
        assert_eq!(normalize_test_code(raw), "assert add(1, 2) == 3");
    }

    #[test]
    fn unterminated_fence_passes_through() {
        let raw = "```python\nassert True";
        assert_eq!(normalize_test_code(raw), "```python\nassert True");
    }
}
