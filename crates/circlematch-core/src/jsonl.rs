use serde::de::DeserializeOwned;

use crate::error::MatchError;

#[derive(Debug, Clone)]
pub struct JsonlParseOutcome<T> {
    pub items: Vec<T>,
    pub skipped_lines: usize,
    pub first_error: Option<(usize, String)>,
}

/// Parses one JSON value per line, skipping blank and malformed lines.
pub fn parse_jsonl_tolerant<T>(raw: &str) -> JsonlParseOutcome<T>
where
    T: DeserializeOwned,
{
    let mut items = Vec::new();
    let mut skipped_lines = 0usize;
    let mut first_error = None::<(usize, String)>;

    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(value) => items.push(value),
            Err(err) => {
                skipped_lines += 1;
                if first_error.is_none() {
                    first_error = Some((line_no + 1, err.to_string()));
                }
            }
        }
    }

    JsonlParseOutcome {
        items,
        skipped_lines,
        first_error,
    }
}

pub fn jsonl_all_lines_invalid(
    label: &str,
    skipped_lines: usize,
    first_error: Option<&(usize, String)>,
) -> MatchError {
    match first_error {
        Some((line_no, message)) => MatchError::Validation(format!(
            "{label} parse failed: skipped {skipped_lines} invalid lines (first at line {line_no}: {message})"
        )),
        None => MatchError::Validation(format!(
            "{label} parse failed: skipped {skipped_lines} invalid lines"
        )),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Eq)]
    struct Row {
        id: u32,
    }

    #[test]
    fn skips_blank_and_malformed_lines() {
        let outcome = parse_jsonl_tolerant::<Row>("{\"id\":1}\n\nnot json\n{\"id\":2}\n{\"id\":\n");
        assert_eq!(outcome.items, vec![Row { id: 1 }, Row { id: 2 }]);
        assert_eq!(outcome.skipped_lines, 2);
        assert_eq!(outcome.first_error.map(|(line, _)| line), Some(3));
    }

    #[test]
    fn all_invalid_error_names_first_line() {
        let outcome = parse_jsonl_tolerant::<Row>("x\ny\n");
        let err = jsonl_all_lines_invalid(
            "request log",
            outcome.skipped_lines,
            outcome.first_error.as_ref(),
        );
        let message = err.to_string();
        assert!(message.contains("skipped 2 invalid lines"));
        assert!(message.contains("first at line 1"));
    }
}
