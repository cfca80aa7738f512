// Ledger line encoding
// Comma separated, RFC 4180 quoting for fields that contain separators or quotes

use crate::models::{FeedbackRecord, ImageReference};
use chrono::{DateTime, Utc};

const SEPARATOR: char = ',';
const QUOTE: char = '"';

fn needs_quoting(field: &str) -> bool {
    field.contains(|c| c == SEPARATOR || c == QUOTE || c == '\n' || c == '\r')
}

fn push_field(line: &mut String, field: &str) {
    if needs_quoting(field) {
        line.push(QUOTE);
        for c in field.chars() {
            if c == QUOTE {
                line.push(QUOTE);
            }
            line.push(c);
        }
        line.push(QUOTE);
    } else {
        line.push_str(field);
    }
}

/// Encode one record as a single physical line, newline included
pub fn encode_record(record: &FeedbackRecord) -> String {
    let mut line = String::new();
    push_field(&mut line, &record.image_reference.to_string());
    line.push(SEPARATOR);
    push_field(&mut line, &record.chosen_caption);
    line.push(SEPARATOR);
    push_field(&mut line, &record.recorded_at.to_rfc3339());
    line.push('\n');
    line
}

fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars().peekable();
    let mut in_quotes = false;
    let mut field_started_quoted = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == QUOTE {
                if chars.peek() == Some(&QUOTE) {
                    current.push(QUOTE);
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }

        match c {
            SEPARATOR => {
                fields.push(std::mem::take(&mut current));
                field_started_quoted = false;
            }
            QUOTE if current.is_empty() && !field_started_quoted => {
                in_quotes = true;
                field_started_quoted = true;
            }
            QUOTE => return Err("unexpected quote inside unquoted field".to_string()),
            _ if field_started_quoted => {
                return Err("characters after closing quote".to_string());
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(current);
    Ok(fields)
}

/// Split `contents` into logical records. Quoted fields may span physical lines.
/// Returns `(starting line number, record text)` pairs.
pub fn logical_lines(contents: &str) -> Vec<(usize, String)> {
    let mut records = Vec::new();
    let mut pending = String::new();
    let mut start = 0;
    let mut open_quotes = false;

    for (index, line) in contents.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if pending.is_empty() && !open_quotes {
            start = index + 1;
        } else {
            pending.push('\n');
        }
        pending.push_str(line);

        let quotes = line.chars().filter(|c| *c == QUOTE).count();
        if quotes % 2 == 1 {
            open_quotes = !open_quotes;
        }

        if !open_quotes {
            if !pending.trim().is_empty() {
                records.push((start, std::mem::take(&mut pending)));
            } else {
                pending.clear();
            }
        }
    }

    if !pending.trim().is_empty() {
        records.push((start, pending));
    }
    records
}

pub fn decode_record(text: &str) -> Result<FeedbackRecord, String> {
    let fields = split_fields(text)?;
    if fields.len() != 3 {
        return Err(format!("expected 3 fields, found {}", fields.len()));
    }

    let image_reference = ImageReference::from_stored(&fields[0]).map_err(|e| e.to_string())?;
    let chosen_caption = fields[1].clone();
    if chosen_caption.trim().is_empty() {
        return Err("empty caption".to_string());
    }
    let recorded_at = DateTime::parse_from_rfc3339(fields[2].trim())
        .map_err(|e| format!("invalid timestamp {:?}: {}", fields[2], e))?
        .with_timezone(&Utc);

    Ok(FeedbackRecord {
        image_reference,
        chosen_caption,
        recorded_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(caption: &str) -> FeedbackRecord {
        FeedbackRecord::new(
            ImageReference::from_stored("/tmp/images/i1.jpg").unwrap(),
            caption,
        )
    }

    #[test]
    fn test_plain_caption_is_unquoted() {
        let line = encode_record(&record("a dog running"));
        assert!(line.starts_with("/tmp/images/i1.jpg,a dog running,"));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_caption_with_separator_survives() {
        let original = record("a dog, a cat, and a \"friend\"");
        let line = encode_record(&original);
        assert!(line.contains("\"a dog, a cat, and a \"\"friend\"\"\""));

        let records = logical_lines(&line);
        assert_eq!(records.len(), 1);
        let decoded = decode_record(&records[0].1).unwrap();
        assert_eq!(decoded.chosen_caption, original.chosen_caption);
        assert_eq!(decoded.recorded_at, original.recorded_at);
    }

    #[test]
    fn test_multiline_caption_is_one_logical_record() {
        let first = encode_record(&record("line one\nline two"));
        let second = encode_record(&record("next"));
        let contents = format!("{}{}", first, second);

        let records = logical_lines(&contents);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 1);
        assert_eq!(records[1].0, 3);
        assert_eq!(decode_record(&records[0].1).unwrap().chosen_caption, "line one\nline two");
    }

    #[test]
    fn test_malformed_lines_are_rejected() {
        assert!(decode_record("/tmp/a.jpg,only two").is_err());
        assert!(decode_record("/tmp/a.jpg,\"open,2024-01-01T00:00:00Z").is_err());
        assert!(decode_record("/tmp/a.jpg,a cat,yesterday").is_err());
    }
}
