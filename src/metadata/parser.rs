//! Line parser for the metadata source output
//!
//! Lines of interest look like `Title: "One More Time"` or
//! `Artist: "Daft Punk"`; everything else is ignored.

use crate::state::TrackField;

const LABELS: [(&str, TrackField); 2] =
    [("Title:", TrackField::Title), ("Artist:", TrackField::Artist)];

/// Extract one field update from a line of metadata output.
///
/// The value is the text between the first pair of double quotes after the
/// label. Lines without a label, and labelled lines without a quoted value,
/// produce no update.
pub fn parse_line(line: &str) -> Option<(TrackField, String)> {
    for (label, field) in LABELS {
        if let Some(idx) = line.find(label) {
            let rest = &line[idx + label.len()..];
            return quoted_value(rest).map(|value| (field, value));
        }
    }
    None
}

fn quoted_value(text: &str) -> Option<String> {
    let open = text.find('"')?;
    let rest = &text[open + 1..];
    let close = rest.find('"')?;
    Some(rest[..close].to_string())
}
