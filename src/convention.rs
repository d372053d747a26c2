//! Bantotal key naming convention
//!
//! Composite keys in the Bantotal schema follow a positional layout. Position 1
//! is always the company code `Pgcod`; positions 2..=9 are a two-letter table
//! prefix followed by a fixed segment (`Ppmod`, `Aomod`, `Scmod` all carry the
//! module at position 2). Two tables relate when their columns line up
//! segment by segment, even though each table uses its own prefix.

/// Length of the per-table prefix (`Pp`, `Ao`, `Sc`, ...)
const TABLE_PREFIX_LEN: usize = 2;

/// Segment expected at each key position, with its business meaning
const POSITION_SEGMENTS: [(usize, &str, &str); 8] = [
    (2, "mod", "Module"),
    (3, "suc", "Branch"),
    (4, "mda", "Currency"),
    (5, "pap", "Paper"),
    (6, "cta", "Account"),
    (7, "oper", "Operation"),
    (8, "sbop", "Sub-operation"),
    (9, "tope", "Operation type"),
];

/// Segment the convention assigns to a 1-based key position
pub fn segment_for_position(position: usize) -> Option<&'static str> {
    POSITION_SEGMENTS
        .iter()
        .find(|(pos, _, _)| *pos == position)
        .map(|(_, segment, _)| *segment)
}

/// Segment of `column` at `position`, if the name follows the convention there
pub fn column_segment(column: &str, position: usize) -> Option<&'static str> {
    let segment = segment_for_position(position)?;
    // Prefix length is in characters, as in SQL `substr`
    let (start, _) = column.char_indices().nth(TABLE_PREFIX_LEN)?;
    column[start..].eq_ignore_ascii_case(segment).then_some(segment)
}

/// Whether a candidate column lines up with a key column at the same position
pub fn columns_align(key_column: &str, candidate_column: &str, position: usize) -> bool {
    if key_column.eq_ignore_ascii_case(candidate_column) {
        return true;
    }

    match column_segment(key_column, position) {
        Some(segment) => column_segment(candidate_column, position) == Some(segment),
        None => false,
    }
}

/// Human-readable meaning of a key position
pub fn position_label(position: usize) -> String {
    if position == 1 {
        return "Company code".to_string();
    }

    POSITION_SEGMENTS
        .iter()
        .find(|(pos, _, _)| *pos == position)
        .map(|(_, _, label)| label.to_string())
        .unwrap_or_else(|| format!("Position {}", position))
}
