use core::fmt;
use std::borrow::Cow;

use thiserror::Error;

/// Widest grid the store can address (`ZZZ`).
pub const MAX_COLUMNS: u32 = 18_278;

/// Errors that can occur when parsing one side of an A1 reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error)]
pub enum A1ParseError {
    #[error("empty A1 reference")]
    Empty,
    #[error("missing column in A1 reference")]
    MissingColumn,
    #[error("missing row in A1 reference")]
    MissingRow,
    #[error("invalid column in A1 reference")]
    InvalidColumn,
    #[error("invalid row in A1 reference")]
    InvalidRow,
    #[error("trailing characters in A1 reference")]
    TrailingCharacters,
}

/// Errors that can occur when parsing a sheet-qualified A1 range.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RangeParseError {
    #[error("empty A1 range")]
    Empty,
    #[error("unterminated quoted sheet name")]
    UnterminatedSheetName,
    #[error("invalid cell reference in range: {0}")]
    Cell(#[from] A1ParseError),
}

/// Convert a 0-based column index into spreadsheet letters.
///
/// `0 -> "A"`, `25 -> "Z"`, `26 -> "AA"`, `51 -> "AZ"`.
pub fn column_letter(index: u32) -> String {
    // Letters are a 1-based bijective base-26 numeral; we store 0-based internally.
    let mut n = u64::from(index) + 1;
    let mut out = Vec::<char>::new();
    while n > 0 {
        let rem = ((n - 1) % 26) as u8;
        out.push(char::from(b'A' + rem));
        n = (n - 1) / 26;
    }
    out.iter().rev().collect()
}

/// Inverse of [`column_letter`]. Letters are matched case-insensitively.
pub fn column_index(letters: &str) -> Result<u32, A1ParseError> {
    if letters.is_empty() {
        return Err(A1ParseError::MissingColumn);
    }
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return Err(A1ParseError::InvalidColumn);
        }
        let v = u32::from(b.to_ascii_uppercase() - b'A') + 1;
        col = col
            .checked_mul(26)
            .and_then(|c| c.checked_add(v))
            .ok_or(A1ParseError::InvalidColumn)?;
    }
    Ok(col - 1)
}

/// Render a table name as it must appear in front of `!` in a range.
///
/// Plain identifiers are used verbatim; anything else is single-quoted with
/// embedded quotes doubled (`'Q1 Sales'`, `'Bob''s'`).
pub fn quote_table_name(table: &str) -> Cow<'_, str> {
    let mut chars = table.chars();
    let plain = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
                && !looks_like_cell_reference(table)
        }
        None => false,
    };
    if plain {
        Cow::Borrowed(table)
    } else {
        Cow::Owned(format!("'{}'", table.replace('\'', "''")))
    }
}

/// `Table!C:C`
pub fn column_range(table: &str, col: u32) -> String {
    let letter = column_letter(col);
    format!("{}!{letter}:{letter}", quote_table_name(table))
}

/// `Table!5:5`, the whole of a 1-based row regardless of its width.
pub fn whole_row_range(table: &str, row: u32) -> String {
    format!("{}!{row}:{row}", quote_table_name(table))
}

/// `Table!A5:Z5`, a 1-based row from column `A` through `last_col`.
pub fn row_range(table: &str, row: u32, last_col: u32) -> String {
    row_span_range(table, row, row, last_col)
}

/// `Table!A2:Z10`, 1-based rows `first_row..=last_row` from column `A` through `last_col`.
pub fn row_span_range(table: &str, first_row: u32, last_row: u32, last_col: u32) -> String {
    format!(
        "{}!A{first_row}:{}{last_row}",
        quote_table_name(table),
        column_letter(last_col)
    )
}

/// `Table!C5:C5`, a single cell addressed by 0-based column and 1-based row.
pub fn cell_range(table: &str, col: u32, row: u32) -> String {
    let letter = column_letter(col);
    format!("{}!{letter}{row}:{letter}{row}", quote_table_name(table))
}

/// One side of an A1 range. Missing coordinates mean "unbounded".
///
/// Both coordinates are **0-indexed**.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RangeBound {
    pub col: Option<u32>,
    pub row: Option<u32>,
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = self.col {
            f.write_str(&column_letter(col))?;
        }
        if let Some(row) = self.row {
            write!(f, "{}", row + 1)?;
        }
        Ok(())
    }
}

/// A parsed range such as `Users!A2:C`, `'Q1 Sales'!B:B` or `Users!3:3`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SheetRange {
    pub sheet: Option<String>,
    pub start: RangeBound,
    pub end: RangeBound,
}

impl SheetRange {
    pub fn parse(range: &str) -> Result<Self, RangeParseError> {
        let s = range.trim();
        if s.is_empty() {
            return Err(RangeParseError::Empty);
        }

        let (sheet, body) = split_sheet(s)?;
        if body.is_empty() {
            return Err(RangeParseError::Empty);
        }

        let (start, end) = match body.split_once(':') {
            Some((a, b)) => {
                let start = parse_bound(a)?;
                let end = parse_bound(b)?;
                // `A:2` style mixes are meaningless.
                if (start.col.is_none() && end.col.is_some())
                    || (start.row.is_none() && end.row.is_some() && start.col.is_some())
                {
                    return Err(A1ParseError::TrailingCharacters.into());
                }
                (start, end)
            }
            None => {
                let cell = parse_bound(body)?;
                if cell.col.is_none() {
                    return Err(A1ParseError::MissingColumn.into());
                }
                if cell.row.is_none() {
                    return Err(A1ParseError::MissingRow.into());
                }
                (cell, cell)
            }
        };

        let (start, end) = normalize(start, end);
        Ok(Self { sheet, start, end })
    }

    /// First 0-based row covered by the range.
    pub fn first_row(&self) -> u32 {
        self.start.row.unwrap_or(0)
    }

    /// Last 0-based row covered by the range, `None` when open-ended.
    pub fn last_row(&self) -> Option<u32> {
        self.end.row
    }

    /// First 0-based column covered by the range.
    pub fn first_col(&self) -> u32 {
        self.start.col.unwrap_or(0)
    }

    /// Last 0-based column covered by the range, `None` when open-ended.
    pub fn last_col(&self) -> Option<u32> {
        self.end.col
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            write!(f, "{}!", quote_table_name(sheet))?;
        }
        if self.start == self.end && self.start.col.is_some() && self.start.row.is_some() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

fn split_sheet(s: &str) -> Result<(Option<String>, &str), RangeParseError> {
    if let Some(rest) = s.strip_prefix('\'') {
        let mut name = String::new();
        let mut chars = rest.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch != '\'' {
                name.push(ch);
                continue;
            }
            if matches!(chars.peek(), Some((_, '\''))) {
                chars.next();
                name.push('\'');
                continue;
            }
            let after = &rest[idx + 1..];
            return match after.strip_prefix('!') {
                Some(body) => Ok((Some(name), body)),
                None => Err(A1ParseError::TrailingCharacters.into()),
            };
        }
        return Err(RangeParseError::UnterminatedSheetName);
    }

    match s.rsplit_once('!') {
        Some((sheet, body)) => Ok((Some(sheet.to_string()), body)),
        None => Ok((None, s)),
    }
}

fn parse_bound(a1: &str) -> Result<RangeBound, A1ParseError> {
    let s = a1.trim();
    if s.is_empty() {
        return Err(A1ParseError::Empty);
    }

    // Accept optional `$` markers.
    let bytes = s.as_bytes();
    let mut idx = 0usize;
    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let col_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_alphabetic() {
        idx += 1;
    }
    let col_end = idx;
    if bytes.get(idx) == Some(&b'$') {
        idx += 1;
    }
    let row_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx != bytes.len() {
        return Err(A1ParseError::TrailingCharacters);
    }

    let col = if col_end > col_start {
        Some(column_index(&s[col_start..col_end])?)
    } else {
        None
    };
    let row = if idx > row_start {
        let row_1_based: u32 = s[row_start..idx]
            .parse()
            .map_err(|_| A1ParseError::InvalidRow)?;
        if row_1_based == 0 {
            return Err(A1ParseError::InvalidRow);
        }
        Some(row_1_based - 1)
    } else {
        None
    };

    if col.is_none() && row.is_none() {
        return Err(A1ParseError::Empty);
    }
    Ok(RangeBound { col, row })
}

fn looks_like_cell_reference(name: &str) -> bool {
    parse_bound(name).is_ok_and(|b| b.row.is_some() && b.col.is_some_and(|c| c < MAX_COLUMNS))
}

fn normalize(mut start: RangeBound, mut end: RangeBound) -> (RangeBound, RangeBound) {
    if let (Some(a), Some(b)) = (start.col, end.col) {
        start.col = Some(a.min(b));
        end.col = Some(a.max(b));
    }
    if let (Some(a), Some(b)) = (start.row, end.row) {
        start.row = Some(a.min(b));
        end.row = Some(a.max(b));
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(51), "AZ");
        assert_eq!(column_letter(52), "BA");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
        assert_eq!(column_index("bc").unwrap(), 54);
        assert_eq!(column_index(""), Err(A1ParseError::MissingColumn));
        assert_eq!(column_index("A1"), Err(A1ParseError::InvalidColumn));
    }

    #[test]
    fn range_builders() {
        assert_eq!(column_range("Users", 0), "Users!A:A");
        assert_eq!(row_range("Users", 5, 25), "Users!A5:Z5");
        assert_eq!(row_span_range("Users", 2, 10, 25), "Users!A2:Z10");
        assert_eq!(cell_range("Users", 2, 5), "Users!C5:C5");
        assert_eq!(whole_row_range("Users", 1), "Users!1:1");
        assert_eq!(column_range("Q1 Sales", 1), "'Q1 Sales'!B:B");
        assert_eq!(column_range("Bob's", 0), "'Bob''s'!A:A");
        assert_eq!(column_range("A1", 0), "'A1'!A:A");
        assert_eq!(column_range("Sheet1", 0), "Sheet1!A:A");
    }

    #[test]
    fn parse_range_forms() {
        let r = SheetRange::parse("Users!A2:C").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Users"));
        assert_eq!(r.start, RangeBound { col: Some(0), row: Some(1) });
        assert_eq!(r.end, RangeBound { col: Some(2), row: None });

        let whole_col = SheetRange::parse("'Q1 Sales'!B:B").unwrap();
        assert_eq!(whole_col.sheet.as_deref(), Some("Q1 Sales"));
        assert_eq!(whole_col.first_col(), 1);
        assert_eq!(whole_col.last_row(), None);

        let whole_row = SheetRange::parse("Users!3:3").unwrap();
        assert_eq!(whole_row.first_row(), 2);
        assert_eq!(whole_row.last_col(), None);

        let cell = SheetRange::parse("$C$5").unwrap();
        assert_eq!(cell.sheet, None);
        assert_eq!(cell.to_string(), "C5");

        assert!(SheetRange::parse("Users!").is_err());
        assert!(SheetRange::parse("'Users!A1").is_err());
        assert!(SheetRange::parse("Users!A0").is_err());
    }

    #[test]
    fn parse_normalizes_reversed_bounds() {
        let r = SheetRange::parse("Users!C10:A2").unwrap();
        assert_eq!(r.to_string(), "Users!A2:C10");
    }
}
