//! Where engagement data lives in the spreadsheet.
//!
//! Columns are stored 0-based and rendered as spreadsheet letters (`A`, `Z`,
//! `AA`, ...). Rows are 1-based, matching A1 notation.

use std::fmt;

use mailtrack_core::{EventKind, TrackingEvent};

/// A spreadsheet column, 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Column(pub u32);

impl Column {
    /// Parse a column from letters such as `H` or `AE`.
    #[cfg(test)]
    pub fn from_letters(letters: &str) -> Option<Self> {
        if letters.is_empty() {
            return None;
        }
        let mut n: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return None;
            }
            let digit = (c.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
            n = n.checked_mul(26)?.checked_add(digit)?;
        }
        Some(Self(n - 1))
    }

    /// Column letters for A1 notation.
    pub fn letters(self) -> String {
        let mut n = self.0 + 1;
        let mut out = Vec::new();
        while n > 0 {
            let rem = (n - 1) % 26;
            out.push(b'A' + rem as u8);
            n = (n - 1) / 26;
        }
        out.reverse();
        String::from_utf8(out).unwrap_or_default()
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.letters())
    }
}

const fn col(index: u32) -> Column {
    Column(index)
}

/// A single cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    pub column: Column,
    /// 1-based row number.
    pub row: u32,
}

impl CellRef {
    pub fn new(column: Column, row: u32) -> Self {
        Self { column, row }
    }

    /// Render as an A1 range within `tab`, e.g. `SOI_Staging!AE12`.
    pub fn a1(&self, tab: &str) -> String {
        format!("{}!{}{}", quote_tab(tab), self.column, self.row)
    }
}

/// Render a whole-column range, e.g. `SOI_Staging!H:H`.
pub fn column_range(tab: &str, column: Column) -> String {
    format!("{}!{column}:{column}", quote_tab(tab))
}

/// Quote a tab name for A1 notation unless it is a plain identifier.
pub fn quote_tab(tab: &str) -> String {
    let plain = !tab.is_empty()
        && tab.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !tab.starts_with(|c: char| c.is_ascii_digit());
    if plain {
        tab.to_string()
    } else {
        format!("'{}'", tab.replace('\'', "''"))
    }
}

/// One value destined for one cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub cell: CellRef,
    pub value: String,
}

impl CellUpdate {
    pub fn new(cell: CellRef, value: impl Into<String>) -> Self {
        Self {
            cell,
            value: value.into(),
        }
    }
}

/// Column map of the engagement sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetLayout {
    /// Total columns in a row; appended rows are padded to this width.
    pub width: u32,
    pub email: Column,
    pub status: Column,
    pub form: Column,
    pub email_sent: Column,
    pub opened: Column,
    pub first_open_at: Column,
    pub open_count: Column,
    pub clicked: Column,
    pub first_click_at: Column,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            width: 33,
            email: col(7),           // H
            status: col(20),         // U
            form: col(24),           // Y
            email_sent: col(26),     // AA
            opened: col(28),         // AC
            first_open_at: col(29),  // AD
            open_count: col(30),     // AE
            clicked: col(31),        // AF
            first_click_at: col(32), // AG
        }
    }
}

impl SheetLayout {
    /// Status given to rows the tracker creates itself.
    pub const NEW_ROW_STATUS: &'static str = "Pending";
    /// Form label given to rows the tracker creates itself.
    pub const NEW_ROW_FORM: &'static str = "Email Tracking";

    pub fn cell(&self, column: Column, row: u32) -> CellRef {
        CellRef::new(column, row)
    }

    /// A full row for a recipient that is not on the sheet yet.
    ///
    /// Everything is blank except the identity, the bookkeeping columns and
    /// the engagement columns for this one event.
    pub fn first_touch_row(&self, event: &TrackingEvent) -> Vec<String> {
        let mut row = vec![String::new(); self.width as usize];
        let now = event.timestamp();
        let (opened, clicked) = match event.kind {
            EventKind::Open => (true, false),
            EventKind::Click => (false, true),
        };

        let mut set = |column: Column, value: String| {
            if let Some(slot) = row.get_mut(column.index()) {
                *slot = value;
            }
        };

        set(self.email, event.identity.as_str().to_string());
        set(self.status, Self::NEW_ROW_STATUS.to_string());
        set(self.form, Self::NEW_ROW_FORM.to_string());
        set(self.email_sent, "No".to_string());
        set(self.opened, yes_no(opened).to_string());
        set(
            self.first_open_at,
            if opened { now.clone() } else { String::new() },
        );
        set(self.open_count, if opened { "1" } else { "0" }.to_string());
        set(self.clicked, yes_no(clicked).to_string());
        set(
            self.first_click_at,
            if clicked { now } else { String::new() },
        );

        row
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mailtrack_core::{EventMetadata, Identity};

    #[test]
    fn column_letters_round_trip() {
        for (letters, index) in [("A", 0), ("H", 7), ("Z", 25), ("AA", 26), ("AG", 32), ("ZZ", 701)] {
            assert_eq!(Column::from_letters(letters), Some(Column(index)));
            assert_eq!(Column(index).letters(), letters);
        }
        assert_eq!(Column::from_letters("ae"), Some(Column(30)));
        assert_eq!(Column::from_letters(""), None);
        assert_eq!(Column::from_letters("A1"), None);
    }

    #[test]
    fn default_layout_matches_sheet_columns() {
        let layout = SheetLayout::default();
        assert_eq!(layout.email.letters(), "H");
        assert_eq!(layout.status.letters(), "U");
        assert_eq!(layout.form.letters(), "Y");
        assert_eq!(layout.email_sent.letters(), "AA");
        assert_eq!(layout.opened.letters(), "AC");
        assert_eq!(layout.first_open_at.letters(), "AD");
        assert_eq!(layout.open_count.letters(), "AE");
        assert_eq!(layout.clicked.letters(), "AF");
        assert_eq!(layout.first_click_at.letters(), "AG");
    }

    #[test]
    fn a1_quotes_tabs_that_need_it() {
        let cell = CellRef::new(Column(30), 12);
        assert_eq!(cell.a1("SOI_Staging"), "SOI_Staging!AE12");
        assert_eq!(cell.a1("My Tab"), "'My Tab'!AE12");
        assert_eq!(cell.a1("Bob's"), "'Bob''s'!AE12");
        assert_eq!(cell.a1("2026"), "'2026'!AE12");
        assert_eq!(column_range("SOI_Staging", Column(7)), "SOI_Staging!H:H");
    }

    fn event(kind: EventKind) -> TrackingEvent {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        TrackingEvent::at(
            Identity::parse("new@camp.org").unwrap(),
            kind,
            EventMetadata::default(),
            at,
        )
    }

    #[test]
    fn first_touch_row_for_open() {
        let layout = SheetLayout::default();
        let row = layout.first_touch_row(&event(EventKind::Open));
        assert_eq!(row.len(), 33);
        assert_eq!(row[7], "new@camp.org");
        assert_eq!(row[20], "Pending");
        assert_eq!(row[24], "Email Tracking");
        assert_eq!(row[26], "No");
        assert_eq!(row[28], "Yes");
        assert_eq!(row[29], "2026-03-01T12:00:00.000Z");
        assert_eq!(row[30], "1");
        assert_eq!(row[31], "No");
        assert_eq!(row[32], "");
        assert_eq!(row[0], "");
    }

    #[test]
    fn first_touch_row_for_click() {
        let layout = SheetLayout::default();
        let row = layout.first_touch_row(&event(EventKind::Click));
        assert_eq!(row[28], "No");
        assert_eq!(row[29], "");
        assert_eq!(row[30], "0");
        assert_eq!(row[31], "Yes");
        assert_eq!(row[32], "2026-03-01T12:00:00.000Z");
    }
}
