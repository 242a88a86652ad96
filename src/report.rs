use rust_xlsxwriter::{Format, Workbook, Worksheet};
use serde::{Deserialize, Serialize};

use crate::client::LeaderboardEntry;
use crate::error::Result;

/// Which optional leaderboard columns go into a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportColumns {
    /// Append a `Time Taken` column rendered by [`format_elapsed_time`]
    pub include_time: bool,
}

impl Default for ReportColumns {
    fn default() -> Self {
        ReportColumns { include_time: true }
    }
}

/// A single spreadsheet cell
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
}

/// A leaderboard laid out as a header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

/// Render an elapsed time as `H : M : S`, or `M : S` under an hour
///
/// No zero padding is applied.
///
/// # Examples
/// ```
/// use leaderboard_export::report::format_elapsed_time;
///
/// assert_eq!(format_elapsed_time(59), "0 : 59");
/// assert_eq!(format_elapsed_time(3661), "1 : 0 : 1");
/// ```
pub fn format_elapsed_time(seconds: u64) -> String {
    if seconds >= 3600 {
        let hours = seconds / 3600;
        let remaining = seconds % 3600;
        format!("{} : {} : {}", hours, remaining / 60, remaining % 60)
    } else {
        format!("{} : {}", seconds / 60, seconds % 60)
    }
}

/// Lay out entries as a report, one row per entry in the order given
///
/// The full export mirrors the API's pagination order; callers sort first
/// when they need ranking order.
pub fn build_report(entries: &[LeaderboardEntry], columns: ReportColumns) -> Report {
    let mut headers = vec!["Rank", "Username", "Score"];
    if columns.include_time {
        headers.push("Time Taken");
    }

    let rows = entries
        .iter()
        .map(|entry| {
            let mut row = vec![
                Cell::Number(f64::from(entry.rank)),
                Cell::Text(entry.hacker.clone()),
                Cell::Number(entry.score),
            ];
            if columns.include_time {
                row.push(Cell::Text(format_elapsed_time(entry.time_taken)));
            }
            row
        })
        .collect();

    Report { headers, rows }
}

/// The `n` best-ranked entries, lowest rank first
///
/// The sort is stable, so entries sharing a rank keep their input order.
pub fn select_top_n(entries: &[LeaderboardEntry], n: usize) -> Vec<LeaderboardEntry> {
    let mut sorted = entries.to_vec();
    sorted.sort_by_key(|entry| entry.rank);
    sorted.truncate(n);
    sorted
}

impl Report {
    /// Header row plus data rows
    #[cfg(test)]
    pub fn row_count(&self) -> usize {
        self.rows.len() + 1
    }

    /// Serialize the report as an XLSX workbook with a single sheet
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let mut worksheet = Worksheet::new();
        let bold = Format::new().set_bold();

        for (c, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, c as u16, *header, &bold)?;
        }

        for (r, row) in self.rows.iter().enumerate() {
            let r = (r + 1) as u32;
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Number(n) => worksheet.write_number(r, c as u16, *n)?,
                    Cell::Text(s) => worksheet.write_string(r, c as u16, s)?,
                };
            }
        }

        workbook.push_worksheet(worksheet);
        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(rank: u32, hacker: &str, time_taken: u64) -> LeaderboardEntry {
        LeaderboardEntry {
            rank,
            hacker: hacker.to_string(),
            score: 100.0 - rank as f64,
            time_taken,
        }
    }

    #[test]
    fn elapsed_time_formats() {
        assert_eq!(format_elapsed_time(0), "0 : 0");
        assert_eq!(format_elapsed_time(59), "0 : 59");
        assert_eq!(format_elapsed_time(60), "1 : 0");
        assert_eq!(format_elapsed_time(3599), "59 : 59");
        assert_eq!(format_elapsed_time(3600), "1 : 0 : 0");
        assert_eq!(format_elapsed_time(3661), "1 : 0 : 1");
        assert_eq!(format_elapsed_time(90061), "25 : 1 : 1");
    }

    #[test]
    fn top_n_sorts_by_rank() {
        let entries: Vec<_> = [5, 1, 3, 2, 4]
            .iter()
            .map(|&r| entry(r, &format!("user{}", r), 0))
            .collect();

        let ranks: Vec<u32> = select_top_n(&entries, 3).iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn top_n_keeps_tie_order_and_short_inputs() {
        let entries = vec![entry(2, "b", 0), entry(1, "x", 0), entry(1, "y", 0)];
        let names: Vec<String> = select_top_n(&entries, 3)
            .into_iter()
            .map(|e| e.hacker)
            .collect();
        assert_eq!(names, vec!["x", "y", "b"]);

        assert_eq!(select_top_n(&entries[..1], 3).len(), 1);
        assert!(select_top_n(&[], 3).is_empty());
    }

    #[test]
    fn report_columns_follow_option() {
        let entries = vec![entry(2, "bob", 3661), entry(1, "ada", 59)];

        let report = build_report(&entries, ReportColumns { include_time: true });
        assert_eq!(report.headers, vec!["Rank", "Username", "Score", "Time Taken"]);
        assert_eq!(report.row_count(), 3);
        // input order is preserved
        assert_eq!(report.rows[0][1], Cell::Text("bob".to_string()));
        assert_eq!(report.rows[0][3], Cell::Text("1 : 0 : 1".to_string()));

        let report = build_report(&entries, ReportColumns { include_time: false });
        assert_eq!(report.headers, vec!["Rank", "Username", "Score"]);
        assert!(report.rows.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn xlsx_reads_back_with_every_row() {
        use calamine::{Data, Reader, Xlsx, open_workbook};

        let mut entries: Vec<_> = (2..=25).map(|r| entry(r, "someone", r as u64 * 61)).collect();
        entries.insert(0, entry(1, "ada", 3661));
        let report = build_report(&entries, ReportColumns::default());
        assert_eq!(report.row_count(), 26);

        let tmp = tempfile::tempdir().unwrap();
        let bytes = report.to_xlsx().unwrap();
        let path = crate::files::write_report(&bytes, tmp.path(), "cup.xlsx").unwrap();

        let mut workbook: Xlsx<_> = open_workbook(&path).unwrap();
        let names = workbook.sheet_names();
        assert_eq!(names.len(), 1);
        let range = workbook.worksheet_range(&names[0]).unwrap();
        assert_eq!(range.height(), 26);

        let mut rows = range.rows();
        let header: Vec<String> = rows.next().unwrap().iter().map(|c| c.to_string()).collect();
        assert_eq!(header, vec!["Rank", "Username", "Score", "Time Taken"]);

        let first = rows.next().unwrap();
        assert_eq!(first[0], Data::Float(1.0));
        assert_eq!(first[1], Data::String("ada".to_string()));
        assert_eq!(first[2], Data::Float(99.0));
        assert_eq!(first[3], Data::String("1 : 1 : 1".to_string()));
    }

    #[test]
    fn xlsx_without_time_has_three_columns() {
        use calamine::{Reader, Xlsx};
        use std::io::Cursor;

        let report = build_report(&[entry(1, "ada", 5)], ReportColumns { include_time: false });
        let bytes = report.to_xlsx().unwrap();

        let mut workbook = Xlsx::new(Cursor::new(bytes)).unwrap();
        let names = workbook.sheet_names();
        let range = workbook.worksheet_range(&names[0]).unwrap();
        assert_eq!(range.get_size(), (2, 3));
    }
}
