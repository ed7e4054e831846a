//! Schedule ledger domain library.
//!
//! The ledger is one flat file of semicolon-delimited rows. The modules keep
//! the core pure: every operation takes a table value and returns a new one,
//! and derived views are recomputed from the table rather than cached across
//! mutations.

pub mod core {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use serde::{Deserialize, Serialize};
    use std::path::PathBuf;
    use uuid::Uuid;

    /* ------------------------------- IDs ------------------------------- */

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ScheduleId(pub Uuid);

    impl ScheduleId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct RowId(pub Uuid);

    impl RowId {
        pub fn new() -> Self {
            Self(Uuid::new_v4())
        }
    }

    /* ------------------------------ Aggregate ------------------------------ */

    /// Aggregate root: the whole schedule file held in memory.
    ///
    /// Row order is the only structure the file has; once sorted it is
    /// chronological. The table is the single source of truth: every view is
    /// recomputed from it, never cached across a mutation.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Schedule {
        pub id: ScheduleId,
        /// Filesystem path if the table originates from disk.
        pub path: Option<PathBuf>,
        #[serde(default)]
        pub rows: Vec<RawRow>,
    }

    impl Schedule {
        pub fn new(path: Option<PathBuf>) -> Self {
            Self {
                id: ScheduleId::new(),
                path,
                rows: vec![],
            }
        }

        /// Build a table from file lines; blank lines become blank rows so the
        /// on-disk image survives a load/save cycle untouched.
        pub fn from_lines<'a>(
            path: Option<PathBuf>,
            lines: impl IntoIterator<Item = &'a str>,
        ) -> Self {
            Self {
                id: ScheduleId::new(),
                path,
                rows: lines.into_iter().map(RawRow::new).collect(),
            }
        }
    }

    /// One raw line of the file: `"<timestamp-spec>;<topic>;<professor>;<hall>"`.
    ///
    /// The text is kept verbatim; rows that fail parsing are skipped by views
    /// but never rewritten or dropped from the table itself.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RawRow {
        pub id: RowId,
        pub text: String,
    }

    impl RawRow {
        pub fn new(text: impl Into<String>) -> Self {
            Self {
                id: RowId::new(),
                text: text.into(),
            }
        }

        pub fn is_blank(&self) -> bool {
            self.text.is_empty()
        }

        /// The timestamp sub-field: everything before the first `;`, trimmed.
        pub fn timestamp_field(&self) -> &str {
            self.text.split(';').next().unwrap_or("").trim()
        }
    }

    /* ---------------------------- Value Objects ---------------------------- */

    /// Free-text priority captured from the parentheses of the timestamp
    /// field.
    ///
    /// Matching is exact: case-sensitive and untrimmed, so `" A "` is not `"A"`.
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
    pub struct Priority(pub String);

    impl Priority {
        /// Priorities that book preparation time.
        const TIMED: [&'static str; 3] = ["ABCD", "A", "B"];
        /// Priorities surfaced by the display views.
        const DISPLAYED: [&'static str; 3] = ["ABCD", "B", "ABCDE"];

        pub fn required_minutes(&self) -> u32 {
            if Self::TIMED.contains(&self.0.as_str()) {
                90
            } else {
                0
            }
        }

        pub fn is_displayed(&self) -> bool {
            Self::DISPLAYED.contains(&self.0.as_str())
        }
    }

    impl From<&str> for Priority {
        fn from(s: &str) -> Self {
            Self(s.to_string())
        }
    }

    /// Priority stamped on entries built by the interactive form.
    pub const DEFAULT_FORM_PRIORITY: &str = "ABCDE";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Meridiem {
        Am,
        Pm,
    }

    /// Numeric fields of a `DD-MM-YY HH.MM AM/PM` prefix, exactly as written.
    ///
    /// Values are shape-checked only; `99-99-99` is a perfectly good spec
    /// here. Calendar validity is decided by [`TimestampSpec::key`], the only
    /// consumer that cares.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimestampSpec {
        pub day: u32,
        pub month: u32,
        pub year: u32,
        pub hour: u32,
        pub minute: u32,
        pub meridiem: Meridiem,
    }

    impl TimestampSpec {
        /// 12-hour to 24-hour: 12 AM is midnight, 12 PM stays noon, other PM
        /// hours gain twelve. A written hour of 13+ with PM overflows past 23
        /// and collapses to the sentinel in [`TimestampSpec::key`].
        pub fn hour24(&self) -> u32 {
            match self.meridiem {
                Meridiem::Pm if self.hour != 12 => self.hour + 12,
                Meridiem::Am if self.hour == 12 => 0,
                _ => self.hour,
            }
        }

        /// Resolve to an ordering key. Two-digit years live in 2000–2099.
        /// Impossible calendar values produce the sentinel key instead of an
        /// error so the row still participates in ordering.
        pub fn key(&self) -> TimestampKey {
            let date = NaiveDate::from_ymd_opt(2000 + self.year as i32, self.month, self.day);
            let time = NaiveTime::from_hms_opt(self.hour24(), self.minute, 0);
            match (date, time) {
                (Some(date), Some(time)) => TimestampKey::At(NaiveDateTime::new(date, time)),
                _ => TimestampKey::Sentinel,
            }
        }
    }

    /// Ordering key for a row. `Sentinel` stands for 1900-01-01 00:00 and
    /// orders before every representable schedule instant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub enum TimestampKey {
        Sentinel,
        At(NaiveDateTime),
    }

    /* ------------------------------ Projection ------------------------------ */

    /// Read-only record derived from one raw row.
    ///
    /// `date` and `time` are the matched slices of the original text, not
    /// normalized values, so the view shows exactly what the file says.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct EntryRecord {
        pub date: String,
        pub time: String,
        pub required_minutes: u32,
        pub priority: Priority,
        pub topic: String,
        pub professor: String,
        pub hall: String,
    }

    /* ---------------------------- Errors (domain) ---------------------------- */

    /// Why a row was excluded from the parsed view. The table-level view still
    /// skips silently; this exists so callers that want stricter behavior can
    /// tell the cases apart.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    pub enum RowError {
        #[error("row has an empty first field")]
        BlankRow,
        #[error("row has {found} fields, at least 4 are required")]
        TooFewFields { found: usize },
        #[error("first field does not match `DD-MM-YY HH.MM AM/PM (PRIORITY)`")]
        MalformedTimestamp,
    }

}

pub mod parser {
    //! Row grammar built on `nom`.
    //!
    //! The grammar is a prefix match: trailing text after the priority
    //! parentheses is legal and ignored. Shape and calendar validity are
    //! separate questions; [`parse_record`] answers only the first,
    //! [`timestamp_key`] both.

    use crate::core::{
        EntryRecord, Meridiem, Priority, RowError, Schedule, TimestampKey, TimestampSpec,
    };
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::{tag, take_while1, take_while_m_n},
        character::complete::{char, multispace1},
        combinator::{consumed, map_res, value},
        error::VerboseError,
        sequence::{delimited, tuple},
    };

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    /// Matched slices of a full timestamp spec, borrowed from the row text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpecCapture<'a> {
        pub date: &'a str,
        pub time: &'a str,
        pub priority: &'a str,
    }

    /* --------------------------- Grammar pieces --------------------------- */

    fn two_digit(i: &str) -> PResult<'_, u32> {
        map_res(
            take_while_m_n(2, 2, |c: char| c.is_ascii_digit()),
            |s: &str| s.parse::<u32>(),
        )(i)
    }

    fn meridiem(i: &str) -> PResult<'_, Meridiem> {
        alt((
            value(Meridiem::Am, tag("AM")),
            value(Meridiem::Pm, tag("PM")),
        ))(i)
    }

    fn date_parts(i: &str) -> PResult<'_, (u32, u32, u32)> {
        let (i, (day, _, month, _, year)) =
            tuple((two_digit, char('-'), two_digit, char('-'), two_digit))(i)?;
        Ok((i, (day, month, year)))
    }

    fn clock_parts(i: &str) -> PResult<'_, (u32, u32, Meridiem)> {
        let (i, (hour, _, minute, _, meridiem)) =
            tuple((two_digit, char('.'), two_digit, multispace1, meridiem))(i)?;
        Ok((i, (hour, minute, meridiem)))
    }

    /// `DD-MM-YY HH.MM AM/PM` prefix, returning both the numeric fields and
    /// the exact input slices (spacing inside the time is preserved).
    fn timestamp_prefix(i: &str) -> PResult<'_, (TimestampSpec, (&str, &str))> {
        let (i, (date_text, (day, month, year))) = consumed(date_parts)(i)?;
        let (i, _) = multispace1(i)?;
        let (i, (time_text, (hour, minute, meridiem))) = consumed(clock_parts)(i)?;
        let spec = TimestampSpec {
            day,
            month,
            year,
            hour,
            minute,
            meridiem,
        };
        Ok((i, (spec, (date_text, time_text))))
    }

    /// Full spec including the parenthesized priority. The priority is free
    /// text up to the closing parenthesis; nothing after it is inspected.
    pub fn parse_timestamp_spec(i: &str) -> PResult<'_, (TimestampSpec, SpecCapture<'_>)> {
        let (i, (spec, (date, time))) = timestamp_prefix(i)?;
        let (i, _) = multispace1(i)?;
        let (i, priority) = delimited(char('('), take_while1(|c| c != ')'), char(')'))(i)?;
        Ok((
            i,
            (
                spec,
                SpecCapture {
                    date,
                    time,
                    priority,
                },
            ),
        ))
    }

    /* ------------------------ Public entry points ------------------------ */

    /// Ordering key of a timestamp field.
    ///
    /// `None` means the text does not even have the date/time shape; such
    /// rows are dropped by the sorter and left out of insertion arithmetic.
    /// A shape match with impossible calendar values yields the sentinel key.
    pub fn timestamp_key(first_field: &str) -> Option<TimestampKey> {
        match timestamp_prefix(first_field) {
            Ok((_, (spec, _))) => Some(spec.key()),
            Err(_) => None,
        }
    }

    /// Parse one raw row into a record, reporting why it is excluded if not.
    pub fn parse_record(text: &str) -> Result<EntryRecord, RowError> {
        if text.is_empty() {
            return Err(RowError::BlankRow);
        }
        let parts: Vec<&str> = text.split(';').collect();
        if parts.len() < 4 {
            return Err(RowError::TooFewFields { found: parts.len() });
        }
        let (_, (_, capture)) =
            parse_timestamp_spec(parts[0].trim()).map_err(|_| RowError::MalformedTimestamp)?;
        let priority = Priority::from(capture.priority);
        Ok(EntryRecord {
            date: capture.date.to_string(),
            time: capture.time.to_string(),
            required_minutes: priority.required_minutes(),
            priority,
            topic: parts.get(1).map(|s| s.trim().to_string()).unwrap_or_default(),
            professor: parts.get(2).map(|s| s.trim().to_string()).unwrap_or_default(),
            hall: parts.get(3).map(|s| s.trim().to_string()).unwrap_or_default(),
        })
    }

    /// The parsed view of a table: malformed rows are skipped, never dropped
    /// from the table itself.
    pub fn parse_records(schedule: &Schedule) -> Vec<EntryRecord> {
        schedule
            .rows
            .iter()
            .filter_map(|row| parse_record(&row.text).ok())
            .collect()
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core::RawRow;

        #[test]
        fn parses_full_lecture_row() {
            let record =
                parse_record("15-08-25 02.45 PM (ABCD);MSTBJ24-4;Indrajit Mukherjee;LC2/L.H. 16")
                    .expect("record");
            assert_eq!(record.date, "15-08-25");
            assert_eq!(record.time, "02.45 PM");
            assert_eq!(record.required_minutes, 90);
            assert_eq!(record.priority, Priority::from("ABCD"));
            assert_eq!(record.topic, "MSTBJ24-4");
            assert_eq!(record.professor, "Indrajit Mukherjee");
            assert_eq!(record.hall, "LC2/L.H. 16");
        }

        #[test]
        fn two_field_row_yields_no_record() {
            assert_eq!(parse_record("X;Y"), Err(RowError::TooFewFields { found: 2 }));
        }

        #[test]
        fn blank_row_yields_no_record() {
            assert_eq!(parse_record(""), Err(RowError::BlankRow));
        }

        #[test]
        fn malformed_timestamp_yields_no_record() {
            assert_eq!(
                parse_record("not a date;topic;prof;hall"),
                Err(RowError::MalformedTimestamp)
            );
            // Lowercase meridiem is not in the grammar.
            assert_eq!(
                parse_record("15-08-25 02.45 pm (A);t;;"),
                Err(RowError::MalformedTimestamp)
            );
        }

        #[test]
        fn trailing_text_after_priority_is_ignored() {
            let record = parse_record("15-08-25 02.45 PM (A) extra;topic;;").expect("record");
            assert_eq!(record.priority, Priority::from("A"));
            assert_eq!(record.topic, "topic");
        }

        #[test]
        fn calendar_validity_is_not_checked() {
            // The parsed view shows what the file says, impossible or not.
            let record = parse_record("99-99-99 13.00 AM (X);a;b;c").expect("record");
            assert_eq!(record.date, "99-99-99");
            assert_eq!(record.required_minutes, 0);
        }

        #[test]
        fn captured_time_keeps_original_spacing() {
            let record = parse_record("15-08-25 02.45  PM (A);t;;").expect("record");
            assert_eq!(record.time, "02.45  PM");
        }

        #[test]
        fn key_distinguishes_shape_from_validity() {
            assert_eq!(timestamp_key("garbage"), None);
            assert_eq!(
                timestamp_key("32-13-25 09.00 AM"),
                Some(TimestampKey::Sentinel)
            );
            assert!(matches!(
                timestamp_key("20-01-25 09.00 AM"),
                Some(TimestampKey::At(_))
            ));
            // The key does not need the priority suffix.
            assert!(matches!(
                timestamp_key("20-01-25 09.00 AM (B) whatever"),
                Some(TimestampKey::At(_))
            ));
        }

        #[test]
        fn records_view_skips_bad_rows() {
            let schedule = Schedule {
                rows: vec![
                    RawRow::new("10-05-25 09.00 AM (A);T1;;"),
                    RawRow::new(""),
                    RawRow::new("X;Y"),
                    RawRow::new("10-05-25 05.00 PM (B);T2;;"),
                ],
                ..Schedule::new(None)
            };
            let records = parse_records(&schedule);
            assert_eq!(records.len(), 2);
            assert_eq!(records[0].topic, "T1");
            assert_eq!(records[1].topic, "T2");
            // The table itself still holds every row.
            assert_eq!(schedule.rows.len(), 4);
        }
    }
}

pub mod table {
    //! Chronological ordering over the raw table.
    //!
    //! Both operations are value-in/value-out: callers hold the only table
    //! and thread it through explicitly.

    use crate::core::{RawRow, Schedule, TimestampKey};
    use crate::parser;

    /// Order the table by timestamp key.
    ///
    /// Blank rows and rows whose first field lacks the date/time shape are
    /// dropped here (unlike the parsed view, which keeps them in the table).
    /// Shape matches with impossible values sort first via the sentinel key.
    /// The sort is stable, so rows sharing a key keep their relative order.
    pub fn sort_by_datetime(schedule: Schedule) -> Schedule {
        let Schedule { id, path, rows } = schedule;
        let mut keyed = Vec::with_capacity(rows.len());
        for row in rows {
            if row.is_blank() {
                continue;
            }
            let Some(key) = parser::timestamp_key(row.timestamp_field()) else {
                continue;
            };
            keyed.push((key, row));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        Schedule {
            id,
            path,
            rows: keyed.into_iter().map(|(_, row)| row).collect(),
        }
    }

    /// Insert one row at its chronological position.
    ///
    /// The scan tracks a candidate index that only moves when a row compares
    /// "not later" or carries a sentinel key. Blank rows and shapeless rows
    /// never advance it, so an early stop can land the new row before them.
    /// Equal keys advance the candidate, which appends after all ties.
    pub fn insert_sorted(schedule: Schedule, entry: RawRow) -> Schedule {
        let Schedule { id, path, mut rows } = schedule;
        if rows.is_empty() {
            rows.push(entry);
            return Schedule { id, path, rows };
        }

        let new_key = match parser::timestamp_key(entry.timestamp_field()) {
            Some(TimestampKey::At(at)) => at,
            // Shape mismatches and impossible calendar values both fall back
            // to appending at the end; no positional insert is attempted.
            _ => {
                rows.push(entry);
                return Schedule { id, path, rows };
            }
        };

        let mut at = 0;
        for (i, row) in rows.iter().enumerate() {
            if row.is_blank() {
                continue;
            }
            match parser::timestamp_key(row.timestamp_field()) {
                None => {}
                Some(TimestampKey::Sentinel) => at = i + 1,
                Some(TimestampKey::At(existing)) => {
                    if new_key < existing {
                        break;
                    }
                    at = i + 1;
                }
            }
        }
        rows.insert(at, entry);
        Schedule { id, path, rows }
    }

    /// Normalize one line of legacy free-text input: tabs become the field
    /// delimiter and short lines are padded with empty trailing fields until
    /// the split yields four. Blank lines are not entries.
    pub fn normalize_legacy_line(line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let mut line = line.replace('\t', ";");
        let parts = line.split(';').count();
        if parts < 4 {
            line.push_str(&";".repeat(4 - parts));
        }
        Some(line)
    }

}

pub mod storage {
    //! Whole-file persistence: one read on load, one rewrite on save.
    //!
    //! The rewrite is a plain `fs::write` with no temp-file/rename step, the
    //! same contract the file's other writers expect.

    use crate::core::Schedule;
    use crate::format::format_schedule;
    use std::{fs, io, path::Path};

    #[derive(Debug, thiserror::Error)]
    pub enum StoreError {
        #[error("schedule file {path} not found")]
        NotFound { path: String },
        #[error("reading schedule file {path}")]
        Read {
            path: String,
            #[source]
            source: io::Error,
        },
        #[error("writing schedule file {path}")]
        Write {
            path: String,
            #[source]
            source: io::Error,
        },
    }

    /// Persistence seam so the application layer does not care where the
    /// table bytes live.
    pub trait ScheduleStore {
        fn load(&self, path: &Path) -> Result<Schedule, StoreError>;
        fn save(&self, path: &Path, schedule: &Schedule) -> Result<(), StoreError>;
    }

    pub struct FsScheduleStore;

    impl ScheduleStore for FsScheduleStore {
        fn load(&self, path: &Path) -> Result<Schedule, StoreError> {
            let text = fs::read_to_string(path).map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    StoreError::NotFound {
                        path: path.display().to_string(),
                    }
                } else {
                    StoreError::Read {
                        path: path.display().to_string(),
                        source,
                    }
                }
            })?;
            Ok(Schedule::from_lines(Some(path.to_path_buf()), text.lines()))
        }

        fn save(&self, path: &Path, schedule: &Schedule) -> Result<(), StoreError> {
            fs::write(path, format_schedule(schedule)).map_err(|source| StoreError::Write {
                path: path.display().to_string(),
                source,
            })
        }
    }

}

pub mod format {
    //! Render the table back to its file image and build form entries.

    use crate::core::Schedule;

    /// The whole-file image: one line per row, trailing newline, empty table
    /// renders as the empty string.
    pub fn format_schedule(schedule: &Schedule) -> String {
        let mut out = String::new();
        for row in &schedule.rows {
            out.push_str(&row.text);
            out.push('\n');
        }
        out
    }

    /// Assemble one row in the file grammar.
    pub fn format_entry(
        date: &str,
        time: &str,
        priority: &str,
        topic: &str,
        professor: &str,
        hall: &str,
    ) -> String {
        format!("{date} {time} ({priority});{topic};{professor};{hall}")
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core::{RawRow, Schedule};

        #[test]
        fn file_image_has_one_line_per_row() {
            let schedule = Schedule {
                rows: vec![
                    RawRow::new("a;b;c;d"),
                    RawRow::new(""),
                    RawRow::new("e;f;g;h"),
                ],
                ..Schedule::new(None)
            };
            assert_eq!(format_schedule(&schedule), "a;b;c;d\n\ne;f;g;h\n");
        }

        #[test]
        fn empty_table_renders_empty() {
            assert_eq!(format_schedule(&Schedule::new(None)), "");
        }

        #[test]
        fn form_entry_layout() {
            assert_eq!(
                format_entry("10-05-25", "09.00 AM", "ABCDE", "Gym", "", ""),
                "10-05-25 09.00 AM (ABCDE);Gym;;"
            );
        }
    }
}

pub mod projectors {
    pub mod upcoming_projector {
        //! The near-term view: high-priority entries dated today or tomorrow.
        //!
        //! Date matching is string equality on the `%d-%m-%y` rendering of
        //! the local calendar day, with no timezone handling anywhere.

        use crate::core::EntryRecord;
        use chrono::{Days, NaiveDate};

        #[derive(Debug, Clone, Copy, Default)]
        pub struct ProjectOptions {
            /// Keep every date instead of only today/tomorrow.
            pub all_dates: bool,
        }

        /// Render a date the way the file writes them.
        pub fn date_tag(date: NaiveDate) -> String {
            date.format("%d-%m-%y").to_string()
        }

        /// Project the display records. `today` is an explicit argument so the
        /// projection stays a pure function of its inputs.
        pub fn project(
            records: &[EntryRecord],
            today: NaiveDate,
            opts: ProjectOptions,
        ) -> Vec<EntryRecord> {
            let today_tag = date_tag(today);
            let tomorrow_tag = date_tag(today + Days::new(1));
            records
                .iter()
                .filter(|r| r.priority.is_displayed())
                .filter(|r| opts.all_dates || r.date == today_tag || r.date == tomorrow_tag)
                .cloned()
                .collect()
        }

    }

    pub mod summary_projector {
        //! Headline numbers for a set of display records.

        use crate::core::EntryRecord;
        use indexmap::IndexMap;
        use serde::Serialize;

        #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
        pub struct Summary {
            pub total: usize,
            pub unique_topics: usize,
            /// Per-topic counts in first-seen order; empty topics are not counted.
            pub by_topic: IndexMap<String, usize>,
        }

        pub fn summarize(records: &[EntryRecord]) -> Summary {
            let mut by_topic: IndexMap<String, usize> = IndexMap::new();
            for record in records {
                if record.topic.is_empty() {
                    continue;
                }
                *by_topic.entry(record.topic.clone()).or_insert(0) += 1;
            }
            Summary {
                total: records.len(),
                unique_topics: by_topic.len(),
                by_topic,
            }
        }

    }
}

pub use parser::{parse_record, parse_records};
pub use table::{insert_sorted, sort_by_datetime};
