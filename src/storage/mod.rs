//! Day-sectioned session log.
//!
//! The log is one text file holding a section per calendar day. Every append
//! reads the whole file, drops sections outside the retention window, adds the
//! record under today's heading and writes the file back.

pub mod file;
pub mod markdown;
pub mod plain;
pub mod retention;

use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

use crate::config::{EffectiveConfig, LogFormat};
use crate::error::{Error, Result};
use crate::session::SessionRecord;
use crate::utils::paths::get_log_file_name;
use file::{load_log, save_log};
use markdown::MarkdownLayout;
use plain::PlainLayout;

/// How records and day headings look on disk.
pub trait LogLayout {
    fn day_heading(&self, date: NaiveDate) -> String;

    /// The date of a day heading line, or `None` for any other line.
    fn parse_day_heading(&self, line: &str) -> Option<NaiveDate>;

    fn render_record(&self, record: &SessionRecord) -> String;

    /// Length of the code fence opened by `line`. Lines inside a fence are
    /// never treated as headings.
    fn fence_len(&self, _line: &str) -> Option<usize> {
        None
    }
}

pub fn layout_for(format: LogFormat) -> &'static dyn LogLayout {
    match format {
        LogFormat::Markdown => &MarkdownLayout,
        LogFormat::Plain => &PlainLayout,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySection {
    pub date: NaiveDate,
    /// Everything under the heading, without surrounding blank lines
    pub body: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStore {
    /// Text before the first day heading, kept as-is
    pub preamble: String,
    /// Sorted by date, one per day
    pub sections: Vec<DaySection>,
}

impl LogStore {
    pub fn parse(content: &str, layout: &dyn LogLayout) -> Self {
        let mut preamble: Vec<&str> = Vec::new();
        let mut days: BTreeMap<NaiveDate, Vec<Vec<&str>>> = BTreeMap::new();
        let mut current: Option<NaiveDate> = None;
        let mut open_fence: Option<usize> = None;

        for line in content.lines() {
            match open_fence {
                Some(len) => {
                    if closes_fence(layout, line, len) {
                        open_fence = None;
                    }
                }
                None => {
                    if let Some(date) = layout.parse_day_heading(line) {
                        days.entry(date).or_default().push(Vec::new());
                        current = Some(date);
                        continue;
                    }
                    // fences only count inside a day section
                    if current.is_some() {
                        open_fence = layout.fence_len(line);
                    }
                }
            }

            let block = current
                .and_then(|date| days.get_mut(&date))
                .and_then(|blocks| blocks.last_mut());
            match block {
                Some(block) => block.push(line),
                None => preamble.push(line),
            }
        }

        let sections = days
            .into_iter()
            .map(|(date, blocks)| {
                let body = blocks
                    .iter()
                    .map(|lines| lines.join("\n").trim_matches('\n').to_string())
                    .filter(|block| !block.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n\n");
                DaySection { date, body }
            })
            .collect();

        Self {
            preamble: preamble.join("\n").trim_matches('\n').to_string(),
            sections,
        }
    }

    pub fn serialize(&self, layout: &dyn LogLayout) -> String {
        let mut output = String::new();

        if !self.preamble.is_empty() {
            output.push_str(&self.preamble);
            output.push_str("\n\n");
        }

        for section in &self.sections {
            output.push_str(&layout.day_heading(section.date));
            output.push_str("\n\n");
            if !section.body.is_empty() {
                output.push_str(&section.body);
                output.push_str("\n\n");
            }
        }

        let trimmed = output.trim_end_matches('\n').len();
        output.truncate(trimmed);
        if !output.is_empty() {
            output.push('\n');
        }
        output
    }

    pub fn section(&self, date: NaiveDate) -> Option<&DaySection> {
        self.sections.iter().find(|s| s.date == date)
    }

    /// Add `entry` to the section for `date`, creating it if needed.
    pub fn append_entry(&mut self, date: NaiveDate, entry: &str) {
        let entry = entry.trim_matches('\n');

        if let Some(section) = self.sections.iter_mut().find(|s| s.date == date) {
            if !section.body.is_empty() {
                section.body.push_str("\n\n");
            }
            section.body.push_str(entry);
            return;
        }

        self.sections.push(DaySection {
            date,
            body: entry.to_string(),
        });
        self.sections.sort_by_key(|s| s.date);
    }
}

fn closes_fence(layout: &dyn LogLayout, line: &str, open_len: usize) -> bool {
    let line = line.trim_end();
    line.chars().all(|c| c == '`') && layout.fence_len(line).is_some_and(|len| len >= open_len)
}

/// Appends session records to the log file in `dir`.
#[derive(Debug, Clone)]
pub struct SessionLogger {
    dir: PathBuf,
}

impl SessionLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, format: LogFormat) -> PathBuf {
        self.dir.join(get_log_file_name(format))
    }

    pub fn append(&self, record: &SessionRecord, config: &EffectiveConfig) -> Result<PathBuf> {
        self.append_on(record, config, Local::now().date_naive())
    }

    /// Append with `today` as the current date. Returns the log path.
    pub fn append_on(
        &self,
        record: &SessionRecord,
        config: &EffectiveConfig,
        today: NaiveDate,
    ) -> Result<PathBuf> {
        let path = self.path(config.log_format);
        let layout = layout_for(config.log_format);
        let log_error = |source| Error::LogWrite {
            path: path.clone(),
            source,
        };

        let mut store = load_log(&path, layout).map_err(log_error)?;
        retention::prune(&mut store, today, config.log_retention_days);
        store.append_entry(today, &layout.render_record(record));
        save_log(&path, &store, layout).map_err(log_error)?;

        info!(path = %path.display(), sections = store.sections.len(), "session logged");
        Ok(path)
    }
}
