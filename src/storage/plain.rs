use chrono::NaiveDate;

use super::LogLayout;
use crate::session::SessionRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";
const INDENT: &str = "    ";

/// Plain-text session log. Content lines are indented so they can never be
/// read back as a day heading.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainLayout;

impl LogLayout for PlainLayout {
    fn day_heading(&self, date: NaiveDate) -> String {
        format!("=== {} ===", date.format(DATE_FORMAT))
    }

    fn parse_day_heading(&self, line: &str) -> Option<NaiveDate> {
        let inner = line.strip_prefix("=== ")?.strip_suffix(" ===")?;
        NaiveDate::parse_from_str(inner, DATE_FORMAT).ok()
    }

    fn render_record(&self, record: &SessionRecord) -> String {
        let mut output = format!(
            "[{}] model={} temperature={:?} tokens={}/{}/{} id={}\n",
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.model,
            record.temperature,
            record.prompt_tokens,
            record.completion_tokens,
            record.total_tokens,
            record.response_id
        );

        for (label, text) in [
            ("system", &record.system_prompt),
            ("input", &record.user_input),
            ("reply", &record.reply),
        ] {
            output.push_str(label);
            output.push_str(":\n");
            output.push_str(&indent(text));
        }
        output.push_str("----\n");

        output
    }
}

fn indent(text: &str) -> String {
    text.lines().map(|line| format!("{INDENT}{line}\n")).collect()
}
