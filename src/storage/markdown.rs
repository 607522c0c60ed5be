use chrono::NaiveDate;

use super::LogLayout;
use crate::session::SessionRecord;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Markdown session log: `# YYYY-MM-DD` per day, one `##` block per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownLayout;

impl LogLayout for MarkdownLayout {
    fn day_heading(&self, date: NaiveDate) -> String {
        format!("# {}", date.format(DATE_FORMAT))
    }

    fn parse_day_heading(&self, line: &str) -> Option<NaiveDate> {
        let rest = line.strip_prefix("# ")?;
        NaiveDate::parse_from_str(rest.trim(), DATE_FORMAT).ok()
    }

    fn render_record(&self, record: &SessionRecord) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "## {}\n\n",
            record.timestamp.format(TIMESTAMP_FORMAT)
        ));
        output.push_str(&format!(
            "**System Prompt:**\n{}\n\n",
            fenced(&record.system_prompt)
        ));
        output.push_str(&format!("**User Input:**\n{}\n\n", fenced(&record.user_input)));
        output.push_str(&format!("**Reply:**\n{}\n\n", fenced(&record.reply)));
        output.push_str(&format!("- **Model:** {}\n", record.model));
        output.push_str(&format!("- **Temperature:** {:?}\n", record.temperature));
        output.push_str(&format!(
            "- **Usage:** prompt_tokens: {}, completion_tokens: {}, total_tokens: {}\n",
            record.prompt_tokens, record.completion_tokens, record.total_tokens
        ));
        output.push_str(&format!("- **Response ID:** {}\n\n", record.response_id));
        output.push_str("---\n");

        output
    }

    fn fence_len(&self, line: &str) -> Option<usize> {
        let ticks = line.chars().take_while(|&c| c == '`').count();
        (ticks >= 3).then_some(ticks)
    }
}

/// Wrap `text` in a code fence longer than any backtick run inside it, so
/// the block cannot be closed early.
pub fn fenced(text: &str) -> String {
    let longest_run = text
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_run + 1).max(3));
    format!("{fence}\n{text}\n{fence}")
}
