//! Per-host results and messages collected by a tool run.

use indexmap::IndexMap;
use serde::Serialize;
use strum::{Display, EnumString};

/// Severity of a report message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub level: Level,
    pub text: String,
}

/// Outcome of a tool over one or more hosts.
///
/// Results and messages are keyed by host (or by whatever the tool lists,
/// e.g. workgroup names) and keep insertion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report<T> {
    results: IndexMap<String, T>,
    messages: IndexMap<String, Vec<Message>>,
}

impl<T> Default for Report<T> {
    fn default() -> Self {
        Self {
            results: IndexMap::new(),
            messages: IndexMap::new(),
        }
    }
}

impl<T> Report<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the result for `host`, replacing any earlier one.
    pub fn push_result(&mut self, host: impl Into<String>, result: T) {
        self.results.insert(host.into(), result);
    }

    pub fn get_result(&self, host: &str) -> Option<&T> {
        self.results.get(host)
    }

    pub fn all_results(&self) -> &IndexMap<String, T> {
        &self.results
    }

    pub fn into_results(self) -> IndexMap<String, T> {
        self.results
    }

    pub fn push_message(&mut self, host: impl Into<String>, level: Level, text: impl Into<String>) {
        self.messages.entry(host.into()).or_default().push(Message {
            level,
            text: text.into(),
        });
    }

    /// Messages recorded for `host`, oldest first.
    pub fn messages(&self, host: &str) -> &[Message] {
        self.messages.get(host).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn all_messages(&self) -> &IndexMap<String, Vec<Message>> {
        &self.messages
    }

    /// `(host, message)` pairs at or above `level`.
    pub fn messages_at_least(&self, level: Level) -> impl Iterator<Item = (&str, &Message)> {
        self.messages.iter().flat_map(move |(host, messages)| {
            messages
                .iter()
                .filter(move |m| m.level >= level)
                .map(move |m| (host.as_str(), m))
        })
    }

    pub fn has_errors(&self) -> bool {
        self.messages_at_least(Level::Error).next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty() && self.messages.is_empty()
    }

    /// Fold `other` into this report, host by host.
    pub fn merge(&mut self, other: Self) {
        self.results.extend(other.results);
        for (host, messages) in other.messages {
            self.messages.entry(host).or_default().extend(messages);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn results_keep_insertion_order() {
        let mut report = Report::new();
        report.push_result("fgt2", "v7.2.4".to_owned());
        report.push_result("fgt1", "v7.0.12".to_owned());
        report.push_result("fgt2", "v7.2.5".to_owned());

        let hosts: Vec<_> = report.all_results().keys().map(String::as_str).collect();
        assert_eq!(hosts, ["fgt2", "fgt1"]);
        assert_eq!(report.get_result("fgt2").unwrap(), "v7.2.5");
        assert!(report.get_result("fgt3").is_none());
    }

    #[test]
    fn messages_by_host_and_level() {
        let mut report: Report<()> = Report::new();
        report.push_message("fmg", Level::Info, "task 42 started");
        report.push_message("fmg", Level::Error, "Invalid url");
        report.push_message("fgt1", Level::Warning, "no VDOMs");

        assert_eq!(report.messages("fmg").len(), 2);
        assert!(report.messages("nobody").is_empty());
        assert!(report.has_errors());

        let warnings: Vec<_> = report
            .messages_at_least(Level::Warning)
            .map(|(host, m)| (host, m.text.as_str()))
            .collect();
        assert_eq!(warnings, [("fmg", "Invalid url"), ("fgt1", "no VDOMs")]);
    }

    #[test]
    fn merge_appends_messages() {
        let mut left: Report<u32> = Report::new();
        left.push_result("a", 1);
        left.push_message("a", Level::Info, "first");

        let mut right = Report::new();
        right.push_result("b", 2);
        right.push_message("a", Level::Info, "second");

        left.merge(right);
        assert_eq!(left.all_results().len(), 2);
        let texts: Vec<_> = left.messages("a").iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, ["first", "second"]);
    }

    #[test]
    fn serializes_as_results_and_messages() {
        let mut report = Report::new();
        report.push_result("ems", "v7.0.7".to_owned());
        report.push_message("ems", Level::Warning, "slow");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "results": {"ems": "v7.0.7"},
                "messages": {"ems": [{"level": "warning", "text": "slow"}]},
            })
        );
    }
}
