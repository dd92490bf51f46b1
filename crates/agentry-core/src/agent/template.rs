//! System prompt template variables.
//!
//! A prompt may contain `{{ name }}` placeholders. Only the names listed in
//! [`TemplateContext::lookup`] are substituted; any other placeholder is
//! left in the prompt verbatim.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("Invalid placeholder regex"));

/// Values available to a prompt at the start of a run.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    pub now: DateTime<Utc>,
    pub agent_name: &'a str,
}

impl<'a> TemplateContext<'a> {
    pub fn now(agent_name: &'a str) -> Self {
        Self {
            now: Utc::now(),
            agent_name,
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "current_time" => self.now.format("%H:%M UTC").to_string(),
            "current_date" => self.now.format("%Y-%m-%d").to_string(),
            "current_datetime" => self.now.to_rfc3339_opts(SecondsFormat::Micros, false),
            "current_day_of_week" => self.now.format("%A").to_string(),
            "agent_name" => self.agent_name.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

pub fn resolve_template_variables(template: &str, ctx: &TemplateContext<'_>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            ctx.lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
