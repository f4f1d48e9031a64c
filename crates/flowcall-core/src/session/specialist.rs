//! Specialist personas the assistant can route a conversation to.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Specialist {
    Sales,
    Support,
    Operations,
    Technical,
}

impl Specialist {
    fn keywords(self) -> &'static [&'static str] {
        match self {
            Specialist::Sales => &[
                "crm", "lead", "sales", "pipeline", "deal", "customer", "hubspot", "salesforce",
                "pipedrive", "prospect",
            ],
            Specialist::Support => &[
                "ticket",
                "support",
                "helpdesk",
                "zendesk",
                "intercom",
                "customer service",
                "escalate",
                "sla",
            ],
            Specialist::Operations => &[
                "data", "sync", "report", "schedule", "backup", "database", "analytics", "daily",
                "weekly", "monthly",
            ],
            Specialist::Technical => &[
                "api",
                "webhook",
                "http",
                "rest",
                "endpoint",
                "database",
                "postgres",
                "mysql",
                "integration",
                "authentication",
            ],
        }
    }

    /// Picks the specialist whose keywords best match `text`.
    ///
    /// Ties go to the earlier variant; no match at all yields `None`.
    pub fn infer(text: &str) -> Option<Specialist> {
        let text = text.to_lowercase();
        let mut best: Option<(Specialist, usize)> = None;
        for specialist in Specialist::iter() {
            let score = specialist
                .keywords()
                .iter()
                .filter(|kw| text.contains(*kw))
                .count();
            if score > 0 && best.is_none_or(|(_, top)| score > top) {
                best = Some((specialist, score));
            }
        }
        best.map(|(specialist, _)| specialist)
    }

    /// What the assistant says right after switching.
    pub fn greeting(self) -> &'static str {
        match self {
            Specialist::Sales => {
                "Now I'm your sales automation specialist! Let's build a CRM workflow. What CRM do you use?"
            }
            Specialist::Support => {
                "Now I'm your support automation specialist! Let's build a helpdesk workflow. What ticketing system do you use?"
            }
            Specialist::Operations => {
                "Now I'm your operations specialist! Let's build a data workflow. What data sources do you work with?"
            }
            Specialist::Technical => {
                "Now I'm your technical integration specialist! Let's build an API workflow. What services need to be connected?"
            }
        }
    }
}
