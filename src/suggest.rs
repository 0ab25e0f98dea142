use crate::admin::{PickupStop, Suggestion};
use crate::config::SuggestConfig;
use crate::model::Weekday;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SuggestError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Which bus run the suggestions are for.
#[derive(Debug, Clone, Copy)]
pub struct RouteQuery<'a> {
    pub day: Weekday,
    pub class_time: &'a str,
    pub bus: &'a str,
}

/// Advisory pickup-time service. An empty list means "no suggestions".
pub trait SuggestionGateway: Send {
    fn suggest(
        &self,
        query: RouteQuery<'_>,
        stops: &[PickupStop],
    ) -> Result<Vec<Suggestion>, SuggestError>;
}

pub struct NoSuggestions;

impl SuggestionGateway for NoSuggestions {
    fn suggest(
        &self,
        _query: RouteQuery<'_>,
        _stops: &[PickupStop],
    ) -> Result<Vec<Suggestion>, SuggestError> {
        Ok(Vec::new())
    }
}

pub struct HttpSuggestions {
    client: reqwest::blocking::Client,
    url: String,
}

impl HttpSuggestions {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(HttpSuggestions {
            client,
            url: url.to_string(),
        })
    }
}

impl SuggestionGateway for HttpSuggestions {
    fn suggest(
        &self,
        query: RouteQuery<'_>,
        stops: &[PickupStop],
    ) -> Result<Vec<Suggestion>, SuggestError> {
        let body = json!({
            "prompt": build_prompt(query, stops),
            "students": stops,
        });
        let text = self
            .client
            .post(&self.url)
            .json(&body)
            .send()?
            .error_for_status()?
            .text()?;
        Ok(parse_suggestions(&text))
    }
}

pub fn gateway_for(cfg: &SuggestConfig) -> anyhow::Result<Box<dyn SuggestionGateway>> {
    Ok(match cfg.endpoint_url.as_deref() {
        Some(url) => Box::new(HttpSuggestions::new(url)?),
        None => Box::new(NoSuggestions),
    })
}

pub fn build_prompt(query: RouteQuery<'_>, stops: &[PickupStop]) -> String {
    let students = serde_json::to_string(stops).unwrap_or_else(|_| "[]".to_string());
    format!(
        "I have a list of students taking the {bus} shuttle for a class starting at {class} on {day}.\n\
         Please suggest a logical pickup order and specific pickup times (HH:mm format) for this bus route.\n\
         Assume the bus needs to arrive at the academy by {class}.\n\
         Assume stops take about 5-10 minutes between each other.\n\
         Return a JSON array containing the student ID and the new suggested pickup time, \
         as objects with fields studentId and suggestedPickupTime.\n\n\
         Students: {students}",
        bus = query.bus,
        class = query.class_time,
        day = query.day.label(),
        students = students,
    )
}

/// Reads the first JSON array out of a reply that may wrap it in prose or a
/// code fence. Anything unreadable yields no suggestions.
pub fn parse_suggestions(text: &str) -> Vec<Suggestion> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    serde_json::from_str::<Vec<Suggestion>>(&text[start..=end]).unwrap_or_default()
}
