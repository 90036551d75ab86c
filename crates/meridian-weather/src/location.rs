//! Location extraction from free-form weather questions.

use std::sync::LazyLock;

use meridian_llm::{LlmProvider, Message};
use regex::Regex;
use serde::Deserialize;

use crate::types::{Units, WeatherQuery};

const LOCATION_PROMPT: &str = "Extract the location from the user's weather question. \
Reply with JSON only, in the form {\"city\": \"<city>\", \"state\": \"<state or region>\"}. \
Use null for anything not mentioned. If only a state or region is named, use its capital \
as the city.";

static UNITS_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:in|using)\s+(?:degrees\s+)?(?:celsius|fahrenheit|kelvin|metric|imperial)\b")
        .expect("units phrase regex is valid")
});

static IN_PLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:in|at|for)\s+([a-z][a-z .'-]*?)(?:\s*,\s*([a-z][a-z .'-]*?))?\s*(?:[?!.;]|$|\b(?:today|tomorrow|tonight|now|right now|please|this week)\b)",
    )
    .expect("location regex is valid")
});

#[derive(Deserialize)]
struct LocationReply {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

/// Parse the model's JSON reply, tolerating code fences and surrounding prose.
#[must_use]
pub fn parse_location_reply(reply: &str) -> Option<(String, Option<String>)> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    let parsed: LocationReply = serde_json::from_str(&reply[start..=end]).ok()?;
    let city = non_blank(parsed.city)?;
    Some((city, non_blank(parsed.state)))
}

/// Heuristic `in <place>[, <region>]` match used when the model gives nothing usable.
#[must_use]
pub fn location_from_text(question: &str) -> Option<(String, Option<String>)> {
    let cleaned = UNITS_PHRASE.replace_all(question, "");
    let caps = IN_PLACE.captures(&cleaned)?;
    let city = caps.get(1)?.as_str().trim().trim_end_matches(['.', '\'']);
    if city.is_empty() {
        return None;
    }
    let state = caps
        .get(2)
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty());
    Some((city.to_owned(), state))
}

/// Work out which place (and units) `question` asks about.
///
/// Returns `None` when no city can be identified.
pub async fn extract_location<P: LlmProvider>(
    llm: &P,
    question: &str,
    default_units: Units,
) -> Option<WeatherQuery> {
    let messages = [Message::system(LOCATION_PROMPT), Message::user(question)];
    let from_llm = match llm.chat(&messages).await {
        Ok(reply) => {
            let parsed = parse_location_reply(&reply);
            if parsed.is_none() {
                tracing::debug!(reply = %reply, "location reply unusable, trying heuristic");
            }
            parsed
        }
        Err(e) => {
            tracing::warn!("location extraction failed: {e}");
            None
        }
    };

    let (city, state) = from_llm.or_else(|| location_from_text(question))?;
    Some(WeatherQuery {
        city,
        state,
        units: Units::mentioned_in(question).unwrap_or(default_units),
    })
}

#[cfg(test)]
mod tests {
    use meridian_llm::mock::MockProvider;

    use super::*;

    #[test]
    fn parses_plain_json() {
        assert_eq!(
            parse_location_reply(r#"{"city": "Paris", "state": null}"#),
            Some(("Paris".into(), None))
        );
    }

    #[test]
    fn parses_fenced_json_with_prose() {
        let reply = "Sure!\n```json\n{\"city\": \"Austin\", \"state\": \"TX\"}\n```";
        assert_eq!(
            parse_location_reply(reply),
            Some(("Austin".into(), Some("TX".into())))
        );
    }

    #[test]
    fn null_or_blank_city_is_none() {
        assert!(parse_location_reply(r#"{"city": null, "state": "TX"}"#).is_none());
        assert!(parse_location_reply(r#"{"city": "  "}"#).is_none());
        assert!(parse_location_reply("no json here").is_none());
        assert!(parse_location_reply("} backwards {").is_none());
    }

    #[test]
    fn heuristic_finds_city() {
        assert_eq!(
            location_from_text("What's the weather in Paris?"),
            Some(("Paris".into(), None))
        );
        assert_eq!(
            location_from_text("How hot is it in New York today"),
            Some(("New York".into(), None))
        );
        assert_eq!(
            location_from_text("weather in Austin, TX?"),
            Some(("Austin".into(), Some("TX".into())))
        );
    }

    #[test]
    fn heuristic_ignores_units_phrase() {
        assert_eq!(
            location_from_text("temperature in fahrenheit in Boston?"),
            Some(("Boston".into(), None))
        );
    }

    #[test]
    fn heuristic_without_place() {
        assert!(location_from_text("is it going to rain").is_none());
    }

    #[tokio::test]
    async fn llm_reply_preferred() {
        let mock = MockProvider::with_responses(vec![r#"{"city": "Sacramento", "state": "CA"}"#.into()]);
        let q = extract_location(&mock, "weather in California in fahrenheit", Units::Metric)
            .await
            .unwrap();
        assert_eq!(q.city, "Sacramento");
        assert_eq!(q.state.as_deref(), Some("CA"));
        assert_eq!(q.units, Units::Imperial);
    }

    #[tokio::test]
    async fn falls_back_to_heuristic() {
        let mock = MockProvider::with_responses(vec!["I think it's Paris".into()]);
        let q = extract_location(&mock, "weather in Lyon?", Units::Standard)
            .await
            .unwrap();
        assert_eq!(q.city, "Lyon");
        assert_eq!(q.units, Units::Standard);

        let failing = MockProvider::failing();
        let q = extract_location(&failing, "forecast for Oslo", Units::Metric)
            .await
            .unwrap();
        assert_eq!(q.city, "Oslo");
    }

    #[tokio::test]
    async fn no_city_anywhere() {
        let mock = MockProvider::with_responses(vec![r#"{"city": null, "state": null}"#.into()]);
        assert!(
            extract_location(&mock, "will it rain?", Units::Metric)
                .await
                .is_none()
        );
    }
}
