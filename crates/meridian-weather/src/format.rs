use crate::types::WeatherSnapshot;

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Human-readable summary of current conditions.
#[must_use]
pub fn format_snapshot(snapshot: &WeatherSnapshot) -> String {
    let t = snapshot.units.temperature_symbol();
    let condition = if snapshot.description.is_empty() {
        "Unknown".to_owned()
    } else {
        title_case(&snapshot.description)
    };
    format!(
        "Weather in {city}\n\
         Temperature: {temp:.1}{t} (feels like {feels:.1}{t})\n\
         Condition: {condition}\n\
         Humidity: {humidity}%\n\
         Wind speed: {wind:.1} {speed}",
        city = snapshot.city,
        temp = snapshot.temperature,
        feels = snapshot.feels_like,
        humidity = snapshot.humidity,
        wind = snapshot.wind_speed,
        speed = snapshot.units.speed_symbol(),
    )
}
