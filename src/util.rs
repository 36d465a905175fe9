pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// Scores are stored unrounded; display and charts use one decimal
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn format_score(value: f64) -> String {
    format!("{value:.1}")
}

/// Renders a missing average as a dash so it cannot be mistaken for a real zero
pub fn format_optional_score(value: Option<f64>) -> String {
    value.map_or_else(|| "—".to_string(), format_score)
}
