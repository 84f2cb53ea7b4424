//! Display helpers. Small values keep extra decimals so they stay legible.

/// Format an ETH amount with precision depending on magnitude
pub fn format_eth(value: f64) -> String {
    if value < 0.000001 {
        format!("{:.4e} ETH", value)
    } else if value < 0.01 {
        format!("{:.6} ETH", value)
    } else {
        format!("{:.4} ETH", value)
    }
}

/// Format a USD amount
pub fn format_usd(value: f64) -> String {
    if value < 0.01 {
        format!("${:.4}", value)
    } else if value < 1.0 {
        format!("${:.2}", value)
    } else {
        let cents = (value * 100.0).round() as i64;
        format!("${}.{:02}", with_commas(cents / 100), cents % 100)
    }
}

/// Compact currency: $3.20B, $120.00K, ...
pub fn format_currency(value: f64) -> String {
    if value >= 1e9 {
        format!("${:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("${:.2}M", value / 1e6)
    } else if value >= 1e3 {
        format!("${:.2}K", value / 1e3)
    } else {
        format!("${:.2}", value)
    }
}

/// Format percentage
pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{:.prec$}%", value, prec = decimals)
}

fn with_commas(whole: i64) -> String {
    let s = whole.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}
