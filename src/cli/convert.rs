use super::ui;
use crate::client::BackendClient;
use crate::core::rates::normalize_code;
use anyhow::Result;

/// Renders a converted amount the way the CLI prints it.
pub fn conversion_line(amount: &str, from: &str, result: &str, to: &str) -> String {
    format!(
        "{} {} {} {} {}",
        amount.trim(),
        normalize_code(from),
        ui::style_text("→", ui::StyleType::Subtle),
        ui::style_text(result, ui::StyleType::Result),
        normalize_code(to)
    )
}

pub async fn convert(client: &BackendClient, amount: &str, from: &str, to: &str) -> Result<()> {
    let spinner = ui::new_spinner("Converting...");
    let result = client.convert(amount, from, to).await;
    spinner.finish_and_clear();

    let converted = result?;
    println!("{}", conversion_line(amount, from, &converted, to));
    Ok(())
}

pub async fn manual_convert(client: &BackendClient, amount: &str, rate: &str) -> Result<()> {
    let spinner = ui::new_spinner("Converting...");
    let result = client.manual_convert(amount, rate).await;
    spinner.finish_and_clear();

    let line = result?;
    println!("{}", ui::style_text(&line, ui::StyleType::Result));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_line() {
        let line = console::strip_ansi_codes(&conversion_line(" 100 ", "usd", "90.00", "eur"))
            .to_string();
        assert_eq!(line, "100 USD → 90.00 EUR");
    }
}
