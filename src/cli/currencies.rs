use super::ui;
use crate::client::BackendClient;
use anyhow::Result;
use comfy_table::{Cell, Table};

const CODES_PER_ROW: usize = 10;

/// Lays the codes out in rows of fixed width.
pub fn currencies_table(codes: &[String]) -> Table {
    let mut table = ui::new_styled_table();
    for row in codes.chunks(CODES_PER_ROW) {
        table.add_row(row.iter().map(Cell::new).collect::<Vec<_>>());
    }
    table
}

pub async fn show_currencies(client: &BackendClient) -> Result<()> {
    let spinner = ui::new_spinner("Loading currencies...");
    let result = client.currencies().await;
    spinner.finish_and_clear();

    let codes = result?;
    if codes.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "The server has not loaded any exchange rates yet",
                ui::StyleType::Error
            )
        );
        return Ok(());
    }

    println!(
        "{}",
        ui::style_text(
            &format!("{} currencies available", codes.len()),
            ui::StyleType::Title
        )
    );
    println!("{}", currencies_table(&codes));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currencies_table_rows() {
        let codes: Vec<String> = (0..23).map(|i| format!("C{i:02}")).collect();
        let table = currencies_table(&codes);

        assert_eq!(table.row_iter().count(), 3);
        let rendered = table.to_string();
        assert!(rendered.contains("C00"));
        assert!(rendered.contains("C22"));
    }
}
