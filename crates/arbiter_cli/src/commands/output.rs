use clap::ValueEnum;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::Tabled;

/// How command results are rendered.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Display as a formatted table (default)
    #[default]
    Table,
    /// Display as JSON
    Json,
}

/// Print rows as a rounded table or a JSON array.
pub(crate) fn print_rows<T>(rows: &[T], format: OutputFormat) -> Result<(), serde_json::Error>
where
    T: Tabled + Serialize,
{
    match format {
        OutputFormat::Table => {
            let mut table = tabled::Table::new(rows);
            table.with(tabled::settings::Style::rounded());
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(rows)?);
        }
    }
    Ok(())
}

/// Cell text for an optional amount.
pub(crate) fn money(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Cell text for an optional percentage.
pub(crate) fn percent(value: Option<Decimal>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}%", v))
}

/// Print at most ten errors, then a count of the rest.
pub(crate) fn display_errors(errors: &[String], is_tty: bool) {
    const SHOWN: usize = 10;
    if errors.is_empty() {
        return;
    }

    if is_tty {
        eprintln!("\x1b[1;33mErrors ({} total):\x1b[0m", errors.len());
        for error in errors.iter().take(SHOWN) {
            eprintln!("  - {}", error);
        }
        if errors.len() > SHOWN {
            eprintln!("  ... and {} more errors", errors.len() - SHOWN);
        }
    } else {
        for error in errors.iter().take(SHOWN) {
            tracing::error!(error = %error, "Pass error");
        }
        if errors.len() > SHOWN {
            tracing::error!(
                additional_errors = errors.len() - SHOWN,
                "Additional errors occurred"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_output_format_default() {
        assert!(matches!(OutputFormat::default(), OutputFormat::Table));
    }

    #[test]
    fn test_money_and_percent_cells() {
        assert_eq!(money(Some(dec!(12.5))), "12.50");
        assert_eq!(money(None), "-");
        assert_eq!(percent(Some(dec!(33.333))), "33.33%");
        assert_eq!(percent(None), "-");
    }
}
