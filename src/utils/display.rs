use crate::config::AppConfig;
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};
use std::time::Duration;

pub struct DisplayFormatter;

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_header(&self, text: &str) -> String {
        format!("\n=== {} ===", text.bright_white().bold())
    }

    pub fn format_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);

        table.add_row(Row::new(
            headers.iter().map(|h| Cell::new(h).style_spec("b")).collect(),
        ));

        for row in rows {
            table.add_row(Row::new(row.iter().map(|cell| Cell::new(cell)).collect()));
        }

        table.to_string()
    }

    pub fn format_duration(&self, duration: Duration) -> String {
        if duration.is_zero() {
            "off".dimmed().to_string()
        } else if duration.subsec_millis() == 0 {
            format!("{}s", duration.as_secs())
        } else {
            format!("{}ms", duration.as_millis())
        }
    }

    /// Effective configuration and the route list, printed once at startup.
    pub fn format_startup_banner(&self, config: &AppConfig, routes: &[(&str, &str)]) -> String {
        let settings = vec![
            vec!["Listen".to_string(), format!("http://{}", config.listen_addr())],
            vec!["Upstream".to_string(), config.upstream_url.clone()],
            vec!["Currency".to_string(), config.vs_currency.to_uppercase()],
            vec!["Cache TTL".to_string(), self.format_duration(config.cache_ttl)],
            vec!["Timeout".to_string(), self.format_duration(config.request_timeout)],
            vec!["Pacing".to_string(), self.format_duration(config.pacing)],
            vec!["Cache sweep".to_string(), self.format_duration(config.sweep_interval)],
            vec![
                "Chart size".to_string(),
                format!("{}x{}", config.chart_width, config.chart_height),
            ],
            vec!["Stroke width".to_string(), format!("{}px", config.stroke_width)],
        ];
        let route_rows: Vec<Vec<String>> = routes
            .iter()
            .map(|(route, about)| vec![route.cyan().to_string(), about.to_string()])
            .collect();

        let mut output = Vec::new();
        output.push(self.format_header("Coin Chart Service"));
        output.push(self.format_table(&["Setting", "Value"], &settings));
        output.push(self.format_table(&["Route", "Description"], &route_rows));
        output.join("\n")
    }
}
