//! Chart request types shared by the orchestrator and the renderer.

use super::series::TimeSeriesPoint;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartStyle {
    #[default]
    Line,
    Bar,
    Area,
    Scatter,
}

impl ChartStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartStyle::Line => "line",
            ChartStyle::Bar => "bar",
            ChartStyle::Area => "area",
            ChartStyle::Scatter => "scatter",
        }
    }
}

impl FromStr for ChartStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "line" => Ok(ChartStyle::Line),
            "bar" => Ok(ChartStyle::Bar),
            "area" => Ok(ChartStyle::Area),
            "scatter" => Ok(ChartStyle::Scatter),
            other => Err(format!(
                "Invalid 'style' parameter '{}'. Supported values: line, bar, area, scatter.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            other => Err(format!(
                "Invalid 'theme' parameter '{}'. Supported values: dark, light.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Day range accepted by the market chart endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartDays {
    Day1,
    Day7,
    Day14,
    Day30,
    Day90,
    Day180,
    Day365,
    Max,
}

impl ChartDays {
    pub const ALL: [ChartDays; 8] = [
        ChartDays::Day1,
        ChartDays::Day7,
        ChartDays::Day14,
        ChartDays::Day30,
        ChartDays::Day90,
        ChartDays::Day180,
        ChartDays::Day365,
        ChartDays::Max,
    ];

    /// Value passed to CoinGecko's `days` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartDays::Day1 => "1",
            ChartDays::Day7 => "7",
            ChartDays::Day14 => "14",
            ChartDays::Day30 => "30",
            ChartDays::Day90 => "90",
            ChartDays::Day180 => "180",
            ChartDays::Day365 => "365",
            ChartDays::Max => "max",
        }
    }
}

impl fmt::Display for ChartDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartDays {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartDays::ALL
            .into_iter()
            .find(|days| days.as_str() == s)
            .ok_or_else(|| {
                "Invalid 'days' parameter. Supported values: 1, 7, 14, 30, 90, 180, 365, 'max'."
                    .to_string()
            })
    }
}

/// Everything the renderer needs for one chart.
#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub points: Vec<TimeSeriesPoint>,
    pub style: ChartStyle,
    pub theme: Theme,
    pub title: String,
    pub y_label: String,
    pub line_color: Rgb,
}
