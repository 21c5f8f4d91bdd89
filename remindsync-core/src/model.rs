//! Provider-neutral calendar and reminder types.
//!
//! Events and calendars are read-only snapshots fetched fresh on every run.
//! Task lists and tasks are the mirrored side that the sync engine writes.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Title used for events that have none.
pub const UNTITLED: &str = "Untitled";

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(CalendarId);
id_type!(ListId);
id_type!(TaskId);
id_type!(SourceId);

/// Color space a provider reports a calendar color in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    /// Device RGB channels, in red/green/blue order
    DeviceRgb,
    /// The provider has not loaded color metadata yet
    Unavailable,
}

/// A calendar color as the provider hands it out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeColor {
    pub space: ColorSpace,
    #[serde(default)]
    pub components: Vec<f64>,
}

impl NativeColor {
    pub fn device_rgb(red: f64, green: f64, blue: f64) -> Self {
        NativeColor {
            space: ColorSpace::DeviceRgb,
            components: vec![red, green, blue],
        }
    }

    pub fn unavailable() -> Self {
        NativeColor {
            space: ColorSpace::Unavailable,
            components: Vec::new(),
        }
    }
}

/// Normalized color with channels in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl Rgb {
    /// Channels scaled to 0-255 for terminal output.
    pub fn to_u8(self) -> (u8, u8, u8) {
        let scale = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        (scale(self.red), scale(self.green), scale(self.blue))
    }

    pub fn to_hex(self) -> String {
        let (r, g, b) = self.to_u8();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarKind {
    #[default]
    Event,
}

/// A named, colored grouping of events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: CalendarId,
    pub title: String,
    pub color: Option<NativeColor>,
    #[serde(default)]
    pub kind: CalendarKind,
}

impl Calendar {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Calendar {
            id: CalendarId::new(id),
            title: title.into(),
            color: None,
            kind: CalendarKind::Event,
        }
    }

    pub fn with_color(mut self, color: NativeColor) -> Self {
        self.color = Some(color);
        self
    }

    /// False while the provider still reports the color as unavailable.
    /// A calendar without any color counts as resolved.
    pub fn color_resolved(&self) -> bool {
        !matches!(
            &self.color,
            Some(NativeColor {
                space: ColorSpace::Unavailable,
                ..
            })
        )
    }
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

/// A calendar entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: Option<String>,
    pub start: DateTime<Utc>,
    /// Owning calendar, by id only
    pub calendar: Option<CalendarId>,
}

impl Event {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED)
    }

    pub fn belongs_to(&self, calendar: &CalendarId) -> bool {
        self.calendar.as_ref() == Some(calendar)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_title())
    }
}

/// A reminder list mirrored from a calendar. Correlated by title only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: ListId,
    pub title: String,
    pub color: Option<Rgb>,
    pub source: SourceId,
}

/// A reminder list that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskList {
    pub title: String,
    pub color: Option<Rgb>,
    pub source: SourceId,
}

/// A reminder mirrored from an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub due: NaiveDate,
    pub list: ListId,
}

/// A reminder that has been staged but not committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub due: NaiveDate,
    pub list: ListId,
}

impl NewTask {
    pub fn for_event(event: &Event, list: &ListId, tz: Option<Tz>) -> Self {
        NewTask {
            title: event.display_title().to_string(),
            due: due_date_for(event.start, tz),
            list: list.clone(),
        }
    }
}

/// Truncate a timestamp to its calendar day, in `tz` if given, UTC otherwise.
pub fn due_date_for(start: DateTime<Utc>, tz: Option<Tz>) -> NaiveDate {
    match tz {
        Some(tz) => start.with_timezone(&tz).date_naive(),
        None => start.date_naive(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_due_date_drops_time_of_day() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(
            due_date_for(start, None),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_due_date_uses_configured_timezone() {
        // 23:30 UTC is already the next morning in Tokyo
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(
            due_date_for(start, Some(chrono_tz::Asia::Tokyo)),
            NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
        );
    }

    #[test]
    fn test_untitled_event_gets_placeholder() {
        let event = Event {
            id: "e1".into(),
            title: None,
            start: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            calendar: None,
        };
        let task = NewTask::for_event(&event, &ListId::new("l1"), None);
        assert_eq!(task.title, UNTITLED);
    }

    #[test]
    fn test_color_resolved() {
        let cal = Calendar::new("c1", "Work");
        assert!(cal.color_resolved());
        assert!(!cal.clone().with_color(NativeColor::unavailable()).color_resolved());
        assert!(cal.with_color(NativeColor::device_rgb(0.0, 0.0, 1.0)).color_resolved());
    }

    #[test]
    fn test_rgb_hex() {
        let rgb = Rgb {
            red: 1.0,
            green: 0.5,
            blue: 0.0,
        };
        assert_eq!(rgb.to_hex(), "#FF8000");
    }
}
