//! Calendar selection and the event filter derived from it.

use crate::model::{Calendar, CalendarId, Event};

/// Calendars the user picked for this run. Empty means all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection(Vec<CalendarId>);

impl Selection {
    pub fn all() -> Self {
        Selection(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: &CalendarId) -> bool {
        self.0.contains(id)
    }

    /// Toggle a calendar in or out, like tapping its chip.
    pub fn toggle(&mut self, id: CalendarId) {
        match self.0.iter().position(|c| c == &id) {
            Some(i) => {
                self.0.remove(i);
            }
            None => self.0.push(id),
        }
    }

    pub fn insert(&mut self, id: CalendarId) {
        if !self.contains(&id) {
            self.0.push(id);
        }
    }

    /// Calendars this selection covers, in the order of `discovered`.
    pub fn calendars_in(&self, discovered: &[Calendar]) -> Vec<Calendar> {
        discovered
            .iter()
            .filter(|c| self.is_empty() || self.contains(&c.id))
            .cloned()
            .collect()
    }
}

impl FromIterator<CalendarId> for Selection {
    fn from_iter<I: IntoIterator<Item = CalendarId>>(iter: I) -> Self {
        let mut selection = Selection::all();
        for id in iter {
            selection.insert(id);
        }
        selection
    }
}

/// Events belonging to the selected calendars, in their original order.
///
/// An empty selection passes everything through. Otherwise events without a
/// calendar are dropped.
pub fn apply(events: &[Event], selection: &Selection) -> Vec<Event> {
    if selection.is_empty() {
        return events.to_vec();
    }

    events
        .iter()
        .filter(|e| e.calendar.as_ref().is_some_and(|id| selection.contains(id)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, calendar: Option<&str>) -> Event {
        Event {
            id: id.into(),
            title: Some(id.into()),
            start: Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap(),
            calendar: calendar.map(CalendarId::new),
        }
    }

    fn events() -> Vec<Event> {
        vec![
            event("e1", Some("work")),
            event("e2", Some("home")),
            event("e3", None),
            event("e4", Some("work")),
            event("e5", Some("gym")),
        ]
    }

    fn ids(events: &[Event]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_empty_selection_is_identity() {
        let events = events();
        assert_eq!(apply(&events, &Selection::all()), events);
    }

    #[test]
    fn test_selection_keeps_members_in_order() {
        let selection: Selection = [CalendarId::new("gym"), CalendarId::new("work")]
            .into_iter()
            .collect();
        assert_eq!(ids(&apply(&events(), &selection)), vec!["e1", "e4", "e5"]);
    }

    #[test]
    fn test_every_subset_matches_membership() {
        let names = ["work", "home", "gym"];
        let events = events();

        for mask in 1..(1u8 << names.len()) {
            let selection: Selection = names
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, n)| CalendarId::new(*n))
                .collect();

            let expected: Vec<Event> = events
                .iter()
                .filter(|e| e.calendar.as_ref().is_some_and(|c| selection.contains(c)))
                .cloned()
                .collect();
            assert_eq!(apply(&events, &selection), expected);
        }
    }

    #[test]
    fn test_toggle() {
        let mut selection = Selection::all();
        selection.toggle(CalendarId::new("work"));
        assert!(selection.contains(&CalendarId::new("work")));
        selection.toggle(CalendarId::new("work"));
        assert!(selection.is_empty());
    }

    #[test]
    fn test_calendars_in_discovery_order() {
        let discovered = vec![
            Calendar::new("work", "Work"),
            Calendar::new("home", "Home"),
            Calendar::new("gym", "Gym"),
        ];
        let selection: Selection = [CalendarId::new("gym"), CalendarId::new("work")]
            .into_iter()
            .collect();

        let titles: Vec<_> = selection
            .calendars_in(&discovered)
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, vec!["Work", "Gym"]);
        assert_eq!(Selection::all().calendars_in(&discovered).len(), 3);
    }
}
