//! Persisted guest row and the fixed store column schema

use rsvp_common::GuestRecord;

/// Store columns, in sheet order
pub const COLUMNS: [&str; 12] = [
    "guest_id",
    "main_email",
    "guest_index",
    "first_name",
    "middle_name",
    "last_name",
    "guest_email",
    "age_group",
    "attendance",
    "allergies",
    "other_allergy",
    "passport",
];

/// Longest text an xlsx cell holds, in characters
pub const MAX_CELL_CHARS: usize = 32_767;

/// One guest row of the store
///
/// `guest_id` is `<main_email>_<guest_index>`; it is not unique across repeated
/// submissions by the same contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedGuestRow {
    pub guest_id: String,
    pub main_email: String,
    /// 1-based position within the submission
    pub guest_index: u32,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub guest_email: String,
    pub age_group: String,
    pub attendance: String,
    /// Comma-joined allergy tags
    pub allergies: String,
    pub other_allergy: String,
    pub passport: bool,
}

impl PersistedGuestRow {
    /// Flatten a guest at 0-based `index`; `passport` is decided by the caller
    pub fn from_guest(main_email: &str, index: usize, guest: &GuestRecord, passport: bool) -> Self {
        let one_based = index + 1;
        Self {
            guest_id: format!("{}_{}", main_email, one_based),
            main_email: main_email.to_string(),
            guest_index: one_based as u32,
            first_name: guest.first_name.clone(),
            middle_name: guest.middle_name.clone(),
            last_name: guest.last_name.clone(),
            guest_email: guest.email.clone(),
            age_group: guest.age_group_str().to_string(),
            attendance: guest.attendance_str().to_string(),
            allergies: guest.allergies_joined(),
            other_allergy: guest.other_allergy.clone(),
            passport,
        }
    }

    pub fn passport_str(&self) -> &'static str {
        if self.passport {
            "yes"
        } else {
            "no"
        }
    }

    /// Text value of a column by name
    pub fn text(&self, column: &str) -> String {
        match column {
            "guest_id" => self.guest_id.clone(),
            "main_email" => self.main_email.clone(),
            "guest_index" => self.guest_index.to_string(),
            "first_name" => self.first_name.clone(),
            "middle_name" => self.middle_name.clone(),
            "last_name" => self.last_name.clone(),
            "guest_email" => self.guest_email.clone(),
            "age_group" => self.age_group.clone(),
            "attendance" => self.attendance.clone(),
            "allergies" => self.allergies.clone(),
            "other_allergy" => self.other_allergy.clone(),
            "passport" => self.passport_str().to_string(),
            _ => String::new(),
        }
    }

    /// First column whose text does not fit in one cell
    pub fn oversized_column(&self) -> Option<&'static str> {
        COLUMNS
            .iter()
            .copied()
            .find(|column| self.text(column).chars().count() > MAX_CELL_CHARS)
    }

    /// Set a column from its text value; unknown columns are ignored
    pub fn set_text(&mut self, column: &str, value: String) {
        match column {
            "guest_id" => self.guest_id = value,
            "main_email" => self.main_email = value,
            "guest_index" => self.guest_index = value.trim().parse().unwrap_or(0),
            "first_name" => self.first_name = value,
            "middle_name" => self.middle_name = value,
            "last_name" => self.last_name = value,
            "guest_email" => self.guest_email = value,
            "age_group" => self.age_group = value,
            "attendance" => self.attendance = value,
            "allergies" => self.allergies = value,
            "other_allergy" => self.other_allergy = value,
            "passport" => self.passport = value.trim().eq_ignore_ascii_case("yes"),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsvp_common::{AgeGroup, Allergy, Attendance};

    #[test]
    fn test_from_guest() {
        let guest = GuestRecord {
            first_name: "Dana".to_string(),
            last_name: "Levi".to_string(),
            email: "d@x.com".to_string(),
            age_group: Some(AgeGroup::Adult),
            attendance: Some(Attendance::Yes),
            allergies: [Allergy::Nuts, Allergy::Other].into_iter().collect(),
            other_allergy: "kiwi".to_string(),
            ..Default::default()
        };

        let row = PersistedGuestRow::from_guest("a@b.com", 0, &guest, false);
        assert_eq!(row.guest_id, "a@b.com_1");
        assert_eq!(row.guest_index, 1);
        assert_eq!(row.age_group, "adult");
        assert_eq!(row.attendance, "yes");
        assert_eq!(row.allergies, "nuts, other");
        assert_eq!(row.other_allergy, "kiwi");
        assert_eq!(row.passport_str(), "no");
    }

    #[test]
    fn test_oversized_column() {
        let mut row = PersistedGuestRow {
            other_allergy: "x".repeat(MAX_CELL_CHARS),
            ..Default::default()
        };
        assert_eq!(row.oversized_column(), None);

        row.other_allergy.push('x');
        assert_eq!(row.oversized_column(), Some("other_allergy"));
    }

    #[test]
    fn test_text_round_trips_every_column() {
        let row = PersistedGuestRow {
            guest_id: "a@b.com_2".to_string(),
            main_email: "a@b.com".to_string(),
            guest_index: 2,
            first_name: "F".to_string(),
            passport: true,
            ..Default::default()
        };

        let mut copy = PersistedGuestRow::default();
        for column in COLUMNS {
            copy.set_text(column, row.text(column));
        }
        assert_eq!(copy, row);
    }
}
