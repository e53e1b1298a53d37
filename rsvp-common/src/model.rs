//! Guest record data model
//!
//! The wire format matches what the RSVP form produces: camelCase keys, empty
//! strings for unanswered choices, and the passport flag as `"yes"`/`"no"`.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filename;

/// Age bracket chosen for a guest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Adult,
    Teen,
    Child,
    Infant,
}

impl AgeGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeGroup::Adult => "adult",
            AgeGroup::Teen => "teen",
            AgeGroup::Child => "child",
            AgeGroup::Infant => "infant",
        }
    }
}

/// Whether a guest will attend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attendance {
    Yes,
    No,
    Maybe,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attendance::Yes => "yes",
            Attendance::No => "no",
            Attendance::Maybe => "maybe",
        }
    }
}

/// Allergy tag; `Other` pairs with the free-text `other_allergy` note
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allergy {
    Nuts,
    Gluten,
    Dairy,
    Eggs,
    Fish,
    Shellfish,
    Soy,
    Sesame,
    Other,
}

impl Allergy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Allergy::Nuts => "nuts",
            Allergy::Gluten => "gluten",
            Allergy::Dairy => "dairy",
            Allergy::Eggs => "eggs",
            Allergy::Fish => "fish",
            Allergy::Shellfish => "shellfish",
            Allergy::Soy => "soy",
            Allergy::Sesame => "sesame",
            Allergy::Other => "other",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Attendance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Allergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One guest of a submission
///
/// The guest's position in the submission is not stored here; it is the index
/// of the record in the guest list (0-based in memory, 1-based once persisted).
///
/// `passport_present` is derived from image assignment and recomputed by
/// every consumer that relies on it. Values supplied by callers are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuestRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub middle_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(with = "blank_as_none")]
    pub age_group: Option<AgeGroup>,
    #[serde(with = "blank_as_none")]
    pub attendance: Option<Attendance>,
    #[serde(deserialize_with = "null_as_default")]
    pub allergies: BTreeSet<Allergy>,
    #[serde(deserialize_with = "null_as_default")]
    pub other_allergy: String,
    #[serde(rename = "passport", with = "yes_no")]
    pub passport_present: bool,
}

impl GuestRecord {
    /// Normalized filename stem for this guest at 0-based `index`
    pub fn normalized_stem(&self, index: usize) -> String {
        filename::normalize_stem(&self.first_name, &self.middle_name, &self.last_name, index + 1)
    }

    /// Normalized image filename for this guest at 0-based `index`
    pub fn image_filename(&self, index: usize, mime_type: Option<&str>) -> String {
        filename::normalize(
            &self.first_name,
            &self.middle_name,
            &self.last_name,
            index + 1,
            mime_type,
        )
    }

    /// Allergy tags joined the way the store keeps them (`"nuts, soy"`)
    pub fn allergies_joined(&self) -> String {
        self.allergies
            .iter()
            .map(Allergy::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Age group as stored text (empty when unanswered)
    pub fn age_group_str(&self) -> &'static str {
        self.age_group.map(|a| a.as_str()).unwrap_or_default()
    }

    /// Attendance as stored text (empty when unanswered)
    pub fn attendance_str(&self) -> &'static str {
        self.attendance.map(|a| a.as_str()).unwrap_or_default()
    }
}

/// JSON `null` reads as the field's default (empty string, empty set)
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter: `""` (or missing / null) on the wire is `None`
mod blank_as_none {
    use serde::de::{DeserializeOwned, IntoDeserializer};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => {
                let de: serde::de::value::StrDeserializer<'_, D::Error> = text.into_deserializer();
                T::deserialize(de).map(Some)
            }
        }
    }
}

/// Serde adapter: passport flag as `"yes"`/`"no"`, also accepting booleans
mod yes_no {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S>(value: &bool, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(if *value { "yes" } else { "no" })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Flag>::deserialize(deserializer)? {
            None => false,
            Some(Flag::Bool(b)) => b,
            Some(Flag::Text(t)) => t.trim().eq_ignore_ascii_case("yes"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_form_json() {
        let json = r#"{
            "firstName": "Dana",
            "middleName": "",
            "lastName": "Levi",
            "email": "d@x.com",
            "ageGroup": "adult",
            "attendance": "yes",
            "allergies": ["nuts"],
            "otherAllergy": "",
            "passport": "no"
        }"#;

        let guest: GuestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(guest.first_name, "Dana");
        assert_eq!(guest.age_group, Some(AgeGroup::Adult));
        assert_eq!(guest.attendance, Some(Attendance::Yes));
        assert!(guest.allergies.contains(&Allergy::Nuts));
        assert!(!guest.passport_present);
    }

    #[test]
    fn test_blank_choices_are_none() {
        let json = r#"{"firstName": "A", "ageGroup": "", "attendance": ""}"#;
        let guest: GuestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(guest.age_group, None);
        assert_eq!(guest.attendance, None);
        assert_eq!(guest.age_group_str(), "");
    }

    #[test]
    fn test_missing_fields_default() {
        let guest: GuestRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(guest, GuestRecord::default());
    }

    #[test]
    fn test_null_text_fields_read_as_empty() {
        let json = r#"{
            "firstName": "Dana",
            "middleName": null,
            "lastName": "Levi",
            "email": null,
            "allergies": null,
            "otherAllergy": null
        }"#;
        let guest: GuestRecord = serde_json::from_str(json).unwrap();
        assert_eq!(guest.middle_name, "");
        assert_eq!(guest.email, "");
        assert!(guest.allergies.is_empty());
        assert_eq!(guest.normalized_stem(0), "dana_levi_1");
    }

    #[test]
    fn test_unknown_age_group_rejected() {
        let json = r#"{"ageGroup": "ancient"}"#;
        assert!(serde_json::from_str::<GuestRecord>(json).is_err());
    }

    #[test]
    fn test_passport_flag_forms() {
        let yes: GuestRecord = serde_json::from_str(r#"{"passport": "yes"}"#).unwrap();
        let boolean: GuestRecord = serde_json::from_str(r#"{"passport": true}"#).unwrap();
        let null: GuestRecord = serde_json::from_str(r#"{"passport": null}"#).unwrap();
        assert!(yes.passport_present);
        assert!(boolean.passport_present);
        assert!(!null.passport_present);
    }

    #[test]
    fn test_serialize_wire_shape() {
        let guest = GuestRecord {
            first_name: "Dana".to_string(),
            passport_present: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&guest).unwrap();
        assert_eq!(value["firstName"], "Dana");
        assert_eq!(value["passport"], "yes");
        assert_eq!(value["ageGroup"], "");
        assert!(value.get("passportPresent").is_none());
    }

    #[test]
    fn test_allergies_joined_in_stable_order() {
        let guest = GuestRecord {
            allergies: [Allergy::Soy, Allergy::Nuts, Allergy::Other].into_iter().collect(),
            ..Default::default()
        };
        assert_eq!(guest.allergies_joined(), "nuts, soy, other");
    }

    #[test]
    fn test_image_filename_uses_one_based_index() {
        let guest = GuestRecord {
            first_name: "Dana".to_string(),
            last_name: "Levi".to_string(),
            ..Default::default()
        };
        assert_eq!(guest.image_filename(0, Some("image/jpeg")), "dana_levi_1.jpg");
        assert_eq!(guest.normalized_stem(1), "dana_levi_2");
    }
}
