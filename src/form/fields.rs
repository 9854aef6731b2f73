//! Declaration field record

use serde::{Deserialize, Serialize};

use crate::types::{FormError, Result};

/// Longest value accepted for any one field, in characters
pub const MAX_FIELD_CHARS: usize = 500;

/// The ten named fields of the declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    HofName,
    HofAddress1,
    HofAddress2,
    HofAadhaar,
    ResidentName,
    ResidentAadhaar,
    Relationship,
    ResidentName2,
    ResidentName3,
    Date,
}

/// How a field is entered in edit mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Date,
}

impl FieldName {
    pub const ALL: [FieldName; 10] = [
        FieldName::HofName,
        FieldName::HofAddress1,
        FieldName::HofAddress2,
        FieldName::HofAadhaar,
        FieldName::ResidentName,
        FieldName::ResidentAadhaar,
        FieldName::Relationship,
        FieldName::ResidentName2,
        FieldName::ResidentName3,
        FieldName::Date,
    ];

    /// Name used in posted forms
    pub fn wire_name(self) -> &'static str {
        match self {
            FieldName::HofName => "hofName",
            FieldName::HofAddress1 => "hofAddress1",
            FieldName::HofAddress2 => "hofAddress2",
            FieldName::HofAadhaar => "hofAadhaar",
            FieldName::ResidentName => "residentName",
            FieldName::ResidentAadhaar => "residentAadhaar",
            FieldName::Relationship => "relationship",
            FieldName::ResidentName2 => "residentName2",
            FieldName::ResidentName3 => "residentName3",
            FieldName::Date => "date",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    /// Hint shown in an empty input
    pub fn placeholder(self) -> &'static str {
        match self {
            FieldName::HofName => "Name as in Aadhaar",
            FieldName::HofAddress1 => "Address line 1",
            FieldName::HofAddress2 => "Address line 2",
            FieldName::HofAadhaar => "Aadhaar Number",
            FieldName::ResidentName | FieldName::ResidentName2 | FieldName::ResidentName3 => {
                "Resident Name"
            }
            FieldName::ResidentAadhaar => "Resident Aadhaar",
            FieldName::Relationship => "Relationship (e.g., Son, Daughter, Spouse)",
            FieldName::Date => "",
        }
    }

    pub fn input_kind(self) -> InputKind {
        match self {
            FieldName::Date => InputKind::Date,
            _ => InputKind::Text,
        }
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Current values of every declaration field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FormFields {
    pub hof_name: String,
    pub hof_address1: String,
    pub hof_address2: String,
    pub hof_aadhaar: String,
    pub resident_name: String,
    pub resident_aadhaar: String,
    pub relationship: String,
    pub resident_name2: String,
    pub resident_name3: String,
    pub date: String,
}

impl FormFields {
    pub fn get(&self, name: FieldName) -> &str {
        match name {
            FieldName::HofName => &self.hof_name,
            FieldName::HofAddress1 => &self.hof_address1,
            FieldName::HofAddress2 => &self.hof_address2,
            FieldName::HofAadhaar => &self.hof_aadhaar,
            FieldName::ResidentName => &self.resident_name,
            FieldName::ResidentAadhaar => &self.resident_aadhaar,
            FieldName::Relationship => &self.relationship,
            FieldName::ResidentName2 => &self.resident_name2,
            FieldName::ResidentName3 => &self.resident_name3,
            FieldName::Date => &self.date,
        }
    }

    /// Replace one field, leaving the others untouched
    pub fn replace(&mut self, name: FieldName, value: impl Into<String>) {
        let slot = match name {
            FieldName::HofName => &mut self.hof_name,
            FieldName::HofAddress1 => &mut self.hof_address1,
            FieldName::HofAddress2 => &mut self.hof_address2,
            FieldName::HofAadhaar => &mut self.hof_aadhaar,
            FieldName::ResidentName => &mut self.resident_name,
            FieldName::ResidentAadhaar => &mut self.resident_aadhaar,
            FieldName::Relationship => &mut self.relationship,
            FieldName::ResidentName2 => &mut self.resident_name2,
            FieldName::ResidentName3 => &mut self.resident_name3,
            FieldName::Date => &mut self.date,
        };
        *slot = value.into();
    }

    /// Reject values too long to lay out on the page
    pub fn check_lengths(&self) -> Result<()> {
        for name in FieldName::ALL {
            if self.get(name).chars().count() > MAX_FIELD_CHARS {
                return Err(FormError::Validation(format!(
                    "{name} exceeds {MAX_FIELD_CHARS} characters"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_round_trip() {
        for name in FieldName::ALL {
            assert_eq!(FieldName::from_wire(name.wire_name()), Some(name));
        }
        assert_eq!(FieldName::from_wire("hof_name"), None);
        assert_eq!(FieldName::from_wire(""), None);
    }

    #[test]
    fn test_replace_has_no_cross_talk() {
        for target in FieldName::ALL {
            let mut fields = FormFields::default();
            for (i, name) in FieldName::ALL.iter().enumerate() {
                fields.replace(*name, format!("v{i}"));
            }
            let before = fields.clone();

            fields.replace(target, "changed");

            for name in FieldName::ALL {
                if name == target {
                    assert_eq!(fields.get(name), "changed");
                } else {
                    assert_eq!(fields.get(name), before.get(name), "{name} changed");
                }
            }
        }
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let mut fields = FormFields::default();
        fields.replace(FieldName::HofAddress1, "12 Lake Road");
        let json = serde_json::to_value(&fields).unwrap();
        assert_eq!(json["hofAddress1"], "12 Lake Road");
        for name in FieldName::ALL {
            assert!(json.get(name.wire_name()).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_defaults_are_empty() {
        let fields = FormFields::default();
        assert!(FieldName::ALL.iter().all(|f| fields.get(*f).is_empty()));
    }

    #[test]
    fn test_check_lengths() {
        let mut fields = FormFields::default();
        fields.replace(FieldName::HofAddress1, "x".repeat(MAX_FIELD_CHARS));
        assert!(fields.check_lengths().is_ok());

        fields.replace(FieldName::HofAddress1, "ab ".repeat(350_000));
        let err = fields.check_lengths().unwrap_err();
        assert!(matches!(err, FormError::Validation(ref m) if m.contains("hofAddress1")));
    }
}
