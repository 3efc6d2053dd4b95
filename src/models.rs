use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// School-type word the backend appends to every elementary school name.
pub const DEFAULT_SCHOOL_SUFFIX: &str = "초등학교";

/// Grade picker value. Serialized as the plain digit the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Grade {
    #[serde(rename = "1")]
    First,
    #[serde(rename = "2")]
    Second,
    #[serde(rename = "3")]
    #[default]
    Third,
    #[serde(rename = "4")]
    Fourth,
    #[serde(rename = "5")]
    Fifth,
    #[serde(rename = "6")]
    Sixth,
}

impl Grade {
    pub const ALL: [Grade; 6] = [
        Grade::First,
        Grade::Second,
        Grade::Third,
        Grade::Fourth,
        Grade::Fifth,
        Grade::Sixth,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Grade::First => "1",
            Grade::Second => "2",
            Grade::Third => "3",
            Grade::Fourth => "4",
            Grade::Fifth => "5",
            Grade::Sixth => "6",
        }
    }

    /// Position in `Grade::ALL`, used by the picker list state
    pub fn index(&self) -> usize {
        Grade::ALL.iter().position(|g| g == self).unwrap_or(2)
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Grade::First),
            "2" => Ok(Grade::Second),
            "3" => Ok(Grade::Third),
            "4" => Ok(Grade::Fourth),
            "5" => Ok(Grade::Fifth),
            "6" => Ok(Grade::Sixth),
            other => Err(anyhow::anyhow!("Unsupported grade: {}. Supported grades: 1-6", other)),
        }
    }
}

/// Record sent to the backend when the teacher confirms the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfoPayload {
    pub school_name: String,
    pub grade: Grade,
    pub class_number: String,
}

/// What the backend answered to a successful submission
#[derive(Debug, Clone, PartialEq)]
pub struct ClassroomReceipt {
    pub status: u16,
    pub body: serde_json::Value,
}

/// Remove one trailing institutional suffix, if present.
pub fn strip_school_suffix<'a>(name: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return name;
    }
    name.strip_suffix(suffix).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_parse_and_display() {
        for grade in Grade::ALL {
            let parsed: Grade = grade.as_str().parse().unwrap();
            assert_eq!(parsed, grade);
            assert_eq!(grade.to_string(), grade.as_str());
        }
        assert!("0".parse::<Grade>().is_err());
        assert!("7".parse::<Grade>().is_err());
        assert_eq!(Grade::default(), Grade::Third);
        assert_eq!(Grade::Fifth.index(), 4);
    }

    #[test]
    fn test_payload_serializes_as_camel_case() {
        let payload = ClassInfoPayload {
            school_name: "Main Elementary School".to_string(),
            grade: Grade::Fifth,
            class_number: "2".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "schoolName": "Main Elementary School",
                "grade": "5",
                "classNumber": "2"
            })
        );
    }

    #[test]
    fn test_strip_school_suffix() {
        assert_eq!(strip_school_suffix("서울초등학교", DEFAULT_SCHOOL_SUFFIX), "서울");
        assert_eq!(
            strip_school_suffix("Seoul Central Elementary School", " Elementary School"),
            "Seoul Central"
        );
        // Only a trailing occurrence is removed
        assert_eq!(strip_school_suffix("초등학교 서울", DEFAULT_SCHOOL_SUFFIX), "초등학교 서울");
        assert_eq!(strip_school_suffix("서울초등학교초등학교", DEFAULT_SCHOOL_SUFFIX), "서울초등학교");
        assert_eq!(strip_school_suffix("Seoul", ""), "Seoul");
    }
}
