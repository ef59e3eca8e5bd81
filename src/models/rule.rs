use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use super::{Interest, Stream, Vocabulary};

/// Wildcard token in rule files.
pub const WILDCARD: &str = "*";

/// Match condition on one profile attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate<T> {
    Any,
    Exactly(T),
}

impl<T: PartialEq> Predicate<T> {
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::Exactly(expected) => expected == value,
        }
    }
}

impl<T: Vocabulary> Serialize for Predicate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Any => serializer.serialize_str(WILDCARD),
            Self::Exactly(value) => serializer.serialize_str(value.as_str()),
        }
    }
}

impl<'de, T: Vocabulary> Deserialize<'de> for Predicate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == WILDCARD {
            return Ok(Self::Any);
        }
        T::from_str(&raw).map(Self::Exactly).ok_or_else(|| {
            de::Error::custom(format!("unknown {} '{}'", T::KIND, raw))
        })
    }
}

/// A declarative recommendation rule.
///
/// A rule fires for a profile when both predicates match and the profile's
/// GPA is at least `min_gpa`. Among firing rules the lowest `priority` wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rule {
    pub stream: Predicate<Stream>,
    pub interest: Predicate<Interest>,
    /// Inclusive lower GPA bound.
    #[serde(default)]
    pub min_gpa: f64,
    /// Lower values are more specific and evaluated first.
    pub priority: u32,
    pub recommendation: String,
}

impl Rule {
    pub fn applies_to(&self, stream: Stream, interest: Interest, gpa: f64) -> bool {
        self.stream.matches(&stream) && self.interest.matches(&interest) && gpa >= self.min_gpa
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_round_trips_as_star() {
        let rule: Rule = serde_json::from_str(
            r#"{"stream":"*","interest":"Design","priority":9,"recommendation":"Graphic Design"}"#,
        )
        .unwrap();
        assert_eq!(rule.stream, Predicate::Any);
        assert_eq!(rule.interest, Predicate::Exactly(Interest::Design));
        assert_eq!(rule.min_gpa, 0.0);

        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["stream"], "*");
        assert_eq!(json["interest"], "Design");
    }

    #[test]
    fn test_unknown_predicate_value_fails() {
        let result: Result<Rule, _> = serde_json::from_str(
            r#"{"stream":"Astrology","interest":"*","priority":1,"recommendation":"X"}"#,
        );
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown stream 'Astrology'"), "{err}");
    }

    #[test]
    fn test_min_gpa_is_inclusive() {
        let rule = Rule {
            stream: Predicate::Exactly(Stream::Commerce),
            interest: Predicate::Any,
            min_gpa: 3.0,
            priority: 1,
            recommendation: "Accounting".to_string(),
        };
        assert!(rule.applies_to(Stream::Commerce, Interest::Finance, 3.0));
        assert!(!rule.applies_to(Stream::Commerce, Interest::Finance, 2.99));
        assert!(!rule.applies_to(Stream::Arts, Interest::Finance, 3.5));
    }
}
