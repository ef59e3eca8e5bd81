use serde::{Deserialize, Serialize};

/// A closed set of values that arrive as plain strings at the edges
/// (request bodies, rule files, database columns).
pub trait Vocabulary: Sized + Copy + 'static {
    /// Human-readable name of the vocabulary, used in error messages.
    const KIND: &'static str;

    /// Every member, in declaration order.
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == s)
    }
}

/// The academic stream a student followed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stream {
    #[serde(rename = "Physical Science")]
    PhysicalScience,
    #[serde(rename = "Biological Science")]
    BiologicalScience,
    #[serde(rename = "Commerce")]
    Commerce,
    #[serde(rename = "Arts")]
    Arts,
    #[serde(rename = "Technology")]
    Technology,
}

impl Vocabulary for Stream {
    const KIND: &'static str = "stream";

    const ALL: &'static [Self] = &[
        Self::PhysicalScience,
        Self::BiologicalScience,
        Self::Commerce,
        Self::Arts,
        Self::Technology,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::PhysicalScience => "Physical Science",
            Self::BiologicalScience => "Biological Science",
            Self::Commerce => "Commerce",
            Self::Arts => "Arts",
            Self::Technology => "Technology",
        }
    }
}

/// The area a student says they want to work in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Interest {
    #[serde(rename = "Engineering")]
    Engineering,
    #[serde(rename = "Information Technology")]
    InformationTechnology,
    #[serde(rename = "Medicine")]
    Medicine,
    #[serde(rename = "Life Sciences")]
    LifeSciences,
    #[serde(rename = "Business")]
    Business,
    #[serde(rename = "Finance")]
    Finance,
    #[serde(rename = "Law")]
    Law,
    #[serde(rename = "Education")]
    Education,
    #[serde(rename = "Design")]
    Design,
    #[serde(rename = "Media")]
    Media,
}

impl Vocabulary for Interest {
    const KIND: &'static str = "interest";

    const ALL: &'static [Self] = &[
        Self::Engineering,
        Self::InformationTechnology,
        Self::Medicine,
        Self::LifeSciences,
        Self::Business,
        Self::Finance,
        Self::Law,
        Self::Education,
        Self::Design,
        Self::Media,
    ];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Engineering => "Engineering",
            Self::InformationTechnology => "Information Technology",
            Self::Medicine => "Medicine",
            Self::LifeSciences => "Life Sciences",
            Self::Business => "Business",
            Self::Finance => "Finance",
            Self::Law => "Law",
            Self::Education => "Education",
            Self::Design => "Design",
            Self::Media => "Media",
        }
    }
}

/// Account role. Only students carry profiles; advisors leave feedback.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Advisor,
}

impl Vocabulary for Role {
    const KIND: &'static str = "role";

    const ALL: &'static [Self] = &[Self::Student, Self::Advisor];

    fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Advisor => "advisor",
        }
    }
}
