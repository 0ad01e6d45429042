//! Static per-grade curriculum: topic identifiers, allowed-topic tables and the
//! ordered sequence a learner walks through one day at a time.
//!
//! The catalog is validated once at construction so the rest of the crate can
//! treat a `Catalog` as a set of well-formed sequences.
use crate::error::CurriculumError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Supported elementary grade levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Kindergarten,
    #[serde(rename = "grade_1")]
    Grade1,
    #[serde(rename = "grade_2")]
    Grade2,
    #[serde(rename = "grade_3")]
    Grade3,
    #[serde(rename = "grade_4")]
    Grade4,
    #[serde(rename = "grade_5")]
    Grade5,
}

impl Grade {
    pub const ALL: [Grade; 6] = [
        Grade::Kindergarten,
        Grade::Grade1,
        Grade::Grade2,
        Grade::Grade3,
        Grade::Grade4,
        Grade::Grade5,
    ];

    /// Stable identifier used in file names and JSON.
    pub fn id(self) -> &'static str {
        match self {
            Grade::Kindergarten => "kindergarten",
            Grade::Grade1 => "grade_1",
            Grade::Grade2 => "grade_2",
            Grade::Grade3 => "grade_3",
            Grade::Grade4 => "grade_4",
            Grade::Grade5 => "grade_5",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Grade::Kindergarten => "Kindergarten",
            Grade::Grade1 => "Grade 1",
            Grade::Grade2 => "Grade 2",
            Grade::Grade3 => "Grade 3",
            Grade::Grade4 => "Grade 4",
            Grade::Grade5 => "Grade 5",
        }
    }

    /// Worksheet difficulty on a 1-5 scale.
    pub fn difficulty(self) -> u8 {
        match self {
            Grade::Kindergarten | Grade::Grade1 => 1,
            Grade::Grade2 => 2,
            Grade::Grade3 => 3,
            Grade::Grade4 => 4,
            Grade::Grade5 => 5,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Grade {
    type Err = CurriculumError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Grade::ALL
            .into_iter()
            .find(|grade| grade.id() == normalized)
            .or(match normalized.as_str() {
                "k" => Some(Grade::Kindergarten),
                _ => None,
            })
            .ok_or_else(|| CurriculumError::UnknownGrade(raw.to_string()))
    }
}

/// Math concept areas a daily run can focus on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Counting,
    NumbersAndOperations,
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Fractions,
    Decimals,
    Geometry,
    #[serde(alias = "measurement")]
    MeasurementAndData,
    DataAndStatistics,
    WordProblems,
    Patterns,
    Time,
    Money,
    Ratios,
}

impl Topic {
    pub const ALL: [Topic; 16] = [
        Topic::Counting,
        Topic::NumbersAndOperations,
        Topic::Addition,
        Topic::Subtraction,
        Topic::Multiplication,
        Topic::Division,
        Topic::Fractions,
        Topic::Decimals,
        Topic::Geometry,
        Topic::MeasurementAndData,
        Topic::DataAndStatistics,
        Topic::WordProblems,
        Topic::Patterns,
        Topic::Time,
        Topic::Money,
        Topic::Ratios,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Topic::Counting => "counting",
            Topic::NumbersAndOperations => "numbers_and_operations",
            Topic::Addition => "addition",
            Topic::Subtraction => "subtraction",
            Topic::Multiplication => "multiplication",
            Topic::Division => "division",
            Topic::Fractions => "fractions",
            Topic::Decimals => "decimals",
            Topic::Geometry => "geometry",
            Topic::MeasurementAndData => "measurement_and_data",
            Topic::DataAndStatistics => "data_and_statistics",
            Topic::WordProblems => "word_problems",
            Topic::Patterns => "patterns",
            Topic::Time => "time",
            Topic::Money => "money",
            Topic::Ratios => "ratios",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Topic::Counting => "Counting",
            Topic::NumbersAndOperations => "Numbers and Operations",
            Topic::Addition => "Addition",
            Topic::Subtraction => "Subtraction",
            Topic::Multiplication => "Multiplication",
            Topic::Division => "Division",
            Topic::Fractions => "Fractions",
            Topic::Decimals => "Decimals",
            Topic::Geometry => "Geometry",
            Topic::MeasurementAndData => "Measurement and Data",
            Topic::DataAndStatistics => "Data and Statistics",
            Topic::WordProblems => "Word Problems",
            Topic::Patterns => "Patterns",
            Topic::Time => "Time",
            Topic::Money => "Money",
            Topic::Ratios => "Ratios",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Topic {
    type Err = CurriculumError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        if normalized == "measurement" {
            return Ok(Topic::MeasurementAndData);
        }
        Topic::ALL
            .into_iter()
            .find(|topic| topic.id() == normalized)
            .ok_or_else(|| CurriculumError::UnknownTopic(raw.to_string()))
    }
}

/// Learning goal for a topic at a grade, used to steer generation.
pub fn learning_goal(topic: Topic, grade: Grade) -> String {
    use Grade::*;
    use Topic::*;
    let goal = match (topic, grade) {
        (Counting, Kindergarten) => "Count objects from 1 to 20",
        (Counting, Grade1) => "Count objects from 1 to 100 and skip count by 2s, 5s, and 10s",
        (NumbersAndOperations, Grade3) => "Place value to 1,000 and rounding to the nearest 10 or 100",
        (NumbersAndOperations, Grade4) => "Place value to 1,000,000 and comparing multi-digit numbers",
        (Addition, Kindergarten) => "Add numbers within 10",
        (Addition, Grade1) => "Add numbers within 20",
        (Addition, Grade2) => "Add two-digit numbers with regrouping",
        (Addition, Grade3) => "Add three-digit numbers with regrouping",
        (Addition, Grade4) => "Add multi-digit numbers including decimals",
        (Subtraction, Kindergarten) => "Subtract numbers within 10",
        (Subtraction, Grade1) => "Subtract numbers within 20",
        (Subtraction, Grade2) => "Subtract two-digit numbers with regrouping",
        (Subtraction, Grade3) => "Subtract three-digit numbers with regrouping",
        (Multiplication, Grade2) => "Introduction to multiplication with arrays",
        (Multiplication, Grade3) => "Multiply single-digit numbers (times tables up to 10)",
        (Multiplication, Grade4) => "Multiply multi-digit numbers",
        (Multiplication, Grade5) => "Multiply multi-digit numbers and decimals",
        (Division, Grade3) => "Introduction to division with simple facts",
        (Division, Grade4) => "Divide multi-digit numbers by single-digit divisors",
        (Division, Grade5) => "Divide multi-digit numbers by multi-digit divisors",
        (Fractions, Grade3) => "Introduction to fractions: halves, thirds, fourths",
        (Fractions, Grade4) => "Add and subtract fractions with like denominators",
        (Fractions, Grade5) => "Add and subtract fractions with unlike denominators",
        (Decimals, Grade4) => "Introduction to decimals: tenths and hundredths",
        (Decimals, Grade5) => "Add, subtract, multiply, and divide decimals",
        (Geometry, Kindergarten) => "Identify basic shapes: circle, square, triangle",
        (Geometry, Grade1) => "Identify and describe 2D and 3D shapes",
        (Geometry, Grade2) => "Identify shapes and their attributes",
        (Geometry, Grade3) => "Calculate perimeter of shapes",
        (Geometry, Grade4) => "Calculate area and perimeter",
        (Geometry, Grade5) => "Calculate volume and surface area",
        (MeasurementAndData, Grade1) => "Compare and order objects by length",
        (MeasurementAndData, Grade2) => "Measure length using standard units",
        (MeasurementAndData, Grade4) => "Convert between units of measurement",
        (MeasurementAndData, Grade5) => "Convert between metric and customary units",
        (DataAndStatistics, Grade3) => "Read and draw picture graphs and bar graphs",
        (DataAndStatistics, Grade4) => "Make and interpret line plots with fractional units",
        (DataAndStatistics, Grade5) => "Graph points on the coordinate plane and interpret data",
        (WordProblems, Grade2) => "Simple word problems with addition and subtraction",
        (WordProblems, Grade3) => "Word problems with multiplication and division",
        (WordProblems, Grade4) => "Multi-step word problems",
        (WordProblems, Grade5) => "Complex multi-step word problems",
        (Patterns, Kindergarten) => "Recognize and extend simple patterns (AB, ABC)",
        (Patterns, Grade1) => "Create and extend number patterns",
        (Time, Grade1) => "Tell time to the hour and half hour",
        (Time, Grade2) => "Tell time to the nearest 5 minutes",
        (Time, Grade3) => "Tell time to the nearest minute and calculate elapsed time",
        (Money, Grade2) => "Identify coins and count money",
        (Money, Grade3) => "Count money and make change",
        (Ratios, Grade5) => "Compare quantities with simple ratios and patterns in tables",
        _ => return format!("{} concepts", topic.display_name()),
    };
    goal.to_string()
}

/// Grade-to-topic tables: the allowed set and the ordered daily sequence.
#[derive(Debug, Clone)]
pub struct Catalog {
    grades: BTreeMap<Grade, GradeCurriculum>,
}

#[derive(Debug, Clone)]
struct GradeCurriculum {
    allowed: BTreeSet<Topic>,
    sequence: Vec<Topic>,
}

impl Catalog {
    /// Build a catalog from explicit tables, rejecting malformed sequences.
    pub fn from_tables<A, S>(allowed: A, sequences: S) -> Result<Self, CurriculumError>
    where
        A: IntoIterator<Item = (Grade, Vec<Topic>)>,
        S: IntoIterator<Item = (Grade, Vec<Topic>)>,
    {
        let allowed: BTreeMap<Grade, BTreeSet<Topic>> = allowed
            .into_iter()
            .map(|(grade, topics)| (grade, topics.into_iter().collect()))
            .collect();
        let mut grades = BTreeMap::new();
        for (grade, sequence) in sequences {
            let allowed = allowed.get(&grade).cloned().ok_or_else(|| {
                CurriculumError::InvalidCatalog(format!("{grade} has a sequence but no allowed topics"))
            })?;
            if sequence.is_empty() {
                return Err(CurriculumError::InvalidCatalog(format!(
                    "{grade} has an empty sequence"
                )));
            }
            let mut seen = BTreeSet::new();
            for topic in &sequence {
                if !allowed.contains(topic) {
                    return Err(CurriculumError::InvalidCatalog(format!(
                        "{topic} is not an allowed topic for {grade}"
                    )));
                }
                if !seen.insert(*topic) {
                    return Err(CurriculumError::InvalidCatalog(format!(
                        "{topic} appears more than once in the {grade} sequence"
                    )));
                }
            }
            if grades
                .insert(grade, GradeCurriculum { allowed, sequence })
                .is_some()
            {
                return Err(CurriculumError::InvalidCatalog(format!(
                    "{grade} is defined more than once"
                )));
            }
        }
        Ok(Self { grades })
    }

    /// The built-in Kindergarten through Grade 5 curriculum.
    pub fn builtin() -> Result<Self, CurriculumError> {
        use Grade::*;
        use Topic::*;
        let allowed = [
            (
                Kindergarten,
                vec![Counting, Addition, Subtraction, Patterns, Geometry, MeasurementAndData],
            ),
            (
                Grade1,
                vec![
                    Counting,
                    Addition,
                    Subtraction,
                    Patterns,
                    Geometry,
                    Time,
                    MeasurementAndData,
                    Money,
                ],
            ),
            (
                Grade2,
                vec![
                    Counting,
                    Addition,
                    Subtraction,
                    Multiplication,
                    Geometry,
                    Time,
                    Money,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                    Patterns,
                ],
            ),
            (
                Grade3,
                vec![
                    NumbersAndOperations,
                    Addition,
                    Subtraction,
                    Multiplication,
                    Division,
                    Fractions,
                    Geometry,
                    Time,
                    Money,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                ],
            ),
            (
                Grade4,
                vec![
                    NumbersAndOperations,
                    Addition,
                    Multiplication,
                    Division,
                    Fractions,
                    Decimals,
                    Geometry,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                    Patterns,
                ],
            ),
            (
                Grade5,
                vec![
                    NumbersAndOperations,
                    Multiplication,
                    Division,
                    Fractions,
                    Decimals,
                    Ratios,
                    Geometry,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                ],
            ),
        ];
        let sequences = [
            (
                Kindergarten,
                vec![Counting, Addition, Subtraction, Patterns, Geometry],
            ),
            (
                Grade1,
                vec![
                    Counting,
                    Addition,
                    Subtraction,
                    Patterns,
                    Geometry,
                    Time,
                    MeasurementAndData,
                ],
            ),
            (
                Grade2,
                vec![
                    Addition,
                    Subtraction,
                    Multiplication,
                    Geometry,
                    Time,
                    Money,
                    MeasurementAndData,
                    WordProblems,
                ],
            ),
            (
                Grade3,
                vec![
                    NumbersAndOperations,
                    Addition,
                    Subtraction,
                    Multiplication,
                    Division,
                    Fractions,
                    Geometry,
                    Time,
                    Money,
                    DataAndStatistics,
                    WordProblems,
                ],
            ),
            (
                Grade4,
                vec![
                    NumbersAndOperations,
                    Multiplication,
                    Division,
                    Fractions,
                    Decimals,
                    Geometry,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                ],
            ),
            (
                Grade5,
                vec![
                    Multiplication,
                    Division,
                    Fractions,
                    Decimals,
                    Ratios,
                    Geometry,
                    MeasurementAndData,
                    DataAndStatistics,
                    WordProblems,
                ],
            ),
        ];
        Self::from_tables(allowed, sequences)
    }

    /// Ordered topic sequence for a grade.
    pub fn sequence_for(&self, grade: Grade) -> Result<&[Topic], CurriculumError> {
        self.grades
            .get(&grade)
            .map(|curriculum| curriculum.sequence.as_slice())
            .ok_or_else(|| CurriculumError::UnknownGrade(grade.id().to_string()))
    }

    /// Whether a topic belongs to the allowed set for a grade.
    pub fn is_valid_topic_for(&self, grade: Grade, topic: Topic) -> bool {
        self.grades
            .get(&grade)
            .is_some_and(|curriculum| curriculum.allowed.contains(&topic))
    }

    pub fn grades(&self) -> impl Iterator<Item = Grade> + '_ {
        self.grades.keys().copied()
    }
}
