use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which half of a subject grade a score belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Midterm,
    Finals,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Midterm => "midterm",
            ComponentKind::Finals => "finals",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "midterm" => Ok(ComponentKind::Midterm),
            "finals" => Ok(ComponentKind::Finals),
            other => Err(format!("Invalid grade type: {}", other)),
        }
    }
}

/// Outcome derived from a final rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GradeAction {
    Passed,
    Failed,
}

impl GradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeAction::Passed => "PASSED",
            GradeAction::Failed => "FAILED",
        }
    }
}

impl fmt::Display for GradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores for one subject in one semester.
///
/// `final_rating` and `action` are derived; they are kept in sync with the
/// two components by the grading engine and are only ever both set or both
/// unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectGrade {
    pub midterm: Option<f64>,
    pub finals: Option<f64>,
    pub final_rating: Option<f64>,
    pub action: Option<GradeAction>,
}

impl SubjectGrade {
    pub fn component(&self, kind: ComponentKind) -> Option<f64> {
        match kind {
            ComponentKind::Midterm => self.midterm,
            ComponentKind::Finals => self.finals,
        }
    }

    pub fn set_component(&mut self, kind: ComponentKind, value: Option<f64>) {
        match kind {
            ComponentKind::Midterm => self.midterm = value,
            ComponentKind::Finals => self.finals = value,
        }
    }

    /// True when both components carry a score.
    pub fn is_complete(&self) -> bool {
        self.midterm.is_some() && self.finals.is_some()
    }
}

/// All grades of one student: semester id -> subject id -> scores.
///
/// Both levels keep insertion order. On the wire (and in the `students.grades`
/// column) the book is an ordered sequence of semester entries, each with an
/// ordered sequence of subject entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SemesterEntry>", into = "Vec<SemesterEntry>")]
pub struct GradeBook {
    semesters: IndexMap<i32, IndexMap<i32, SubjectGrade>>,
}

/// Stored form of one semester of a [`GradeBook`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterEntry {
    pub semester_id: i32,
    #[serde(default)]
    pub subjects: Vec<SubjectEntry>,
}

/// Stored form of one subject grade of a [`GradeBook`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectEntry {
    pub subject_id: i32,
    #[serde(flatten)]
    pub grade: SubjectGrade,
}

impl From<Vec<SemesterEntry>> for GradeBook {
    fn from(entries: Vec<SemesterEntry>) -> Self {
        // Repeated keys collapse into one node; the last value for a subject wins.
        let mut semesters: IndexMap<i32, IndexMap<i32, SubjectGrade>> = IndexMap::new();
        for entry in entries {
            let subjects = semesters.entry(entry.semester_id).or_default();
            for subject in entry.subjects {
                subjects.insert(subject.subject_id, subject.grade);
            }
        }
        Self { semesters }
    }
}

impl From<GradeBook> for Vec<SemesterEntry> {
    fn from(book: GradeBook) -> Self {
        book.semesters
            .into_iter()
            .map(|(semester_id, subjects)| SemesterEntry {
                semester_id,
                subjects: subjects
                    .into_iter()
                    .map(|(subject_id, grade)| SubjectEntry { subject_id, grade })
                    .collect(),
            })
            .collect()
    }
}

impl GradeBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes the stored representation. An empty column is an empty book.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn get(&self, semester_id: i32, subject_id: i32) -> Option<&SubjectGrade> {
        self.semesters
            .get(&semester_id)
            .and_then(|subjects| subjects.get(&subject_id))
    }

    /// Returns the grade for the pair, creating the semester node and the
    /// subject node (with both components unset) when missing.
    pub fn entry(&mut self, semester_id: i32, subject_id: i32) -> &mut SubjectGrade {
        self.semesters
            .entry(semester_id)
            .or_default()
            .entry(subject_id)
            .or_default()
    }

    /// Semesters in insertion order, each with its subjects in insertion order.
    pub fn semesters(&self) -> impl Iterator<Item = (i32, &IndexMap<i32, SubjectGrade>)> {
        self.semesters.iter().map(|(id, subjects)| (*id, subjects))
    }

    /// Number of subject grades across all semesters.
    pub fn len(&self) -> usize {
        self.semesters.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
