//! Maps loosely named spreadsheet headers onto the fixed candidate fields.
//!
//! Matching is exact-first: every alias of a field is tried as an exact
//! (case-insensitive) header match before any alias is tried as a substring.
//! The substring pass walks aliases in priority order and, for each alias,
//! the row's keys in their natural order.

use serde::Serialize;
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// The logical candidate fields a spreadsheet row is reconciled into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CandidateField {
    Name,
    Role,
    Email,
    MobileNumber,
    Skills,
    YearsOfExperience,
    #[serde(rename = "score_1")]
    Score1,
    #[serde(rename = "score_2")]
    Score2,
    #[serde(rename = "score_3")]
    Score3,
    #[serde(rename = "score_4")]
    Score4,
}

impl CandidateField {
    pub const ALL: [CandidateField; 10] = [
        CandidateField::Name,
        CandidateField::Role,
        CandidateField::Email,
        CandidateField::MobileNumber,
        CandidateField::Skills,
        CandidateField::YearsOfExperience,
        CandidateField::Score1,
        CandidateField::Score2,
        CandidateField::Score3,
        CandidateField::Score4,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CandidateField::Name => "name",
            CandidateField::Role => "role",
            CandidateField::Email => "email",
            CandidateField::MobileNumber => "mobile_number",
            CandidateField::Skills => "skills",
            CandidateField::YearsOfExperience => "years_of_experience",
            CandidateField::Score1 => "score_1",
            CandidateField::Score2 => "score_2",
            CandidateField::Score3 => "score_3",
            CandidateField::Score4 => "score_4",
        }
    }
}

// Priority-ordered header aliases. Lower-case; earlier entries win.
const NAME_ALIASES: &[&str] = &["cntname", "name", "candidate", "candidate_name", "full name", "fullname"];
const ROLE_ALIASES: &[&str] = &["cndrole", "role", "job_role", "job role", "designation", "position", "title"];
const EMAIL_ALIASES: &[&str] = &["cndemail", "email", "email_id", "e-mail", "mail"];
const MOBILE_ALIASES: &[&str] = &[
    "cndmobilenumber",
    "mobile_number",
    "mobilenumber",
    "mobile",
    "phone_number",
    "phone",
    "contact_number",
    "contact",
];
const SKILLS_ALIASES: &[&str] = &["cndskills", "skills", "skill_set", "skillset", "skill", "technologies"];
const EXPERIENCE_ALIASES: &[&str] = &[
    "year_of_experience",
    "years_of_experience",
    "yearsofexperience",
    "experience",
    "yoe",
];
const SCORE_1_ALIASES: &[&str] = &["score_1", "score1", "score 1", "metric_1", "metric1"];
const SCORE_2_ALIASES: &[&str] = &["score_2", "score2", "score 2", "metric_2", "metric2"];
const SCORE_3_ALIASES: &[&str] = &["score_3", "score3", "score 3", "metric_3", "metric3"];
const SCORE_4_ALIASES: &[&str] = &["score_4", "score4", "score 4", "metric_4", "metric4"];

/// Ordered field → alias-priority-list table handed to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAliases {
    entries: Vec<(CandidateField, Vec<String>)>,
}

impl Default for FieldAliases {
    fn default() -> Self {
        let table: [(CandidateField, &[&str]); 10] = [
            (CandidateField::Name, NAME_ALIASES),
            (CandidateField::Role, ROLE_ALIASES),
            (CandidateField::Email, EMAIL_ALIASES),
            (CandidateField::MobileNumber, MOBILE_ALIASES),
            (CandidateField::Skills, SKILLS_ALIASES),
            (CandidateField::YearsOfExperience, EXPERIENCE_ALIASES),
            (CandidateField::Score1, SCORE_1_ALIASES),
            (CandidateField::Score2, SCORE_2_ALIASES),
            (CandidateField::Score3, SCORE_3_ALIASES),
            (CandidateField::Score4, SCORE_4_ALIASES),
        ];
        Self {
            entries: table
                .into_iter()
                .map(|(field, aliases)| (field, aliases.iter().map(|a| a.to_string()).collect()))
                .collect(),
        }
    }
}

impl FieldAliases {
    /// Replaces the alias list for one field. Aliases are lower-cased.
    pub fn with_aliases<I, S>(mut self, field: CandidateField, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let aliases: Vec<String> = aliases.into_iter().map(|a| a.into().to_lowercase()).collect();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => *existing = aliases,
            None => self.entries.push((field, aliases)),
        }
        self
    }

    pub fn aliases(&self, field: CandidateField) -> &[String] {
        self.entries
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| aliases.as_slice())
            .unwrap_or(&[])
    }

    /// Resolves `field` against `row` using this table's aliases.
    pub fn resolve<'r>(&self, row: &'r Map<String, Value>, field: CandidateField) -> Option<&'r Value> {
        resolve(row, self.aliases(field))
    }
}

/// Finds the value in `row` best matching one of `aliases`.
pub fn resolve<'r, A: AsRef<str>>(row: &'r Map<String, Value>, aliases: &[A]) -> Option<&'r Value> {
    let normalized: Vec<(String, &'r Value)> = row
        .iter()
        .map(|(key, value)| (key.trim().to_lowercase(), value))
        .collect();

    for alias in aliases {
        let alias = alias.as_ref().to_lowercase();
        if let Some((_, value)) = normalized.iter().find(|(key, _)| *key == alias) {
            return Some(*value);
        }
    }

    for alias in aliases {
        let alias = alias.as_ref().to_lowercase();
        if alias.is_empty() {
            continue;
        }
        if let Some((_, value)) = normalized.iter().find(|(key, _)| key.contains(&alias)) {
            return Some(*value);
        }
    }

    None
}
