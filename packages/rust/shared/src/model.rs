//! Domain model for the skills/project-matching schema.
//!
//! These are plain records. Every write path in `athenai-storage` calls
//! [`validate`](User::validate) before issuing SQL, and the schema repeats the
//! same rules as table constraints.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AthenaiError, Result};

/// Maximum length of a domain or skill name.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a domain's free-text description.
pub const MAX_DOMAIN_INFO_LEN: usize = 1000;

// ---------------------------------------------------------------------------
// Main entities
// ---------------------------------------------------------------------------

/// A registered person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Caller-supplied identifier.
    pub id: u32,
    /// Unique handle.
    pub name: String,
    pub first_name: String,
    /// May be blank.
    #[serde(default)]
    pub last_name: String,
    pub email: String,
}

impl User {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("user.name", &self.name)?;
        require_non_blank("user.first_name", &self.first_name)?;
        validate_email(&self.email)
    }
}

/// A field of work a project can belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: u32,
    /// Unique name, at most [`MAX_NAME_LEN`] characters.
    pub name: String,
    /// Free-text description, may be blank.
    #[serde(default)]
    pub info: String,
}

impl Domain {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("domain.name", &self.name)?;
        require_max_len("domain.name", &self.name, MAX_NAME_LEN)?;
        require_max_len("domain.info", &self.info, MAX_DOMAIN_INFO_LEN)
    }
}

/// A named skill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: u32,
    /// Unique name, at most [`MAX_NAME_LEN`] characters.
    pub name: String,
}

impl Skill {
    /// Check field-level rules.
    pub fn validate(&self) -> Result<()> {
        require_non_blank("skill.name", &self.name)?;
        require_max_len("skill.name", &self.name, MAX_NAME_LEN)
    }
}

/// Lifecycle state of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl ProjectStatus {
    /// Storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress => "in-progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = AthenaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "not-started" => Ok(Self::NotStarted),
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(AthenaiError::validation(format!(
                "unknown project status '{other}': expected not-started, in-progress or completed"
            ))),
        }
    }
}

/// A project owned by exactly one [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u32,
    /// Owning user id.
    pub owner: u32,
    pub start_date: NaiveDate,
    /// Must be strictly after `start_date`.
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default)]
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_url: Option<String>,
}

impl Project {
    /// A project with default status and no license or links.
    pub fn new(id: u32, owner: u32, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            id,
            owner,
            start_date,
            end_date,
            status: ProjectStatus::default(),
            license: String::new(),
            repository_url: None,
            demo_url: None,
            dataset_url: None,
        }
    }

    /// Check the duration rule and link fields.
    pub fn validate(&self) -> Result<()> {
        validate_duration(self.start_date, self.end_date)?;
        for (field, value) in [
            ("project.repository_url", &self.repository_url),
            ("project.demo_url", &self.demo_url),
            ("project.dataset_url", &self.dataset_url),
        ] {
            if let Some(raw) = value {
                Url::parse(raw).map_err(|e| {
                    AthenaiError::validation(format!("{field}: invalid URL '{raw}': {e}"))
                })?;
            }
        }
        Ok(())
    }
}

/// Reject any date range where `end_date <= start_date`.
pub fn validate_duration(start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
    if end_date <= start_date {
        return Err(AthenaiError::validation(format!(
            "end date {end_date} must be after the start date {start_date}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Association rows
// ---------------------------------------------------------------------------

/// A person holds a skill. Unique per (person, skill).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonSkill {
    pub person: u32,
    pub skill: u32,
}

/// A project needs a skill with an importance weight.
/// Unique per (project, skill, weight).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectSkillRequirement {
    pub project: u32,
    pub skill: u32,
    pub weight: i64,
}

/// Outcome of a person's application to a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Selected,
    Rejected,
}

impl ApprovalStatus {
    /// Storage/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Selected => "selected",
            Self::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = AthenaiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "selected" => Ok(Self::Selected),
            "rejected" => Ok(Self::Rejected),
            other => Err(AthenaiError::validation(format!(
                "unknown approval status '{other}': expected pending, selected or rejected"
            ))),
        }
    }
}

/// A person attached to a project. Has no natural key; storage assigns `id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub person: u32,
    pub project: u32,
    #[serde(default)]
    pub approval: ApprovalStatus,
}

impl PersonProject {
    /// A new, not-yet-stored membership in the `pending` state.
    pub fn new(person: u32, project: u32) -> Self {
        Self {
            id: None,
            person,
            project,
            approval: ApprovalStatus::default(),
        }
    }
}

/// A project tagged with a domain. Unique per (project, domain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectDomain {
    pub project: u32,
    pub domain: u32,
}

// ---------------------------------------------------------------------------
// Field validators
// ---------------------------------------------------------------------------

fn require_non_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AthenaiError::validation(format!("{field} must not be blank")));
    }
    Ok(())
}

fn require_max_len(field: &str, value: &str, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len > max {
        return Err(AthenaiError::validation(format!(
            "{field} is {len} characters, max {max}"
        )));
    }
    Ok(())
}

/// Local part of dot-atoms, then one or more domain labels and an alphabetic TLD.
/// Labels may not be empty or start/end with a hyphen.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+(?:[a-z]{2,63}|xn--[a-z0-9]{1,59})$",
    )
    .expect("valid regex")
});

fn validate_email(email: &str) -> Result<()> {
    if !EMAIL_RE.is_match(email) {
        return Err(AthenaiError::validation(format!(
            "user.email: invalid address '{email}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn user() -> User {
        User {
            id: 1,
            name: "ada".into(),
            first_name: "Ada".into(),
            last_name: String::new(),
            email: "ada@example.com".into(),
        }
    }

    #[test]
    fn duration_rule() {
        assert!(validate_duration(date(2024, 1, 1), date(2024, 1, 2)).is_ok());

        let same = validate_duration(date(2024, 1, 1), date(2024, 1, 1));
        assert!(matches!(same, Err(AthenaiError::Validation { .. })));

        let reversed = validate_duration(date(2024, 3, 1), date(2024, 1, 1));
        assert!(reversed.unwrap_err().to_string().contains("must be after"));
    }

    #[test]
    fn project_defaults_to_not_started() {
        let project = Project::new(1, 1, date(2024, 1, 1), date(2024, 6, 1));
        assert_eq!(project.status, ProjectStatus::NotStarted);
        assert!(project.validate().is_ok());
    }

    #[test]
    fn project_status_defaults_when_omitted_from_json() {
        let json = r#"{"id":7,"owner":1,"start_date":"2024-01-01","end_date":"2024-02-01"}"#;
        let project: Project = serde_json::from_str(json).expect("deserialize");
        assert_eq!(project.status, ProjectStatus::NotStarted);
        assert_eq!(project.license, "");
    }

    #[test]
    fn project_rejects_bad_url() {
        let mut project = Project::new(1, 1, date(2024, 1, 1), date(2024, 6, 1));
        project.demo_url = Some("not a url".into());
        let err = project.validate().unwrap_err();
        assert!(err.to_string().contains("project.demo_url"));
    }

    #[test]
    fn membership_defaults_to_pending() {
        let membership = PersonProject::new(1, 2);
        assert_eq!(membership.approval, ApprovalStatus::Pending);

        let parsed: PersonProject =
            serde_json::from_str(r#"{"person":1,"project":2}"#).expect("deserialize");
        assert_eq!(parsed.approval, ApprovalStatus::Pending);
    }

    #[test]
    fn enums_reject_unknown_values() {
        assert!("archived".parse::<ProjectStatus>().is_err());
        assert!("maybe".parse::<ApprovalStatus>().is_err());
        assert!(serde_json::from_str::<ApprovalStatus>(r#""maybe""#).is_err());

        assert_eq!("in-progress".parse::<ProjectStatus>().unwrap(), ProjectStatus::InProgress);
        assert_eq!("selected".parse::<ApprovalStatus>().unwrap(), ApprovalStatus::Selected);
    }

    #[test]
    fn enum_strings_roundtrip() {
        for status in [
            ProjectStatus::NotStarted,
            ProjectStatus::InProgress,
            ProjectStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<ProjectStatus>().unwrap(), status);
        }
    }

    #[test]
    fn user_validation() {
        assert!(user().validate().is_ok());

        let blank = User {
            name: "  ".into(),
            ..user()
        };
        assert!(blank.validate().is_err());

        for email in [
            "ada",
            "@example.com",
            "ada@example",
            "ada@@example.com",
            "a da@x.io",
            "ada@x..com",
            "ada@-x.com",
            "ada@x.com,",
            "<ada>@x.c",
            "ada.@example.com",
        ] {
            let bad = User {
                email: email.into(),
                ..user()
            };
            assert!(bad.validate().is_err(), "accepted {email}");
        }

        for email in ["ada.lovelace+maths@example.co.uk", "GRACE@Navy.MIL", "x@xn--80ak6aa92e.com"] {
            let good = User {
                email: email.into(),
                ..user()
            };
            assert!(good.validate().is_ok(), "rejected {email}");
        }
    }

    #[test]
    fn name_length_limits() {
        let skill = Skill {
            id: 1,
            name: "x".repeat(MAX_NAME_LEN + 1),
        };
        assert!(skill.validate().is_err());

        let domain = Domain {
            id: 1,
            name: "astronomy".into(),
            info: "y".repeat(MAX_DOMAIN_INFO_LEN),
        };
        assert!(domain.validate().is_ok());
    }
}
