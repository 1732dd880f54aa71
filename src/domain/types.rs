// ==========================================
// Class Generation Engine - domain value types
// ==========================================
// Slot catalog, categories, competencies, lifecycle states.
// Serialized form: SCREAMING_SNAKE_CASE (same as the database columns)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// Day of week
// ==========================================
// Declaration order is the catalog order (Monday first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn to_db_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "MONDAY",
            DayOfWeek::Tuesday => "TUESDAY",
            DayOfWeek::Wednesday => "WEDNESDAY",
            DayOfWeek::Thursday => "THURSDAY",
            DayOfWeek::Friday => "FRIDAY",
            DayOfWeek::Saturday => "SATURDAY",
            DayOfWeek::Sunday => "SUNDAY",
        }
    }

    /// Name shown on the published timetable
    pub fn local_name(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Senin",
            DayOfWeek::Tuesday => "Selasa",
            DayOfWeek::Wednesday => "Rabu",
            DayOfWeek::Thursday => "Kamis",
            DayOfWeek::Friday => "Jumat",
            DayOfWeek::Saturday => "Sabtu",
            DayOfWeek::Sunday => "Minggu",
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl FromStr for DayOfWeek {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MONDAY" | "MON" => Ok(DayOfWeek::Monday),
            "TUESDAY" | "TUE" => Ok(DayOfWeek::Tuesday),
            "WEDNESDAY" | "WED" => Ok(DayOfWeek::Wednesday),
            "THURSDAY" | "THU" => Ok(DayOfWeek::Thursday),
            "FRIDAY" | "FRI" => Ok(DayOfWeek::Friday),
            "SATURDAY" | "SAT" => Ok(DayOfWeek::Saturday),
            "SUNDAY" | "SUN" => Ok(DayOfWeek::Sunday),
            other => Err(format!("unknown day of week: {}", other)),
        }
    }
}

// ==========================================
// Session (teaching period within a day)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Session {
    #[serde(rename = "SESI_1")]
    Sesi1,
    #[serde(rename = "SESI_2")]
    Sesi2,
    #[serde(rename = "SESI_3")]
    Sesi3,
    #[serde(rename = "SESI_4")]
    Sesi4,
    #[serde(rename = "SESI_5")]
    Sesi5,
    #[serde(rename = "SESI_6")]
    Sesi6,
    #[serde(rename = "SESI_7")]
    Sesi7,
}

impl Session {
    pub const ALL: [Session; 7] = [
        Session::Sesi1,
        Session::Sesi2,
        Session::Sesi3,
        Session::Sesi4,
        Session::Sesi5,
        Session::Sesi6,
        Session::Sesi7,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Session::Sesi1 => "SESI_1",
            Session::Sesi2 => "SESI_2",
            Session::Sesi3 => "SESI_3",
            Session::Sesi4 => "SESI_4",
            Session::Sesi5 => "SESI_5",
            Session::Sesi6 => "SESI_6",
            Session::Sesi7 => "SESI_7",
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Session {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        Session::ALL
            .iter()
            .copied()
            .find(|session| session.code() == normalized)
            .ok_or_else(|| format!("unknown session code: {}", s.trim()))
    }
}

// ==========================================
// TimeSlot - (day x session)
// ==========================================
// Field order gives the derived Ord: day-major, then session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub day: DayOfWeek,
    pub session: Session,
}

impl TimeSlot {
    pub fn new(day: DayOfWeek, session: Session) -> Self {
        Self { day, session }
    }

    /// Full weekly catalog in catalog order
    pub fn catalog() -> Vec<TimeSlot> {
        DayOfWeek::ALL
            .iter()
            .flat_map(|day| Session::ALL.iter().map(move |session| TimeSlot::new(*day, *session)))
            .collect()
    }

    /// e.g. "Senin SESI_1"
    pub fn display_name(&self) -> String {
        format!("{} {}", self.day.local_name(), self.session)
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.day, self.session)
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    /// Accepts "MONDAY/SESI_1" or "MONDAY SESI_1"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(|c: char| c == '/' || c.is_whitespace()).filter(|p| !p.is_empty());
        let day = parts.next().ok_or_else(|| format!("invalid time slot: {}", s))?;
        let session = parts.next().ok_or_else(|| format!("invalid time slot: {}", s))?;
        if parts.next().is_some() {
            return Err(format!("invalid time slot: {}", s));
        }
        Ok(TimeSlot::new(day.parse()?, session.parse()?))
    }
}

// ==========================================
// Student category
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StudentCategory {
    Existing, // continuing student, has a prior class
    New,      // placement-tested newcomer
}

impl fmt::Display for StudentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StudentCategory::Existing => write!(f, "EXISTING"),
            StudentCategory::New => write!(f, "NEW"),
        }
    }
}

impl FromStr for StudentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NEW" => Ok(StudentCategory::New),
            "EXISTING" => Ok(StudentCategory::Existing),
            other => Err(format!("unknown student category: {}", other)),
        }
    }
}

// ==========================================
// Teacher competency
// ==========================================
// Ord: JUNIOR < SENIOR < EXPERT
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Competency {
    Junior,
    Senior,
    Expert,
}

impl Default for Competency {
    fn default() -> Self {
        Competency::Junior
    }
}

impl fmt::Display for Competency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Competency::Junior => write!(f, "JUNIOR"),
            Competency::Senior => write!(f, "SENIOR"),
            Competency::Expert => write!(f, "EXPERT"),
        }
    }
}

impl FromStr for Competency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "JUNIOR" => Ok(Competency::Junior),
            "SENIOR" => Ok(Competency::Senior),
            "EXPERT" => Ok(Competency::Expert),
            other => Err(format!("unknown competency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Specialization {
    Foundation,
    Remedial,
    Advanced,
    Mixed,
}

impl Default for Specialization {
    fn default() -> Self {
        Specialization::Mixed
    }
}

impl FromStr for Specialization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "" | "MIXED" => Ok(Specialization::Mixed),
            "FOUNDATION" => Ok(Specialization::Foundation),
            "REMEDIAL" => Ok(Specialization::Remedial),
            "ADVANCED" => Ok(Specialization::Advanced),
            other => Err(format!("unknown specialization: {}", other)),
        }
    }
}

// ==========================================
// Priority strategy (bucket processing order)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriorityStrategy {
    Balance,
    MinimizeClasses,
    MaximizeTeacherFit,
}

impl PriorityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityStrategy::Balance => "BALANCE",
            PriorityStrategy::MinimizeClasses => "MINIMIZE_CLASSES",
            PriorityStrategy::MaximizeTeacherFit => "MAXIMIZE_TEACHER_FIT",
        }
    }
}

impl Default for PriorityStrategy {
    fn default() -> Self {
        PriorityStrategy::Balance
    }
}

impl FromStr for PriorityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "BALANCE" => Ok(PriorityStrategy::Balance),
            "MINIMIZE_CLASSES" => Ok(PriorityStrategy::MinimizeClasses),
            "MAXIMIZE_TEACHER_FIT" => Ok(PriorityStrategy::MaximizeTeacherFit),
            other => Err(format!("unknown priority strategy: {}", other)),
        }
    }
}

// ==========================================
// Category mix policy
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CategoryMixPolicy {
    Mixed,      // interleave NEW/EXISTING per the target ratio
    Segregated, // NEW_ONLY / EXISTING_ONLY buckets
}

impl CategoryMixPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryMixPolicy::Mixed => "MIXED",
            CategoryMixPolicy::Segregated => "SEGREGATED",
        }
    }
}

impl Default for CategoryMixPolicy {
    fn default() -> Self {
        CategoryMixPolicy::Mixed
    }
}

impl FromStr for CategoryMixPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "MIXED" => Ok(CategoryMixPolicy::Mixed),
            "SEGREGATED" => Ok(CategoryMixPolicy::Segregated),
            other => Err(format!("unknown category mix policy: {}", other)),
        }
    }
}

// ==========================================
// Class type (derived from the category mix)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassType {
    NewOnly,
    ExistingOnly,
    Mixed,
}

impl ClassType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassType::NewOnly => "NEW_ONLY",
            ClassType::ExistingOnly => "EXISTING_ONLY",
            ClassType::Mixed => "MIXED",
        }
    }
}

// ==========================================
// Proposal status
// ==========================================
// GENERATED -> REFINING -> APPROVED -> PUBLISHED
// GENERATED/REFINING -> REJECTED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Generated,
    Refining,
    Approved,
    Published,
    Rejected,
}

impl ProposalStatus {
    /// GENERATED and REFINING accept edits
    pub fn is_mutable(&self) -> bool {
        matches!(self, ProposalStatus::Generated | ProposalStatus::Refining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProposalStatus::Published | ProposalStatus::Rejected)
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProposalStatus::Generated => "GENERATED",
            ProposalStatus::Refining => "REFINING",
            ProposalStatus::Approved => "APPROVED",
            ProposalStatus::Published => "PUBLISHED",
            ProposalStatus::Rejected => "REJECTED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GENERATED" => Some(ProposalStatus::Generated),
            "REFINING" => Some(ProposalStatus::Refining),
            "APPROVED" => Some(ProposalStatus::Approved),
            "PUBLISHED" => Some(ProposalStatus::Published),
            "REJECTED" => Some(ProposalStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// Term status
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TermStatus {
    Planning,
    Active,
    Completed,
}

impl TermStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            TermStatus::Planning => "PLANNING",
            TermStatus::Active => "ACTIVE",
            TermStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PLANNING" => Some(TermStatus::Planning),
            "ACTIVE" => Some(TermStatus::Active),
            "COMPLETED" => Some(TermStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for TermStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}
