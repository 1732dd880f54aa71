// ==========================================
// Class Generation Engine - CSV collaborators
// ==========================================
// File-backed CohortSource / AvailabilitySource.
// Headers are matched by name, blank rows are skipped, and an
// optional `term_id` column restricts rows to one term.
//
// cohort.csv        student_id, level_id, category, prior_class_id
// levels.csv        level_id, name, order_number, required_competency
// competencies.csv  teacher_id, level_id, competency, specialization, max_classes_for_level
// availability.csv  teacher_id, day, session, capacity, max_classes_per_week
// ==========================================

use crate::collaborator::{AvailabilitySource, CohortSource, CollaboratorError, CollaboratorResult};
use crate::domain::cohort::{AssessedStudent, Level};
use crate::domain::teacher::{LevelCompetency, SlotAvailability, TeacherCandidate, DEFAULT_MAX_CLASSES_PER_WEEK};
use crate::domain::types::{Competency, Specialization, StudentCategory, TimeSlot};
use async_trait::async_trait;
use csv::ReaderBuilder;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// One non-blank CSV row keyed by lowercased header
struct RawRecord {
    line: u64, // line in the file where the row starts (header is line 1)
    fields: HashMap<String, String>,
}

// ==========================================
// CsvCohortSource
// ==========================================
pub struct CsvCohortSource {
    students_path: PathBuf,
    levels_path: PathBuf,
}

impl CsvCohortSource {
    pub fn new(students_path: impl Into<PathBuf>, levels_path: impl Into<PathBuf>) -> Self {
        Self {
            students_path: students_path.into(),
            levels_path: levels_path.into(),
        }
    }
}

#[async_trait]
impl CohortSource for CsvCohortSource {
    async fn get_assessed_cohort(&self, term_id: &str) -> CollaboratorResult<Vec<AssessedStudent>> {
        let records = read_term_records(&self.students_path, term_id)?;
        let mut students = Vec::with_capacity(records.len());

        for record in &records {
            let category: StudentCategory = parse_required(record, "category")?;
            let prior_class_id = optional(record, "prior_class_id").map(|s| s.to_string());
            students.push(AssessedStudent {
                student_id: required(record, "student_id")?.to_string(),
                level_id: required(record, "level_id")?.to_string(),
                category,
                prior_class_id,
            });
        }

        debug!(term_id, count = students.len(), path = %self.students_path.display(), "cohort loaded");
        Ok(students)
    }

    async fn get_levels(&self, term_id: &str) -> CollaboratorResult<Vec<Level>> {
        let records = read_term_records(&self.levels_path, term_id)?;
        let mut levels = Vec::with_capacity(records.len());

        for record in &records {
            let order_number: u32 = parse_required(record, "order_number")?;
            let required_competency: Competency = parse_optional(record, "required_competency")?.unwrap_or_default();
            levels.push(Level {
                level_id: required(record, "level_id")?.to_string(),
                name: optional(record, "name")
                    .or_else(|| optional(record, "level_id"))
                    .unwrap_or_default()
                    .to_string(),
                order_number,
                required_competency,
            });
        }

        Ok(levels)
    }
}

// ==========================================
// CsvAvailabilitySource
// ==========================================
pub struct CsvAvailabilitySource {
    competencies_path: PathBuf,
    availability_path: PathBuf,
}

impl CsvAvailabilitySource {
    pub fn new(competencies_path: impl Into<PathBuf>, availability_path: impl Into<PathBuf>) -> Self {
        Self {
            competencies_path: competencies_path.into(),
            availability_path: availability_path.into(),
        }
    }
}

#[async_trait]
impl AvailabilitySource for CsvAvailabilitySource {
    /// Teachers ordered by id; a teacher listed only in one file still appears
    async fn get_teacher_availability(&self, term_id: &str) -> CollaboratorResult<Vec<TeacherCandidate>> {
        let mut teachers: BTreeMap<String, TeacherCandidate> = BTreeMap::new();
        let mut weekly_caps: HashMap<String, usize> = HashMap::new();

        for record in &read_term_records(&self.competencies_path, term_id)? {
            let teacher_id = required(record, "teacher_id")?;
            let competency = LevelCompetency {
                level_id: required(record, "level_id")?.to_string(),
                competency: parse_required(record, "competency")?,
                specialization: parse_optional::<Specialization>(record, "specialization")?.unwrap_or_default(),
                max_classes_for_level: parse_optional(record, "max_classes_for_level")?,
            };
            teachers
                .entry(teacher_id.to_string())
                .or_insert_with(|| TeacherCandidate::new(teacher_id, DEFAULT_MAX_CLASSES_PER_WEEK))
                .competencies
                .push(competency);
        }

        for record in &read_term_records(&self.availability_path, term_id)? {
            let teacher_id = required(record, "teacher_id")?;
            let slot = TimeSlot::new(parse_required(record, "day")?, parse_required(record, "session")?);
            let capacity: u32 = parse_optional(record, "capacity")?.unwrap_or(1);
            if let Some(cap) = parse_optional::<usize>(record, "max_classes_per_week")? {
                weekly_caps.entry(teacher_id.to_string()).or_insert(cap);
            }
            teachers
                .entry(teacher_id.to_string())
                .or_insert_with(|| TeacherCandidate::new(teacher_id, DEFAULT_MAX_CLASSES_PER_WEEK))
                .availability
                .push(SlotAvailability { slot, capacity });
        }

        for (teacher_id, cap) in weekly_caps {
            if let Some(teacher) = teachers.get_mut(&teacher_id) {
                teacher.max_classes_per_week = cap;
            }
        }

        debug!(term_id, count = teachers.len(), "teacher availability loaded");
        Ok(teachers.into_values().collect())
    }
}

// ==========================================
// Record helpers
// ==========================================

/// Read a CSV file into header-keyed records, skipping blank rows
fn read_records(path: &Path) -> CollaboratorResult<Vec<RawRecord>> {
    if !path.exists() {
        return Err(CollaboratorError::Unavailable(format!("file not found: {}", path.display())));
    }

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // short rows leave trailing columns empty
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let mut fields = HashMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                fields.insert(header.clone(), value.trim().to_string());
            }
        }

        if fields.values().all(|v| v.is_empty()) {
            continue;
        }
        let line = record.position().map(|p| p.line()).unwrap_or(idx as u64 + 2);
        records.push(RawRecord { line, fields });
    }

    Ok(records)
}

fn read_term_records(path: &Path, term_id: &str) -> CollaboratorResult<Vec<RawRecord>> {
    Ok(read_records(path)?
        .into_iter()
        .filter(|r| match optional(r, "term_id") {
            Some(t) => t == term_id,
            None => true,
        })
        .collect())
}

fn optional<'a>(record: &'a RawRecord, column: &str) -> Option<&'a str> {
    record.fields.get(column).map(|v| v.as_str()).filter(|v| !v.is_empty())
}

fn required<'a>(record: &'a RawRecord, column: &str) -> CollaboratorResult<&'a str> {
    optional(record, column)
        .ok_or_else(|| CollaboratorError::InvalidData(format!("row {}: missing {}", record.line, column)))
}

fn parse_required<T>(record: &RawRecord, column: &str) -> CollaboratorResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = required(record, column)?;
    raw.parse::<T>().map_err(|e| {
        CollaboratorError::InvalidData(format!("row {}: {} = '{}': {}", record.line, column, raw, e))
    })
}

fn parse_optional<T>(record: &RawRecord, column: &str) -> CollaboratorResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(record, column) {
        Some(_) => parse_required(record, column).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{DayOfWeek, Session};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_cohort_and_levels() {
        let students = csv_file(
            "student_id,level_id,category,prior_class_id\n\
             S1,L1,NEW,\n\
             S2,L1,existing,OLD-3\n\
             ,,,\n\
             S3,L2,NEW\n",
        );
        let levels = csv_file(
            "level_id,name,order_number,required_competency\n\
             L1,Tahsin 1,1,\n\
             L2,Tahfidz,2,SENIOR\n",
        );
        let source = CsvCohortSource::new(students.path(), levels.path());

        let cohort = source.get_assessed_cohort("T1").await.unwrap();
        assert_eq!(cohort.len(), 3);
        assert_eq!(cohort[1].category, StudentCategory::Existing);
        assert_eq!(cohort[1].prior_class_id.as_deref(), Some("OLD-3"));
        assert_eq!(cohort[2].prior_class_id, None);

        let levels = source.get_levels("T1").await.unwrap();
        assert_eq!(levels[0].required_competency, Competency::Junior);
        assert_eq!(levels[1].required_competency, Competency::Senior);
        assert_eq!(levels[1].name, "Tahfidz");
    }

    #[tokio::test]
    async fn test_bad_category_reports_row() {
        let students = csv_file("student_id,level_id,category\nS1,L1,VISITOR\n");
        let levels = csv_file("level_id,name,order_number\n");
        let source = CsvCohortSource::new(students.path(), levels.path());

        let err = source.get_assessed_cohort("T1").await.unwrap_err();
        match err {
            CollaboratorError::InvalidData(msg) => assert!(msg.contains("row 2"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_row_counts_skipped_lines() {
        // blank row and another term's row precede the bad one on line 5
        let students = csv_file(
            "term_id,student_id,level_id,category\n\
             T1,S1,L1,NEW\n\
             ,,,\n\
             T2,S2,L1,NEW\n\
             T1,S3,L1,VISITOR\n",
        );
        let levels = csv_file("level_id,name,order_number\n");
        let source = CsvCohortSource::new(students.path(), levels.path());

        let err = source.get_assessed_cohort("T1").await.unwrap_err();
        match err {
            CollaboratorError::InvalidData(msg) => assert!(msg.starts_with("row 5:"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let source = CsvCohortSource::new("/nonexistent/cohort.csv", "/nonexistent/levels.csv");
        assert!(matches!(
            source.get_assessed_cohort("T1").await,
            Err(CollaboratorError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_availability_merges_files() {
        let competencies = csv_file(
            "teacher_id,level_id,competency,specialization,max_classes_for_level\n\
             T2,L1,JUNIOR,,\n\
             T1,L1,SENIOR,FOUNDATION,2\n\
             T1,L2,EXPERT,,\n",
        );
        let availability = csv_file(
            "teacher_id,day,session,capacity,max_classes_per_week\n\
             T1,MONDAY,SESI_1,1,4\n\
             T1,Tuesday,sesi-2,,\n\
             T2,MON,SESI_3,0,\n\
             T3,FRIDAY,SESI_7,1,\n",
        );
        let source = CsvAvailabilitySource::new(competencies.path(), availability.path());
        let teachers = source.get_teacher_availability("T").await.unwrap();

        let ids: Vec<&str> = teachers.iter().map(|t| t.teacher_id.as_str()).collect();
        assert_eq!(ids, vec!["T1", "T2", "T3"]);

        let t1 = &teachers[0];
        assert_eq!(t1.max_classes_per_week, 4);
        assert_eq!(t1.competencies.len(), 2);
        assert_eq!(t1.competencies[0].max_classes_for_level, Some(2));
        assert_eq!(t1.competencies[0].specialization, Specialization::Foundation);
        assert_eq!(
            t1.availability[1].slot,
            TimeSlot::new(DayOfWeek::Tuesday, Session::Sesi2)
        );
        assert_eq!(t1.availability[1].capacity, 1);

        assert!(!teachers[1].has_any_availability());
        assert_eq!(teachers[1].max_classes_per_week, DEFAULT_MAX_CLASSES_PER_WEEK);
        assert!(teachers[2].competencies.is_empty());
    }

    #[tokio::test]
    async fn test_term_column_filters_rows() {
        let students = csv_file(
            "term_id,student_id,level_id,category\n\
             T1,S1,L1,NEW\n\
             T2,S2,L1,NEW\n",
        );
        let levels = csv_file("level_id,name,order_number\nL1,Tahsin 1,1\n");
        let source = CsvCohortSource::new(students.path(), levels.path());

        let cohort = source.get_assessed_cohort("T2").await.unwrap();
        assert_eq!(cohort.len(), 1);
        assert_eq!(cohort[0].student_id, "S2");
        assert_eq!(source.get_levels("T2").await.unwrap().len(), 1);
    }
}
