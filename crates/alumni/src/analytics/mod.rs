//! Dashboard and analytics hub.
//!
//! Both surfaces are read-only reshapes of [`stats_repo`] counts into the
//! fixed series the admin client charts.

pub mod series;

use serde::Serialize;

use crate::db::stats_repo::{self, Level};
use crate::db::Database;
use crate::error::{Result, ServiceError};
use crate::filter::params::parse_int;
use crate::filter::{resolve, StudentMatch, StudentQuery};
use crate::model::Gender;
use crate::services::validate::{MAX_YEAR, MIN_YEAR};

pub use series::{densify_years, employment_rate, top_n, TOP_N};

pub const DEFAULT_START_YEAR: i32 = 2020;
pub const DEFAULT_END_YEAR: i32 = 2025;

/// Inclusive batch-year range covered by the dashboard series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl Default for DashboardRange {
    fn default() -> Self {
        Self {
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
        }
    }
}

impl DashboardRange {
    /// Parses raw `startYear`/`endYear` values.
    ///
    /// Missing or unparsable values fall back to `defaults`. A reversed
    /// range is swapped. Years outside 1900..=3000 are rejected.
    pub fn parse(start: Option<&str>, end: Option<&str>, defaults: DashboardRange) -> Result<Self> {
        let year = |raw: Option<&str>, fallback: i32| {
            raw.and_then(parse_int)
                .and_then(|y| i32::try_from(y).ok())
                .unwrap_or(fallback)
        };
        let mut start_year = year(start, defaults.start_year);
        let mut end_year = year(end, defaults.end_year);
        if start_year > end_year {
            std::mem::swap(&mut start_year, &mut end_year);
        }
        if start_year < MIN_YEAR || end_year > MAX_YEAR {
            return Err(ServiceError::invalid(format!(
                "startYear and endYear must be between {} and {}",
                MIN_YEAR, MAX_YEAR
            )));
        }
        Ok(Self {
            start_year,
            end_year,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub totals: DashboardTotals,
    pub charts: DashboardCharts,
    pub mini: DashboardMini,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub total_students: u64,
    pub total_employed: u64,
    pub total_unemployed: u64,
    pub employment_rate: f64,
    pub total_faculties: u64,
    pub total_departments: u64,
    pub total_batches: u64,
    pub total_classes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCharts {
    pub students_per_batch: Vec<YearCount>,
    pub gender_distribution: Vec<GenderCount>,
    pub employed_vs_unemployed_per_batch: Vec<YearEmployment>,
    pub employment_trend: Vec<YearRate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMini {
    pub students_per_faculty: Vec<FacultyCount>,
    pub students_per_department: Vec<DepartmentCount>,
    pub class_sizes: Vec<ClassCount>,
    pub top_jobs: Vec<JobCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCount {
    pub year: i32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearEmployment {
    pub year: i32,
    pub employed: u64,
    pub unemployed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRate {
    pub year: i32,
    pub employed_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyCount {
    pub faculty_id: String,
    pub faculty_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentCount {
    pub department_id: String,
    pub department_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassCount {
    pub class_id: String,
    pub class_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCount {
    pub job_name: String,
    pub count: u64,
}

/// Builds the dashboard over every non-deleted student.
pub fn dashboard(db: &Database, range: DashboardRange) -> Result<Dashboard> {
    let all = StudentMatch::default();
    let DashboardRange {
        start_year,
        end_year,
    } = range;

    let totals = stats_repo::totals(db, &all)?;
    let refs = stats_repo::reference_totals(db)?;
    let per_year: Vec<(i32, stats_repo::YearCount)> = stats_repo::by_batch_year(db, &all)?
        .into_iter()
        .map(|row| (row.year, row))
        .collect();

    let students_per_batch = densify_years(start_year, end_year, per_year.clone(), |year, row| {
        YearCount {
            year,
            count: row.map_or(0, |r| r.total),
        }
    });
    let employed_vs_unemployed_per_batch =
        densify_years(start_year, end_year, per_year, |year, row| {
            let (total, employed) = row.map_or((0, 0), |r| (r.total, r.employed));
            YearEmployment {
                year,
                employed,
                unemployed: total - employed,
            }
        });
    let employment_trend = employed_vs_unemployed_per_batch
        .iter()
        .map(|r| YearRate {
            year: r.year,
            employed_rate: employment_rate(r.employed, r.employed + r.unemployed),
        })
        .collect();

    let mut students_per_faculty: Vec<FacultyCount> = stats_repo::by_level(db, &all, Level::Faculty)?
        .into_iter()
        .map(|g| FacultyCount {
            faculty_id: g.id,
            faculty_name: g.name,
            count: g.total,
        })
        .collect();
    series::rank_by_count(&mut students_per_faculty, |f| (f.count, f.faculty_name.as_str()));

    let mut students_per_department: Vec<DepartmentCount> =
        stats_repo::by_level(db, &all, Level::Department)?
            .into_iter()
            .map(|g| DepartmentCount {
                department_id: g.id,
                department_name: g.name,
                count: g.total,
            })
            .collect();
    series::rank_by_count(&mut students_per_department, |d| (d.count, d.department_name.as_str()));

    let mut class_sizes: Vec<ClassCount> = stats_repo::by_level(db, &all, Level::Class)?
        .into_iter()
        .map(|g| ClassCount {
            class_id: g.id,
            class_name: g.name,
            count: g.total,
        })
        .collect();
    series::rank_by_count(&mut class_sizes, |c| (c.count, c.class_name.as_str()));

    let top_jobs = top_n(
        stats_repo::by_job(db, &all)?
            .into_iter()
            .map(|j| JobCount {
                job_name: j.label,
                count: j.count,
            })
            .collect(),
        |j| (j.count, j.job_name.as_str()),
    );

    Ok(Dashboard {
        totals: DashboardTotals {
            total_students: totals.total,
            total_employed: totals.employed,
            total_unemployed: totals.total.saturating_sub(totals.employed),
            employment_rate: employment_rate(totals.employed, totals.total),
            total_faculties: refs.faculties,
            total_departments: refs.departments,
            total_batches: refs.batches,
            total_classes: refs.classes,
        },
        charts: DashboardCharts {
            students_per_batch,
            gender_distribution: gender_distribution(db, &all)?,
            employed_vs_unemployed_per_batch,
            employment_trend,
        },
        mini: DashboardMini {
            students_per_faculty,
            students_per_department,
            class_sizes,
            top_jobs,
        },
    })
}

fn gender_distribution(db: &Database, filter: &StudentMatch) -> Result<Vec<GenderCount>> {
    Ok(stats_repo::by_gender(db, filter)?
        .into_iter()
        .map(|g| GenderCount {
            gender: g.gender,
            count: g.total,
        })
        .collect())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    pub totals: HubTotals,
    pub gender_distribution: Vec<GenderCount>,
    pub employment_by_gender: Vec<GenderEmployment>,
    pub batch_gender_ratio: Vec<BatchGenderRatio>,
    pub jobs_by_gender: Vec<JobsByGender>,
    pub faculty_stats: Vec<FacultyStat>,
    pub department_stats: Vec<DepartmentStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HubTotals {
    pub total: u64,
    pub employed: u64,
    pub unemployed: u64,
    pub employment_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenderEmployment {
    pub gender: Gender,
    pub employed: u64,
    pub unemployed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchGenderRatio {
    pub year: i32,
    #[serde(rename = "Male")]
    pub male: u64,
    #[serde(rename = "Female")]
    pub female: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobsByGender {
    pub job_name: String,
    #[serde(rename = "Male")]
    pub male: u64,
    #[serde(rename = "Female")]
    pub female: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyStat {
    pub faculty_id: String,
    pub faculty_name: String,
    pub total: u64,
    pub employed: u64,
    pub unemployed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentStat {
    pub department_id: String,
    pub department_name: String,
    pub total: u64,
    pub employed: u64,
    pub unemployed: u64,
}

/// Resolves `query` and builds every hub series under that filter.
pub fn hub(db: &Database, query: &StudentQuery) -> Result<Hub> {
    let filter = resolve(db, query)?;
    tracing::debug!(?filter, "Building analytics hub");

    let totals = stats_repo::totals(db, &filter)?;

    let employment_by_gender = stats_repo::by_gender(db, &filter)?
        .into_iter()
        .map(|g| GenderEmployment {
            gender: g.gender,
            employed: g.employed,
            unemployed: g.total - g.employed,
        })
        .collect();

    let batch_gender_ratio = stats_repo::gender_by_batch_year(db, &filter)?
        .into_iter()
        .map(|r| BatchGenderRatio {
            year: r.year,
            male: r.male,
            female: r.female,
        })
        .collect();

    let jobs_by_gender = top_n(
        stats_repo::gender_by_job(db, &filter)?
            .into_iter()
            .map(|j| JobsByGender {
                job_name: j.job_name,
                male: j.male,
                female: j.female,
                total: j.total,
            })
            .collect(),
        |j| (j.total, j.job_name.as_str()),
    );

    let mut faculty_stats: Vec<FacultyStat> = stats_repo::by_level(db, &filter, Level::Faculty)?
        .into_iter()
        .map(|g| FacultyStat {
            faculty_id: g.id,
            faculty_name: g.name,
            total: g.total,
            employed: g.employed,
            unemployed: g.total - g.employed,
        })
        .collect();
    series::rank_by_count(&mut faculty_stats, |f| (f.total, f.faculty_name.as_str()));

    let mut department_stats: Vec<DepartmentStat> =
        stats_repo::by_level(db, &filter, Level::Department)?
            .into_iter()
            .map(|g| DepartmentStat {
                department_id: g.id,
                department_name: g.name,
                total: g.total,
                employed: g.employed,
                unemployed: g.total - g.employed,
            })
            .collect();
    series::rank_by_count(&mut department_stats, |d| (d.total, d.department_name.as_str()));

    Ok(Hub {
        totals: HubTotals {
            total: totals.total,
            employed: totals.employed,
            unemployed: totals.total.saturating_sub(totals.employed),
            employment_rate: employment_rate(totals.employed, totals.total),
        },
        gender_distribution: gender_distribution(db, &filter)?,
        employment_by_gender,
        batch_gender_ratio,
        jobs_by_gender,
        faculty_stats,
        department_stats,
    })
}
