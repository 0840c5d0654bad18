//! Report Data Aggregator
//!
//! One strategy per report type. Each strategy loads its records through the
//! [`HrDataGateway`], computes an ordered summary, optional breakdowns and a
//! detail list capped at [`MAX_DETAIL_ROWS`].

mod attendance;
pub mod format;
mod leave;
mod payroll;
mod performance;

pub use attendance::AttendanceAggregator;
pub use leave::LeaveAggregator;
pub use payroll::PayrollAggregator;
pub use performance::PerformanceAggregator;

use crate::error::ReportError;
use async_trait::async_trait;
use hrdesk_core::models::{
    AttendanceRecord, LeaveRecord, PayrollRecord, PerformanceRecord, ReportParameters, ReportType,
};
use hrdesk_db::HrDataGateway;

/// Detail rows kept in the artifact. `totalRecords` always carries the full count.
pub const MAX_DETAIL_ROWS: usize = 100;

const ALL_DEPARTMENTS: &str = "All departments";

#[async_trait]
pub trait ReportAggregator: Send + Sync {
    fn report_type(&self) -> ReportType;

    async fn aggregate(
        &self,
        gateway: &dyn HrDataGateway,
        query: &ReportQuery,
    ) -> Result<AggregatedReportData, ReportError>;
}

/// Parameters of one aggregation run plus the resolved department scope label
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub parameters: ReportParameters,
    pub scope: String,
}

impl ReportQuery {
    /// Resolve the department name for the scope label. Unknown departments
    /// still filter by id and are labelled by it.
    pub async fn resolve(
        gateway: &dyn HrDataGateway,
        parameters: ReportParameters,
    ) -> Result<Self, ReportError> {
        let scope = match parameters.department_id {
            None => ALL_DEPARTMENTS.to_string(),
            Some(id) => match gateway.department(id).await? {
                Some(department) => department.name,
                None => format!("Department #{}", id),
            },
        };
        Ok(Self { parameters, scope })
    }
}

/// Ordered summary entries with pre-formatted values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    entries: Vec<(&'static str, String)>,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, replacing the value in place if the key already exists
    pub fn insert(&mut self, key: &'static str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Grouped sub-table under the summary, e.g. per department
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    pub title: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailRow {
    Attendance(AttendanceRecord),
    Leave(LeaveRecord),
    Payroll(PayrollRecord),
    Performance(PerformanceRecord),
}

#[derive(Debug, Clone)]
pub struct AggregatedReportData {
    pub report_type: ReportType,
    /// "YYYY-MM-DD to YYYY-MM-DD"
    pub period: String,
    pub scope: String,
    pub summary: Summary,
    pub details: Vec<DetailRow>,
    pub total_records: usize,
    pub breakdowns: Vec<Breakdown>,
}

impl AggregatedReportData {
    pub(crate) fn new(report_type: ReportType, query: &ReportQuery) -> Self {
        Self {
            report_type,
            period: query.parameters.period(),
            scope: query.scope.clone(),
            summary: Summary::new(),
            details: Vec::new(),
            total_records: 0,
            breakdowns: Vec::new(),
        }
    }

    /// Store the sorted rows, capped at [`MAX_DETAIL_ROWS`]
    pub(crate) fn set_details<T>(&mut self, mut rows: Vec<T>, wrap: fn(T) -> DetailRow) {
        self.total_records = rows.len();
        rows.truncate(MAX_DETAIL_ROWS);
        self.details = rows.into_iter().map(wrap).collect();
    }
}

/// Group label for records without a department
pub(crate) fn department_label(name: &Option<String>) -> String {
    name.clone().unwrap_or_else(|| "Unassigned".to_string())
}
