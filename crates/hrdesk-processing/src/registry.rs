//! Report-type lookup table
//!
//! Maps each [`ReportType`] to its aggregator, detail-table columns and row
//! formatter. The `match` is exhaustive, so a new report type does not compile
//! until it is wired here.

use crate::aggregate::format::{money, one_decimal, NOT_AVAILABLE};
use crate::aggregate::{
    AttendanceAggregator, DetailRow, LeaveAggregator, PayrollAggregator, PerformanceAggregator,
    ReportAggregator,
};
use chrono::{NaiveDate, NaiveTime};
use hrdesk_core::models::ReportType;

/// Detail table column. `width` is a relative weight of the usable page width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Column {
    pub header: &'static str,
    pub width: f32,
}

const fn col(header: &'static str, width: f32) -> Column {
    Column { header, width }
}

pub struct ReportDefinition {
    pub aggregator: &'static dyn ReportAggregator,
    pub columns: &'static [Column],
    pub format_row: fn(&DetailRow) -> Vec<String>,
}

static ATTENDANCE: AttendanceAggregator = AttendanceAggregator;
static LEAVE: LeaveAggregator = LeaveAggregator;
static PAYROLL: PayrollAggregator = PayrollAggregator;
static PERFORMANCE: PerformanceAggregator = PerformanceAggregator;

const ATTENDANCE_COLUMNS: &[Column] = &[
    col("Employee", 2.2),
    col("Department", 1.8),
    col("Date", 1.3),
    col("Check In", 1.0),
    col("Check Out", 1.0),
    col("Status", 1.3),
    col("Hours", 0.9),
    col("Overtime", 1.0),
];

const LEAVE_COLUMNS: &[Column] = &[
    col("Employee", 2.2),
    col("Department", 1.8),
    col("Type", 1.3),
    col("Start", 1.3),
    col("End", 1.3),
    col("Days", 0.7),
    col("Status", 1.3),
];

const PAYROLL_COLUMNS: &[Column] = &[
    col("Employee", 2.0),
    col("Department", 1.6),
    col("Pay Date", 1.3),
    col("Base", 1.4),
    col("Allowances", 1.3),
    col("Deductions", 1.3),
    col("Net", 1.4),
];

const PERFORMANCE_COLUMNS: &[Column] = &[
    col("Employee", 2.0),
    col("Department", 1.6),
    col("Review Date", 1.3),
    col("Rating", 0.8),
    col("Reviewer", 1.8),
    col("Comments", 3.0),
];

pub fn report_definition(report_type: ReportType) -> ReportDefinition {
    match report_type {
        ReportType::AttendanceSummary => ReportDefinition {
            aggregator: &ATTENDANCE,
            columns: ATTENDANCE_COLUMNS,
            format_row: attendance_row,
        },
        ReportType::LeaveSummary => ReportDefinition {
            aggregator: &LEAVE,
            columns: LEAVE_COLUMNS,
            format_row: leave_row,
        },
        ReportType::PayrollSummary => ReportDefinition {
            aggregator: &PAYROLL,
            columns: PAYROLL_COLUMNS,
            format_row: payroll_row,
        },
        ReportType::EmployeePerformance => ReportDefinition {
            aggregator: &PERFORMANCE,
            columns: PERFORMANCE_COLUMNS,
            format_row: performance_row,
        },
    }
}

fn or_na(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn date(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

fn time(value: Option<NaiveTime>) -> String {
    or_na(value.map(|t| t.format("%H:%M").to_string()))
}

fn hours(value: Option<f64>) -> String {
    or_na(value.filter(|v| v.is_finite()).map(one_decimal))
}

fn mismatched(columns: &[Column]) -> Vec<String> {
    vec![NOT_AVAILABLE.to_string(); columns.len()]
}

fn attendance_row(row: &DetailRow) -> Vec<String> {
    let DetailRow::Attendance(r) = row else {
        return mismatched(ATTENDANCE_COLUMNS);
    };
    vec![
        or_na(Some(r.employee_name.clone())),
        or_na(r.department_name.clone()),
        date(r.date),
        time(r.check_in),
        time(r.check_out),
        or_na(r.status.map(|s| s.to_string())),
        hours(r.total_hours),
        hours(r.overtime),
    ]
}

fn leave_row(row: &DetailRow) -> Vec<String> {
    let DetailRow::Leave(r) = row else {
        return mismatched(LEAVE_COLUMNS);
    };
    vec![
        or_na(Some(r.employee_name.clone())),
        or_na(r.department_name.clone()),
        or_na(Some(r.leave_type.clone())),
        date(r.start_date),
        date(r.end_date),
        r.duration_days().to_string(),
        or_na(r.status.map(|s| s.to_string())),
    ]
}

fn payroll_row(row: &DetailRow) -> Vec<String> {
    let DetailRow::Payroll(r) = row else {
        return mismatched(PAYROLL_COLUMNS);
    };
    vec![
        or_na(Some(r.employee_name.clone())),
        or_na(r.department_name.clone()),
        date(r.pay_date),
        money(r.base_salary),
        money(r.allowances),
        money(r.deductions),
        money(r.net_salary()),
    ]
}

fn performance_row(row: &DetailRow) -> Vec<String> {
    let DetailRow::Performance(r) = row else {
        return mismatched(PERFORMANCE_COLUMNS);
    };
    let rating = or_na(r.rating.filter(|v| v.is_finite()).map(|v| format!("{:.1}", v)));
    vec![
        or_na(Some(r.employee_name.clone())),
        or_na(r.department_name.clone()),
        date(r.review_date),
        rating,
        or_na(r.reviewer_name.clone()),
        or_na(r.comments.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use hrdesk_core::models::{
        AttendanceRecord, AttendanceStatus, LeaveRecord, PayrollRecord, PerformanceRecord,
    };
    use rust_decimal::Decimal;

    #[test]
    fn test_every_type_is_wired_to_its_aggregator() {
        for report_type in ReportType::ALL {
            let definition = report_definition(report_type);
            assert_eq!(definition.aggregator.report_type(), report_type);
            assert!(!definition.columns.is_empty());
        }
    }

    #[test]
    fn test_missing_fields_render_not_available() {
        let row = DetailRow::Attendance(AttendanceRecord {
            employee_id: 1,
            employee_name: "Ada".to_string(),
            department_id: None,
            department_name: None,
            date: NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
            check_in: NaiveTime::from_hms_opt(9, 5, 0),
            check_out: None,
            status: Some(AttendanceStatus::Late),
            total_hours: None,
            overtime: Some(f64::NAN),
        });

        let cells = (report_definition(ReportType::AttendanceSummary).format_row)(&row);
        assert_eq!(
            cells,
            vec!["Ada", "N/A", "2025-07-03", "09:05", "N/A", "LATE", "N/A", "N/A"]
        );
    }

    #[test]
    fn test_unknown_status_and_missing_rating_render_not_available() {
        let july = NaiveDate::from_ymd_opt(2025, 7, 3).unwrap();
        let attendance = DetailRow::Attendance(AttendanceRecord {
            employee_id: 1,
            employee_name: "Ada".to_string(),
            department_id: Some(1),
            department_name: Some("Ops".to_string()),
            date: july,
            check_in: None,
            check_out: None,
            status: None,
            total_hours: Some(7.5),
            overtime: None,
        });
        let cells = (report_definition(ReportType::AttendanceSummary).format_row)(&attendance);
        assert_eq!(cells[5], "N/A");

        let leave = DetailRow::Leave(LeaveRecord {
            employee_id: 1,
            employee_name: "Ada".to_string(),
            department_id: None,
            department_name: None,
            leave_type: "ANNUAL".to_string(),
            start_date: july,
            end_date: july,
            status: None,
            reason: None,
        });
        let cells = (report_definition(ReportType::LeaveSummary).format_row)(&leave);
        assert_eq!(cells[6], "N/A");

        let review = DetailRow::Performance(PerformanceRecord {
            employee_id: 1,
            employee_name: "Ada".to_string(),
            department_id: None,
            department_name: None,
            review_date: july,
            rating: None,
            reviewer_name: Some("Grace".to_string()),
            comments: None,
        });
        let cells = (report_definition(ReportType::EmployeePerformance).format_row)(&review);
        assert_eq!(cells[3], "N/A");
        assert_eq!(cells[4], "Grace");
    }

    #[test]
    fn test_row_width_matches_columns() {
        let row = DetailRow::Payroll(PayrollRecord {
            employee_id: 1,
            employee_name: "Ada".to_string(),
            department_id: Some(1),
            department_name: Some("Finance".to_string()),
            pay_date: NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            base_salary: Decimal::from(50000),
            allowances: Decimal::from(3000),
            deductions: Decimal::from(1000),
        });
        let definition = report_definition(ReportType::PayrollSummary);
        let cells = (definition.format_row)(&row);
        assert_eq!(cells.len(), definition.columns.len());
        assert_eq!(cells[6], "52,000.00");

        // A row of another type never panics
        let cells = (report_definition(ReportType::LeaveSummary).format_row)(&row);
        assert!(cells.iter().all(|c| c == "N/A"));
    }
}
