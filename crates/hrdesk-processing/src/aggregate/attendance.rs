use super::format::{mean, one_decimal, percent};
use super::{department_label, AggregatedReportData, Breakdown, DetailRow, ReportAggregator, ReportQuery};
use crate::error::ReportError;
use async_trait::async_trait;
use hrdesk_core::models::{AttendanceRecord, AttendanceStatus, ReportType};
use hrdesk_db::HrDataGateway;
use std::collections::BTreeMap;

const STATUS_ORDER: [AttendanceStatus; 5] = [
    AttendanceStatus::Present,
    AttendanceStatus::Late,
    AttendanceStatus::Absent,
    AttendanceStatus::HalfDay,
    AttendanceStatus::OnLeave,
];

pub struct AttendanceAggregator;

#[derive(Default)]
struct DepartmentTotals {
    records: usize,
    present: usize,
    hours: f64,
}

#[async_trait]
impl ReportAggregator for AttendanceAggregator {
    fn report_type(&self) -> ReportType {
        ReportType::AttendanceSummary
    }

    #[tracing::instrument(skip(self, gateway, query), fields(report.type = "ATTENDANCE_SUMMARY"))]
    async fn aggregate(
        &self,
        gateway: &dyn HrDataGateway,
        query: &ReportQuery,
    ) -> Result<AggregatedReportData, ReportError> {
        let records = gateway.attendance(&query.parameters).await?;
        Ok(summarize(records, query))
    }
}

fn count(records: &[AttendanceRecord], status: AttendanceStatus) -> usize {
    records.iter().filter(|r| r.status == Some(status)).count()
}

fn summarize(mut records: Vec<AttendanceRecord>, query: &ReportQuery) -> AggregatedReportData {
    let mut data = AggregatedReportData::new(ReportType::AttendanceSummary, query);
    let total = records.len();
    let present = count(&records, AttendanceStatus::Present);
    let total_hours: f64 = records.iter().filter_map(|r| r.total_hours).sum();
    let overtime: f64 = records.iter().filter_map(|r| r.overtime).sum();

    let summary = &mut data.summary;
    summary.insert("totalRecords", total.to_string());
    summary.insert("presentCount", present.to_string());
    summary.insert("lateCount", count(&records, AttendanceStatus::Late).to_string());
    summary.insert("absentCount", count(&records, AttendanceStatus::Absent).to_string());
    summary.insert("halfDayCount", count(&records, AttendanceStatus::HalfDay).to_string());
    summary.insert("onLeaveCount", count(&records, AttendanceStatus::OnLeave).to_string());
    summary.insert("attendanceRate", percent(present, total));
    summary.insert("totalWorkingHours", one_decimal(total_hours));
    summary.insert("overtimeHours", one_decimal(overtime));
    summary.insert("averageHoursPerRecord", one_decimal(mean(total_hours, total)));

    let mut by_department: BTreeMap<String, DepartmentTotals> = BTreeMap::new();
    for record in &records {
        let totals = by_department
            .entry(department_label(&record.department_name))
            .or_default();
        totals.records += 1;
        if record.status == Some(AttendanceStatus::Present) {
            totals.present += 1;
        }
        totals.hours += record.total_hours.unwrap_or(0.0);
    }

    if !by_department.is_empty() {
        data.breakdowns.push(Breakdown {
            title: "By Department".to_string(),
            columns: vec!["Department", "Records", "Present", "Attendance Rate", "Hours"],
            rows: by_department
                .into_iter()
                .map(|(name, t)| {
                    vec![
                        name,
                        t.records.to_string(),
                        t.present.to_string(),
                        percent(t.present, t.records),
                        one_decimal(t.hours),
                    ]
                })
                .collect(),
        });

        data.breakdowns.push(Breakdown {
            title: "By Status".to_string(),
            columns: vec!["Status", "Count", "Share"],
            rows: STATUS_ORDER
                .iter()
                .map(|status| (status, count(&records, *status)))
                .filter(|(_, n)| *n > 0)
                .map(|(status, n)| vec![status.to_string(), n.to_string(), percent(n, total)])
                .collect(),
        });
    }

    records.sort_by(|a, b| {
        a.employee_name
            .cmp(&b.employee_name)
            .then_with(|| b.date.cmp(&a.date))
    });
    data.set_details(records, DetailRow::Attendance);
    data
}
