use super::format::{mean, one_decimal, percent};
use super::{department_label, AggregatedReportData, Breakdown, DetailRow, ReportAggregator, ReportQuery};
use crate::error::ReportError;
use async_trait::async_trait;
use hrdesk_core::models::{LeaveRecord, LeaveStatus, ReportType};
use hrdesk_db::HrDataGateway;
use std::collections::BTreeMap;

pub struct LeaveAggregator;

#[derive(Default)]
struct GroupTotals {
    requests: usize,
    days: i64,
    approved: usize,
}

impl GroupTotals {
    fn add(&mut self, record: &LeaveRecord) {
        self.requests += 1;
        self.days += record.duration_days();
        if record.status == Some(LeaveStatus::Approved) {
            self.approved += 1;
        }
    }
}

#[async_trait]
impl ReportAggregator for LeaveAggregator {
    fn report_type(&self) -> ReportType {
        ReportType::LeaveSummary
    }

    #[tracing::instrument(skip(self, gateway, query), fields(report.type = "LEAVE_SUMMARY"))]
    async fn aggregate(
        &self,
        gateway: &dyn HrDataGateway,
        query: &ReportQuery,
    ) -> Result<AggregatedReportData, ReportError> {
        let records = gateway.leave_requests(&query.parameters).await?;
        Ok(summarize(records, query))
    }
}

fn count(records: &[LeaveRecord], status: LeaveStatus) -> usize {
    records.iter().filter(|r| r.status == Some(status)).count()
}

fn grouped_rows(groups: BTreeMap<String, GroupTotals>) -> Vec<Vec<String>> {
    groups
        .into_iter()
        .map(|(name, t)| {
            vec![
                name,
                t.requests.to_string(),
                t.days.to_string(),
                t.approved.to_string(),
            ]
        })
        .collect()
}

fn summarize(mut records: Vec<LeaveRecord>, query: &ReportQuery) -> AggregatedReportData {
    let mut data = AggregatedReportData::new(ReportType::LeaveSummary, query);
    let total = records.len();
    let approved = count(&records, LeaveStatus::Approved);
    let total_days: i64 = records.iter().map(LeaveRecord::duration_days).sum();

    let summary = &mut data.summary;
    summary.insert("totalRequests", total.to_string());
    summary.insert("approvedCount", approved.to_string());
    summary.insert("pendingCount", count(&records, LeaveStatus::Pending).to_string());
    summary.insert("rejectedCount", count(&records, LeaveStatus::Rejected).to_string());
    summary.insert("cancelledCount", count(&records, LeaveStatus::Cancelled).to_string());
    summary.insert("approvalRate", percent(approved, total));
    summary.insert("totalLeaveDays", total_days.to_string());
    summary.insert("averageDuration", one_decimal(mean(total_days as f64, total)));
    summary.insert("totalRecords", total.to_string());

    let mut by_type: BTreeMap<String, GroupTotals> = BTreeMap::new();
    let mut by_department: BTreeMap<String, GroupTotals> = BTreeMap::new();
    for record in &records {
        by_type.entry(record.leave_type.clone()).or_default().add(record);
        by_department
            .entry(department_label(&record.department_name))
            .or_default()
            .add(record);
    }

    if total > 0 {
        data.breakdowns.push(Breakdown {
            title: "By Leave Type".to_string(),
            columns: vec!["Leave Type", "Requests", "Days", "Approved"],
            rows: grouped_rows(by_type),
        });
        data.breakdowns.push(Breakdown {
            title: "By Department".to_string(),
            columns: vec!["Department", "Requests", "Days", "Approved"],
            rows: grouped_rows(by_department),
        });
    }

    records.sort_by(|a, b| {
        a.employee_name
            .cmp(&b.employee_name)
            .then_with(|| b.start_date.cmp(&a.start_date))
    });
    data.set_details(records, DetailRow::Leave);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::{day, july_query};

    fn leave(name: &str, start: u32, end: u32, status: LeaveStatus, leave_type: &str) -> LeaveRecord {
        LeaveRecord {
            employee_id: 7,
            employee_name: name.to_string(),
            department_id: Some(1),
            department_name: Some("Operations".to_string()),
            leave_type: leave_type.to_string(),
            start_date: day(start),
            end_date: day(end),
            status: Some(status),
            reason: None,
        }
    }

    #[test]
    fn test_inclusive_duration_sums() {
        let data = summarize(
            vec![leave("Ada", 1, 5, LeaveStatus::Approved, "ANNUAL")],
            &july_query(None),
        );
        assert_eq!(data.summary.get("totalLeaveDays"), Some("5"));
        assert_eq!(data.summary.get("averageDuration"), Some("5.0"));
        assert_eq!(data.summary.get("approvalRate"), Some("100.0%"));
    }

    #[test]
    fn test_status_counts_and_breakdowns() {
        let records = vec![
            leave("Ada", 1, 2, LeaveStatus::Approved, "ANNUAL"),
            leave("Bob", 3, 3, LeaveStatus::Pending, "SICK"),
            leave("Cy", 4, 6, LeaveStatus::Rejected, "ANNUAL"),
            leave("Di", 10, 10, LeaveStatus::Cancelled, "SICK"),
        ];
        let data = summarize(records, &july_query(None));

        assert_eq!(data.summary.get("totalRequests"), Some("4"));
        assert_eq!(data.summary.get("totalRecords"), Some("4"));
        assert_eq!(data.summary.get("pendingCount"), Some("1"));
        assert_eq!(data.summary.get("cancelledCount"), Some("1"));
        assert_eq!(data.summary.get("approvalRate"), Some("25.0%"));
        assert_eq!(data.summary.get("totalLeaveDays"), Some("7"));

        let by_type = &data.breakdowns[0];
        assert_eq!(by_type.rows[0], vec!["ANNUAL", "2", "5", "1"]);
        assert_eq!(by_type.rows[1], vec!["SICK", "2", "2", "0"]);
    }

    #[test]
    fn test_details_order_name_then_start_desc() {
        let records = vec![
            leave("Bob", 1, 1, LeaveStatus::Pending, "SICK"),
            leave("Ada", 2, 2, LeaveStatus::Pending, "SICK"),
            leave("Ada", 9, 9, LeaveStatus::Pending, "SICK"),
        ];
        let data = summarize(records, &july_query(None));
        let starts: Vec<_> = data
            .details
            .iter()
            .map(|row| match row {
                DetailRow::Leave(r) => (r.employee_name.clone(), r.start_date),
                other => panic!("unexpected row {:?}", other),
            })
            .collect();
        assert_eq!(
            starts,
            vec![
                ("Ada".to_string(), day(9)),
                ("Ada".to_string(), day(2)),
                ("Bob".to_string(), day(1)),
            ]
        );
    }
}
