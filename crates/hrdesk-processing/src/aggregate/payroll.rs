use super::format::{money, optional_money};
use super::{department_label, AggregatedReportData, Breakdown, DetailRow, ReportAggregator, ReportQuery};
use crate::error::ReportError;
use async_trait::async_trait;
use hrdesk_core::models::{PayrollRecord, ReportType};
use hrdesk_db::HrDataGateway;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

pub struct PayrollAggregator;

#[derive(Default)]
struct DepartmentPayroll {
    employees: HashSet<i64>,
    records: usize,
    total_net: Decimal,
}

#[async_trait]
impl ReportAggregator for PayrollAggregator {
    fn report_type(&self) -> ReportType {
        ReportType::PayrollSummary
    }

    #[tracing::instrument(skip(self, gateway, query), fields(report.type = "PAYROLL_SUMMARY"))]
    async fn aggregate(
        &self,
        gateway: &dyn HrDataGateway,
        query: &ReportQuery,
    ) -> Result<AggregatedReportData, ReportError> {
        let records = gateway.payroll(&query.parameters).await?;
        Ok(summarize(records, query))
    }
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count as u64)
    }
}

fn summarize(mut records: Vec<PayrollRecord>, query: &ReportQuery) -> AggregatedReportData {
    let mut data = AggregatedReportData::new(ReportType::PayrollSummary, query);
    let total = records.len();

    let total_base: Decimal = records.iter().map(|r| r.base_salary).sum();
    let total_allowances: Decimal = records.iter().map(|r| r.allowances).sum();
    let total_deductions: Decimal = records.iter().map(|r| r.deductions).sum();
    let net: Vec<Decimal> = records.iter().map(PayrollRecord::net_salary).collect();
    let total_net: Decimal = net.iter().copied().sum();

    let summary = &mut data.summary;
    summary.insert("totalRecords", total.to_string());
    summary.insert("totalBaseSalary", money(total_base));
    summary.insert("totalAllowances", money(total_allowances));
    summary.insert("totalDeductions", money(total_deductions));
    summary.insert("totalNetSalary", money(total_net));
    summary.insert("averageNetSalary", money(average(total_net, total)));
    summary.insert("highestSalary", optional_money(net.iter().copied().max()));
    summary.insert("lowestSalary", optional_money(net.iter().copied().min()));

    let mut by_department: BTreeMap<String, DepartmentPayroll> = BTreeMap::new();
    for record in &records {
        let group = by_department
            .entry(department_label(&record.department_name))
            .or_default();
        group.employees.insert(record.employee_id);
        group.records += 1;
        group.total_net += record.net_salary();
    }

    if !by_department.is_empty() {
        data.breakdowns.push(Breakdown {
            title: "By Department".to_string(),
            columns: vec!["Department", "Employees", "Total Net", "Average Net"],
            rows: by_department
                .into_iter()
                .map(|(name, g)| {
                    vec![
                        name,
                        g.employees.len().to_string(),
                        money(g.total_net),
                        money(average(g.total_net, g.records)),
                    ]
                })
                .collect(),
        });
    }

    records.sort_by(|a, b| {
        a.employee_name
            .cmp(&b.employee_name)
            .then_with(|| b.pay_date.cmp(&a.pay_date))
    });
    data.set_details(records, DetailRow::Payroll);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::{day, july_query};

    fn payroll(employee_id: i64, name: &str, base: i64, allowances: i64, deductions: i64) -> PayrollRecord {
        PayrollRecord {
            employee_id,
            employee_name: name.to_string(),
            department_id: Some(1),
            department_name: Some("Finance".to_string()),
            pay_date: day(31),
            base_salary: Decimal::from(base),
            allowances: Decimal::from(allowances),
            deductions: Decimal::from(deductions),
        }
    }

    #[test]
    fn test_net_salary_totals() {
        let data = summarize(vec![payroll(1, "Ada", 50000, 3000, 1000)], &july_query(None));
        assert_eq!(data.summary.get("totalNetSalary"), Some("52,000.00"));
        assert_eq!(data.summary.get("highestSalary"), Some("52,000.00"));
        assert_eq!(data.summary.get("lowestSalary"), Some("52,000.00"));
        assert_eq!(data.summary.get("totalBaseSalary"), Some("50,000.00"));
    }

    #[test]
    fn test_min_max_and_average() {
        let records = vec![
            payroll(1, "Ada", 50000, 3000, 1000),
            payroll(2, "Bob", 30000, 0, 500),
            payroll(1, "Ada", 50000, 0, 0),
        ];
        let data = summarize(records, &july_query(None));
        assert_eq!(data.summary.get("highestSalary"), Some("52,000.00"));
        assert_eq!(data.summary.get("lowestSalary"), Some("29,500.00"));
        assert_eq!(data.summary.get("totalNetSalary"), Some("131,500.00"));
        assert_eq!(data.summary.get("averageNetSalary"), Some("43,833.33"));

        let by_department = &data.breakdowns[0];
        assert_eq!(
            by_department.rows[0],
            vec!["Finance", "2", "131,500.00", "43,833.33"]
        );
    }

    #[test]
    fn test_empty_payroll_uses_not_available() {
        let data = summarize(Vec::new(), &july_query(None));
        assert_eq!(data.summary.get("highestSalary"), Some("N/A"));
        assert_eq!(data.summary.get("lowestSalary"), Some("N/A"));
        assert_eq!(data.summary.get("averageNetSalary"), Some("0.00"));
    }
}
