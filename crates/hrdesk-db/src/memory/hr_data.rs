use crate::db::HrDataGateway;
use hrdesk_core::models::{
    AttendanceRecord, Department, LeaveRecord, PayrollRecord, PerformanceRecord, ReportParameters,
};
use hrdesk_core::AppError;
use std::collections::HashMap;
use std::time::Duration;

/// Fixed dataset gateway. Applies the same date window and department filter
/// as the SQL gateway.
#[derive(Clone, Default)]
pub struct InMemoryHrDataGateway {
    attendance: Vec<AttendanceRecord>,
    leave: Vec<LeaveRecord>,
    payroll: Vec<PayrollRecord>,
    performance: Vec<PerformanceRecord>,
    departments: HashMap<i64, Department>,
    delay: Option<Duration>,
    failure: Option<String>,
}

impl InMemoryHrDataGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attendance(mut self, records: Vec<AttendanceRecord>) -> Self {
        self.attendance = records;
        self
    }

    pub fn with_leave(mut self, records: Vec<LeaveRecord>) -> Self {
        self.leave = records;
        self
    }

    pub fn with_payroll(mut self, records: Vec<PayrollRecord>) -> Self {
        self.payroll = records;
        self
    }

    pub fn with_performance(mut self, records: Vec<PerformanceRecord>) -> Self {
        self.performance = records;
        self
    }

    pub fn with_department(mut self, id: i64, name: &str) -> Self {
        self.departments.insert(
            id,
            Department {
                id,
                name: name.to_string(),
            },
        );
        self
    }

    /// Sleep before answering every dataset query
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every dataset query with a database-style error
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    async fn before_query(&self) -> Result<(), AppError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.failure {
            Some(message) => Err(AppError::Internal(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl HrDataGateway for InMemoryHrDataGateway {
    async fn attendance(
        &self,
        params: &ReportParameters,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        self.before_query().await?;
        Ok(self
            .attendance
            .iter()
            .filter(|r| params.contains(r.date) && params.matches_department(r.department_id))
            .cloned()
            .collect())
    }

    async fn leave_requests(&self, params: &ReportParameters) -> Result<Vec<LeaveRecord>, AppError> {
        self.before_query().await?;
        Ok(self
            .leave
            .iter()
            .filter(|r| params.contains(r.start_date) && params.matches_department(r.department_id))
            .cloned()
            .collect())
    }

    async fn payroll(&self, params: &ReportParameters) -> Result<Vec<PayrollRecord>, AppError> {
        self.before_query().await?;
        Ok(self
            .payroll
            .iter()
            .filter(|r| params.contains(r.pay_date) && params.matches_department(r.department_id))
            .cloned()
            .collect())
    }

    async fn performance_reviews(
        &self,
        params: &ReportParameters,
    ) -> Result<Vec<PerformanceRecord>, AppError> {
        self.before_query().await?;
        Ok(self
            .performance
            .iter()
            .filter(|r| {
                params.contains(r.review_date) && params.matches_department(r.department_id)
            })
            .cloned()
            .collect())
    }

    async fn department(&self, id: i64) -> Result<Option<Department>, AppError> {
        Ok(self.departments.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use hrdesk_core::models::AttendanceStatus;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, d).unwrap()
    }

    fn attendance(date: NaiveDate, department_id: Option<i64>) -> AttendanceRecord {
        AttendanceRecord {
            employee_id: 1,
            employee_name: "Ada Lovelace".to_string(),
            department_id,
            department_name: None,
            date,
            check_in: None,
            check_out: None,
            status: Some(AttendanceStatus::Present),
            total_hours: Some(8.0),
            overtime: None,
        }
    }

    #[tokio::test]
    async fn test_window_bounds_are_inclusive() {
        let gateway = InMemoryHrDataGateway::new().with_attendance(vec![
            attendance(day(1), Some(1)),
            attendance(day(15), Some(1)),
            attendance(day(31), Some(1)),
            attendance(NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(), Some(1)),
        ]);
        let params = ReportParameters {
            date_from: day(1),
            date_to: day(31),
            department_id: None,
        };

        assert_eq!(gateway.attendance(&params).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_department_filter() {
        let gateway = InMemoryHrDataGateway::new().with_attendance(vec![
            attendance(day(2), Some(1)),
            attendance(day(2), Some(2)),
            attendance(day(2), None),
        ]);
        let params = ReportParameters {
            date_from: day(1),
            date_to: day(31),
            department_id: Some(2),
        };

        let records = gateway.attendance(&params).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].department_id, Some(2));
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let gateway = InMemoryHrDataGateway::new().with_failure("connection reset");
        let params = ReportParameters {
            date_from: day(1),
            date_to: day(31),
            department_id: None,
        };
        assert!(gateway.payroll(&params).await.is_err());
    }
}
