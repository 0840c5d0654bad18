use chrono::NaiveDate;
use hrdesk_core::models::{AttendanceRecord, AttendanceStatus, PayrollRecord};
use hrdesk_db::memory::InMemoryHrDataGateway;
use rust_decimal::Decimal;
use serde_json::{json, Value};

pub fn july(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, day).expect("valid date")
}

pub fn submission(report_type: &str, title: &str, department_id: Option<i64>) -> Value {
    json!({
        "reportType": report_type,
        "title": title,
        "description": "Monthly review",
        "parameters": {
            "dateFrom": "2025-07-01",
            "dateTo": "2025-07-31",
            "departmentId": department_id,
        },
        "requestedBy": super::ADMIN_ID,
    })
}

fn attendance(employee_id: i64, day: u32, status: AttendanceStatus) -> AttendanceRecord {
    AttendanceRecord {
        employee_id,
        employee_name: format!("Employee {}", employee_id),
        department_id: Some(2),
        department_name: Some("Engineering".to_string()),
        date: july(day),
        check_in: None,
        check_out: None,
        status: Some(status),
        total_hours: Some(8.0),
        overtime: None,
    }
}

fn payslip(employee_id: i64, base: i64, allowances: i64, deductions: i64) -> PayrollRecord {
    PayrollRecord {
        employee_id,
        employee_name: format!("Employee {}", employee_id),
        department_id: Some(2),
        department_name: Some("Engineering".to_string()),
        pay_date: july(25),
        base_salary: Decimal::new(base, 0),
        allowances: Decimal::new(allowances, 0),
        deductions: Decimal::new(deductions, 0),
    }
}

/// Engineering (department 2): 15 PRESENT, 3 LATE, 2 ABSENT days and two payslips.
pub fn engineering_july() -> InMemoryHrDataGateway {
    let mut records = Vec::new();
    for i in 0..15 {
        records.push(attendance(i, (i as u32 % 28) + 1, AttendanceStatus::Present));
    }
    for i in 0..3 {
        records.push(attendance(20 + i, i as u32 + 1, AttendanceStatus::Late));
    }
    for i in 0..2 {
        records.push(attendance(30 + i, i as u32 + 1, AttendanceStatus::Absent));
    }

    InMemoryHrDataGateway::new()
        .with_attendance(records)
        .with_payroll(vec![payslip(1, 5000, 500, 800), payslip(2, 4200, 300, 600)])
        .with_department(2, "Engineering")
}
