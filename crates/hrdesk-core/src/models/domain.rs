//! Read-only records owned by the surrounding HR system.
//!
//! The report service never writes these; they are produced by the data gateway
//! and consumed by the aggregators.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    OnLeave,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
            AttendanceStatus::HalfDay => "HALF_DAY",
            AttendanceStatus::OnLeave => "ON_LEAVE",
        }
    }
}

impl Display for AttendanceStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Ok(AttendanceStatus::Present),
            "ABSENT" => Ok(AttendanceStatus::Absent),
            "LATE" => Ok(AttendanceStatus::Late),
            "HALF_DAY" => Ok(AttendanceStatus::HalfDay),
            "ON_LEAVE" => Ok(AttendanceStatus::OnLeave),
            _ => Err(anyhow::anyhow!("Invalid attendance status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaveStatus::Pending => "PENDING",
            LeaveStatus::Approved => "APPROVED",
            LeaveStatus::Rejected => "REJECTED",
            LeaveStatus::Cancelled => "CANCELLED",
        }
    }
}

impl Display for LeaveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LeaveStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(LeaveStatus::Pending),
            "APPROVED" => Ok(LeaveStatus::Approved),
            "REJECTED" => Ok(LeaveStatus::Rejected),
            "CANCELLED" | "CANCELED" => Ok(LeaveStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid leave status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: i64,
    pub employee_name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    /// `None` when the stored status is missing or not one this service knows.
    pub status: Option<AttendanceStatus>,
    pub total_hours: Option<f64>,
    pub overtime: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaveRecord {
    pub employee_id: i64,
    pub employee_name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub leave_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: Option<LeaveStatus>,
    pub reason: Option<String>,
}

impl LeaveRecord {
    /// Inclusive day count between start and end date.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub employee_id: i64,
    pub employee_name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub pay_date: NaiveDate,
    pub base_salary: Decimal,
    pub allowances: Decimal,
    pub deductions: Decimal,
}

impl PayrollRecord {
    pub fn net_salary(&self) -> Decimal {
        self.base_salary + self.allowances - self.deductions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub employee_id: i64,
    pub employee_name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub review_date: NaiveDate,
    pub rating: Option<f64>,
    pub reviewer_name: Option<String>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

/// An administrator allowed to request reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminIdentity {
    pub id: i64,
    pub name: String,
    pub email: String,
}
