use super::format::{mean, two_decimals};
use super::{department_label, AggregatedReportData, Breakdown, DetailRow, ReportAggregator, ReportQuery};
use crate::error::ReportError;
use async_trait::async_trait;
use hrdesk_core::models::{PerformanceRecord, ReportType};
use hrdesk_db::HrDataGateway;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub struct PerformanceAggregator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RatingBucket {
    Excellent,
    Good,
    Average,
    Poor,
}

impl RatingBucket {
    const ALL: [RatingBucket; 4] = [
        RatingBucket::Excellent,
        RatingBucket::Good,
        RatingBucket::Average,
        RatingBucket::Poor,
    ];

    fn of(rating: f64) -> Self {
        if rating >= 4.5 {
            RatingBucket::Excellent
        } else if rating >= 3.5 {
            RatingBucket::Good
        } else if rating >= 2.5 {
            RatingBucket::Average
        } else {
            RatingBucket::Poor
        }
    }

    fn label(&self) -> &'static str {
        match self {
            RatingBucket::Excellent => "Excellent (4.5+)",
            RatingBucket::Good => "Good (3.5-4.4)",
            RatingBucket::Average => "Average (2.5-3.4)",
            RatingBucket::Poor => "Poor (<2.5)",
        }
    }
}

#[async_trait]
impl ReportAggregator for PerformanceAggregator {
    fn report_type(&self) -> ReportType {
        ReportType::EmployeePerformance
    }

    #[tracing::instrument(skip(self, gateway, query), fields(report.type = "EMPLOYEE_PERFORMANCE"))]
    async fn aggregate(
        &self,
        gateway: &dyn HrDataGateway,
        query: &ReportQuery,
    ) -> Result<AggregatedReportData, ReportError> {
        let records = gateway.performance_reviews(&query.parameters).await?;
        Ok(summarize(records, query))
    }
}

/// Rating of a review, if it carries a usable one
fn rating(record: &PerformanceRecord) -> Option<f64> {
    record.rating.filter(|r| r.is_finite())
}

fn bucket_count(records: &[PerformanceRecord], bucket: RatingBucket) -> usize {
    records
        .iter()
        .filter_map(rating)
        .filter(|r| RatingBucket::of(*r) == bucket)
        .count()
}

fn summarize(mut records: Vec<PerformanceRecord>, query: &ReportQuery) -> AggregatedReportData {
    let mut data = AggregatedReportData::new(ReportType::EmployeePerformance, query);
    let total = records.len();
    let rated = records.iter().filter_map(rating).count();
    let rating_sum: f64 = records.iter().filter_map(rating).sum();

    let summary = &mut data.summary;
    summary.insert("totalReviews", total.to_string());
    summary.insert("averageRating", two_decimals(mean(rating_sum, rated)));
    summary.insert(
        "excellentCount",
        bucket_count(&records, RatingBucket::Excellent).to_string(),
    );
    summary.insert("goodCount", bucket_count(&records, RatingBucket::Good).to_string());
    summary.insert(
        "averageCount",
        bucket_count(&records, RatingBucket::Average).to_string(),
    );
    summary.insert("poorCount", bucket_count(&records, RatingBucket::Poor).to_string());
    summary.insert("totalRecords", total.to_string());

    // reviews, rated reviews, rating sum
    let mut by_department: BTreeMap<String, (usize, usize, f64)> = BTreeMap::new();
    for record in &records {
        let entry = by_department
            .entry(department_label(&record.department_name))
            .or_default();
        entry.0 += 1;
        if let Some(r) = rating(record) {
            entry.1 += 1;
            entry.2 += r;
        }
    }

    if total > 0 {
        data.breakdowns.push(Breakdown {
            title: "By Department".to_string(),
            columns: vec!["Department", "Reviews", "Average Rating"],
            rows: by_department
                .into_iter()
                .map(|(name, (count, rated, sum))| {
                    vec![name, count.to_string(), two_decimals(mean(sum, rated))]
                })
                .collect(),
        });
        data.breakdowns.push(Breakdown {
            title: "Rating Distribution".to_string(),
            columns: vec!["Rating Band", "Reviews"],
            rows: RatingBucket::ALL
                .iter()
                .map(|b| vec![b.label().to_string(), bucket_count(&records, *b).to_string()])
                .collect(),
        });
    }

    // Unrated reviews sort after every rated one
    records.sort_by(|a, b| {
        let by_rating = match (rating(a), rating(b)) {
            (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rating.then_with(|| a.employee_name.cmp(&b.employee_name))
    });
    data.set_details(records, DetailRow::Performance);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::fixtures::{day, july_query};

    fn review(name: &str, rating: f64) -> PerformanceRecord {
        PerformanceRecord {
            employee_id: 3,
            employee_name: name.to_string(),
            department_id: Some(4),
            department_name: Some("Sales".to_string()),
            review_date: day(15),
            rating: Some(rating),
            reviewer_name: None,
            comments: None,
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(RatingBucket::of(4.5), RatingBucket::Excellent);
        assert_eq!(RatingBucket::of(4.49), RatingBucket::Good);
        assert_eq!(RatingBucket::of(3.5), RatingBucket::Good);
        assert_eq!(RatingBucket::of(3.49), RatingBucket::Average);
        assert_eq!(RatingBucket::of(2.5), RatingBucket::Average);
        assert_eq!(RatingBucket::of(2.49), RatingBucket::Poor);
    }

    #[test]
    fn test_summary_counts() {
        let records = vec![
            review("Ada", 4.6),
            review("Bob", 4.0),
            review("Cy", 3.0),
            review("Di", 1.0),
        ];
        let data = summarize(records, &july_query(None));
        assert_eq!(data.summary.get("totalReviews"), Some("4"));
        assert_eq!(data.summary.get("averageRating"), Some("3.15"));
        assert_eq!(data.summary.get("excellentCount"), Some("1"));
        assert_eq!(data.summary.get("goodCount"), Some("1"));
        assert_eq!(data.summary.get("averageCount"), Some("1"));
        assert_eq!(data.summary.get("poorCount"), Some("1"));

        let distribution = &data.breakdowns[1];
        assert_eq!(distribution.title, "Rating Distribution");
        assert_eq!(distribution.rows.len(), 4);
    }

    #[test]
    fn test_details_rating_desc_then_name() {
        let records = vec![review("Bob", 4.0), review("Ada", 4.0), review("Cy", 5.0)];
        let data = summarize(records, &july_query(None));
        let names: Vec<_> = data
            .details
            .iter()
            .map(|row| match row {
                DetailRow::Performance(r) => r.employee_name.clone(),
                other => panic!("unexpected row {:?}", other),
            })
            .collect();
        assert_eq!(names, vec!["Cy", "Ada", "Bob"]);
    }

    #[test]
    fn test_unrated_reviews_are_counted_but_not_averaged() {
        let mut unrated = review("Ed", 0.0);
        unrated.rating = None;
        let records = vec![review("Ada", 4.0), unrated, review("Bob", 3.0)];

        let data = summarize(records, &july_query(None));
        assert_eq!(data.summary.get("totalReviews"), Some("3"));
        assert_eq!(data.summary.get("averageRating"), Some("3.50"));
        assert_eq!(data.summary.get("poorCount"), Some("0"));
        assert_eq!(data.breakdowns[0].rows[0], vec!["Sales", "3", "3.50"]);

        let last = match data.details.last() {
            Some(DetailRow::Performance(r)) => r.employee_name.clone(),
            other => panic!("unexpected row {:?}", other),
        };
        assert_eq!(last, "Ed");
    }

    #[test]
    fn test_empty_average_rating() {
        let data = summarize(Vec::new(), &july_query(None));
        assert_eq!(data.summary.get("averageRating"), Some("0.00"));
    }
}
