use std::collections::{BTreeMap, HashMap};

use chrono::{Local, TimeZone, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::booking::{self, PaymentStatus};
use crate::entities::{district, park};
use crate::error::AppResult;
use crate::services::access::{scope_filter, CurrentUser, ParkScope};
use crate::utils::period::{date_range, Bucket, DateRange, Period};
use crate::utils::sales_csv::{self, SalesRow};

#[derive(Debug, Clone, Serialize)]
pub struct DistrictLabel {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkLabel {
    pub id: Uuid,
    pub name: String,
    pub district: Option<DistrictLabel>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VisitorCounts {
    pub adults: i64,
    pub children: i64,
    pub total: i64,
}

impl VisitorCounts {
    fn add(&mut self, booking: &booking::Model) {
        self.adults += i64::from(booking.adults);
        self.children += i64::from(booking.children);
        self.total += booking.visitors();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularityCounts {
    pub bookings_count: u64,
    pub visitors_count: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateSales {
    pub bucket: u32,
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateVisitors {
    pub bucket: u32,
    #[serde(flatten)]
    pub counts: VisitorCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkSales {
    pub park: Option<ParkLabel>,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkVisitors {
    pub park: Option<ParkLabel>,
    #[serde(flatten)]
    pub counts: VisitorCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkPopularity {
    pub park: Option<ParkLabel>,
    #[serde(flatten)]
    pub counts: PopularityCounts,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesReport {
    pub period: String,
    #[serde(flatten)]
    pub range: DateRange<Local>,
    pub total_sales: f64,
    pub sales_by_park: Vec<ParkSales>,
    pub sales_by_date: Vec<DateSales>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorReport {
    pub period: String,
    #[serde(flatten)]
    pub range: DateRange<Local>,
    pub total_visitors: VisitorCounts,
    pub visitors_by_park: Vec<ParkVisitors>,
    pub visitors_by_date: Vec<DateVisitors>,
}

// ---------------------------------------------------------------------------
// Aggregation over already-filtered bookings
// ---------------------------------------------------------------------------

/// Folds bookings per park, keeping parks in the order they first appear.
fn group_by_park<T: Default>(
    bookings: &[booking::Model],
    mut fold: impl FnMut(&mut T, &booking::Model),
) -> Vec<(Uuid, T)> {
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    let mut groups: Vec<(Uuid, T)> = Vec::new();

    for booking in bookings {
        let slot = *index.entry(booking.park_id).or_insert_with(|| {
            groups.push((booking.park_id, T::default()));
            groups.len() - 1
        });
        fold(&mut groups[slot].1, booking);
    }

    groups
}

/// Folds bookings per date bucket of their creation time in `tz`, ascending by key.
fn group_by_bucket<Tz: TimeZone, T: Default>(
    bookings: &[booking::Model],
    bucket: Bucket,
    tz: &Tz,
    mut fold: impl FnMut(&mut T, &booking::Model),
) -> Vec<(u32, T)> {
    let mut groups: BTreeMap<u32, T> = BTreeMap::new();
    for booking in bookings {
        let key = bucket.key(&booking.created_at.with_timezone(tz));
        fold(groups.entry(key).or_default(), booking);
    }
    groups.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesSummary {
    pub total_sales: f64,
    pub by_park: Vec<(Uuid, f64)>,
    pub by_date: Vec<DateSales>,
}

pub fn summarize_sales<Tz: TimeZone>(
    bookings: &[booking::Model],
    bucket: Bucket,
    tz: &Tz,
) -> SalesSummary {
    let total_sales = bookings.iter().map(|b| b.total_amount).sum();

    let mut by_park = group_by_park(bookings, |total: &mut f64, b| *total += b.total_amount);
    // Stable, so ties keep first-seen order
    by_park.sort_by(|a, b| b.1.total_cmp(&a.1));

    let by_date = group_by_bucket(bookings, bucket, tz, |acc: &mut (f64, u64), b| {
        acc.0 += b.total_amount;
        acc.1 += 1;
    })
    .into_iter()
    .map(|(bucket, (total, count))| DateSales { bucket, total, count })
    .collect();

    SalesSummary {
        total_sales,
        by_park,
        by_date,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisitorSummary {
    pub total: VisitorCounts,
    pub by_park: Vec<(Uuid, VisitorCounts)>,
    pub by_date: Vec<DateVisitors>,
}

pub fn summarize_visitors<Tz: TimeZone>(
    bookings: &[booking::Model],
    bucket: Bucket,
    tz: &Tz,
) -> VisitorSummary {
    let mut total = VisitorCounts::default();
    for booking in bookings {
        total.add(booking);
    }

    let mut by_park = group_by_park(bookings, VisitorCounts::add);
    by_park.sort_by(|a, b| b.1.total.cmp(&a.1.total));

    let by_date = group_by_bucket(bookings, bucket, tz, VisitorCounts::add)
        .into_iter()
        .map(|(bucket, counts)| DateVisitors { bucket, counts })
        .collect();

    VisitorSummary {
        total,
        by_park,
        by_date,
    }
}

/// Parks ranked by visitors, most visited first.
pub fn rank_popularity(bookings: &[booking::Model]) -> Vec<(Uuid, PopularityCounts)> {
    let mut ranked = group_by_park(bookings, |acc: &mut PopularityCounts, b| {
        acc.bookings_count += 1;
        acc.visitors_count += b.visitors();
        acc.revenue += b.total_amount;
    });
    ranked.sort_by(|a, b| b.1.visitors_count.cmp(&a.1.visitors_count));
    ranked
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Completed bookings inside `scope`, oldest first, optionally limited to a
/// creation window.
async fn completed_bookings(
    db: &DatabaseConnection,
    scope: &ParkScope,
    window: Option<&DateRange<Local>>,
) -> AppResult<Vec<booking::Model>> {
    let mut query = booking::Entity::find()
        .filter(booking::Column::PaymentStatus.eq(PaymentStatus::Completed))
        .filter(scope.condition());

    if let Some(range) = window {
        query = query.filter(booking::Column::CreatedAt.between(
            range.start_date.fixed_offset(),
            range.end_date.fixed_offset(),
        ));
    }

    Ok(query
        .order_by_asc(booking::Column::CreatedAt)
        .all(db)
        .await?)
}

async fn park_labels(
    db: &DatabaseConnection,
    park_ids: impl IntoIterator<Item = Uuid>,
) -> AppResult<HashMap<Uuid, ParkLabel>> {
    let park_ids: Vec<Uuid> = park_ids.into_iter().collect();
    if park_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = park::Entity::find()
        .filter(park::Column::Id.is_in(park_ids))
        .find_also_related(district::Entity)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(park, district)| {
            let label = ParkLabel {
                id: park.id,
                name: park.name,
                district: district.map(|d| DistrictLabel {
                    id: d.id,
                    name: d.name,
                }),
            };
            (label.id, label)
        })
        .collect())
}

struct Window {
    period: Option<Period>,
    range: DateRange<Local>,
    scope: ParkScope,
}

fn resolve_window(period: &str, park_id: Option<Uuid>, user: &CurrentUser) -> Window {
    let parsed = Period::parse(period);
    Window {
        period: parsed,
        range: date_range(parsed),
        scope: scope_filter(user, park_id),
    }
}

pub async fn sales_report(
    db: &DatabaseConnection,
    user: &CurrentUser,
    period: &str,
    park_id: Option<Uuid>,
) -> AppResult<SalesReport> {
    let window = resolve_window(period, park_id, user);
    let bookings = completed_bookings(db, &window.scope, Some(&window.range)).await?;

    let summary = summarize_sales(&bookings, Bucket::for_period(window.period), &Local);
    let labels = park_labels(db, summary.by_park.iter().map(|(id, _)| *id)).await?;

    Ok(SalesReport {
        period: period.to_string(),
        range: window.range,
        total_sales: summary.total_sales,
        sales_by_park: summary
            .by_park
            .into_iter()
            .map(|(id, total)| ParkSales {
                park: labels.get(&id).cloned(),
                total,
            })
            .collect(),
        sales_by_date: summary.by_date,
    })
}

pub async fn visitor_report(
    db: &DatabaseConnection,
    user: &CurrentUser,
    period: &str,
    park_id: Option<Uuid>,
) -> AppResult<VisitorReport> {
    let window = resolve_window(period, park_id, user);
    let bookings = completed_bookings(db, &window.scope, Some(&window.range)).await?;

    let summary = summarize_visitors(&bookings, Bucket::for_period(window.period), &Local);
    let labels = park_labels(db, summary.by_park.iter().map(|(id, _)| *id)).await?;

    Ok(VisitorReport {
        period: period.to_string(),
        range: window.range,
        total_visitors: summary.total,
        visitors_by_park: summary
            .by_park
            .into_iter()
            .map(|(id, counts)| ParkVisitors {
                park: labels.get(&id).cloned(),
                counts,
            })
            .collect(),
        visitors_by_date: summary.by_date,
    })
}

/// All-time popularity over the caller's parks.
pub async fn park_popularity(
    db: &DatabaseConnection,
    user: &CurrentUser,
) -> AppResult<Vec<ParkPopularity>> {
    let bookings = completed_bookings(db, &scope_filter(user, None), None).await?;

    let ranked = rank_popularity(&bookings);
    let labels = park_labels(db, ranked.iter().map(|(id, _)| *id)).await?;

    Ok(ranked
        .into_iter()
        .map(|(id, counts)| ParkPopularity {
            park: labels.get(&id).cloned(),
            counts,
        })
        .collect())
}

pub fn sales_rows(bookings: &[booking::Model], labels: &HashMap<Uuid, ParkLabel>) -> Vec<SalesRow> {
    bookings
        .iter()
        .map(|b| {
            let label = labels.get(&b.park_id);
            SalesRow {
                ticket_no: b.ticket_no.clone(),
                park: label.map(|l| l.name.clone()).unwrap_or_default(),
                district: label
                    .and_then(|l| l.district.as_ref())
                    .map(|d| d.name.clone())
                    .unwrap_or_default(),
                visitor_name: b.visitor_name.clone(),
                visitor_email: b.visitor_email.clone(),
                adults: b.adults,
                children: b.children,
                total_amount: b.total_amount,
                visit_date: b.visit_date,
                booked_at: b.created_at.with_timezone(&Utc),
            }
        })
        .collect()
}

/// CSV export of the same bookings the sales report counts. Returns the
/// attachment file name with the document.
pub async fn export_sales(
    db: &DatabaseConnection,
    user: &CurrentUser,
    period: &str,
    park_id: Option<Uuid>,
) -> AppResult<(String, String)> {
    let window = resolve_window(period, park_id, user);
    let bookings = completed_bookings(db, &window.scope, Some(&window.range)).await?;
    let labels = park_labels(db, bookings.iter().map(|b| b.park_id)).await?;

    let csv = sales_csv::render(&sales_rows(&bookings, &labels));
    tracing::info!(
        user_id = %user.id,
        period,
        rows = bookings.len(),
        "Sales report exported"
    );

    let today = Local::now().date_naive();
    Ok((sales_csv::file_name(window.period, today), csv))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::BookingStatus;
    use chrono::NaiveDate;

    fn booking(park_id: Uuid, adults: i32, children: i32, amount: f64, hour: u32) -> booking::Model {
        booking::Model {
            id: Uuid::new_v4(),
            ticket_no: "A1B2C3D4".to_string(),
            park_id,
            visitor_name: "Visitor".to_string(),
            visitor_email: "visitor@example.com".to_string(),
            visitor_phone: "555".to_string(),
            adults,
            children,
            total_amount: amount,
            visit_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            status: BookingStatus::Active,
            payment_status: PaymentStatus::Completed,
            payment_id: Some("pm_test".to_string()),
            is_printed: false,
            is_downloaded: false,
            used_at: None,
            used_by: None,
            created_at: Utc
                .with_ymd_and_hms(2024, 3, 13, hour, 5, 0)
                .unwrap()
                .fixed_offset(),
        }
    }

    #[test]
    fn test_empty_window_is_zeroed() {
        let sales = summarize_sales(&[], Bucket::HourOfDay, &Utc);
        assert_eq!(sales.total_sales, 0.0);
        assert!(sales.by_park.is_empty());
        assert!(sales.by_date.is_empty());

        let visitors = summarize_visitors(&[], Bucket::HourOfDay, &Utc);
        assert_eq!(visitors.total, VisitorCounts::default());
        assert!(rank_popularity(&[]).is_empty());
    }

    #[test]
    fn test_groupings_partition_the_total() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let bookings = vec![
            booking(a, 2, 1, 250.0, 9),
            booking(b, 1, 0, 80.0, 9),
            booking(a, 1, 2, 150.0, 14),
            booking(b, 4, 0, 320.0, 17),
        ];

        let sales = summarize_sales(&bookings, Bucket::HourOfDay, &Utc);
        assert_eq!(sales.total_sales, 800.0);
        assert_eq!(sales.by_park.iter().map(|(_, t)| t).sum::<f64>(), 800.0);
        assert_eq!(sales.by_date.iter().map(|d| d.total).sum::<f64>(), 800.0);
        assert_eq!(sales.by_date.iter().map(|d| d.count).sum::<u64>(), 4);

        let visitors = summarize_visitors(&bookings, Bucket::HourOfDay, &Utc);
        assert_eq!(visitors.total, VisitorCounts { adults: 8, children: 3, total: 11 });
        let by_park_total: i64 = visitors.by_park.iter().map(|(_, c)| c.total).sum();
        let by_date_total: i64 = visitors.by_date.iter().map(|d| d.counts.total).sum();
        assert_eq!(by_park_total, 11);
        assert_eq!(by_date_total, 11);
    }

    #[test]
    fn test_buckets_ascend_and_parks_descend() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let bookings = vec![
            booking(a, 1, 0, 100.0, 17),
            booking(b, 1, 0, 300.0, 9),
            booking(a, 1, 0, 100.0, 9),
        ];

        let sales = summarize_sales(&bookings, Bucket::HourOfDay, &Utc);
        let keys: Vec<u32> = sales.by_date.iter().map(|d| d.bucket).collect();
        assert_eq!(keys, vec![9, 17]);
        assert_eq!(sales.by_date[0], DateSales { bucket: 9, total: 400.0, count: 2 });
        assert_eq!(sales.by_park, vec![(b, 300.0), (a, 200.0)]);
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let bookings = vec![
            booking(a, 2, 0, 50.0, 8),
            booking(b, 1, 1, 50.0, 8),
            booking(c, 3, 0, 90.0, 8),
        ];

        let sales = summarize_sales(&bookings, Bucket::HourOfDay, &Utc);
        assert_eq!(sales.by_park, vec![(c, 90.0), (a, 50.0), (b, 50.0)]);

        let ranked: Vec<Uuid> = rank_popularity(&bookings).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ranked, vec![c, a, b]);
    }

    #[test]
    fn test_popularity_counts() {
        let a = Uuid::new_v4();
        let ranked = rank_popularity(&[booking(a, 2, 1, 250.0, 8), booking(a, 1, 0, 100.0, 9)]);
        assert_eq!(
            ranked,
            vec![(
                a,
                PopularityCounts {
                    bookings_count: 2,
                    visitors_count: 4,
                    revenue: 350.0
                }
            )]
        );
    }

    #[test]
    fn test_sales_rows_follow_bookings() {
        let a = Uuid::new_v4();
        let bookings = vec![booking(a, 2, 1, 250.0, 23), booking(a, 1, 0, 100.0, 1)];
        let labels = HashMap::from([(
            a,
            ParkLabel {
                id: a,
                name: "Lake Park".to_string(),
                district: Some(DistrictLabel {
                    id: Uuid::new_v4(),
                    name: "North".to_string(),
                }),
            },
        )]);

        let rows = sales_rows(&bookings, &labels);
        assert_eq!(rows.len(), bookings.len());
        assert_eq!(rows[0].park, "Lake Park");
        assert_eq!(rows[0].district, "North");
        assert_eq!(rows[0].booked_at.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 13).unwrap());
    }
}
