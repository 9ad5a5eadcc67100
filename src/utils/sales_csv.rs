use chrono::{DateTime, NaiveDate, Utc};

use crate::utils::period::Period;

pub const HEADER: &str = "Ticket No,Park,District,Visitor Name,Visitor Email,Adults,Children,Total Amount,Visit Date,Booking Date";

/// One line of the sales export.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRow {
    pub ticket_no: String,
    pub park: String,
    pub district: String,
    pub visitor_name: String,
    pub visitor_email: String,
    pub adults: i32,
    pub children: i32,
    pub total_amount: f64,
    pub visit_date: NaiveDate,
    pub booked_at: DateTime<Utc>,
}

pub fn render(rows: &[SalesRow]) -> String {
    let mut csv = String::with_capacity(HEADER.len() + rows.len() * 96);
    csv.push_str(HEADER);
    csv.push('\n');

    for row in rows {
        let fields = [
            escape(&row.ticket_no),
            quoted(&row.park),
            quoted(&row.district),
            quoted(&row.visitor_name),
            escape(&row.visitor_email),
            row.adults.to_string(),
            row.children.to_string(),
            row.total_amount.to_string(),
            row.visit_date.format("%Y-%m-%d").to_string(),
            row.booked_at.format("%Y-%m-%d").to_string(),
        ];
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    csv
}

/// Unrecognised periods are reported over the daily window and named so.
pub fn file_name(period: Option<Period>, today: NaiveDate) -> String {
    format!(
        "sales-report-{}-{}.csv",
        period.unwrap_or(Period::Daily).as_str(),
        today.format("%Y-%m-%d")
    )
}

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        quoted(field)
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> SalesRow {
        SalesRow {
            ticket_no: "A1B2C3D4".to_string(),
            park: "Lake Park".to_string(),
            district: "North".to_string(),
            visitor_name: "Asha".to_string(),
            visitor_email: "asha@example.com".to_string(),
            adults: 2,
            children: 1,
            total_amount: 250.0,
            visit_date: NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
            booked_at: Utc.with_ymd_and_hms(2024, 3, 13, 23, 10, 0).unwrap(),
        }
    }

    #[test]
    fn test_header_and_row_layout() {
        let csv = render(&[row()]);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], HEADER);
        assert_eq!(
            lines[1],
            "A1B2C3D4,\"Lake Park\",\"North\",\"Asha\",asha@example.com,2,1,250,2024-03-20,2024-03-13"
        );
    }

    #[test]
    fn test_embedded_quotes_and_commas_are_escaped() {
        let mut r = row();
        r.park = "The \"Big\" Park".to_string();
        r.visitor_name = "Doe, Jane".to_string();
        r.visitor_email = "odd,mail@example.com".to_string();

        let csv = render(&[r]);
        let line = csv.lines().nth(1).unwrap();
        assert!(line.contains("\"The \"\"Big\"\" Park\""));
        assert!(line.contains("\"Doe, Jane\""));
        assert!(line.contains("\"odd,mail@example.com\""));
    }

    #[test]
    fn test_empty_export_is_header_only() {
        assert_eq!(render(&[]), format!("{}\n", HEADER));
    }

    #[test]
    fn test_fractional_amounts_keep_decimals() {
        let mut r = row();
        r.total_amount = 99.5;
        assert!(render(&[r]).contains(",99.5,"));
    }

    #[test]
    fn test_file_name() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        assert_eq!(
            file_name(Period::parse("monthly"), today),
            "sales-report-monthly-2024-03-13.csv"
        );
    }

    #[test]
    fn test_file_name_ignores_unparsed_period() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 13).unwrap();
        let name = file_name(Period::parse("monthly\r\nSet-Cookie: a=b"), today);
        assert_eq!(name, "sales-report-daily-2024-03-13.csv");
    }
}
