//! Flattened CSV export of the request collection.
//!
//! One line per item: a request holding N items produces N data lines, each
//! repeating the request's fields. The header and column order are fixed,
//! matching the original export format.

use std::borrow::Cow;

use crate::domain::request::Request;

/// The fixed column header of the export.
pub const HEADER: [&str; 15] = [
    "ID",
    "RequesterName",
    "RequesterUsername",
    "Date",
    "Purpose",
    "Warehouse",
    "Project/Job #",
    "PO #",
    "Item",
    "Quantity",
    "Price",
    "Notes",
    "Requested Approver",
    "Actual Approver",
    "Status",
];

/// Renders the requests as CSV text, header line included.
///
/// Notes have their newlines collapsed to spaces; purposes are exported
/// lowercase and statuses capitalized, as stored.
#[must_use]
pub fn to_csv<'a>(requests: impl IntoIterator<Item = &'a Request>) -> String {
    let mut out = String::new();
    out.push_str(&HEADER.join(","));
    out.push('\n');

    for request in requests {
        let notes = request.notes().unwrap_or_default().replace('\n', " ");
        for item in request.items() {
            let price = item.price().map(|p| p.to_string()).unwrap_or_default();
            let row = [
                request.id().to_string(),
                request.name().to_string(),
                request.requester().to_string(),
                request.date().to_string(),
                request.purpose().label().to_lowercase(),
                request.warehouse().to_string(),
                request.project_number().unwrap_or_default().to_string(),
                request.po_number().unwrap_or_default().to_string(),
                item.part().to_string(),
                item.qty().to_string(),
                price,
                notes.clone(),
                request.approver().to_string(),
                request
                    .approved_by()
                    .map(ToString::to_string)
                    .unwrap_or_default(),
                request.status().to_string(),
            ];
            let escaped: Vec<_> = row.iter().map(|field| escape(field)).collect();
            out.push_str(&escaped.join(","));
            out.push('\n');
        }
    }

    out
}

/// Escapes a CSV field: fields containing a comma, quote or newline are
/// wrapped in quotes with internal quotes doubled.
fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate};

    use super::*;
    use crate::domain::log::RequestLog;
    use crate::domain::request::Purpose;
    use crate::domain::submission::{ItemDraft, SubmissionForm};

    fn submit(log: &mut RequestLog, items: Vec<ItemDraft>, notes: Option<&str>, millis: i64) {
        let submission = SubmissionForm {
            requester: "employee1".parse().unwrap(),
            name: "Employee One".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            purpose: Purpose::Service,
            warehouse: "Main".to_string(),
            project_number: None,
            po_number: None,
            approver: "approver1".parse().unwrap(),
            notes: notes.map(ToString::to_string),
            total_price: None,
            items,
            confirmed: true,
        }
        .validate()
        .unwrap();
        log.submit(submission, DateTime::from_timestamp_millis(millis).unwrap());
    }

    fn item(part: &str, qty: u32) -> ItemDraft {
        ItemDraft {
            part: part.to_string(),
            qty,
            price: None,
        }
    }

    #[test]
    fn one_line_per_item() {
        let mut log = RequestLog::new();
        submit(&mut log, vec![item("bolt", 4), item("nut", 8)], None, 1);
        submit(&mut log, vec![item("washer", 1)], None, 2);

        let csv = to_csv(log.iter());
        let lines: Vec<_> = csv.lines().collect();

        // Header plus exactly three data lines for two requests with
        // two and one items respectively.
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], HEADER.join(","));
        assert!(lines[1].contains("bolt"));
        assert!(lines[2].contains("nut"));
        assert!(lines[3].contains("washer"));
    }

    #[test]
    fn header_has_fifteen_columns() {
        assert_eq!(HEADER.len(), 15);
        let csv = to_csv(std::iter::empty());
        let header = csv.lines().next().unwrap();
        assert_eq!(header.split(',').count(), 15);
        assert_eq!(header, HEADER.join(","));
    }

    #[test]
    fn fields_with_commas_and_quotes_are_escaped() {
        let mut log = RequestLog::new();
        submit(
            &mut log,
            vec![item("bolt, hex 1/4\"", 4)],
            Some("line one\nline two"),
            1,
        );

        let csv = to_csv(log.iter());
        let data = csv.lines().nth(1).unwrap();

        assert!(data.contains("\"bolt, hex 1/4\"\"\""));
        // Newlines in notes are collapsed, not quoted.
        assert!(data.contains("line one line two"));
    }

    #[test]
    fn purpose_is_lowercase_status_capitalized() {
        let mut log = RequestLog::new();
        submit(&mut log, vec![item("bolt", 1)], None, 1);

        let csv = to_csv(log.iter());
        let data = csv.lines().nth(1).unwrap();

        assert!(data.contains(",service,"));
        assert!(data.ends_with(",Pending"));
    }
}
